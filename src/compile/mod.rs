//! Backend compilers for the expression algebra.
//!
//! Compilation is a pure function over the tree: it never mutates its input
//! and never touches a network. Each target decides what it can evaluate
//! natively; the partitioned-store target additionally decides what must be
//! held back for client-side evaluation.

mod columnar;
mod store;

pub use columnar::{ColumnarPredicate, ColumnarTarget};
pub use store::{
    ClausePlan, ColumnCondition, ConditionOp, KeySpec, NativePredicate, StorePlan, StoreTarget,
    MAX_DNF_CLAUSES, MAX_IN_LIST_LEN,
};

use crate::{error::CompileError, expr::Expr};

/// Closed enumeration of compilation targets.
///
/// Most callers use the typed entry points ([`ColumnarTarget::compile`],
/// [`StoreTarget::compile`]) directly; this enum exists for call sites that
/// select the backend at runtime.
#[derive(Clone, Debug)]
pub enum Target {
    /// In-memory Arrow batch filtering.
    Columnar(ColumnarTarget),
    /// Partitioned wide-column store querying.
    Store(StoreTarget),
}

/// Backend-native result of [`compile`].
#[derive(Clone, Debug)]
pub enum CompiledPredicate {
    /// Predicate evaluable over Arrow batches.
    Columnar(ColumnarPredicate),
    /// Independent (native, residual) clause plan for the store.
    Store(StorePlan),
}

/// Compiles an expression tree for the selected target.
pub fn compile(expr: &Expr, target: &Target) -> Result<CompiledPredicate, CompileError> {
    match target {
        Target::Columnar(columnar) => columnar.compile(expr).map(CompiledPredicate::Columnar),
        Target::Store(store) => store.compile(expr).map(CompiledPredicate::Store),
    }
}
