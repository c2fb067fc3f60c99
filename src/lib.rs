#![deny(missing_docs)]
//! Typed filter-expression algebra with multi-backend predicate compilation.
//!
//! Callers declare a schema, obtain typed [`FieldRef`] handles, combine them
//! into an immutable boolean [`Expr`] tree, then compile the same tree for
//! the backend at hand:
//!
//! - the **columnar** target evaluates the full algebra over in-memory Arrow
//!   `RecordBatch` values;
//! - the **partitioned-store** target rewrites the tree into disjunctive
//!   normal form and emits one native (conjunction-only) query predicate per
//!   clause, holding non-pushable conditions back as client-side residuals.
//!
//! Everything up to execution is synchronous, pure, and free of shared
//! mutable state: trees and compiled predicates are immutable values, safe
//! to share across threads without locking.
//!
//! ```
//! use strainer::filter_schema;
//!
//! let schema = filter_schema!(
//!     ("col_a", Utf8, partition_key),
//!     ("col_c", Int64),
//! )?;
//! let col_a = schema.field("col_a")?;
//! let col_c = schema.field("col_c")?;
//!
//! let expr = col_a.equals("a1")? & col_c.equals(5i64)?;
//! let plan = schema.store_target().compile(&expr)?;
//!
//! // One native query on the partition key, one client-side residual.
//! assert_eq!(plan.clauses().len(), 1);
//! assert_eq!(plan.clauses()[0].native().to_string(), "col_a = 'a1'");
//! assert!(plan.clauses()[0].residual().is_some());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod compile;
pub mod error;
pub mod expr;

mod exec;
mod schema;

pub use compile::{compile, CompiledPredicate, Target};
pub use expr::{field, ComparisonOp, Expr, FieldRef, FieldRoles, Literal};
pub use schema::{FieldDef, FilterSchema};

// Re-exported so macro expansions and callers share one arrow version.
pub use arrow;
