//! Error taxonomy shared across the algebra and the compilers.
//!
//! Every failure surfaces at construction or compilation time; a compiled
//! predicate is guaranteed executable (modulo the caller's own store
//! failures, which [`ExecuteError::Fetch`] merely forwards).

use arrow::{datatypes::DataType, error::ArrowError};
use thiserror::Error;

/// Failures raised by the schema field resolver.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// Requested field name is not declared on the backing schema.
    #[error("unknown field: {0}")]
    UnknownField(String),
    /// Two declared fields share the same name.
    #[error("duplicate field declaration: {0}")]
    DuplicateField(String),
}

/// Failures raised while constructing expression nodes.
#[derive(Debug, Error, PartialEq)]
pub enum ExprError {
    /// Literal type does not match the field's declared type.
    #[error("type mismatch for field '{field}': expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        /// Field the literal was compared against.
        field: String,
        /// Declared field type.
        expected: DataType,
        /// Runtime type of the offending literal.
        actual: DataType,
    },
}

/// Failures raised while compiling an expression tree for a target.
///
/// Always fatal for that compile call; no partial compilation is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    /// A referenced field cannot be resolved against the target schema.
    ///
    /// Construction-time checks normally prevent this; it is kept as a
    /// compile-time guard for ad-hoc field references.
    #[error("field not found in target schema: {0}")]
    FieldNotFound(String),
    /// A disjunctive clause has no partition/clustering/indexed column to
    /// anchor a native store query, and issuing an unrestricted scan is not
    /// an acceptable fallback.
    #[error("clause has no indexed or key column to anchor a store query: {clause}")]
    UnscannableClause {
        /// Rendering of the offending conjunctive clause.
        clause: String,
    },
    /// Normalization produced more disjunctive clauses than the store
    /// compiler is willing to fan out as separate queries.
    #[error("expression expands to more than {limit} store queries")]
    ClauseLimitExceeded {
        /// Configured clause ceiling.
        limit: usize,
    },
}

/// Failures raised while driving a compiled store plan to completion.
///
/// Execution is all-or-nothing: the first failing clause aborts the union
/// rather than returning a partial result set.
#[derive(Debug, Error)]
pub enum ExecuteError<E> {
    /// The caller-supplied fetch failed for one clause.
    #[error("fetch for clause {index} failed: {error}")]
    Fetch {
        /// Position of the clause within the plan.
        index: usize,
        /// Error returned by the fetch closure.
        error: E,
    },
    /// A clause residual could not be compiled against the fetched rows.
    #[error("residual predicate compilation failed: {0}")]
    Residual(#[from] CompileError),
    /// Arrow-level evaluation of a residual or the final union failed.
    #[error("arrow evaluation failed: {0}")]
    Arrow(#[from] ArrowError),
    /// A primary-key column needed for de-duplication is missing from the
    /// fetched rows.
    #[error("primary key column '{0}' missing from fetched rows")]
    MissingKeyColumn(String),
}
