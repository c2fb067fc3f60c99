//! Typed field references, literals, and the boolean expression tree.
//!
//! All construction here is pure: builders allocate immutable nodes and
//! never touch a network or store. Type mismatches between a literal and a
//! field's declared type fail immediately with
//! [`ExprError::TypeMismatch`](crate::error::ExprError).

mod field;
mod node;
mod value;

pub use field::{field, FieldRef, FieldRoles};
pub use node::{ComparisonOp, Expr};
pub use value::Literal;
