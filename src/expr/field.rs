//! Typed field references: the leaves the algebra is built from.

use std::sync::Arc;

use arrow::datatypes::DataType;

use super::{node::ComparisonOp, Expr, Literal};
use crate::error::ExprError;

/// Role metadata attached to a field reference.
///
/// Roles describe how the backing store can address the column; compilers
/// consult them (via [`KeySpec`](crate::compile::KeySpec)) to decide what can
/// be pushed down. Vector-search eligibility is carried for callers but has
/// no bearing on predicate compilation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FieldRoles {
    /// Column participates in the store's partition key.
    pub partition_key: bool,
    /// Column participates in the store's clustering key.
    pub clustering_key: bool,
    /// Column carries a secondary index.
    pub indexed: bool,
    /// Column is eligible for vector search.
    pub vector_search: bool,
}

/// Immutable, shareable handle to a named, typed column.
///
/// Created once per schema field by the resolver, or ad hoc via
/// [`field`]/[`FieldRef::new`] for backends that do not require schema
/// binding. Never mutated after construction; cloning shares the name
/// allocation.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldRef {
    name: Arc<str>,
    data_type: DataType,
    roles: FieldRoles,
}

/// Shorthand for an ad-hoc, role-less field reference.
///
/// ```
/// use arrow::datatypes::DataType;
/// use strainer::field;
///
/// let age = field("age", DataType::Int64);
/// let expr = age.greater_than(21i64).unwrap();
/// ```
#[must_use]
pub fn field<N>(name: N, data_type: DataType) -> FieldRef
where
    N: Into<Arc<str>>,
{
    FieldRef::new(name, data_type)
}

impl FieldRef {
    /// Creates a field reference without role metadata.
    #[must_use]
    pub fn new<N>(name: N, data_type: DataType) -> Self
    where
        N: Into<Arc<str>>,
    {
        Self::with_roles(name, data_type, FieldRoles::default())
    }

    /// Creates a field reference carrying explicit role metadata.
    #[must_use]
    pub fn with_roles<N>(name: N, data_type: DataType, roles: FieldRoles) -> Self
    where
        N: Into<Arc<str>>,
    {
        Self {
            name: name.into(),
            data_type,
            roles,
        }
    }

    /// Column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared name handle, for cheap reuse in compiled artifacts.
    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Declared value type.
    #[must_use]
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Role metadata.
    #[must_use]
    pub fn roles(&self) -> FieldRoles {
        self.roles
    }

    /// True when the column is part of the store's primary key
    /// (partition or clustering).
    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.roles.partition_key || self.roles.clustering_key
    }

    fn check(&self, literal: &Literal) -> Result<(), ExprError> {
        let actual = literal.data_type();
        if actual == self.data_type {
            Ok(())
        } else {
            Err(ExprError::TypeMismatch {
                field: self.name.to_string(),
                expected: self.data_type.clone(),
                actual,
            })
        }
    }

    fn compare<V>(&self, op: ComparisonOp, value: V) -> Result<Expr, ExprError>
    where
        V: Into<Literal>,
    {
        let literal = value.into();
        self.check(&literal)?;
        Ok(Expr::Compare {
            field: self.clone(),
            op,
            literal,
        })
    }

    /// Builds `self = value`.
    pub fn equals<V>(&self, value: V) -> Result<Expr, ExprError>
    where
        V: Into<Literal>,
    {
        self.compare(ComparisonOp::Equal, value)
    }

    /// Builds `self != value`.
    pub fn not_equals<V>(&self, value: V) -> Result<Expr, ExprError>
    where
        V: Into<Literal>,
    {
        self.compare(ComparisonOp::NotEqual, value)
    }

    /// Builds `self < value`.
    pub fn less_than<V>(&self, value: V) -> Result<Expr, ExprError>
    where
        V: Into<Literal>,
    {
        self.compare(ComparisonOp::LessThan, value)
    }

    /// Builds `self <= value`.
    pub fn less_than_or_equal<V>(&self, value: V) -> Result<Expr, ExprError>
    where
        V: Into<Literal>,
    {
        self.compare(ComparisonOp::LessThanOrEqual, value)
    }

    /// Builds `self > value`.
    pub fn greater_than<V>(&self, value: V) -> Result<Expr, ExprError>
    where
        V: Into<Literal>,
    {
        self.compare(ComparisonOp::GreaterThan, value)
    }

    /// Builds `self >= value`.
    pub fn greater_than_or_equal<V>(&self, value: V) -> Result<Expr, ExprError>
    where
        V: Into<Literal>,
    {
        self.compare(ComparisonOp::GreaterThanOrEqual, value)
    }

    /// Builds `self IN (values...)`.
    ///
    /// An empty value sequence is legal and denotes a predicate that matches
    /// no row, on every target.
    pub fn is_in<I, V>(&self, values: I) -> Result<Expr, ExprError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        let mut list = Vec::new();
        for value in values {
            let literal = value.into();
            self.check(&literal)?;
            list.push(literal);
        }
        Ok(Expr::InList {
            field: self.clone(),
            list,
        })
    }
}
