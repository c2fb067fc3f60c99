//! Schema field resolver: turns declared record fields into typed
//! [`FieldRef`] handles consumable by the algebra.
//!
//! The compilers accept any `FieldRef` regardless of how it was built; this
//! resolver is simply the checked path that guarantees names exist and role
//! metadata is consistent with the declaration.

use std::{collections::HashMap, sync::Arc};

use arrow::datatypes::{DataType, Field, Schema as ArrowSchema, SchemaRef};

use crate::{
    compile::{ColumnarTarget, KeySpec, StoreTarget},
    error::SchemaError,
    expr::{FieldRef, FieldRoles},
};

/// One declared field of a record type: name, value type, and role flags.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDef {
    name: String,
    data_type: DataType,
    roles: FieldRoles,
}

impl FieldDef {
    /// Declares a plain field with no roles.
    #[must_use]
    pub fn new<N>(name: N, data_type: DataType) -> Self
    where
        N: Into<String>,
    {
        Self {
            name: name.into(),
            data_type,
            roles: FieldRoles::default(),
        }
    }

    /// Marks the field as part of the partition key.
    #[must_use]
    pub fn partition_key(mut self) -> Self {
        self.roles.partition_key = true;
        self
    }

    /// Marks the field as part of the clustering key.
    #[must_use]
    pub fn clustering_key(mut self) -> Self {
        self.roles.clustering_key = true;
        self
    }

    /// Marks the field as carrying a secondary index.
    #[must_use]
    pub fn indexed(mut self) -> Self {
        self.roles.indexed = true;
        self
    }

    /// Marks the field as eligible for vector search.
    #[must_use]
    pub fn vector_search(mut self) -> Self {
        self.roles.vector_search = true;
        self
    }

    fn arrow_field(&self) -> Field {
        // Key columns are non-null by construction in the backing store.
        let nullable = !(self.roles.partition_key || self.roles.clustering_key);
        Field::new(&self.name, self.data_type.clone(), nullable)
    }
}

/// Ordered field declarations with by-name lookup.
#[derive(Debug)]
pub struct FilterSchema {
    fields: Vec<FieldDef>,
    arrow_schema: SchemaRef,
}

impl FilterSchema {
    /// Builds a schema from field declarations.
    ///
    /// Declaration order is preserved; it determines partition/clustering
    /// key order in the derived [`KeySpec`].
    pub fn new(fields: Vec<FieldDef>) -> Result<Self, SchemaError> {
        for (i, def) in fields.iter().enumerate() {
            if fields[..i].iter().any(|other| other.name == def.name) {
                return Err(SchemaError::DuplicateField(def.name.clone()));
            }
        }
        let arrow_schema = Arc::new(ArrowSchema::new(
            fields.iter().map(FieldDef::arrow_field).collect::<Vec<_>>(),
        ));
        Ok(Self {
            fields,
            arrow_schema,
        })
    }

    /// Resolves one declared field into a typed reference.
    pub fn field(&self, name: &str) -> Result<FieldRef, SchemaError> {
        self.fields
            .iter()
            .find(|def| def.name == name)
            .map(|def| FieldRef::with_roles(def.name.as_str(), def.data_type.clone(), def.roles))
            .ok_or_else(|| SchemaError::UnknownField(name.to_string()))
    }

    /// Resolves every declared field, keyed by name.
    #[must_use]
    pub fn fields(&self) -> HashMap<String, FieldRef> {
        self.fields
            .iter()
            .map(|def| {
                (
                    def.name.clone(),
                    FieldRef::with_roles(def.name.as_str(), def.data_type.clone(), def.roles),
                )
            })
            .collect()
    }

    /// Arrow view of the declared fields, in declaration order.
    #[must_use]
    pub fn arrow_schema(&self) -> SchemaRef {
        Arc::clone(&self.arrow_schema)
    }

    /// Derives the store key layout from the declared roles.
    #[must_use]
    pub fn key_spec(&self) -> KeySpec {
        let mut spec = KeySpec::new();
        for def in &self.fields {
            if def.roles.partition_key {
                spec = spec.partition_key(def.name.as_str());
            }
            if def.roles.clustering_key {
                spec = spec.clustering_key(def.name.as_str());
            }
            if def.roles.indexed {
                spec = spec.indexed(def.name.as_str());
            }
        }
        spec
    }

    /// Convenience: columnar compilation target over this schema's layout.
    #[must_use]
    pub fn columnar_target(&self) -> ColumnarTarget {
        ColumnarTarget::new(self.arrow_schema())
    }

    /// Convenience: store compilation target derived from the declared roles.
    #[must_use]
    pub fn store_target(&self) -> StoreTarget {
        StoreTarget::new(self.key_spec())
    }
}

/// Declares a [`FilterSchema`] from literal field tuples, suitable for rapid
/// testing and development.
///
/// ```
/// use strainer::filter_schema;
///
/// let schema = filter_schema!(
///     ("col_a", Utf8, partition_key),
///     ("col_b", Utf8, indexed),
///     ("col_c", Int64),
/// )
/// .unwrap();
/// ```
#[macro_export]
macro_rules! filter_schema {
    ($(($name:expr, $type:ident $(, $role:ident)*)),+ $(,)?) => {
        $crate::FilterSchema::new(vec![
            $(
                $crate::FieldDef::new($name, $crate::arrow::datatypes::DataType::$type)
                    $(.$role())*,
            )+
        ])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FilterSchema {
        filter_schema!(
            ("col_a", Utf8, partition_key),
            ("ts", Int64, clustering_key),
            ("col_b", Utf8, indexed),
            ("col_c", Int64),
            ("embedding", Binary, vector_search),
        )
        .unwrap()
    }

    #[test]
    fn resolves_declared_fields_with_roles() {
        let schema = sample();
        let col_a = schema.field("col_a").unwrap();
        assert!(col_a.roles().partition_key);
        assert_eq!(col_a.data_type(), &DataType::Utf8);

        let embedding = schema.field("embedding").unwrap();
        assert!(embedding.roles().vector_search);
        assert!(!embedding.is_primary_key());

        assert_eq!(
            schema.field("missing").unwrap_err(),
            SchemaError::UnknownField("missing".into())
        );
    }

    #[test]
    fn fields_map_covers_all_declarations() {
        let schema = sample();
        let map = schema.fields();
        assert_eq!(map.len(), 5);
        assert!(map["ts"].roles().clustering_key);
    }

    #[test]
    fn duplicate_declarations_rejected() {
        let result = FilterSchema::new(vec![
            FieldDef::new("a", DataType::Int64),
            FieldDef::new("a", DataType::Utf8),
        ]);
        assert_eq!(result.unwrap_err(), SchemaError::DuplicateField("a".into()));
    }

    #[test]
    fn key_columns_are_non_nullable() {
        let schema = sample();
        let arrow = schema.arrow_schema();
        assert!(!arrow.field_with_name("col_a").unwrap().is_nullable());
        assert!(arrow.field_with_name("col_c").unwrap().is_nullable());
    }

    #[test]
    fn key_spec_preserves_declaration_order() {
        let spec = sample().key_spec();
        let primary_key = spec.primary_key();
        let keys: Vec<&str> = primary_key.iter().map(AsRef::as_ref).collect();
        assert_eq!(keys, vec!["col_a", "ts"]);
    }
}
