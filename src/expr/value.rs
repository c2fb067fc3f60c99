//! Literal scalar values carried by expression leaves.

use std::{
    fmt,
    hash::{Hash, Hasher},
};

use arrow::{
    array::{
        Array, AsArray, BinaryArray, BooleanArray, Datum, Float64Array, Int32Array, Int64Array,
        StringArray,
    },
    datatypes::{DataType, Float64Type, Int32Type, Int64Type},
    error::ArrowError,
};

/// Literal value accepted by comparison and membership leaves.
///
/// Every variant maps to exactly one Arrow [`DataType`]; the mapping is the
/// basis for the construction-time type check performed by
/// [`FieldRef`](crate::FieldRef).
///
/// Equality and hashing are structural, with floats compared by bit pattern
/// so literal tuples can key row de-duplication sets.
#[derive(Clone, Debug)]
pub enum Literal {
    /// Boolean scalar (`DataType::Boolean`).
    Boolean(bool),
    /// 32-bit signed integer (`DataType::Int32`).
    Int32(i32),
    /// 64-bit signed integer (`DataType::Int64`).
    Int64(i64),
    /// 64-bit float (`DataType::Float64`).
    Float64(f64),
    /// UTF-8 string (`DataType::Utf8`).
    String(String),
    /// Opaque byte string (`DataType::Binary`).
    Binary(Vec<u8>),
}

impl Literal {
    /// Arrow type this literal materializes as.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Literal::Boolean(_) => DataType::Boolean,
            Literal::Int32(_) => DataType::Int32,
            Literal::Int64(_) => DataType::Int64,
            Literal::Float64(_) => DataType::Float64,
            Literal::String(_) => DataType::Utf8,
            Literal::Binary(_) => DataType::Binary,
        }
    }

    /// Wraps the literal as a single-row Arrow scalar for compute kernels.
    pub(crate) fn to_datum(&self) -> Box<dyn Datum> {
        match self {
            Literal::Boolean(v) => Box::new(BooleanArray::new_scalar(*v)),
            Literal::Int32(v) => Box::new(Int32Array::new_scalar(*v)),
            Literal::Int64(v) => Box::new(Int64Array::new_scalar(*v)),
            Literal::Float64(v) => Box::new(Float64Array::new_scalar(*v)),
            Literal::String(v) => Box::new(StringArray::new_scalar(v.as_str())),
            Literal::Binary(v) => Box::new(BinaryArray::new_scalar(v.as_slice())),
        }
    }

    /// Reads one cell out of an Arrow array as an owned literal.
    ///
    /// Used to build de-duplication keys during plan execution; null cells
    /// are rejected because key columns cannot be null.
    pub(crate) fn from_array(array: &dyn Array, row: usize) -> Result<Self, ArrowError> {
        if array.is_null(row) {
            return Err(ArrowError::InvalidArgumentError(
                "null value in key column".into(),
            ));
        }
        match array.data_type() {
            DataType::Boolean => Ok(Literal::Boolean(array.as_boolean().value(row))),
            DataType::Int32 => Ok(Literal::Int32(array.as_primitive::<Int32Type>().value(row))),
            DataType::Int64 => Ok(Literal::Int64(array.as_primitive::<Int64Type>().value(row))),
            DataType::Float64 => Ok(Literal::Float64(
                array.as_primitive::<Float64Type>().value(row),
            )),
            DataType::Utf8 => Ok(Literal::String(array.as_string::<i32>().value(row).into())),
            DataType::Binary => Ok(Literal::Binary(array.as_binary::<i32>().value(row).into())),
            other => Err(ArrowError::InvalidArgumentError(format!(
                "unsupported key column type {other:?}"
            ))),
        }
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Boolean(a), Literal::Boolean(b)) => a == b,
            (Literal::Int32(a), Literal::Int32(b)) => a == b,
            (Literal::Int64(a), Literal::Int64(b)) => a == b,
            (Literal::Float64(a), Literal::Float64(b)) => a.to_bits() == b.to_bits(),
            (Literal::String(a), Literal::String(b)) => a == b,
            (Literal::Binary(a), Literal::Binary(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Literal::Boolean(v) => v.hash(state),
            Literal::Int32(v) => v.hash(state),
            Literal::Int64(v) => v.hash(state),
            Literal::Float64(v) => v.to_bits().hash(state),
            Literal::String(v) => v.hash(state),
            Literal::Binary(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Boolean(v) => write!(f, "{v}"),
            Literal::Int32(v) => write!(f, "{v}"),
            Literal::Int64(v) => write!(f, "{v}"),
            Literal::Float64(v) => write!(f, "{v}"),
            Literal::String(v) => write!(f, "'{v}'"),
            Literal::Binary(v) => {
                write!(f, "0x")?;
                for byte in v {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Boolean(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Int32(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int64(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float64(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_owned())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl From<Vec<u8>> for Literal {
    fn from(value: Vec<u8>) -> Self {
        Literal::Binary(value)
    }
}

impl From<&[u8]> for Literal {
    fn from(value: &[u8]) -> Self {
        Literal::Binary(value.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn literal_data_types() {
        assert_eq!(Literal::from(true).data_type(), DataType::Boolean);
        assert_eq!(Literal::from(1i32).data_type(), DataType::Int32);
        assert_eq!(Literal::from(1i64).data_type(), DataType::Int64);
        assert_eq!(Literal::from(1.5f64).data_type(), DataType::Float64);
        assert_eq!(Literal::from("a").data_type(), DataType::Utf8);
        assert_eq!(Literal::from(vec![1u8]).data_type(), DataType::Binary);
    }

    #[test]
    fn float_literals_hash_by_bits() {
        let mut seen = HashSet::new();
        assert!(seen.insert(Literal::from(1.5f64)));
        assert!(!seen.insert(Literal::from(1.5f64)));
        assert!(seen.insert(Literal::from(f64::NAN)));
        assert!(!seen.insert(Literal::from(f64::NAN)));
    }

    #[test]
    fn cross_type_literals_never_equal() {
        assert_ne!(Literal::from(1i32), Literal::from(1i64));
        assert_ne!(Literal::from("1"), Literal::from(1i64));
    }

    #[test]
    fn from_array_reads_cells() {
        let strings = StringArray::from(vec!["a", "b"]);
        assert_eq!(
            Literal::from_array(&strings, 1).unwrap(),
            Literal::from("b")
        );

        let ints = Int64Array::from(vec![Some(7), None]);
        assert_eq!(Literal::from_array(&ints, 0).unwrap(), Literal::from(7i64));
        assert!(Literal::from_array(&ints, 1).is_err());
    }

    #[test]
    fn display_renders_sql_like() {
        assert_eq!(Literal::from("a1").to_string(), "'a1'");
        assert_eq!(Literal::from(vec![0xde_u8, 0xad]).to_string(), "0xdead");
        assert_eq!(Literal::from(5i64).to_string(), "5");
    }
}
