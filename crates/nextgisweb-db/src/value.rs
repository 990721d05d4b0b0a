//! Database values and rows.
//!
//! [`Value`] is the type passed between models and the backend: statement
//! parameters going in, column values coming out. [`Row`] is one result row
//! with typed access through [`FromValue`].

use std::fmt;

use nextgisweb_core::{NgwError, NgwResult};

/// A statement parameter or column value.
///
/// # Examples
///
/// ```
/// use nextgisweb_db::value::Value;
///
/// assert_eq!(Value::from(42_i64), Value::Int(42));
/// assert_eq!(Value::from("hello"), Value::String("hello".to_string()));
/// assert_eq!(Value::from(None::<i64>), Value::Null);
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Bound as its hyphenated text form.
    Uuid(uuid::Uuid),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Uuid(u) => write!(f, "{u}"),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

value_from!(
    bool => Bool,
    i32 => Int,
    i64 => Int,
    f64 => Float,
    String => String,
    &str => String,
    Vec<u8> => Bytes,
    uuid::Uuid => Uuid,
);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Self::Null,
        }
    }
}

/// A single result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Pairs column names with values.
    ///
    /// # Panics
    ///
    /// When the lengths differ.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        assert_eq!(
            columns.len(),
            values.len(),
            "Row column count must match value count"
        );
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Converts the value of `column`; a missing column is a `DatabaseError`.
    pub fn get<T: FromValue>(&self, column: &str) -> NgwResult<T> {
        let value = self.get_value(column).ok_or_else(|| {
            NgwError::DatabaseError(format!("Column '{column}' not found in row"))
        })?;
        T::from_value(value)
    }

    pub fn get_value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }
}

/// Typed extraction of column values.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> NgwResult<Self>;
}

fn mismatch(expected: &str, value: &Value) -> NgwError {
    NgwError::DatabaseError(format!("Expected {expected}, got {value:?}"))
}

impl FromValue for Value {
    fn from_value(value: &Value) -> NgwResult<Self> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> NgwResult<Self> {
        match value {
            Value::Int(i) => Ok(*i),
            _ => Err(mismatch("Int", value)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> NgwResult<Self> {
        match value {
            Value::Int(i) => i32::try_from(*i).map_err(|e| {
                NgwError::DatabaseError(format!("Int value out of i32 range: {e}"))
            }),
            _ => Err(mismatch("Int", value)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> NgwResult<Self> {
        match value {
            Value::Float(f) => Ok(*f),
            #[allow(clippy::cast_precision_loss)]
            Value::Int(i) => Ok(*i as f64),
            _ => Err(mismatch("Float", value)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> NgwResult<Self> {
        // SQLite has no boolean storage class; booleans come back as 0/1.
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            _ => Err(mismatch("Bool", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> NgwResult<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Uuid(u) => Ok(u.to_string()),
            _ => Err(mismatch("String", value)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> NgwResult<Self> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            _ => Err(mismatch("Bytes", value)),
        }
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(value: &Value) -> NgwResult<Self> {
        match value {
            Value::Uuid(u) => Ok(*u),
            Value::String(s) => uuid::Uuid::parse_str(s)
                .map_err(|e| NgwError::DatabaseError(format!("Invalid UUID '{s}': {e}"))),
            _ => Err(mismatch("Uuid", value)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> NgwResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
