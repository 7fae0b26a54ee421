//! Unified SQL value type for binding and result extraction
//!
//! This is the single value type shared by the query builder, the driver
//! traits and the row type. Arrays only exist on the binding side: they are
//! expanded into one placeholder per element before reaching a driver.

use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::fmt;

/// Generic SQL value
#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Ordered list of values (IN / BETWEEN operands, expanded array bindings)
    Array(Vec<SqlValue>),
}

impl SqlValue {
    /// Build an array value from anything convertible
    pub fn array<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        SqlValue::Array(values.into_iter().map(Into::into).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, SqlValue::Array(_))
    }

    /// Convert to a boolean if possible
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(b) => Some(*b),
            SqlValue::Int(i) => Some(*i != 0),
            SqlValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" => Some(true),
                "false" | "f" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Convert to an i64 if possible
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(i) => Some(*i),
            SqlValue::Bool(b) => Some(*b as i64),
            SqlValue::Double(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            SqlValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Convert to an f64 if possible
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Double(f) => Some(*f),
            SqlValue::Int(i) => Some(*i as f64),
            SqlValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Borrow the text content of a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> JsonValue {
        match self {
            SqlValue::Null => JsonValue::Null,
            SqlValue::Bool(b) => JsonValue::Bool(*b),
            SqlValue::Int(i) => JsonValue::Number((*i).into()),
            SqlValue::Double(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            SqlValue::String(s) => JsonValue::String(s.clone()),
            SqlValue::Bytes(bytes) => JsonValue::String(hex_encode(bytes)),
            SqlValue::Array(values) => {
                JsonValue::Array(values.iter().map(|v| v.to_json()).collect())
            }
        }
    }
}

impl Serialize for SqlValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::Int(i) => write!(f, "{}", i),
            SqlValue::Double(d) => write!(f, "{}", d),
            SqlValue::String(s) => write!(f, "{}", s),
            SqlValue::Bytes(b) => write!(f, "<binary:{} bytes>", b.len()),
            SqlValue::Array(values) => {
                write!(f, "[")?;
                for (i, val) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", val)?;
                }
                write!(f, "]")
            }
        }
    }
}

fn hex_encode(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02X}", b)).collect()
}

// From trait implementations for common types
impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(v: $ty) -> Self {
                    SqlValue::Int(v as i64)
                }
            }

            impl From<&$ty> for SqlValue {
                fn from(v: &$ty) -> Self {
                    SqlValue::Int(*v as i64)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        i64::try_from(v)
            .map(SqlValue::Int)
            .unwrap_or_else(|_| SqlValue::String(v.to_string()))
    }
}

impl From<usize> for SqlValue {
    fn from(v: usize) -> Self {
        SqlValue::from(v as u64)
    }
}

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        SqlValue::Double(v as f64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Double(v)
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::String(s)
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::String(s.to_string())
    }
}

impl From<&String> for SqlValue {
    fn from(s: &String) -> Self {
        SqlValue::String(s.clone())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl From<&[u8]> for SqlValue {
    fn from(v: &[u8]) -> Self {
        SqlValue::Bytes(v.to_vec())
    }
}

impl From<JsonValue> for SqlValue {
    fn from(v: JsonValue) -> Self {
        match v {
            JsonValue::Null => SqlValue::Null,
            JsonValue::Bool(b) => SqlValue::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Int(i),
                None => SqlValue::Double(n.as_f64().unwrap_or_default()),
            },
            JsonValue::String(s) => SqlValue::String(s),
            JsonValue::Array(items) => SqlValue::array(items),
            // Objects are stored as their JSON text
            obj @ JsonValue::Object(_) => SqlValue::String(obj.to_string()),
        }
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<SqlValue>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => SqlValue::Null,
        }
    }
}
