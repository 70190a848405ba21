//! Scalar value model and primitive type tags.

use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::fmt;

/// Storage format for date-time values.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Declared primitive type of a schema property.
///
/// The type tag drives validation at mutation time and per-backend value
/// coercion at write time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyType {
    /// Whole numbers.
    Integer,
    /// Floating point numbers (`float` and `double` annotation tokens).
    Float,
    /// Strict booleans.
    Boolean,
    /// Text, optionally size-bounded.
    String,
    /// Date and time without a timezone.
    DateTime,
    /// A sequence of values.
    Array,
    /// Anything goes.
    Mixed,
    /// A nominal object type with no first-class value representation.
    Object(String),
}

impl PropertyType {
    /// Parses an annotation type token.
    ///
    /// Unknown tokens become nominal [`PropertyType::Object`] types.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token {
            "integer" => Self::Integer,
            "float" | "double" => Self::Float,
            "boolean" => Self::Boolean,
            "string" => Self::String,
            "DateTime" => Self::DateTime,
            "array" => Self::Array,
            "mixed" => Self::Mixed,
            other => Self::Object(other.to_string()),
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Boolean => write!(f, "boolean"),
            Self::String => write!(f, "string"),
            Self::DateTime => write!(f, "DateTime"),
            Self::Array => write!(f, "array"),
            Self::Mixed => write!(f, "mixed"),
            Self::Object(name) => write!(f, "{name}"),
        }
    }
}

/// A scalar value held by a record property or a criterion.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value.
    Null,
    /// Whole number.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Text.
    Text(String),
    /// Date and time without a timezone.
    DateTime(NaiveDateTime),
    /// Sequence of values.
    List(Vec<Value>),
}

impl Value {
    /// Returns true for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the value's runtime shape, for diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "boolean",
            Self::Text(_) => "string",
            Self::DateTime(_) => "DateTime",
            Self::List(_) => "array",
        }
    }

    /// Length of the serialized representation, used for size bounds.
    #[must_use]
    pub fn serialized_len(&self) -> usize {
        self.to_string().chars().count()
    }

    /// Coerces to an integer where the shape allows it.
    ///
    /// Text qualifies only when it is purely numeric with no fractional
    /// part.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Text(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
                s.parse().ok()
            }
            _ => None,
        }
    }

    /// Coerces to a float where the shape allows it.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            Self::Integer(n) => Some(*n as f64),
            Self::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Stringifies scalar shapes; `None` for lists and null.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Null | Self::List(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Compares two values where an ordering exists.
    ///
    /// Integers and floats compare numerically across shapes; text,
    /// date-times and booleans compare within their own shape. Used by the
    /// in-memory drivers to evaluate range conditions.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Integer(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::DateTime(a), Self::DateTime(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::DateTime(dt) => write!(f, "{}", dt.format(DATE_TIME_FORMAT)),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

/// Parses a date-time from its storage representation.
#[must_use]
pub fn parse_date_time(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, DATE_TIME_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tokens() {
        assert_eq!(PropertyType::from_token("integer"), PropertyType::Integer);
        assert_eq!(PropertyType::from_token("float"), PropertyType::Float);
        assert_eq!(PropertyType::from_token("double"), PropertyType::Float);
        assert_eq!(
            PropertyType::from_token("DateTime"),
            PropertyType::DateTime
        );
        assert_eq!(
            PropertyType::from_token("Address"),
            PropertyType::Object("Address".to_string())
        );
    }

    #[test]
    fn integer_coercion() {
        assert_eq!(Value::Integer(42).as_integer(), Some(42));
        assert_eq!(Value::Text("42".into()).as_integer(), Some(42));
        assert_eq!(Value::Text("4.2".into()).as_integer(), None);
        assert_eq!(Value::Text("abc".into()).as_integer(), None);
        assert_eq!(Value::Float(42.0).as_integer(), None);
    }

    #[test]
    fn display_formats_date_time() {
        let dt = parse_date_time("2021-03-04 05:06:07").unwrap();
        assert_eq!(Value::DateTime(dt).to_string(), "2021-03-04 05:06:07");
    }

    #[test]
    fn compare_across_numeric_shapes() {
        assert_eq!(
            Value::Integer(2).compare(&Value::Float(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Text("b".into()).compare(&Value::Text("a".into())),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Text("a".into()).compare(&Value::Integer(1)), None);
    }

    #[test]
    fn serialized_len_counts_characters() {
        assert_eq!(Value::Text("hello".into()).serialized_len(), 5);
        assert_eq!(Value::Integer(12345).serialized_len(), 5);
        assert_eq!(Value::Null.serialized_len(), 0);
    }
}
