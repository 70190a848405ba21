//! Backend-neutral criteria model.

use crate::value::Value;
use std::fmt;

/// Comparison condition of a criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// Equality.
    Eq,
    /// Strictly less than.
    Lt,
    /// Strictly greater than.
    Gt,
    /// Less than or equal.
    Le,
    /// Greater than or equal.
    Ge,
    /// Pattern match with `%` wildcards at either end.
    Like,
    /// Catch-all full-text match (search backend only).
    Matches,
}

impl Condition {
    /// The operator symbol as rendered in query dialects.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Like => "LIKE",
            Self::Matches => "MATCHES",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One filter predicate: field, condition, value.
///
/// A `&[Criterion]` slice is an ordered criteria list combined with
/// implicit AND. The `field` is a storage-side field alias; property names
/// are resolved to aliases before criteria reach a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    /// Storage-side field name, or `*` for the catch-all condition.
    pub field: String,
    /// Comparison condition.
    pub condition: Condition,
    /// Comparison value.
    pub value: Value,
}

impl Criterion {
    /// Creates a criterion.
    pub fn new(field: impl Into<String>, condition: Condition, value: Value) -> Self {
        Self {
            field: field.into(),
            condition,
            value,
        }
    }

    /// Creates an equality criterion.
    pub fn equals(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, Condition::Eq, value)
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.condition, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_symbols() {
        assert_eq!(Condition::Eq.symbol(), "=");
        assert_eq!(Condition::Le.symbol(), "<=");
        assert_eq!(Condition::Like.symbol(), "LIKE");
        assert_eq!(Condition::Matches.symbol(), "MATCHES");
    }

    #[test]
    fn criterion_display() {
        let c = Criterion::new("age", Condition::Ge, Value::Integer(18));
        assert_eq!(c.to_string(), "age >= 18");
    }
}
