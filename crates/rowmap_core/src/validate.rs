//! Type validation against a property's declared schema.

use crate::error::{CoreError, CoreResult};
use crate::schema::PropertySpec;
use rowmap_storage::{PropertyType, Value};

/// Checks a candidate value against a property's declared type and size.
///
/// Null always passes; nullability is a persistence-time concern, not a
/// mutation-time one.
///
/// # Errors
///
/// Returns [`CoreError::TypeMismatch`] when the value's shape does not
/// satisfy the declared type and [`CoreError::Range`] when its serialized
/// form exceeds the declared size.
pub fn validate(spec: &PropertySpec, value: &Value) -> CoreResult<()> {
    if value.is_null() {
        return Ok(());
    }

    let shape_ok = match &spec.ty {
        PropertyType::Integer => value.as_integer().is_some(),
        PropertyType::Float => matches!(value, Value::Float(_)),
        PropertyType::Boolean => matches!(value, Value::Bool(_)),
        PropertyType::String => matches!(
            value,
            Value::Text(_) | Value::Integer(_) | Value::Float(_) | Value::Bool(_)
        ),
        PropertyType::DateTime => matches!(value, Value::DateTime(_)),
        PropertyType::Array => matches!(value, Value::List(_)),
        PropertyType::Mixed => true,
        // No runtime witness exists for nominal object types.
        PropertyType::Object(_) => false,
    };
    if !shape_ok {
        return Err(CoreError::TypeMismatch {
            property: spec.name.clone(),
            expected: spec.ty.to_string(),
            actual: value.type_name().to_string(),
        });
    }

    if let Some(size) = spec.size {
        let length = value.serialized_len();
        if length > size as usize {
            return Err(CoreError::Range {
                property: spec.name.clone(),
                size,
                length,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowmap_storage::parse_date_time;

    fn spec(ty: PropertyType, size: Option<u32>) -> PropertySpec {
        PropertySpec {
            name: "p".to_string(),
            ty,
            field: "p".to_string(),
            size,
            default: Value::Null,
            nullable: false,
            unique: false,
        }
    }

    #[test]
    fn null_always_passes() {
        assert!(validate(&spec(PropertyType::Integer, Some(1)), &Value::Null).is_ok());
        assert!(validate(&spec(PropertyType::Object("X".into()), None), &Value::Null).is_ok());
    }

    #[test]
    fn integer_accepts_digit_only_text() {
        let s = spec(PropertyType::Integer, None);
        assert!(validate(&s, &Value::Integer(-5)).is_ok());
        assert!(validate(&s, &Value::Text("42".into())).is_ok());
        assert!(validate(&s, &Value::Text("4.2".into())).is_err());
        assert!(validate(&s, &Value::Text("abc".into())).is_err());
        assert!(validate(&s, &Value::Float(4.0)).is_err());
    }

    #[test]
    fn size_bounds_the_serialized_length() {
        let s = spec(PropertyType::String, Some(255));
        assert!(validate(&s, &Value::Text("x".repeat(255))).is_ok());
        let err = validate(&s, &Value::Text("x".repeat(256))).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Range {
                size: 255,
                length: 256,
                ..
            }
        ));

        let s = spec(PropertyType::Integer, Some(3));
        assert!(validate(&s, &Value::Integer(999)).is_ok());
        assert!(validate(&s, &Value::Integer(1000)).is_err());
    }

    #[test]
    fn string_accepts_scalars() {
        let s = spec(PropertyType::String, None);
        assert!(validate(&s, &Value::Text("hi".into())).is_ok());
        assert!(validate(&s, &Value::Integer(7)).is_ok());
        assert!(validate(&s, &Value::Float(7.5)).is_ok());
        assert!(validate(&s, &Value::Bool(true)).is_ok());
        assert!(validate(&s, &Value::List(vec![])).is_err());
    }

    #[test]
    fn strict_shapes() {
        assert!(validate(&spec(PropertyType::Float, None), &Value::Integer(1)).is_err());
        assert!(validate(&spec(PropertyType::Boolean, None), &Value::Integer(1)).is_err());
        assert!(validate(
            &spec(PropertyType::DateTime, None),
            &Value::Text("2021-01-01 00:00:00".into())
        )
        .is_err());
        assert!(validate(
            &spec(PropertyType::DateTime, None),
            &Value::DateTime(parse_date_time("2021-01-01 00:00:00").unwrap())
        )
        .is_ok());
    }

    #[test]
    fn mixed_accepts_anything_object_nothing() {
        let mixed = spec(PropertyType::Mixed, None);
        assert!(validate(&mixed, &Value::List(vec![Value::Integer(1)])).is_ok());
        assert!(validate(&mixed, &Value::Bool(false)).is_ok());

        let object = spec(PropertyType::Object("Address".into()), None);
        let err = validate(&object, &Value::Text("street".into())).unwrap_err();
        assert!(matches!(err, CoreError::TypeMismatch { .. }));
    }
}
