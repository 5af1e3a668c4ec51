use snafu::Snafu;

use crate::object::Object;

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum ValidationError {
    #[snafu(display("required field {field:?} is not set"))]
    Required { field: String },

    #[snafu(display("at most one of {fields:?} may be set"))]
    AtMostOneOf { fields: Vec<String> },

    #[snafu(display("{value:?} is not a valid value for {field:?}"))]
    InvalidEnum { field: String, value: String },

    #[snafu(display("invalid value for {field:?}: {reason}"))]
    Invalid { field: String, reason: String },
}

/// Fails unless `value` is set to something other than its zero value.
pub fn required<T: Default + PartialEq>(value: &Option<T>, field: &str) -> Result<(), ValidationError> {
    match value {
        Some(v) if *v != T::default() => Ok(()),
        _ => RequiredSnafu { field }.fail(),
    }
}

pub fn required_vec<T>(values: &[T], field: &str) -> Result<(), ValidationError> {
    if values.is_empty() {
        RequiredSnafu { field }.fail()
    } else {
        Ok(())
    }
}

/// Fails if more than one of the named fields is set.
pub fn at_most_one_of(fields: &[(&str, bool)]) -> Result<(), ValidationError> {
    if fields.iter().filter(|(_, set)| *set).count() > 1 {
        AtMostOneOfSnafu {
            fields: fields
                .iter()
                .map(|(name, _)| name.to_string())
                .collect::<Vec<_>>(),
        }
        .fail()
    } else {
        Ok(())
    }
}

/// Schema constraints of an object, checked before it is sent.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Validates a nested field, unless it is unset or empty.
pub fn validate_object<T: Validate + Object>(value: &Option<T>) -> Result<(), ValidationError> {
    match value {
        Some(v) if !v.is_empty() => v.validate(),
        _ => Ok(()),
    }
}

pub fn validate_objects<T: Validate>(values: &[T]) -> Result<(), ValidationError> {
    values.iter().try_for_each(T::validate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_fields() {
        assert_eq!(required(&Some("x".to_string()), "name"), Ok(()));
        assert_eq!(
            required::<String>(&Some(String::new()), "name"),
            Err(ValidationError::Required {
                field: "name".to_string()
            })
        );
        assert!(required::<String>(&None, "name").is_err());
        assert!(required_vec::<i64>(&[], "objectIdPath").is_err());
        assert_eq!(required_vec(&[1, 2], "objectIdPath"), Ok(()));
    }

    #[test]
    fn oneof_fields() {
        assert_eq!(at_most_one_of(&[("pemCsr", true), ("config", false)]), Ok(()));
        assert_eq!(
            at_most_one_of(&[("pemCsr", true), ("config", true)])
                .unwrap_err()
                .to_string(),
            r#"at most one of ["pemCsr", "config"] may be set"#
        );
    }
}
