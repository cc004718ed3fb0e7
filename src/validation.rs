//! Schema validation helpers.
//!
//! This module validates a `serde_json::Value` against a [`Schema`] before a
//! resource operation touches the control plane. Validation failures never
//! reach the remote API.
//!
//! # Example
//!
//! ```
//! use tidewave_provider::schema::{Schema, Attribute};
//! use tidewave_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("region_code", Attribute::string().required()
//!         .with_one_of(["us-east-1", "eu-west-1"]))
//!     .with_attribute("memory_gb", Attribute::int64().optional());
//!
//! let diagnostics = validate(&schema, &json!({
//!     "region_code": "us-east-1",
//!     "memory_gb": 4
//! }));
//! assert!(diagnostics.is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"region_code": "mars-1"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("region_code".to_string()));
//! ```

use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use serde_json::Value;
use std::collections::HashMap;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found. An empty
/// list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed-only attributes are skipped (the provider sets these)
/// - Attribute types must match the schema
/// - Values constrained by `one_of` must be a member of the allow-list
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return diagnostics,
        other => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", type_name(other))),
            );
            return diagnostics;
        }
    };

    for (name, attr) in &schema.attributes {
        check_attribute(attr, obj.get(name), name, &mut diagnostics);
    }

    diagnostics
}

/// Validate a JSON value against a schema, returning `Ok` if valid or `Err`
/// with the diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn check_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // Computed-only attributes are filled in by the provider.
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    let value = match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
            return;
        }
        Some(v) => v,
    };

    check_type(&attr.attr_type, value, path, diagnostics);

    if let Some(allowed) = &attr.one_of {
        if !allowed.contains(value) {
            let expected = allowed
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            diagnostics.push(
                Diagnostic::error(format!("Unsupported value for attribute '{}'", path))
                    .with_detail(format!("Got {}, expected one of: {}", value, expected))
                    .with_attribute(path),
            );
        }
    }
}

fn check_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        }
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        }
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        }
        AttributeType::List(element_type) => match value.as_array() {
            Some(arr) => {
                for (i, elem) in arr.iter().enumerate() {
                    check_type(element_type, elem, &format!("{}.{}", path, i), diagnostics);
                }
            }
            None => diagnostics.push(type_error(path, "list", value)),
        },
        AttributeType::Object(fields) => match value.as_object() {
            Some(obj) => check_object_fields(fields, obj, path, diagnostics),
            None => diagnostics.push(type_error(path, "object", value)),
        },
    }
}

fn check_object_fields(
    fields: &HashMap<String, AttributeType>,
    obj: &serde_json::Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // Object fields carry no required/optional flags; only present,
    // non-null values are checked.
    for (name, field_type) in fields {
        if let Some(value) = obj.get(name) {
            if !value.is_null() {
                check_type(field_type, value, &format!("{}.{}", path, name), diagnostics);
            }
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    let Value::Number(n) = value else {
        return false;
    };
    if n.as_i64().is_some() {
        return true;
    }
    // Integral floats pass; anything with a fractional part does not.
    n.as_f64()
        .map(|f| f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64)
        .unwrap_or(false)
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, type_name(got)))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Schema};
    use serde_json::json;

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("cidr", Attribute::string().required());

        let diagnostics = validate(&schema, &json!({"cidr": "10.0.0.0/16"}));
        assert!(diagnostics.is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("cidr".to_string()));

        let diagnostics = validate(&schema, &json!({"cidr": null}));
        assert_eq!(diagnostics.len(), 1);

        let diagnostics = validate(&schema, &json!({"cidr": 10}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_optional_attribute() {
        let schema = Schema::v0().with_attribute("memory_gb", Attribute::int64().optional());

        assert!(validate(&schema, &json!({"memory_gb": 8})).is_empty());
        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"memory_gb": null})).is_empty());

        let diagnostics = validate(&schema, &json!({"memory_gb": "eight"}));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let schema = Schema::v0().with_attribute("hostname", Attribute::string().computed());

        assert!(validate(&schema, &json!({})).is_empty());
        // Computed-only attributes are never checked against user input.
        assert!(validate(&schema, &json!({"hostname": 123})).is_empty());
    }

    #[test]
    fn test_validate_int64_accepts_integral_floats() {
        let schema = Schema::v0().with_attribute("storage_gb", Attribute::int64().required());

        assert!(validate(&schema, &json!({"storage_gb": 100})).is_empty());
        assert!(validate(&schema, &json!({"storage_gb": 100.0})).is_empty());
        assert_eq!(validate(&schema, &json!({"storage_gb": 100.5})).len(), 1);
    }

    #[test]
    fn test_validate_one_of_membership() {
        let schema = Schema::v0().with_attribute(
            "region_code",
            Attribute::string()
                .required()
                .with_one_of(["us-east-1", "eu-west-1", "us-west-2"]),
        );

        assert!(validate(&schema, &json!({"region_code": "eu-west-1"})).is_empty());

        let diagnostics = validate(&schema, &json!({"region_code": "mars-1"}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Unsupported value"));
        assert!(diagnostics[0]
            .detail
            .as_deref()
            .unwrap()
            .contains("us-east-1"));
    }

    #[test]
    fn test_validate_one_of_int64() {
        let schema = Schema::v0().with_attribute(
            "memory_gb",
            Attribute::int64()
                .optional()
                .with_one_of([2i64, 4, 8, 16, 32, 64, 128]),
        );

        assert!(validate(&schema, &json!({"memory_gb": 64})).is_empty());
        assert_eq!(validate(&schema, &json!({"memory_gb": 3})).len(), 1);
        // Absent optional value is not checked against the allow-list.
        assert!(validate(&schema, &json!({})).is_empty());
    }

    #[test]
    fn test_validate_list_of_objects() {
        let peer = AttributeType::object([
            ("id", AttributeType::String),
            ("port", AttributeType::Int64),
        ]);
        let schema = Schema::v0().with_attribute(
            "peers",
            Attribute::typed(AttributeType::list(peer)).optional(),
        );

        let diagnostics = validate(
            &schema,
            &json!({"peers": [{"id": "a", "port": 1}, {"id": "b", "port": 2}]}),
        );
        assert!(diagnostics.is_empty());

        let diagnostics = validate(&schema, &json!({"peers": [{"id": "a", "port": "one"}]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("peers.0.port".to_string()));

        let diagnostics = validate(&schema, &json!({"peers": "not a list"}));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_validate_multiple_errors() {
        let schema = Schema::v0()
            .with_attribute("name", Attribute::string().required())
            .with_attribute("memory_gb", Attribute::int64().optional())
            .with_attribute("enabled", Attribute::bool().optional());

        let diagnostics = validate(
            &schema,
            &json!({"name": 1, "memory_gb": "two", "enabled": "yes"}),
        );
        assert_eq!(diagnostics.len(), 3);
    }

    #[test]
    fn test_validate_root_not_object() {
        let schema = Schema::v0().with_attribute("name", Attribute::string().required());

        let diagnostics = validate(&schema, &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
    }

    #[test]
    fn test_validate_result_helper() {
        let schema = Schema::v0().with_attribute("name", Attribute::string().required());

        assert!(validate_result(&schema, &json!({"name": "svc"})).is_ok());
        assert!(is_valid(&schema, &json!({"name": "svc"})));

        let result = validate_result(&schema, &json!({}));
        assert_eq!(result.unwrap_err().len(), 1);
        assert!(!is_valid(&schema, &json!({})));
    }
}
