//! Schema types for describing provider and resource structure.
//!
//! Schemas describe the shape of the provider configuration and of each
//! resource the provider manages. The host reads them to validate user
//! configuration and to know which attributes the provider computes.
//! Platform constraints that never change at runtime, like the compute tier
//! tables and the region list, are attached to attributes as `one_of`
//! allow-lists when the schema is built.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The type of an attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// A string value.
    String,
    /// A 64-bit integer.
    Int64,
    /// A boolean value.
    Bool,
    /// A list of values of a single type.
    List(Box<AttributeType>),
    /// An object with a fixed set of attributes.
    Object(HashMap<String, AttributeType>),
}

impl AttributeType {
    /// Create a list type.
    pub fn list(element_type: AttributeType) -> Self {
        Self::List(Box::new(element_type))
    }

    /// Create an object type from `(name, type)` pairs.
    pub fn object<N: Into<String>>(fields: impl IntoIterator<Item = (N, AttributeType)>) -> Self {
        Self::Object(fields.into_iter().map(|(n, t)| (n.into(), t)).collect())
    }
}

/// Describes how an attribute can be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    /// The attribute is required in configuration.
    pub required: bool,
    /// The attribute is optional in configuration.
    pub optional: bool,
    /// The attribute is computed by the provider (read-only).
    pub computed: bool,
    /// The attribute is sensitive and should be hidden in logs/UI.
    pub sensitive: bool,
}

/// Describes a single attribute in a schema.
///
/// Built fluently: the type constructor first, then a usage mode, then any
/// constraints.
///
/// ```
/// use tidewave_provider::schema::Attribute;
///
/// let memory = Attribute::int64()
///     .optional_computed()
///     .with_default(2.into())
///     .with_one_of([2i64, 4, 8, 16, 32, 64, 128]);
/// assert!(memory.flags.optional && memory.flags.computed);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// The type of the attribute.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Flags describing how the attribute can be used.
    #[serde(flatten)]
    pub flags: AttributeFlags,
    /// Human-readable description of the attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// If set, changing this attribute forces resource replacement.
    #[serde(default)]
    pub force_new: bool,
    /// Default value applied when the attribute is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Fixed allow-list of accepted values. The validator rejects any
    /// configured value outside the list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<serde_json::Value>>,
}

impl Attribute {
    fn of(attr_type: AttributeType) -> Self {
        Self {
            attr_type,
            flags: AttributeFlags::default(),
            description: None,
            force_new: false,
            default: None,
            one_of: None,
        }
    }

    /// A string attribute with no usage mode set yet.
    pub fn string() -> Self {
        Self::of(AttributeType::String)
    }

    /// An int64 attribute with no usage mode set yet.
    pub fn int64() -> Self {
        Self::of(AttributeType::Int64)
    }

    /// A bool attribute with no usage mode set yet.
    pub fn bool() -> Self {
        Self::of(AttributeType::Bool)
    }

    /// An attribute of an arbitrary type with no usage mode set yet.
    pub fn typed(attr_type: AttributeType) -> Self {
        Self::of(attr_type)
    }

    /// The user must set this attribute.
    pub fn required(mut self) -> Self {
        self.flags.required = true;
        self
    }

    /// The user may set this attribute.
    pub fn optional(mut self) -> Self {
        self.flags.optional = true;
        self
    }

    /// The provider fills this attribute in; user input is ignored.
    pub fn computed(mut self) -> Self {
        self.flags.computed = true;
        self
    }

    /// The user may set this attribute, and the provider fills it in
    /// otherwise.
    pub fn optional_computed(mut self) -> Self {
        self.flags.optional = true;
        self.flags.computed = true;
        self
    }

    /// Hide this attribute's value in logs and UI.
    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }

    /// Set the description for this attribute.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark this attribute as forcing resource replacement when changed.
    pub fn with_force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Set a default value for this attribute.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Restrict this attribute to a fixed set of accepted values.
    pub fn with_one_of<V: Into<serde_json::Value>>(
        mut self,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.one_of = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// Schema for the provider configuration or a single resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Schema {
    /// The version of this schema (for state upgrades).
    #[serde(default)]
    pub version: u64,
    /// The attributes of this schema.
    #[serde(default)]
    pub attributes: HashMap<String, Attribute>,
}

impl Schema {
    /// Create a new schema with the given version.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            attributes: HashMap::new(),
        }
    }

    /// Create a schema at version 0.
    pub fn v0() -> Self {
        Self::new(0)
    }

    /// Add an attribute to the schema.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }
}

/// Schema for the whole provider: its configuration block and every
/// resource type it manages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderSchema {
    /// Schema for provider configuration.
    #[serde(default)]
    pub provider: Schema,
    /// Schemas for each resource type.
    #[serde(default)]
    pub resources: HashMap<String, Schema>,
}

impl ProviderSchema {
    /// Create a new empty provider schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider configuration schema.
    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    /// Add a resource schema.
    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// An error that prevents the operation from completing.
    Error,
    /// A warning that doesn't prevent the operation but should be
    /// addressed.
    Warning,
}

/// A diagnostic message surfaced to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity of the diagnostic.
    pub severity: DiagnosticSeverity,
    /// A short summary of the issue.
    pub summary: String,
    /// A detailed description of the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// The attribute path where the issue occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Add detail to this diagnostic.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the attribute path for this diagnostic.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_modes() {
        let required = Attribute::string().required();
        assert!(required.flags.required);
        assert!(!required.flags.optional && !required.flags.computed);

        let computed = Attribute::string().computed();
        assert!(computed.flags.computed && !computed.flags.required);

        let both = Attribute::int64().optional_computed();
        assert!(both.flags.optional && both.flags.computed);
    }

    #[test]
    fn test_attribute_constraints() {
        let attr = Attribute::int64()
            .optional_computed()
            .with_description("Memory in GB")
            .with_default(json!(2))
            .with_one_of([2i64, 4, 8, 16, 32, 64, 128]);

        assert_eq!(attr.attr_type, AttributeType::Int64);
        assert_eq!(attr.default, Some(json!(2)));
        assert_eq!(attr.one_of.as_ref().map(Vec::len), Some(7));
        assert!(!attr.force_new);

        let replace = Attribute::string().required().with_force_new();
        assert!(replace.force_new);

        let flag = Attribute::bool().optional();
        assert_eq!(flag.attr_type, AttributeType::Bool);
        assert!(flag.flags.optional);
    }

    #[test]
    fn test_sensitive_attribute() {
        let attr = Attribute::string().computed().sensitive();
        assert!(attr.flags.sensitive);
        assert!(attr.flags.computed);
    }

    #[test]
    fn test_schema_builder() {
        let schema = Schema::v0()
            .with_attribute("name", Attribute::string().optional())
            .with_attribute("id", Attribute::string().computed())
            .with_attribute(
                "region_code",
                Attribute::string()
                    .required()
                    .with_one_of(["us-east-1", "eu-west-1"]),
            );

        assert_eq!(schema.version, 0);
        assert!(schema.attributes.contains_key("name"));
        assert!(schema.attributes["region_code"].one_of.is_some());
    }

    #[test]
    fn test_provider_schema() {
        let provider_schema = ProviderSchema::new()
            .with_provider_config(
                Schema::v0()
                    .with_attribute("access_key", Attribute::string().required().sensitive()),
            )
            .with_resource(
                "tidewave_service",
                Schema::v0().with_attribute("id", Attribute::string().computed()),
            )
            .with_resource(
                "tidewave_vpc",
                Schema::v0().with_attribute("cidr", Attribute::string().required()),
            );

        assert!(provider_schema
            .provider
            .attributes
            .contains_key("access_key"));
        assert_eq!(provider_schema.resources.len(), 2);
    }

    #[test]
    fn test_object_type_from_pairs() {
        let attr_type = AttributeType::list(AttributeType::object([
            ("id", AttributeType::String),
            ("cidr", AttributeType::String),
        ]));

        match attr_type {
            AttributeType::List(inner) => match *inner {
                AttributeType::Object(fields) => {
                    assert!(fields.contains_key("cidr"));
                    assert!(fields.contains_key("id"));
                }
                other => panic!("expected object element, got {:?}", other),
            },
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_diagnostic() {
        let err = Diagnostic::error("Invalid configuration")
            .with_detail("The value must be one of the supported tiers")
            .with_attribute("storage_gb");

        assert_eq!(err.severity, DiagnosticSeverity::Error);
        assert_eq!(err.summary, "Invalid configuration");
        assert_eq!(err.attribute, Some("storage_gb".to_string()));

        let warn = Diagnostic::warning("Deprecated attribute");
        assert_eq!(warn.severity, DiagnosticSeverity::Warning);
    }
}
