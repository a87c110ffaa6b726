//! Schema - Attribute schemas for resources and data sources
//!
//! Resources declare a writable schema; data sources derive a read-only
//! query schema from it with [`ResourceSchema::to_datasource`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use thiserror::Error;

use crate::resource::{AttributeMap, Value};
use crate::validation::{self, Diagnostics, Validator};

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    String,
    Int,
    Bool,
    /// String restricted to a list of allowed values
    Enum(Vec<String>),
    List(Box<AttributeType>),
    Set(Box<AttributeType>),
    Map(Box<AttributeType>),
    /// Nested block with its own attributes
    Nested(Box<ResourceSchema>),
}

impl AttributeType {
    /// Check if a value conforms to this type. Null always conforms.
    pub fn check(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (_, Value::Null) => Ok(()),
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::List(inner), Value::List(items))
            | (AttributeType::Set(inner), Value::Set(items))
            | (AttributeType::Set(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.check(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.check(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Nested(schema), Value::Nested(attrs)) => {
                for (name, v) in attrs.iter() {
                    match schema.get(name) {
                        Some(attr) => attr.attr_type.check(v).map_err(|e| {
                            TypeError::MapValueError {
                                key: name.to_string(),
                                inner: Box::new(e),
                            }
                        })?,
                        None => {
                            return Err(TypeError::UnknownAttribute {
                                name: name.to_string(),
                            });
                        }
                    }
                }
                Ok(())
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name().to_string(),
            }),
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            AttributeType::List(_) | AttributeType::Set(_) | AttributeType::Map(_)
        )
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Set(inner) => format!("Set<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Nested(schema) => format!("Nested({})", schema.resource_type),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

/// Mistake in a schema declaration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{0}: required and optional are mutually exclusive")]
    RequiredAndOptional(String),

    #[error("{0}: a required attribute cannot have a default")]
    RequiredWithDefault(String),

    #[error("{0}: must be required, optional or computed")]
    NoMode(String),

    #[error("{0}: declared more than once")]
    Duplicate(String),

    #[error("{attribute}: conflicts with unknown attribute '{peer}'")]
    UnknownConflict { attribute: String, peer: String },

    #[error("{attribute}: conflicts with '{peer}' but '{peer}' does not conflict back")]
    AsymmetricConflict { attribute: String, peer: String },

    #[error("{0}: max_items only applies to lists, sets and maps")]
    MaxItemsOnScalar(String),
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    pub optional: bool,
    /// Assigned by the server; combined with `optional` the user may override it
    pub computed: bool,
    /// Any change forces destroy + create
    pub force_new: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    pub validator: Option<Validator>,
    /// Attributes that may not be set together with this one
    pub conflicts_with: Vec<String>,
    pub max_items: Option<usize>,
    pub sensitive: bool,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            default: None,
            description: None,
            validator: None,
            conflicts_with: Vec::new(),
            max_items: None,
            sensitive: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn conflicts_with(mut self, peers: &[&str]) -> Self {
        self.conflicts_with = peers.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    /// Only the server ever sets it
    pub fn is_read_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }
}

/// Resource schema. Attributes keep their declaration order.
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    attributes: Vec<AttributeSchema>,
    pub description: Option<String>,
    duplicates: Vec<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: Vec::new(),
            description: None,
            duplicates: Vec::new(),
        }
    }

    /// Declare an attribute. Declaring a name twice is reported by
    /// [`check_definition`](Self::check_definition).
    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        if self.get(&schema.name).is_some() {
            self.duplicates.push(schema.name.clone());
        }
        self.put(schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    fn put(&mut self, schema: AttributeSchema) {
        match self.attributes.iter_mut().find(|a| a.name == schema.name) {
            Some(existing) => *existing = schema,
            None => self.attributes.push(schema),
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn attributes(&self) -> impl Iterator<Item = &AttributeSchema> {
        self.attributes.iter()
    }

    /// Names of attributes whose change forces replacement
    pub fn force_new_attributes(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|a| a.force_new)
            .map(|a| a.name.as_str())
            .collect()
    }

    /// Check the declaration itself: modes, defaults and `conflicts_with` closure
    pub fn check_definition(&self) -> Result<(), Vec<SchemaError>> {
        let mut errors: Vec<SchemaError> = self
            .duplicates
            .iter()
            .map(|name| SchemaError::Duplicate(name.clone()))
            .collect();

        for attr in &self.attributes {
            if attr.required && attr.optional {
                errors.push(SchemaError::RequiredAndOptional(attr.name.clone()));
            }
            if attr.required && attr.default.is_some() {
                errors.push(SchemaError::RequiredWithDefault(attr.name.clone()));
            }
            if !attr.required && !attr.optional && !attr.computed {
                errors.push(SchemaError::NoMode(attr.name.clone()));
            }
            if attr.max_items.is_some() && !attr.attr_type.is_collection() {
                errors.push(SchemaError::MaxItemsOnScalar(attr.name.clone()));
            }
            for peer in &attr.conflicts_with {
                match self.get(peer) {
                    None => errors.push(SchemaError::UnknownConflict {
                        attribute: attr.name.clone(),
                        peer: peer.clone(),
                    }),
                    Some(other) if !other.conflicts_with.contains(&attr.name) => {
                        errors.push(SchemaError::AsymmetricConflict {
                            attribute: attr.name.clone(),
                            peer: peer.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate configuration against this schema
    pub fn validate(&self, attributes: &AttributeMap) -> Diagnostics {
        let mut diags = Diagnostics::new();

        for attr in &self.attributes {
            let value = attributes.get(&attr.name).filter(|v| !v.is_null());
            let Some(value) = value else {
                if attr.required && attr.default.is_none() {
                    diags.error(&attr.name, format!("required attribute '{}' is missing", attr.name));
                }
                continue;
            };

            if attr.is_read_only() && !value.is_empty() {
                diags.error(&attr.name, format!("'{}' is computed and cannot be set", attr.name));
                continue;
            }

            if let Err(e) = attr.attr_type.check(value) {
                diags.error(&attr.name, e.to_string());
                continue;
            }

            if let (Some(max), Some(len)) = (attr.max_items, collection_len(value))
                && len > max
            {
                diags.error(
                    &attr.name,
                    format!("at most {} items allowed, got {}", max, len),
                );
            }

            if let Some(validator) = &attr.validator {
                diags.extend(validator.validate(value, &attr.name));
            }
        }

        // each pair once, whatever else is wrong with either side
        let mut pairs = BTreeSet::new();
        for attr in &self.attributes {
            for peer in &attr.conflicts_with {
                if attributes.is_set(&attr.name) && attributes.is_set(peer) {
                    let (a, b) = if attr.name <= *peer {
                        (attr.name.as_str(), peer.as_str())
                    } else {
                        (peer.as_str(), attr.name.as_str())
                    };
                    pairs.insert((a, b));
                }
            }
        }
        for (a, b) in pairs {
            diags.error(a, format!("'{}' conflicts with '{}'", a, b));
        }

        for (name, _) in attributes.iter() {
            if !self.has(name) {
                diags.error(name, format!("unknown attribute '{}'", name));
            }
        }

        diags
    }

    /// Fill unset attributes that declare a default
    pub fn apply_defaults(&self, attributes: &mut AttributeMap) {
        for attr in &self.attributes {
            if let Some(default) = &attr.default
                && attributes.get(&attr.name).is_none_or(Value::is_null)
            {
                attributes.insert(attr.name.clone(), default.clone());
            }
        }
    }

    /// Derive a read-only query schema.
    ///
    /// Every attribute becomes computed; the `lookup_keys` additionally stay
    /// optional so they can select the object. Defaults, validators,
    /// force-new and conflicts are dropped.
    pub fn to_datasource(&self, lookup_keys: &[&str]) -> ResourceSchema {
        let mut ds = ResourceSchema::new(self.resource_type.clone());
        ds.description = self.description.clone();
        for attr in &self.attributes {
            ds.put(AttributeSchema {
                name: attr.name.clone(),
                attr_type: attr.attr_type.clone(),
                required: false,
                optional: lookup_keys.contains(&attr.name.as_str()),
                computed: true,
                force_new: false,
                default: None,
                description: attr.description.clone(),
                validator: None,
                conflicts_with: Vec::new(),
                max_items: attr.max_items,
                sensitive: attr.sensitive,
            });
        }
        ds
    }

    /// Add the `<entity>_id` / `name` selector pair of a data source.
    /// The two conflict with each other.
    pub fn with_lookup_fields(mut self, entity: &str) -> ResourceSchema {
        let id_attribute = format!("{}_id", entity);
        self.put(
            AttributeSchema::new(id_attribute.clone(), AttributeType::String)
                .optional()
                .computed()
                .with_validator(validation::uuid_or_localized())
                .conflicts_with(&["name"])
                .with_description(format!("The ID of the {}", entity.replace('_', " "))),
        );
        let description = self
            .get("name")
            .and_then(|a| a.description.clone())
            .unwrap_or_else(|| format!("The name of the {}", entity.replace('_', " ")));
        self.put(
            AttributeSchema::new("name", AttributeType::String)
                .optional()
                .computed()
                .conflicts_with(&[id_attribute.as_str()])
                .with_description(description),
        );
        self
    }
}

fn collection_len(value: &Value) -> Option<usize> {
    match value {
        Value::List(items) | Value::Set(items) => Some(items.len()),
        Value::Map(map) => Some(map.len()),
        _ => None,
    }
}

/// Build a string map value from pairs
pub fn string_map<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Value {
    Value::Map(
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect::<BTreeMap<_, _>>(),
    )
}

/// Helper functions for common attributes
pub mod types {
    use super::*;

    /// `zone` attribute of zonal resources
    pub fn zone() -> AttributeSchema {
        AttributeSchema::new("zone", AttributeType::String)
            .optional()
            .computed()
            .force_new()
            .with_validator(validation::zone())
            .with_description("The zone you want to attach the resource to")
    }

    /// `region` attribute of regional resources
    pub fn region() -> AttributeSchema {
        AttributeSchema::new("region", AttributeType::String)
            .optional()
            .computed()
            .force_new()
            .with_validator(validation::region())
            .with_description("The region you want to attach the resource to")
    }

    /// `project_id` attribute of project-scoped resources
    pub fn project_id() -> AttributeSchema {
        AttributeSchema::new("project_id", AttributeType::String)
            .optional()
            .computed()
            .force_new()
            .with_validator(validation::uuid())
            .with_description("The project_id you want to attach the resource to")
    }

    /// `organization_id` attribute, always server-assigned
    pub fn organization_id() -> AttributeSchema {
        AttributeSchema::new("organization_id", AttributeType::String)
            .computed()
            .with_description("The organization_id the resource is associated to")
    }

    /// `tags` list of strings
    pub fn tags() -> AttributeSchema {
        AttributeSchema::new("tags", AttributeType::List(Box::new(AttributeType::String)))
            .optional()
            .with_description("The tags associated with the resource")
    }

    /// Read-only RFC-3339 timestamp
    pub fn timestamp(name: &str) -> AttributeSchema {
        AttributeSchema::new(name, AttributeType::String)
            .computed()
            .with_description(format!("Date and time of {} (RFC 3339 format)", name.replace('_', " ")))
    }
}
