//! Resource - Attribute values and the per-call state handed to lifecycle callbacks

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::schema::ResourceSchema;

/// Attribute value of a resource
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    String(String),
    List(Vec<Value>),
    /// Unordered collection; equality ignores element order
    Set(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Nested block with its own attribute names
    Nested(AttributeMap),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Elements of a list or set
    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null, empty string and empty collections all count as "unset"
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::List(items) | Value::Set(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
            Value::Nested(attrs) => attrs.is_empty(),
            Value::Bool(_) | Value::Int(_) => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Set(_) => "Set",
            Value::Map(_) => "Map",
            Value::Nested(_) => "Nested",
        }
    }

    /// Build a list of strings
    pub fn string_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::List(items.into_iter().map(|s| Value::String(s.into())).collect())
    }

    /// Convert a JSON value into a Value
    ///
    /// Numbers that are not exact integers (fractions, or beyond `i64`) are
    /// kept as their decimal text so an `Int` attribute rejects them instead
    /// of silently truncating.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Value::Int(i),
                (None, Some(f)) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                    Value::Int(f as i64)
                }
                _ => Value::String(n.to_string()),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert this Value into JSON
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) | Value::Set(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Nested(attrs) => serde_json::Value::Object(
                attrs.iter().map(|(k, v)| (k.to_string(), v.to_json())).collect(),
            ),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => {
                a.len() == b.len()
                    && a.iter().all(|x| b.contains(x))
                    && b.iter().all(|x| a.contains(x))
            }
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Nested(a), Value::Nested(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from_json(&json))
    }
}

/// Format a timestamp attribute as RFC-3339, or Null when absent
pub fn flatten_time(time: Option<DateTime<Utc>>) -> Value {
    match time {
        Some(t) => Value::String(t.to_rfc3339_opts(SecondsFormat::Secs, true)),
        None => Value::Null,
    }
}

/// Mapping from attribute name to value.
///
/// Keys are unique. Iteration is by name; `ordered` yields the schema's
/// declaration order instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeMap(BTreeMap<String, Value>);

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace an attribute, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Non-empty string attribute
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// True when the attribute is present and not empty
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Entries in schema declaration order, followed by any attribute the
    /// schema does not know about
    pub fn ordered<'a>(&'a self, schema: &'a ResourceSchema) -> Vec<(&'a str, &'a Value)> {
        let mut entries: Vec<(&str, &Value)> = schema
            .attributes()
            .filter_map(|attr| self.0.get_key_value(&attr.name))
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        entries.extend(
            self.iter()
                .filter(|(k, _)| schema.get(k).is_none()),
        );
        entries
    }
}

impl FromIterator<(String, Value)> for AttributeMap {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Lifecycle of one managed object as seen by the skeleton
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Absent,
    Creating,
    Stable,
    Updating,
    Deleting,
    /// A Read observed the object missing; the host re-plans it
    Gone,
}

/// State handed to lifecycle callbacks: the stored ID, the working attribute
/// map and, for updates, the prior state used for change detection.
#[derive(Debug, Clone)]
pub struct ResourceData {
    id: String,
    attributes: AttributeMap,
    prior: Option<AttributeMap>,
    lifecycle: LifecycleState,
}

impl ResourceData {
    /// Desired state of a resource that does not exist yet
    pub fn new(config: AttributeMap) -> Self {
        Self {
            id: String::new(),
            attributes: config,
            prior: None,
            lifecycle: LifecycleState::Absent,
        }
    }

    /// Stored state of an existing resource
    pub fn from_state(id: impl Into<String>, state: AttributeMap) -> Self {
        Self {
            id: id.into(),
            attributes: state,
            prior: None,
            lifecycle: LifecycleState::Stable,
        }
    }

    /// Planned update: `desired` is what the host wants, `prior` what it last stored
    pub fn for_update(id: impl Into<String>, prior: AttributeMap, desired: AttributeMap) -> Self {
        Self {
            id: id.into(),
            attributes: desired,
            prior: Some(prior),
            lifecycle: LifecycleState::Stable,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Empty the ID; the host reads this as "the object is gone"
    pub fn clear_id(&mut self) {
        self.id.clear();
        self.lifecycle = LifecycleState::Gone;
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub(crate) fn set_lifecycle(&mut self, state: LifecycleState) {
        self.lifecycle = state;
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// Stored state an update started from
    pub fn prior(&self) -> Option<&AttributeMap> {
        self.prior.as_ref()
    }

    /// Keep the stored value of computed attributes the desired state leaves unset
    pub fn carry_computed(&mut self, schema: &ResourceSchema) {
        let Some(prior) = &self.prior else {
            return;
        };
        for attr in schema.attributes().filter(|a| a.computed) {
            if self.attributes.is_set(&attr.name) {
                continue;
            }
            if let Some(stored) = prior.get(&attr.name).filter(|v| !v.is_empty()) {
                self.attributes.insert(attr.name.clone(), stored.clone());
            }
        }
    }

    pub fn into_attributes(self) -> AttributeMap {
        self.attributes
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.attributes.get_str(name)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// Strings held by a list or set attribute; empty when unset
    pub fn get_string_list(&self, name: &str) -> Vec<String> {
        self.get(name)
            .and_then(Value::as_items)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name, value);
    }

    /// Whether the attribute differs from the prior state. Without a prior
    /// state (create), every set attribute counts as changed.
    pub fn has_change(&self, name: &str) -> bool {
        let current = self.attributes.get(name).filter(|v| !v.is_empty());
        match &self.prior {
            Some(prior) => current != prior.get(name).filter(|v| !v.is_empty()),
            None => current.is_some(),
        }
    }

    /// Names of every attribute that changed, in name order
    pub fn changed_attributes(&self) -> Vec<String> {
        let mut names: Vec<&str> = self.attributes.keys().collect();
        if let Some(prior) = &self.prior {
            names.extend(prior.keys().filter(|k| !self.attributes.contains_key(k)));
        }
        names.sort_unstable();
        names.dedup();
        names
            .into_iter()
            .filter(|name| self.has_change(name))
            .map(str::to_string)
            .collect()
    }

    /// Explicit-present marker for a partial update: `None` when unchanged,
    /// `Some("")` when the user cleared the value.
    pub fn patch_string(&self, name: &str) -> Option<String> {
        if !self.has_change(name) {
            return None;
        }
        Some(self.get_str(name).unwrap_or_default().to_string())
    }

    /// Explicit-present marker for a list attribute; an empty list clears it
    pub fn patch_string_list(&self, name: &str) -> Option<Vec<String>> {
        self.has_change(name).then(|| self.get_string_list(name))
    }
}
