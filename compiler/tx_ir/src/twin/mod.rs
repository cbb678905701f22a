//! Twin data model and the property-bag capability.
//!
//! Twins are shared immutably (`Arc`) between the binder, expression trees
//! and caches. Their `contents` are a JSON-shaped [`PropertyMap`]; lookups go
//! through [`PropertyBag`] so callers never depend on a particular JSON
//! object model.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A twin shared between trees and services.
pub type TwinRef = Arc<Twin>;

/// A typed entity (asset, sensor, equipment) in the twin graph.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Twin {
    pub id: String,
    pub name: String,
    pub model_id: String,
    pub unit: Option<String>,
    pub trend_id: Option<String>,
    /// Haystack-style marker tags such as `zone air temp sensor`.
    pub tags: Vec<String>,
    pub contents: PropertyMap,
}

impl Twin {
    pub fn new(id: impl Into<String>, model_id: impl Into<String>) -> Self {
        let id = id.into();
        Twin {
            name: id.clone(),
            id,
            model_id: model_id.into(),
            ..Twin::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn with_trend_id(mut self, trend_id: impl Into<String>) -> Self {
        self.trend_id = Some(trend_id.into());
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Whether every space-separated word of `name` is one of the twin's
    /// tags, ignoring case and order.
    pub fn has_tags(&self, name: &str) -> bool {
        let mut words = name.split_whitespace().peekable();
        words.peek().is_some()
            && words.all(|word| self.tags.iter().any(|tag| tag.eq_ignore_ascii_case(word)))
    }

    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.contents.insert(name, value);
        self
    }

    pub fn into_ref(self) -> TwinRef {
        Arc::new(self)
    }

    /// Built-in twin fields addressable as `twin.field`.
    ///
    /// Returns `None` for unknown names. `contents` is deliberately absent;
    /// the binder reports it separately.
    pub fn field(&self, name: &str) -> Option<PropertyValue> {
        let text = |s: &str| Some(PropertyValue::String(s.to_owned()));
        match name.to_ascii_lowercase().as_str() {
            "id" => text(&self.id),
            "name" => text(&self.name),
            "modelid" => text(&self.model_id),
            "unit" => self.unit.as_deref().and_then(text),
            "trendid" => self.trend_id.as_deref().and_then(text),
            _ => None,
        }
    }
}

impl PartialEq for Twin {
    /// Twins are identified by id.
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Display for Twin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// A JSON-shaped property value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<PropertyValue>),
    Object(PropertyMap),
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => PropertyValue::Null,
            serde_json::Value::Bool(b) => PropertyValue::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(PropertyValue::Null, PropertyValue::Number),
            serde_json::Value::String(s) => PropertyValue::String(s),
            serde_json::Value::Array(items) => {
                PropertyValue::Array(items.into_iter().map(PropertyValue::from).collect())
            }
            serde_json::Value::Object(map) => PropertyValue::Object(PropertyMap::from(map)),
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<PropertyMap> for PropertyValue {
    fn from(value: PropertyMap) -> Self {
        PropertyValue::Object(value)
    }
}

/// Ordered name -> value map backing twin contents and object nodes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyMap(BTreeMap<String, PropertyValue>);

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Exact match first, then a case-insensitive scan.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.get(name).or_else(|| {
            self.0
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compact JSON rendering.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for PropertyMap {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        PropertyMap(
            map.into_iter()
                .map(|(k, v)| (k, PropertyValue::from(v)))
                .collect(),
        )
    }
}

impl FromIterator<(String, PropertyValue)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (String, PropertyValue)>>(iter: I) -> Self {
        PropertyMap(iter.into_iter().collect())
    }
}

/// Get-by-name capability over anything with named properties.
pub trait PropertyBag {
    fn property(&self, name: &str) -> Option<PropertyValue>;

    /// Walk a dotted path, descending through nested objects.
    fn property_path(&self, path: &[&str]) -> Option<PropertyValue> {
        let (first, rest) = path.split_first()?;
        let mut current = self.property(first)?;
        for segment in rest {
            current = match current {
                PropertyValue::Object(map) => map.get(segment)?.clone(),
                _ => return None,
            };
        }
        Some(current)
    }
}

impl PropertyBag for PropertyMap {
    fn property(&self, name: &str) -> Option<PropertyValue> {
        self.get(name).cloned()
    }
}

impl PropertyBag for Twin {
    /// Contents first, then the built-in fields.
    fn property(&self, name: &str) -> Option<PropertyValue> {
        self.contents.property(name).or_else(|| self.field(name))
    }
}

impl PropertyBag for serde_json::Map<String, serde_json::Value> {
    fn property(&self, name: &str) -> Option<PropertyValue> {
        self.get(name).cloned().map(PropertyValue::from)
    }
}

impl<T: PropertyBag + ?Sized> PropertyBag for Arc<T> {
    fn property(&self, name: &str) -> Option<PropertyValue> {
        (**self).property(name)
    }
}
