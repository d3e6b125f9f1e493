//! Declarative resource graph
//!
//! A `ResourceGraph` is an ordered list of typed resource declarations wired
//! together by attribute references. Building a graph has no side effects;
//! it is handed to the engine which plans and executes it.
//!
//! Registration validates each declaration as it is added, so declaration
//! order is always a valid dependency order.

pub mod cluster;

use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised while registering declarations against a graph
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("resource declaration for {type_token} has an empty {field}")]
    EmptyName {
        type_token: String,
        field: &'static str,
    },

    #[error("resource {name} of type {type_token} is already registered")]
    DuplicateResource { type_token: String, name: String },

    #[error("declaration key {0} is already in use")]
    DuplicateKey(String),

    #[error("resource {resource} references unknown resource {target}")]
    UnknownReference { resource: String, target: String },

    #[error("invalid property {property} on {resource}: {reason}")]
    InvalidProperty {
        resource: String,
        property: String,
        reason: String,
    },
}

/// A property value on a resource declaration
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<PropertyValue>),
    Object(Vec<(String, PropertyValue)>),
    /// Output attribute of another resource in the same graph
    Ref { resource: String, attribute: String },
}

impl PropertyValue {
    pub fn string(value: impl Into<String>) -> Self {
        PropertyValue::String(value.into())
    }

    pub fn reference(resource: impl Into<String>, attribute: impl Into<String>) -> Self {
        PropertyValue::Ref {
            resource: resource.into(),
            attribute: attribute.into(),
        }
    }

    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, PropertyValue)>) -> Self {
        PropertyValue::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            PropertyValue::Ref { resource, .. } => out.push(resource),
            PropertyValue::List(items) => items.iter().for_each(|item| item.collect_refs(out)),
            PropertyValue::Object(fields) => fields.iter().for_each(|(_, v)| v.collect_refs(out)),
            _ => {}
        }
    }

    fn to_yaml(&self) -> Value {
        match self {
            PropertyValue::String(s) => Value::String(s.clone()),
            PropertyValue::Int(i) => Value::Number((*i).into()),
            PropertyValue::Bool(b) => Value::Bool(*b),
            PropertyValue::List(items) => {
                Value::Sequence(items.iter().map(PropertyValue::to_yaml).collect())
            }
            PropertyValue::Object(fields) => Value::Mapping(to_mapping(fields)),
            PropertyValue::Ref {
                resource,
                attribute,
            } => Value::String(format!("${{{}.{}}}", resource, attribute)),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

fn to_mapping(fields: &[(String, PropertyValue)]) -> Mapping {
    let mut mapping = Mapping::new();
    for (key, value) in fields {
        mapping.insert(Value::String(key.clone()), value.to_yaml());
    }
    mapping
}

/// A single typed resource declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDeclaration {
    /// Key other declarations use to reference this one
    pub key: String,
    /// Provider type token, e.g. `random:index/randomPassword:RandomPassword`
    pub type_token: String,
    /// Logical resource name tracked by the engine
    pub name: String,
    pub properties: Vec<(String, PropertyValue)>,
}

impl ResourceDeclaration {
    pub fn new(key: impl Into<String>, type_token: impl Into<String>, name: impl Into<String>) -> Self {
        ResourceDeclaration {
            key: key.into(),
            type_token: type_token.into(),
            name: name.into(),
            properties: Vec::new(),
        }
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.push((name.into(), value.into()));
        self
    }

    /// Look up a top-level property by name
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

/// Ordered, validated set of resource declarations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceGraph {
    resources: Vec<ResourceDeclaration>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declaration, returning its key for use in references
    ///
    /// Fails on the first problem found; the graph is left unchanged.
    pub fn register(&mut self, declaration: ResourceDeclaration) -> Result<String, GraphError> {
        if declaration.key.trim().is_empty() {
            return Err(GraphError::EmptyName {
                type_token: declaration.type_token,
                field: "key",
            });
        }
        if declaration.name.trim().is_empty() {
            return Err(GraphError::EmptyName {
                type_token: declaration.type_token,
                field: "name",
            });
        }
        if self.get(&declaration.key).is_some() {
            return Err(GraphError::DuplicateKey(declaration.key));
        }
        if self
            .resources
            .iter()
            .any(|r| r.type_token == declaration.type_token && r.name == declaration.name)
        {
            return Err(GraphError::DuplicateResource {
                type_token: declaration.type_token,
                name: declaration.name,
            });
        }

        let known: HashSet<&str> = self.resources.iter().map(|r| r.key.as_str()).collect();
        let mut refs = Vec::new();
        for (_, value) in &declaration.properties {
            value.collect_refs(&mut refs);
        }
        if let Some(target) = refs.into_iter().find(|target| !known.contains(target)) {
            return Err(GraphError::UnknownReference {
                resource: declaration.key.clone(),
                target: target.to_string(),
            });
        }

        let key = declaration.key.clone();
        self.resources.push(declaration);
        Ok(key)
    }

    pub fn get(&self, key: &str) -> Option<&ResourceDeclaration> {
        self.resources.iter().find(|r| r.key == key)
    }

    pub fn resources(&self) -> &[ResourceDeclaration] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Render the graph as the `resources:` section of a Pulumi YAML program
    pub fn to_pulumi_resources(&self) -> Mapping {
        let mut resources = Mapping::new();
        for declaration in &self.resources {
            let mut body = Mapping::new();
            body.insert(
                Value::String("type".to_string()),
                Value::String(declaration.type_token.clone()),
            );
            body.insert(
                Value::String("name".to_string()),
                Value::String(declaration.name.clone()),
            );
            if !declaration.properties.is_empty() {
                body.insert(
                    Value::String("properties".to_string()),
                    Value::Mapping(to_mapping(&declaration.properties)),
                );
            }
            resources.insert(Value::String(declaration.key.clone()), Value::Mapping(body));
        }
        resources
    }
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
