//! Model capability interface and registry
//!
//! The ORM is an external collaborator. Blueprints only need the small set of
//! capabilities captured by [`Model`]; any storage backend implementing it can be
//! driven by the action handlers. [`ModelRegistry`] maps model identities to
//! implementations and is resolved once while routes are registered.

use crate::core::error::StorageResult;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A stored record, as the JSON object the storage layer returns
pub type Record = Map<String, Value>;

/// A filter: field name to value or modifier object (`{"!": 1}`, `{">": 3}`, ...)
pub type Criteria = Map<String, Value>;

/// Key used to address a single record
///
/// Scalars address the model's primary key; filters come from a custom
/// primary-key attribute (`pk_attr`) and are used as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordKey {
    Value(Value),
    Filter(Criteria),
}

impl RecordKey {
    /// Turn the key into criteria for a model whose primary key is `primary_key`
    pub fn to_criteria(&self, primary_key: &str) -> Criteria {
        match self {
            RecordKey::Value(value) => {
                let mut criteria = Criteria::new();
                criteria.insert(primary_key.to_string(), value.clone());
                criteria
            }
            RecordKey::Filter(filter) => filter.clone(),
        }
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKey::Value(Value::String(s)) => write!(f, "{}", s),
            RecordKey::Value(value) => write!(f, "{}", value),
            RecordKey::Filter(filter) => write!(f, "{}", Value::Object(filter.clone())),
        }
    }
}

/// Population of one association on the records a query returns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Populate {
    pub alias: String,
    pub query: FindQuery,
}

impl Populate {
    pub fn new(alias: impl Into<String>, query: FindQuery) -> Self {
        Self {
            alias: alias.into(),
            query,
        }
    }
}

/// A find query with its modifiers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub criteria: Criteria,
    pub limit: Option<u64>,
    pub skip: u64,
    /// Sort clause such as `"name ASC"` or `"calories DESC, name ASC"`
    pub sort: Option<String>,
    pub populate: Vec<Populate>,
}

impl FindQuery {
    pub fn new(criteria: Criteria) -> Self {
        Self {
            criteria,
            ..Default::default()
        }
    }

    pub fn limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn sort(mut self, sort: Option<String>) -> Self {
        self.sort = sort;
        self
    }

    pub fn populate(mut self, populate: Vec<Populate>) -> Self {
        self.populate = populate;
        self
    }
}

// =============================================================================
// Schema
// =============================================================================

/// Attribute definition, either a bare type name or a detailed spec
///
/// ```yaml
/// attributes:
///   name: string
///   treats:
///     collection: treat
///     via: owner
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AttributeDef {
    Type(String),
    Spec(AttributeSpec),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AttributeSpec {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
    pub dominant: bool,
    pub required: bool,
}

/// Static description of a model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelSchema {
    pub identity: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    #[serde(default)]
    pub attributes: IndexMap<String, AttributeDef>,
}

fn default_primary_key() -> String {
    "id".to_string()
}

impl ModelSchema {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            primary_key: default_primary_key(),
            attributes: IndexMap::new(),
        }
    }

    pub fn attribute(mut self, name: impl Into<String>, def: AttributeDef) -> Self {
        self.attributes.insert(name.into(), def);
        self
    }

    /// Shorthand for a `collection` attribute
    pub fn collection(self, alias: &str, target: &str, via: Option<&str>) -> Self {
        self.attribute(
            alias,
            AttributeDef::Spec(AttributeSpec {
                collection: Some(target.to_string()),
                via: via.map(str::to_string),
                ..Default::default()
            }),
        )
    }

    /// Shorthand for a single-record (`model`) attribute
    pub fn single(self, alias: &str, target: &str) -> Self {
        self.attribute(
            alias,
            AttributeDef::Spec(AttributeSpec {
                model: Some(target.to_string()),
                ..Default::default()
            }),
        )
    }

    /// Derive association descriptors from the attributes
    ///
    /// Any attribute declaring a `model` or a `collection` is an association.
    pub fn associations(&self) -> Vec<AssociationDescriptor> {
        self.attributes
            .iter()
            .filter_map(|(alias, def)| match def {
                AttributeDef::Spec(spec) => AssociationDescriptor::from_spec(alias, spec),
                AttributeDef::Type(_) => None,
            })
            .collect()
    }

    pub fn association(&self, alias: &str) -> Option<AssociationDescriptor> {
        match self.attributes.get(alias)? {
            AttributeDef::Spec(spec) => AssociationDescriptor::from_spec(alias, spec),
            AttributeDef::Type(_) => None,
        }
    }
}

/// Cardinality of an association
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssociationKind {
    /// Points at one record (`model: target`)
    #[serde(rename = "model")]
    Single,
    /// Holds many records (`collection: target`)
    Collection,
}

/// A relation of a model, extracted from its schema
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssociationDescriptor {
    pub alias: String,
    #[serde(rename = "type")]
    pub kind: AssociationKind,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
}

impl AssociationDescriptor {
    fn from_spec(alias: &str, spec: &AttributeSpec) -> Option<Self> {
        let (kind, target) = match (&spec.model, &spec.collection) {
            (Some(model), _) => (AssociationKind::Single, model),
            (None, Some(collection)) => (AssociationKind::Collection, collection),
            (None, None) => return None,
        };

        Some(Self {
            alias: alias.to_string(),
            kind,
            target: target.clone(),
            via: spec.via.clone(),
        })
    }

    pub fn is_collection(&self) -> bool {
        self.kind == AssociationKind::Collection
    }
}

// =============================================================================
// Model trait
// =============================================================================

/// Capabilities a storage backend exposes for one model
///
/// Implementations are completely agnostic of HTTP. Populated associations are
/// returned inline: collections as arrays, single associations as an object or null.
#[async_trait]
pub trait Model: Send + Sync {
    fn schema(&self) -> &ModelSchema;

    fn identity(&self) -> &str {
        &self.schema().identity
    }

    fn primary_key(&self) -> &str {
        &self.schema().primary_key
    }

    /// Find the first record matching the criteria, populating the given associations
    async fn find_one(
        &self,
        criteria: &Criteria,
        populate: &[Populate],
    ) -> StorageResult<Option<Record>>;

    /// Find all records matching the query
    async fn find(&self, query: &FindQuery) -> StorageResult<Vec<Record>>;

    /// Count the records matching the criteria
    async fn count(&self, criteria: &Criteria) -> StorageResult<u64>;

    /// Create a record; the returned record carries its generated primary key
    async fn create(&self, values: Record) -> StorageResult<Record>;

    /// Update every record matching the criteria, returning the updated records
    async fn update(&self, criteria: &Criteria, values: Record) -> StorageResult<Vec<Record>>;

    /// Destroy every record matching the criteria, returning the destroyed records
    async fn destroy(&self, criteria: &Criteria) -> StorageResult<Vec<Record>>;

    /// Link a child into a collection association of a record
    ///
    /// Linking an already linked child fails with `StorageError::DuplicateLink`.
    async fn add_to_collection(
        &self,
        primary_key: &Value,
        alias: &str,
        child_key: &Value,
    ) -> StorageResult<()>;

    /// Unlink a child from a collection association of a record
    async fn remove_from_collection(
        &self,
        primary_key: &Value,
        alias: &str,
        child_key: &Value,
    ) -> StorageResult<()>;
}

// =============================================================================
// Registry
// =============================================================================

/// Registry of every model blueprints can target, keyed by identity
#[derive(Default, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, Arc<dyn Model>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            models: IndexMap::new(),
        }
    }

    /// Register a model under its own identity
    pub fn register(&mut self, model: Arc<dyn Model>) {
        self.models.insert(model.identity().to_string(), model);
    }

    /// Register a model under an explicit name (e.g. a plural alias)
    pub fn register_as(&mut self, name: impl Into<String>, model: Arc<dyn Model>) {
        self.models.insert(name.into(), model);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Model>> {
        self.models.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Get all registered model names
    pub fn names(&self) -> Vec<&str> {
        self.models.keys().map(|s| s.as_str()).collect()
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.names())
            .finish()
    }
}
