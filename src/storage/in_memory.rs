//! In-memory implementation of `Model` for testing and development
//!
//! All models created from one [`InMemoryStore`] share its tables, so associations
//! can be resolved across models:
//!
//! - `model: target` stores the target's key in the attribute itself
//! - `collection: target, via: attr` where `attr` is not a collection on the target
//!   is one-to-many: the target's `attr` holds the parent key
//! - `collection: target, via: attr` where `attr` is itself a collection is
//!   many-to-many, kept in a join set mirrored on both sides

use super::filter::{matches, sort_records};
use crate::core::error::{StorageError, StorageResult};
use crate::core::model::{
    AssociationDescriptor, AssociationKind, AttributeDef, Criteria, FindQuery, Model, ModelSchema,
    Populate, Record,
};
use crate::core::value::loose_eq;
use async_trait::async_trait;
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

const BACKEND: &str = "memory";

/// How primary keys are generated for records created without one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdStrategy {
    /// 1, 2, 3, ... per model
    #[default]
    Increment,
    /// Random v4 UUID strings
    Uuid,
}

/// How a collection association is stored
enum CollectionLink {
    /// The child's `via` attribute holds the parent key
    Foreign { via: String },
    /// Pairs in the join set of `(model, alias)`, mirrored on `(target, via)` if any
    Join { mirror: Option<String> },
}

#[derive(Default)]
struct StoreState {
    schemas: HashMap<String, ModelSchema>,
    tables: HashMap<String, IndexMap<String, Record>>,
    counters: HashMap<String, u64>,
    /// (model, alias) → (parent key, child key)
    joins: HashMap<(String, String), IndexSet<(String, String)>>,
}

/// Shared tables for a set of in-memory models
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
    ids: IdStrategy,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_strategy(mut self, ids: IdStrategy) -> Self {
        self.ids = ids;
        self
    }

    /// Create the model for `schema`, registering its table
    pub fn model(&self, schema: ModelSchema) -> Arc<InMemoryModel> {
        if let Ok(mut state) = self.state.write() {
            state
                .tables
                .entry(schema.identity.clone())
                .or_default();
            state.schemas.insert(schema.identity.clone(), schema.clone());
        }

        Arc::new(InMemoryModel {
            schema,
            store: self.clone(),
        })
    }

    /// Load fixture records into a model's table
    pub fn seed(&self, identity: &str, records: Vec<Value>) -> StorageResult<Vec<Record>> {
        let mut state = self.write()?;
        records
            .into_iter()
            .map(|record| match record {
                Value::Object(values) => state.insert(identity, values, self.ids),
                other => Err(StorageError::Validation {
                    message: format!("fixture for '{}' is not an object: {}", identity, other),
                    details: None,
                }),
            })
            .collect()
    }

    /// Link two existing records through a collection association
    pub fn link(&self, identity: &str, key: &Value, alias: &str, child: &Value) -> StorageResult<()> {
        self.write()?.add(identity, key, alias, child)
    }

    fn read(&self) -> StorageResult<std::sync::RwLockReadGuard<'_, StoreState>> {
        self.state.read().map_err(|e| StorageError::Backend {
            backend: BACKEND.to_string(),
            message: format!("Failed to acquire read lock: {}", e),
        })
    }

    fn write(&self) -> StorageResult<std::sync::RwLockWriteGuard<'_, StoreState>> {
        self.state.write().map_err(|e| StorageError::Backend {
            backend: BACKEND.to_string(),
            message: format!("Failed to acquire write lock: {}", e),
        })
    }
}

/// Key under which a record is stored; `1` and `"1"` address the same row
fn key_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl StoreState {
    fn schema(&self, identity: &str) -> StorageResult<&ModelSchema> {
        self.schemas.get(identity).ok_or_else(|| StorageError::Backend {
            backend: BACKEND.to_string(),
            message: format!("unknown model '{}'", identity),
        })
    }

    fn table(&self, identity: &str) -> StorageResult<&IndexMap<String, Record>> {
        self.tables.get(identity).ok_or_else(|| StorageError::Backend {
            backend: BACKEND.to_string(),
            message: format!("unknown model '{}'", identity),
        })
    }

    fn table_mut(&mut self, identity: &str) -> StorageResult<&mut IndexMap<String, Record>> {
        self.tables.get_mut(identity).ok_or_else(|| StorageError::Backend {
            backend: BACKEND.to_string(),
            message: format!("unknown model '{}'", identity),
        })
    }

    fn association(&self, identity: &str, alias: &str) -> StorageResult<AssociationDescriptor> {
        self.schema(identity)?
            .association(alias)
            .ok_or_else(|| StorageError::UnknownAssociation {
                model: identity.to_string(),
                alias: alias.to_string(),
            })
    }

    fn collection_link(&self, association: &AssociationDescriptor) -> CollectionLink {
        let Some(via) = &association.via else {
            return CollectionLink::Join { mirror: None };
        };

        let via_is_collection = self
            .schemas
            .get(&association.target)
            .and_then(|target| target.attributes.get(via))
            .is_some_and(|def| matches!(def, AttributeDef::Spec(spec) if spec.collection.is_some()));

        if via_is_collection {
            CollectionLink::Join {
                mirror: Some(via.clone()),
            }
        } else {
            CollectionLink::Foreign { via: via.clone() }
        }
    }

    fn insert(&mut self, identity: &str, mut values: Record, ids: IdStrategy) -> StorageResult<Record> {
        let schema = self.schema(identity)?.clone();
        let pk = schema.primary_key.clone();

        // Collection aliases given on create are linked once the record exists
        let mut pending_links = Vec::new();
        for association in schema.associations() {
            if association.kind == AssociationKind::Collection
                && let Some(children) = values.remove(&association.alias)
            {
                pending_links.push((association.alias, children));
            }
        }

        let key_value = match values.get(&pk).filter(|v| !v.is_null()) {
            Some(value) => value.clone(),
            None => match ids {
                IdStrategy::Increment => {
                    let table = self.table(identity)?;
                    let mut next = self.counters.get(identity).copied().unwrap_or(0) + 1;
                    while table.contains_key(&next.to_string()) {
                        next += 1;
                    }
                    Value::from(next)
                }
                IdStrategy::Uuid => Value::String(Uuid::new_v4().to_string()),
            },
        };

        let key = key_of(&key_value);
        if self.table(identity)?.contains_key(&key) {
            return Err(StorageError::Validation {
                message: format!("a '{}' record with {} '{}' already exists", identity, pk, key),
                details: Some(serde_json::json!({ (pk.clone()): ["unique"] })),
            });
        }

        if let Some(n) = key_value.as_u64() {
            let counter = self.counters.entry(identity.to_string()).or_insert(0);
            *counter = (*counter).max(n);
        }

        let now = Value::String(chrono::Utc::now().to_rfc3339());
        values.insert(pk, key_value.clone());
        values.entry("createdAt").or_insert_with(|| now.clone());
        values.entry("updatedAt").or_insert(now);

        self.table_mut(identity)?.insert(key, values);

        for (alias, children) in pending_links {
            let children = match children {
                Value::Array(children) => children,
                Value::Null => Vec::new(),
                single => vec![single],
            };
            for child in children {
                match self.add(identity, &key_value, &alias, &child) {
                    Ok(()) => {}
                    Err(e) if e.is_duplicate_link() => {}
                    Err(e) => return Err(e),
                }
            }
        }

        self.get(identity, &key_value)
    }

    fn get(&self, identity: &str, key: &Value) -> StorageResult<Record> {
        self.table(identity)?
            .get(&key_of(key))
            .cloned()
            .ok_or_else(|| StorageError::MissingRecord {
                model: identity.to_string(),
                key: key_of(key),
            })
    }

    fn select(&self, identity: &str, query: &FindQuery) -> StorageResult<Vec<Record>> {
        self.select_where(identity, query, |_| true)
    }

    fn select_where(
        &self,
        identity: &str,
        query: &FindQuery,
        keep: impl Fn(&Record) -> bool,
    ) -> StorageResult<Vec<Record>> {
        let mut records: Vec<Record> = self
            .table(identity)?
            .values()
            .filter(|record| keep(*record) && matches(record, &query.criteria))
            .cloned()
            .collect();

        if let Some(sort) = &query.sort {
            sort_records(&mut records, sort);
        }

        records
            .into_iter()
            .skip(query.skip as usize)
            .take(query.limit.map_or(usize::MAX, |l| l as usize))
            .map(|record| self.populate(identity, record, &query.populate))
            .collect()
    }

    fn populate(&self, identity: &str, mut record: Record, populate: &[Populate]) -> StorageResult<Record> {
        if populate.is_empty() {
            return Ok(record);
        }

        let pk = self.schema(identity)?.primary_key.clone();
        let key = record.get(&pk).cloned().unwrap_or(Value::Null);

        for entry in populate {
            let association = self.association(identity, &entry.alias)?;
            let value = match association.kind {
                AssociationKind::Single => {
                    let target_key = record.get(&entry.alias).cloned().unwrap_or(Value::Null);
                    if target_key.is_null() {
                        Value::Null
                    } else {
                        self.table(&association.target)?
                            .get(&key_of(&target_key))
                            .cloned()
                            .map(Value::Object)
                            .unwrap_or(Value::Null)
                    }
                }
                AssociationKind::Collection => Value::Array(
                    self.children(identity, &key, &association, &entry.query)?
                        .into_iter()
                        .map(Value::Object)
                        .collect(),
                ),
            };
            record.insert(entry.alias.clone(), value);
        }

        Ok(record)
    }

    fn children(
        &self,
        identity: &str,
        key: &Value,
        association: &AssociationDescriptor,
        query: &FindQuery,
    ) -> StorageResult<Vec<Record>> {
        match self.collection_link(association) {
            CollectionLink::Foreign { via } => {
                let mut scoped = query.clone();
                scoped.criteria.insert(via, key.clone());
                self.select(&association.target, &scoped)
            }
            CollectionLink::Join { .. } => {
                let parent = key_of(key);
                let linked: IndexSet<&String> = self
                    .joins
                    .get(&(identity.to_string(), association.alias.clone()))
                    .map(|pairs| {
                        pairs
                            .iter()
                            .filter(|(p, _)| *p == parent)
                            .map(|(_, child)| child)
                            .collect()
                    })
                    .unwrap_or_default();
                let target_pk = self.schema(&association.target)?.primary_key.clone();

                self.select_where(&association.target, query, |record| {
                    record
                        .get(&target_pk)
                        .is_some_and(|value| linked.contains(&key_of(value)))
                })
            }
        }
    }

    fn add(&mut self, identity: &str, key: &Value, alias: &str, child: &Value) -> StorageResult<()> {
        let association = self.association(identity, alias)?;
        if association.kind != AssociationKind::Collection {
            return Err(StorageError::UnknownAssociation {
                model: identity.to_string(),
                alias: alias.to_string(),
            });
        }

        let parent = self.get(identity, key)?;
        let child_record = self.get(&association.target, child)?;
        let parent_key = parent_key_value(self, identity, &parent)?;
        let child_key = parent_key_value(self, &association.target, &child_record)?;

        match self.collection_link(&association) {
            CollectionLink::Foreign { via } => {
                if child_record.get(&via).is_some_and(|v| loose_eq(v, &parent_key)) {
                    return Err(StorageError::DuplicateLink {
                        alias: alias.to_string(),
                        child: key_of(&child_key),
                    });
                }
                let row = self
                    .table_mut(&association.target)?
                    .get_mut(&key_of(&child_key))
                    .ok_or_else(|| StorageError::MissingRecord {
                        model: association.target.clone(),
                        key: key_of(&child_key),
                    })?;
                row.insert(via, parent_key);
                touch(row);
            }
            CollectionLink::Join { mirror } => {
                let inserted = self
                    .joins
                    .entry((identity.to_string(), alias.to_string()))
                    .or_default()
                    .insert((key_of(&parent_key), key_of(&child_key)));
                if !inserted {
                    return Err(StorageError::DuplicateLink {
                        alias: alias.to_string(),
                        child: key_of(&child_key),
                    });
                }
                if let Some(mirror) = mirror {
                    self.joins
                        .entry((association.target.clone(), mirror))
                        .or_default()
                        .insert((key_of(&child_key), key_of(&parent_key)));
                }
            }
        }

        Ok(())
    }

    fn remove(&mut self, identity: &str, key: &Value, alias: &str, child: &Value) -> StorageResult<()> {
        let association = self.association(identity, alias)?;
        let (parent, child) = (key_of(key), key_of(child));

        match self.collection_link(&association) {
            CollectionLink::Foreign { via } => {
                if let Some(row) = self.table_mut(&association.target)?.get_mut(&child)
                    && row.get(&via).is_some_and(|v| key_of(v) == parent)
                {
                    row.insert(via, Value::Null);
                    touch(row);
                }
            }
            CollectionLink::Join { mirror } => {
                if let Some(pairs) = self.joins.get_mut(&(identity.to_string(), alias.to_string())) {
                    pairs.shift_remove(&(parent.clone(), child.clone()));
                }
                if let Some(mirror) = mirror
                    && let Some(pairs) = self.joins.get_mut(&(association.target.clone(), mirror))
                {
                    pairs.shift_remove(&(child, parent));
                }
            }
        }

        Ok(())
    }

    /// Drop every join pair that mentions a removed record
    fn forget(&mut self, identity: &str, key: &str) {
        for ((model, alias), pairs) in self.joins.iter_mut() {
            let target = self
                .schemas
                .get(model)
                .and_then(|schema| schema.association(alias))
                .map(|association| association.target);

            pairs.retain(|(parent, child)| {
                let parent_match = model == identity && parent == key;
                let child_match = target.as_deref() == Some(identity) && child == key;
                !(parent_match || child_match)
            });
        }
    }
}

fn parent_key_value(state: &StoreState, identity: &str, record: &Record) -> StorageResult<Value> {
    let pk = &state.schema(identity)?.primary_key;
    Ok(record.get(pk).cloned().unwrap_or(Value::Null))
}

fn touch(record: &mut Record) {
    record.insert(
        "updatedAt".to_string(),
        Value::String(chrono::Utc::now().to_rfc3339()),
    );
}

/// A model backed by an [`InMemoryStore`]
pub struct InMemoryModel {
    schema: ModelSchema,
    store: InMemoryStore,
}

#[async_trait]
impl Model for InMemoryModel {
    fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    async fn find_one(
        &self,
        criteria: &Criteria,
        populate: &[Populate],
    ) -> StorageResult<Option<Record>> {
        let state = self.store.read()?;
        let query = FindQuery::new(criteria.clone())
            .limit(Some(1))
            .populate(populate.to_vec());
        Ok(state.select(self.identity(), &query)?.into_iter().next())
    }

    async fn find(&self, query: &FindQuery) -> StorageResult<Vec<Record>> {
        self.store.read()?.select(self.identity(), query)
    }

    async fn count(&self, criteria: &Criteria) -> StorageResult<u64> {
        let state = self.store.read()?;
        let count = state
            .table(self.identity())?
            .values()
            .filter(|record| matches(record, criteria))
            .count();
        Ok(count as u64)
    }

    async fn create(&self, values: Record) -> StorageResult<Record> {
        self.store.write()?.insert(self.identity(), values, self.store.ids)
    }

    async fn update(&self, criteria: &Criteria, values: Record) -> StorageResult<Vec<Record>> {
        let mut state = self.store.write()?;
        let table = state.table_mut(self.identity())?;

        let mut updated = Vec::new();
        for record in table.values_mut().filter(|record| matches(record, criteria)) {
            for (field, value) in &values {
                record.insert(field.clone(), value.clone());
            }
            touch(record);
            updated.push(record.clone());
        }

        Ok(updated)
    }

    async fn destroy(&self, criteria: &Criteria) -> StorageResult<Vec<Record>> {
        let mut state = self.store.write()?;
        let table = state.table_mut(self.identity())?;

        let keys: Vec<String> = table
            .iter()
            .filter(|(_, record)| matches(record, criteria))
            .map(|(key, _)| key.clone())
            .collect();

        let mut destroyed = Vec::with_capacity(keys.len());
        for key in &keys {
            if let Some(record) = table.shift_remove(key) {
                destroyed.push(record);
            }
        }
        for key in &keys {
            state.forget(self.identity(), key);
        }

        Ok(destroyed)
    }

    async fn add_to_collection(
        &self,
        primary_key: &Value,
        alias: &str,
        child_key: &Value,
    ) -> StorageResult<()> {
        self.store
            .write()?
            .add(self.identity(), primary_key, alias, child_key)
    }

    async fn remove_from_collection(
        &self,
        primary_key: &Value,
        alias: &str,
        child_key: &Value,
    ) -> StorageResult<()> {
        self.store
            .write()?
            .remove(self.identity(), primary_key, alias, child_key)
    }
}
