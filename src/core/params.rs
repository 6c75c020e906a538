//! Request → query translation
//!
//! [`ActionUtil`] pairs a request with the options in effect for it and derives
//! everything an action needs from the two: primary keys, criteria, values,
//! pagination, ownership checks, the `Location` of created records and the
//! fields to omit.

use crate::config::options::{RESERVED_QUERY_KEYS, RouteOptions};
use crate::core::error::{BlueprintError, BlueprintResult};
use crate::core::model::{Criteria, FindQuery, Populate, Record, RecordKey};
use crate::core::omit::{omit_fields, omit_paths};
use crate::core::query::{parse_limit, parse_populate, parse_skip, parse_sort};
use crate::core::request::BlueprintRequest;
use crate::core::value::{fill_defaults, get_path, loose_eq, merge_maps};
use serde_json::{Map, Value, json};

pub struct ActionUtil<'a> {
    pub request: &'a BlueprintRequest,
    pub options: &'a RouteOptions,
}

impl<'a> ActionUtil<'a> {
    pub fn new(request: &'a BlueprintRequest, options: &'a RouteOptions) -> Self {
        Self { request, options }
    }

    // =========================================================================
    // Primary keys
    // =========================================================================

    /// Resolve the parent (`child == false`) or child record key
    ///
    /// Parent keys on a rewritten user path come from the caller's claims. Otherwise
    /// the static `id` wins, then `where.id`, then the route parameter.
    pub fn parse_pk(&self, child: bool) -> Option<RecordKey> {
        let value = if !child && self.options.private.act_as_user_modified_path {
            self.request.claim(&self.options.user_id_property).cloned()
        } else {
            self.static_or_param_pk(child)
        };

        let value = value.filter(is_usable_key)?;

        Some(match self.options.pk_attr_for(child) {
            Some(attr) => {
                let mut filter = Criteria::new();
                filter.insert(attr.to_string(), value);
                RecordKey::Filter(filter)
            }
            None => RecordKey::Value(value),
        })
    }

    fn static_or_param_pk(&self, child: bool) -> Option<Value> {
        let param_name = if child {
            self.options.associated_pk_name.as_deref()
        } else {
            self.options.pk_name.as_deref()
        };

        self.options
            .id
            .clone()
            .filter(is_usable_key)
            .or_else(|| {
                self.options
                    .where_clause
                    .as_ref()
                    .and_then(|w| w.get("id"))
                    .filter(|v| is_usable_key(v))
                    .cloned()
            })
            .or_else(|| {
                param_name
                    .and_then(|name| self.request.param(name))
                    .map(|v| Value::String(v.to_string()))
            })
    }

    /// Like [`parse_pk`](Self::parse_pk), failing when no key resolves
    pub fn require_pk(&self, child: bool) -> BlueprintResult<RecordKey> {
        if let Some(key) = self.parse_pk(child) {
            return Ok(key);
        }

        if !child
            && self.options.private.act_as_user_modified_path
            && !self.request.is_authenticated()
        {
            return Err(BlueprintError::unauthorized(
                "credentials are required to address your own record",
            ));
        }

        Err(BlueprintError::not_found(
            "No `id` parameter provided. (Even if the model's primary key is not named `id`, \
             the parameter is mapped to the proper primary key)",
        ))
    }

    // =========================================================================
    // Criteria
    // =========================================================================

    /// Filter for `find` and populate listings
    ///
    /// `?where=<json>` suppresses the query-parameter fallback. The static `where`
    /// option is merged over the result and wins on conflicts. Soft-delete and
    /// ownership clauses come last.
    pub fn parse_criteria(&self, child: bool) -> BlueprintResult<Criteria> {
        let mut criteria = match self.explicit_where()? {
            Some(criteria) => criteria,
            None => self.query_criteria(),
        };

        if let Some(static_where) = &self.options.where_clause {
            merge_maps(&mut criteria, static_where);
        }

        criteria.extend(self.check_deleted_flag());
        criteria.extend(self.owner_criteria(child)?);

        Ok(criteria)
    }

    fn explicit_where(&self) -> BlueprintResult<Option<Criteria>> {
        match self.request.query.get("where") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map.clone())),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
            Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(map)) => Ok(Some(map)),
                Ok(Value::Null) => Ok(None),
                Ok(other) => Err(BlueprintError::bad_request(format!(
                    "`where` must be a JSON object, got {}",
                    other
                ))),
                Err(e) => Err(BlueprintError::bad_request(format!(
                    "`where` is not valid JSON: {}",
                    e
                ))),
            },
            Some(other) => Err(BlueprintError::bad_request(format!(
                "`where` must be a JSON object, got {}",
                other
            ))),
        }
    }

    fn query_criteria(&self) -> Criteria {
        let blacklist = &self.options.criteria.blacklist;
        let jsonp = self.options.jsonp.as_deref();

        self.request
            .query
            .iter()
            .filter(|(key, _)| !RESERVED_QUERY_KEYS.contains(&key.as_str()))
            .filter(|(key, _)| !blacklist.iter().any(|b| b == *key))
            .filter(|(key, _)| Some(key.as_str()) != jsonp)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Soft-delete exclusion, empty when `deleted_flag` is off
    pub fn check_deleted_flag(&self) -> Criteria {
        let mut criteria = Criteria::new();
        if self.options.deleted_flag {
            criteria.insert(
                self.options.deleted_attr.clone(),
                json!({ "!": self.options.deleted_value }),
            );
        }
        criteria
    }

    fn owner_criteria(&self, child: bool) -> BlueprintResult<Criteria> {
        let attrs = self.options.owner_attrs_for(child);
        if !self.options.require_owner || attrs.is_empty() {
            return Ok(Criteria::new());
        }

        attrs
            .iter()
            .map(|(field, claim_path)| {
                let claim = self.request.claim(claim_path).ok_or_else(|| {
                    BlueprintError::unauthorized("credentials are required to list owned records")
                })?;
                Ok((field.clone(), claim.clone()))
            })
            .collect()
    }

    // =========================================================================
    // Values
    // =========================================================================

    /// Attribute values for create and update
    ///
    /// Default values fill the fields the payload leaves out (an explicit `null`
    /// in the payload is kept), blacklisted fields are dropped, then owner fields
    /// missing from the result are set from the claims when `set_owner` is on.
    pub fn parse_values(&self, child: bool) -> BlueprintResult<Record> {
        let mut values = match &self.request.payload {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(payload)) => payload.clone(),
            Some(_) => {
                return Err(BlueprintError::bad_request("payload must be a JSON object"));
            }
        };
        fill_defaults(&mut values, &self.options.values.defaults);

        for field in &self.options.values.blacklist {
            values.remove(field);
        }

        if self.options.set_owner {
            for (field, claim_path) in self.options.owner_attrs_for(child) {
                if values.get(field).is_some_and(|v| !v.is_null()) {
                    continue;
                }
                let claim = self.request.claim(claim_path).ok_or_else(|| {
                    BlueprintError::unauthorized("credentials are required to set the owner")
                })?;
                values.insert(field.clone(), claim.clone());
            }
        }

        Ok(values)
    }

    // =========================================================================
    // Ownership
    // =========================================================================

    /// Whether the caller owns `record`
    ///
    /// Always true unless `require_owner` is on and owner attributes are configured.
    pub fn valid_ownership(&self, record: &Record, child: bool) -> bool {
        let attrs = self.options.owner_attrs_for(child);
        if !self.options.require_owner || attrs.is_empty() {
            return true;
        }

        let Some(credentials) = &self.request.credentials else {
            return false;
        };

        attrs.iter().all(|(field, claim_path)| {
            match (record.get(field), get_path(credentials, claim_path)) {
                (Some(owner), Some(claim)) => loose_eq(owner, claim),
                _ => false,
            }
        })
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// Full listing query: criteria, pagination, sort and population
    pub fn find_query(&self, child: bool) -> BlueprintResult<FindQuery> {
        Ok(FindQuery::new(self.parse_criteria(child)?)
            .limit(Some(parse_limit(self.request, self.options)))
            .skip(parse_skip(self.request, self.options))
            .sort(parse_sort(self.request, self.options))
            .populate(self.populate_each()))
    }

    pub fn populate_each(&self) -> Vec<Populate> {
        parse_populate(self.request, self.options)
    }

    // =========================================================================
    // Response shaping
    // =========================================================================

    /// `Location` for a created record, when a template is configured
    pub fn created_location(&self, id: Option<&Value>) -> BlueprintResult<Option<String>> {
        let Some(template) = &self.options.created_location else {
            return Ok(None);
        };

        let mut context = tera::Context::new();
        match id {
            Some(id) => context.insert("id", id),
            None => context.insert("id", &Value::Null),
        }
        tera::Tera::one_off(template, &context, false)
            .map(Some)
            .map_err(|e| BlueprintError::internal(format!("created_location: {}", e)))
    }

    pub fn omit_fields(&self, body: &mut Value) {
        omit_fields(body, &omit_paths(self.request, self.options));
    }
}

/// Plain objects and empty values never address a record
fn is_usable_key(value: &Value) -> bool {
    match value {
        Value::Null | Value::Object(_) | Value::Array(_) => false,
        Value::String(s) => !s.is_empty(),
        Value::Bool(b) => *b,
        Value::Number(_) => true,
    }
}
