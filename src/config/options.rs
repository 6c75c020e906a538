//! Per-route options
//!
//! [`RouteOptions`] is the single record every action handler reads. It is built
//! once per route by deep-merging three JSON layers over the built-in defaults:
//!
//! ```text
//! defaults  <  plugin options  <  route options  <  path-derived info (gaps only)
//! ```
//!
//! Keys are snake_case. Options that can be switched off by configuration
//! (`owner_attr`, `pk_attr`, `created_location`, ...) accept either a string or
//! `false`.

use crate::core::model::{AssociationDescriptor, Criteria};
use crate::core::path::PathRewrite;
use crate::core::request::BlueprintRequest;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::sync::Arc;

/// Query parameters that are never turned into criteria
pub const RESERVED_QUERY_KEYS: [&str; 6] = ["limit", "skip", "sort", "populate", "omit", "where"];

pub const DEFAULT_LIMIT: u64 = 30;
pub const DEFAULT_MAX_LIMIT: u64 = 30;
pub const DEFAULT_POPULATE_LIMIT: u64 = 30;

/// Per-request options transform
///
/// The hook receives its own copy of the route options and returns the options
/// the handler should use for this request only.
#[derive(Clone)]
pub struct OptionsHook(Arc<dyn Fn(RouteOptions, &BlueprintRequest) -> RouteOptions + Send + Sync>);

impl OptionsHook {
    pub fn new<F>(hook: F) -> Self
    where
        F: Fn(RouteOptions, &BlueprintRequest) -> RouteOptions + Send + Sync + 'static,
    {
        Self(Arc::new(hook))
    }

    pub fn call(&self, options: RouteOptions, request: &BlueprintRequest) -> RouteOptions {
        (self.0)(options, request)
    }
}

impl fmt::Debug for OptionsHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OptionsHook")
    }
}

/// Criteria extraction settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CriteriaOptions {
    pub blacklist: Vec<String>,
}

impl Default for CriteriaOptions {
    fn default() -> Self {
        Self {
            blacklist: RESERVED_QUERY_KEYS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Values extraction settings: a blacklist plus default values
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValuesOptions {
    pub blacklist: Vec<String>,
    /// Every other key is a default value the payload is merged over
    #[serde(flatten)]
    pub defaults: Map<String, Value>,
}

/// Flags derived from the route path, not meant to be configured by hand
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PrivateState {
    /// The route ends in `/count`
    pub count: bool,
    /// The path was rewritten from the user prefix; the primary key is the caller's identity
    pub act_as_user_modified_path: bool,
}

/// Finalized options of one blueprint route
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteOptions {
    // --- target ----------------------------------------------------------
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub association_attr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pk_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associated_pk_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associations: Option<Vec<AssociationDescriptor>>,

    // --- listing ---------------------------------------------------------
    pub populate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub populate_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,

    // --- extraction ------------------------------------------------------
    pub criteria: CriteriaOptions,
    pub values: ValuesOptions,
    /// Static filter merged over the request criteria
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<Criteria>,
    /// Static primary key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Dotted field paths removed from every response
    #[serde(deserialize_with = "one_or_many")]
    pub omit: Vec<String>,

    // --- routing ---------------------------------------------------------
    #[serde(with = "str_or_false")]
    pub prefix: Option<String>,
    /// Name of the JSONP callback query parameter, excluded from criteria
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jsonp: Option<String>,
    /// `Location` template for created records, rendered with `id`
    #[serde(with = "str_or_false")]
    pub created_location: Option<String>,

    // --- identity --------------------------------------------------------
    pub act_as_user: bool,
    #[serde(with = "str_or_false")]
    pub user_url_prefix: Option<String>,
    #[serde(with = "str_or_false")]
    pub user_model: Option<String>,
    pub user_id_property: String,

    // --- ownership -------------------------------------------------------
    pub set_owner: bool,
    pub require_owner: bool,
    #[serde(with = "str_or_false")]
    pub owner_attr: Option<String>,
    /// Record field → claim path
    pub owner_attrs: IndexMap<String, String>,
    #[serde(with = "str_or_false")]
    pub child_owner_attr: Option<String>,
    pub child_owner_attrs: IndexMap<String, String>,

    // --- soft delete -----------------------------------------------------
    pub deleted_flag: bool,
    pub deleted_attr: String,
    pub deleted_value: Value,

    // --- custom primary keys ---------------------------------------------
    #[serde(with = "str_or_false")]
    pub pk_attr: Option<String>,
    #[serde(with = "str_or_false")]
    pub child_pk_attr: Option<String>,

    #[serde(rename = "_private")]
    pub private: PrivateState,

    #[serde(skip)]
    pub hook: Option<OptionsHook>,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            model: None,
            association_attr: None,
            pk_name: None,
            associated_pk_name: None,
            associations: None,
            populate: false,
            populate_limit: None,
            limit: None,
            max_limit: None,
            skip: None,
            sort: None,
            criteria: CriteriaOptions::default(),
            values: ValuesOptions::default(),
            where_clause: None,
            id: None,
            omit: Vec::new(),
            prefix: None,
            jsonp: None,
            created_location: None,
            act_as_user: false,
            user_url_prefix: Some("/user".to_string()),
            user_model: Some("users".to_string()),
            user_id_property: "id".to_string(),
            set_owner: false,
            require_owner: false,
            owner_attr: Some("owner".to_string()),
            owner_attrs: IndexMap::new(),
            child_owner_attr: Some("owner".to_string()),
            child_owner_attrs: IndexMap::new(),
            deleted_flag: false,
            deleted_attr: "deleted".to_string(),
            deleted_value: json!(1),
            pk_attr: None,
            child_pk_attr: None,
            private: PrivateState::default(),
            hook: None,
        }
    }
}

impl RouteOptions {
    /// Inputs of the pre-classification path transforms
    pub fn path_rewrite(&self) -> PathRewrite<'_> {
        PathRewrite {
            prefix: self.prefix.as_deref(),
            act_as_user: self.act_as_user,
            user_url_prefix: self.user_url_prefix.as_deref(),
            user_model: self.user_model.as_deref(),
        }
    }

    /// Fold the short `owner_attr` / `child_owner_attr` forms into the map forms
    ///
    /// An existing entry for the same field is kept.
    pub fn normalize_ownership(&mut self) {
        if let Some(attr) = self.owner_attr.clone() {
            self.owner_attrs
                .entry(attr)
                .or_insert_with(|| self.user_id_property.clone());
        }
        if let Some(attr) = self.child_owner_attr.clone() {
            self.child_owner_attrs
                .entry(attr)
                .or_insert_with(|| self.user_id_property.clone());
        }
    }

    /// Options for one request: a fresh copy, passed through the hook if any
    pub fn for_request(&self, request: &BlueprintRequest) -> RouteOptions {
        let copy = self.clone();
        match &self.hook {
            Some(hook) => hook.call(copy, request),
            None => copy,
        }
    }

    pub fn owner_attrs_for(&self, child: bool) -> &IndexMap<String, String> {
        if child {
            &self.child_owner_attrs
        } else {
            &self.owner_attrs
        }
    }

    pub fn pk_attr_for(&self, child: bool) -> Option<&str> {
        if child {
            self.child_pk_attr.as_deref()
        } else {
            self.pk_attr.as_deref()
        }
    }

    pub fn association(&self, alias: &str) -> Option<&AssociationDescriptor> {
        self.associations
            .as_ref()?
            .iter()
            .find(|association| association.alias == alias)
    }

    pub fn count(&self) -> bool {
        self.private.count
    }
}

/// `omit: name` and `omit: [name, owner.secret]` are both accepted
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(one)) => vec![one],
        Some(OneOrMany::Many(many)) => many,
        None => Vec::new(),
    })
}

/// A string, or `false` to switch the option off
mod str_or_false {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(text) => serializer.serialize_str(text),
            None => serializer.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Flag(bool),
        }

        match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Text(text)) if !text.is_empty() => Ok(Some(text)),
            Some(Raw::Text(_)) | Some(Raw::Flag(false)) | None => Ok(None),
            Some(Raw::Flag(true)) => Err(D::Error::custom("expected a string or false")),
        }
    }
}
