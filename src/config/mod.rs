//! Configuration loading and management

pub mod options;
pub mod resolve;

pub use options::{OptionsHook, RouteOptions};
pub use resolve::{ResolvedRoute, resolve_route};

use crate::core::error::{BlueprintError, ConfigError};
use anyhow::Result;
use axum::http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Plugin-wide options, applied to every route before the route's own options
///
/// Built once at startup and passed by reference into route registration.
///
/// ```yaml
/// prefix: /v1
/// limit: 10
/// deleted_flag: true
/// ```
#[derive(Debug, Clone, Default)]
pub struct PluginOptions {
    /// Option values, same keys as [`RouteOptions`]
    pub values: Map<String, Value>,

    /// Fallback options hook for routes that do not declare their own
    pub hook: Option<OptionsHook>,
}

impl PluginOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object
    pub fn from_json(value: Value) -> Result<Self, BlueprintError> {
        match value {
            Value::Object(values) => Ok(Self { values, hook: None }),
            Value::Null => Ok(Self::default()),
            other => Err(ConfigError::InvalidValue {
                field: "plugin".to_string(),
                message: format!("expected an object, got {}", other),
            }
            .into()),
        }
    }

    /// Load options from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load options from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Ok(Self::from_json(value)?)
    }

    /// Set a single option
    pub fn set(mut self, key: &str, value: Value) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    pub fn with_options_hook(mut self, hook: OptionsHook) -> Self {
        self.hook = Some(hook);
        self
    }
}

/// One or several HTTP methods, as written in configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum MethodSpec {
    One(String),
    Many(Vec<String>),
}

impl MethodSpec {
    pub fn to_methods(&self) -> Result<Vec<Method>, ConfigError> {
        let names = match self {
            MethodSpec::One(one) => std::slice::from_ref(one),
            MethodSpec::Many(many) => many.as_slice(),
        };

        names
            .iter()
            .map(|name| {
                Method::from_bytes(name.trim().to_uppercase().as_bytes()).map_err(|e| {
                    ConfigError::InvalidValue {
                        field: "method".to_string(),
                        message: format!("'{}': {}", name, e),
                    }
                })
            })
            .collect()
    }
}

/// A route declared in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    #[serde(alias = "methods")]
    pub method: MethodSpec,
    pub path: String,
    #[serde(default)]
    pub options: Value,
}

/// Complete configuration: plugin options plus routes
///
/// ```yaml
/// plugin:
///   limit: 10
/// routes:
///   - method: GET
///     path: /zoo
///   - methods: [POST, PATCH]
///     path: /zoo/{id}
///     options:
///       omit: [secret]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BlueprintConfig {
    #[serde(default)]
    pub plugin: Map<String, Value>,

    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

impl BlueprintConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn plugin_options(&self) -> PluginOptions {
        PluginOptions {
            values: self.plugin.clone(),
            hook: None,
        }
    }
}
