//! Route option resolution
//!
//! Turns a route declaration (methods, path, JSON options) into finalized
//! [`RouteOptions`] and the [`Action`] it dispatches to. Everything here runs once,
//! at registration; any failure keeps the route from being registered.

use super::PluginOptions;
use super::options::{OptionsHook, RouteOptions};
use crate::core::classify::{Action, classify};
use crate::core::error::{BlueprintResult, ConfigError};
use crate::core::model::{Model, ModelRegistry};
use crate::core::path::{PathShape, analyze, normalize_path};
use crate::core::value::deep_merge;
use axum::http::Method;
use serde_json::Value;
use std::sync::Arc;

/// A route ready to be wired into the router
#[derive(Clone)]
pub struct ResolvedRoute {
    pub methods: Vec<Method>,
    /// Path as declared, used for routing
    pub path: String,
    /// Path after prefix, count and user-prefix transforms
    pub normalized_path: String,
    pub shape: PathShape,
    pub action: Action,
    pub options: RouteOptions,
    pub model: Arc<dyn Model>,
}

impl std::fmt::Debug for ResolvedRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedRoute")
            .field("methods", &self.methods)
            .field("path", &self.path)
            .field("normalized_path", &self.normalized_path)
            .field("action", &self.action)
            .field("model", &self.model.identity())
            .finish()
    }
}

/// Merge, complete and classify one route
pub fn resolve_route(
    plugin: &PluginOptions,
    methods: &[Method],
    path: &str,
    route_options: &Value,
    hook: Option<OptionsHook>,
    registry: &ModelRegistry,
) -> BlueprintResult<ResolvedRoute> {
    let merged = merge_layers(plugin, route_options)?;

    let mut options: RouteOptions =
        serde_json::from_value(merged).map_err(|e| ConfigError::InvalidValue {
            field: "options".to_string(),
            message: e.to_string(),
        })?;

    let normalized = normalize_path(path, &options.path_rewrite());
    options.private.count = normalized.count;
    options.private.act_as_user_modified_path = normalized.act_as_user;

    let shape = analyze(&normalized.path)?;
    fill_from_path(&mut options, &shape);

    let model_name = options.model.clone().ok_or_else(|| ConfigError::MissingModel {
        path: path.to_string(),
    })?;
    let model = registry
        .get(&model_name)
        .ok_or(ConfigError::UnknownModel { model: model_name })?;

    if options.associations.is_none() {
        options.associations = Some(model.schema().associations());
    }

    options.normalize_ownership();
    options.hook = hook.or_else(|| plugin.hook.clone());

    let action = classify(methods, &shape, options.private.count, path)?;

    if let Some(template) = &options.created_location {
        validate_location_template(template)?;
    }

    Ok(ResolvedRoute {
        methods: methods.to_vec(),
        path: path.to_string(),
        normalized_path: normalized.path,
        shape,
        action,
        options,
        model,
    })
}

/// defaults < plugin < route, as one JSON document
fn merge_layers(plugin: &PluginOptions, route_options: &Value) -> BlueprintResult<Value> {
    let mut merged = serde_json::to_value(RouteOptions::default()).map_err(|e| {
        ConfigError::InvalidValue {
            field: "options".to_string(),
            message: e.to_string(),
        }
    })?;

    let mut plugin_layer = Value::Object(plugin.values.clone());
    check_hooks(&mut plugin_layer)?;
    deep_merge(&mut merged, &plugin_layer);

    match route_options {
        Value::Object(_) => {
            let mut route_layer = route_options.clone();
            check_hooks(&mut route_layer)?;
            deep_merge(&mut merged, &route_layer);
        }
        Value::Null => {}
        other => {
            return Err(ConfigError::InvalidValue {
                field: "options".to_string(),
                message: format!("expected an object, got {}", other),
            }
            .into());
        }
    }

    Ok(merged)
}

/// Configuration data can only switch hooks off
///
/// Functions cannot be written in JSON or YAML, so any `hooks.options` value other
/// than `false`/`null` is a declaration of something that is not a function.
fn check_hooks(layer: &mut Value) -> Result<(), ConfigError> {
    let Some(hooks) = layer.as_object_mut().and_then(|map| map.remove("hooks")) else {
        return Ok(());
    };

    match hooks {
        Value::Null | Value::Bool(false) => Ok(()),
        Value::Object(map) => match map.get("options") {
            None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(()),
            Some(_) => Err(ConfigError::HookNotFunction),
        },
        _ => Err(ConfigError::HookNotFunction),
    }
}

/// Path-derived info only fills gaps
fn fill_from_path(options: &mut RouteOptions, shape: &PathShape) {
    let literal = |index: usize| shape.get(index).and_then(|s| s.literal()).map(str::to_string);
    let param = |index: usize| shape.get(index).and_then(|s| s.param()).map(str::to_string);

    if options.model.is_none() {
        options.model = literal(0);
    }
    if options.pk_name.is_none() {
        options.pk_name = param(1);
    }
    if options.association_attr.is_none() {
        options.association_attr = literal(2);
    }
    if options.associated_pk_name.is_none() {
        options.associated_pk_name = param(3);
    }
}

fn validate_location_template(template: &str) -> Result<(), ConfigError> {
    let mut context = tera::Context::new();
    context.insert("id", &0);
    tera::Tera::one_off(template, &context, false)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidValue {
            field: "created_location".to_string(),
            message: e.to_string(),
        })
}
