//! BlueprintBuilder for fluent registration of blueprint routes

use super::handler::BlueprintEndpoint;
use super::router::{axum_paths, method_filter};
use crate::config::options::{OptionsHook, RouteOptions};
use crate::config::{BlueprintConfig, PluginOptions, ResolvedRoute, resolve_route};
use crate::core::auth::{AuthProvider, NoAuthProvider};
use crate::core::error::{BlueprintResult, ConfigError};
use crate::core::model::{Model, ModelRegistry};
use crate::core::request::BlueprintRequest;
use crate::core::value::merge_maps;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::routing::on;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// A route to register: methods, path and its own options
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    pub methods: Vec<Method>,
    pub path: String,
    pub options: Value,
    pub hook: Option<OptionsHook>,
}

impl RouteDefinition {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self::with_methods(vec![method], path)
    }

    /// A route answering several methods (`POST` + `PATCH` for update)
    pub fn with_methods(methods: Vec<Method>, path: impl Into<String>) -> Self {
        Self {
            methods,
            path: path.into(),
            options: Value::Null,
            hook: None,
        }
    }

    pub fn options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    /// Per-request options transform for this route only
    pub fn with_options_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(RouteOptions, &BlueprintRequest) -> RouteOptions + Send + Sync + 'static,
    {
        self.hook = Some(OptionsHook::new(hook));
        self
    }
}

/// Builder turning route definitions into an axum [`Router`]
///
/// # Example
///
/// ```ignore
/// let app = BlueprintBuilder::new(PluginOptions::new())
///     .with_model(store.model(zoo_schema))
///     .route(RouteDefinition::new(Method::GET, "/zoo"))
///     .route(RouteDefinition::new(Method::GET, "/zoo/{id}"))
///     .build()?;
/// ```
pub struct BlueprintBuilder {
    plugin: PluginOptions,
    registry: ModelRegistry,
    auth: Arc<dyn AuthProvider>,
    routes: Vec<RouteDefinition>,
}

impl BlueprintBuilder {
    pub fn new(plugin: PluginOptions) -> Self {
        Self {
            plugin,
            registry: ModelRegistry::new(),
            auth: Arc::new(NoAuthProvider),
            routes: Vec::new(),
        }
    }

    /// Use an existing registry, replacing any model registered so far
    pub fn with_models(mut self, registry: ModelRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register one model under its identity
    pub fn with_model(mut self, model: Arc<dyn Model>) -> Self {
        self.registry.register(model);
        self
    }

    pub fn with_auth_provider(mut self, auth: impl AuthProvider + 'static) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    pub fn route(mut self, route: RouteDefinition) -> Self {
        self.routes.push(route);
        self
    }

    /// Add the plugin options and every route of a configuration document
    ///
    /// The document's plugin options are merged over the ones given to [`new`](Self::new).
    pub fn register_config(mut self, config: BlueprintConfig) -> BlueprintResult<Self> {
        merge_maps(&mut self.plugin.values, &config.plugin);

        for route in config.routes {
            let methods = route.method.to_methods()?;
            self.routes
                .push(RouteDefinition::with_methods(methods, route.path).options(route.options));
        }

        Ok(self)
    }

    /// Resolve every route without building the router
    ///
    /// Fails on the first route that cannot be registered.
    pub fn resolve(&self) -> BlueprintResult<Vec<ResolvedRoute>> {
        self.routes
            .iter()
            .map(|route| {
                resolve_route(
                    &self.plugin,
                    &route.methods,
                    &route.path,
                    &route.options,
                    route.hook.clone(),
                    &self.registry,
                )
            })
            .collect()
    }

    /// Build the router
    ///
    /// Every route is resolved and classified first; any registration error is
    /// returned and no router is produced.
    pub fn build(self) -> BlueprintResult<Router> {
        let resolved = self.resolve()?;
        let registry = Arc::new(self.registry);
        let mut mounted: HashSet<(String, Method)> = HashSet::new();
        let mut router = Router::new();

        for route in resolved {
            tracing::debug!(
                methods = ?route.methods,
                path = %route.path,
                action = %route.action,
                model = route.model.identity(),
                "registering blueprint route"
            );

            let paths = axum_paths(&route.path);
            for path in &paths {
                for method in &route.methods {
                    if !mounted.insert((path.clone(), method.clone())) {
                        return Err(ConfigError::InvalidPath {
                            path: route.path.clone(),
                            message: format!("{} {} is already registered", method, path),
                        }
                        .into());
                    }
                }
            }

            let filter = method_filter(&route.methods)?;
            let endpoint = Arc::new(BlueprintEndpoint {
                route,
                registry: registry.clone(),
                auth: self.auth.clone(),
            });

            for path in paths {
                let endpoint = endpoint.clone();
                router = router.route(
                    &path,
                    on(filter, move |request: Request<Body>| {
                        let endpoint = endpoint.clone();
                        async move { endpoint.handle(request).await }
                    }),
                );
            }
        }

        Ok(router.layer(TraceLayer::new_for_http()))
    }
}
