//! Blueprint action handlers
//!
//! Each action is a short async pipeline over [`Model`] calls. Handlers share an
//! [`ActionContext`] carrying the target model, the registry (to reach child
//! models), the request and the per-request options, and return a
//! [`BlueprintResponse`]. Errors are plain [`BlueprintError`]s; the server turns
//! them into responses at the handler boundary.

pub mod add;
pub mod create;
pub mod destroy;
pub mod find;
pub mod find_one;
pub mod populate;
pub mod remove;
pub mod update;

use crate::config::options::RouteOptions;
use crate::core::classify::Action;
use crate::core::error::{BlueprintError, BlueprintResult};
use crate::core::model::{AssociationDescriptor, Criteria, Model, ModelRegistry, Record, RecordKey};
use crate::core::params::ActionUtil;
use crate::core::request::BlueprintRequest;
use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use std::sync::Arc;

/// What an action produced: a status, an optional JSON body and `Location`
#[derive(Debug, Clone, PartialEq)]
pub struct BlueprintResponse {
    pub status: StatusCode,
    pub body: Option<Value>,
    pub location: Option<String>,
}

impl BlueprintResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: Some(body),
            location: None,
        }
    }

    pub fn created(body: Value, location: Option<String>) -> Self {
        Self {
            status: StatusCode::CREATED,
            body: Some(body),
            location,
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: None,
            location: None,
        }
    }
}

impl IntoResponse for BlueprintResponse {
    fn into_response(self) -> Response {
        let mut response = match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        };

        if let Some(location) = self.location {
            match HeaderValue::from_str(&location) {
                Ok(value) => {
                    response.headers_mut().insert(header::LOCATION, value);
                }
                Err(_) => tracing::warn!(%location, "dropping unencodable Location header"),
            }
        }

        response
    }
}

/// Per-request record of what a blueprint did
///
/// Attached to the response extensions so middleware can observe the action,
/// the options it ran with and the records it touched.
#[derive(Debug, Clone)]
pub struct RequestState {
    pub action: Action,
    pub options: RouteOptions,
    pub primary_record: Option<Record>,
    pub secondary_record: Option<Record>,
}

impl RequestState {
    pub fn new(action: Action, options: RouteOptions) -> Self {
        Self {
            action,
            options,
            primary_record: None,
            secondary_record: None,
        }
    }
}

/// Everything an action needs for one request
pub struct ActionContext<'a> {
    pub model: &'a dyn Model,
    pub registry: &'a ModelRegistry,
    pub request: &'a BlueprintRequest,
    pub options: &'a RouteOptions,
    pub state: RequestState,
}

impl<'a> ActionContext<'a> {
    pub fn new(
        action: Action,
        model: &'a dyn Model,
        registry: &'a ModelRegistry,
        request: &'a BlueprintRequest,
        options: &'a RouteOptions,
    ) -> Self {
        Self {
            model,
            registry,
            request,
            options,
            state: RequestState::new(action, options.clone()),
        }
    }

    pub fn util(&self) -> ActionUtil<'a> {
        ActionUtil::new(self.request, self.options)
    }

    /// The association named by `association_attr`
    ///
    /// Routes without one cannot reach a relation action, so its absence is a
    /// configuration problem reported as a bad request.
    pub fn relation(&self) -> BlueprintResult<&'a AssociationDescriptor> {
        let options: &'a RouteOptions = self.options;
        let alias = options.association_attr.as_deref().ok_or_else(|| {
            BlueprintError::bad_request("Missing required route option, `association_attr`.")
        })?;

        options.association(alias).ok_or_else(|| {
            BlueprintError::not_found(format!(
                "`{}` has no association `{}`",
                self.model.identity(),
                alias
            ))
        })
    }

    /// Model on the far side of an association
    pub fn child_model(&self, association: &AssociationDescriptor) -> BlueprintResult<Arc<dyn Model>> {
        self.registry.get(&association.target).ok_or_else(|| {
            BlueprintError::internal(format!(
                "association `{}` targets unregistered model `{}`",
                association.alias, association.target
            ))
        })
    }
}

/// Criteria addressing one record of `model`
pub(crate) fn key_criteria(model: &dyn Model, key: &RecordKey) -> Criteria {
    key.to_criteria(model.primary_key())
}

/// Primary key value of a stored record
pub(crate) fn pk_value(model: &dyn Model, record: &Record) -> Value {
    record.get(model.primary_key()).cloned().unwrap_or(Value::Null)
}

/// Run `action` and return its response along with the request state it built
pub async fn run(
    action: Action,
    model: &dyn Model,
    registry: &ModelRegistry,
    request: &BlueprintRequest,
    options: &RouteOptions,
) -> (BlueprintResult<BlueprintResponse>, RequestState) {
    let mut ctx = ActionContext::new(action, model, registry, request, options);

    let result = match action {
        Action::Create => create::create(&mut ctx).await,
        Action::Find => find::find(&mut ctx).await,
        Action::FindOne => find_one::find_one(&mut ctx).await,
        Action::Update => update::update(&mut ctx).await,
        Action::Destroy => destroy::destroy(&mut ctx).await,
        Action::Populate => populate::populate(&mut ctx).await,
        Action::Add => add::add(&mut ctx).await,
        Action::Remove => remove::remove(&mut ctx).await,
    };

    (result, ctx.state)
}
