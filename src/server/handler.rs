//! The axum endpoint behind every blueprint route

use crate::actions::{self, RequestState};
use crate::config::ResolvedRoute;
use crate::core::auth::AuthProvider;
use crate::core::model::ModelRegistry;
use crate::core::request::BlueprintRequest;
use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

/// One registered route with everything needed to serve it
pub struct BlueprintEndpoint {
    pub route: ResolvedRoute,
    pub registry: Arc<ModelRegistry>,
    pub auth: Arc<dyn AuthProvider>,
}

impl BlueprintEndpoint {
    /// Serve one request
    ///
    /// Errors never escape: they become responses here. The [`RequestState`] is
    /// attached to the response extensions whenever the action ran.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let request = match BlueprintRequest::from_request(request, self.auth.as_ref()).await {
            Ok(request) => request,
            Err(e) => return e.into_response(),
        };

        let options = self.route.options.for_request(&request);
        let (result, state): (_, RequestState) = actions::run(
            self.route.action,
            self.route.model.as_ref(),
            &self.registry,
            &request,
            &options,
        )
        .await;

        let mut response = match result {
            Ok(response) => response.into_response(),
            Err(e) => {
                tracing::debug!(
                    action = %self.route.action,
                    path = %request.path,
                    error = %e,
                    "blueprint action failed"
                );
                e.into_response()
            }
        };

        response.extensions_mut().insert(state);
        response
    }
}
