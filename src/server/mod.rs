//! Axum wiring for blueprint routes
//!
//! [`BlueprintBuilder`] resolves and classifies route definitions, then mounts
//! one [`BlueprintEndpoint`] per route on an axum `Router`.

pub mod builder;
pub mod handler;
pub mod router;

pub use builder::{BlueprintBuilder, RouteDefinition};
pub use handler::BlueprintEndpoint;
