//! # rest-blueprint
//!
//! Convention-based REST blueprints for axum: CRUD and relation handlers derived
//! from the shape of a route.
//!
//! ## Features
//!
//! - **Route classification**: `{method, path shape}` picks one of eight actions
//!   (create, find, findone, update, destroy, populate, add, remove)
//! - **Layered options**: built-in defaults < plugin options < route options,
//!   completed from the path and the model schema
//! - **Query extraction**: criteria, pagination, sort and population from the query string
//! - **Ownership scoping**: owner fields set from and checked against the caller's claims
//! - **Soft delete**: a flag field instead of physical removal
//! - **Field omission**: redacted paths, including inside populated collections
//! - **Act as user**: `/user/...` routes addressing the caller's own record
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use blueprint::prelude::*;
//!
//! let store = InMemoryStore::new();
//! let app = BlueprintBuilder::new(PluginOptions::new())
//!     .with_model(store.model(ModelSchema::new("zoo").collection("treats", "treat", Some("owner"))))
//!     .with_model(store.model(ModelSchema::new("treat").collection("owner", "zoo", Some("treats"))))
//!     .route(RouteDefinition::new(Method::POST, "/zoo"))
//!     .route(RouteDefinition::new(Method::GET, "/zoo/{id}/treats/{childId?}"))
//!     .route(RouteDefinition::new(Method::PUT, "/zoo/{id}/treats/{childId}"))
//!     .build()?;
//! ```

pub mod actions;
pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        Action, ActionUtil, AssociationDescriptor, AssociationKind, AuthProvider,
        BlueprintError, BlueprintRequest, BlueprintResult, Criteria, FindQuery, Model,
        ModelRegistry, ModelSchema, NoAuthProvider, Populate, Record, RecordKey,
        StaticTokenAuthProvider, StorageError, StorageResult,
        model::{AttributeDef, AttributeSpec},
    };

    // === Configuration ===
    pub use crate::config::{BlueprintConfig, OptionsHook, PluginOptions, RouteOptions};

    // === Actions ===
    pub use crate::actions::{BlueprintResponse, RequestState};

    // === Server ===
    pub use crate::server::{BlueprintBuilder, RouteDefinition};

    // === Storage ===
    #[cfg(feature = "in-memory")]
    pub use crate::storage::{InMemoryModel, InMemoryStore};

    // === Re-exports from dependencies ===
    pub use axum::Router;
    pub use axum::http::Method;
    pub use serde_json::{Value, json};
}
