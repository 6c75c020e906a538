//! Core module containing the building blocks shared by every blueprint action

pub mod auth;
pub mod classify;
pub mod error;
pub mod model;
pub mod omit;
pub mod params;
pub mod path;
pub mod query;
pub mod request;
pub mod value;

pub use auth::{AuthProvider, NoAuthProvider, StaticTokenAuthProvider};
pub use classify::Action;
pub use error::{BlueprintError, BlueprintResult, StorageError, StorageResult};
pub use model::{
    AssociationDescriptor, AssociationKind, Criteria, FindQuery, Model, ModelRegistry,
    ModelSchema, Populate, Record, RecordKey,
};
pub use params::ActionUtil;
pub use request::BlueprintRequest;
