//! Storage backends implementing [`Model`](crate::core::model::Model)

pub mod filter;
#[cfg(feature = "in-memory")]
pub mod in_memory;

#[cfg(feature = "in-memory")]
pub use in_memory::{IdStrategy, InMemoryModel, InMemoryStore};
