//! Route classification: {method, path shape} → blueprint action
//!
//! Classification happens once, while a route is registered. Every route either
//! maps to exactly one [`Action`] or fails registration.
//!
//! | Method       | Shape                           | Action     |
//! |--------------|---------------------------------|------------|
//! | POST         | `/model`                        | create     |
//! | POST, PATCH  | `/model/{id}`                   | update     |
//! | POST         | `/model/{id}/alias`             | add        |
//! | PUT          | `/model/{id}/alias/{childId}`   | add        |
//! | GET          | `/model`                        | find       |
//! | GET          | `/model/{id}`                   | findone    |
//! | GET          | `/model/{id}/alias`             | populate   |
//! | GET          | `/model/{id}/alias/{childId}`   | populate   |
//! | DELETE       | `/model/{id}`                   | destroy    |
//! | DELETE       | `/model/{id}/alias/{childId}`   | remove     |

use crate::core::error::{BlueprintError, ClassificationError, ConfigError};
use crate::core::path::{PathShape, Segment};
use axum::http::Method;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The eight blueprint behaviors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Find,
    #[serde(rename = "findone")]
    FindOne,
    Update,
    Destroy,
    Populate,
    Add,
    Remove,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Find => "find",
            Action::FindOne => "findone",
            Action::Update => "update",
            Action::Destroy => "destroy",
            Action::Populate => "populate",
            Action::Add => "add",
            Action::Remove => "remove",
        }
    }

    /// Only listings can answer with a count
    pub fn can_count(&self, segments: usize) -> bool {
        matches!(
            (self, segments),
            (Action::Find, 1) | (Action::Populate, 3)
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reduce the methods a route is registered for to the one used for classification
///
/// A route registered for both POST and PATCH is an update and classifies as PATCH.
pub fn effective_method(methods: &[Method]) -> Result<Method, ClassificationError> {
    match methods {
        [method] => Ok(method.clone()),
        [a, b]
            if (a == Method::POST && b == Method::PATCH)
                || (a == Method::PATCH && b == Method::POST) =>
        {
            Ok(Method::PATCH)
        }
        _ => Err(ClassificationError::UnsupportedMethod {
            method: method_list(methods),
        }),
    }
}

/// Classify a normalized route
///
/// `path` is only used in error messages.
pub fn classify(
    methods: &[Method],
    shape: &PathShape,
    count: bool,
    path: &str,
) -> Result<Action, BlueprintError> {
    let method = effective_method(methods)?;
    let segments = shape_len(shape);

    let action = match (&method, segments) {
        (m, Some(1)) if m == Method::POST => Some(Action::Create),
        (m, Some(2)) if m == Method::POST || m == Method::PATCH => Some(Action::Update),
        (m, Some(3)) if m == Method::POST => Some(Action::Add),
        (m, Some(4)) if m == Method::PUT => Some(Action::Add),
        (m, Some(1)) if m == Method::GET => Some(Action::Find),
        (m, Some(2)) if m == Method::GET => Some(Action::FindOne),
        (m, Some(3 | 4)) if m == Method::GET => Some(Action::Populate),
        (m, Some(2)) if m == Method::DELETE => Some(Action::Destroy),
        (m, Some(4)) if m == Method::DELETE => Some(Action::Remove),
        _ => None,
    };

    let method_name = method.as_str().to_lowercase();

    let supported = [
        Method::POST,
        Method::GET,
        Method::DELETE,
        Method::PUT,
        Method::PATCH,
    ];
    if !supported.contains(&method) {
        return Err(ClassificationError::UnsupportedMethod {
            method: method_name,
        }
        .into());
    }

    let action = action.ok_or_else(|| ClassificationError::NoPattern {
        method: method_name.clone(),
        path: path.to_string(),
    })?;

    if count && !action.can_count(shape.len()) {
        return Err(ConfigError::CountNotAllowed {
            method: method_name,
            path: path.to_string(),
        }
        .into());
    }

    Ok(action)
}

/// Number of segments when the shape alternates literal/param as blueprints expect
///
/// Segment 0 and 2 must be literals (model, association alias), segments 1 and 3
/// must be parameters (record identifiers).
fn shape_len(shape: &PathShape) -> Option<usize> {
    let well_formed = shape
        .segments
        .iter()
        .enumerate()
        .all(|(index, segment)| match segment {
            Segment::Literal(_) => index % 2 == 0,
            Segment::Param { .. } => index % 2 == 1,
        });

    if well_formed && (1..=4).contains(&shape.len()) {
        Some(shape.len())
    } else {
        None
    }
}

fn method_list(methods: &[Method]) -> String {
    methods
        .iter()
        .map(|m| m.as_str().to_lowercase())
        .collect::<Vec<_>>()
        .join(",")
}
