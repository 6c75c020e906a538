//! Route path and method translation for axum
//!
//! Blueprint paths use axum's `{param}` syntax plus an optional trailing
//! parameter (`{childId?}`), which axum does not support. An optional tail is
//! mounted twice: once with the parameter and once without it.

use crate::core::error::ConfigError;
use axum::http::Method;
use axum::routing::MethodFilter;

/// Concrete axum paths serving a declared blueprint path
///
/// The declared path may still carry a prefix, so its length is not checked here.
pub fn axum_paths(path: &str) -> Vec<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let optional_tail = segments
        .last()
        .is_some_and(|last| last.starts_with('{') && last.ends_with("?}"));

    let render = |segments: &[&str]| -> String {
        segments
            .iter()
            .map(|segment| format!("/{}", segment.replace("?}", "}")))
            .collect()
    };

    let mut paths = vec![render(&segments)];
    if optional_tail {
        paths.push(render(&segments[..segments.len() - 1]));
    }

    paths
}

/// Combine route methods into one axum filter
pub fn method_filter(methods: &[Method]) -> Result<MethodFilter, ConfigError> {
    let mut combined: Option<MethodFilter> = None;

    for method in methods {
        let filter = MethodFilter::try_from(method.clone()).map_err(|e| ConfigError::InvalidValue {
            field: "method".to_string(),
            message: format!("{}: {}", method, e),
        })?;
        combined = Some(match combined {
            Some(combined) => combined.or(filter),
            None => filter,
        });
    }

    combined.ok_or_else(|| ConfigError::InvalidValue {
        field: "method".to_string(),
        message: "a route needs at least one method".to_string(),
    })
}
