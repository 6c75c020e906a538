//! Field omission on outgoing bodies

use crate::config::options::RouteOptions;
use crate::core::request::BlueprintRequest;
use serde_json::Value;

/// Omit paths for a request: the `omit` option plus the `omit` query parameter
///
/// The query parameter may list several comma-separated paths.
pub fn omit_paths(request: &BlueprintRequest, options: &RouteOptions) -> Vec<String> {
    let mut paths = options.omit.clone();

    if let Some(requested) = request.query_str("omit") {
        paths.extend(
            requested
                .split(',')
                .map(str::trim)
                .filter(|path| !path.is_empty())
                .map(str::to_string),
        );
    }

    paths
}

/// Remove every dotted path from a record or a list of records
///
/// Arrays met along the way are traversed element by element, so
/// `treats.calories` strips the field from every populated treat.
pub fn omit_fields(body: &mut Value, paths: &[String]) {
    for path in paths {
        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            continue;
        }

        match &mut *body {
            Value::Array(records) => {
                for record in records {
                    remove_path(record, &segments);
                }
            }
            record => remove_path(record, &segments),
        }
    }
}

fn remove_path(value: &mut Value, segments: &[&str]) {
    match value {
        Value::Array(items) => {
            for item in items {
                remove_path(item, segments);
            }
        }
        Value::Object(map) => match segments {
            [leaf] => {
                map.remove(*leaf);
            }
            [head, rest @ ..] => {
                if let Some(next) = map.get_mut(*head) {
                    remove_path(next, rest);
                }
            }
            [] => {}
        },
        _ => {}
    }
}
