//! Pagination, sorting and population parameters

use crate::config::options::{DEFAULT_LIMIT, DEFAULT_MAX_LIMIT, DEFAULT_POPULATE_LIMIT, RouteOptions};
use crate::core::model::{FindQuery, Populate};
use crate::core::request::BlueprintRequest;
use crate::core::value::as_number;

/// Resolve the page size
///
/// A requested limit is used when it is a non-zero number (sign ignored) no larger
/// than `max_limit`. Anything else, including a limit over the maximum, falls back
/// to the configured `limit`. Over-maximum requests are not clamped.
pub fn parse_limit(request: &BlueprintRequest, options: &RouteOptions) -> u64 {
    let fallback = options.limit.unwrap_or(DEFAULT_LIMIT);
    let max_limit = options.max_limit.unwrap_or(DEFAULT_MAX_LIMIT);

    let requested = request
        .query
        .get("limit")
        .and_then(as_number)
        .map(f64::abs)
        .filter(|limit| *limit >= 1.0);

    match requested {
        Some(limit) if limit <= max_limit as f64 => limit as u64,
        _ => fallback,
    }
}

/// Requested skip, else the configured one, else 0
pub fn parse_skip(request: &BlueprintRequest, options: &RouteOptions) -> u64 {
    request
        .query
        .get("skip")
        .and_then(as_number)
        .filter(|skip| *skip > 0.0)
        .map(|skip| skip as u64)
        .or(options.skip)
        .unwrap_or(0)
}

/// Requested sort, else the configured one
pub fn parse_sort(request: &BlueprintRequest, options: &RouteOptions) -> Option<String> {
    request
        .query_str("sort")
        .filter(|sort| !sort.is_empty())
        .map(str::to_string)
        .or_else(|| options.sort.clone())
}

/// Associations to populate on the returned records
///
/// `?populate=a,b` or `?populate=[a,b]` overrides the `populate` option.
pub fn parse_populate(request: &BlueprintRequest, options: &RouteOptions) -> Vec<Populate> {
    let requested: Option<Vec<String>> = request.query_str("populate").map(|list| {
        list.trim_matches(|c| c == '[' || c == ']')
            .split(',')
            .map(str::trim)
            .filter(|alias| !alias.is_empty())
            .map(str::to_string)
            .collect()
    });

    let limit = options
        .populate_limit
        .or(options.limit)
        .unwrap_or(DEFAULT_POPULATE_LIMIT);

    options
        .associations
        .iter()
        .flatten()
        .filter(|association| match &requested {
            Some(aliases) => aliases.contains(&association.alias),
            None => options.populate,
        })
        .map(|association| {
            Populate::new(
                association.alias.clone(),
                FindQuery::default().limit(Some(limit)),
            )
        })
        .collect()
}
