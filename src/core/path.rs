//! Route path analysis
//!
//! Before a route is classified its static path goes through a small set of
//! explicit transforms:
//!
//! 1. the configured `prefix` is stripped (`/v1/treat` → `/treat`)
//! 2. a trailing `/count` is stripped and turns on count mode
//! 3. with `act_as_user`, a leading user prefix is rewritten so the route looks
//!    like it addresses the user model directly (`/animal/treats` →
//!    `/animals/{userId}/treats`)
//!
//! The normalized path is then split into literal and parameter segments.

use crate::core::error::ConfigError;
use regex::Regex;
use std::sync::LazyLock;

/// Name of the synthetic parameter introduced by the user-prefix rewrite
pub const USER_ID_PARAM: &str = "userId";

static PARAM_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{([A-Za-z_][A-Za-z0-9_]*)(\?)?\}$").expect("static regex is valid")
});

/// One segment of a route path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Fixed text: a model name or an association alias
    Literal(String),
    /// A placeholder bound to a record identifier
    Param { name: String, optional: bool },
}

impl Segment {
    pub fn literal(&self) -> Option<&str> {
        match self {
            Segment::Literal(text) => Some(text),
            Segment::Param { .. } => None,
        }
    }

    pub fn param(&self) -> Option<&str> {
        match self {
            Segment::Param { name, .. } => Some(name),
            Segment::Literal(_) => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Segment::Literal(_))
    }

    pub fn is_param(&self) -> bool {
        matches!(self, Segment::Param { .. })
    }
}

/// Segment-level view of a normalized route path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathShape {
    pub segments: Vec<Segment>,
}

impl PathShape {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// Whether the last segment is an optional parameter (`{childId?}`)
    pub fn has_optional_tail(&self) -> bool {
        matches!(
            self.segments.last(),
            Some(Segment::Param { optional: true, .. })
        )
    }
}

/// Split a path into segments
///
/// Blueprint paths have between one and four segments.
pub fn analyze(path: &str) -> Result<PathShape, ConfigError> {
    let segments: Vec<Segment> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|raw| match PARAM_SEGMENT.captures(raw) {
            Some(caps) => Segment::Param {
                name: caps[1].to_string(),
                optional: caps.get(2).is_some(),
            },
            None => Segment::Literal(raw.to_string()),
        })
        .collect();

    if !(1..=4).contains(&segments.len()) {
        return Err(ConfigError::InvalidPath {
            path: path.to_string(),
            message: format!(
                "number of path segments should be between 1 and 4, got {}",
                segments.len()
            ),
        });
    }

    Ok(PathShape { segments })
}

/// Inputs of the pre-classification transforms
#[derive(Debug, Clone, Default)]
pub struct PathRewrite<'a> {
    pub prefix: Option<&'a str>,
    pub act_as_user: bool,
    pub user_url_prefix: Option<&'a str>,
    pub user_model: Option<&'a str>,
}

/// Result of the pre-classification transforms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPath {
    pub path: String,
    /// A trailing `/count` was stripped
    pub count: bool,
    /// The user prefix was rewritten into `/{user_model}/{userId}`
    pub act_as_user: bool,
}

/// Apply prefix stripping, count detection and the user-prefix rewrite
pub fn normalize_path(path: &str, rewrite: &PathRewrite<'_>) -> NormalizedPath {
    let mut path = remove_prefix(path, rewrite.prefix).to_string();

    let mut count = false;
    if let Some(stripped) = path.strip_suffix("/count") {
        count = true;
        path = stripped.to_string();
    }

    let user_prefix = rewrite
        .user_url_prefix
        .filter(|p| !p.is_empty())
        .map(rooted);

    let mut act_as_user = false;
    if rewrite.act_as_user
        && let (Some(user_prefix), Some(user_model)) = (
            user_prefix,
            rewrite.user_model.filter(|m| !m.is_empty()),
        )
        && begins_with(&path, &user_prefix)
    {
        act_as_user = true;
        let rest = remove_prefix(&path, Some(&user_prefix));
        path = format!("/{}/{{{}}}{}", user_model, USER_ID_PARAM, rest);
    }

    NormalizedPath {
        path,
        count,
        act_as_user,
    }
}

/// Remove `prefix` (ignoring its trailing slashes) from the start of `path`
fn remove_prefix<'p>(path: &'p str, prefix: Option<&str>) -> &'p str {
    let Some(prefix) = prefix.map(|p| p.trim_end_matches('/')) else {
        return path;
    };
    if prefix.is_empty() {
        return path;
    }
    path.strip_prefix(prefix).unwrap_or(path)
}

/// `user` and `/user` name the same prefix
fn rooted(prefix: &str) -> String {
    format!("/{}", prefix.trim_start_matches('/'))
}

/// Whether `path` begins with `needle` on a segment boundary
fn begins_with(path: &str, needle: &str) -> bool {
    let needle = needle.trim_end_matches('/');
    match path.strip_prefix(needle) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
