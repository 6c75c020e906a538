//! Criteria evaluation and sorting over JSON records
//!
//! Supported criteria:
//!
//! - `{"name": "Fries"}` equality (`1` matches `"1"`)
//! - `{"id": [1, 2]}` membership
//! - `{"calories": {">": 300, "<=": 600}}` comparisons
//! - `{"deleted": {"!": 1}}` negation (also `not`)
//! - `{"name": {"contains": "fri"}}`, `startsWith`, `endsWith` (case-insensitive)
//! - `{"or": [{...}, {...}]}`

use crate::core::model::{Criteria, Record};
use crate::core::value::{as_number, loose_eq};
use serde_json::Value;
use std::cmp::Ordering;

const MODIFIERS: [&str; 9] = [
    "!", "not", "<", "<=", ">", ">=", "contains", "startsWith", "endsWith",
];

/// Whether `record` satisfies every clause of `criteria`
pub fn matches(record: &Record, criteria: &Criteria) -> bool {
    criteria.iter().all(|(field, condition)| {
        if field == "or" {
            return match condition {
                Value::Array(alternatives) => alternatives.iter().any(|alt| match alt {
                    Value::Object(alt) => matches(record, alt),
                    _ => false,
                }),
                _ => false,
            };
        }

        let value = record.get(field).unwrap_or(&Value::Null);
        satisfies(value, condition)
    })
}

fn satisfies(value: &Value, condition: &Value) -> bool {
    match condition {
        Value::Array(options) => options.iter().any(|option| loose_eq(value, option)),
        Value::Object(modifiers) if is_modifier_object(modifiers) => modifiers
            .iter()
            .all(|(modifier, operand)| apply_modifier(value, modifier, operand)),
        condition => loose_eq(value, condition),
    }
}

fn is_modifier_object(map: &serde_json::Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|key| MODIFIERS.contains(&key.as_str()))
}

fn apply_modifier(value: &Value, modifier: &str, operand: &Value) -> bool {
    match modifier {
        "!" | "not" => !satisfies(value, operand),
        "<" => compare(value, operand) == Some(Ordering::Less),
        "<=" => matches!(compare(value, operand), Some(Ordering::Less | Ordering::Equal)),
        ">" => compare(value, operand) == Some(Ordering::Greater),
        ">=" => matches!(compare(value, operand), Some(Ordering::Greater | Ordering::Equal)),
        "contains" => text_test(value, operand, |hay, needle| hay.contains(needle)),
        "startsWith" => text_test(value, operand, |hay, needle| hay.starts_with(needle)),
        "endsWith" => text_test(value, operand, |hay, needle| hay.ends_with(needle)),
        _ => false,
    }
}

fn text_test(value: &Value, operand: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    match (value.as_str(), operand.as_str()) {
        (Some(hay), Some(needle)) => test(&hay.to_lowercase(), &needle.to_lowercase()),
        _ => false,
    }
}

/// Order two values: numbers numerically, everything else as text; null sorts first
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => match (a, b) {
                (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
                (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
                _ => None,
            },
        },
    }
}

/// Sort records by a clause like `"calories DESC, name"`
pub fn sort_records(records: &mut [Record], sort: &str) {
    let keys: Vec<(String, bool)> = sort
        .split(',')
        .filter_map(|part| {
            let mut words = part.split_whitespace();
            let field = words.next()?.to_string();
            let descending = words
                .next()
                .is_some_and(|dir| dir.eq_ignore_ascii_case("desc") || dir == "-1");
            Some((field, descending))
        })
        .collect();

    records.sort_by(|a, b| {
        for (field, descending) in &keys {
            let left = a.get(field).unwrap_or(&Value::Null);
            let right = b.get(field).unwrap_or(&Value::Null);
            let ordering = compare(left, right).unwrap_or(Ordering::Equal);
            let ordering = if *descending { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}
