//! `GET /model/{id}/alias` and `GET /model/{id}/alias/{childId}`
//!
//! With a child key the action only checks that the child belongs to the
//! relation (204 or 404). Without one it lists the relation with the usual
//! criteria, pagination and sort, or counts it in count mode.

use super::{ActionContext, BlueprintResponse, key_criteria};
use crate::core::error::{BlueprintError, BlueprintResult};
use crate::core::model::{FindQuery, Populate, Record};
use crate::core::query::{parse_limit, parse_skip, parse_sort};
use serde_json::Value;

pub async fn populate(ctx: &mut ActionContext<'_>) -> BlueprintResult<BlueprintResponse> {
    let util = ctx.util();
    let association = ctx
        .relation()
        .map_err(|_| BlueprintError::not_found("No relation to populate."))?;
    let parent_key = util.require_pk(false)?;
    let child_key = util.parse_pk(true);

    let query = match &child_key {
        Some(child_key) => {
            let child_model = ctx.child_model(association)?;
            FindQuery::new(key_criteria(child_model.as_ref(), child_key))
        }
        None if ctx.options.count() => FindQuery::new(util.parse_criteria(true)?),
        None => FindQuery::new(util.parse_criteria(true)?)
            .skip(parse_skip(ctx.request, ctx.options))
            .limit(Some(parse_limit(ctx.request, ctx.options)))
            .sort(parse_sort(ctx.request, ctx.options)),
    };

    let mut parent = ctx
        .model
        .find_one(
            &key_criteria(ctx.model, &parent_key),
            &[Populate::new(association.alias.clone(), query)],
        )
        .await?
        .ok_or_else(|| BlueprintError::not_found("No record found with the specified id."))?;

    if !util.valid_ownership(&parent, false) {
        return Err(BlueprintError::unauthorized("you do not own this record"));
    }

    let related = parent.remove(&association.alias);
    ctx.state.primary_record = Some(parent);

    let children: Vec<Record> = match related {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(record) => Some(record),
                _ => None,
            })
            .collect(),
        Some(Value::Object(record)) => vec![record],
        _ if child_key.is_some() => Vec::new(),
        _ => {
            return Err(BlueprintError::not_found(format!(
                "Specified record ({}) is missing relation `{}`",
                parent_key, association.alias
            )));
        }
    };

    if child_key.is_some() {
        let child = children
            .into_iter()
            .next()
            .ok_or_else(|| BlueprintError::not_found("The record is not in this relation."))?;

        if !util.valid_ownership(&child, true) {
            return Err(BlueprintError::unauthorized("you do not own the related record"));
        }

        ctx.state.secondary_record = Some(child);
        return Ok(BlueprintResponse::no_content());
    }

    if ctx.options.count() {
        return Ok(BlueprintResponse::ok(Value::from(children.len())));
    }

    let mut body = Value::Array(children.into_iter().map(Value::Object).collect());
    util.omit_fields(&mut body);

    Ok(BlueprintResponse::ok(body))
}
