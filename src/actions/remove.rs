//! `DELETE /model/{id}/alias/{childId}`

use super::{ActionContext, BlueprintResponse, key_criteria, pk_value};
use crate::core::error::{BlueprintError, BlueprintResult};
use crate::core::model::{FindQuery, Populate};
use serde_json::Value;

/// Unlink one child from a parent's collection
pub async fn remove(ctx: &mut ActionContext<'_>) -> BlueprintResult<BlueprintResponse> {
    let util = ctx.util();
    let association = ctx.relation()?;
    let child_model = ctx.child_model(association)?;
    let parent_key = util.require_pk(false)?;
    let child_key = util.require_pk(true)?;

    let only_child = Populate::new(
        association.alias.clone(),
        FindQuery::new(key_criteria(child_model.as_ref(), &child_key)),
    );
    let mut parent = ctx
        .model
        .find_one(&key_criteria(ctx.model, &parent_key), &[only_child])
        .await?
        .ok_or_else(|| BlueprintError::not_found("No record found with the specified `id`."))?;

    if !util.valid_ownership(&parent, false) {
        return Err(BlueprintError::unauthorized("you do not own this record"));
    }

    let child = match parent.remove(&association.alias) {
        Some(Value::Array(items)) => items.into_iter().find_map(|item| match item {
            Value::Object(record) => Some(record),
            _ => None,
        }),
        _ => None,
    }
    .ok_or_else(|| BlueprintError::not_found("The record is not in this relation."))?;

    if !util.valid_ownership(&child, true) {
        return Err(BlueprintError::unauthorized("you do not own the related record"));
    }

    ctx.model
        .remove_from_collection(
            &pk_value(ctx.model, &parent),
            &association.alias,
            &pk_value(child_model.as_ref(), &child),
        )
        .await?;

    ctx.state.primary_record = Some(parent);
    ctx.state.secondary_record = Some(child);

    Ok(BlueprintResponse::no_content())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::fixtures;
    use crate::core::classify::Action;
    use crate::core::request::BlueprintRequest;
    use axum::http::StatusCode;

    fn request(id: &str, child: &str) -> BlueprintRequest {
        BlueprintRequest {
            params: [
                ("id".to_string(), id.to_string()),
                ("childId".to_string(), child.to_string()),
            ]
            .into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_remove_then_missing() {
        let (_, registry) = fixtures::registry();
        let options = fixtures::options("zoo", Some("treats"), &registry);
        let model = registry.get("zoo").unwrap();
        let request = request("1", "2");

        let mut ctx = ActionContext::new(Action::Remove, model.as_ref(), &registry, &request, &options);
        assert_eq!(remove(&mut ctx).await.unwrap().status, StatusCode::NO_CONTENT);

        let mut ctx = ActionContext::new(Action::Remove, model.as_ref(), &registry, &request, &options);
        assert_eq!(
            remove(&mut ctx).await.unwrap_err().status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_child_must_be_given() {
        let (_, registry) = fixtures::registry();
        let options = fixtures::options("zoo", Some("treats"), &registry);
        let model = registry.get("zoo").unwrap();
        let request = BlueprintRequest {
            params: [("id".to_string(), "1".to_string())].into(),
            ..Default::default()
        };

        let mut ctx = ActionContext::new(Action::Remove, model.as_ref(), &registry, &request, &options);
        assert_eq!(
            remove(&mut ctx).await.unwrap_err().status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
