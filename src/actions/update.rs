//! `PATCH /model/{id}` (and `POST`/`PUT` registered the same way)

use super::{ActionContext, BlueprintResponse, key_criteria};
use crate::core::error::{BlueprintError, BlueprintResult};
use serde_json::Value;

/// Update one record by key and answer with the updated record
pub async fn update(ctx: &mut ActionContext<'_>) -> BlueprintResult<BlueprintResponse> {
    let util = ctx.util();
    let key = util.require_pk(false)?;
    let criteria = key_criteria(ctx.model, &key);

    let existing = ctx
        .model
        .find_one(&criteria, &[])
        .await?
        .ok_or_else(|| BlueprintError::not_found("No record found with the specified `id`."))?;

    if !util.valid_ownership(&existing, false) {
        return Err(BlueprintError::unauthorized("you do not own this record"));
    }

    let values = util.parse_values(false)?;
    let mut records = ctx.model.update(&criteria, values).await?;

    if records.len() > 1 {
        tracing::warn!(
            model = ctx.model.identity(),
            key = %key,
            updated = records.len(),
            "update by key touched more than one record"
        );
    }

    if records.is_empty() {
        return Err(BlueprintError::not_found("No record found with the specified `id`."));
    }
    let record = records.swap_remove(0);

    ctx.state.primary_record = Some(record.clone());

    let mut body = Value::Object(record);
    util.omit_fields(&mut body);

    Ok(BlueprintResponse::ok(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::fixtures;
    use crate::core::classify::Action;
    use crate::core::request::BlueprintRequest;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_update_one() {
        let (_, registry) = fixtures::registry();
        let mut options = fixtures::options("treat", None, &registry);
        options.omit = vec!["animalOwner".to_string()];
        let model = registry.get("treat").unwrap();
        let request = BlueprintRequest {
            params: [("id".to_string(), "2".to_string())].into(),
            payload: Some(json!({ "calories": 650 })),
            ..Default::default()
        };

        let mut ctx = ActionContext::new(Action::Update, model.as_ref(), &registry, &request, &options);
        let body = update(&mut ctx).await.unwrap().body.unwrap();

        assert_eq!(body["name"], json!("Burgers"));
        assert_eq!(body["calories"], json!(650));
        assert!(body.get("animalOwner").is_none());
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let (_, registry) = fixtures::registry();
        let options = fixtures::options("treat", None, &registry);
        let model = registry.get("treat").unwrap();
        let request = BlueprintRequest {
            params: [("id".to_string(), "99".to_string())].into(),
            payload: Some(json!({ "calories": 1 })),
            ..Default::default()
        };

        let mut ctx = ActionContext::new(Action::Update, model.as_ref(), &registry, &request, &options);
        assert_eq!(
            update(&mut ctx).await.unwrap_err().status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
