//! `POST /model`

use super::{ActionContext, BlueprintResponse, pk_value};
use crate::core::error::BlueprintResult;
use serde_json::Value;

/// Create a record from the request values and answer 201 with its `Location`
pub async fn create(ctx: &mut ActionContext<'_>) -> BlueprintResult<BlueprintResponse> {
    let util = ctx.util();
    let values = util.parse_values(false)?;

    let record = ctx.model.create(values).await?;
    let location = util.created_location(Some(&pk_value(ctx.model, &record)))?;
    ctx.state.primary_record = Some(record.clone());

    let mut body = Value::Object(record);
    util.omit_fields(&mut body);

    Ok(BlueprintResponse::created(body, location))
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
    async fn test_create_generates_id() {
        let (_, registry) = fixtures::registry();
        let mut options = fixtures::options("zoo", None, &registry);
        options.created_location = Some("/zoo/{{ id }}".to_string());
        let model = registry.get("zoo").unwrap();
        let request = BlueprintRequest {
            payload: Some(json!({ "name": "Big Room Studios" })),
            ..Default::default()
        };

        let mut ctx = ActionContext::new(Action::Create, model.as_ref(), &registry, &request, &options);
        let response = create(&mut ctx).await.unwrap();

        assert_eq!(response.status, StatusCode::CREATED);
        let body = response.body.unwrap();
        assert_eq!(body["name"], json!("Big Room Studios"));
        assert_eq!(body["id"], json!(3));
        assert_eq!(response.location.as_deref(), Some("/zoo/3"));
        assert!(ctx.state.primary_record.is_some());
    }

    #[tokio::test]
    async fn test_create_rejects_non_object_payload() {
        let (_, registry) = fixtures::registry();
        let options = fixtures::options("zoo", None, &registry);
        let model = registry.get("zoo").unwrap();
        let request = BlueprintRequest {
            payload: Some(json!(["not", "an", "object"])),
            ..Default::default()
        };

        let mut ctx = ActionContext::new(Action::Create, model.as_ref(), &registry, &request, &options);
        let err = create(&mut ctx).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
