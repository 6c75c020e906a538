//! `GET /model` and `GET /model/count`

use super::{ActionContext, BlueprintResponse};
use crate::core::error::BlueprintResult;
use serde_json::Value;

/// List matching records, or count them in count mode
pub async fn find(ctx: &mut ActionContext<'_>) -> BlueprintResult<BlueprintResponse> {
    let util = ctx.util();

    if ctx.options.count() {
        let count = ctx.model.count(&util.parse_criteria(false)?).await?;
        return Ok(BlueprintResponse::ok(Value::from(count)));
    }

    let records = ctx.model.find(&util.find_query(false)?).await?;

    let mut body = Value::Array(records.into_iter().map(Value::Object).collect());
    util.omit_fields(&mut body);

    Ok(BlueprintResponse::ok(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::fixtures;
    use crate::core::classify::Action;
    use crate::core::request::BlueprintRequest;
    use serde_json::json;

    fn query(pairs: Value) -> serde_json::Map<String, Value> {
        pairs.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_find_filters_and_sorts() {
        let (_, registry) = fixtures::registry();
        let options = fixtures::options("treat", None, &registry);
        let model = registry.get("treat").unwrap();
        let request = BlueprintRequest {
            query: query(json!({ "animalOwner": "1", "sort": "calories DESC" })),
            ..Default::default()
        };

        let mut ctx = ActionContext::new(Action::Find, model.as_ref(), &registry, &request, &options);
        let body = find(&mut ctx).await.unwrap().body.unwrap();

        let names: Vec<_> = body.as_array().unwrap().iter().map(|t| t["name"].clone()).collect();
        assert_eq!(names, vec![json!("Burgers"), json!("Salad")]);
    }

    #[tokio::test]
    async fn test_find_count() {
        let (_, registry) = fixtures::registry();
        let mut options = fixtures::options("treat", None, &registry);
        options.private.count = true;
        let model = registry.get("treat").unwrap();
        let request = BlueprintRequest {
            query: query(json!({ "where": r#"{"calories":{">":300}}"# })),
            ..Default::default()
        };

        let mut ctx = ActionContext::new(Action::Find, model.as_ref(), &registry, &request, &options);
        assert_eq!(find(&mut ctx).await.unwrap().body, Some(json!(2)));
    }

    #[tokio::test]
    async fn test_find_omits_inside_populated_collections() {
        let (_, registry) = fixtures::registry();
        let mut options = fixtures::options("zoo", None, &registry);
        options.populate = true;
        options.omit = vec!["treats.calories".to_string()];
        let model = registry.get("zoo").unwrap();
        let request = BlueprintRequest::default();

        let mut ctx = ActionContext::new(Action::Find, model.as_ref(), &registry, &request, &options);
        let body = find(&mut ctx).await.unwrap().body.unwrap();

        let treats = body[0]["treats"].as_array().unwrap();
        assert_eq!(treats.len(), 2);
        assert!(treats.iter().all(|t| t.get("calories").is_none()));
    }
}
