//! `POST /model/{id}/alias` and `PUT /model/{id}/alias/{childId}`
//!
//! With a child key the existing child is linked (204). Without one the payload
//! creates a new child which is then linked (201 with `Location`). Linking an
//! already linked child is not an error.

use super::{ActionContext, BlueprintResponse, key_criteria, pk_value};
use crate::core::error::{BlueprintError, BlueprintResult};
use crate::core::model::{AssociationDescriptor, Model, Record, RecordKey};
use crate::core::params::ActionUtil;
use serde_json::Value;

/// How the request designates the child
enum ChildSpec {
    Existing(RecordKey),
    New(Record),
}

pub async fn add(ctx: &mut ActionContext<'_>) -> BlueprintResult<BlueprintResponse> {
    let util = ctx.util();
    let association = ctx.relation()?;
    let child_model = ctx.child_model(association)?;
    let parent_key = util.require_pk(false)?;

    let spec = match util.parse_pk(true) {
        Some(key) => ChildSpec::Existing(key),
        None => {
            // A new child never chooses its own key
            let mut options = ctx.options.clone();
            options
                .values
                .blacklist
                .push(child_model.primary_key().to_string());
            let values = ActionUtil::new(ctx.request, &options).parse_values(true)?;
            if values.is_empty() {
                return Err(BlueprintError::bad_request(
                    "You must specify the record to add (either the primary key of an existing \
                     record to link, or a new object without a primary key which will be used to \
                     create a record then link it.)",
                ));
            }
            ChildSpec::New(values)
        }
    };

    let shared: &ActionContext<'_> = ctx;
    let (parent, child, created) = match spec {
        ChildSpec::Existing(child_key) => {
            let (parent, child) = futures::try_join!(
                find_parent(shared, &parent_key, association),
                find_child(shared, child_model.as_ref(), &child_key),
            )?;
            (parent, child, false)
        }
        ChildSpec::New(values) => {
            let parent = find_parent(shared, &parent_key, association).await?;
            let child = child_model.create(values).await?;
            (parent, child, true)
        }
    };

    let parent_pk = pk_value(ctx.model, &parent);
    let child_pk = pk_value(child_model.as_ref(), &child);
    match ctx
        .model
        .add_to_collection(&parent_pk, &association.alias, &child_pk)
        .await
    {
        Ok(()) => {}
        Err(e) if e.is_duplicate_link() => {
            tracing::debug!(
                model = ctx.model.identity(),
                alias = %association.alias,
                child = %child_pk,
                "child already linked"
            );
        }
        Err(e) => return Err(e.into()),
    }

    ctx.state.primary_record = Some(parent);
    ctx.state.secondary_record = Some(child.clone());

    if !created {
        return Ok(BlueprintResponse::no_content());
    }

    let location = util.created_location(Some(&child_pk))?;
    let mut body = Value::Object(child);
    util.omit_fields(&mut body);

    Ok(BlueprintResponse::created(body, location))
}

async fn find_parent(
    ctx: &ActionContext<'_>,
    key: &RecordKey,
    association: &AssociationDescriptor,
) -> BlueprintResult<Record> {
    let parent = ctx
        .model
        .find_one(&key_criteria(ctx.model, key), &[])
        .await?
        .ok_or_else(|| BlueprintError::not_found("No record found with the specified `id`."))?;

    if !ctx.util().valid_ownership(&parent, false) {
        return Err(BlueprintError::unauthorized("you do not own this record"));
    }

    if !association.is_collection() {
        return Err(BlueprintError::not_found(format!(
            "`{}` is not a collection",
            association.alias
        )));
    }

    Ok(parent)
}

async fn find_child(
    ctx: &ActionContext<'_>,
    child_model: &dyn Model,
    key: &RecordKey,
) -> BlueprintResult<Record> {
    let child = child_model
        .find_one(&key_criteria(child_model, key), &[])
        .await?
        .ok_or_else(|| BlueprintError::not_found("No record to add with the specified `id`."))?;

    if !ctx.util().valid_ownership(&child, true) {
        return Err(BlueprintError::unauthorized("you do not own the record to add"));
    }

    Ok(child)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::fixtures;
    use crate::core::classify::Action;
    use crate::core::model::{FindQuery, Populate};
    use crate::core::request::BlueprintRequest;
    use axum::http::StatusCode;
    use serde_json::json;

    fn request(params: &[(&str, &str)], payload: Option<Value>) -> BlueprintRequest {
        BlueprintRequest {
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            payload,
            ..Default::default()
        }
    }

    async fn treat_names(registry: &crate::core::model::ModelRegistry, zoo: i64) -> Vec<Value> {
        let mut criteria = Record::new();
        criteria.insert("id".to_string(), json!(zoo));
        let record = registry
            .get("zoo")
            .unwrap()
            .find_one(&criteria, &[Populate::new("treats", FindQuery::default())])
            .await
            .unwrap()
            .unwrap();
        record["treats"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].clone())
            .collect()
    }

    #[tokio::test]
    async fn test_link_is_idempotent() {
        let (_, registry) = fixtures::registry();
        let options = fixtures::options("zoo", Some("treats"), &registry);
        let model = registry.get("zoo").unwrap();
        let request = request(&[("id", "2"), ("childId", "3")], None);

        for _ in 0..2 {
            let mut ctx = ActionContext::new(Action::Add, model.as_ref(), &registry, &request, &options);
            assert_eq!(add(&mut ctx).await.unwrap().status, StatusCode::NO_CONTENT);
        }
        assert_eq!(treat_names(&registry, 2).await, vec![json!("Salad")]);
    }

    #[tokio::test]
    async fn test_create_and_link() {
        let (_, registry) = fixtures::registry();
        let mut options = fixtures::options("zoo", Some("treats"), &registry);
        options.created_location = Some("/treat/{{ id }}".to_string());
        let model = registry.get("zoo").unwrap();
        let request = request(&[("id", "2")], Some(json!({ "id": 1, "name": "Pizza" })));

        let mut ctx = ActionContext::new(Action::Add, model.as_ref(), &registry, &request, &options);
        let response = add(&mut ctx).await.unwrap();

        assert_eq!(response.status, StatusCode::CREATED);
        let body = response.body.unwrap();
        // The payload key is ignored
        assert_eq!(body["id"], json!(4));
        assert_eq!(response.location.as_deref(), Some("/treat/4"));
        assert_eq!(treat_names(&registry, 2).await, vec![json!("Pizza")]);
    }

    #[tokio::test]
    async fn test_missing_child_or_parent() {
        let (_, registry) = fixtures::registry();
        let options = fixtures::options("zoo", Some("treats"), &registry);
        let model = registry.get("zoo").unwrap();

        for params in [[("id", "1"), ("childId", "99")], [("id", "99"), ("childId", "1")]] {
            let request = request(&params, None);
            let mut ctx = ActionContext::new(Action::Add, model.as_ref(), &registry, &request, &options);
            assert_eq!(
                add(&mut ctx).await.unwrap_err().status_code(),
                StatusCode::NOT_FOUND
            );
        }
    }

    #[tokio::test]
    async fn test_empty_child_is_bad_request() {
        let (_, registry) = fixtures::registry();
        let options = fixtures::options("zoo", Some("treats"), &registry);
        let model = registry.get("zoo").unwrap();
        let request = request(&[("id", "1")], None);

        let mut ctx = ActionContext::new(Action::Add, model.as_ref(), &registry, &request, &options);
        assert_eq!(
            add(&mut ctx).await.unwrap_err().status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
