//! One test group per blueprint action, driven over HTTP

mod zoo_harness;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use blueprint::prelude::*;
use tower::ServiceExt;
use zoo_harness::{names, route, server};

fn zoo_routes() -> Vec<RouteDefinition> {
    vec![
        route(Method::GET, "/zoo", json!({})),
        route(Method::GET, "/zoo/count", json!({})),
        route(Method::POST, "/zoo", json!({})),
        route(Method::GET, "/zoo/{id}", json!({})),
        RouteDefinition::with_methods(vec![Method::PATCH, Method::POST], "/zoo/{id}"),
        route(Method::DELETE, "/zoo/{id}", json!({})),
        route(Method::GET, "/zoo/{id}/treats/{childId?}", json!({})),
        route(Method::GET, "/zoo/{id}/treats/count", json!({})),
        route(Method::PUT, "/zoo/{id}/treats/{childId}", json!({})),
        route(Method::POST, "/zoo/{id}/treats", json!({})),
        route(Method::DELETE, "/zoo/{id}/treats/{childId}", json!({})),
        route(Method::GET, "/treat/{id}", json!({})),
        route(Method::DELETE, "/treat/{id}", json!({})),
    ]
}

// =============================================================================
// create
// =============================================================================

#[tokio::test]
async fn test_create_returns_record() {
    let server = server(PluginOptions::new(), zoo_routes());

    let response = server
        .post("/zoo")
        .json(&json!({ "name": "Big Room Studios" }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    assert_eq!(body["name"], "Big Room Studios");
    assert_eq!(body["id"], 3);
    assert!(body["createdAt"].is_string());
}

#[tokio::test]
async fn test_create_rejects_non_object_payload() {
    let server = server(PluginOptions::new(), zoo_routes());

    let response = server.post("/zoo").json(&json!(["Lilypad"])).await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_with_duplicate_key_is_validation_error() {
    let server = server(PluginOptions::new(), zoo_routes());

    let response = server
        .post("/zoo")
        .json(&json!({ "id": 1, "name": "Copy" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["details"]["id"], json!(["unique"]));
}

// =============================================================================
// find
// =============================================================================

#[tokio::test]
async fn test_find_lists_records() {
    let server = server(PluginOptions::new(), zoo_routes());

    let response = server.get("/zoo").await;
    response.assert_status_ok();
    assert_eq!(names(&response.json()), vec!["Big Room Studios", "Lilypad"]);
}

#[tokio::test]
async fn test_find_filters_by_query() {
    let server = server(PluginOptions::new(), zoo_routes());

    let response = server.get("/zoo").add_query_param("name", "Lilypad").await;
    response.assert_status_ok();
    assert_eq!(names(&response.json()), vec!["Lilypad"]);
}

#[tokio::test]
async fn test_find_count() {
    let server = server(PluginOptions::new(), zoo_routes());

    let response = server.get("/zoo/count").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!(2));
}

// =============================================================================
// findOne
// =============================================================================

#[tokio::test]
async fn test_find_one() {
    let server = server(PluginOptions::new(), zoo_routes());

    let response = server.get("/zoo/2").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["name"], "Lilypad");
}

#[tokio::test]
async fn test_find_one_populates_on_request() {
    let server = server(PluginOptions::new(), zoo_routes());

    let response = server.get("/zoo/1").add_query_param("populate", "treats").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(names(&body["treats"]), vec!["French Fries", "Burgers"]);
}

#[tokio::test]
async fn test_find_one_missing() {
    let server = server(PluginOptions::new(), zoo_routes());

    let response = server.get("/zoo/99").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "NOT_FOUND");
}

// =============================================================================
// update
// =============================================================================

#[tokio::test]
async fn test_update_by_patch_and_post() {
    let server = server(PluginOptions::new(), zoo_routes());

    let response = server
        .patch("/zoo/2")
        .json(&json!({ "name": "Lily Pad" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["name"], "Lily Pad");

    let response = server
        .post("/zoo/2")
        .json(&json!({ "name": "The Pad" }))
        .await;
    response.assert_status_ok();

    let response = server.get("/zoo/2").await;
    assert_eq!(response.json::<Value>()["name"], "The Pad");
}

#[tokio::test]
async fn test_update_missing() {
    let server = server(PluginOptions::new(), zoo_routes());

    let response = server.patch("/zoo/99").json(&json!({ "name": "x" })).await;
    response.assert_status(StatusCode::NOT_FOUND);
}

// =============================================================================
// destroy
// =============================================================================

#[tokio::test]
async fn test_destroy() {
    let server = server(PluginOptions::new(), zoo_routes());

    let response = server.delete("/zoo/2").await;
    response.assert_status(StatusCode::NO_CONTENT);
    assert!(response.text().is_empty());

    server.get("/zoo/2").await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_destroy_missing() {
    let server = server(PluginOptions::new(), zoo_routes());

    server.delete("/treat/99").await.assert_status(StatusCode::NOT_FOUND);
}

// =============================================================================
// populate
// =============================================================================

#[tokio::test]
async fn test_populate_lists_relation() {
    let server = server(PluginOptions::new(), zoo_routes());

    let response = server.get("/zoo/1/treats").await;
    response.assert_status_ok();
    assert_eq!(names(&response.json()), vec!["French Fries", "Burgers"]);
}

#[tokio::test]
async fn test_populate_paginates_and_sorts() {
    let server = server(PluginOptions::new(), zoo_routes());

    let response = server
        .get("/zoo/1/treats")
        .add_query_param("sort", "calories DESC")
        .add_query_param("limit", "1")
        .await;
    response.assert_status_ok();
    assert_eq!(names(&response.json()), vec!["Burgers"]);
}

#[tokio::test]
async fn test_populate_count() {
    let server = server(PluginOptions::new(), zoo_routes());

    let response = server.get("/zoo/1/treats/count").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!(2));

    let response = server.get("/zoo/2/treats/count").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!(0));
}

#[tokio::test]
async fn test_populate_checks_existence() {
    let server = server(PluginOptions::new(), zoo_routes());

    let response = server.get("/zoo/1/treats/2").await;
    response.assert_status(StatusCode::NO_CONTENT);

    server.get("/zoo/1/treats/3").await.assert_status(StatusCode::NOT_FOUND);
    server.get("/zoo/99/treats").await.assert_status(StatusCode::NOT_FOUND);
}

// =============================================================================
// add
// =============================================================================

#[tokio::test]
async fn test_add_existing_child() {
    let server = server(PluginOptions::new(), zoo_routes());

    server.put("/zoo/2/treats/3").await.assert_status(StatusCode::NO_CONTENT);
    server.get("/zoo/2/treats/3").await.assert_status(StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_add_is_idempotent() {
    let server = server(PluginOptions::new(), zoo_routes());

    server.put("/zoo/2/treats/3").await.assert_status(StatusCode::NO_CONTENT);
    server.put("/zoo/2/treats/3").await.assert_status(StatusCode::NO_CONTENT);

    let response = server.get("/zoo/2/treats/count").await;
    assert_eq!(response.json::<Value>(), json!(1));
}

#[tokio::test]
async fn test_add_missing_records() {
    let server = server(PluginOptions::new(), zoo_routes());

    server.put("/zoo/99/treats/1").await.assert_status(StatusCode::NOT_FOUND);
    server.put("/zoo/1/treats/99").await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_new_child() {
    let server = server(PluginOptions::new(), zoo_routes());

    let response = server
        .post("/zoo/2/treats")
        .json(&json!({ "name": "Pizza", "calories": 800 }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    assert_eq!(body["name"], "Pizza");
    assert_eq!(body["id"], 4);

    let response = server.get("/zoo/2/treats").await;
    assert_eq!(names(&response.json()), vec!["Pizza"]);
}

#[tokio::test]
async fn test_add_without_child_is_bad_request() {
    let server = server(PluginOptions::new(), zoo_routes());

    server.post("/zoo/2/treats").await.assert_status(StatusCode::BAD_REQUEST);
}

// =============================================================================
// remove
// =============================================================================

#[tokio::test]
async fn test_remove() {
    let server = server(PluginOptions::new(), zoo_routes());

    server
        .delete("/zoo/1/treats/1")
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let response = server.get("/zoo/1/treats").await;
    assert_eq!(names(&response.json()), vec!["Burgers"]);

    // The treat itself survives
    server.get("/treat/1").await.assert_status_ok();
}

#[tokio::test]
async fn test_remove_unlinked_child() {
    let server = server(PluginOptions::new(), zoo_routes());

    server
        .delete("/zoo/1/treats/3")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

// =============================================================================
// Request state
// =============================================================================

#[tokio::test]
async fn test_request_state_in_extensions() {
    let (builder, _store) = zoo_harness::builder(PluginOptions::new());
    let app = builder
        .route(route(Method::PUT, "/zoo/{id}/treats/{childId}", json!({})))
        .build()
        .unwrap();

    let request = Request::builder()
        .method("PUT")
        .uri("/zoo/2/treats/3")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let state = response.extensions().get::<RequestState>().unwrap();
    assert_eq!(state.action, Action::Add);
    assert_eq!(state.options.association_attr.as_deref(), Some("treats"));
    assert_eq!(state.primary_record.as_ref().unwrap()["name"], json!("Lilypad"));
    assert_eq!(state.secondary_record.as_ref().unwrap()["name"], json!("Salad"));
}
