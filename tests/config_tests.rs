//! Blueprints declared in YAML files

mod zoo_harness;

use axum::http::StatusCode;
use axum_test::TestServer;
use blueprint::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;
use zoo_harness::{DOGGIE, WithToken, names};

fn yaml_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

const ZOO_YAML: &str = r#"
plugin:
  limit: 10
  act_as_user: true
  user_model: animals
  user_id_property: animal.id
  user_url_prefix: /animal
routes:
  - method: GET
    path: /zoo
  - method: GET
    path: /zoo/count
  - method: post
    path: /zoo
    options:
      created_location: "/zoo/{{ id }}"
  - methods: [POST, PATCH]
    path: /zoo/{id}
  - method: GET
    path: /zoo/{id}/treats/{childId?}
    options:
      omit: calories
  - method: PUT
    path: /zoo/{id}/treats/{childId}
  - method: GET
    path: /animal/treats
"#;

#[tokio::test]
async fn test_routes_from_yaml_file() {
    let file = yaml_file(ZOO_YAML);
    let config = BlueprintConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.routes.len(), 7);

    let (builder, _store) = zoo_harness::builder(PluginOptions::new());
    let app = builder.register_config(config).unwrap().build().unwrap();
    let server = TestServer::try_new(app).unwrap();

    let response = server.get("/zoo/count").await;
    assert_eq!(response.json::<Value>(), json!(2));

    let response = server.post("/zoo").json(&json!({ "name": "Annex" })).await;
    response.assert_status(StatusCode::CREATED);
    assert_eq!(response.headers()["location"], "/zoo/3");

    server
        .patch("/zoo/3")
        .json(&json!({ "name": "East Annex" }))
        .await
        .assert_status_ok();
    server.put("/zoo/3/treats/3").await.assert_status(StatusCode::NO_CONTENT);

    let response = server.get("/zoo/3/treats").await;
    let body: Value = response.json();
    assert_eq!(names(&body), vec!["Salad"]);
    assert!(body[0].get("calories").is_none());

    let response = server.get("/animal/treats").token(DOGGIE).await;
    assert_eq!(names(&response.json()), vec!["Burgers", "Salad"]);
}

#[tokio::test]
async fn test_plugin_options_from_yaml_file() {
    let file = yaml_file("limit: 1\nmax_limit: 2\nomit: [calories]\n");
    let plugin = PluginOptions::from_yaml_file(file.path().to_str().unwrap()).unwrap();

    let server = zoo_harness::server(
        plugin,
        vec![zoo_harness::route(Method::GET, "/zoo/{id}/treats", json!({}))],
    );

    let response = server.get("/zoo/1/treats").await;
    let body: Value = response.json();
    assert_eq!(names(&body), vec!["French Fries"]);
    assert!(body[0].get("calories").is_none());
}

#[tokio::test]
async fn test_config_plugin_merges_over_builder_plugin() {
    let file = yaml_file(
        r#"
plugin:
  omit: [name]
routes:
  - method: GET
    path: /treat
"#,
    );
    let config = BlueprintConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap();

    let (builder, _store) = zoo_harness::builder(PluginOptions::new().set("limit", json!(2)));
    let app = builder.register_config(config).unwrap().build().unwrap();
    let server = TestServer::try_new(app).unwrap();

    let body: Value = server.get("/treat").await.json();
    let treats = body.as_array().unwrap();
    assert_eq!(treats.len(), 2);
    assert!(treats.iter().all(|treat| treat.get("name").is_none()));
}

#[test]
fn test_missing_file() {
    assert!(BlueprintConfig::from_yaml_file("/nonexistent/blueprints.yaml").is_err());
    assert!(PluginOptions::from_yaml_file("/nonexistent/plugin.yaml").is_err());
}

#[test]
fn test_malformed_documents() {
    let file = yaml_file("routes:\n  - path: /zoo\n");
    // Routes need a method
    assert!(BlueprintConfig::from_yaml_file(file.path().to_str().unwrap()).is_err());

    let file = yaml_file("- limit\n- 10\n");
    assert!(PluginOptions::from_yaml_file(file.path().to_str().unwrap()).is_err());
}

#[test]
fn test_bad_method_in_config() {
    let config = BlueprintConfig::from_yaml_str(
        r#"
routes:
  - method: "GET POST"
    path: /zoo
"#,
    )
    .unwrap();

    let (builder, _store) = zoo_harness::builder(PluginOptions::new());
    assert!(builder.register_config(config).is_err());
}
