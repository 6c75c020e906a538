//! Shared zoo fixture for the blueprint integration tests
//!
//! ```text
//! zoo 1 "Big Room Studios" ── treats ── 1 "French Fries" (Kitty), 2 "Burgers" (Doggie)
//! zoo 2 "Lilypad"
//! treat 3 "Salad" (Doggie), unlinked
//! animals 1 Doggie, 2 Kitty
//! ```
//!
//! Callers authenticate with `Authorization: Custom Doggie` or `Custom Kitty`.

#![allow(dead_code)]

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderValue, Method};
use axum_test::{TestRequest, TestServer};
use blueprint::prelude::*;
use serde_json::{Value, json};

pub const DOGGIE: &str = "Custom Doggie";
pub const KITTY: &str = "Custom Kitty";
/// Well-formed but unknown token
pub const STRANGER: &str = "Custom Doggy";

pub fn registry(store: &InMemoryStore) -> ModelRegistry {
    let mut registry = ModelRegistry::new();

    registry.register(
        store.model(
            ModelSchema::new("zoo")
                .attribute("name", AttributeDef::Type("string".to_string()))
                .collection("treats", "treat", Some("owner")),
        ),
    );
    registry.register(
        store.model(
            ModelSchema::new("treat")
                .attribute("name", AttributeDef::Type("string".to_string()))
                .attribute("calories", AttributeDef::Type("integer".to_string()))
                .collection("owner", "zoo", Some("treats"))
                .single("animalOwner", "animals"),
        ),
    );
    registry.register(
        store.model(
            ModelSchema::new("animals")
                .attribute("species", AttributeDef::Type("string".to_string()))
                .collection("treats", "treat", Some("animalOwner")),
        ),
    );

    registry
}

pub fn seed(store: &InMemoryStore) {
    store
        .seed(
            "animals",
            vec![json!({ "species": "Doggie" }), json!({ "species": "Kitty" })],
        )
        .expect("seed animals");
    store
        .seed(
            "treat",
            vec![
                json!({ "name": "French Fries", "calories": 400, "animalOwner": 2 }),
                json!({ "name": "Burgers", "calories": 600, "animalOwner": 1 }),
                json!({ "name": "Salad", "calories": 150, "animalOwner": 1 }),
            ],
        )
        .expect("seed treats");
    store
        .seed(
            "zoo",
            vec![
                json!({ "name": "Big Room Studios", "treats": [1, 2] }),
                json!({ "name": "Lilypad" }),
            ],
        )
        .expect("seed zoos");
}

pub fn auth() -> StaticTokenAuthProvider {
    StaticTokenAuthProvider::new()
        .with_scheme("Custom")
        .with_token("Doggie", json!({ "animal": { "id": 1 } }))
        .with_token("Kitty", json!({ "animal": { "id": 2 } }))
}

/// Send `Authorization: <header>`
pub trait WithToken {
    fn token(self, header: &'static str) -> Self;
}

impl WithToken for TestRequest {
    fn token(self, header: &'static str) -> Self {
        self.add_header(AUTHORIZATION, HeaderValue::from_static(header))
    }
}

pub fn route(method: Method, path: &str, options: Value) -> RouteDefinition {
    RouteDefinition::new(method, path).options(options)
}

/// Builder over a freshly seeded store
pub fn builder(plugin: PluginOptions) -> (BlueprintBuilder, InMemoryStore) {
    let store = InMemoryStore::new();
    let registry = registry(&store);
    seed(&store);

    let builder = BlueprintBuilder::new(plugin)
        .with_models(registry)
        .with_auth_provider(auth());
    (builder, store)
}

/// Test server for `routes` over a freshly seeded store
pub fn server(plugin: PluginOptions, routes: Vec<RouteDefinition>) -> TestServer {
    let (builder, _) = builder(plugin);
    let app = routes
        .into_iter()
        .fold(builder, |builder, route| builder.route(route))
        .build()
        .expect("Failed to build blueprint routes");
    TestServer::try_new(app).expect("Failed to create test server")
}

/// Names of the records in a JSON array body
pub fn names(body: &Value) -> Vec<String> {
    body.as_array()
        .expect("array body")
        .iter()
        .filter_map(|record| record["name"].as_str().map(str::to_string))
        .collect()
}
