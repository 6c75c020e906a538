//! Zoo API served by blueprint routes
//!
//! Routes come from `zoo.yaml`; records live in memory. Two callers are known:
//!
//! ```text
//! curl localhost:3000/zoo/1/treats
//! curl -H 'Authorization: Bearer Doggie' localhost:3000/animal/treats
//! curl -X PUT localhost:3000/zoo/2/treats/3
//! ```
//!
//! Set `RUST_LOG=blueprint=debug,tower_http=debug` to see route registration and requests.

use blueprint::prelude::*;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

const CONFIG: &str = include_str!("zoo.yaml");

fn models(store: &InMemoryStore) -> ModelRegistry {
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

fn seed(store: &InMemoryStore) -> Result<(), StorageError> {
    store.seed(
        "animals",
        vec![json!({ "species": "Doggie" }), json!({ "species": "Kitty" })],
    )?;
    store.seed(
        "treat",
        vec![
            json!({ "name": "French Fries", "calories": 400, "animalOwner": 2 }),
            json!({ "name": "Burgers", "calories": 600, "animalOwner": 1 }),
            json!({ "name": "Salad", "calories": 150, "animalOwner": 1 }),
        ],
    )?;
    store.seed(
        "zoo",
        vec![
            json!({ "name": "Big Room Studios", "treats": [1, 2] }),
            json!({ "name": "Lilypad" }),
        ],
    )?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let store = InMemoryStore::new();
    let registry = models(&store);
    seed(&store)?;

    let auth = StaticTokenAuthProvider::new()
        .with_scheme("Bearer")
        .with_token("Doggie", json!({ "animal": { "id": 1 } }))
        .with_token("Kitty", json!({ "animal": { "id": 2 } }));

    let config = BlueprintConfig::from_yaml_str(CONFIG)?;
    let app = BlueprintBuilder::new(PluginOptions::new())
        .with_models(registry)
        .with_auth_provider(auth)
        .register_config(config)?
        .build()?
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "zoo API listening");

    axum::serve(listener, app).await?;

    Ok(())
}
