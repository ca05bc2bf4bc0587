use protoforge_sdk::{
    google::{GoogleEmbeddingModel, GoogleModel, GoogleModelOptions},
    qdrant::{QdrantVectorStore, QdrantVectorStoreOptions},
};
use protoforge_studio::{
    ledger::{AssetManager, JsonAssetLedger, LEDGER_FILE},
    rules::JsonRuleStore,
    server::{cors_layer, router},
    BoxedError, Studio, StudioConfig, StudioParams, StyleMemory,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), BoxedError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = StudioConfig::from_env()?;

    let google_options = GoogleModelOptions {
        api_key: config.google_api_key.clone(),
        base_url: config.google_base_url.clone(),
        ..Default::default()
    };
    let model = Arc::new(GoogleModel::new(
        config.generation_model.clone(),
        google_options.clone(),
    ));
    let verification_model = Arc::new(GoogleModel::new(
        config.verify_model.clone(),
        google_options.clone(),
    ));

    let style_memory = match &config.style_memory {
        Some(memory_config) => {
            let embedder = Arc::new(GoogleEmbeddingModel::new(
                config.embedding_model.clone(),
                config.embedding_dimension,
                google_options,
            ));
            let store = Arc::new(QdrantVectorStore::new(QdrantVectorStoreOptions {
                url: memory_config.url.clone(),
                api_key: memory_config.api_key.clone(),
                client: None,
            }));
            StyleMemory::connect_optional(
                embedder,
                store,
                memory_config.collection.clone(),
                config.embedding_dimension,
            )
            .await?
            .map(Arc::new)
        }
        None => {
            info!("QDRANT_URL not set, style memory disabled");
            None
        }
    };

    let ledger = Arc::new(JsonAssetLedger::new(config.asset_root.join(LEDGER_FILE)));
    let assets = Arc::new(AssetManager::new(&config.asset_root, ledger).await?);
    let rules = Arc::new(JsonRuleStore::new(config.memory_file.clone()));

    let studio = Studio::new(
        StudioParams::new(model, rules)
            .verification_model(verification_model)
            .style_memory(style_memory)
            .assets(assets),
    );

    let app = router(Arc::new(studio)).layer(cors_layer(config.app_url.as_deref())?);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .map_err(|err| Box::new(err) as BoxedError)?;

    info!(
        port = config.port,
        generation_model = %config.generation_model,
        verify_model = %config.verify_model,
        "protoforge server listening"
    );

    axum::serve(listener, app)
        .await
        .map_err(|err| Box::new(err) as BoxedError)?;

    Ok(())
}
