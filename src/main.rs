use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use translation_gateway::backend::RemoteModelLoader;
use translation_gateway::config::Config;
use translation_gateway::detect::HeuristicDetector;
use translation_gateway::handler::TranslationService;
use translation_gateway::server;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when not present)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("translation_gateway=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    info!("Starting translation gateway");

    let config = Config::from_env()?;
    info!(
        "Default model {} (available: {}), model server {}",
        config.default_model,
        config.available_models.join(", "),
        config.model_server_url
    );

    let loader = Arc::new(RemoteModelLoader::new(&config.model_server_url)?);
    let service = Arc::new(TranslationService::from_config(
        &config,
        loader,
        Arc::new(HeuristicDetector::new()),
    ));

    server::serve(service, config.port).await
}
