use delivery_hooks::api;
use delivery_hooks::blob::FsBlobStore;
use delivery_hooks::circleci::CircleCiClient;
use delivery_hooks::db::{SqlConfigStore, init_db};
use delivery_hooks::error::HooksError;
use delivery_hooks::github::GitHubClient;
use delivery_hooks::logging::setup_logging;
use delivery_hooks::{AppState, HooksConfig, load_config};
use std::sync::Arc;
use tracing::{self, info};

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8888";
const DEFAULT_CONFIG_PATH: &str = "hooks_config.toml";

async fn build_state(config: HooksConfig) -> Result<AppState, HooksError> {
    let token = config.github.token.clone().ok_or_else(|| {
        HooksError::ConfigError("github.token (or GITHUB_TOKEN) must be set".to_string())
    })?;
    let github = GitHubClient::new(&config.github.api_url, &token)?;
    let ci = CircleCiClient::new(&config.circleci.api_url, config.circleci.token.as_deref())?;
    let blobs = FsBlobStore::new(config.storage.reports_dir.clone());

    let pool = init_db(&config.storage.database_path).await?;
    let store = SqlConfigStore::new(pool);

    AppState::new(
        config,
        Arc::new(github),
        Arc::new(store),
        Arc::new(blobs),
        Arc::new(ci),
    )
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());
    let config_path =
        std::env::var("HOOKS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Keep the guard alive so file logs are flushed until shutdown
    let _log_guard = match setup_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Logging setup error: {}", e);
            std::process::exit(1);
        }
    };

    let state = match build_state(config).await {
        Ok(state) => Arc::new(state),
        Err(e) => {
            eprintln!("Startup error: {}", e);
            std::process::exit(1);
        }
    };

    let app = api::router(state);

    info!("Listening on {}", bind_address);
    info!("Using config at {:?}", config_path);
    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", bind_address, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
