//! breathe-rv - Pollution Report Verification Service
//!
//! Receives citizen pollution reports (photo + description + coordinates),
//! scores them through the external image scorer, tracks the validator and
//! government finalization flow, and serves the green-credit leaderboard.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use breathe_rv::config::Config;
use breathe_rv::services::content_store::ContentStore;
use breathe_rv::services::scorer::HttpScorer;
use breathe_rv::services::user_directory::JsonUserDirectory;
use breathe_rv::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting breathe-rv (Report Verification) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Optional positional argument overrides the root folder
    let cli_root = std::env::args().nth(1);
    let config = Config::resolve(cli_root.as_deref());
    info!("Root folder: {}", config.root_folder.display());

    std::fs::create_dir_all(&config.root_folder)?;

    // Database
    let db_path = config.database_path();
    info!("Database: {}", db_path.display());
    let db = breathe_rv::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Collaborators, wired once here
    let store = Arc::new(ContentStore::new(config.uploads_root())?);
    let scorer = Arc::new(HttpScorer::new(config.scorer_url.clone())?);
    let users = Arc::new(JsonUserDirectory::new(config.users_file()));
    info!("Scorer endpoint: {}", config.scorer_url);

    let state = AppState::new(db, store, scorer, users, config.public_base_url.clone());
    let app = breathe_rv::build_router(state);

    let listener =
        tokio::net::TcpListener::bind(("127.0.0.1", config.port)).await?;
    info!("Listening on http://127.0.0.1:{}", config.port);
    info!("Health check: http://127.0.0.1:{}/health", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
