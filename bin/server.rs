// Falcon Registry - Web Server
// Local HTTP front for the registry and the active-falcon selection

use anyhow::{Context, Result};
use falcon_registry::api::{router, AppState};
use falcon_registry::{init_logging, RegistryConfig, SelectionBroker, SqliteStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = RegistryConfig::load();
    init_logging(&config.log_level());

    let db_path = config.db_path();
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?
        .with_actor("falcon-server");

    // One selection for the whole process, shared with every request
    let state = AppState::new(store, SelectionBroker::new());
    let app = router(state);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(%addr, db = %db_path.display(), "falcon registry server listening");
    println!("🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/falcons", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}
