use std::sync::Arc;

use tracing::{info, warn};

use switchboard_calls::{SqliteCallStore, VisibleCallSet};
use switchboard_core::types::UserRole;
use switchboard_notify::NotifyEngine;
use switchboard_sinks::{ConsoleSink, SinkManager};
use switchboard_users::PermissionRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "switchboard=info".into()),
        )
        .init();

    // load config: explicit SWITCHBOARD_CONFIG env > ~/.switchboard/switchboard.toml
    let config_path = std::env::var("SWITCHBOARD_CONFIG").ok();
    let config = switchboard_core::config::SwitchboardConfig::load(config_path.as_deref())
        .unwrap_or_else(|e| {
            warn!("Config load failed ({}), using defaults", e);
            switchboard_core::config::SwitchboardConfig::default()
        });

    // initialize SQLite database — single file for all subsystems
    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    // run all schema migrations (idempotent)
    switchboard_users::db::init_db(&db)?;
    switchboard_calls::db::init_db(&db)?;
    info!("database migrations complete");

    // build subsystems — each gets its own connection for thread safety
    let registry = Arc::new(PermissionRegistry::new(rusqlite::Connection::open(
        db_path,
    )?));
    let store: Arc<dyn switchboard_calls::CallStore> =
        Arc::new(SqliteCallStore::new(rusqlite::Connection::open(db_path)?));

    let mut sinks = SinkManager::new();
    sinks.register(Box::new(ConsoleSink::new()));
    let sinks = Arc::new(sinks);

    // one engine per caller-role user; each session is fully independent
    // and shares only the read path into the registry and store
    let callers = switchboard_users::db::list_users_by_role(&db, UserRole::Caller)?;
    if callers.is_empty() {
        warn!("no caller-role users found; nothing to watch");
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let mut tasks = Vec::with_capacity(callers.len());
    for caller in &callers {
        let visible = VisibleCallSet::new(Arc::clone(&registry), Arc::clone(&store));
        let (engine, _handle, _lifecycle_tx) = NotifyEngine::new(
            caller.id.clone(),
            visible,
            Arc::clone(&sinks),
            &config.notify,
        );
        info!(viewer_id = %caller.id, name = %caller.display_name, "starting reminder engine");
        tasks.push(tokio::spawn(engine.run(shutdown_rx.clone())));
    }
    info!(engines = tasks.len(), "switchboard running; ctrl-c to stop");

    tokio::signal::ctrl_c().await?;

    // signal every engine to stop, then wait for them to drain
    let _ = shutdown_tx.send(true);
    for task in tasks {
        let _ = task.await;
    }
    info!("switchboard stopped");
    Ok(())
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
