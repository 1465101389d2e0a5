use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::info;

pub mod store;

use crate::error::HooksError;
pub use store::{ConfigStore, SqlConfigStore, StoredReports};

const MAX_CONNECTIONS: u32 = 5;

/// Opens (creating if needed) the SQLite file behind the freeze flag and the
/// stored reports, then applies the embedded migrations.
pub async fn init_db(db_path: impl AsRef<Path>) -> Result<SqlitePool, HooksError> {
    let db_path = db_path.as_ref();

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            HooksError::DatabaseError(format!("Failed to create database directory: {}", e))
        })?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);
    info!("Opening store at {}", db_path.display());

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await
        .map_err(|e| HooksError::DatabaseError(format!("Failed to open store: {}", e)))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| HooksError::DatabaseError(format!("Failed to run migrations: {}", e)))?;

    info!("Store ready");
    Ok(pool)
}
