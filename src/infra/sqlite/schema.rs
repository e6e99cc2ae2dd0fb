use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn open_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open db: {}", db_path.display()))?;
    // Background fetches and UI writes open their own connections.
    conn.busy_timeout(Duration::from_secs(5))
        .context("failed to set busy timeout")?;
    Ok(conn)
}

/// One JSON document per row, grouped by collection name.
pub fn init_db(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create parent dir: {}", parent.display()))?;
    }

    let conn = open_connection(db_path)?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS collection_row (
            collection  TEXT NOT NULL,
            row_id      TEXT NOT NULL,
            position    INTEGER NOT NULL,
            data        TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            PRIMARY KEY (collection, row_id)
        );

        CREATE INDEX IF NOT EXISTS idx_collection_row_position
            ON collection_row(collection, position);
        ",
    )
    .context("failed to initialize schema")?;

    Ok(())
}
