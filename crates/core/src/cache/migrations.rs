//! Cache schema upgrades.
//!
//! The applied schema version is kept in SQLite's `user_version` pragma.
//! `SCHEMA[n]` upgrades a database from version `n` to `n + 1`, each inside
//! its own transaction.

use super::Error;
use tokio_rusqlite::Connection;

const SCHEMA: &[&str] = &[include_str!("../../migrations/001_stores.sql")];

/// Bring the schema up to date.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        let applied: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (index, sql) in SCHEMA.iter().enumerate().skip(applied.max(0) as usize) {
            let version = index as i64 + 1;
            let tx = conn.transaction()?;
            tx.execute_batch(sql)
                .map_err(|e| Error::MigrationFailed(format!("schema v{version}: {e}")))?;
            tx.pragma_update(None, "user_version", version)?;
            tx.commit()?;
            tracing::debug!(version, "upgraded cache schema");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
