use std::path::Path;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::debug;

pub mod images;
pub mod users;

pub async fn init_db(db_path: &Path) -> Result<SqlitePool> {
  if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create database directory: {}", parent.display()))?;
  }

  let opts = SqliteConnectOptions::new()
    .filename(db_path)
    .create_if_missing(true)
    .journal_mode(SqliteJournalMode::Wal)
    .synchronous(SqliteSynchronous::Normal)
    .busy_timeout(std::time::Duration::from_secs(3))
    .foreign_keys(true);

  let pool = SqlitePoolOptions::new()
    .max_connections(4)
    .connect_with(opts)
    .await
    .context("failed to connect sqlite")?;

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .context("failed to run migrations")?;

  debug!("sqlite ready: {}", db_path.display());
  Ok(pool)
}

/// True when the failure is a UNIQUE constraint rejecting a write.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
  match err.downcast_ref::<sqlx::Error>() {
    Some(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
    _ => false,
  }
}

#[cfg(test)]
pub(crate) mod testing {
  use super::*;

  pub(crate) async fn temp_pool() -> (SqlitePool, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_db(&dir.path().join("test.db")).await.unwrap();
    (pool, dir)
  }
}
