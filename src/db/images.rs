use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImageRow {
  pub id: i64,
  pub user_id: i64,
  pub original_path: String,
  pub processed_path: String,
  pub mime: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

pub struct NewImage<'a> {
  pub user_id: i64,
  pub original_path: &'a str,
  pub processed_path: &'a str,
  pub mime: &'a str,
}

const COLUMNS: &str = "id, user_id, original_path, processed_path, mime, created_at, updated_at";

pub async fn insert_image(pool: &SqlitePool, image: &NewImage<'_>) -> Result<ImageRow> {
  let now = Utc::now();

  let id = sqlx::query(
    r#"
    INSERT INTO images (user_id, original_path, processed_path, mime, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?5)
    "#,
  )
  .bind(image.user_id)
  .bind(image.original_path)
  .bind(image.processed_path)
  .bind(image.mime)
  .bind(now)
  .execute(pool)
  .await
  .context("failed to insert image")?
  .last_insert_rowid();

  Ok(ImageRow {
    id,
    user_id: image.user_id,
    original_path: image.original_path.to_owned(),
    processed_path: image.processed_path.to_owned(),
    mime: image.mime.to_owned(),
    created_at: now,
    updated_at: now,
  })
}

/// Newest first.
pub async fn list_images(pool: &SqlitePool, user_id: i64) -> Result<Vec<ImageRow>> {
  let rows = sqlx::query_as::<_, ImageRow>(&format!(
    "SELECT {COLUMNS} FROM images WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
  ))
  .bind(user_id)
  .fetch_all(pool)
  .await?;

  Ok(rows)
}

pub async fn find_image(pool: &SqlitePool, id: i64, user_id: i64) -> Result<Option<ImageRow>> {
  let row = sqlx::query_as::<_, ImageRow>(&format!(
    "SELECT {COLUMNS} FROM images WHERE id = ?1 AND user_id = ?2"
  ))
  .bind(id)
  .bind(user_id)
  .fetch_optional(pool)
  .await?;

  Ok(row)
}

pub async fn update_processed_path(
  pool: &SqlitePool,
  id: i64,
  user_id: i64,
  previous_path: &str,
  processed_path: &str,
) -> Result<Option<ImageRow>> {
  let updated = sqlx::query(
    r#"
    UPDATE images SET processed_path = ?1, updated_at = ?2
    WHERE id = ?3 AND user_id = ?4 AND processed_path = ?5
    "#,
  )
  .bind(processed_path)
  .bind(Utc::now())
  .bind(id)
  .bind(user_id)
  .bind(previous_path)
  .execute(pool)
  .await
  .context("failed to update image")?
  .rows_affected();

  if updated == 0 {
    return Ok(None);
  }

  find_image(pool, id, user_id).await
}

pub async fn delete_image(pool: &SqlitePool, id: i64, user_id: i64) -> Result<bool> {
  let deleted = sqlx::query("DELETE FROM images WHERE id = ?1 AND user_id = ?2")
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await
    .context("failed to delete image")?
    .rows_affected();

  Ok(deleted > 0)
}
