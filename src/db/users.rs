use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
  pub id: i64,
  pub email: String,
  pub name: String,
  pub password_hash: String,
  pub created_at: DateTime<Utc>,
}

pub async fn insert_user(
  pool: &SqlitePool,
  email: &str,
  name: &str,
  password_hash: &str,
) -> Result<UserRow> {
  let created_at = Utc::now();

  let id = sqlx::query(
    "INSERT INTO users (email, name, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
  )
  .bind(email)
  .bind(name)
  .bind(password_hash)
  .bind(created_at)
  .execute(pool)
  .await
  .context("failed to insert user")?
  .last_insert_rowid();

  Ok(UserRow {
    id,
    email: email.to_owned(),
    name: name.to_owned(),
    password_hash: password_hash.to_owned(),
    created_at,
  })
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<UserRow>> {
  let row = sqlx::query_as::<_, UserRow>(
    "SELECT id, email, name, password_hash, created_at FROM users WHERE email = ?1",
  )
  .bind(email)
  .fetch_optional(pool)
  .await?;

  Ok(row)
}
