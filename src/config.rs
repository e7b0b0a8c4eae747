use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
  Local,
  S3,
}

#[derive(Deserialize)]
pub struct Config {
  pub app: AppConfig,
  pub auth: AuthConfig,
  pub database: DatabaseConfig,
  pub storage: StorageConfig,
}

#[derive(Deserialize)]
pub struct AppConfig {
  pub listen: String,
  pub metrics_listen: String,
  pub app_url: String,
  pub frontend_url: String,
  pub max_body_size_mb: usize,
  pub processing_concurrency: usize,
  #[serde(default = "default_max_dimension")]
  pub max_dimension: u32,
  pub enable_openapi: Option<bool>,
}

#[derive(Deserialize)]
pub struct AuthConfig {
  pub jwt_secret: String,
  #[serde(default = "default_token_ttl_hours")]
  pub token_ttl_hours: u64,
  #[serde(default = "default_bcrypt_cost")]
  pub bcrypt_cost: u32,
}

#[derive(Deserialize)]
pub struct DatabaseConfig {
  pub path: String,
}

#[derive(Deserialize)]
pub struct StorageConfig {
  pub storage_type: StorageType,
  pub s3: Option<StorageConfigS3>,
  pub local: Option<StorageConfigLocal>,
}

#[derive(Deserialize)]
pub struct StorageConfigS3 {
  pub endpoint: String,
  pub bucket: String,
  pub access_key_id: String,
  pub secret_access_key: String,
  pub region: String,
  pub force_path_style: bool,
  pub base_url: String,
}

#[derive(Deserialize)]
pub struct StorageConfigLocal {
  pub path: String,
}

fn default_max_dimension() -> u32 {
  10_000
}

fn default_token_ttl_hours() -> u64 {
  24 * 7
}

fn default_bcrypt_cost() -> u32 {
  10
}

pub fn parse(config_path: &str) -> Result<Config> {
  let toml_str = fs::read_to_string(config_path)
    .with_context(|| format!("failed to read config file: {}", config_path))?;

  from_str(&toml_str)
}

pub fn from_str(toml_str: &str) -> Result<Config> {
  let mut cfg: Config = toml::from_str(toml_str).context("failed to deserialize config")?;

  // The signing secret may be kept out of the file
  if let Ok(secret) = std::env::var("JWT_SECRET") {
    if !secret.is_empty() {
      cfg.auth.jwt_secret = secret;
    }
  }

  if cfg.auth.jwt_secret.is_empty() {
    anyhow::bail!("auth.jwt_secret must not be empty");
  }

  Ok(cfg)
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = r#"
    [app]
    listen = "0.0.0.0:8000"
    metrics_listen = "0.0.0.0:9100"
    app_url = "http://localhost:8000"
    frontend_url = "http://localhost:3000"
    max_body_size_mb = 5
    processing_concurrency = 2

    [auth]
    jwt_secret = "secret"

    [database]
    path = "data/images.db"

    [storage]
    storage_type = "Local"

    [storage.local]
    path = "uploads"
  "#;

  #[test]
  fn parses_with_defaults() {
    let cfg = from_str(SAMPLE).unwrap();

    assert_eq!(cfg.app.max_dimension, 10_000);
    assert_eq!(cfg.auth.token_ttl_hours, 168);
    assert_eq!(cfg.auth.bcrypt_cost, 10);
    assert_eq!(cfg.storage.storage_type, StorageType::Local);
    assert_eq!(cfg.storage.local.unwrap().path, "uploads");
    assert!(cfg.storage.s3.is_none());
    assert!(cfg.app.enable_openapi.is_none());
  }

  #[test]
  fn rejects_missing_section() {
    assert!(from_str("[app]\nlisten = \"x\"").is_err());
  }
}
