use std::path::{Component, Path, PathBuf};

use crate::http::storage::{PutObjectOutput, Storage};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncReadExt;

/// Objects are served by the `/static` route.
pub struct Client {
  path: PathBuf,
  base_url: String,
}

impl Client {
  pub fn new(path: PathBuf, app_url: &str) -> Self {
    Self {
      path,
      base_url: format!("{}/static", app_url.trim_end_matches('/')),
    }
  }

  fn resolve(&self, key: &str) -> Result<PathBuf> {
    let relative = Path::new(key);
    if !relative
      .components()
      .all(|c| matches!(c, Component::Normal(_)))
    {
      return Err(anyhow!("invalid object key: {}", key));
    }

    Ok(self.path.join(relative))
  }
}

#[async_trait]
impl Storage for Client {
  async fn download_object(&self, key: &str) -> Result<Vec<u8>> {
    let file_path = self.resolve(key)?;

    let mut file = tokio::fs::File::open(&file_path)
      .await
      .with_context(|| format!("failed to open file: {}", key))?;

    let mut data = Vec::new();
    file
      .read_to_end(&mut data)
      .await
      .with_context(|| format!("failed to read file: {}", key))?;

    Ok(data)
  }

  async fn upload_object(&self, data: Vec<u8>, key: &str, _mime: &str) -> Result<PutObjectOutput> {
    let size = data.len() as u64;

    let file_path = self.resolve(key)?;

    if let Some(parent) = file_path.parent() {
      tokio::fs::create_dir_all(parent)
        .await
        .with_context(|| format!("failed to create directory: {}", key))?;
    }

    tokio::fs::write(&file_path, &data)
      .await
      .with_context(|| format!("failed to write file: {}", key))?;

    Ok(PutObjectOutput {
      key: key.to_owned(),
      size,
    })
  }

  async fn delete_object(&self, key: &str) -> Result<()> {
    let file_path = self.resolve(key)?;

    tokio::fs::remove_file(&file_path)
      .await
      .with_context(|| format!("failed to delete file: {}", key))
  }

  fn public_url(&self, key: &str) -> Result<String> {
    Ok(format!("{}/{}", self.base_url, key))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::http::storage::ImageType;

  #[tokio::test]
  async fn upload_download_delete() {
    let dir = tempfile::tempdir().unwrap();
    let client = Client::new(dir.path().to_path_buf(), "http://localhost:8000/");
    let key = ImageType::Processed.key("1-2.png");

    let out = client.upload_object(vec![1, 2, 3], &key, "image/png").await.unwrap();
    assert_eq!(out.size, 3);
    assert!(dir.path().join("processed/1-2.png").exists());

    assert_eq!(client.download_object(&key).await.unwrap(), vec![1, 2, 3]);
    assert_eq!(
      client.public_url(&key).unwrap(),
      "http://localhost:8000/static/processed/1-2.png"
    );

    client.delete_object(&key).await.unwrap();
    assert!(client.download_object(&key).await.is_err());
  }

  #[tokio::test]
  async fn keys_cannot_escape_root() {
    let dir = tempfile::tempdir().unwrap();
    let client = Client::new(dir.path().join("uploads"), "http://localhost");

    assert!(client.download_object("../secret").await.is_err());
    assert!(client.upload_object(vec![0], "/etc/x", "image/png").await.is_err());
  }
}
