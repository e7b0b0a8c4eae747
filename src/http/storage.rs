use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
  Original,
  Processed,
}

impl ImageType {
  pub fn key(self, file_name: &str) -> String {
    match self {
      ImageType::Original => format!("original/{}", file_name),
      ImageType::Processed => format!("processed/{}", file_name),
    }
  }
}

pub struct PutObjectOutput {
  pub key: String,
  pub size: u64,
}

#[async_trait]
pub trait Storage: Send + Sync {
  async fn download_object(&self, key: &str) -> Result<Vec<u8>>;

  async fn upload_object(&self, data: Vec<u8>, key: &str, mime: &str) -> Result<PutObjectOutput>;

  async fn delete_object(&self, key: &str) -> Result<()>;

  /// URL clients can fetch the object from.
  fn public_url(&self, key: &str) -> Result<String>;
}
