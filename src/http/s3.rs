use crate::http::storage::{PutObjectOutput, Storage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;
use url::Url;

pub struct Client {
  s3_client: aws_sdk_s3::Client,
  bucket: String,
  base_url: Url,
}

impl Client {
  pub fn new(s3_client: aws_sdk_s3::Client, bucket: &str, base_url: &str) -> Result<Self> {
    let base_url = Url::parse(base_url).context("failed to parse base url")?;

    Ok(Self {
      s3_client,
      bucket: bucket.to_owned(),
      base_url,
    })
  }
}

#[async_trait]
impl Storage for Client {
  async fn download_object(&self, key: &str) -> Result<Vec<u8>> {
    let trimmed = key.trim_start_matches('/');

    debug!(
      "downloading object: {} from bucket: {}",
      trimmed, self.bucket
    );

    let object = self
      .s3_client
      .get_object()
      .bucket(self.bucket.as_str())
      .key(trimmed)
      .send()
      .await
      .with_context(|| format!("failed to download object: {}", trimmed))?;

    let data = object.body.collect().await?.into_bytes();

    Ok(data.to_vec())
  }

  async fn upload_object(&self, data: Vec<u8>, key: &str, mime: &str) -> Result<PutObjectOutput> {
    let size = data.len() as u64;
    let body = ByteStream::from(data);
    self
      .s3_client
      .put_object()
      .bucket(self.bucket.as_str())
      .key(key)
      .body(body)
      .cache_control("public, max-age=31536000, immutable".to_owned())
      .content_type(mime)
      .send()
      .await
      .context("failed to upload object")?;

    Ok(PutObjectOutput {
      key: key.to_owned(),
      size,
    })
  }

  async fn delete_object(&self, key: &str) -> Result<()> {
    debug!("deleting object: {} from bucket: {}", key, self.bucket);

    self
      .s3_client
      .delete_object()
      .bucket(self.bucket.as_str())
      .key(key)
      .send()
      .await
      .with_context(|| format!("failed to delete object: {}", key))?;

    Ok(())
  }

  fn public_url(&self, key: &str) -> Result<String> {
    Ok(self.base_url.join(key)?.to_string())
  }
}
