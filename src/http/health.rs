use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct Health {
  pub ok: bool,
  pub service: String,
  pub timestamp: DateTime<Utc>,
}

#[utoipa::path(
  get,
  path = "/health",
  responses((status = 200, description = "Service is up", body = Health))
)]
pub async fn health() -> Json<Health> {
  Json(Health {
    ok: true,
    service: "img-processing-api".to_owned(),
    timestamp: Utc::now(),
  })
}
