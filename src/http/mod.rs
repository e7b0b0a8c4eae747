use anyhow::{anyhow, Context, Result};
use axum::{
  extract::{DefaultBodyLimit, MatchedPath, Request},
  http::{header, HeaderValue, Method},
  middleware::{self, Next},
  response::IntoResponse,
  routing::{get, post},
  Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use sqlx::SqlitePool;
use std::future::ready;
use std::{path::Path, sync::Arc};
use tokio::signal;
use tokio::time::{Duration, Instant};
use tower_http::{
  catch_panic::CatchPanicLayer,
  cors::CorsLayer,
  services::ServeDir,
  timeout::TimeoutLayer,
  trace::{self, TraceLayer},
};
use tracing::{info, Level};
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use crate::auth::TokenIssuer;
use crate::config::{Config, StorageType};
use crate::db;
use crate::image_processing::{ImageRecord, ProcessImageForm, UpdateImageRequest};

mod account;
mod error;
mod health;
mod images;
mod local_storage;
mod s3;
pub mod storage;

pub use error::AppError;

#[derive(OpenApi)]
#[openapi(
  paths(
    health::health,
    account::register,
    account::login,
    images::process_and_save,
    images::list_images,
    images::get_image,
    images::update_image,
    images::delete_image
  ),
  components(
    schemas(
      health::Health,
      account::RegisterRequest,
      account::LoginRequest,
      account::AuthResponse,
      account::UserSummary,
      ImageRecord,
      ProcessImageForm,
      UpdateImageRequest
    )
  ),
  modifiers(&SecurityAddon),
  info(
    title = "Image Processing API",
    version = "0.1.0",
    description = "Upload images and transform them with GREYSCALE, RESIZE and ROTATE pipelines"
  )
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
  fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
    if let Some(components) = openapi.components.as_mut() {
      components.add_security_scheme(
        "bearer",
        utoipa::openapi::security::SecurityScheme::Http(
          utoipa::openapi::security::HttpBuilder::new()
            .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
            .bearer_format("JWT")
            .build(),
        ),
      );
    }
  }
}

#[derive(Clone)]
struct AppState {
  storage_client: Arc<Box<dyn storage::Storage>>,
  db: SqlitePool,
  tokens: Arc<TokenIssuer>,
  workers: Arc<rayon::ThreadPool>,
  bcrypt_cost: u32,
  max_dimension: u32,
}

pub async fn bootstrap(cfg: &Config) -> Result<Router> {
  // Image work runs here, off the async runtime
  let workers = rayon::ThreadPoolBuilder::new()
    .num_threads(cfg.app.processing_concurrency)
    .thread_name(|i| format!("img-worker-{}", i))
    .build()
    .context("failed to build worker pool")?;

  let db = db::init_db(Path::new(&cfg.database.path)).await?;

  // Init storage client
  let mut static_dir = None;
  let storage_client: Arc<Box<dyn storage::Storage>> = match cfg.storage.storage_type {
    StorageType::Local => {
      let local = cfg
        .storage
        .local
        .as_ref()
        .ok_or_else(|| anyhow!("local storage config is missing"))?;
      let path = Path::new(&local.path).to_path_buf();

      tokio::fs::create_dir_all(&path)
        .await
        .with_context(|| format!("failed to create storage directory: {}", local.path))?;
      static_dir = Some(path.clone());

      Arc::new(Box::new(local_storage::Client::new(path, &cfg.app.app_url)))
    }
    StorageType::S3 => {
      let storage_config = match &cfg.storage.s3 {
        Some(s3) => s3,
        None => return Err(anyhow!("S3 storage config is missing")),
      };

      let cred = aws_sdk_s3::config::Credentials::new(
        storage_config.access_key_id.clone(),
        storage_config.secret_access_key.clone(),
        None,
        None,
        "loaded-from-custom-env",
      );

      let s3_config = aws_sdk_s3::config::Builder::new()
        .endpoint_url(storage_config.endpoint.clone())
        .credentials_provider(cred)
        .region(aws_sdk_s3::config::Region::new(
          storage_config.region.clone(),
        ))
        .force_path_style(storage_config.force_path_style) // apply bucketname as path param instead of pre-domain
        .behavior_version_latest()
        .build();

      let client = aws_sdk_s3::Client::from_conf(s3_config);
      Arc::new(Box::new(s3::Client::new(
        client,
        storage_config.bucket.as_str(),
        storage_config.base_url.as_str(),
      )?))
    }
  };

  // App state
  let state = AppState {
    storage_client,
    db,
    tokens: Arc::new(TokenIssuer::new(
      &cfg.auth.jwt_secret,
      cfg.auth.token_ttl_hours,
    )),
    workers: Arc::new(workers),
    bcrypt_cost: cfg.auth.bcrypt_cost,
    max_dimension: cfg.app.max_dimension,
  };

  // Routing
  let public_app = Router::new()
    .route("/health", get(health::health))
    .route("/auth/register", post(account::register))
    .route("/auth/login", post(account::login));

  let private_app = Router::new()
    .route("/images", get(images::list_images))
    .route("/images/process", post(images::process_and_save))
    .route(
      "/images/:id",
      get(images::get_image)
        .put(images::update_image)
        .delete(images::delete_image),
    )
    .layer((
      DefaultBodyLimit::max(cfg.app.max_body_size_mb * 1024 * 1024),
      middleware::from_fn_with_state(state.clone(), account::require_auth),
    ));

  let mut app = Router::new()
    .merge(private_app)
    .merge(public_app)
    .with_state(state);

  if let Some(dir) = static_dir {
    app = app.nest_service("/static", ServeDir::new(dir));
  }

  // Conditionally add OpenAPI routes if enabled
  if cfg.app.enable_openapi.unwrap_or(false) {
    app = app
      .merge(Redoc::with_url("/redoc", ApiDoc::openapi()))
      .route(
        "/api-docs/openapi.json",
        get(|| async { axum::Json(ApiDoc::openapi()) }),
      );
  }

  let cors = CorsLayer::new()
    .allow_origin(
      cfg
        .app
        .frontend_url
        .parse::<HeaderValue>()
        .context("invalid frontend_url")?,
    )
    .allow_credentials(true)
    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
    .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

  let app = app.layer((
    middleware::from_fn(track_metrics),
    TraceLayer::new_for_http()
      .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
      .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
    TimeoutLayer::new(Duration::from_secs(60)),
    CatchPanicLayer::new(),
    cors,
  ));

  Ok(app)
}

pub async fn serve(router: Router, listen: &str) -> Result<()> {
  // Start HTTP server
  let listener = tokio::net::TcpListener::bind(listen)
    .await
    .with_context(|| format!("failed to bind to address: {}", listen))?;
  info!("listening on {}", listen);

  axum::serve(listener, router)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("error running HTTP server")
}

async fn healthz() -> &'static str {
  "pong"
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = signal::ctrl_c().await {
      tracing::error!("failed to install Ctrl+C handler: {}", e);
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        tracing::error!("failed to install signal handler: {}", e);
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
      _ = ctrl_c => {},
      _ = terminate => {},
  }
}

pub async fn serve_metrics(listen: &str) -> Result<()> {
  let app = metrics_app()?;

  let listener = tokio::net::TcpListener::bind(listen)
    .await
    .with_context(|| format!("failed to bind to address: {}", listen))?;
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("error running metrics HTTP server")
}

fn metrics_app() -> Result<Router> {
  let recorder_handle = setup_metrics_recorder()?;
  Ok(
    Router::new()
      .route("/metrics", get(move || ready(recorder_handle.render())))
      .route("/healthz", get(healthz)),
  )
}

fn setup_metrics_recorder() -> Result<PrometheusHandle> {
  const EXPONENTIAL_SECONDS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
  ];

  let handle = PrometheusBuilder::new()
    .set_buckets_for_metric(
      Matcher::Full("http_requests_duration_seconds".to_string()),
      EXPONENTIAL_SECONDS,
    )?
    .install_recorder()?;

  Ok(handle)
}

async fn track_metrics(req: Request, next: Next) -> impl IntoResponse {
  let start = Instant::now();
  let path = if let Some(matched_path) = req.extensions().get::<MatchedPath>() {
    matched_path.as_str().to_owned()
  } else {
    req.uri().path().to_owned()
  };
  let method = req.method().clone();

  let response = next.run(req).await;

  let latency = start.elapsed().as_secs_f64();
  let status = response.status().as_u16().to_string();

  let labels = [
    ("method", method.to_string()),
    ("path", path),
    ("status", status),
  ];

  metrics::counter!("http_requests_total", &labels).increment(1);
  metrics::histogram!("http_requests_duration_seconds", &labels).record(latency);

  response
}
