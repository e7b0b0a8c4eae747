use axum::{
  body::Bytes,
  extract::{Multipart, Path, State},
  http::StatusCode,
  Extension, Json,
};
use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::db::images::{self, ImageRow, NewImage};
use crate::http::error::AppError;
use crate::http::storage::ImageType;
use crate::http::AppState;
use crate::image_modifier::OutputFormat;
use crate::image_processing::{self, ImageRecord, UpdateImageRequest};
use crate::pipeline::{Pipeline, RawOptions};

struct Upload {
  file_name: Option<String>,
  mime: String,
  data: Bytes,
}

#[utoipa::path(
  post,
  path = "/images/process",
  request_body(content = ProcessImageForm, content_type = "multipart/form-data"),
  responses(
    (status = 201, description = "Image processed and stored", body = ImageRecord),
    (status = 400, description = "Missing fields, invalid options or unreadable image"),
    (status = 401, description = "Missing or invalid token"),
    (status = 415, description = "Unsupported image type")
  ),
  security(("bearer" = []))
)]
pub async fn process_and_save(
  State(state): State<AppState>,
  Extension(user): Extension<CurrentUser>,
  mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImageRecord>), AppError> {
  let mut upload: Option<Upload> = None;
  let mut options: Option<String> = None;

  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| AppError::BadRequest(e.to_string()))?
  {
    let name = field.name().unwrap_or("").to_owned();

    match name.as_str() {
      "image" => {
        let file_name = field.file_name().map(str::to_owned);
        let mime = field.content_type().unwrap_or("").to_owned();
        let data = field
          .bytes()
          .await
          .map_err(|e| AppError::BadRequest(e.to_string()))?;
        upload = Some(Upload {
          file_name,
          mime,
          data,
        });
      }
      "options" => {
        options = Some(
          field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?,
        );
      }
      _ => {}
    }
  }

  let upload = upload.ok_or_else(|| {
    AppError::BadRequest("the 'image' field (file) is required".to_owned())
  })?;
  let options =
    options.ok_or_else(|| AppError::BadRequest("the 'options' field is required".to_owned()))?;

  if !image_processing::is_accepted_mime(&upload.mime) {
    return Err(AppError::UnsupportedMediaType);
  }

  let pipeline = Pipeline::compile(options)?;
  debug!("compiled pipeline: {:?}", pipeline.operations());

  let format = image_processing::output_format_for_mime(&upload.mime);
  let processed = render_on_pool(&state, upload.data.clone(), pipeline, format).await?;

  let ts = Utc::now().timestamp_millis();
  let original_key = ImageType::Original.key(&format!(
    "{}-{}.{}",
    ts,
    Uuid::new_v4().simple(),
    image_processing::original_extension(upload.file_name.as_deref())
  ));
  let processed_key = new_processed_key(user.id, format);

  state
    .storage_client
    .upload_object(upload.data.to_vec(), &original_key, &upload.mime)
    .await?;

  if let Err(e) = state
    .storage_client
    .upload_object(processed, &processed_key, format.mime())
    .await
  {
    discard(&state, &[original_key.as_str()]).await;
    return Err(e.into());
  }

  let row = match images::insert_image(
    &state.db,
    &NewImage {
      user_id: user.id,
      original_path: &original_key,
      processed_path: &processed_key,
      mime: &upload.mime,
    },
  )
  .await
  {
    Ok(row) => row,
    Err(e) => {
      discard(&state, &[original_key.as_str(), processed_key.as_str()]).await;
      return Err(e.into());
    }
  };

  info!("stored image {} for user {}", row.id, user.id);

  Ok((StatusCode::CREATED, Json(to_record(&state, row)?)))
}

#[utoipa::path(
  get,
  path = "/images",
  responses(
    (status = 200, description = "Images of the caller, newest first", body = [ImageRecord]),
    (status = 401, description = "Missing or invalid token")
  ),
  security(("bearer" = []))
)]
pub async fn list_images(
  State(state): State<AppState>,
  Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<ImageRecord>>, AppError> {
  let rows = images::list_images(&state.db, user.id).await?;

  let records = rows
    .into_iter()
    .map(|row| to_record(&state, row))
    .collect::<Result<Vec<_>, _>>()?;

  Ok(Json(records))
}

#[utoipa::path(
  get,
  path = "/images/{id}",
  params(("id" = i64, Path, description = "Image id")),
  responses(
    (status = 200, description = "The image", body = ImageRecord),
    (status = 404, description = "No such image for the caller")
  ),
  security(("bearer" = []))
)]
pub async fn get_image(
  State(state): State<AppState>,
  Extension(user): Extension<CurrentUser>,
  Path(id): Path<i64>,
) -> Result<Json<ImageRecord>, AppError> {
  let row = images::find_image(&state.db, id, user.id)
    .await?
    .ok_or(AppError::NotFound)?;

  Ok(Json(to_record(&state, row)?))
}

#[utoipa::path(
  put,
  path = "/images/{id}",
  params(("id" = i64, Path, description = "Image id")),
  request_body = UpdateImageRequest,
  responses(
    (status = 200, description = "Image reprocessed from its original", body = ImageRecord),
    (status = 400, description = "Invalid options"),
    (status = 404, description = "No such image for the caller"),
    (status = 409, description = "Image changed by a concurrent update")
  ),
  security(("bearer" = []))
)]
pub async fn update_image(
  State(state): State<AppState>,
  Extension(user): Extension<CurrentUser>,
  Path(id): Path<i64>,
  Json(body): Json<UpdateImageRequest>,
) -> Result<Json<ImageRecord>, AppError> {
  let row = images::find_image(&state.db, id, user.id)
    .await?
    .ok_or(AppError::NotFound)?;

  let pipeline = Pipeline::compile(RawOptions::from(body.options))?;
  debug!("compiled pipeline: {:?}", pipeline.operations());

  let source = state
    .storage_client
    .download_object(&row.original_path)
    .await?;

  let format = image_processing::output_format_for_mime(&row.mime);
  let processed = render_on_pool(&state, Bytes::from(source), pipeline, format).await?;

  let processed_key = new_processed_key(user.id, format);
  state
    .storage_client
    .upload_object(processed, &processed_key, format.mime())
    .await?;

  let updated = match images::update_processed_path(
    &state.db,
    id,
    user.id,
    &row.processed_path,
    &processed_key,
  )
  .await
  {
    Ok(Some(updated)) => updated,
    Ok(None) => {
      // deleted or reprocessed by another request since it was read
      discard(&state, &[processed_key.as_str()]).await;
      return match images::find_image(&state.db, id, user.id).await? {
        Some(_) => {
          warn!("image {} was reprocessed concurrently, dropped {}", id, processed_key);
          Err(AppError::Conflict(
            "image was modified by another request".to_owned(),
          ))
        }
        None => Err(AppError::NotFound),
      };
    }
    Err(e) => {
      discard(&state, &[processed_key.as_str()]).await;
      return Err(e.into());
    }
  };

  discard(&state, &[row.processed_path.as_str()]).await;
  info!("reprocessed image {} for user {}", id, user.id);

  Ok(Json(to_record(&state, updated)?))
}

#[utoipa::path(
  delete,
  path = "/images/{id}",
  params(("id" = i64, Path, description = "Image id")),
  responses(
    (status = 204, description = "Image and its files removed"),
    (status = 404, description = "No such image for the caller")
  ),
  security(("bearer" = []))
)]
pub async fn delete_image(
  State(state): State<AppState>,
  Extension(user): Extension<CurrentUser>,
  Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
  let row = images::find_image(&state.db, id, user.id)
    .await?
    .ok_or(AppError::NotFound)?;

  if !images::delete_image(&state.db, id, user.id).await? {
    return Err(AppError::NotFound);
  }

  discard(&state, &[row.original_path.as_str(), row.processed_path.as_str()]).await;
  info!("deleted image {} for user {}", id, user.id);

  Ok(StatusCode::NO_CONTENT)
}

// Run the image transformation in a thread from the worker pool
async fn render_on_pool(
  state: &AppState,
  source: Bytes,
  pipeline: Pipeline,
  format: OutputFormat,
) -> Result<Vec<u8>, AppError> {
  let (send, recv) = tokio::sync::oneshot::channel();
  let max_dimension = state.max_dimension;

  state.workers.spawn(move || {
    let res = image_processing::render(&source, &pipeline, format, max_dimension);
    let _ = send.send(res);
  });

  let rendered = recv.await.map_err(|e| {
    error!("failed to receive: {}", e);
    AppError::InternalServerError(e.to_string())
  })?;

  Ok(rendered?)
}

fn new_processed_key(user_id: i64, format: OutputFormat) -> String {
  let suffix = Uuid::new_v4().simple().to_string();
  ImageType::Processed.key(&format!(
    "{}-{}-{}.{}",
    user_id,
    Utc::now().timestamp_millis(),
    &suffix[..8],
    format.extension()
  ))
}

fn to_record(state: &AppState, row: ImageRow) -> Result<ImageRecord, AppError> {
  Ok(ImageRecord {
    id: row.id,
    original_url: state.storage_client.public_url(&row.original_path)?,
    processed_url: state.storage_client.public_url(&row.processed_path)?,
    created_at: row.created_at,
    updated_at: row.updated_at,
  })
}

// Best effort; a leftover file is logged, not surfaced
async fn discard(state: &AppState, keys: &[&str]) {
  for key in keys {
    if let Err(e) = state.storage_client.delete_object(key).await {
      warn!("failed to delete object {}: {:#}", key, e);
    }
  }
}
