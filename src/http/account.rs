use axum::{
  extract::{Request, State},
  http::{header, StatusCode},
  middleware::Next,
  response::{IntoResponse, Response},
  Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::auth;
use crate::db;
use crate::db::users::{self, UserRow};
use crate::http::error::AppError;
use crate::http::AppState;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterRequest {
  pub email: Option<String>,
  pub password: Option<String>,
  pub name: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
  pub email: Option<String>,
  pub password: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct UserSummary {
  pub id: i64,
  pub email: String,
  pub name: String,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct AuthResponse {
  pub ok: bool,
  pub token: String,
  pub user: UserSummary,
  pub message: String,
}

fn present(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.trim().is_empty())
}

fn auth_response(state: &AppState, user: UserRow, message: &str) -> Result<AuthResponse, AppError> {
  Ok(AuthResponse {
    ok: true,
    token: state.tokens.issue(user.id)?,
    user: UserSummary {
      id: user.id,
      email: user.email,
      name: user.name,
    },
    message: message.to_owned(),
  })
}

#[utoipa::path(
  post,
  path = "/auth/register",
  request_body = RegisterRequest,
  responses(
    (status = 201, description = "User created", body = AuthResponse),
    (status = 400, description = "Missing fields or password too short"),
    (status = 409, description = "Email already registered")
  )
)]
pub async fn register(
  State(state): State<AppState>,
  Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
  let (email, password, name) = match (
    present(body.email),
    present(body.password),
    present(body.name),
  ) {
    (Some(email), Some(password), Some(name)) => (email, password, name),
    _ => {
      return Err(AppError::BadRequest(
        "email, password and name are required".to_owned(),
      ))
    }
  };

  let email = email.trim().to_lowercase();
  let name = name.trim().to_owned();

  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(AppError::BadRequest(format!(
      "password must be at least {} characters long",
      MIN_PASSWORD_LEN
    )));
  }

  if users::find_user_by_email(&state.db, &email).await?.is_some() {
    return Err(AppError::Conflict("email is already registered".to_owned()));
  }

  let cost = state.bcrypt_cost;
  let password_hash = tokio::task::spawn_blocking(move || auth::hash_password(&password, cost))
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))??;

  // a concurrent registration may take the email after the check above
  let user = match users::insert_user(&state.db, &email, &name, &password_hash).await {
    Ok(user) => user,
    Err(e) if db::is_unique_violation(&e) => {
      return Err(AppError::Conflict("email is already registered".to_owned()))
    }
    Err(e) => return Err(e.into()),
  };
  info!("registered user {}", user.id);

  Ok((
    StatusCode::CREATED,
    Json(auth_response(&state, user, "registration successful")?),
  ))
}

#[utoipa::path(
  post,
  path = "/auth/login",
  request_body = LoginRequest,
  responses(
    (status = 200, description = "Logged in", body = AuthResponse),
    (status = 400, description = "Missing fields"),
    (status = 401, description = "Invalid credentials")
  )
)]
pub async fn login(
  State(state): State<AppState>,
  Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
  let (email, password) = match (present(body.email), present(body.password)) {
    (Some(email), Some(password)) => (email.trim().to_lowercase(), password),
    _ => {
      return Err(AppError::BadRequest(
        "email and password are required".to_owned(),
      ))
    }
  };

  let invalid = || AppError::Unauthorized("invalid credentials".to_owned());

  let user = users::find_user_by_email(&state.db, &email)
    .await?
    .ok_or_else(invalid)?;

  let hash = user.password_hash.clone();
  let matches = tokio::task::spawn_blocking(move || auth::verify_password(&password, &hash))
    .await
    .map_err(|e| AppError::InternalServerError(e.to_string()))??;

  if !matches {
    return Err(invalid());
  }

  Ok(Json(auth_response(&state, user, "login successful")?))
}

/// Rejects requests without a valid bearer token and exposes the caller as
/// an `Extension<CurrentUser>`.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
  let token = req
    .headers()
    .get(header::AUTHORIZATION)
    .and_then(|h| h.to_str().ok())
    .and_then(|h| h.strip_prefix("Bearer "));

  let token = if let Some(token) = token {
    token.trim()
  } else {
    return AppError::Unauthorized("missing token".to_owned()).into_response();
  };

  match state.tokens.verify(token) {
    Ok(user) => {
      req.extensions_mut().insert(user);
      next.run(req).await
    }
    Err(e) => {
      debug!("rejected bearer token: {:?}", e);
      AppError::Unauthorized("invalid token".to_owned()).into_response()
    }
  }
}
