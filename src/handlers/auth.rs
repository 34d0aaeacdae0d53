// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::teacher::{CreateTeacherRequest, LoginRequest},
    store::{Store, StoreError},
    utils::{
        jwt::sign_jwt,
        password::{hash_password, verify_password},
    },
};

/// Registers a new teacher account.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the teacher (excluding password).
pub async fn register(
    State(store): State<Arc<dyn Store>>,
    Json(payload): Json<CreateTeacherRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let teacher = store
        .create_teacher(payload.username.trim(), &hashed_password)
        .await
        .map_err(|e| match e {
            StoreError::Duplicate(_) => {
                AppError::Conflict(format!("Username '{}' already exists", payload.username))
            }
            other => {
                tracing::error!("Failed to register teacher: {:?}", other);
                AppError::from(other)
            }
        })?;

    tracing::info!("Teacher {} registered", teacher.id);
    Ok((StatusCode::CREATED, Json(teacher)))
}

/// Authenticates a teacher and returns a JWT token.
pub async fn login(
    State(store): State<Arc<dyn Store>>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let teacher = store
        .find_teacher_by_username(payload.username.trim())
        .await?
        .ok_or(AppError::AuthError("Invalid username or password".to_string()))?;

    if !verify_password(&payload.password, &teacher.password)? {
        return Err(AppError::AuthError("Invalid username or password".to_string()));
    }

    let token = sign_jwt(
        teacher.id,
        &teacher.username,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "teacher": teacher,
    })))
}
