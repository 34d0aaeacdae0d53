// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::quiz::{CreateQuizRequest, ExportQuizRequest, ImportQuizRequest},
    services::GameService,
    utils::jwt::Actor,
};

/// Lists the caller's quizzes, newest first.
pub async fn list_quizzes(
    State(game): State<GameService>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = game.list_quizzes(&actor).await?;
    Ok(Json(quizzes))
}

/// Saves a quiz from the builder. A PIN is generated server-side.
pub async fn create_quiz(
    State(game): State<GameService>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let detail = game.create_quiz(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// Imports a `.bob`, `.json` or `.csv` file as a new quiz.
pub async fn import_quiz(
    State(game): State<GameService>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<ImportQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let detail = game.import_quiz(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// Parses a file for the builder without saving anything.
pub async fn parse_quiz(
    State(game): State<GameService>,
    Json(payload): Json<ImportQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let parsed = game.parse_file(&payload.filename, &payload.content)?;
    Ok(Json(parsed))
}

/// Exports unsaved builder state as a `.bob` download.
pub async fn export_draft(
    State(game): State<GameService>,
    Json(payload): Json<ExportQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (filename, content) = game.export_draft(&payload)?;
    Ok(bob_download(filename, content))
}

pub async fn get_quiz(
    State(game): State<GameService>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = game.get_quiz(&actor, id).await?;
    Ok(Json(detail))
}

/// Exports a saved quiz as a `.bob` download.
pub async fn export_quiz(
    State(game): State<GameService>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (filename, content) = game.export_quiz(&actor, id).await?;
    Ok(bob_download(filename, content))
}

/// Deletes a quiz with its questions, sessions, participants and answers.
pub async fn delete_quiz(
    State(game): State<GameService>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    game.delete_quiz(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Opens a new waiting session for the quiz.
pub async fn create_session(
    State(game): State<GameService>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = game.create_session(&actor, id).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

fn bob_download(filename: String, content: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        content,
    )
}
