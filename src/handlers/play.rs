// src/handlers/play.rs

//! Player-facing routes. None of them require a token.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{answer::SubmitAnswerRequest, participant::RegisterRequest},
    services::GameService,
};

/// Resolves a PIN to the quiz, its latest session and the questions
/// without their answers.
pub async fn lookup_pin(
    State(game): State<GameService>,
    Path(pin): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let view = game.lookup_pin(&pin).await?;
    Ok(Json(view))
}

pub async fn register(
    State(game): State<GameService>,
    Path(pin): Path<String>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let participant = game.register(&pin, payload).await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

/// Submits an answer to the session's open question. A second submission
/// for the same question is rejected with 409.
pub async fn submit_answer(
    State(game): State<GameService>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = game.submit_answer(session_id, payload).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub participant_id: Option<Uuid>,
}

pub async fn answer_stats(
    State(game): State<GameService>,
    Path((session_id, question_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let stats = game
        .answer_stats(session_id, question_id, query.participant_id)
        .await?;
    Ok(Json(stats))
}
