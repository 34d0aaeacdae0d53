// src/handlers/session.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{error::AppError, services::GameService, utils::jwt::Actor};

/// Host view: session, quiz, questions and ranked participants.
pub async fn get_session(
    State(game): State<GameService>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = game.host_view(&actor, id).await?;
    Ok(Json(view))
}

pub async fn start_session(
    State(game): State<GameService>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = game.start(&actor, id).await?;
    Ok(Json(session))
}

pub async fn next_question(
    State(game): State<GameService>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = game.next(&actor, id).await?;
    Ok(Json(session))
}

pub async fn finish_session(
    State(game): State<GameService>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = game.finish(&actor, id).await?;
    Ok(Json(session))
}

pub async fn leaderboard(
    State(game): State<GameService>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let board = game.leaderboard(id).await?;
    Ok(Json(board))
}
