// src/handlers/events.rs

use std::sync::Arc;

use axum::{
    Extension,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{Sink, SinkExt, StreamExt};
use uuid::Uuid;

use crate::{
    error::AppError,
    realtime::{ChangeEvent, ChangeKind, Filter, RealtimeEvent, Table},
    services::GameService,
    store::Store,
    utils::jwt::Actor,
};

/// WebSocket change feed for one session.
///
/// The first message is the current session row; after that every change
/// and countdown tick for the session is forwarded as JSON text.
pub async fn session_events(
    ws: WebSocketUpgrade,
    State(game): State<GameService>,
    State(store): State<Arc<dyn Store>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = store
        .get_session(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    let snapshot = RealtimeEvent::Change(
        ChangeEvent::new(Table::GameSessions, ChangeKind::Update, &session)
            .session(session.id)
            .quiz(session.quiz_id),
    );
    let filter = Filter::Session(session.id);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, game, filter, snapshot)))
}

/// Dashboard feed for one quiz: sessions opening and closing, players
/// joining and answers arriving across every run. Starts with the quiz row.
pub async fn quiz_events(
    ws: WebSocketUpgrade,
    State(game): State<GameService>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = game.get_quiz(&actor, id).await?;

    let snapshot = RealtimeEvent::Change(
        ChangeEvent::new(Table::Quizzes, ChangeKind::Update, &detail.quiz).quiz(detail.quiz.id),
    );
    let filter = Filter::Quiz(detail.quiz.id);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, game, filter, snapshot)))
}

async fn handle_socket(socket: WebSocket, game: GameService, filter: Filter, snapshot: RealtimeEvent) {
    let (mut sender, mut receiver) = socket.split();
    let mut subscription = game.hub().subscribe(filter);

    if send_event(&mut sender, &snapshot).await.is_err() {
        return;
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = subscription.recv().await {
            if send_event(&mut sender, &event).await.is_err() {
                break;
            }
        }
    });

    // Clients only listen; reading is just for noticing the close.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if let Message::Close(_) = message {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    tracing::debug!("Event stream {:?} closed", filter);
}

async fn send_event<S>(sender: &mut S, event: &RealtimeEvent) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    let text = serde_json::to_string(event).map_err(|e| {
        tracing::error!("Failed to encode realtime event: {:?}", e);
    })?;
    sender.send(Message::Text(text.into())).await.map_err(|_| ())
}
