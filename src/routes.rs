// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{auth, events, health, play, quiz, session},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Teacher routes (quizzes, session control) sit behind `auth_middleware`.
/// * Player routes (PIN lookup, registration, answers, stats, events) are open.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_DISPOSITION]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes).post(quiz::create_quiz))
        .route("/import", post(quiz::import_quiz))
        .route("/parse", post(quiz::parse_quiz))
        .route("/export", post(quiz::export_draft))
        .route("/{id}", get(quiz::get_quiz).delete(quiz::delete_quiz))
        .route("/{id}/export", get(quiz::export_quiz))
        .route("/{id}/sessions", post(quiz::create_session))
        .route("/{id}/events", get(events::quiz_events))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let host_routes = Router::new()
        .route("/{id}", get(session::get_session))
        .route("/{id}/start", post(session::start_session))
        .route("/{id}/next", post(session::next_question))
        .route("/{id}/finish", post(session::finish_session))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let live_routes = Router::new()
        .route("/{id}/leaderboard", get(session::leaderboard))
        .route("/{id}/events", get(events::session_events))
        .route("/{id}/answers", post(play::submit_answer))
        .route("/{id}/questions/{question_id}/stats", get(play::answer_stats));

    let play_routes = Router::new()
        .route("/{pin}", get(play::lookup_pin))
        .route("/{pin}/participants", post(play::register));

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/api/auth", auth_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/sessions", host_routes.merge(live_routes))
        .nest("/api/play", play_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
