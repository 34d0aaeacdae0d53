// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    realtime::ChangeHub,
    services::GameService,
    store::Store,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Config,
    pub game: GameService,
}

impl AppState {
    /// Wires the game service and change hub around a store.
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let game = GameService::new(store.clone(), ChangeHub::new(), &config);
        Self { store, config, game }
    }
}

impl FromRef<AppState> for Arc<dyn Store> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for GameService {
    fn from_ref(state: &AppState) -> Self {
        state.game.clone()
    }
}
