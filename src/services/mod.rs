// src/services/mod.rs

pub mod countdown;
pub mod game;

pub use game::GameService;
