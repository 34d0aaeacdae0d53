// src/handlers/mod.rs

pub mod auth;
pub mod events;
pub mod health;
pub mod play;
pub mod quiz;
pub mod session;
