// src/models/mod.rs

pub mod answer;
pub mod game_session;
pub mod participant;
pub mod question;
pub mod quiz;
pub mod teacher;
