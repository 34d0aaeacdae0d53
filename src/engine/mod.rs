// src/engine/mod.rs

//! Pure game rules, free of storage and transport.

pub mod ranking;
pub mod round;
pub mod session;
