// src/utils/pin.rs

use rand::Rng;

use crate::config::PIN_LENGTH;

/// Random 6-digit join code without a leading zero.
pub fn generate_pin() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == PIN_LENGTH && pin.bytes().all(|b| b.is_ascii_digit())
}
