// src/config.rs

use std::env;
use std::str::FromStr;

use dotenvy::dotenv;

/// Fallback countdown length, in seconds.
pub const DEFAULT_QUESTION_TIMER: i32 = 30;

/// Fallback value of a correct answer when a question carries no points.
pub const DEFAULT_QUESTION_POINTS: i32 = 100;

/// Longest countdown a question may carry, in seconds.
pub const MAX_QUESTION_TIMER: i32 = 3600;

/// Most points a single question may award.
pub const MAX_QUESTION_POINTS: i32 = 100_000;

/// Points per correct answer under [`ScoringPolicy::Flat`].
pub const FLAT_SCORE: i32 = 10;

/// Length of the join code shown to players.
pub const PIN_LENGTH: usize = 6;

/// How many points a correct answer is worth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringPolicy {
    /// Award the question's configured `points`.
    QuestionPoints,
    /// Award [`FLAT_SCORE`] regardless of the question.
    Flat,
}

impl ScoringPolicy {
    pub fn points_for(&self, question_points: i32) -> i32 {
        match self {
            ScoringPolicy::QuestionPoints => question_points.max(0),
            ScoringPolicy::Flat => FLAT_SCORE,
        }
    }
}

impl FromStr for ScoringPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "question_points" | "points" => Ok(ScoringPolicy::QuestionPoints),
            "flat" => Ok(ScoringPolicy::Flat),
            other => Err(format!("unknown scoring policy '{}'", other)),
        }
    }
}

/// Where the per-question countdown length comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPolicy {
    /// Use each question's `timer`.
    PerQuestion,
    /// Always count down from [`DEFAULT_QUESTION_TIMER`].
    Fixed,
}

impl TimerPolicy {
    pub fn seconds_for(&self, question_timer: i32) -> u64 {
        let secs = match self {
            TimerPolicy::PerQuestion if question_timer > 0 => question_timer,
            _ => DEFAULT_QUESTION_TIMER,
        };
        secs as u64
    }
}

impl FromStr for TimerPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_question" | "question" => Ok(TimerPolicy::PerQuestion),
            "fixed" => Ok(TimerPolicy::Fixed),
            other => Err(format!("unknown timer policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without it the in-memory store is used.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    /// Guard teacher routes with JWT auth.
    pub require_auth: bool,
    pub scoring: ScoringPolicy,
    pub timer: TimerPolicy,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let require_auth = env::var("REQUIRE_AUTH")
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no" | "off"))
            .unwrap_or(true);

        let scoring = env::var("SCORING_POLICY")
            .ok()
            .map(|v| v.parse().expect("SCORING_POLICY must be 'question_points' or 'flat'"))
            .unwrap_or(ScoringPolicy::QuestionPoints);

        let timer = env::var("TIMER_POLICY")
            .ok()
            .map(|v| v.parse().expect("TIMER_POLICY must be 'per_question' or 'fixed'"))
            .unwrap_or(TimerPolicy::PerQuestion);

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:5173".to_string(),
                    "http://127.0.0.1:5173".to_string(),
                ]
            });

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port,
            require_auth,
            scoring,
            timer,
            cors_origins,
        }
    }

    /// Configuration for tests and local experiments: memory store, open routes.
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            jwt_secret: "test_secret_for_integration_tests".to_string(),
            jwt_expiration: 600,
            rust_log: "error".to_string(),
            port: 0,
            require_auth: false,
            scoring: ScoringPolicy::QuestionPoints,
            timer: TimerPolicy::PerQuestion,
            cors_origins: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policies_parse_from_env_strings() {
        assert_eq!("flat".parse::<ScoringPolicy>().unwrap(), ScoringPolicy::Flat);
        assert_eq!(
            " Question_Points ".parse::<ScoringPolicy>().unwrap(),
            ScoringPolicy::QuestionPoints
        );
        assert_eq!("fixed".parse::<TimerPolicy>().unwrap(), TimerPolicy::Fixed);
        assert!("bogus".parse::<TimerPolicy>().is_err());
    }

    #[test]
    fn flat_scoring_ignores_question_points() {
        assert_eq!(ScoringPolicy::Flat.points_for(500), FLAT_SCORE);
        assert_eq!(ScoringPolicy::QuestionPoints.points_for(500), 500);
        assert_eq!(ScoringPolicy::QuestionPoints.points_for(-5), 0);
    }

    #[test]
    fn fixed_timer_ignores_question_timer() {
        assert_eq!(TimerPolicy::Fixed.seconds_for(90), 30);
        assert_eq!(TimerPolicy::PerQuestion.seconds_for(90), 90);
        assert_eq!(TimerPolicy::PerQuestion.seconds_for(0), 30);
    }
}
