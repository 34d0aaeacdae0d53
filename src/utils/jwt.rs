// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::Config, error::AppError};

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - the teacher's id.
    pub sub: String,
    pub username: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    pub fn teacher_id(&self) -> Result<Uuid, AppError> {
        self.sub
            .parse()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))
    }
}

/// Who is calling a teacher route.
///
/// Inserted into request extensions by [`auth_middleware`] on every teacher
/// route. `Open` is only produced when authentication is switched off and
/// the caller sent no token.
#[derive(Debug, Clone)]
pub enum Actor {
    Teacher(Claims),
    Open,
}

impl Actor {
    /// Owner to stamp on new quizzes.
    pub fn teacher_id(&self) -> Option<Uuid> {
        match self {
            Actor::Teacher(claims) => claims.teacher_id().ok(),
            Actor::Open => None,
        }
    }

    /// Teachers may only touch their own quizzes. Unowned quizzes (created
    /// with auth off) and open actors are not restricted.
    pub fn can_manage(&self, owner: Option<Uuid>) -> bool {
        match (self.teacher_id(), owner) {
            (Some(me), Some(owner)) => me == owner,
            _ => true,
        }
    }
}

/// Signs a new JWT for a teacher.
pub fn sign_jwt(
    id: Uuid,
    username: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: id.to_string(),
        username: username.to_owned(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Axum Middleware: Authentication.
///
/// With `require_auth` on, a valid `Authorization: Bearer <token>` header is
/// mandatory. With it off, a valid token is still honoured so quizzes get an
/// owner, and anything else passes through as [`Actor::Open`].
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let claims = bearer_token(&req).map(|token| verify_jwt(token, &config.jwt_secret));

    let actor = match (claims, config.require_auth) {
        (Some(Ok(claims)), _) => Actor::Teacher(claims),
        (Some(Err(e)), true) => return Err(e),
        (None, true) => {
            return Err(AppError::AuthError("Missing bearer token".to_string()));
        }
        (_, false) => Actor::Open,
    };

    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let id = Uuid::new_v4();
        let token = sign_jwt(id, "co_lan", "secret", 60).unwrap();
        let claims = verify_jwt(&token, "secret").unwrap();
        assert_eq!(claims.teacher_id().unwrap(), id);
        assert_eq!(claims.username, "co_lan");
        assert!(verify_jwt(&token, "other").is_err());
    }

    #[test]
    fn ownership_rules() {
        let me = Uuid::new_v4();
        let actor = Actor::Teacher(Claims {
            sub: me.to_string(),
            username: "t".into(),
            exp: 0,
        });
        assert!(actor.can_manage(Some(me)));
        assert!(!actor.can_manage(Some(Uuid::new_v4())));
        assert!(actor.can_manage(None));
        assert!(Actor::Open.can_manage(Some(me)));
    }
}
