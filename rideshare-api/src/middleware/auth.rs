use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rideshare_core::{Caller, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::{AppState, AuthConfig};

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

impl Claims {
    fn caller(&self) -> Option<Caller> {
        let user_id = Uuid::parse_str(&self.sub).ok()?;
        let role = Role::parse(&self.role)?;
        Some(Caller::new(user_id, role))
    }
}

pub fn issue_token(auth: &AuthConfig, user_id: Uuid, role: Role) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.as_str().to_owned(),
        exp: (Utc::now() + Duration::seconds(auth.expiration as i64)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(auth.secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

// ============================================================================
// Authentication Middleware
// ============================================================================

/// Resolve the bearer token to a `Caller` and hand it to the handlers.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::AuthenticationError("Not authorized, no token".to_string()))?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthenticationError("Not authorized, token failed".to_string()))?;

    let caller = token_data
        .claims
        .caller()
        .ok_or_else(|| AppError::AuthenticationError("Not authorized, malformed token".to_string()))?;

    req.extensions_mut().insert(caller);

    Ok(next.run(req).await)
}
