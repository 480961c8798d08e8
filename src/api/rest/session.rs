//! Request extractors shared by the authenticated routes.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;
use crate::gateway::SessionToken;
use crate::models::courier::CourierId;
use crate::state::AppState;

const IDEMPOTENCY_HEADER: &str = "idempotency-key";

/// The signed-in courier, resolved from `Authorization: Bearer <token>`.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    pub courier_id: CourierId,
    pub token: SessionToken,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or(AppError::Unauthorized)?;

        let courier_id = state
            .auth
            .current_identity(token)
            .await
            .ok_or(AppError::Unauthorized)?;

        Ok(Session { courier_id, token })
    }
}

/// Optional `Idempotency-Key` header carried by form submissions.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdempotencyKey(pub Option<Uuid>);

#[async_trait]
impl<S> FromRequestParts<S> for IdempotencyKey
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(IDEMPOTENCY_HEADER) else {
            return Ok(IdempotencyKey(None));
        };

        let key = value
            .to_str()
            .ok()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .ok_or_else(|| AppError::BadRequest("idempotency key must be a uuid".to_string()))?;

        Ok(IdempotencyKey(Some(key)))
    }
}
