use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Json;
use axum::Router;

use crate::api::rest::session::{IdempotencyKey, Session};
use crate::controllers::onboarding::{self, LoginRequest, RegistrationRequest, SessionView};
use crate::controllers::{Empty, Outcome};
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/accounts", post(register))
        .route("/sessions", post(login).delete(logout))
}

async fn register(
    State(state): State<Arc<AppState>>,
    IdempotencyKey(key): IdempotencyKey,
    Json(payload): Json<RegistrationRequest>,
) -> Result<(StatusCode, Json<Outcome<SessionView>>), AppError> {
    let outcome = onboarding::register(&state, payload, key).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Outcome<SessionView>>, AppError> {
    onboarding::login(&state, payload).await.map(Json)
}

async fn logout(State(state): State<Arc<AppState>>, session: Session) -> Json<Outcome<Empty>> {
    Json(onboarding::logout(&state, session.courier_id, session.token).await)
}
