use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;

use crate::api::rest::session::{IdempotencyKey, Session};
use crate::api::rest::ws;
use crate::controllers::onboarding::{self, BankingRequest, BankingView, VehicleRequest, VehicleView};
use crate::controllers::profile::{
    self as controller, AvailabilityRequest, AvailabilityView, PhotoView, ProfileView,
};
use crate::controllers::Outcome;
use crate::error::AppError;
use crate::state::AppState;

pub fn router(max_photo_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/profile", get(view))
        .route("/profile/vehicle", put(save_vehicle))
        .route("/profile/banking", put(save_banking))
        .route("/profile/availability", put(set_availability))
        .route(
            "/profile/photo",
            post(upload_photo).layer(DefaultBodyLimit::max(max_photo_bytes)),
        )
        .route("/profile/live", get(ws::profile_live))
        .route("/blobs/*key", get(download_blob))
}

async fn view(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<Outcome<ProfileView>>, AppError> {
    controller::view(&state, session.courier_id).await.map(Json)
}

async fn save_vehicle(
    State(state): State<Arc<AppState>>,
    session: Session,
    IdempotencyKey(key): IdempotencyKey,
    Json(payload): Json<VehicleRequest>,
) -> Result<Json<Outcome<VehicleView>>, AppError> {
    onboarding::save_vehicle(&state, session.courier_id, payload, key)
        .await
        .map(Json)
}

async fn save_banking(
    State(state): State<Arc<AppState>>,
    session: Session,
    IdempotencyKey(key): IdempotencyKey,
    Json(payload): Json<BankingRequest>,
) -> Result<Json<Outcome<BankingView>>, AppError> {
    onboarding::save_banking(&state, session.courier_id, payload, key)
        .await
        .map(Json)
}

async fn set_availability(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<AvailabilityRequest>,
) -> Result<Json<Outcome<AvailabilityView>>, AppError> {
    controller::set_availability(&state, session.courier_id, payload)
        .await
        .map(Json)
}

async fn upload_photo(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Outcome<PhotoView>>, AppError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    controller::upload_photo(&state, session.courier_id, body.to_vec(), content_type)
        .await
        .map(Json)
}

async fn download_blob(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let blob = state.blobs.download(&key).await?;
    Ok(([(CONTENT_TYPE, blob.content_type)], blob.bytes))
}
