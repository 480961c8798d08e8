use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::session::Session;
use crate::controllers::delivery::{self, ActiveDelivery, DispatchedOffer, OfferRequest};
use crate::controllers::earnings::{self, EarningsStatement};
use crate::controllers::Outcome;
use crate::error::AppError;
use crate::flow::lifecycle::DeliveryAction;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers/:id/offers", post(present_offer))
        .route("/delivery", get(active))
        .route("/delivery/accept", post(accept))
        .route("/delivery/decline", post(decline))
        .route("/delivery/arrive-pickup", post(arrive_pickup))
        .route("/delivery/confirm-pickup", post(confirm_pickup))
        .route("/delivery/arrive-dropoff", post(arrive_dropoff))
        .route("/delivery/confirm-dropoff", post(confirm_dropoff))
        .route("/delivery/continue", post(finish))
        .route("/earnings", get(statement))
}

#[derive(Deserialize)]
pub struct CodeRequest {
    #[serde(default)]
    pub code: String,
}

type DeliveryResponse = Result<Json<Outcome<ActiveDelivery>>, AppError>;

/// Called by the dispatcher, not by the courier app.
async fn present_offer(
    State(state): State<Arc<AppState>>,
    Path(courier_id): Path<Uuid>,
    Json(payload): Json<OfferRequest>,
) -> Result<(StatusCode, Json<Outcome<DispatchedOffer>>), AppError> {
    let outcome = delivery::present_offer(&state, courier_id, payload).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn active(State(state): State<Arc<AppState>>, session: Session) -> DeliveryResponse {
    delivery::active(&state, session.courier_id).await.map(Json)
}

async fn accept(State(state): State<Arc<AppState>>, session: Session) -> DeliveryResponse {
    perform(&state, session, DeliveryAction::Accept).await
}

async fn decline(State(state): State<Arc<AppState>>, session: Session) -> DeliveryResponse {
    perform(&state, session, DeliveryAction::Decline).await
}

async fn arrive_pickup(State(state): State<Arc<AppState>>, session: Session) -> DeliveryResponse {
    perform(&state, session, DeliveryAction::ArriveAtPickup).await
}

async fn confirm_pickup(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<CodeRequest>,
) -> DeliveryResponse {
    let action = DeliveryAction::ConfirmPickup { code: payload.code };
    perform(&state, session, action).await
}

async fn arrive_dropoff(State(state): State<Arc<AppState>>, session: Session) -> DeliveryResponse {
    perform(&state, session, DeliveryAction::ArriveAtDropoff).await
}

async fn confirm_dropoff(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<CodeRequest>,
) -> DeliveryResponse {
    let action = DeliveryAction::ConfirmDropoff { code: payload.code };
    perform(&state, session, action).await
}

async fn finish(State(state): State<Arc<AppState>>, session: Session) -> DeliveryResponse {
    perform(&state, session, DeliveryAction::Continue).await
}

async fn perform(state: &AppState, session: Session, action: DeliveryAction) -> DeliveryResponse {
    delivery::act(state, session.courier_id, action).await.map(Json)
}

async fn statement(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<Outcome<EarningsStatement>>, AppError> {
    earnings::statement(&state, session.courier_id).await.map(Json)
}
