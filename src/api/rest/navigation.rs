use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Json;
use axum::Router;

use crate::api::rest::session::Session;
use crate::controllers::navigation::{self, StackView};
use crate::controllers::Outcome;
use crate::error::AppError;
use crate::flow::navigation::Transition;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/navigation", get(view).post(navigate))
}

async fn view(State(state): State<Arc<AppState>>, session: Session) -> Json<Outcome<StackView>> {
    Json(navigation::view(&state, session.courier_id))
}

async fn navigate(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(transition): Json<Transition>,
) -> Result<Json<Outcome<StackView>>, AppError> {
    navigation::navigate(&state, session.courier_id, transition).map(Json)
}
