use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, put};
use axum::Json;
use axum::Router;

use crate::api::rest::session::Session;
use crate::controllers::contacts::{self, ContactRequest, DeleteRequest};
use crate::controllers::Outcome;
use crate::error::AppError;
use crate::models::contact::ContactList;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/contacts", get(list).post(add))
        .route("/contacts/:index", put(edit).delete(remove))
}

async fn list(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<Outcome<ContactList>>, AppError> {
    contacts::list(&state, session.courier_id).await.map(Json)
}

async fn add(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<ContactRequest>,
) -> Result<Json<Outcome<ContactList>>, AppError> {
    contacts::add(&state, session.courier_id, payload).await.map(Json)
}

async fn edit(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(index): Path<usize>,
    Json(payload): Json<ContactRequest>,
) -> Result<Json<Outcome<ContactList>>, AppError> {
    contacts::edit(&state, session.courier_id, index, payload)
        .await
        .map(Json)
}

/// `DELETE /contacts/:index?expected_revision=N&confirm=true`
async fn remove(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(index): Path<usize>,
    Query(params): Query<DeleteRequest>,
) -> Result<Json<Outcome<ContactList>>, AppError> {
    contacts::delete(&state, session.courier_id, index, params)
        .await
        .map(Json)
}
