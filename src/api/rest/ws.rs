use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::future;
use futures::{Sink, SinkExt, StreamExt};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::api::rest::session::Session;
use crate::controllers::profile::ProfileView;
use crate::models::courier::{CourierId, CourierProfile};
use crate::state::AppState;

/// Pushes the courier's profile view every time their document changes.
pub async fn profile_live(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    session: Session,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, session.courier_id))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, courier_id: CourierId) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before reading so no change slips in between.
    let mut updates = BroadcastStream::new(state.documents.watch()).filter_map(move |item| {
        future::ready(match item {
            Ok(snapshot) if snapshot.id == courier_id => Some(snapshot.fields),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(courier_id = %courier_id, skipped, "profile feed lagged");
                None
            }
        })
    });

    let initial = match state.profile_snapshot(courier_id).await {
        Ok((profile, _)) => Some(profile),
        Err(err) => {
            warn!(courier_id = %courier_id, error = %err, "could not load profile for live feed");
            None
        }
    };

    info!(courier_id = %courier_id, "profile feed connected");

    let send_task = tokio::spawn(async move {
        if let Some(profile) = initial {
            if send_profile(&mut sender, courier_id, profile).await.is_err() {
                return;
            }
        }

        while let Some(fields) = updates.next().await {
            let profile = match CourierProfile::from_fields(&fields) {
                Ok(profile) => profile,
                Err(err) => {
                    warn!(courier_id = %courier_id, error = %err, "skipping malformed profile");
                    continue;
                }
            };

            if send_profile(&mut sender, courier_id, profile).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    until_either_ends(send_task, recv_task).await;

    info!(courier_id = %courier_id, "profile feed disconnected");
}

/// Waits for the first task to finish, then aborts the other and waits for it
/// to wind down. A dropped handle would leave it running.
async fn until_either_ends(mut first: JoinHandle<()>, mut second: JoinHandle<()>) {
    let other = tokio::select! {
        _ = &mut first => second,
        _ = &mut second => first,
    };
    other.abort();
    let _ = other.await;
}

async fn send_profile<S>(
    sender: &mut S,
    courier_id: CourierId,
    profile: CourierProfile,
) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    let json = match serde_json::to_string(&ProfileView::new(courier_id, profile)) {
        Ok(json) => json,
        Err(err) => {
            warn!(courier_id = %courier_id, error = %err, "failed to serialize profile for ws");
            return Ok(());
        }
    };

    sender.send(Message::Text(json)).await.map_err(|_| ())
}
