//! Profile screens: the registration data view, the Home availability
//! toggle and the profile photo.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::controllers::Outcome;
use crate::error::AppError;
use crate::gateway::Patch;
use crate::models::contact::ContactList;
use crate::models::courier::{
    BankingDetails, CourierId, CourierProfile, PersonalData, Vehicle, fields,
};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub courier_id: CourierId,
    pub display_name: String,
    pub personal: Option<PersonalData>,
    pub vehicle: Option<Vehicle>,
    pub vehicle_description: Option<String>,
    pub banking: Option<BankingDetails>,
    pub available: bool,
    pub registration_complete: bool,
    pub photo_url: Option<String>,
    pub emergency_contacts: ContactList,
    pub on_delivery: bool,
}

impl ProfileView {
    pub fn new(courier_id: CourierId, profile: CourierProfile) -> Self {
        Self {
            courier_id,
            display_name: profile.display_name(),
            vehicle_description: profile.vehicle.as_ref().map(Vehicle::describe),
            on_delivery: profile.active_delivery.is_some(),
            personal: profile.personal,
            vehicle: profile.vehicle,
            banking: profile.banking,
            available: profile.available,
            registration_complete: profile.registration_complete,
            photo_url: profile.photo_url,
            emergency_contacts: profile.emergency_contacts,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AvailabilityRequest {
    pub available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityView {
    pub available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhotoView {
    pub photo_url: String,
}

/// Fixed blob slot per courier; a new upload overwrites the old photo.
pub fn photo_key(courier_id: CourierId) -> String {
    format!("perfil/{courier_id}.jpg")
}

pub async fn view(state: &AppState, courier_id: CourierId) -> Result<Outcome<ProfileView>, AppError> {
    let (profile, _) = state.profile_snapshot(courier_id).await?;
    let screen = state.navigator(courier_id).current();

    Ok(Outcome::new(screen, ProfileView::new(courier_id, profile)))
}

pub async fn set_availability(
    state: &AppState,
    courier_id: CourierId,
    request: AvailabilityRequest,
) -> Result<Outcome<AvailabilityView>, AppError> {
    let (profile, _) = state.profile_snapshot(courier_id).await?;
    if !profile.registration_complete {
        return Err(AppError::Conflict(
            "finish registration before going online".to_string(),
        ));
    }

    let patch = Patch::new()
        .set(fields::AVAILABLE, &request.available)?
        .into_fields();
    state
        .documents
        .update_fields(courier_id, patch, Default::default())
        .await?;

    info!(courier_id = %courier_id, available = request.available, "availability changed");
    Ok(Outcome::new(
        state.navigator(courier_id).current(),
        AvailabilityView {
            available: request.available,
        },
    ))
}

pub async fn upload_photo(
    state: &AppState,
    courier_id: CourierId,
    bytes: Vec<u8>,
    content_type: &str,
) -> Result<Outcome<PhotoView>, AppError> {
    let result = store_photo(state, courier_id, bytes, content_type).await;
    state.metrics.record_submission("photo", &result);
    result
}

async fn store_photo(
    state: &AppState,
    courier_id: CourierId,
    bytes: Vec<u8>,
    content_type: &str,
) -> Result<Outcome<PhotoView>, AppError> {
    if !content_type.starts_with("image/") {
        return Err(AppError::BadRequest(format!(
            "expected an image, got {content_type:?}"
        )));
    }
    if bytes.is_empty() {
        return Err(AppError::BadRequest("the photo is empty".to_string()));
    }
    if bytes.len() > state.max_photo_bytes {
        return Err(AppError::BadRequest(format!(
            "the photo exceeds {} bytes",
            state.max_photo_bytes
        )));
    }

    let key = photo_key(courier_id);
    let size = bytes.len();
    if let Err(err) = state.blobs.upload(&key, bytes, content_type).await {
        warn!(courier_id = %courier_id, error = %err, "photo upload failed");
        return Err(err.into());
    }

    let photo_url = state.blobs.download_url(&key).await?;
    let patch = Patch::new().set(fields::PHOTO_URL, &photo_url)?.into_fields();
    state
        .documents
        .update_fields(courier_id, patch, Default::default())
        .await?;

    info!(courier_id = %courier_id, bytes = size, "profile photo updated");
    Ok(Outcome::new(
        state.navigator(courier_id).current(),
        PhotoView { photo_url },
    ))
}
