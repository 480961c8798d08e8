//! Emergency contact list editor.
//!
//! Every mutation rewrites the whole list, guarded twice: the caller must
//! present the list revision it last saw, and the write is a compare-and-swap
//! on the document version it was read at.

use serde::Deserialize;
use tracing::info;

use crate::controllers::Outcome;
use crate::error::AppError;
use crate::gateway::{GatewayError, WriteOptions};
use crate::input::format::{PHONE_DIGITS, format_bounded, format_phone};
use crate::input::validate::{ContactForm, ValidationError, validate_contact};
use crate::models::contact::{ContactList, EmergencyContact, resolve_relationship};
use crate::models::courier::{CourierId, fields};
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactRequest {
    pub name: String,
    pub phone: String,
    pub relationship: String,
    /// Used when `relationship` is "Outro".
    pub custom_relationship: String,
    pub expected_revision: u64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct DeleteRequest {
    pub expected_revision: u64,
    pub confirm: bool,
}

pub async fn list(state: &AppState, courier_id: CourierId) -> Result<Outcome<ContactList>, AppError> {
    let (profile, _) = state.profile_snapshot(courier_id).await?;
    Ok(Outcome::new(
        state.navigator(courier_id).current(),
        profile.emergency_contacts,
    ))
}

pub async fn add(
    state: &AppState,
    courier_id: CourierId,
    request: ContactRequest,
) -> Result<Outcome<ContactList>, AppError> {
    let result: Result<Outcome<ContactList>, AppError> = async {
        let expected_revision = request.expected_revision;
        let contact = build_contact(request)?;

        rewrite(state, courier_id, expected_revision, |contacts| {
            contacts.push(contact);
            Ok(())
        })
        .await
    }
    .await;

    state.metrics.record_submission("contact", &result);
    result
}

pub async fn edit(
    state: &AppState,
    courier_id: CourierId,
    index: usize,
    request: ContactRequest,
) -> Result<Outcome<ContactList>, AppError> {
    let result: Result<Outcome<ContactList>, AppError> = async {
        let expected_revision = request.expected_revision;
        let contact = build_contact(request)?;

        rewrite(state, courier_id, expected_revision, |contacts| {
            contacts
                .replace(index, contact)
                .map(|_| ())
                .ok_or_else(|| missing(index))
        })
        .await
    }
    .await;

    state.metrics.record_submission("contact", &result);
    result
}

pub async fn delete(
    state: &AppState,
    courier_id: CourierId,
    index: usize,
    request: DeleteRequest,
) -> Result<Outcome<ContactList>, AppError> {
    let result: Result<Outcome<ContactList>, AppError> = async {
        if !request.confirm {
            return Err(AppError::ConfirmationRequired(
                "confirm the removal of this contact".to_string(),
            ));
        }

        rewrite(state, courier_id, request.expected_revision, |contacts| {
            contacts.remove(index).map(|_| ()).ok_or_else(|| missing(index))
        })
        .await
    }
    .await;

    state.metrics.record_submission("contact", &result);
    result
}

fn build_contact(request: ContactRequest) -> Result<EmergencyContact, ValidationError> {
    let form = ContactForm {
        name: request.name.trim().to_string(),
        phone: format_bounded(&request.phone, PHONE_DIGITS, format_phone),
        relationship: resolve_relationship(&request.relationship, &request.custom_relationship),
    };
    validate_contact(&form)?;

    Ok(EmergencyContact {
        name: form.name,
        phone: form.phone,
        relationship: form.relationship,
    })
}

fn missing(index: usize) -> AppError {
    AppError::NotFound(format!("no emergency contact at position {index}"))
}

async fn rewrite<F>(
    state: &AppState,
    courier_id: CourierId,
    expected_revision: u64,
    mutate: F,
) -> Result<Outcome<ContactList>, AppError>
where
    F: FnOnce(&mut ContactList) -> Result<(), AppError>,
{
    let (profile, version) = state.profile_snapshot(courier_id).await?;
    let mut contacts = profile.emergency_contacts;

    if contacts.revision != expected_revision {
        return Err(AppError::Conflict(format!(
            "contact list is at revision {}, you edited revision {expected_revision}",
            contacts.revision
        )));
    }

    mutate(&mut contacts)?;

    let value = serde_json::to_value(&contacts).map_err(GatewayError::from)?;
    state
        .documents
        .overwrite_field(
            courier_id,
            fields::EMERGENCY_CONTACTS,
            value,
            WriteOptions::default().expecting(version),
        )
        .await?;

    info!(
        courier_id = %courier_id,
        revision = contacts.revision,
        contacts = contacts.entries.len(),
        "emergency contacts saved"
    );
    Ok(Outcome::new(state.navigator(courier_id).current(), contacts))
}
