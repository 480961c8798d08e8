//! Account creation, sign-in and the vehicle / banking onboarding steps.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::controllers::{Empty, Outcome};
use crate::error::AppError;
use crate::flow::navigation::{Screen, Transition};
use crate::gateway::{GatewayError, Patch, SessionToken, WriteOptions};
use crate::input::format::{
    BRANCH_DIGITS, DOCUMENT_DIGITS, PHONE_DIGITS, format_account, format_branch, format_bounded,
    format_document_number, format_phone,
};
use crate::input::validate::{
    BankingForm, RegistrationForm, ValidationError, VehicleForm, validate_banking,
    validate_credentials, validate_registration, validate_vehicle,
};
use crate::models::contact::ContactList;
use crate::models::courier::{
    BankingDetails, CourierId, CourierProfile, PersonalData, Vehicle, VehicleKind, fields,
};
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationRequest {
    pub first_name: String,
    pub last_name: String,
    pub document_number: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VehicleRequest {
    pub vehicle_type: Option<VehicleKind>,
    pub model: String,
    pub plate: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BankingRequest {
    pub bank: String,
    pub branch: String,
    pub account: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub courier_id: CourierId,
    pub token: SessionToken,
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleView {
    pub vehicle: Vehicle,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BankingView {
    pub banking: BankingDetails,
}

pub async fn register(
    state: &AppState,
    request: RegistrationRequest,
    idempotency_key: Option<Uuid>,
) -> Result<Outcome<SessionView>, AppError> {
    let result = register_courier(state, request, idempotency_key).await;
    state.metrics.record_submission("registration", &result);
    result
}

async fn register_courier(
    state: &AppState,
    request: RegistrationRequest,
    idempotency_key: Option<Uuid>,
) -> Result<Outcome<SessionView>, AppError> {
    let form = RegistrationForm {
        first_name: request.first_name,
        last_name: request.last_name,
        document_number: format_bounded(
            &request.document_number,
            DOCUMENT_DIGITS,
            format_document_number,
        ),
        email: request.email,
        phone: format_bounded(&request.phone, PHONE_DIGITS, format_phone),
        password: request.password,
        password_confirmation: request.password_confirmation,
    };
    validate_registration(&form)?;

    let identity = state
        .auth
        .create_account(&form.email, &form.password, idempotency_key)
        .await?;
    let courier_id = identity.courier_id;

    let personal = PersonalData {
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        document_number: form.document_number,
        email: form.email,
        phone: form.phone,
    };
    let document = Patch::new()
        .set(fields::PERSONAL, &personal)?
        .set(fields::AVAILABLE, &false)?
        .set(fields::REGISTRATION_COMPLETE, &false)?
        .set(fields::EMERGENCY_CONTACTS, &ContactList::default())?
        .into_fields();
    let receipt = state
        .documents
        .create_document(courier_id, document, WriteOptions::idempotent(idempotency_key))
        .await?;

    if receipt.replayed {
        // The first submission went through; the courier may be further on.
        let live = state.navigators.get(&courier_id).map(|navigator| navigator.current());
        let screen = match live {
            Some(screen) => screen,
            None => {
                let (profile, _) = state.profile_snapshot(courier_id).await?;
                resume_navigation(state, courier_id, &profile)?
            }
        };
        info!(courier_id = %courier_id, screen = %screen, "registration replayed");
        return Ok(Outcome::new(
            screen,
            SessionView {
                courier_id,
                token: identity.token,
            },
        ));
    }

    state.restore_navigation(courier_id, vec![Screen::Welcome, Screen::Register]);
    let screen = state.navigate(courier_id, Transition::Push(Screen::VehicleRegistration))?;

    info!(courier_id = %courier_id, "courier registered");
    Ok(Outcome::new(
        screen,
        SessionView {
            courier_id,
            token: identity.token,
        },
    ))
}

pub async fn login(state: &AppState, request: LoginRequest) -> Result<Outcome<SessionView>, AppError> {
    let result = sign_in(state, request).await;
    state.metrics.record_submission("login", &result);
    result
}

async fn sign_in(state: &AppState, request: LoginRequest) -> Result<Outcome<SessionView>, AppError> {
    validate_credentials(&request.email, &request.password)?;

    let identity = state.auth.sign_in(&request.email, &request.password).await?;
    let courier_id = identity.courier_id;

    let profile = match state.documents.read_document(courier_id).await? {
        Some(doc) => CourierProfile::from_fields(&doc.fields).map_err(GatewayError::from)?,
        None => {
            warn!(courier_id = %courier_id, "account has no profile document, creating an empty one");
            let document = Patch::new()
                .set(fields::AVAILABLE, &false)?
                .set(fields::REGISTRATION_COMPLETE, &false)?
                .into_fields();
            state
                .documents
                .create_document(courier_id, document, WriteOptions::default())
                .await?;
            CourierProfile::default()
        }
    };

    let screen = resume_navigation(state, courier_id, &profile)?;

    info!(courier_id = %courier_id, screen = %screen, "courier signed in");
    Ok(Outcome::new(
        screen,
        SessionView {
            courier_id,
            token: identity.token,
        },
    ))
}

/// Rebuilds the stack from what the profile says: the interrupted delivery
/// if there is one, else the first incomplete onboarding step, else Home.
fn resume_navigation(
    state: &AppState,
    courier_id: CourierId,
    profile: &CourierProfile,
) -> Result<Screen, AppError> {
    match &profile.active_delivery {
        Some(active) => {
            info!(
                courier_id = %courier_id,
                delivery_id = %active.id,
                stage = %active.stage,
                "resuming interrupted delivery"
            );
            Ok(state.restore_navigation(courier_id, active.stage.screen_trail()))
        }
        None => {
            state.restore_navigation(courier_id, vec![Screen::Welcome, Screen::Login]);
            let target = profile.pending_onboarding_step().unwrap_or(Screen::Home);
            Ok(state.navigate(courier_id, Transition::Reset(target))?)
        }
    }
}

pub async fn logout(state: &AppState, courier_id: CourierId, token: SessionToken) -> Outcome<Empty> {
    state.auth.sign_out(token).await;
    state.navigators.remove(&courier_id);

    info!(courier_id = %courier_id, "courier signed out");
    Outcome::new(Screen::Welcome, Empty {})
}

pub async fn save_vehicle(
    state: &AppState,
    courier_id: CourierId,
    request: VehicleRequest,
    idempotency_key: Option<Uuid>,
) -> Result<Outcome<VehicleView>, AppError> {
    let result = store_vehicle(state, courier_id, request, idempotency_key).await;
    state.metrics.record_submission("vehicle", &result);
    result
}

async fn store_vehicle(
    state: &AppState,
    courier_id: CourierId,
    request: VehicleRequest,
    idempotency_key: Option<Uuid>,
) -> Result<Outcome<VehicleView>, AppError> {
    let vehicle = build_vehicle(VehicleForm {
        kind: request.vehicle_type,
        model: request.model,
        plate: request.plate,
        color: request.color,
    })?;

    let view = VehicleView {
        description: vehicle.describe(),
        vehicle,
    };
    if state.is_settled(idempotency_key) {
        info!(courier_id = %courier_id, "vehicle submission replayed");
        return Ok(Outcome::new(state.navigator(courier_id).current(), view));
    }

    let transition = Transition::Push(Screen::BankingRegistration);
    state.check_navigation(courier_id, transition)?;

    let patch = Patch::new().set(fields::VEHICLE, &view.vehicle)?.into_fields();
    let receipt = state
        .documents
        .update_fields(courier_id, patch, WriteOptions::idempotent(idempotency_key))
        .await?;

    let screen = if receipt.replayed {
        state.navigator(courier_id).current()
    } else {
        state.commit_navigation(courier_id, transition, || vec![Screen::BankingRegistration])
    };
    state.settle(idempotency_key);
    info!(courier_id = %courier_id, "vehicle saved");

    Ok(Outcome::new(screen, view))
}

fn build_vehicle(form: VehicleForm) -> Result<Vehicle, ValidationError> {
    validate_vehicle(&form)?;

    let model = form.model.trim().to_string();
    match form.kind {
        Some(VehicleKind::Motorcycle) => Ok(Vehicle::Motorcycle {
            model,
            plate: form.plate.trim().to_string(),
        }),
        Some(VehicleKind::Bicycle) => Ok(Vehicle::Bicycle {
            model,
            color: form.color.trim().to_string(),
        }),
        None => Err(ValidationError::MissingVehicleType),
    }
}

pub async fn save_banking(
    state: &AppState,
    courier_id: CourierId,
    request: BankingRequest,
    idempotency_key: Option<Uuid>,
) -> Result<Outcome<BankingView>, AppError> {
    let result = store_banking(state, courier_id, request, idempotency_key).await;
    state.metrics.record_submission("banking", &result);
    result
}

async fn store_banking(
    state: &AppState,
    courier_id: CourierId,
    request: BankingRequest,
    idempotency_key: Option<Uuid>,
) -> Result<Outcome<BankingView>, AppError> {
    let form = BankingForm {
        bank: request.bank.trim().to_string(),
        branch: format_bounded(&request.branch, BRANCH_DIGITS, format_branch),
        account: format_account(&request.account),
    };
    validate_banking(&form)?;

    let banking = BankingDetails {
        bank: form.bank,
        branch: form.branch,
        account: form.account,
    };
    if state.is_settled(idempotency_key) {
        info!(courier_id = %courier_id, "banking submission replayed");
        return Ok(Outcome::new(
            state.navigator(courier_id).current(),
            BankingView { banking },
        ));
    }

    let transition = Transition::Reset(Screen::Home);
    state.check_navigation(courier_id, transition)?;

    let patch = Patch::new()
        .set(fields::BANKING, &banking)?
        .set(fields::REGISTRATION_COMPLETE, &true)?
        .set(fields::AVAILABLE, &true)?
        .into_fields();
    let receipt = state
        .documents
        .update_fields(courier_id, patch, WriteOptions::idempotent(idempotency_key))
        .await?;

    let screen = if receipt.replayed {
        state.navigator(courier_id).current()
    } else {
        state.commit_navigation(courier_id, transition, || vec![Screen::Home])
    };
    state.settle(idempotency_key);
    info!(courier_id = %courier_id, "registration completed");

    Ok(Outcome::new(screen, BankingView { banking }))
}
