//! Owner of the delivery lifecycle. Presents offers from the dispatcher,
//! applies courier actions, persists the lifecycle on the profile document
//! and drives the courier through the delivery screens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::controllers::Outcome;
use crate::error::AppError;
use crate::flow::lifecycle::{
    DeliveryAction, DeliveryLifecycle, DeliveryStage, LifecycleError, Outcome as StepOutcome,
    StageChange, is_well_formed_code,
};
use crate::flow::navigation::{Screen, Transition};
use crate::gateway::{Patch, WriteOptions};
use crate::models::courier::{CourierId, fields};
use crate::models::offer::{ConfirmationCodes, DeliveryOffer, OfferView, Place};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct OfferRequest {
    pub pickup: Place,
    pub dropoff: Place,
    pub price_cents: u64,
    pub distance_km: f64,
    pub duration_minutes: u32,
    #[serde(default)]
    pub return_possible: bool,
    /// Codes already handed to the store and the customer. Generated when
    /// absent.
    #[serde(default)]
    pub codes: Option<ConfirmationCodes>,
}

impl OfferRequest {
    /// Rejects offers a courier could never finish: codes that cannot be
    /// typed at the checkpoints, or a distance that would corrupt earnings.
    fn validate(&self) -> Result<(), AppError> {
        if !self.distance_km.is_finite() || self.distance_km < 0.0 {
            return Err(AppError::BadRequest(
                "distance_km must be a non-negative number".to_string(),
            ));
        }
        if let Some(codes) = &self.codes {
            for (checkpoint, code) in [("pickup", &codes.pickup), ("dropoff", &codes.dropoff)] {
                if !is_well_formed_code(code) {
                    return Err(AppError::BadRequest(format!(
                        "the {checkpoint} code must have four digits"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Courier-facing view of the lifecycle; confirmation codes are left out.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryView {
    pub id: Uuid,
    pub stage: DeliveryStage,
    pub offer: OfferView,
    pub history: Vec<StageChange>,
    pub updated_at: DateTime<Utc>,
}

impl From<&DeliveryLifecycle> for DeliveryView {
    fn from(lifecycle: &DeliveryLifecycle) -> Self {
        Self {
            id: lifecycle.id,
            stage: lifecycle.stage,
            offer: OfferView::from(&lifecycle.offer),
            history: lifecycle.history.clone(),
            updated_at: lifecycle.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveDelivery {
    pub delivery: Option<DeliveryView>,
}

/// Dispatcher response: the offer as shown to the courier plus the codes
/// to distribute.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchedOffer {
    #[serde(flatten)]
    pub delivery: DeliveryView,
    pub codes: ConfirmationCodes,
}

pub async fn active(state: &AppState, courier_id: CourierId) -> Result<Outcome<ActiveDelivery>, AppError> {
    let (profile, _) = state.profile_snapshot(courier_id).await?;

    Ok(Outcome::new(
        state.navigator(courier_id).current(),
        ActiveDelivery {
            delivery: profile.active_delivery.as_ref().map(DeliveryView::from),
        },
    ))
}

pub async fn present_offer(
    state: &AppState,
    courier_id: CourierId,
    request: OfferRequest,
) -> Result<Outcome<DispatchedOffer>, AppError> {
    request.validate()?;
    let (profile, version) = state.profile_snapshot(courier_id).await?;

    if !profile.available {
        return Err(AppError::Conflict(
            "courier is not available for deliveries".to_string(),
        ));
    }
    if let Some(current) = &profile.active_delivery {
        return Err(AppError::Conflict(format!(
            "courier is already on delivery {}",
            current.id
        )));
    }

    let transition = Transition::Push(Screen::NewDelivery);
    state.check_navigation(courier_id, transition)?;

    let offer = DeliveryOffer {
        id: Uuid::new_v4(),
        pickup: request.pickup,
        dropoff: request.dropoff,
        price_cents: request.price_cents,
        distance_km: request.distance_km,
        duration_minutes: request.duration_minutes,
        return_possible: request.return_possible,
        codes: request.codes.unwrap_or_else(ConfirmationCodes::generate),
        offered_at: Utc::now(),
    };
    let lifecycle = DeliveryLifecycle::offered(offer);

    let patch = Patch::new()
        .set(fields::ACTIVE_DELIVERY, &lifecycle)?
        .into_fields();
    state
        .documents
        .update_fields(courier_id, patch, WriteOptions::default().expecting(version))
        .await?;

    let screen = state.commit_navigation(courier_id, transition, || {
        DeliveryStage::Offered.screen_trail()
    });

    state.metrics.active_deliveries.inc();
    state
        .metrics
        .delivery_transitions_total
        .with_label_values(&[DeliveryStage::Offered.as_str()])
        .inc();
    info!(
        courier_id = %courier_id,
        delivery_id = %lifecycle.id,
        price_cents = lifecycle.offer.price_cents,
        "delivery offered"
    );

    Ok(Outcome::new(
        screen,
        DispatchedOffer {
            delivery: DeliveryView::from(&lifecycle),
            codes: lifecycle.offer.codes.clone(),
        },
    ))
}

/// Applies one courier action to the active delivery.
///
/// The new lifecycle is written with a compare-and-swap on the version it
/// was read at, so a repeated or concurrent action fails instead of
/// advancing twice.
pub async fn act(
    state: &AppState,
    courier_id: CourierId,
    action: DeliveryAction,
) -> Result<Outcome<ActiveDelivery>, AppError> {
    let (profile, version) = state.profile_snapshot(courier_id).await?;
    let Some(mut lifecycle) = profile.active_delivery else {
        return Err(AppError::NotFound("no active delivery".to_string()));
    };

    let step = match lifecycle.apply(&action, state.code_policy, Utc::now()) {
        Ok(step) => step,
        Err(err) => {
            if matches!(
                err,
                LifecycleError::CodeRejected(_) | LifecycleError::MalformedCode(_)
            ) {
                warn!(
                    courier_id = %courier_id,
                    delivery_id = %lifecycle.id,
                    error = %err,
                    "confirmation code refused"
                );
            }
            return Err(err.into());
        }
    };

    let transition = match step {
        StepOutcome::Advanced {
            from: DeliveryStage::Offered,
            ..
        } => Transition::Replace(Screen::PickupRoute),
        StepOutcome::Advanced { to, .. } => Transition::Push(to.screen()),
        StepOutcome::Declined => Transition::Back,
        StepOutcome::Finished => Transition::Reset(Screen::Home),
    };
    state.check_navigation(courier_id, transition)?;

    let patch = match step {
        StepOutcome::Advanced { to, .. } => {
            let mut patch = Patch::new().set(fields::ACTIVE_DELIVERY, &lifecycle)?;
            if to == DeliveryStage::Completed {
                let mut completed = profile.completed_deliveries;
                completed.extend(lifecycle.completion_record());
                patch = patch.set(fields::COMPLETED_DELIVERIES, &completed)?;
            }
            patch
        }
        StepOutcome::Declined | StepOutcome::Finished => {
            Patch::new().clear(fields::ACTIVE_DELIVERY)
        }
    };
    state
        .documents
        .update_fields(
            courier_id,
            patch.into_fields(),
            WriteOptions::default().expecting(version),
        )
        .await?;

    let screen = state.commit_navigation(courier_id, transition, || match &step {
        StepOutcome::Advanced { to, .. } => to.screen_trail(),
        StepOutcome::Declined | StepOutcome::Finished => vec![Screen::Home],
    });
    record_step(state, courier_id, &lifecycle, &step);

    let delivery = match step {
        StepOutcome::Advanced { .. } => Some(DeliveryView::from(&lifecycle)),
        StepOutcome::Declined | StepOutcome::Finished => None,
    };
    Ok(Outcome::new(screen, ActiveDelivery { delivery }))
}

fn record_step(
    state: &AppState,
    courier_id: CourierId,
    lifecycle: &DeliveryLifecycle,
    step: &StepOutcome,
) {
    let metrics = &state.metrics;

    match step {
        StepOutcome::Advanced { from, to } => {
            metrics
                .delivery_transitions_total
                .with_label_values(&[to.as_str()])
                .inc();
            if *to == DeliveryStage::Completed {
                metrics.deliveries_completed_total.inc();
                metrics.active_deliveries.dec();
            }
            info!(
                courier_id = %courier_id,
                delivery_id = %lifecycle.id,
                from = %from,
                to = %to,
                "delivery advanced"
            );
        }
        StepOutcome::Declined => {
            metrics
                .delivery_transitions_total
                .with_label_values(&["declined"])
                .inc();
            metrics.active_deliveries.dec();
            info!(courier_id = %courier_id, delivery_id = %lifecycle.id, "offer declined");
        }
        StepOutcome::Finished => {
            info!(courier_id = %courier_id, delivery_id = %lifecycle.id, "delivery closed");
        }
    }
}
