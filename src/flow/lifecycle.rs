//! Delivery lifecycle state machine.
//!
//! Progresses linearly: Offered → EnRouteToPickup → AtPickup →
//! EnRouteToDropoff → AtDropoff → Completed. The whole record is
//! serializable so an interrupted delivery can be restored exactly where it
//! stopped.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::flow::navigation::Screen;
use crate::models::offer::{CompletedDelivery, DeliveryOffer};

const CODE_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStage {
    Offered,
    EnRouteToPickup,
    AtPickup,
    EnRouteToDropoff,
    AtDropoff,
    Completed,
}

impl DeliveryStage {
    pub fn screen(self) -> Screen {
        match self {
            DeliveryStage::Offered => Screen::NewDelivery,
            DeliveryStage::EnRouteToPickup => Screen::PickupRoute,
            DeliveryStage::AtPickup => Screen::ConfirmPickup,
            DeliveryStage::EnRouteToDropoff => Screen::DropoffRoute,
            DeliveryStage::AtDropoff => Screen::ConfirmDropoff,
            DeliveryStage::Completed => Screen::RouteCompleted,
        }
    }

    /// Navigation stack that leads to this stage, Home tab first.
    pub fn screen_trail(self) -> Vec<Screen> {
        if self == DeliveryStage::Offered {
            return vec![Screen::Home, Screen::NewDelivery];
        }

        let mut trail = vec![Screen::Home];
        let mut stage = DeliveryStage::EnRouteToPickup;
        loop {
            trail.push(stage.screen());
            if stage == self {
                return trail;
            }
            match stage.next() {
                Some(next) => stage = next,
                None => return trail,
            }
        }
    }

    pub fn next(self) -> Option<DeliveryStage> {
        match self {
            DeliveryStage::Offered => Some(DeliveryStage::EnRouteToPickup),
            DeliveryStage::EnRouteToPickup => Some(DeliveryStage::AtPickup),
            DeliveryStage::AtPickup => Some(DeliveryStage::EnRouteToDropoff),
            DeliveryStage::EnRouteToDropoff => Some(DeliveryStage::AtDropoff),
            DeliveryStage::AtDropoff => Some(DeliveryStage::Completed),
            DeliveryStage::Completed => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStage::Offered => "offered",
            DeliveryStage::EnRouteToPickup => "en_route_to_pickup",
            DeliveryStage::AtPickup => "at_pickup",
            DeliveryStage::EnRouteToDropoff => "en_route_to_dropoff",
            DeliveryStage::AtDropoff => "at_dropoff",
            DeliveryStage::Completed => "completed",
        }
    }
}

impl fmt::Display for DeliveryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DeliveryAction {
    Accept,
    Decline,
    ArriveAtPickup,
    ConfirmPickup { code: String },
    ArriveAtDropoff,
    ConfirmDropoff { code: String },
    Continue,
}

impl DeliveryAction {
    pub fn name(&self) -> &'static str {
        match self {
            DeliveryAction::Accept => "accept",
            DeliveryAction::Decline => "decline",
            DeliveryAction::ArriveAtPickup => "arrive at pickup",
            DeliveryAction::ConfirmPickup { .. } => "confirm pickup",
            DeliveryAction::ArriveAtDropoff => "arrive at drop-off",
            DeliveryAction::ConfirmDropoff { .. } => "confirm drop-off",
            DeliveryAction::Continue => "continue",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    Pickup,
    Dropoff,
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checkpoint::Pickup => f.write_str("pickup"),
            Checkpoint::Dropoff => f.write_str("drop-off"),
        }
    }
}

/// How confirmation codes typed by the courier are judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodePolicy {
    /// Code must be four digits and equal the issued one.
    #[default]
    Verify,
    /// Any input advances the delivery, including an empty one.
    AcceptAny,
}

impl FromStr for CodePolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "verify" => Ok(CodePolicy::Verify),
            "accept-any" | "accept_any" => Ok(CodePolicy::AcceptAny),
            other => Err(format!("unknown code policy {other:?}, expected verify or accept-any")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("cannot {action} while the delivery is {stage}")]
    InvalidAction {
        stage: DeliveryStage,
        action: &'static str,
    },

    #[error("the {0} code must have four digits")]
    MalformedCode(Checkpoint),

    #[error("the {0} code does not match")]
    CodeRejected(Checkpoint),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Advanced {
        from: DeliveryStage,
        to: DeliveryStage,
    },
    Declined,
    Finished,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageChange {
    pub from: DeliveryStage,
    pub to: DeliveryStage,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryLifecycle {
    pub id: Uuid,
    pub offer: DeliveryOffer,
    pub stage: DeliveryStage,
    pub history: Vec<StageChange>,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryLifecycle {
    pub fn offered(offer: DeliveryOffer) -> Self {
        Self {
            id: offer.id,
            updated_at: offer.offered_at,
            offer,
            stage: DeliveryStage::Offered,
            history: Vec::new(),
        }
    }

    /// Applies one courier action. On error the lifecycle is unchanged.
    pub fn apply(
        &mut self,
        action: &DeliveryAction,
        policy: CodePolicy,
        now: DateTime<Utc>,
    ) -> Result<Outcome, LifecycleError> {
        use DeliveryAction as A;
        use DeliveryStage as S;

        match (self.stage, action) {
            (S::Offered, A::Decline) => Ok(Outcome::Declined),
            (S::Completed, A::Continue) => Ok(Outcome::Finished),
            (S::Offered, A::Accept)
            | (S::EnRouteToPickup, A::ArriveAtPickup)
            | (S::EnRouteToDropoff, A::ArriveAtDropoff) => Ok(self.advance(now)),
            (S::AtPickup, A::ConfirmPickup { code }) => {
                check_code(policy, code, &self.offer.codes.pickup, Checkpoint::Pickup)?;
                Ok(self.advance(now))
            }
            (S::AtDropoff, A::ConfirmDropoff { code }) => {
                check_code(policy, code, &self.offer.codes.dropoff, Checkpoint::Dropoff)?;
                Ok(self.advance(now))
            }
            (stage, action) => Err(LifecycleError::InvalidAction {
                stage,
                action: action.name(),
            }),
        }
    }

    pub fn completion_record(&self) -> Option<CompletedDelivery> {
        if self.stage != DeliveryStage::Completed {
            return None;
        }

        Some(CompletedDelivery {
            delivery_id: self.id,
            pickup_name: self.offer.pickup.name.clone(),
            dropoff_name: self.offer.dropoff.name.clone(),
            price_cents: self.offer.price_cents,
            distance_km: self.offer.distance_km,
            completed_at: self.updated_at,
        })
    }

    fn advance(&mut self, now: DateTime<Utc>) -> Outcome {
        let from = self.stage;
        let Some(to) = from.next() else {
            return Outcome::Finished;
        };

        self.stage = to;
        self.updated_at = now;
        self.history.push(StageChange { from, to, at: now });
        Outcome::Advanced { from, to }
    }
}

/// Exactly four ASCII digits, the only shape a courier can type in.
pub fn is_well_formed_code(code: &str) -> bool {
    code.len() == CODE_LEN && code.chars().all(|c| c.is_ascii_digit())
}

fn check_code(
    policy: CodePolicy,
    entered: &str,
    issued: &str,
    checkpoint: Checkpoint,
) -> Result<(), LifecycleError> {
    if policy == CodePolicy::AcceptAny {
        return Ok(());
    }

    let entered = entered.trim();
    if !is_well_formed_code(entered) {
        return Err(LifecycleError::MalformedCode(checkpoint));
    }

    if entered != issued {
        return Err(LifecycleError::CodeRejected(checkpoint));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::offer::{ConfirmationCodes, Place};

    fn offer() -> DeliveryOffer {
        DeliveryOffer {
            id: Uuid::from_u128(7),
            pickup: Place {
                name: "Farmácia Central".to_string(),
                address: "Rua A, 123".to_string(),
            },
            dropoff: Place {
                name: "Cliente".to_string(),
                address: "Rua B, 456".to_string(),
            },
            price_cents: 1_250,
            distance_km: 4.01,
            duration_minutes: 21,
            return_possible: true,
            codes: ConfirmationCodes {
                pickup: "1234".to_string(),
                dropoff: "5678".to_string(),
            },
            offered_at: Utc::now(),
        }
    }

    fn confirm_pickup(code: &str) -> DeliveryAction {
        DeliveryAction::ConfirmPickup {
            code: code.to_string(),
        }
    }

    fn confirm_dropoff(code: &str) -> DeliveryAction {
        DeliveryAction::ConfirmDropoff {
            code: code.to_string(),
        }
    }

    #[test]
    fn full_walk_with_verified_codes() {
        let mut lifecycle = DeliveryLifecycle::offered(offer());
        let now = Utc::now();
        let steps = [
            DeliveryAction::Accept,
            DeliveryAction::ArriveAtPickup,
            confirm_pickup("1234"),
            DeliveryAction::ArriveAtDropoff,
            confirm_dropoff("5678"),
        ];

        for action in &steps {
            let outcome = lifecycle.apply(action, CodePolicy::Verify, now).unwrap();
            assert!(matches!(outcome, Outcome::Advanced { .. }));
        }

        assert_eq!(lifecycle.stage, DeliveryStage::Completed);
        assert_eq!(lifecycle.history.len(), 5);

        let record = lifecycle.completion_record().unwrap();
        assert_eq!(record.price_cents, 1_250);
        assert_eq!(record.pickup_name, "Farmácia Central");

        assert_eq!(
            lifecycle
                .apply(&DeliveryAction::Continue, CodePolicy::Verify, now)
                .unwrap(),
            Outcome::Finished
        );
    }

    #[test]
    fn accept_any_advances_on_any_pickup_entry() {
        for code in ["", "0000", "9999", "12"] {
            let mut lifecycle = DeliveryLifecycle::offered(offer());
            let now = Utc::now();
            lifecycle.apply(&DeliveryAction::Accept, CodePolicy::AcceptAny, now).unwrap();
            lifecycle
                .apply(&DeliveryAction::ArriveAtPickup, CodePolicy::AcceptAny, now)
                .unwrap();

            lifecycle
                .apply(&confirm_pickup(code), CodePolicy::AcceptAny, now)
                .unwrap();
            assert_eq!(lifecycle.stage, DeliveryStage::EnRouteToDropoff);
        }
    }

    #[test]
    fn wrong_or_malformed_code_keeps_stage() {
        let mut lifecycle = DeliveryLifecycle::offered(offer());
        let now = Utc::now();
        lifecycle.apply(&DeliveryAction::Accept, CodePolicy::Verify, now).unwrap();
        lifecycle
            .apply(&DeliveryAction::ArriveAtPickup, CodePolicy::Verify, now)
            .unwrap();

        assert_eq!(
            lifecycle.apply(&confirm_pickup("4321"), CodePolicy::Verify, now),
            Err(LifecycleError::CodeRejected(Checkpoint::Pickup))
        );
        assert_eq!(
            lifecycle.apply(&confirm_pickup("12a4"), CodePolicy::Verify, now),
            Err(LifecycleError::MalformedCode(Checkpoint::Pickup))
        );
        assert_eq!(lifecycle.stage, DeliveryStage::AtPickup);
        assert_eq!(lifecycle.history.len(), 2);

        lifecycle
            .apply(&confirm_pickup(" 1234 "), CodePolicy::Verify, now)
            .unwrap();
        assert_eq!(lifecycle.stage, DeliveryStage::EnRouteToDropoff);
    }

    #[test]
    fn out_of_order_actions_are_rejected() {
        let mut lifecycle = DeliveryLifecycle::offered(offer());
        let now = Utc::now();

        let err = lifecycle
            .apply(&DeliveryAction::ArriveAtDropoff, CodePolicy::Verify, now)
            .unwrap_err();
        assert_eq!(
            err,
            LifecycleError::InvalidAction {
                stage: DeliveryStage::Offered,
                action: "arrive at drop-off",
            }
        );

        lifecycle.apply(&DeliveryAction::Accept, CodePolicy::Verify, now).unwrap();
        assert!(lifecycle
            .apply(&DeliveryAction::Decline, CodePolicy::Verify, now)
            .is_err());
        assert!(lifecycle.completion_record().is_none());
    }

    #[test]
    fn screen_trail_rebuilds_the_stack() {
        assert_eq!(
            DeliveryStage::Offered.screen_trail(),
            [Screen::Home, Screen::NewDelivery]
        );
        assert_eq!(
            DeliveryStage::AtPickup.screen_trail(),
            [Screen::Home, Screen::PickupRoute, Screen::ConfirmPickup]
        );
        assert_eq!(DeliveryStage::Completed.screen_trail().len(), 6);
    }

    #[test]
    fn persisted_lifecycle_resumes_at_same_stage() {
        let mut lifecycle = DeliveryLifecycle::offered(offer());
        let now = Utc::now();
        lifecycle.apply(&DeliveryAction::Accept, CodePolicy::Verify, now).unwrap();

        let stored = serde_json::to_value(&lifecycle).unwrap();
        assert_eq!(stored["stage"], "en_route_to_pickup");

        let mut restored: DeliveryLifecycle = serde_json::from_value(stored).unwrap();
        assert_eq!(restored, lifecycle);
        restored
            .apply(&DeliveryAction::ArriveAtPickup, CodePolicy::Verify, now)
            .unwrap();
        assert_eq!(restored.stage, DeliveryStage::AtPickup);
    }

    #[test]
    fn code_policy_parses_from_config() {
        assert_eq!("verify".parse::<CodePolicy>(), Ok(CodePolicy::Verify));
        assert_eq!("Accept-Any".parse::<CodePolicy>(), Ok(CodePolicy::AcceptAny));
        assert!("strict".parse::<CodePolicy>().is_err());
    }
}
