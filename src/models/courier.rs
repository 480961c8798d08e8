use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::flow::lifecycle::DeliveryLifecycle;
use crate::flow::navigation::Screen;
use crate::gateway::Fields;
use crate::models::contact::ContactList;
use crate::models::offer::CompletedDelivery;

pub type CourierId = Uuid;

/// Top-level keys of the profile document. Every onboarding step merges
/// exactly one group of these.
pub mod fields {
    pub const PERSONAL: &str = "personal";
    pub const VEHICLE: &str = "vehicle";
    pub const BANKING: &str = "banking";
    pub const AVAILABLE: &str = "available";
    pub const REGISTRATION_COMPLETE: &str = "registration_complete";
    pub const EMERGENCY_CONTACTS: &str = "emergency_contacts";
    pub const PHOTO_URL: &str = "photo_url";
    pub const ACTIVE_DELIVERY: &str = "active_delivery";
    pub const COMPLETED_DELIVERIES: &str = "completed_deliveries";
}

const FALLBACK_DISPLAY_NAME: &str = "Entregador";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonalData {
    pub first_name: String,
    pub last_name: String,
    pub document_number: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VehicleKind {
    #[serde(rename = "bicicleta")]
    Bicycle,
    #[serde(rename = "moto")]
    Motorcycle,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Vehicle {
    #[serde(rename = "bicicleta")]
    Bicycle { model: String, color: String },
    #[serde(rename = "moto")]
    Motorcycle { model: String, plate: String },
}

impl Vehicle {
    pub fn kind(&self) -> VehicleKind {
        match self {
            Vehicle::Bicycle { .. } => VehicleKind::Bicycle,
            Vehicle::Motorcycle { .. } => VehicleKind::Motorcycle,
        }
    }

    /// One-line label shown on the registration data screen.
    pub fn describe(&self) -> String {
        match self {
            Vehicle::Motorcycle { model, plate } => format!("Moto - {model} ({plate})"),
            Vehicle::Bicycle { model, color } => format!("Bicicleta - {model} - {color}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BankingDetails {
    pub bank: String,
    pub branch: String,
    pub account: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierProfile {
    pub personal: Option<PersonalData>,
    pub vehicle: Option<Vehicle>,
    pub banking: Option<BankingDetails>,
    pub available: bool,
    pub registration_complete: bool,
    pub emergency_contacts: ContactList,
    pub photo_url: Option<String>,
    pub active_delivery: Option<DeliveryLifecycle>,
    pub completed_deliveries: Vec<CompletedDelivery>,
}

impl CourierProfile {
    pub fn from_fields(fields: &Fields) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(fields.clone()))
    }

    pub fn display_name(&self) -> String {
        let full = self
            .personal
            .as_ref()
            .map(|p| format!("{} {}", p.first_name, p.last_name).trim().to_string())
            .unwrap_or_default();

        if full.is_empty() {
            FALLBACK_DISPLAY_NAME.to_string()
        } else {
            full
        }
    }

    /// First onboarding screen still missing data, if any.
    pub fn pending_onboarding_step(&self) -> Option<Screen> {
        if self.registration_complete {
            return None;
        }

        if self.vehicle.is_none() {
            Some(Screen::VehicleRegistration)
        } else {
            Some(Screen::BankingRegistration)
        }
    }
}
