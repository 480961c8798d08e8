use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Place {
    pub name: String,
    pub address: String,
}

/// Four-digit codes handed to the store and the customer. The courier has
/// to collect them on site; they never appear in courier-facing payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfirmationCodes {
    pub pickup: String,
    pub dropoff: String,
}

impl ConfirmationCodes {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            pickup: format!("{:04}", rng.gen_range(0..10_000)),
            dropoff: format!("{:04}", rng.gen_range(0..10_000)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryOffer {
    pub id: Uuid,
    pub pickup: Place,
    pub dropoff: Place,
    pub price_cents: u64,
    pub distance_km: f64,
    pub duration_minutes: u32,
    pub return_possible: bool,
    pub codes: ConfirmationCodes,
    pub offered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OfferView {
    pub id: Uuid,
    pub pickup: Place,
    pub dropoff: Place,
    pub price_cents: u64,
    pub distance_km: f64,
    pub duration_minutes: u32,
    pub return_possible: bool,
    pub offered_at: DateTime<Utc>,
}

impl From<&DeliveryOffer> for OfferView {
    fn from(offer: &DeliveryOffer) -> Self {
        Self {
            id: offer.id,
            pickup: offer.pickup.clone(),
            dropoff: offer.dropoff.clone(),
            price_cents: offer.price_cents,
            distance_km: offer.distance_km,
            duration_minutes: offer.duration_minutes,
            return_possible: offer.return_possible,
            offered_at: offer.offered_at,
        }
    }
}

/// Ledger entry written when a drop-off is confirmed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletedDelivery {
    pub delivery_id: Uuid,
    pub pickup_name: String,
    pub dropoff_name: String,
    pub price_cents: u64,
    pub distance_km: f64,
    pub completed_at: DateTime<Utc>,
}
