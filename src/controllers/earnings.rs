use serde::Serialize;

use crate::controllers::Outcome;
use crate::error::AppError;
use crate::models::courier::CourierId;
use crate::models::offer::CompletedDelivery;
use crate::state::AppState;

/// Sum of what was actually recorded at drop-off; nothing is estimated.
#[derive(Debug, Clone, Serialize)]
pub struct EarningsStatement {
    pub total_cents: u64,
    pub total_distance_km: f64,
    pub count: usize,
    pub deliveries: Vec<CompletedDelivery>,
}

impl EarningsStatement {
    pub fn from_records(mut deliveries: Vec<CompletedDelivery>) -> Self {
        deliveries.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

        Self {
            total_cents: deliveries
                .iter()
                .fold(0u64, |total, d| total.saturating_add(d.price_cents)),
            total_distance_km: deliveries.iter().map(|d| d.distance_km).sum(),
            count: deliveries.len(),
            deliveries,
        }
    }
}

pub async fn statement(
    state: &AppState,
    courier_id: CourierId,
) -> Result<Outcome<EarningsStatement>, AppError> {
    let (profile, _) = state.profile_snapshot(courier_id).await?;

    Ok(Outcome::new(
        state.navigator(courier_id).current(),
        EarningsStatement::from_records(profile.completed_deliveries),
    ))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::controllers::testing::{onboarded, state};

    fn record(price_cents: u64, minutes_ago: i64) -> CompletedDelivery {
        CompletedDelivery {
            delivery_id: Uuid::new_v4(),
            pickup_name: "Loja".to_string(),
            dropoff_name: "Cliente".to_string(),
            price_cents,
            distance_km: 2.0,
            completed_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn statement_sums_and_orders_newest_first() {
        let statement =
            EarningsStatement::from_records(vec![record(1000, 30), record(750, 5), record(500, 60)]);

        assert_eq!(statement.total_cents, 2250);
        assert_eq!(statement.count, 3);
        let prices: Vec<_> = statement.deliveries.iter().map(|d| d.price_cents).collect();
        assert_eq!(prices, [750, 1000, 500]);
    }

    #[test]
    fn totals_saturate_instead_of_overflowing() {
        let statement = EarningsStatement::from_records(vec![record(u64::MAX, 10), record(1, 5)]);

        assert_eq!(statement.total_cents, u64::MAX);
        assert_eq!(statement.count, 2);
    }

    #[tokio::test]
    async fn new_courier_has_empty_statement() {
        let (state, _backend) = state();
        let session = onboarded(&state, "joana@example.com").await;

        let outcome = statement(&state, session.courier_id).await.unwrap();
        assert_eq!(outcome.body.total_cents, 0);
        assert_eq!(outcome.body.count, 0);
        assert!(outcome.body.deliveries.is_empty());
    }
}
