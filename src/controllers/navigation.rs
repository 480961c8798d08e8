use serde::Serialize;
use tracing::debug;

use crate::controllers::Outcome;
use crate::error::AppError;
use crate::flow::navigation::{NavigationError, Screen, Transition};
use crate::models::courier::CourierId;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct StackView {
    pub stack: Vec<Screen>,
}

pub fn view(state: &AppState, courier_id: CourierId) -> Outcome<StackView> {
    let navigator = state.navigator(courier_id);

    Outcome::new(
        navigator.current(),
        StackView {
            stack: navigator.stack().to_vec(),
        },
    )
}

/// Courier-initiated navigation: tabs, back, profile sub-screens. Delivery
/// screens can be neither entered nor left this way.
pub fn navigate(
    state: &AppState,
    courier_id: CourierId,
    transition: Transition,
) -> Result<Outcome<StackView>, AppError> {
    let current = state.navigator(courier_id).current();
    if current.is_delivery_step() {
        return Err(NavigationError::DeliveryOwned(current).into());
    }
    if let Transition::Push(to) | Transition::Replace(to) | Transition::Reset(to) = transition {
        if to.is_delivery_step() {
            return Err(NavigationError::DeliveryOwned(to).into());
        }
    }

    let screen = state.navigate(courier_id, transition)?;
    debug!(courier_id = %courier_id, transition = %transition, screen = %screen, "navigated");

    Ok(view(state, courier_id))
}
