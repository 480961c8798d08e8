//! Screen controllers: validate, call the backend, then move the courier's
//! navigator. One module per group of screens.

pub mod contacts;
pub mod delivery;
pub mod earnings;
pub mod navigation;
pub mod onboarding;
pub mod profile;

use serde::Serialize;

use crate::flow::navigation::Screen;

/// Controller result: the screen the courier lands on plus its payload.
#[derive(Debug, Serialize)]
pub struct Outcome<T: Serialize> {
    pub screen: Screen,
    #[serde(flatten)]
    pub body: T,
}

impl<T: Serialize> Outcome<T> {
    pub fn new(screen: Screen, body: T) -> Self {
        Self { screen, body }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct Empty {}
