//! Screen graph of the courier app.
//!
//! The app is a linear stack of screens with a four-entry tab set at its
//! root. Every move is expressed as a [`Transition`] and checked against the
//! edge tables below before the stack changes.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Welcome,
    Login,
    Register,
    VehicleRegistration,
    BankingRegistration,
    Home,
    Earnings,
    Help,
    Profile,
    Notifications,
    NewDelivery,
    PickupRoute,
    ConfirmPickup,
    DropoffRoute,
    ConfirmDropoff,
    RouteCompleted,
    ProfileData,
    EmergencyContacts,
}

impl Screen {
    pub const TABS: [Screen; 4] = [Screen::Home, Screen::Earnings, Screen::Help, Screen::Profile];

    pub fn is_tab(self) -> bool {
        Self::TABS.contains(&self)
    }

    /// Screens driven by the delivery lifecycle rather than by free navigation.
    pub fn is_delivery_step(self) -> bool {
        matches!(
            self,
            Screen::NewDelivery
                | Screen::PickupRoute
                | Screen::ConfirmPickup
                | Screen::DropoffRoute
                | Screen::ConfirmDropoff
                | Screen::RouteCompleted
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Screen::Welcome => "welcome",
            Screen::Login => "login",
            Screen::Register => "register",
            Screen::VehicleRegistration => "vehicle_registration",
            Screen::BankingRegistration => "banking_registration",
            Screen::Home => "home",
            Screen::Earnings => "earnings",
            Screen::Help => "help",
            Screen::Profile => "profile",
            Screen::Notifications => "notifications",
            Screen::NewDelivery => "new_delivery",
            Screen::PickupRoute => "pickup_route",
            Screen::ConfirmPickup => "confirm_pickup",
            Screen::DropoffRoute => "dropoff_route",
            Screen::ConfirmDropoff => "confirm_dropoff",
            Screen::RouteCompleted => "route_completed",
            Screen::ProfileData => "profile_data",
            Screen::EmergencyContacts => "emergency_contacts",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "screen", rename_all = "snake_case")]
pub enum Transition {
    Push(Screen),
    Replace(Screen),
    Back,
    Reset(Screen),
    SwitchTab(Screen),
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Push(screen) => write!(f, "push {screen}"),
            Transition::Replace(screen) => write!(f, "replace with {screen}"),
            Transition::Back => f.write_str("back"),
            Transition::Reset(screen) => write!(f, "reset to {screen}"),
            Transition::SwitchTab(screen) => write!(f, "switch to tab {screen}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("cannot {transition} from {from}")]
    NotAllowed { from: Screen, transition: Transition },

    #[error("no previous screen to return to")]
    NothingToPop,

    #[error("{0} is only reachable through the delivery flow")]
    DeliveryOwned(Screen),
}

use Screen::*;

const PUSH_EDGES: &[(Screen, Screen)] = &[
    (Welcome, Login),
    (Welcome, Register),
    (Login, Register),
    (Register, VehicleRegistration),
    (VehicleRegistration, BankingRegistration),
    (Home, Notifications),
    (Home, NewDelivery),
    (Earnings, NewDelivery),
    (Help, NewDelivery),
    (Profile, NewDelivery),
    (Profile, ProfileData),
    (Profile, EmergencyContacts),
    (PickupRoute, ConfirmPickup),
    (ConfirmPickup, DropoffRoute),
    (DropoffRoute, ConfirmDropoff),
    (ConfirmDropoff, RouteCompleted),
];

const REPLACE_EDGES: &[(Screen, Screen)] = &[(NewDelivery, PickupRoute)];

const RESET_EDGES: &[(Screen, Screen)] = &[
    (Login, Home),
    (Login, VehicleRegistration),
    (Login, BankingRegistration),
    (BankingRegistration, Home),
    (BankingRegistration, Login),
    (RouteCompleted, Home),
    (Profile, Welcome),
];

fn has_edge(edges: &[(Screen, Screen)], from: Screen, to: Screen) -> bool {
    edges.iter().any(|&(a, b)| a == from && b == to)
}

/// Per-courier screen stack. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigator {
    stack: Vec<Screen>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self {
            stack: vec![Welcome],
        }
    }
}

impl Navigator {
    /// Rebuilds a stack, e.g. after sign-in or to resume an interrupted
    /// delivery.
    pub fn starting_at(stack: Vec<Screen>) -> Self {
        if stack.is_empty() {
            Self::default()
        } else {
            Self { stack }
        }
    }

    pub fn current(&self) -> Screen {
        self.stack.last().copied().unwrap_or(Welcome)
    }

    pub fn stack(&self) -> &[Screen] {
        &self.stack
    }

    pub fn check(&self, transition: Transition) -> Result<(), NavigationError> {
        let from = self.current();
        let allowed = match transition {
            Transition::Push(to) => has_edge(PUSH_EDGES, from, to),
            Transition::Replace(to) => has_edge(REPLACE_EDGES, from, to),
            Transition::Reset(to) => has_edge(RESET_EDGES, from, to),
            Transition::SwitchTab(to) => from.is_tab() && to.is_tab(),
            Transition::Back => {
                if self.stack.len() > 1 {
                    true
                } else {
                    return Err(NavigationError::NothingToPop);
                }
            }
        };

        if allowed {
            Ok(())
        } else {
            Err(NavigationError::NotAllowed { from, transition })
        }
    }

    pub fn apply(&mut self, transition: Transition) -> Result<Screen, NavigationError> {
        self.check(transition)?;

        match transition {
            Transition::Push(to) => self.stack.push(to),
            Transition::Replace(to) | Transition::SwitchTab(to) => {
                self.stack.pop();
                self.stack.push(to);
            }
            Transition::Back => {
                self.stack.pop();
            }
            Transition::Reset(to) => {
                self.stack.clear();
                self.stack.push(to);
            }
        }

        Ok(self.current())
    }
}
