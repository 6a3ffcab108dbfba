//! Alert events.
//!
//! This module provides:
//! - The `Alert` shown to the user and the events around its lifecycle
//! - An event bus for internal pub/sub

mod bus;
mod event;

pub use bus::{AlertBus, AlertSubscriber};
pub use event::{Alert, AlertEvent};
