//! Status publishing
//!
//! [`EventBus`] fans station events out to observers (UI bridge, logging).
//! Event types live in `shared::message`.

pub mod bus;

pub use bus::{EventBus, EventSubscriber, LoggingSubscriber, SubscriberId};
pub use shared::message::{StationEvent, WeightUpdate};
