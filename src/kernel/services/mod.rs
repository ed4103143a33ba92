//! Services layer (ports + adapters).
//!
//! - `ports`: pure contracts/types used across the engine (kernel-facing).
//! - `adapters`: runtime specific implementations (IO/async).

pub mod adapters;
pub mod bus;
pub mod ports;

pub use bus::{event_bus, event_bus_with_capacity, EventReceiver, EventSender, SinkKind, StoreEvent};
