//! In-process stand-ins for the radio and the location service.
//!
//! Both are deterministic when seeded, so integration tests and offline
//! demos can drive the full client without Wi-Fi hardware or a network.

mod radio;
mod service;

pub use radio::{RadioConfig, RadioPosition, SimulatedRadio};
pub use service::{SimulatedService, fingerprint_distance};
