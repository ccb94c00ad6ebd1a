pub mod client;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod output;
pub mod place;
pub mod sampler;
pub mod worker;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use client::{HttpTransport, Identity, ResolutionClient, Transport, UpdateRequest};
pub use config::LocatorConfig;
pub use error::{LocatorError, Result};
pub use fingerprint::{Fingerprint, FingerprintCache, SignalSample};
pub use place::{Candidate, Coordinate, MapId, PlaceId, ResolutionResult};
pub use worker::{Intent, PollingWorker, WorkerEvent, WorkerHandle};
