//! Background location worker.
//!
//! Exactly one worker thread talks to the service. The foreground sends it
//! [`Intent`]s through a [`WorkerHandle`] and receives [`WorkerEvent`]s back;
//! neither side touches the other's state. The intent queue holds a single
//! entry, so at most one request is ever in flight. A refresh asked for while
//! another refresh is running or queued is coalesced away rather than piling
//! up.

mod actor;
mod handle;

pub use actor::{PollingWorker, WorkerOptions, WorkerState};
pub use handle::{Dispatch, WorkerHandle};

use crate::client::PersonLookup;
use crate::error::LocatorError;
use crate::place::{Coordinate, PlaceId, ResolutionResult};

/// Something the user (or the refresh timer) wants done.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Take a fresh reading, ask where we are, then confirm the top guess
    Refresh,
    /// The user picked the right place: train it, then post it
    Correct {
        place: PlaceId,
        coordinate: Coordinate,
    },
    /// Claim a place without touching reference data
    Post {
        place: PlaceId,
        status: Option<String>,
    },
    QueryPerson(String),
    CheckPlace(PlaceId),
    Cloak(String),
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::Refresh => "refresh",
            Intent::Correct { .. } => "correct",
            Intent::Post { .. } => "post",
            Intent::QueryPerson(_) => "query",
            Intent::CheckPlace(_) => "check",
            Intent::Cloak(_) => "cloak",
        }
    }
}

/// Result of one worker operation as seen by the foreground.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Completed(T),
    Failed(LocatorError),
    /// The worker has gone offline; nothing was sent
    Disabled,
}

impl<T> Outcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Outcome::Disabled)
    }

    pub fn completed(&self) -> Option<&T> {
        match self {
            Outcome::Completed(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&LocatorError> {
        match self {
            Outcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl<T> From<crate::error::Result<T>> for Outcome<T> {
    fn from(result: crate::error::Result<T>) -> Self {
        match result {
            Ok(value) => Outcome::Completed(value),
            Err(e) => Outcome::Failed(e),
        }
    }
}

/// Published worker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Idle,
    Busy,
    Offline,
}

/// Messages from the worker to the foreground, in the order the underlying
/// requests were issued.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Status(WorkerStatus),
    Located(Outcome<ResolutionResult>),
    Posted {
        place: PlaceId,
        outcome: Outcome<ResolutionResult>,
    },
    Corrected {
        place: PlaceId,
        outcome: Outcome<String>,
    },
    PersonFound {
        username: String,
        outcome: Outcome<PersonLookup>,
    },
    PlaceChecked {
        place: PlaceId,
        outcome: Outcome<bool>,
    },
    Cloaked {
        username: String,
        outcome: Outcome<String>,
    },
    Stopped,
}
