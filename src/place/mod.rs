pub mod candidate;
pub mod name;

use std::fmt;

pub use candidate::{Candidate, Coordinate, MapId, ResolutionResult, decode_result_list};
pub use name::{NameStyle, PlaceParts, readable_name};

/// Compact place identifier, e.g. `AC30,in,rm308`.
///
/// Opaque to the client apart from display; produced by the service or by
/// a user correction and replaced wholesale, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaceId(String);

impl PlaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display name, falling back to the raw id when it does not parse.
    pub fn readable_name(&self) -> String {
        readable_name(self).unwrap_or_else(|| self.0.clone())
    }
}

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlaceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PlaceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
