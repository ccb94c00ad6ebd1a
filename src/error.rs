use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocatorError {
    #[error("Cannot reach location service: {0}")]
    Transport(String),

    #[error("Service rejected request: {0}")]
    Protocol(String),

    #[error("Malformed fingerprint: {0}")]
    MalformedFingerprint(String),

    #[error("Malformed result list: {0}")]
    MalformedResultList(String),

    #[error("Malformed person record: {0}")]
    MalformedPersonRecord(String),

    #[error("Signal sampler failed: {0}")]
    Sampler(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Worker error: {0}")]
    Worker(String),
}

impl LocatorError {
    /// Whether the next timer tick may reasonably succeed where this failed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Sampler(_))
    }
}

pub type Result<T> = std::result::Result<T, LocatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(LocatorError::Transport("timed out".into()).is_transient());
        assert!(LocatorError::Sampler("nmcli busy".into()).is_transient());
        assert!(!LocatorError::Protocol("error: unknown user".into()).is_transient());
        assert!(!LocatorError::MalformedResultList("a|b".into()).is_transient());
        assert!(!LocatorError::Config("empty url".into()).is_transient());
    }
}
