use std::path::Path;

use super::SignalSampler;
use crate::error::{LocatorError, Result};
use crate::fingerprint::{self, Fingerprint};

/// Plays back recorded fingerprints, one per call, looping at the end.
///
/// The file holds one wire-encoded fingerprint per line; blank lines and
/// lines starting with `#` are ignored.
pub struct ReplaySampler {
    fingerprints: Vec<Fingerprint>,
    position: usize,
}

impl ReplaySampler {
    pub fn new(fingerprints: Vec<Fingerprint>) -> Result<Self> {
        if fingerprints.is_empty() {
            return Err(LocatorError::Sampler("replay has no fingerprints".into()));
        }
        Ok(Self {
            fingerprints,
            position: 0,
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LocatorError::Sampler(format!("{}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let fingerprints = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(fingerprint::decode)
            .collect::<Result<Vec<_>>>()?;
        Self::new(fingerprints)
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}

impl SignalSampler for ReplaySampler {
    fn sample(&mut self) -> Result<Fingerprint> {
        let fp = self.fingerprints[self.position].clone();
        self.position = (self.position + 1) % self.fingerprints.len();
        Ok(fp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_cycles() {
        let mut replay = ReplaySampler::parse("# walk\nap1,-40\n\nap1,-55;ap2,-70\n").unwrap();
        assert_eq!(replay.len(), 2);
        assert_eq!(replay.sample().unwrap().encode(), "ap1,-40");
        assert_eq!(replay.sample().unwrap().encode(), "ap1,-55;ap2,-70");
        assert_eq!(replay.sample().unwrap().encode(), "ap1,-40");
    }

    #[test]
    fn test_empty_replay_rejected() {
        assert!(ReplaySampler::parse("# nothing\n").is_err());
    }

    #[test]
    fn test_bad_line_is_malformed_fingerprint() {
        assert!(matches!(
            ReplaySampler::parse("ap1,-40\nap2\n"),
            Err(LocatorError::MalformedFingerprint(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ReplaySampler::from_file("/nonexistent/walk.txt"),
            Err(LocatorError::Sampler(_))
        ));
    }
}
