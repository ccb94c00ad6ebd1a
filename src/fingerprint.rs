//! Wi-Fi signal fingerprints and their wire encoding.
//!
//! A fingerprint is the set of access points visible from one spot together
//! with their (probe-averaged) signal strengths. On the wire it is written as
//! `transmitterId,strength` records joined by `;`:
//!
//! ```
//! use marauder::fingerprint::{Fingerprint, SignalSample};
//!
//! let fp = Fingerprint::new(vec![
//!     SignalSample::new("00:11:22:33:44:55", -61.0),
//!     SignalSample::new("66:77:88:99:aa:bb", -72.5),
//! ]);
//! assert_eq!(fp.encode(), "00:11:22:33:44:55,-61;66:77:88:99:aa:bb,-72.5");
//! ```

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{LocatorError, Result};

const RECORD_SEPARATOR: char = ';';
const FIELD_SEPARATOR: char = ',';

/// One transmitter as seen by the sampler.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSample {
    pub transmitter_id: String,
    /// Signal strength, typically in dBm
    pub strength: f64,
}

impl SignalSample {
    pub fn new(transmitter_id: impl Into<String>, strength: f64) -> Self {
        Self {
            transmitter_id: transmitter_id.into(),
            strength,
        }
    }
}

/// Ordered set of signal samples captured at one moment.
///
/// Order carries no meaning but is preserved so encoding is deterministic.
/// Transmitter ids are unique within one fingerprint, never contain a wire
/// separator, and every strength is finite, so any fingerprint decodes back
/// from its own encoding.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fingerprint {
    samples: Vec<SignalSample>,
}

impl Fingerprint {
    /// Build a fingerprint, keeping the first sample seen for any repeated
    /// transmitter id. Samples that cannot be encoded (an id holding `,` or
    /// `;`, or a non-finite strength) are dropped.
    pub fn new(samples: Vec<SignalSample>) -> Self {
        let mut seen = HashSet::with_capacity(samples.len());
        let samples = samples
            .into_iter()
            .filter(|s| match check_sample(&s.transmitter_id, s.strength) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Dropping sample: {}", e);
                    false
                }
            })
            .filter(|s| seen.insert(s.transmitter_id.clone()))
            .collect();
        Self { samples }
    }

    /// Like [`Fingerprint::new`], but any unencodable sample is an error.
    pub fn try_new(samples: Vec<SignalSample>) -> Result<Self> {
        for s in &samples {
            check_sample(&s.transmitter_id, s.strength)?;
        }
        Ok(Self::new(samples))
    }

    pub fn samples(&self) -> &[SignalSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn strength_of(&self, transmitter_id: &str) -> Option<f64> {
        self.samples
            .iter()
            .find(|s| s.transmitter_id == transmitter_id)
            .map(|s| s.strength)
    }

    pub fn encode(&self) -> String {
        encode(self)
    }
}

fn check_sample(transmitter_id: &str, strength: f64) -> Result<()> {
    if transmitter_id.contains([FIELD_SEPARATOR, RECORD_SEPARATOR]) {
        return Err(LocatorError::MalformedFingerprint(format!(
            "separator in transmitter id {:?}",
            transmitter_id
        )));
    }
    if !strength.is_finite() {
        return Err(LocatorError::MalformedFingerprint(format!(
            "non-finite strength {} for {:?}",
            strength, transmitter_id
        )));
    }
    Ok(())
}

/// Encode a fingerprint into its wire form.
pub fn encode(fingerprint: &Fingerprint) -> String {
    fingerprint
        .samples
        .iter()
        .map(|s| format!("{}{}{}", s.transmitter_id, FIELD_SEPARATOR, s.strength))
        .collect::<Vec<_>>()
        .join(&RECORD_SEPARATOR.to_string())
}

/// Decode the wire form back into a fingerprint.
///
/// Empty input is an empty fingerprint. Every record must hold exactly a
/// transmitter id and a finite numeric strength, and ids must not repeat.
pub fn decode(encoded: &str) -> Result<Fingerprint> {
    if encoded.is_empty() {
        return Ok(Fingerprint::default());
    }

    let mut seen = HashSet::new();
    let mut samples = Vec::new();

    for record in encoded.split(RECORD_SEPARATOR) {
        let fields: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
        let [id, strength] = fields.as_slice() else {
            return Err(LocatorError::MalformedFingerprint(format!(
                "expected `id,strength`, got {:?}",
                record
            )));
        };

        let strength: f64 = strength
            .trim()
            .parse()
            .ok()
            .filter(|s: &f64| s.is_finite())
            .ok_or_else(|| {
                LocatorError::MalformedFingerprint(format!(
                    "non-numeric strength in {:?}",
                    record
                ))
            })?;

        if !seen.insert(*id) {
            return Err(LocatorError::MalformedFingerprint(format!(
                "duplicate transmitter {:?}",
                id
            )));
        }

        samples.push(SignalSample::new(*id, strength));
    }

    Ok(Fingerprint { samples })
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(self))
    }
}

impl FromStr for Fingerprint {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self> {
        decode(s.trim())
    }
}

/// Single most-recent fingerprint, reused by weak updates.
#[derive(Debug, Clone, Default)]
pub struct FingerprintCache {
    last: Option<Fingerprint>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&Fingerprint> {
        self.last.as_ref()
    }

    pub fn replace(&mut self, fingerprint: Fingerprint) {
        self.last = Some(fingerprint);
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fingerprint() -> Fingerprint {
        Fingerprint::new(vec![
            SignalSample::new("00:1a:2b:3c:4d:5e", -48.0),
            SignalSample::new("00:1a:2b:3c:4d:5f", -63.333),
            SignalSample::new("a4:56:02:11:9c:01", -90.5),
        ])
    }

    #[test]
    fn test_encode_joins_without_trailing_separator() {
        let encoded = sample_fingerprint().encode();
        assert_eq!(
            encoded,
            "00:1a:2b:3c:4d:5e,-48;00:1a:2b:3c:4d:5f,-63.333;a4:56:02:11:9c:01,-90.5"
        );
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let fp = sample_fingerprint();
        assert_eq!(decode(&encode(&fp)).unwrap(), fp);
    }

    #[test]
    fn test_empty_input_is_empty_fingerprint() {
        let fp = decode("").unwrap();
        assert!(fp.is_empty());
        assert_eq!(encode(&fp), "");
    }

    #[test]
    fn test_missing_field_is_malformed() {
        assert!(matches!(
            decode("00:1a:2b:3c:4d:5e"),
            Err(LocatorError::MalformedFingerprint(_))
        ));
        assert!(matches!(
            decode("ap1,-40,extra"),
            Err(LocatorError::MalformedFingerprint(_))
        ));
    }

    #[test]
    fn test_non_numeric_strength_is_malformed() {
        assert!(matches!(
            decode("ap1,-40;ap2,loud"),
            Err(LocatorError::MalformedFingerprint(_))
        ));
    }

    #[test]
    fn test_non_finite_strength_is_malformed() {
        for encoded in ["ap1,NaN", "ap1,-40;ap2,inf", "ap1,-infinity"] {
            assert!(
                matches!(decode(encoded), Err(LocatorError::MalformedFingerprint(_))),
                "{} decoded",
                encoded
            );
        }
    }

    #[test]
    fn test_unencodable_samples_never_enter_a_fingerprint() {
        let samples = vec![
            SignalSample::new("ssid,guest", -40.0),
            SignalSample::new("a;b", -50.0),
            SignalSample::new("ap1", f64::NAN),
            SignalSample::new("ap2", -60.0),
        ];
        let fp = Fingerprint::new(samples.clone());
        assert_eq!(fp.encode(), "ap2,-60");
        assert_eq!(decode(&fp.encode()).unwrap(), fp);

        assert!(matches!(
            Fingerprint::try_new(samples),
            Err(LocatorError::MalformedFingerprint(_))
        ));
        assert_eq!(
            Fingerprint::try_new(vec![SignalSample::new("ap2", -60.0)]).unwrap(),
            fp
        );
    }

    #[test]
    fn test_trailing_separator_is_malformed() {
        assert!(decode("ap1,-40;").is_err());
    }

    #[test]
    fn test_duplicate_transmitter_rejected() {
        assert!(decode("ap1,-40;ap1,-41").is_err());

        let fp = Fingerprint::new(vec![
            SignalSample::new("ap1", -40.0),
            SignalSample::new("ap1", -41.0),
        ]);
        assert_eq!(fp.len(), 1);
        assert_eq!(fp.strength_of("ap1"), Some(-40.0));
    }

    #[test]
    fn test_from_str_and_display() {
        let fp: Fingerprint = "ap1,-40;ap2,-70".parse().unwrap();
        assert_eq!(fp.to_string(), "ap1,-40;ap2,-70");
    }

    #[test]
    fn test_cache_replace() {
        let mut cache = FingerprintCache::new();
        assert!(cache.is_empty());
        cache.replace(sample_fingerprint());
        assert_eq!(cache.get().map(|f| f.len()), Some(3));
    }
}
