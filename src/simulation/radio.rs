use std::sync::{Arc, Mutex};

use rand::RngExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{LocatorError, Result};
use crate::fingerprint::{Fingerprint, SignalSample};
use crate::sampler::{ScanSource, SignalSampler};

#[derive(Clone, Debug, serde::Deserialize)]
pub struct RadioConfig {
    pub seed: Option<u64>,
    /// Standard deviation of per-scan strength noise, in dB
    pub noise_db: f64,
    /// Chance that a visible transmitter is missing from one scan
    pub dropout: f64,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            seed: None,
            noise_db: 2.0,
            dropout: 0.0,
        }
    }
}

impl RadioConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_noise(mut self, noise_db: f64) -> Self {
        self.noise_db = noise_db;
        self
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }
}

fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => rand::make_rng(),
    }
}

/// Where the simulated user stands: the true strengths of every transmitter
/// in range. Shared with the radio so a test can move the user while the
/// radio is owned by a worker.
#[derive(Clone, Debug, Default)]
pub struct RadioPosition {
    visible: Arc<Mutex<Vec<SignalSample>>>,
}

impl RadioPosition {
    pub fn new(visible: Vec<SignalSample>) -> Self {
        Self {
            visible: Arc::new(Mutex::new(visible)),
        }
    }

    pub fn move_to(&self, visible: Vec<SignalSample>) {
        if let Ok(mut current) = self.visible.lock() {
            *current = visible;
        }
    }

    pub fn visible(&self) -> Vec<SignalSample> {
        self.visible
            .lock()
            .map(|current| current.clone())
            .unwrap_or_default()
    }
}

/// Noisy scan source over a [`RadioPosition`].
pub struct SimulatedRadio {
    position: RadioPosition,
    noise: Normal<f64>,
    dropout: f64,
    rng: ChaCha8Rng,
}

impl SimulatedRadio {
    pub fn new(position: RadioPosition, config: &RadioConfig) -> Result<Self> {
        let noise = Normal::new(0.0, config.noise_db)
            .map_err(|e| LocatorError::Config(format!("radio noise: {}", e)))?;
        if !(0.0..1.0).contains(&config.dropout) {
            return Err(LocatorError::Config(format!(
                "radio dropout must be in [0, 1), got {}",
                config.dropout
            )));
        }

        Ok(Self {
            position,
            noise,
            dropout: config.dropout,
            rng: create_rng(config.seed),
        })
    }

    pub fn position(&self) -> &RadioPosition {
        &self.position
    }
}

impl ScanSource for SimulatedRadio {
    fn scan(&mut self) -> Result<Vec<SignalSample>> {
        let visible = self.position.visible();
        if visible.is_empty() {
            return Err(LocatorError::Sampler("no transmitters in range".into()));
        }

        let mut scan = Vec::with_capacity(visible.len());
        for sample in visible {
            if self.dropout > 0.0 && self.rng.random::<f64>() < self.dropout {
                continue;
            }
            let strength = sample.strength + self.noise.sample(&mut self.rng);
            scan.push(SignalSample::new(sample.transmitter_id, strength));
        }
        Ok(scan)
    }
}

impl SignalSampler for SimulatedRadio {
    fn sample(&mut self) -> Result<Fingerprint> {
        Ok(Fingerprint::new(self.scan()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lobby() -> Vec<SignalSample> {
        vec![
            SignalSample::new("aa:aa:aa:aa:aa:01", -45.0),
            SignalSample::new("aa:aa:aa:aa:aa:02", -70.0),
            SignalSample::new("aa:aa:aa:aa:aa:03", -82.0),
        ]
    }

    #[test]
    fn test_seeded_radio_reproducibility() {
        let config = RadioConfig::default().with_seed(7);
        let mut a = SimulatedRadio::new(RadioPosition::new(lobby()), &config).unwrap();
        let mut b = SimulatedRadio::new(RadioPosition::new(lobby()), &config).unwrap();
        assert_eq!(a.scan().unwrap(), b.scan().unwrap());
    }

    #[test]
    fn test_noise_stays_near_truth() {
        let config = RadioConfig::default().with_seed(1).with_noise(1.0);
        let mut radio = SimulatedRadio::new(RadioPosition::new(lobby()), &config).unwrap();
        for _ in 0..50 {
            let scan = radio.scan().unwrap();
            assert_eq!(scan.len(), 3);
            // 6 sigma
            assert!((scan[0].strength + 45.0).abs() < 6.0);
        }
    }

    #[test]
    fn test_move_is_seen_by_radio() {
        let position = RadioPosition::new(lobby());
        let config = RadioConfig::default().with_seed(3).with_noise(0.0);
        let mut radio = SimulatedRadio::new(position.clone(), &config).unwrap();

        position.move_to(vec![SignalSample::new("bb:bb:bb:bb:bb:01", -50.0)]);
        let fp = radio.sample().unwrap();
        assert_eq!(fp.len(), 1);
        assert_eq!(fp.strength_of("bb:bb:bb:bb:bb:01"), Some(-50.0));
    }

    #[test]
    fn test_out_of_range_is_sampler_error() {
        let config = RadioConfig::default().with_seed(3);
        let mut radio = SimulatedRadio::new(RadioPosition::default(), &config).unwrap();
        assert!(matches!(radio.scan(), Err(LocatorError::Sampler(_))));
    }

    #[test]
    fn test_invalid_dropout_rejected() {
        let config = RadioConfig::default().with_dropout(1.5);
        assert!(SimulatedRadio::new(RadioPosition::new(lobby()), &config).is_err());
    }
}
