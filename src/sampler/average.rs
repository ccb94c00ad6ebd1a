use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use super::{ScanSource, SignalSampler};
use crate::error::{LocatorError, Result};
use crate::fingerprint::{Fingerprint, SignalSample};

/// Averages several scans into one fingerprint
///
/// Single scans are noisy and often miss weaker access points, so the
/// sampler runs `probes` scans `interval` apart. Each transmitter's strength
/// is the mean over the scans it appeared in, and transmitters keep the
/// order in which they were first seen.
pub struct AveragingSampler<S: ScanSource> {
    source: S,
    probes: usize,
    interval: Duration,
}

impl<S: ScanSource> AveragingSampler<S> {
    pub fn new(source: S, probes: usize, interval: Duration) -> Self {
        Self {
            source,
            probes: probes.max(1),
            interval,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: ScanSource> SignalSampler for AveragingSampler<S> {
    fn sample(&mut self) -> Result<Fingerprint> {
        let mut order: Vec<String> = Vec::new();
        let mut totals: HashMap<String, (f64, u32)> = HashMap::new();
        let mut failures = 0;
        let mut last_error = None;

        for probe in 0..self.probes {
            if probe > 0 && !self.interval.is_zero() {
                thread::sleep(self.interval);
            }

            let scan = match self.source.scan() {
                Ok(scan) => scan,
                Err(e) => {
                    log::warn!("Scan {} of {} failed: {}", probe + 1, self.probes, e);
                    failures += 1;
                    last_error = Some(e);
                    continue;
                }
            };

            for sample in scan {
                let entry = totals.entry(sample.transmitter_id.clone()).or_insert_with(|| {
                    order.push(sample.transmitter_id.clone());
                    (0.0, 0)
                });
                entry.0 += sample.strength;
                entry.1 += 1;
            }
        }

        if failures == self.probes {
            return Err(last_error
                .unwrap_or_else(|| LocatorError::Sampler("no scans completed".into())));
        }

        let samples = order
            .into_iter()
            .map(|id| {
                let (sum, count) = totals[&id];
                SignalSample::new(id, sum / count as f64)
            })
            .collect::<Vec<_>>();

        log::debug!(
            "Averaged {} transmitters over {} scans",
            samples.len(),
            self.probes - failures
        );
        Ok(Fingerprint::new(samples))
    }
}
