pub mod average;
pub mod nmcli;
pub mod replay;

pub use average::AveragingSampler;
pub use nmcli::NmcliScanner;
pub use replay::ReplaySampler;

use crate::config::{SamplerBackend, SamplerConfig};
use crate::error::{LocatorError, Result};
use crate::fingerprint::{Fingerprint, SignalSample};

/// Produces one probe-averaged fingerprint per call.
pub trait SignalSampler: Send {
    fn sample(&mut self) -> Result<Fingerprint>;
}

impl<S: SignalSampler + ?Sized> SignalSampler for Box<S> {
    fn sample(&mut self) -> Result<Fingerprint> {
        (**self).sample()
    }
}

/// A single raw scan of visible transmitters.
pub trait ScanSource: Send {
    fn scan(&mut self) -> Result<Vec<SignalSample>>;
}

/// Build the sampler selected by configuration.
pub fn create_sampler(config: &SamplerConfig) -> Result<Box<dyn SignalSampler>> {
    match config.backend {
        SamplerBackend::Nmcli => Ok(Box::new(AveragingSampler::new(
            NmcliScanner::new(),
            config.probes,
            config.probe_interval(),
        ))),
        SamplerBackend::Replay => {
            let path = config.replay_file.as_deref().ok_or_else(|| {
                LocatorError::Config("sampler.replay_file is required for replay".into())
            })?;
            Ok(Box::new(ReplaySampler::from_file(path)?))
        }
    }
}
