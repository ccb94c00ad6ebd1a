use std::process::Command;

use super::ScanSource;
use crate::error::{LocatorError, Result};
use crate::fingerprint::SignalSample;

/// Scans through NetworkManager's command line client.
///
/// Runs `nmcli -t -f BSSID,SIGNAL device wifi list`. Terse mode escapes the
/// colons inside each BSSID, and reports signal as a 0-100 quality figure
/// which is mapped back onto an approximate dBm scale.
pub struct NmcliScanner {
    program: String,
}

impl NmcliScanner {
    pub fn new() -> Self {
        Self {
            program: "nmcli".to_string(),
        }
    }

    /// Use a different executable, e.g. a wrapper script.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for NmcliScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanSource for NmcliScanner {
    fn scan(&mut self) -> Result<Vec<SignalSample>> {
        let output = Command::new(&self.program)
            .args(["-t", "-f", "BSSID,SIGNAL", "device", "wifi", "list"])
            .output()
            .map_err(|e| LocatorError::Sampler(format!("could not run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(LocatorError::Sampler(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(parse_terse_listing(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// NetworkManager quality percentage to dBm, inverse of its own mapping.
pub fn quality_to_dbm(quality: u8) -> f64 {
    f64::from(quality.min(100)) / 2.0 - 100.0
}

/// Parse `BSSID:SIGNAL` lines where BSSID colons are escaped as `\:`.
/// Lines that do not parse are skipped.
pub fn parse_terse_listing(listing: &str) -> Vec<SignalSample> {
    listing
        .lines()
        .filter_map(|line| {
            let fields = split_terse(line.trim_end());
            let [bssid, signal] = fields.as_slice() else {
                log::trace!("Skipping scan line {:?}", line);
                return None;
            };
            let quality: u8 = signal.trim().parse().ok()?;
            if bssid.is_empty() {
                return None;
            }
            Some(SignalSample::new(bssid.to_lowercase(), quality_to_dbm(quality)))
        })
        .collect()
}

fn split_terse(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            ':' => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_escaped_bssids() {
        let listing = "AA\\:BB\\:CC\\:DD\\:EE\\:01:80\n00\\:11\\:22\\:33\\:44\\:55:34\n";
        let samples = parse_terse_listing(listing);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].transmitter_id, "aa:bb:cc:dd:ee:01");
        assert_eq!(samples[0].strength, -60.0);
        assert_eq!(samples[1].transmitter_id, "00:11:22:33:44:55");
        assert_eq!(samples[1].strength, -83.0);
    }

    #[test]
    fn test_skips_garbage_lines() {
        let listing = "\nnot a line\nAA\\:BB\\:CC\\:DD\\:EE\\:01:loud\n:50\n";
        assert!(parse_terse_listing(listing).is_empty());
    }

    #[test]
    fn test_quality_mapping_bounds() {
        assert_eq!(quality_to_dbm(0), -100.0);
        assert_eq!(quality_to_dbm(100), -50.0);
        assert_eq!(quality_to_dbm(250), -50.0);
    }

    #[test]
    fn test_missing_program_is_sampler_error() {
        let mut scanner = NmcliScanner::with_program("/nonexistent/nmcli");
        assert!(matches!(scanner.scan(), Err(LocatorError::Sampler(_))));
    }
}
