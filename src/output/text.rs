use super::Formatter;
use crate::place::Candidate;

/// Human-readable listing. Terse mode shows only the best guess.
pub struct TextFormatter {
    verbose: bool,
}

impl TextFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Formatter for TextFormatter {
    fn format(&self, candidates: &[Candidate]) -> String {
        let Some(best) = candidates.first() else {
            return "Location: unknown (no candidates)".to_string();
        };

        if !self.verbose {
            return format!("Location: {}", best.place.readable_name());
        }

        candidates
            .iter()
            .enumerate()
            .map(|(rank, candidate)| {
                format!(
                    "{:>2}. {:<32} [{}] dist: {:>6.2} at ({}, {}) map {}",
                    rank + 1,
                    candidate.place.readable_name(),
                    candidate.place,
                    candidate.coordinate.distance,
                    candidate.coordinate.x,
                    candidate.coordinate.y,
                    candidate.coordinate.map
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
