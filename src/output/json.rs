use serde_json::json;

use super::{Formatter, iso8601_timestamp};
use crate::place::Candidate;

/// One JSON object per result, suitable for line-oriented consumers.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, candidates: &[Candidate]) -> String {
        let candidates: Vec<_> = candidates
            .iter()
            .map(|c| {
                json!({
                    "place": c.place.as_str(),
                    "name": c.place.readable_name(),
                    "distance": c.coordinate.distance,
                    "x": c.coordinate.x,
                    "y": c.coordinate.y,
                    "map": c.coordinate.map.as_wire(),
                })
            })
            .collect();

        json!({
            "ts": iso8601_timestamp(),
            "candidates": candidates,
        })
        .to_string()
    }
}
