//! Ranked location candidates returned by the service.
//!
//! The update response lists candidates as `placeId|distance|x|y|mapId`
//! records joined by `;`, closest match first. The service owns the
//! ranking; decoding preserves wire order and never re-sorts.

use std::fmt;
use std::str::FromStr;

use super::PlaceId;
use crate::error::{LocatorError, Result};

/// Which of the two campus maps a coordinate is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapId {
    #[default]
    Primary,
    Secondary,
}

impl MapId {
    pub fn as_wire(&self) -> u8 {
        match self {
            MapId::Primary => 1,
            MapId::Secondary => 2,
        }
    }
}

impl TryFrom<i64> for MapId {
    type Error = LocatorError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            1 => Ok(MapId::Primary),
            2 => Ok(MapId::Secondary),
            other => Err(LocatorError::MalformedResultList(format!(
                "map id must be 1 or 2, got {}",
                other
            ))),
        }
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

impl FromStr for MapId {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self> {
        let value: i64 = s.trim().parse().map_err(|_| {
            LocatorError::MalformedResultList(format!("map id is not a number: {:?}", s))
        })?;
        Self::try_from(value)
    }
}

/// Map position of a place.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
    pub map: MapId,
    /// Fingerprint-space distance from the submitted reading to this
    /// candidate's stored reference. Zero for coordinates sent to `train`.
    pub distance: f64,
}

impl Coordinate {
    pub fn new(x: i32, y: i32, map: MapId) -> Self {
        Self {
            x,
            y,
            map,
            distance: 0.0,
        }
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub place: PlaceId,
    pub coordinate: Coordinate,
}

/// Candidates in service ranking order, most likely first.
pub type ResolutionResult = Vec<Candidate>;

const CANDIDATE_SEPARATOR: char = ';';
const FIELD_SEPARATOR: char = '|';

/// Decode an update response payload into ranked candidates.
pub fn decode_result_list(payload: &str) -> Result<ResolutionResult> {
    payload
        .split(CANDIDATE_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .map(decode_candidate)
        .collect()
}

fn decode_candidate(segment: &str) -> Result<Candidate> {
    let fields: Vec<&str> = segment.split(FIELD_SEPARATOR).collect();
    let [place, distance, x, y, map] = fields.as_slice() else {
        return Err(LocatorError::MalformedResultList(format!(
            "expected 5 fields, got {} in {:?}",
            fields.len(),
            segment
        )));
    };

    let distance: f64 = parse_field(distance, "distance", segment)?;
    if !distance.is_finite() || distance < 0.0 {
        return Err(LocatorError::MalformedResultList(format!(
            "distance must be a non-negative number in {:?}",
            segment
        )));
    }

    let coordinate = Coordinate::new(
        parse_field(x, "x", segment)?,
        parse_field(y, "y", segment)?,
        map.parse()?,
    )
    .with_distance(distance);

    Ok(Candidate {
        place: PlaceId::new(*place),
        coordinate,
    })
}

fn parse_field<T: FromStr>(raw: &str, field: &str, segment: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        LocatorError::MalformedResultList(format!("invalid {} {:?} in {:?}", field, raw, segment))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_decode_two_candidates_in_order() {
        let result = decode_result_list("roomA|1.5|10|20|1;roomB|3.0|30|40|1").unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].place.as_str(), "roomA");
        assert_relative_eq!(result[0].coordinate.distance, 1.5);
        assert_eq!(result[0].coordinate.x, 10);
        assert_eq!(result[0].coordinate.y, 20);
        assert_eq!(result[0].coordinate.map, MapId::Primary);
        assert_eq!(result[1].place.as_str(), "roomB");
        assert_relative_eq!(result[1].coordinate.distance, 3.0);
    }

    #[test]
    fn test_decode_does_not_resort() {
        let result = decode_result_list("far|9.0|1|1|2;near|0.5|2|2|1").unwrap();
        let places: Vec<&str> = result.iter().map(|c| c.place.as_str()).collect();
        assert_eq!(places, ["far", "near"]);
        assert_eq!(result[0].coordinate.map, MapId::Secondary);
    }

    #[test]
    fn test_empty_segments_skipped() {
        assert!(decode_result_list("").unwrap().is_empty());
        let result = decode_result_list(";AC30,in,rm308|0.2|5|6|1;;").unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].place.as_str(), "AC30,in,rm308");
    }

    #[test]
    fn test_wrong_field_count_fails() {
        assert!(matches!(
            decode_result_list("roomA|1.5|10|20"),
            Err(LocatorError::MalformedResultList(_))
        ));
        assert!(matches!(
            decode_result_list("roomA|1.5|10|20|1|extra"),
            Err(LocatorError::MalformedResultList(_))
        ));
    }

    #[test]
    fn test_non_numeric_fields_fail() {
        for bad in [
            "roomA|near|10|20|1",
            "roomA|1.5|ten|20|1",
            "roomA|1.5|10|20.5|1",
            "roomA|1.5|10|20|one",
            "roomA|1.5|10|20|3",
            "roomA|-1|10|20|1",
        ] {
            assert!(decode_result_list(bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_one_bad_segment_fails_whole_list() {
        assert!(decode_result_list("good|1|1|1|1;bad|1|1").is_err());
    }

    #[test]
    fn test_coordinate_for_training_has_zero_distance() {
        let coord = Coordinate::new(120, 340, MapId::Secondary);
        assert_eq!(coord.distance, 0.0);
        assert_eq!(coord.map.as_wire(), 2);
    }
}
