//! Human-readable rendering of place ids.
//!
//! Place ids look like `AC30,in,rm308`: building code plus floor digit, an
//! `in`/`out` flag, and a free-text descriptor. Rendering is best effort, so
//! anything that does not fit the grammar yields `None` rather than an error.

use super::PlaceId;

/// Building codes that were renamed after reference data was collected.
/// Applied to the start of an id before it is parsed.
const LEGACY_BUILDING_ALIASES: &[(&str, &str)] = &[("OC", "MH")];

/// Floor labels indexed by floor digit. Digits past the end of the table
/// are rendered as the raw digit.
const FLOOR_LABELS: [&str; 5] = ["LL", "1st", "2nd", "3rd", "4th"];

/// Room markers, stripped in every casing they appear in, `rm` first.
const ROOM_MARKERS: [&str; 2] = ["rm", "room"];

/// Which rendering rule a place id falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStyle {
    /// Descriptor names a room: `"<side> <building><room>"`, no floor word
    Room,
    /// Lower level: `"<side> <stem> (LL) <descriptor>"`
    LowerLevel,
    /// Any other floor: `"<side> <stem> <floor> floor<descriptor>"`
    Floor,
}

/// A place id split into its three fields.
///
/// Field 1 packs a two-letter building code, the floor digit as its third
/// character, and optionally a trailing section character. Room names are
/// rendered against the bare building code; floor names against `stem`,
/// which is field 1 without its final character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceParts {
    pub building: String,
    pub stem: String,
    pub floor: String,
    pub side: String,
    pub descriptor: String,
}

impl PlaceParts {
    pub fn parse(place: &PlaceId) -> Option<Self> {
        let canonical = apply_legacy_aliases(place.as_str());
        let fields: Vec<&str> = canonical.split(',').collect();
        let [building_floor, side, descriptor] = fields.as_slice() else {
            return None;
        };

        let chars: Vec<char> = building_floor.chars().collect();
        if chars.len() < 3 {
            return None;
        }

        Some(Self {
            building: chars[..2].iter().collect(),
            stem: chars[..chars.len() - 1].iter().collect(),
            floor: floor_label(chars[2]),
            side: side_label(side).to_string(),
            descriptor: descriptor.to_string(),
        })
    }

    pub fn style(&self) -> NameStyle {
        if has_room_marker(&self.descriptor) {
            NameStyle::Room
        } else if self.floor == FLOOR_LABELS[0] {
            NameStyle::LowerLevel
        } else {
            NameStyle::Floor
        }
    }

    pub fn render(&self) -> String {
        match self.style() {
            NameStyle::Room => format!(
                "{} {}{}",
                self.side,
                self.building,
                strip_room_markers(&self.descriptor)
            ),
            NameStyle::LowerLevel => format!(
                "{} {} ({}) {}",
                self.side, self.stem, self.floor, self.descriptor
            ),
            NameStyle::Floor => format!(
                "{} {} {} floor{}",
                self.side, self.stem, self.floor, self.descriptor
            ),
        }
    }
}

/// Render a place id for display, or `None` if it does not parse.
pub fn readable_name(place: &PlaceId) -> Option<String> {
    PlaceParts::parse(place).map(|parts| parts.render())
}

fn apply_legacy_aliases(id: &str) -> String {
    for (legacy, current) in LEGACY_BUILDING_ALIASES {
        if let Some(rest) = id.strip_prefix(legacy) {
            return format!("{}{}", current, rest);
        }
    }
    id.to_string()
}

fn floor_label(digit: char) -> String {
    digit
        .to_digit(10)
        .and_then(|d| FLOOR_LABELS.get(d as usize))
        .map(|label| label.to_string())
        .unwrap_or_else(|| digit.to_string())
}

fn side_label(flag: &str) -> &str {
    match flag {
        "in" => "inside",
        "out" => "outside",
        other => other,
    }
}

fn has_room_marker(descriptor: &str) -> bool {
    let lower = descriptor.to_lowercase();
    ROOM_MARKERS.iter().any(|m| lower.contains(m))
}

/// Remove every case-insensitive occurrence of the room markers.
fn strip_room_markers(descriptor: &str) -> String {
    let mut out = descriptor.to_string();
    for marker in ROOM_MARKERS {
        out = remove_ignore_case(&out, marker);
    }
    out
}

fn remove_ignore_case(haystack: &str, needle: &str) -> String {
    let mut out = String::with_capacity(haystack.len());
    let mut rest = haystack;
    while !rest.is_empty() {
        let matched = rest
            .get(..needle.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(needle));
        if matched {
            rest = &rest[needle.len()..];
        } else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                out.push(c);
            }
            rest = chars.as_str();
        }
    }
    out
}
