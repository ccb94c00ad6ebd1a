use crate::error::{LocatorError, Result};
use crate::place::PlaceId;

const NOBODY: &str = "nobody";

/// Where the service last saw a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRecord {
    pub username: String,
    pub place: PlaceId,
    pub status: String,
    /// Timestamp exactly as the service formats it
    pub last_update: String,
}

/// Result of a person query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonLookup {
    Found(PersonRecord),
    /// The user has no recorded location
    Nobody,
}

impl PersonLookup {
    pub fn record(&self) -> Option<&PersonRecord> {
        match self {
            PersonLookup::Found(record) => Some(record),
            PersonLookup::Nobody => None,
        }
    }
}

/// Decode `username|place|status|lastUpdate`, or the literal `nobody`.
///
/// Place ids contain commas but never pipes, so a plain split is enough.
pub fn decode_person(payload: &str) -> Result<PersonLookup> {
    if payload == NOBODY {
        return Ok(PersonLookup::Nobody);
    }

    let fields: Vec<&str> = payload.split('|').collect();
    let [username, place, status, last_update] = fields.as_slice() else {
        return Err(LocatorError::MalformedPersonRecord(format!(
            "expected 4 fields, got {} in {:?}",
            fields.len(),
            payload
        )));
    };

    Ok(PersonLookup::Found(PersonRecord {
        username: username.to_string(),
        place: PlaceId::new(*place),
        status: status.to_string(),
        last_update: last_update.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nobody_is_absence() {
        assert_eq!(decode_person("nobody").unwrap(), PersonLookup::Nobody);
        assert!(decode_person("nobody").unwrap().record().is_none());
    }

    #[test]
    fn test_record_fields() {
        let lookup = decode_person("alice|AC308,in,rm308|here|2024-01-01T00:00").unwrap();
        let record = lookup.record().unwrap();
        assert_eq!(record.username, "alice");
        assert_eq!(record.place.as_str(), "AC308,in,rm308");
        assert_eq!(record.status, "here");
        assert_eq!(record.last_update, "2024-01-01T00:00");
    }

    #[test]
    fn test_empty_status_allowed() {
        let lookup = decode_person("bob|WH00,in,lobby||2024-02-02 10:00:00").unwrap();
        assert_eq!(lookup.record().unwrap().status, "");
    }

    #[test]
    fn test_wrong_field_count_is_malformed() {
        assert!(matches!(
            decode_person("alice|AC30,in,rm308|here"),
            Err(LocatorError::MalformedPersonRecord(_))
        ));
        assert!(decode_person("").is_err());
        assert!(decode_person("Nobody").is_err());
    }
}
