use super::{Formatter, iso8601_timestamp};
use crate::place::Candidate;

/// One row per candidate. Place ids contain commas, so they are quoted.
pub struct CsvFormatter;

fn quoted(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

impl Formatter for CsvFormatter {
    fn format(&self, candidates: &[Candidate]) -> String {
        let ts = iso8601_timestamp();
        candidates
            .iter()
            .enumerate()
            .map(|(rank, c)| {
                format!(
                    "{},{},{},{},{:.2},{},{},{}",
                    ts,
                    rank + 1,
                    quoted(c.place.as_str()),
                    quoted(&c.place.readable_name()),
                    c.coordinate.distance,
                    c.coordinate.x,
                    c.coordinate.y,
                    c.coordinate.map
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn header(&self) -> Option<&'static str> {
        Some("ts,rank,place,name,distance,x,y,map")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place::{Coordinate, MapId, PlaceId};

    #[test]
    fn test_rows_quote_place_ids() {
        let out = CsvFormatter.format(&[Candidate {
            place: PlaceId::new("WH00,in,lobby"),
            coordinate: Coordinate::new(1, 2, MapId::Primary).with_distance(2.0),
        }]);
        assert!(out.ends_with(",1,\"WH00,in,lobby\",\"inside WH0 (LL) lobby\",2.00,1,2,1"));
        assert_eq!(CsvFormatter.header().unwrap().split(',').count(), 8);
    }

    #[test]
    fn test_embedded_quotes_are_doubled() {
        let out = CsvFormatter.format(&[Candidate {
            place: PlaceId::new("AC30,in,\"big\" lab"),
            coordinate: Coordinate::new(5, 6, MapId::Primary).with_distance(1.0),
        }]);
        assert!(
            out.ends_with(
                ",1,\"AC30,in,\"\"big\"\" lab\",\"inside AC3 3rd floor\"\"big\"\" lab\",1.00,5,6,1"
            ),
            "{}",
            out
        );
    }
}
