//! Hour-of-day trading sessions (UTC).
//!
//! Asian 00–09, London 08–17, New York 13–22 (end hours exclusive).
//! Hours covered by two sessions map to the overlap variant.

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

const ASIAN: (u32, u32) = (0, 9);
const LONDON: (u32, u32) = (8, 17);
const NEW_YORK: (u32, u32) = (13, 22);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Session {
    Asian,
    AsianLondonOverlap,
    London,
    LondonNewYorkOverlap,
    NewYork,
    Other,
}

fn within(hour: u32, (start, end): (u32, u32)) -> bool {
    start <= hour && hour < end
}

impl Session {
    pub fn from_hour(hour: u32) -> Self {
        match (
            within(hour, ASIAN),
            within(hour, LONDON),
            within(hour, NEW_YORK),
        ) {
            (true, true, _) => Session::AsianLondonOverlap,
            (_, true, true) => Session::LondonNewYorkOverlap,
            (true, false, _) => Session::Asian,
            (false, true, false) => Session::London,
            (false, false, true) => Session::NewYork,
            (false, false, false) => Session::Other,
        }
    }

    pub fn classify(timestamp: NaiveDateTime) -> Self {
        Self::from_hour(timestamp.hour())
    }

    pub fn is_london(self) -> bool {
        matches!(
            self,
            Session::London | Session::AsianLondonOverlap | Session::LondonNewYorkOverlap
        )
    }

    pub fn is_new_york(self) -> bool {
        matches!(self, Session::NewYork | Session::LondonNewYorkOverlap)
    }

    pub fn is_overlap(self) -> bool {
        matches!(
            self,
            Session::AsianLondonOverlap | Session::LondonNewYorkOverlap
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hour_mapping() {
        assert_eq!(Session::from_hour(0), Session::Asian);
        assert_eq!(Session::from_hour(7), Session::Asian);
        assert_eq!(Session::from_hour(8), Session::AsianLondonOverlap);
        assert_eq!(Session::from_hour(9), Session::London);
        assert_eq!(Session::from_hour(12), Session::London);
        assert_eq!(Session::from_hour(13), Session::LondonNewYorkOverlap);
        assert_eq!(Session::from_hour(16), Session::LondonNewYorkOverlap);
        assert_eq!(Session::from_hour(17), Session::NewYork);
        assert_eq!(Session::from_hour(21), Session::NewYork);
        assert_eq!(Session::from_hour(22), Session::Other);
        assert_eq!(Session::from_hour(23), Session::Other);
    }

    #[test]
    fn membership_helpers() {
        assert!(Session::LondonNewYorkOverlap.is_london());
        assert!(Session::LondonNewYorkOverlap.is_new_york());
        assert!(Session::AsianLondonOverlap.is_overlap());
        assert!(!Session::NewYork.is_london());
    }
}
