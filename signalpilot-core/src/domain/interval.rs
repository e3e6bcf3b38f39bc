//! Candle interval — the closed set of timeframes the exchange serves.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::bar::ValidationError;

/// Supported candle intervals.
///
/// These are exactly the Kraken OHLC timeframes. Any other minute count is
/// rejected at the boundary (`TryFrom`), never silently defaulted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub enum Interval {
    Min1,
    Min5,
    Min15,
    Min30,
    Hour1,
    Hour4,
    Day1,
    Week1,
    Day15,
}

impl Interval {
    pub const ALL: [Interval; 9] = [
        Interval::Min1,
        Interval::Min5,
        Interval::Min15,
        Interval::Min30,
        Interval::Hour1,
        Interval::Hour4,
        Interval::Day1,
        Interval::Week1,
        Interval::Day15,
    ];

    pub fn minutes(self) -> u32 {
        match self {
            Interval::Min1 => 1,
            Interval::Min5 => 5,
            Interval::Min15 => 15,
            Interval::Min30 => 30,
            Interval::Hour1 => 60,
            Interval::Hour4 => 240,
            Interval::Day1 => 1440,
            Interval::Week1 => 10080,
            Interval::Day15 => 21600,
        }
    }

    pub fn seconds(self) -> i64 {
        i64::from(self.minutes()) * 60
    }
}

impl TryFrom<u32> for Interval {
    type Error = ValidationError;

    fn try_from(minutes: u32) -> Result<Self, Self::Error> {
        Interval::ALL
            .into_iter()
            .find(|interval| interval.minutes() == minutes)
            .ok_or(ValidationError::InvalidInterval(minutes))
    }
}

impl From<Interval> for u32 {
    fn from(interval: Interval) -> u32 {
        interval.minutes()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.minutes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_every_supported_minute_count() {
        for minutes in [1u32, 5, 15, 30, 60, 240, 1440, 10080, 21600] {
            let interval = Interval::try_from(minutes).unwrap();
            assert_eq!(interval.minutes(), minutes);
        }
    }

    #[test]
    fn rejects_unsupported_minute_counts() {
        for minutes in [0u32, 2, 45, 120, 720, 43200] {
            assert!(matches!(
                Interval::try_from(minutes),
                Err(ValidationError::InvalidInterval(m)) if m == minutes
            ));
        }
    }

    #[test]
    fn serializes_as_minute_count() {
        let json = serde_json::to_string(&Interval::Min15).unwrap();
        assert_eq!(json, "15");
        let deser: Interval = serde_json::from_str("240").unwrap();
        assert_eq!(deser, Interval::Hour4);
    }

    #[test]
    fn deserialization_rejects_garbage() {
        assert!(serde_json::from_str::<Interval>("7").is_err());
    }
}
