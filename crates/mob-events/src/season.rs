//! Season Clock Types
//!
//! Maps the monotonic epoch counter onto the solar cycle with a
//! human-readable label.
//!
//! # Example
//!
//! ```
//! use mob_events::{Season, SeasonStamp};
//!
//! let stamp = SeasonStamp::from_epoch(5000, 4000);
//! assert_eq!(stamp.epoch, 5000);
//! assert_eq!(stamp.season(), Season::Scarce);
//! assert_eq!(stamp.label.to_string(), "cycle_0.scarce");
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of seasons in one full solar cycle.
pub const SEASONS_PER_CYCLE: u64 = 4;

/// Quarter of the solar cycle.
///
/// One full cycle spans `2 * season_length` epochs: the sun rises to its
/// peak, wanes back to the baseline, sinks to its trough and recovers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Rising,
    Waning,
    Scarce,
    Recovering,
}

impl Season {
    /// Returns the next season in order.
    pub fn next(self) -> Self {
        match self {
            Season::Rising => Season::Waning,
            Season::Waning => Season::Scarce,
            Season::Scarce => Season::Recovering,
            Season::Recovering => Season::Rising,
        }
    }

    /// Returns true if the sun is below its baseline during this season.
    pub fn is_lean(self) -> bool {
        matches!(self, Season::Scarce | Season::Recovering)
    }

    fn from_quarter(quarter: u64) -> Self {
        match quarter {
            0 => Season::Rising,
            1 => Season::Waning,
            2 => Season::Scarce,
            _ => Season::Recovering,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Season::Rising => write!(f, "rising"),
            Season::Waning => write!(f, "waning"),
            Season::Scarce => write!(f, "scarce"),
            Season::Recovering => write!(f, "recovering"),
        }
    }
}

impl FromStr for Season {
    type Err = ParseSeasonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rising" => Ok(Season::Rising),
            "waning" => Ok(Season::Waning),
            "scarce" => Ok(Season::Scarce),
            "recovering" => Ok(Season::Recovering),
            _ => Err(ParseSeasonError::InvalidSeason(s.to_string())),
        }
    }
}

/// Human-readable position in the solar cycle.
///
/// Serializes to strings like "cycle_3.waning". Cycles count from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeasonLabel {
    pub cycle: u64,
    pub season: Season,
}

impl SeasonLabel {
    pub fn new(cycle: u64, season: Season) -> Self {
        Self { cycle, season }
    }
}

impl fmt::Display for SeasonLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cycle_{}.{}", self.cycle, self.season)
    }
}

/// Error type for parsing season labels from strings.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseSeasonError {
    InvalidFormat(String),
    InvalidCycle(String),
    InvalidSeason(String),
}

impl fmt::Display for ParseSeasonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseSeasonError::InvalidFormat(s) => {
                write!(f, "invalid season label: '{}', expected 'cycle_N.season'", s)
            }
            ParseSeasonError::InvalidCycle(s) => write!(f, "invalid cycle: '{}'", s),
            ParseSeasonError::InvalidSeason(s) => write!(f, "invalid season: '{}'", s),
        }
    }
}

impl std::error::Error for ParseSeasonError {}

impl FromStr for SeasonLabel {
    type Err = ParseSeasonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (cycle_part, season_part) = s
            .split_once('.')
            .ok_or_else(|| ParseSeasonError::InvalidFormat(s.to_string()))?;

        let cycle = cycle_part
            .strip_prefix("cycle_")
            .ok_or_else(|| ParseSeasonError::InvalidFormat(s.to_string()))?
            .parse::<u64>()
            .map_err(|_| ParseSeasonError::InvalidCycle(cycle_part.to_string()))?;

        let season = season_part.parse::<Season>()?;

        Ok(SeasonLabel { cycle, season })
    }
}

impl Serialize for SeasonLabel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SeasonLabel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A point in simulation time: the raw epoch plus its season label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonStamp {
    pub epoch: u64,
    pub label: SeasonLabel,
}

impl SeasonStamp {
    /// Places `epoch` on a solar cycle whose half-period is `season_length`.
    ///
    /// A zero `season_length` is treated as one epoch; cycles longer than
    /// `u64::MAX` epochs saturate.
    pub fn from_epoch(epoch: u64, season_length: u64) -> Self {
        let cycle_length = season_length.max(1).saturating_mul(2);
        let cycle = epoch / cycle_length;
        let offset = epoch % cycle_length;
        let quarter = u128::from(offset) * u128::from(SEASONS_PER_CYCLE) / u128::from(cycle_length);
        Self {
            epoch,
            label: SeasonLabel::new(cycle, Season::from_quarter(quarter as u64)),
        }
    }

    /// Returns the current season.
    pub fn season(&self) -> Season {
        self.label.season
    }

    /// Returns the zero-based cycle number.
    pub fn cycle(&self) -> u64 {
        self.label.cycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_display() {
        assert_eq!(Season::Rising.to_string(), "rising");
        assert_eq!(Season::Waning.to_string(), "waning");
        assert_eq!(Season::Scarce.to_string(), "scarce");
        assert_eq!(Season::Recovering.to_string(), "recovering");
    }

    #[test]
    fn test_season_parse() {
        assert_eq!("rising".parse::<Season>().unwrap(), Season::Rising);
        assert_eq!("Waning".parse::<Season>().unwrap(), Season::Waning);
        assert_eq!("SCARCE".parse::<Season>().unwrap(), Season::Scarce);
        assert!("winter".parse::<Season>().is_err());
    }

    #[test]
    fn test_season_next_wraps() {
        assert_eq!(Season::Recovering.next(), Season::Rising);
        assert!(Season::Scarce.is_lean());
        assert!(!Season::Rising.is_lean());
    }

    #[test]
    fn test_stamp_quarters() {
        assert_eq!(SeasonStamp::from_epoch(0, 4000).season(), Season::Rising);
        assert_eq!(SeasonStamp::from_epoch(1999, 4000).season(), Season::Rising);
        assert_eq!(SeasonStamp::from_epoch(2000, 4000).season(), Season::Waning);
        assert_eq!(SeasonStamp::from_epoch(4000, 4000).season(), Season::Scarce);
        assert_eq!(SeasonStamp::from_epoch(7999, 4000).season(), Season::Recovering);

        let next_cycle = SeasonStamp::from_epoch(8000, 4000);
        assert_eq!(next_cycle.season(), Season::Rising);
        assert_eq!(next_cycle.cycle(), 1);
    }

    #[test]
    fn test_stamp_zero_season_length() {
        let stamp = SeasonStamp::from_epoch(3, 0);
        assert_eq!(stamp.cycle(), 1);
    }

    #[test]
    fn test_stamp_huge_season_length() {
        let early = SeasonStamp::from_epoch(10, u64::MAX);
        assert_eq!(early.cycle(), 0);
        assert_eq!(early.season(), Season::Rising);

        let late = SeasonStamp::from_epoch(u64::MAX - 1, u64::MAX / 2 + 1);
        assert_eq!(late.cycle(), 0);
        assert_eq!(late.season(), Season::Recovering);
    }

    #[test]
    fn test_label_parse() {
        let label: SeasonLabel = "cycle_3.waning".parse().unwrap();
        assert_eq!(label.cycle, 3);
        assert_eq!(label.season, Season::Waning);

        assert!("cycle_x.waning".parse::<SeasonLabel>().is_err());
        assert!("cycle_1".parse::<SeasonLabel>().is_err());
        assert!("cycle_1.summer".parse::<SeasonLabel>().is_err());
    }

    #[test]
    fn test_stamp_serialization() {
        let stamp = SeasonStamp::from_epoch(5000, 4000);
        let json = serde_json::to_string(&stamp).unwrap();
        assert_eq!(json, r#"{"epoch":5000,"label":"cycle_0.scarce"}"#);
    }
}
