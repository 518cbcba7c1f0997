//! Bar period handling
//!
//! A period is a structured (multiplier, unit) granularity. On the wire the
//! gateway speaks compact tokens: `"5m"`, `"1d"`, `"1w"`, `"1M"`. Only minute
//! periods keep their multiplier in the token; day, week and month always
//! normalize to the multiplier-1 form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::FeedError;

/// Time unit of a bar period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timespan {
    /// Intraday minute buckets
    Minute,
    /// Daily bars
    Day,
    /// Weekly bars
    Week,
    /// Monthly bars
    Month,
}

impl Timespan {
    /// Token suffix used on the wire
    pub fn suffix(&self) -> &'static str {
        match self {
            Timespan::Minute => "m",
            Timespan::Day => "d",
            Timespan::Week => "w",
            Timespan::Month => "M",
        }
    }
}

impl FromStr for Timespan {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minute" => Ok(Timespan::Minute),
            "day" => Ok(Timespan::Day),
            "week" => Ok(Timespan::Week),
            "month" => Ok(Timespan::Month),
            other => Err(FeedError::unsupported_period(other)),
        }
    }
}

impl fmt::Display for Timespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timespan::Minute => write!(f, "minute"),
            Timespan::Day => write!(f, "day"),
            Timespan::Week => write!(f, "week"),
            Timespan::Month => write!(f, "month"),
        }
    }
}

/// A bar granularity: multiplier plus time unit
///
/// The multiplier is expected to be >= 1; the constructors do not police it,
/// but parsing rejects a zero multiplier and the gateway knows no such period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    pub multiplier: u32,
    pub timespan: Timespan,
}

impl Period {
    pub fn new(multiplier: u32, timespan: Timespan) -> Self {
        Self {
            multiplier,
            timespan,
        }
    }

    /// N-minute period
    pub fn minutes(multiplier: u32) -> Self {
        Self::new(multiplier, Timespan::Minute)
    }

    pub fn daily() -> Self {
        Self::new(1, Timespan::Day)
    }

    pub fn weekly() -> Self {
        Self::new(1, Timespan::Week)
    }

    pub fn monthly() -> Self {
        Self::new(1, Timespan::Month)
    }

    /// Canonical wire token for this period
    ///
    /// Minute periods keep their multiplier (`"5m"`, `"60m"`); coarser units
    /// collapse to `"1d"` / `"1w"` / `"1M"` whatever the multiplier says.
    pub fn token(&self) -> String {
        match self.timespan {
            Timespan::Minute => format!("{}m", self.multiplier),
            Timespan::Day => "1d".to_string(),
            Timespan::Week => "1w".to_string(),
            Timespan::Month => "1M".to_string(),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

impl FromStr for Period {
    type Err = FeedError;

    /// Parse a canonical wire token back into a structured period
    ///
    /// Anything outside the supported set (`"2h"`, `"1y"`, a zero multiplier)
    /// fails with [`FeedError::UnsupportedPeriod`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1d" => Ok(Period::daily()),
            "1w" => Ok(Period::weekly()),
            "1M" => Ok(Period::monthly()),
            token => {
                let digits = token
                    .strip_suffix('m')
                    .ok_or_else(|| FeedError::unsupported_period(token))?;
                let multiplier: u32 = digits
                    .parse()
                    .map_err(|_| FeedError::unsupported_period(token))?;
                if multiplier == 0 {
                    return Err(FeedError::unsupported_period(token));
                }
                Ok(Period::minutes(multiplier))
            }
        }
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.token())
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        token.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minute_tokens_keep_multiplier() {
        assert_eq!(Period::minutes(1).token(), "1m");
        assert_eq!(Period::minutes(5).token(), "5m");
        assert_eq!(Period::minutes(15).token(), "15m");
        assert_eq!(Period::minutes(60).token(), "60m");
    }

    #[test]
    fn test_coarse_tokens_normalize_multiplier() {
        assert_eq!(Period::daily().token(), "1d");
        assert_eq!(Period::weekly().token(), "1w");
        assert_eq!(Period::monthly().token(), "1M");
        // Multiplier is ignored for day-or-coarser units
        assert_eq!(Period::new(3, Timespan::Day).token(), "1d");
        assert_eq!(Period::new(2, Timespan::Month).token(), "1M");
    }

    #[test]
    fn test_distinct_periods_distinct_tokens() {
        let tokens: Vec<String> = [
            Period::minutes(1),
            Period::minutes(5),
            Period::minutes(30),
            Period::daily(),
            Period::weekly(),
            Period::monthly(),
        ]
        .iter()
        .map(|p| p.token())
        .collect();

        for (i, a) in tokens.iter().enumerate() {
            for b in tokens.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_parse_round_trip() {
        assert_eq!("5m".parse::<Period>().unwrap(), Period::minutes(5));
        assert_eq!("60m".parse::<Period>().unwrap(), Period::minutes(60));
        assert_eq!("1d".parse::<Period>().unwrap(), Period::daily());
        assert_eq!("1w".parse::<Period>().unwrap(), Period::weekly());
        assert_eq!("1M".parse::<Period>().unwrap(), Period::monthly());
    }

    #[test]
    fn test_parse_rejects_unknown_units() {
        for bad in ["2h", "1y", "0m", "", "m", "xm", "5s", "1D"] {
            let err = bad.parse::<Period>().unwrap_err();
            assert!(matches!(err, FeedError::UnsupportedPeriod(_)), "{bad}");
        }
    }

    #[test]
    fn test_timespan_from_str() {
        assert_eq!("minute".parse::<Timespan>().unwrap(), Timespan::Minute);
        assert_eq!("day".parse::<Timespan>().unwrap(), Timespan::Day);
        assert_eq!("week".parse::<Timespan>().unwrap(), Timespan::Week);
        assert_eq!("month".parse::<Timespan>().unwrap(), Timespan::Month);
        assert!("hour".parse::<Timespan>().is_err());
    }

    #[test]
    fn test_serde_uses_wire_token() {
        let json = serde_json::to_string(&Period::minutes(5)).unwrap();
        assert_eq!(json, "\"5m\"");
        let back: Period = serde_json::from_str("\"1M\"").unwrap();
        assert_eq!(back, Period::monthly());
        assert!(serde_json::from_str::<Period>("\"4h\"").is_err());
    }
}
