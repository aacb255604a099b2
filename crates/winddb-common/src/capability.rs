//! The closed vocabulary of measurable quantities and statistics.
//!
//! A [`Capability`] names one time series a station can produce, e.g.
//! `(wind-speed, max)`. The set of capabilities is fixed; adapters may only
//! emit capabilities from it.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A physical quantity measured by a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Quantity {
    WindSpeed,
    WindDirection,
    Humidity,
    AirTemperature,
    AirPressure,
    Visibility,
}

impl Quantity {
    pub const ALL: [Quantity; 6] = [
        Quantity::WindSpeed,
        Quantity::WindDirection,
        Quantity::Humidity,
        Quantity::AirTemperature,
        Quantity::AirPressure,
        Quantity::Visibility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Quantity::WindSpeed => "wind-speed",
            Quantity::WindDirection => "wind-direction",
            Quantity::Humidity => "humidity",
            Quantity::AirTemperature => "air-temperature",
            Quantity::AirPressure => "air-pressure",
            Quantity::Visibility => "visibility",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quantity {
    type Err = CapabilityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quantity::ALL
            .into_iter()
            .find(|q| q.as_str() == s)
            .ok_or_else(|| CapabilityParseError::UnknownQuantity(s.to_string()))
    }
}

/// A statistic computed over a sampling period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    Min,
    Max,
    Avg,
    Stddev,
}

impl Statistic {
    pub const ALL: [Statistic; 4] = [
        Statistic::Min,
        Statistic::Max,
        Statistic::Avg,
        Statistic::Stddev,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::Min => "min",
            Statistic::Max => "max",
            Statistic::Avg => "avg",
            Statistic::Stddev => "stddev",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Statistic {
    type Err = CapabilityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Statistic::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| CapabilityParseError::UnknownStatistic(s.to_string()))
    }
}

/// One measurable time series: a `(quantity, statistic)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Capability {
    pub quantity: Quantity,
    pub statistic: Statistic,
}

/// Ordered set of capabilities. Ordering keeps generated output stable.
pub type CapabilitySet = BTreeSet<Capability>;

pub const WIND_SPEED_MAX: Capability = Capability::new(Quantity::WindSpeed, Statistic::Max);
pub const WIND_SPEED_AVG: Capability = Capability::new(Quantity::WindSpeed, Statistic::Avg);
pub const WIND_SPEED_MIN: Capability = Capability::new(Quantity::WindSpeed, Statistic::Min);
pub const WIND_DIRECTION_AVG: Capability =
    Capability::new(Quantity::WindDirection, Statistic::Avg);
pub const WIND_DIRECTION_STDDEV: Capability =
    Capability::new(Quantity::WindDirection, Statistic::Stddev);
pub const AIR_TEMPERATURE_AVG: Capability =
    Capability::new(Quantity::AirTemperature, Statistic::Avg);
pub const HUMIDITY_AVG: Capability = Capability::new(Quantity::Humidity, Statistic::Avg);
pub const AIR_PRESSURE_AVG: Capability = Capability::new(Quantity::AirPressure, Statistic::Avg);
pub const VISIBILITY_AVG: Capability = Capability::new(Quantity::Visibility, Statistic::Avg);

impl Capability {
    pub const fn new(quantity: Quantity, statistic: Statistic) -> Self {
        Self { quantity, statistic }
    }

    /// Every defined capability, in canonical order.
    pub fn all() -> impl Iterator<Item = Capability> {
        Quantity::ALL.into_iter().flat_map(|quantity| {
            Statistic::ALL
                .into_iter()
                .map(move |statistic| Capability::new(quantity, statistic))
        })
    }

    /// True for capabilities measured in wind-speed units.
    pub fn is_wind_speed(&self) -> bool {
        self.quantity == Quantity::WindSpeed
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.quantity, self.statistic)
    }
}

impl FromStr for Capability {
    type Err = CapabilityParseError;

    /// Parse the `quantity/statistic` form, e.g. `wind-speed/max`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (quantity, statistic) = s
            .split_once('/')
            .ok_or_else(|| CapabilityParseError::Malformed(s.to_string()))?;

        Ok(Capability::new(quantity.parse()?, statistic.parse()?))
    }
}

/// Errors from parsing capability text forms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityParseError {
    #[error("unknown quantity: {0}")]
    UnknownQuantity(String),

    #[error("unknown statistic: {0}")]
    UnknownStatistic(String),

    #[error("expected 'quantity/statistic', got: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_capabilities_unique() {
        let all: Vec<_> = Capability::all().collect();
        let set: CapabilitySet = all.iter().copied().collect();
        assert_eq!(all.len(), 24);
        assert_eq!(set.len(), 24);
    }

    #[test]
    fn test_display_and_parse() {
        assert_eq!(WIND_SPEED_MAX.to_string(), "wind-speed/max");
        assert_eq!(AIR_TEMPERATURE_AVG.to_string(), "air-temperature/avg");
        assert_eq!(
            "wind-direction/stddev".parse::<Capability>().unwrap(),
            WIND_DIRECTION_STDDEV
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(
            "dew-point/avg".parse::<Capability>(),
            Err(CapabilityParseError::UnknownQuantity("dew-point".to_string()))
        );
        assert_eq!(
            "humidity/median".parse::<Capability>(),
            Err(CapabilityParseError::UnknownStatistic("median".to_string()))
        );
        assert!(matches!(
            "humidity".parse::<Capability>(),
            Err(CapabilityParseError::Malformed(_))
        ));
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&VISIBILITY_AVG).unwrap();
        assert_eq!(json, r#"{"quantity":"visibility","statistic":"avg"}"#);
    }
}
