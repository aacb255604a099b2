//! Station identity and descriptive metadata.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WindDbError;

/// Maximum length of a station identifier.
pub const MAX_STATION_ID_LEN: usize = 64;

/// A validated station identifier.
///
/// Accepts 1 to 64 characters from `[A-Za-z0-9_.-]`. Identifiers are always
/// bound as query parameters; this type rejects malformed input (typically
/// from the notification socket) before it reaches a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StationId(String);

impl StationId {
    pub fn new(id: impl Into<String>) -> Result<Self, WindDbError> {
        let id = id.into();

        if id.is_empty() {
            return Err(WindDbError::InvalidStationId {
                id,
                reason: "empty",
            });
        }
        if id.len() > MAX_STATION_ID_LEN {
            return Err(WindDbError::InvalidStationId {
                id,
                reason: "longer than 64 characters",
            });
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        {
            return Err(WindDbError::InvalidStationId {
                id,
                reason: "contains characters outside [A-Za-z0-9_.-]",
            });
        }
        // Used as a directory name in the output tree.
        if id == "." || id == ".." {
            return Err(WindDbError::InvalidStationId {
                id,
                reason: "reserved path component",
            });
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StationId {
    type Err = WindDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StationId::new(s)
    }
}

impl TryFrom<String> for StationId {
    type Error = WindDbError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        StationId::new(value)
    }
}

impl From<StationId> for String {
    fn from(id: StationId) -> Self {
        id.0
    }
}

impl AsRef<str> for StationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Descriptive metadata for one station, as stored in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationInfo {
    pub id: StationId,
    #[serde(rename = "friendlyname")]
    pub friendly_name: String,
    /// Expected seconds between samples.
    #[serde(rename = "pollrate")]
    pub poll_rate: u32,
    pub position_lat: Option<f64>,
    pub position_lon: Option<f64>,
    pub description: Option<String>,
    /// Name of the source adapter serving this station.
    pub handler: String,
}

impl StationInfo {
    /// Minimal metadata: friendly name defaults to the id.
    pub fn new(id: StationId, handler: impl Into<String>) -> Self {
        Self {
            friendly_name: id.to_string(),
            id,
            poll_rate: 60,
            position_lat: None,
            position_lon: None,
            description: None,
            handler: handler.into(),
        }
    }
}
