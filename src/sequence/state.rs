//! Logical valve states and the alias normalisation table.
//!
//! Sequence records and initial states carry free-form tokens (`"1"`,
//! `"on"`, `"B"`, `"50"`).  [`normalize`] folds the known aliases to a
//! binary level exactly once, at load time; everything else is kept
//! verbatim as a proportional setpoint.

use core::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Alias table.  `A`/`B` are kept literally; no meaning beyond the
/// numeric level is inferred from them.
const ALIASES: [(&str, bool); 6] = [
    ("0", false),
    ("1", true),
    ("A", false),
    ("B", true),
    ("on", false),
    ("off", true),
];

/// A normalised state as commanded to a device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogicalState {
    /// Binary level: `false` = 0, `true` = 1.
    Binary(bool),
    /// Raw setpoint token, only meaningful for proportional valves.
    Setpoint(String),
}

impl LogicalState {
    /// `Some(0 | 1)` for binary states, `None` for setpoints.
    pub fn as_binary(&self) -> Option<u8> {
        match self {
            Self::Binary(level) => Some(u8::from(*level)),
            Self::Setpoint(_) => None,
        }
    }

    /// Integer view used for telemetry fields.  Non-numeric setpoints
    /// have no integer view.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Binary(level) => Some(i64::from(*level)),
            Self::Setpoint(raw) => raw.parse().ok(),
        }
    }
}

impl fmt::Display for LogicalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary(level) => write!(f, "{}", u8::from(*level)),
            Self::Setpoint(raw) => f.write_str(raw),
        }
    }
}

/// Fold a state token through the alias table.
///
/// Pure: the same token always yields the same state.  Tokens outside
/// the table pass through unmodified as [`LogicalState::Setpoint`].
pub fn normalize(token: &str) -> LogicalState {
    let token = token.trim();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == token)
        .map_or_else(
            || LogicalState::Setpoint(token.to_string()),
            |(_, level)| LogicalState::Binary(*level),
        )
}

// ---------------------------------------------------------------------------
// Serde: numbers where possible so the state file stays `{"sv1#0": 1}`
// ---------------------------------------------------------------------------

impl Serialize for LogicalState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Binary(level) => serializer.serialize_u8(u8::from(*level)),
            Self::Setpoint(raw) => {
                if let Ok(n) = raw.parse::<i64>() {
                    serializer.serialize_i64(n)
                } else if let Some(x) = raw.parse::<f64>().ok().filter(|x| x.is_finite()) {
                    serializer.serialize_f64(x)
                } else {
                    serializer.serialize_str(raw)
                }
            }
        }
    }
}

struct LogicalStateVisitor;

impl Visitor<'_> for LogicalStateVisitor {
    type Value = LogicalState;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a state number or token")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<LogicalState, E> {
        Ok(normalize(&v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<LogicalState, E> {
        Ok(normalize(&v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<LogicalState, E> {
        Ok(normalize(&v.to_string()))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<LogicalState, E> {
        Ok(LogicalState::Binary(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<LogicalState, E> {
        Ok(normalize(v))
    }
}

impl<'de> Deserialize<'de> for LogicalState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(LogicalStateVisitor)
    }
}
