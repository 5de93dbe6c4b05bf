//! Capability identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Numeric identifier of a backend capability ("pipeline").
///
/// Identifiers are unique within one registry snapshot. The host never
/// interprets them beyond equality and ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityId(u32);

impl CapabilityId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw numeric value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for CapabilityId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CapabilityId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let id = CapabilityId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(" 42 ".parse::<CapabilityId>().unwrap(), id);
        assert!("forty-two".parse::<CapabilityId>().is_err());
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = CapabilityId::new(7);
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
        let back: CapabilityId = serde_json::from_str("7").unwrap();
        assert_eq!(back, id);
    }
}
