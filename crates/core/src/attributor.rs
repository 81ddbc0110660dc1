//! Attribution - who gets credit for completing an entity.

use serde::{Deserialize, Serialize};

/// Sentinel string used for administratively skipped entries.
const SKIP_SENTINEL: &str = "SKIP";

/// The participant (or skip sentinel) credited with completing an entity.
///
/// Serializes as a plain string so snapshots stay a flat
/// `entity -> attributor` mapping; the skip sentinel is the literal
/// string `SKIP`, which is therefore not a valid participant name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Attributor {
    /// A named participant completed the entity.
    Participant(String),
    /// The entity was administratively excluded without crediting anyone.
    Skipped,
}

impl Attributor {
    /// Credit a named participant.
    pub fn participant(name: impl Into<String>) -> Self {
        Attributor::Participant(name.into())
    }

    /// True for the administrative skip sentinel.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Attributor::Skipped)
    }
}

impl From<Attributor> for String {
    fn from(a: Attributor) -> Self {
        match a {
            Attributor::Participant(name) => name,
            Attributor::Skipped => SKIP_SENTINEL.to_string(),
        }
    }
}

impl From<String> for Attributor {
    fn from(s: String) -> Self {
        if s == SKIP_SENTINEL {
            Attributor::Skipped
        } else {
            Attributor::Participant(s)
        }
    }
}

impl std::fmt::Display for Attributor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Attributor::Participant(name) => f.write_str(name),
            Attributor::Skipped => f.write_str(SKIP_SENTINEL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_serializes_as_bare_name() {
        let a = Attributor::participant("p1");
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"p1\"");
    }

    #[test]
    fn skip_sentinel_round_trips() {
        let json = serde_json::to_string(&Attributor::Skipped).unwrap();
        assert_eq!(json, "\"SKIP\"");
        let back: Attributor = serde_json::from_str(&json).unwrap();
        assert!(back.is_skipped());
    }

    #[test]
    fn unknown_string_deserializes_as_participant() {
        let a: Attributor = serde_json::from_str("\"somebody\"").unwrap();
        assert_eq!(a, Attributor::participant("somebody"));
    }
}
