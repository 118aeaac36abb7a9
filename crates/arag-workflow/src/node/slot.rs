//! Attachment points of child nodes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Where a child node is attached on its parent.
///
/// Ordered slots hold a list of children addressed by index; the others
/// hold at most one child.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    /// Branch taken when a condition holds.
    Then,
    /// Branch taken otherwise.
    Else,
    /// Sub-agents of a composite agent.
    Agents,
    /// Registered sub-agents of an orchestrating agent.
    RegisteredAgents,
    /// Agent used when the parent fails.
    Fallback,
    /// Agent chained after the parent.
    NextAgent,
    /// Any other configuration property holding an agent.
    Property(String),
}

impl Slot {
    /// Returns `true` if the slot holds an indexed list of children.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            Self::Then | Self::Else | Self::Agents | Self::RegisteredAgents
        )
    }

    /// Returns the key the slot occupies in the parent's configuration.
    pub fn config_key(&self) -> &str {
        match self {
            Self::Then => "then",
            Self::Else => "else_",
            Self::Agents => "agents",
            Self::RegisteredAgents => "registered_agents",
            Self::Fallback => "fallback",
            Self::NextAgent => "next_agent",
            Self::Property(name) => name,
        }
    }

    /// Parses a configuration key into a slot.
    ///
    /// Both `else_` and `else` denote the else branch; unknown keys become
    /// [`Slot::Property`].
    pub fn from_config_key(key: &str) -> Self {
        match key {
            "then" => Self::Then,
            "else_" | "else" => Self::Else,
            "agents" => Self::Agents,
            "registered_agents" => Self::RegisteredAgents,
            "fallback" => Self::Fallback,
            "next_agent" => Self::NextAgent,
            other => Self::Property(other.to_owned()),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

impl FromStr for Slot {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_config_key(s))
    }
}

impl Serialize for Slot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.config_key())
    }
}

impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        Ok(Self::from_config_key(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn else_uses_backend_key() {
        assert_eq!(Slot::Else.config_key(), "else_");
        assert_eq!(Slot::from_config_key("else"), Slot::Else);
        assert_eq!(Slot::from_config_key("else_"), Slot::Else);
    }

    #[test]
    fn unknown_keys_become_properties() {
        let slot: Slot = "summary_agent".parse().unwrap();
        assert_eq!(slot, Slot::Property("summary_agent".into()));
        assert!(!slot.is_ordered());
        assert_eq!(slot.to_string(), "summary_agent");
    }

    #[test]
    fn ordered_slots() {
        assert!(Slot::Then.is_ordered());
        assert!(Slot::RegisteredAgents.is_ordered());
        assert!(!Slot::Fallback.is_ordered());
        assert!(!Slot::NextAgent.is_ordered());
    }
}
