//! Agent value objects - identifiers, layers and participant pairings.

use serde::{Deserialize, Serialize};

/// Identifier of the narrator (human game master) identity.
pub const NARRATOR_ID: &str = "dm";

/// Unique identifier for an agent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Creates an AgentId from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The narrator's identity.
    pub fn narrator() -> Self {
        Self::new(NARRATOR_ID)
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which reasoning layer an agent belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentLayer {
    /// Out-of-character planner
    Strategic,
    /// In-character actor
    RolePlay,
    /// The human game master
    Narrator,
}

impl AgentLayer {
    pub fn as_str(&self) -> &str {
        match self {
            AgentLayer::Strategic => "strategic",
            AgentLayer::RolePlay => "role_play",
            AgentLayer::Narrator => "narrator",
        }
    }
}

impl std::fmt::Display for AgentLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An agent known to the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: AgentId,
    pub layer: AgentLayer,
    /// Human-readable name (player handle or character name)
    pub display_name: String,
}

impl AgentProfile {
    pub fn new(id: impl Into<AgentId>, layer: AgentLayer, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            layer,
            display_name: display_name.into(),
        }
    }

    pub fn strategic(id: impl Into<AgentId>, display_name: impl Into<String>) -> Self {
        Self::new(id, AgentLayer::Strategic, display_name)
    }

    pub fn role_play(id: impl Into<AgentId>, display_name: impl Into<String>) -> Self {
        Self::new(id, AgentLayer::RolePlay, display_name)
    }

    pub fn narrator() -> Self {
        Self::new(AgentId::narrator(), AgentLayer::Narrator, "Game Master")
    }
}

/// One seat at the table: a strategic agent paired with its character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    pub strategic: AgentProfile,
    pub character: AgentProfile,
}

impl Participant {
    /// Build a participant whose agent ids derive from `name`
    /// (`<name>.player` and `<name>.character`).
    pub fn new(name: impl Into<String>, character_name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            strategic: AgentProfile::strategic(format!("{}.player", name), name.clone()),
            character: AgentProfile::role_play(format!("{}.character", name), character_name),
            name,
        }
    }

    /// Both agents of this participant, strategic first.
    pub fn agents(&self) -> [&AgentProfile; 2] {
        [&self.strategic, &self.character]
    }
}
