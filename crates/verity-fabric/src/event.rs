use serde::{Deserialize, Serialize};

use verity_types::ObjectConfig;

/// Classification of configuration events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Create,
    Modify,
    Delete,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Modify => "modify",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

/// A change to one configuration record.
///
/// Create and modify carry the new record; delete only names the object,
/// since its configuration no longer exists. Handlers resolve the current
/// status record at the dispatch boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigEvent {
    Create(ObjectConfig),
    Modify(ObjectConfig),
    Delete { name: String },
}

impl ConfigEvent {
    pub fn delete(name: impl Into<String>) -> Self {
        Self::Delete { name: name.into() }
    }

    /// Name of the object the event refers to.
    pub fn name(&self) -> &str {
        match self {
            Self::Create(config) | Self::Modify(config) => &config.name,
            Self::Delete { name } => name,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Create(_) => EventKind::Create,
            Self::Modify(_) => EventKind::Modify,
            Self::Delete { .. } => EventKind::Delete,
        }
    }
}
