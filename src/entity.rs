//! Entity identifiers and targetable handles.

use crate::grid::Tile;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

/// Interned identifier for a character or any other targetable entity.
///
/// # Examples
///
/// ```rust
/// use zzcombat::EntityId;
///
/// let goblin = EntityId::from_str("goblin");
/// assert_eq!(goblin.as_str(), "goblin");
/// assert_eq!(goblin, "goblin".into());
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntityId(Arc<str>);

impl Serialize for EntityId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(EntityId::from(s))
    }
}

impl EntityId {
    /// Create a new `EntityId` from a string slice.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Get the string representation of this id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Something an action can be aimed at: an entity, optionally standing on a
/// tile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub entity: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile: Option<Tile>,
}

impl Target {
    /// Target an entity without position information.
    pub fn entity(entity: impl Into<EntityId>) -> Self {
        Self {
            entity: entity.into(),
            tile: None,
        }
    }

    /// Target an entity standing on `tile`.
    pub fn on_tile(entity: impl Into<EntityId>, tile: Tile) -> Self {
        Self {
            entity: entity.into(),
            tile: Some(tile),
        }
    }
}

impl From<EntityId> for Target {
    fn from(entity: EntityId) -> Self {
        Self { entity, tile: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_ordering_is_lexical() {
        let mut ids = vec![EntityId::from("orc"), EntityId::from("elf")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "elf");
    }

    #[test]
    fn test_target_serde_omits_missing_tile() {
        let json = serde_json::to_string(&Target::entity("elf")).unwrap();
        assert_eq!(json, r#"{"entity":"elf"}"#);
        let placed: Target =
            serde_json::from_str(r#"{"entity":"elf","tile":{"x":1,"y":2,"z":0}}"#).unwrap();
        assert_eq!(placed.tile, Some(Tile::new(1, 2, 0)));
    }
}
