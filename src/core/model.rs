use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Race ids treated as the small species. Closed set, not configurable.
pub fn is_small_species_race(race_id: u8) -> bool {
    matches!(race_id, 5 | 6)
}

/// Which alert rule an event selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// A player walked into the house
    Entered,
    /// A player walked out of the house
    Left,
    /// We entered a house with the player already inside
    AlreadyHere,
}

impl Trigger {
    pub fn all() -> &'static [Trigger] {
        &[Self::Entered, Self::Left, Self::AlreadyHere]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Entered => "When a player enters a house",
            Self::Left => "When a player leaves a house",
            Self::AlreadyHere => "When entering a house with people already inside",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Entered => "entered",
            Self::Left => "left",
            Self::AlreadyHere => "already_here",
        };
        f.write_str(name)
    }
}

/// Host lookup from a home-world id to its display name.
pub trait WorldLookup: Send + Sync {
    fn world_name(&self, world_id: u32) -> Option<String>;
}

/// Snapshot of an observed player, built once per sighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    name: String,
    world_id: u32,
    is_small_species: bool,
}

impl PlayerRecord {
    pub fn new(name: impl Into<String>, world_id: u32, race_id: u8) -> Self {
        Self {
            name: name.into(),
            world_id,
            is_small_species: is_small_species_race(race_id),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn world_id(&self) -> u32 {
        self.world_id
    }

    pub fn is_small_species(&self) -> bool {
        self.is_small_species
    }

    /// Resolve the home-world name. Looked up on every call, never cached.
    pub fn world_name(&self, worlds: &dyn WorldLookup) -> String {
        worlds
            .world_name(self.world_id)
            .unwrap_or_else(|| format!("World_{}", self.world_id))
    }
}

/// Static world table, usually loaded from a JSON object of `id -> name`.
#[derive(Debug, Clone, Default)]
pub struct WorldTable {
    names: HashMap<u32, String>,
}

impl WorldTable {
    pub fn new(names: HashMap<u32, String>) -> Self {
        Self { names }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let names = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl WorldLookup for WorldTable {
    fn world_name(&self, world_id: u32) -> Option<String> {
        self.names.get(&world_id).cloned()
    }
}
