use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::ConfigError;

/// Raw model output.
///
/// Nothing guarantees the model stays within the configured table, so an id
/// is only meaningful once it has gone through [`ActionCatalog::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ActionId(pub u32);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for ActionId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl TryFrom<i64> for ActionId {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u32::try_from(value).map(Self).map_err(|_| value)
    }
}

/// Symbolic action tag, e.g. `attack` or `move_north`.
///
/// Cheap to clone; decisions carry their name across threads.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionName(Arc<str>);

impl ActionName {
    pub const IDLE: &'static str = "idle";

    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn idle() -> Self {
        Self::new(Self::IDLE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_idle(&self) -> bool {
        &*self.0 == Self::IDLE
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ActionName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ActionName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::new(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Tile offset `(dx, dy)`; north is `+y`.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::South => (0, -1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }
}

/// Actions the executor knows how to perform.
///
/// Catalog names outside this set are legal configuration; they simply
/// execute as [`GameAction::Idle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameAction {
    Attack,
    Defend,
    Move(Direction),
    Idle,
}

impl GameAction {
    pub const ALL: [GameAction; 7] = [
        GameAction::Attack,
        GameAction::Defend,
        GameAction::Move(Direction::North),
        GameAction::Move(Direction::South),
        GameAction::Move(Direction::East),
        GameAction::Move(Direction::West),
        GameAction::Idle,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "attack" => Some(Self::Attack),
            "defend" => Some(Self::Defend),
            "move_north" => Some(Self::Move(Direction::North)),
            "move_south" => Some(Self::Move(Direction::South)),
            "move_east" => Some(Self::Move(Direction::East)),
            "move_west" => Some(Self::Move(Direction::West)),
            ActionName::IDLE => Some(Self::Idle),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Attack => "attack",
            Self::Defend => "defend",
            Self::Move(Direction::North) => "move_north",
            Self::Move(Direction::South) => "move_south",
            Self::Move(Direction::East) => "move_east",
            Self::Move(Direction::West) => "move_west",
            Self::Idle => ActionName::IDLE,
        }
    }
}

/// Immutable id → name table.
///
/// Built once from configuration. A reload replaces the whole value; there is
/// no way to edit entries in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCatalog {
    entries: BTreeMap<ActionId, ActionName>,
}

impl ActionCatalog {
    /// Build a catalog from ordered `(id, name)` pairs.
    ///
    /// Names are trimmed. Fails on a repeated id or an empty name.
    pub fn load<I, N>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (ActionId, N)>,
        N: AsRef<str>,
    {
        let mut map = BTreeMap::new();
        for (id, name) in entries {
            let name = name.as_ref().trim();
            if name.is_empty() {
                return Err(ConfigError::EmptyName { id });
            }
            if map.insert(id, ActionName::new(name)).is_some() {
                return Err(ConfigError::DuplicateId(id));
            }
        }
        Ok(Self { entries: map })
    }

    /// The seven built-in actions, numbered in declaration order.
    pub fn builtin() -> Self {
        let entries = GameAction::ALL
            .iter()
            .enumerate()
            .map(|(i, action)| (ActionId(i as u32), ActionName::new(action.name())))
            .collect();
        Self { entries }
    }

    /// Total lookup: ids missing from the table resolve to `idle`.
    pub fn resolve(&self, id: ActionId) -> ActionName {
        self.entries.get(&id).cloned().unwrap_or_else(ActionName::idle)
    }

    pub fn get(&self, id: ActionId) -> Option<&ActionName> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActionId, &ActionName)> {
        self.entries.iter().map(|(id, name)| (*id, name))
    }
}

impl Default for ActionCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
