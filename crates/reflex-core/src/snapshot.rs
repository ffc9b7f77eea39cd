//! Immutable world captures.
//!
//! A snapshot is taken on the event-producing context at dispatch time and
//! owns every value it holds. Nothing in it points back into live world state.

use std::fmt;

/// Tile coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldPosition {
    pub x: i32,
    pub y: i32,
    pub plane: i32,
}

impl WorldPosition {
    pub const ORIGIN: WorldPosition = WorldPosition {
        x: 0,
        y: 0,
        plane: 0,
    };

    pub const fn new(x: i32, y: i32, plane: i32) -> Self {
        Self { x, y, plane }
    }

    /// Same plane, shifted by `(dx, dy)` tiles. Clamps at the coordinate range.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            plane: self.plane,
        }
    }

    /// Like [`WorldPosition::offset`], but `None` when either axis would
    /// leave the coordinate range.
    pub fn checked_offset(self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
            plane: self.plane,
        })
    }
}

impl fmt::Display for WorldPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WorldPoint(x={}, y={}, plane={})",
            self.x, self.y, self.plane
        )
    }
}

/// Another entity near the actor that is interacting with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NearbyEntity {
    pub id: u32,
    pub name: String,
    pub position: WorldPosition,
}

/// The locally controlled actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActorState {
    pub health: i32,
    pub position: WorldPosition,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldSnapshot {
    /// `None` while the host has no local actor (e.g. during login).
    pub actor: Option<ActorState>,
    /// Captured in host order.
    pub nearby: Vec<NearbyEntity>,
}

impl WorldSnapshot {
    pub fn new(actor: ActorState, nearby: Vec<NearbyEntity>) -> Self {
        Self {
            actor: Some(actor),
            nearby,
        }
    }

    /// Health of the actor, `0` without one.
    pub fn health(&self) -> i32 {
        self.actor.map(|a| a.health).unwrap_or(0)
    }

    /// Position of the actor, the origin without one.
    pub fn position(&self) -> WorldPosition {
        self.actor
            .map(|a| a.position)
            .unwrap_or(WorldPosition::ORIGIN)
    }

    /// The entity an attack is aimed at: the first one captured.
    pub fn primary_target(&self) -> Option<&NearbyEntity> {
        self.nearby.first()
    }
}
