//! Small copyable identifiers shared by the world model and the engine.

use serde::{Deserialize, Serialize};

/// Identifier of a room. `RoomId::OUTSIDE` is the unenclosed exterior and
/// the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub u32);

impl RoomId {
    pub const OUTSIDE: RoomId = RoomId(0);

    pub fn is_outside(self) -> bool {
        self == Self::OUTSIDE
    }
}

/// Identifier of a placed structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StructureId(pub u32);

/// Identifier of an actor. The engine derives it from its ECS entity bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u64);

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_outside() {
            write!(f, "outside")
        } else {
            write!(f, "room#{}", self.0)
        }
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}
