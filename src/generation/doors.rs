//! # Doors
//!
//! Door connectivity masks and door placements for room cells.

use crate::utils::{Direction, GridCell, GridMapping, Vec2};
use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Which cardinal edges of a room cell have a door.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DoorMask: u8 {
        const NORTH = 0x01;
        const EAST = 0x02;
        const SOUTH = 0x04;
        const WEST = 0x08;
    }
}

impl DoorMask {
    /// The single bit for a direction.
    pub fn from_direction(direction: Direction) -> Self {
        match direction {
            Direction::North => DoorMask::NORTH,
            Direction::East => DoorMask::EAST,
            Direction::South => DoorMask::SOUTH,
            Direction::West => DoorMask::WEST,
        }
    }

    /// Whether the door facing `direction` is present.
    ///
    /// # Examples
    ///
    /// ```
    /// use labyrinth::{Direction, DoorMask};
    ///
    /// let mask = DoorMask::NORTH | DoorMask::WEST;
    /// assert!(mask.has(Direction::North));
    /// assert!(!mask.has(Direction::East));
    /// assert_eq!(mask.bits(), 9);
    /// ```
    pub fn has(self, direction: Direction) -> bool {
        self.contains(Self::from_direction(direction))
    }

    /// Directions with a door, in N, E, S, W order.
    pub fn directions(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |&d| self.has(d))
    }

    /// Four-character label such as `N.S.` for maps and logs.
    pub fn label(self) -> String {
        Direction::ALL
            .iter()
            .map(|&d| if self.has(d) { d.label() } else { '.' })
            .collect()
    }
}

// Serialized as the raw bit pattern.
impl Serialize for DoorMask {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DoorMask {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = u8::deserialize(deserializer)?;
        Ok(DoorMask::from_bits_truncate(bits))
    }
}

/// One door of a room: the room cell it sits in and the edge it faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DoorPlacement {
    pub cell: GridCell,
    pub direction: Direction,
}

impl DoorPlacement {
    pub fn new(cell: GridCell, direction: Direction) -> Self {
        Self { cell, direction }
    }

    /// The cell on the other side of the door.
    pub fn leads_to(&self) -> GridCell {
        self.cell.step(self.direction)
    }

    /// World-space point in the middle of the doorway.
    pub fn world_point(&self, mapping: &GridMapping) -> Vec2 {
        mapping.edge_midpoint(self.cell, self.direction)
    }

    /// Where a traveller arriving through this door appears, `inset` units inside the room.
    pub fn entry_point(&self, mapping: &GridMapping, inset: f32) -> Vec2 {
        self.world_point(mapping) - self.direction.to_vec2() * inset
    }
}
