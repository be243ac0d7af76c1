//! # Room Activation
//!
//! Door locks layered over a generated layout. A room wakes its enemies and
//! locks its doors the first time the player walks in, and unlocks again once
//! every enemy inside is dead. The layout itself never changes.

use crate::generation::{DungeonLayout, RoomId, RoomType, SpawnPoint};
use crate::utils::{Direction, GridCell};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where a room is in its activation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    /// Not yet entered
    Dormant,
    /// Entered with enemies alive; doors are locked
    Locked,
    /// Entered and free of enemies
    Cleared,
}

/// A change the rest of the game should react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomEvent {
    /// The room's enemies should start acting
    Activated(RoomId),
    DoorsLocked(RoomId),
    DoorsUnlocked(RoomId),
}

/// Lock state for every room of one floor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomStates {
    states: HashMap<RoomId, RoomState>,
    alive: HashMap<RoomId, u32>,
}

impl RoomStates {
    /// Every room starts dormant except the start room, which is already
    /// cleared.
    pub fn new(layout: &DungeonLayout, spawns: &[SpawnPoint]) -> Self {
        let mut states = HashMap::new();
        for room in layout.rooms() {
            let state = if room.room_type == RoomType::Start {
                RoomState::Cleared
            } else {
                RoomState::Dormant
            };
            states.insert(room.id, state);
        }
        let mut alive = HashMap::new();
        for spawn in spawns {
            *alive.entry(spawn.room).or_insert(0) += 1;
        }
        Self { states, alive }
    }

    pub fn state(&self, room: RoomId) -> Option<RoomState> {
        self.states.get(&room).copied()
    }

    pub fn is_locked(&self, room: RoomId) -> bool {
        self.state(room) == Some(RoomState::Locked)
    }

    pub fn enemies_alive(&self, room: RoomId) -> u32 {
        self.alive.get(&room).copied().unwrap_or(0)
    }

    /// The player stepped into `room`.
    pub fn enter(&mut self, room: RoomId) -> Vec<RoomEvent> {
        let Some(state) = self.states.get_mut(&room) else {
            return Vec::new();
        };
        if *state != RoomState::Dormant {
            return Vec::new();
        }

        let alive = self.alive.get(&room).copied().unwrap_or(0);
        if alive == 0 {
            *state = RoomState::Cleared;
            return vec![RoomEvent::Activated(room)];
        }
        *state = RoomState::Locked;
        log::debug!("{} locked with {} enemies inside", room, alive);
        vec![RoomEvent::Activated(room), RoomEvent::DoorsLocked(room)]
    }

    /// An enemy of `room` died.
    pub fn enemy_died(&mut self, room: RoomId) -> Option<RoomEvent> {
        let alive = self.alive.get_mut(&room)?;
        *alive = alive.saturating_sub(1);
        let remaining = *alive;
        if remaining > 0 || !self.is_locked(room) {
            return None;
        }
        self.states.insert(room, RoomState::Cleared);
        log::debug!("{} cleared", room);
        Some(RoomEvent::DoorsUnlocked(room))
    }

    /// The cell reached by walking through the door on `direction` of
    /// `cell`, or `None` if there is no door there or either side is locked.
    pub fn traverse(&self, layout: &DungeonLayout, cell: GridCell, direction: Direction) -> Option<GridCell> {
        if !layout.door_mask(cell).has(direction) {
            return None;
        }
        let here = layout.get_room(cell)?;
        let next = cell.step(direction);
        let there = layout.get_room(next)?;
        if here.id == there.id {
            return Some(next);
        }
        if self.is_locked(here.id) || self.is_locked(there.id) {
            return None;
        }
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{EnemyKind, RoomFootprint};
    use crate::utils::{GridMapping, Vec2};

    /// Three rooms in a row going east from the start.
    fn corridor() -> DungeonLayout {
        DungeonLayout::from_placements(
            0,
            3,
            GridMapping::default(),
            &[
                (GridCell::new(0, 0), RoomFootprint::Single),
                (GridCell::new(1, 0), RoomFootprint::Single),
                (GridCell::new(2, 0), RoomFootprint::Single),
            ],
        )
        .unwrap()
    }

    fn spawn(room: u32) -> SpawnPoint {
        SpawnPoint {
            room: RoomId(room),
            position: Vec2::ZERO,
            kind: EnemyKind::Runner,
        }
    }

    #[test]
    fn test_start_room_is_cleared() {
        let layout = corridor();
        let rooms = RoomStates::new(&layout, &[]);
        assert_eq!(rooms.state(RoomId(0)), Some(RoomState::Cleared));
        assert_eq!(rooms.state(RoomId(1)), Some(RoomState::Dormant));
        assert_eq!(rooms.state(RoomId(9)), None);
    }

    #[test]
    fn test_lock_and_unlock_cycle() {
        let layout = corridor();
        let mut rooms = RoomStates::new(&layout, &[spawn(1), spawn(1)]);

        assert_eq!(
            rooms.enter(RoomId(1)),
            vec![RoomEvent::Activated(RoomId(1)), RoomEvent::DoorsLocked(RoomId(1))]
        );
        assert!(rooms.is_locked(RoomId(1)));
        assert!(rooms.enter(RoomId(1)).is_empty());

        assert_eq!(rooms.enemy_died(RoomId(1)), None);
        assert_eq!(rooms.enemy_died(RoomId(1)), Some(RoomEvent::DoorsUnlocked(RoomId(1))));
        assert_eq!(rooms.state(RoomId(1)), Some(RoomState::Cleared));
        assert_eq!(rooms.enemies_alive(RoomId(1)), 0);
    }

    #[test]
    fn test_empty_room_clears_on_entry() {
        let layout = corridor();
        let mut rooms = RoomStates::new(&layout, &[]);
        assert_eq!(rooms.enter(RoomId(2)), vec![RoomEvent::Activated(RoomId(2))]);
        assert_eq!(rooms.state(RoomId(2)), Some(RoomState::Cleared));
    }

    #[test]
    fn test_locked_doors_refuse_traversal() {
        let layout = corridor();
        let mut rooms = RoomStates::new(&layout, &[spawn(1)]);
        let start = GridCell::new(0, 0);

        assert_eq!(rooms.traverse(&layout, start, Direction::East), Some(GridCell::new(1, 0)));
        assert_eq!(rooms.traverse(&layout, start, Direction::North), None);

        rooms.enter(RoomId(1));
        assert_eq!(rooms.traverse(&layout, GridCell::new(1, 0), Direction::West), None);
        assert_eq!(rooms.traverse(&layout, start, Direction::East), None);

        rooms.enemy_died(RoomId(1));
        assert_eq!(rooms.traverse(&layout, GridCell::new(1, 0), Direction::East), Some(GridCell::new(2, 0)));
    }

    #[test]
    fn test_deaths_in_dormant_room_do_not_unlock() {
        let layout = corridor();
        let mut rooms = RoomStates::new(&layout, &[spawn(2)]);
        assert_eq!(rooms.enemy_died(RoomId(2)), None);
        assert_eq!(rooms.enter(RoomId(2)), vec![RoomEvent::Activated(RoomId(2))]);
    }
}
