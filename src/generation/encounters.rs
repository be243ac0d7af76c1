//! # Encounter Generation
//!
//! Enemy spawn placement for combat rooms.
//!
//! Each Normal or Treasure room is covered with a grid of candidate tiles.
//! Tiles in the wall margin, on top of obstacles or close to a door are
//! discarded; the rest are shuffled and taken while they keep a minimum
//! spacing from each other.

use crate::generation::{DungeonLayout, GenerationConfig, Generator, Room, RoomId};
use crate::navigation::{LineOfSight, ObstacleField, ObstacleLayer};
use crate::utils::{GameRng, Vec2};
use crate::{LabyrinthError, LabyrinthResult};
use serde::{Deserialize, Serialize};

/// The kinds of regular enemy a room can spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Chases the player
    Runner,
    /// Keeps its distance and fires when it has a clear shot
    Shooter,
    /// Leaps between waypoints
    Jumper,
    /// Wanders between random waypoints
    Patroller,
}

impl EnemyKind {
    pub const ALL: [EnemyKind; 4] = [
        EnemyKind::Runner,
        EnemyKind::Shooter,
        EnemyKind::Jumper,
        EnemyKind::Patroller,
    ];
}

/// Enemy spawn placement settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnSettings {
    pub min_enemies: u32,
    pub max_enemies: u32,
    /// Tiles within this distance of a doorway are skipped
    pub door_avoid_distance: f32,
    /// Minimum distance between two enemies of the same room
    pub enemy_spacing: f32,
    /// Tiles closer than this to the room edge are skipped
    pub wall_margin: f32,
    /// Candidate grid columns per room
    pub grid_width: u32,
    /// Candidate grid rows per room
    pub grid_height: u32,
    /// Enemy kinds to draw from. Empty means no enemies.
    pub kinds: Vec<EnemyKind>,
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            min_enemies: 2,
            max_enemies: 5,
            door_avoid_distance: 1.2,
            enemy_spacing: 1.2,
            wall_margin: 0.4,
            grid_width: 9,
            grid_height: 5,
            kinds: EnemyKind::ALL.to_vec(),
        }
    }
}

impl SpawnSettings {
    pub fn validate(&self) -> LabyrinthResult<()> {
        if self.min_enemies > self.max_enemies {
            return Err(LabyrinthError::InvalidConfig(format!(
                "min_enemies ({}) exceeds max_enemies ({})",
                self.min_enemies, self.max_enemies
            )));
        }
        if self.grid_width == 0 || self.grid_height == 0 {
            return Err(LabyrinthError::InvalidConfig(
                "spawn grid must have at least one tile".to_string(),
            ));
        }
        if self.enemy_spacing < 0.0 || self.door_avoid_distance < 0.0 || self.wall_margin < 0.0 {
            return Err(LabyrinthError::InvalidConfig(
                "spawn clearances cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where one enemy starts the floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub room: RoomId,
    pub position: Vec2,
    pub kind: EnemyKind,
}

/// Picks enemy spawn points for every combat room of a layout.
#[derive(Debug, Clone)]
pub struct EncounterGenerator<'a> {
    layout: &'a DungeonLayout,
    obstacles: &'a ObstacleField,
}

impl<'a> EncounterGenerator<'a> {
    pub fn new(layout: &'a DungeonLayout, obstacles: &'a ObstacleField) -> Self {
        Self { layout, obstacles }
    }

    /// Open tiles of the room's candidate grid, in row-major order.
    pub fn candidate_tiles(&self, room: &Room, settings: &SpawnSettings) -> Vec<Vec2> {
        let bounds = room.bounds(self.layout.mapping());
        let center = bounds.center();
        let half = bounds.half_extents();
        let size = bounds.size();
        let step = Vec2::new(
            size.x / settings.grid_width as f32,
            size.y / settings.grid_height as f32,
        );
        let check_radius = step.x.min(step.y) * 0.4;

        let mut tiles = Vec::new();
        for gy in 0..settings.grid_height {
            for gx in 0..settings.grid_width {
                let tile = Vec2::new(
                    bounds.min.x + (gx as f32 + 0.5) * step.x,
                    bounds.min.y + (gy as f32 + 0.5) * step.y,
                );
                if (tile.x - center.x).abs() > half.x - settings.wall_margin
                    || (tile.y - center.y).abs() > half.y - settings.wall_margin
                {
                    continue;
                }
                if self.obstacles.overlaps(tile, check_radius, ObstacleLayer::SOLID) {
                    continue;
                }
                if self
                    .obstacles
                    .overlaps(tile, settings.door_avoid_distance, ObstacleLayer::DOORS)
                {
                    continue;
                }
                tiles.push(tile);
            }
        }
        tiles
    }

    fn spawn_room(&self, room: &Room, settings: &SpawnSettings, rng: &mut GameRng) -> Vec<SpawnPoint> {
        let mut tiles = self.candidate_tiles(room, settings);
        if tiles.is_empty() || settings.kinds.is_empty() {
            return Vec::new();
        }

        let desired = rng.range_inclusive_u32(settings.min_enemies, settings.max_enemies) as usize;
        let count = desired.min(tiles.len());
        rng.shuffle(&mut tiles);

        let mut chosen: Vec<Vec2> = Vec::with_capacity(count);
        for tile in tiles {
            if chosen.len() >= count {
                break;
            }
            if chosen.iter().all(|p| p.distance(tile) >= settings.enemy_spacing) {
                chosen.push(tile);
            }
        }

        chosen
            .into_iter()
            .map(|position| {
                let kind = rng
                    .index(settings.kinds.len())
                    .map(|i| settings.kinds[i])
                    .unwrap_or(EnemyKind::Runner);
                SpawnPoint {
                    room: room.id,
                    position,
                    kind,
                }
            })
            .collect()
    }
}

impl Generator<Vec<SpawnPoint>> for EncounterGenerator<'_> {
    fn generate(&self, config: &GenerationConfig, rng: &mut GameRng) -> LabyrinthResult<Vec<SpawnPoint>> {
        config.spawning.validate()?;

        let mut spawns = Vec::new();
        for room in self.layout.rooms() {
            if !room.room_type.is_combat_room() {
                continue;
            }
            let placed = self.spawn_room(room, &config.spawning, rng);
            if placed.is_empty() {
                log::debug!("{} has no room for enemies", room.id);
            }
            spawns.extend(placed);
        }

        log::debug!("Placed {} enemy spawns", spawns.len());
        self.validate(&spawns, config)?;
        Ok(spawns)
    }

    fn validate(&self, spawns: &Vec<SpawnPoint>, config: &GenerationConfig) -> LabyrinthResult<()> {
        let mapping = self.layout.mapping();
        for (i, spawn) in spawns.iter().enumerate() {
            let room = self
                .layout
                .rooms()
                .get(spawn.room.0 as usize)
                .ok_or_else(|| LabyrinthError::InvalidLayout(format!("spawn in unknown {}", spawn.room)))?;
            if !room.room_type.is_combat_room() || !room.bounds(mapping).contains(spawn.position) {
                return Err(LabyrinthError::InvalidLayout(format!(
                    "spawn at {:?} does not belong in {}",
                    spawn.position, room.id
                )));
            }
            let crowded = spawns[..i].iter().any(|other| {
                other.room == spawn.room
                    && other.position.distance(spawn.position) < config.spawning.enemy_spacing
            });
            if crowded {
                return Err(LabyrinthError::InvalidLayout(format!(
                    "spawns in {} are closer than {}",
                    room.id, config.spawning.enemy_spacing
                )));
            }
        }
        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "EncounterGenerator"
    }
}
