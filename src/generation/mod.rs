//! # Generation Module
//!
//! Procedural content generation for dungeon floors.
//!
//! A floor is built in three passes. The dungeon generator grows a connected
//! set of room cells and classifies them; the obstacle generator scatters
//! rocks and raises walls around every room; the encounter generator picks
//! enemy spawn points in the open space that remains. Every pass draws from
//! the same seeded [`GameRng`], so a seed reproduces the whole floor.

pub mod doors;
pub mod dungeon;
pub mod encounters;
pub mod obstacles;

pub use doors::*;
pub use dungeon::*;
pub use encounters::*;
pub use obstacles::*;

use crate::utils::{GameRng, GridCell, GridMapping, Vec2};
use crate::{LabyrinthError, LabyrinthResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for procedural generation.
///
/// Controls the size and shape of the room graph plus the obstacle and
/// enemy placement that runs on top of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Random seed for reproducible generation
    pub seed: u64,
    /// Number of grid cells to fill (a 2x2 room fills 4)
    pub target_rooms: u32,
    /// Minimum BFS distance from the start for a boss room to be placed
    pub min_boss_distance: u32,
    /// Probability of trying a 2x2 room on each expansion (0.0 to 1.0)
    pub large_room_probability: f64,
    /// Number of treasure rooms to mark among the dead ends
    pub treasure_rooms: u32,
    /// World-space size of one room cell
    pub room_spacing: Vec2,
    /// Rock obstacle placement settings
    pub rocks: RockSettings,
    /// Room wall and doorway settings
    pub walls: WallSettings,
    /// Enemy spawn placement settings
    pub spawning: SpawnSettings,
}

impl GenerationConfig {
    /// Creates a default generation configuration with the given seed.
    ///
    /// # Examples
    ///
    /// ```
    /// use labyrinth::GenerationConfig;
    ///
    /// let config = GenerationConfig::new(7);
    /// assert_eq!(config.seed, 7);
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn new(seed: u64) -> Self {
        let (sx, sy) = crate::config::DEFAULT_ROOM_SPACING;
        Self {
            seed,
            target_rooms: crate::config::DEFAULT_TARGET_ROOMS,
            min_boss_distance: crate::config::DEFAULT_MIN_BOSS_DISTANCE,
            large_room_probability: crate::config::DEFAULT_LARGE_ROOM_PROBABILITY,
            treasure_rooms: 1,
            room_spacing: Vec2::new(sx, sy),
            rocks: RockSettings::default(),
            walls: WallSettings::default(),
            spawning: SpawnSettings::default(),
        }
    }

    /// Creates a configuration for testing: only 1x1 rooms and no treasure.
    pub fn for_testing(seed: u64) -> Self {
        Self {
            large_room_probability: 0.0,
            treasure_rooms: 0,
            ..Self::new(seed)
        }
    }

    /// Sets the room target and returns the updated config.
    pub fn with_target_rooms(mut self, target_rooms: u32) -> Self {
        self.target_rooms = target_rooms;
        self
    }

    /// Sets the large room probability and returns the updated config.
    pub fn with_large_room_probability(mut self, probability: f64) -> Self {
        self.large_room_probability = probability;
        self
    }

    /// Sets the boss distance and returns the updated config.
    pub fn with_min_boss_distance(mut self, distance: u32) -> Self {
        self.min_boss_distance = distance;
        self
    }

    /// The grid/world mapping implied by `room_spacing`.
    pub fn grid_mapping(&self) -> GridMapping {
        GridMapping::new(self.room_spacing)
    }

    /// Rejects configurations that can only be programmer errors.
    pub fn validate(&self) -> LabyrinthResult<()> {
        if self.target_rooms == 0 {
            return Err(LabyrinthError::InvalidConfig(
                "target_rooms must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.large_room_probability) {
            return Err(LabyrinthError::InvalidConfig(format!(
                "large_room_probability must be within [0, 1], got {}",
                self.large_room_probability
            )));
        }
        if !(self.room_spacing.x > 0.0 && self.room_spacing.y > 0.0) {
            return Err(LabyrinthError::InvalidConfig(format!(
                "room_spacing must be positive, got {:?}",
                self.room_spacing
            )));
        }
        self.rocks.validate()?;
        self.walls.validate()?;
        self.spawning.validate()?;
        Ok(())
    }

    /// Loads and validates a configuration from a JSON file.
    ///
    /// Missing fields take their default values.
    pub fn from_json_file(path: impl AsRef<Path>) -> LabyrinthResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: GenerationConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json(&self) -> LabyrinthResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Identifier of a room within one layout. Assigned in placement order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub u32);

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "room#{}", self.0)
    }
}

/// The role a room plays on its floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomType {
    /// Standard combat room
    Normal,
    /// Where the player enters the floor
    Start,
    /// Room with the floor's boss
    Boss,
    /// Room containing treasure
    Treasure,
}

impl RoomType {
    /// Whether rocks and regular enemies belong in this kind of room.
    pub fn is_combat_room(self) -> bool {
        matches!(self, RoomType::Normal | RoomType::Treasure)
    }

    /// Map glyph for this room type.
    pub fn glyph(self) -> char {
        match self {
            RoomType::Normal => '#',
            RoomType::Start => 'S',
            RoomType::Boss => 'B',
            RoomType::Treasure => 'T',
        }
    }
}

/// How many grid cells a room covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomFootprint {
    /// A single cell
    Single,
    /// A 2x2 block extending east and north of the origin
    Large,
}

/// A placed room.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Room {
    /// Unique identifier for this room
    pub id: RoomId,
    /// The room's cell, or the south-west cell of a large room
    pub origin: GridCell,
    /// Cells covered by the room
    pub footprint: RoomFootprint,
    /// Role of this room
    pub room_type: RoomType,
    /// Every door opening out of the room
    pub doors: Vec<DoorPlacement>,
}

impl Room {
    /// Creates a room with no doors.
    pub fn new(id: RoomId, origin: GridCell, footprint: RoomFootprint, room_type: RoomType) -> Self {
        Self {
            id,
            origin,
            footprint,
            room_type,
            doors: Vec::new(),
        }
    }

    pub fn is_large(&self) -> bool {
        self.footprint == RoomFootprint::Large
    }

    /// All grid cells covered by this room, origin first.
    ///
    /// # Examples
    ///
    /// ```
    /// use labyrinth::{GridCell, Room, RoomFootprint, RoomId, RoomType};
    ///
    /// let room = Room::new(RoomId(0), GridCell::new(1, 1), RoomFootprint::Large, RoomType::Normal);
    /// assert_eq!(room.cells().len(), 4);
    /// assert!(room.contains(GridCell::new(2, 2)));
    /// assert!(!room.contains(GridCell::new(3, 1)));
    /// ```
    pub fn cells(&self) -> Vec<GridCell> {
        match self.footprint {
            RoomFootprint::Single => vec![self.origin],
            RoomFootprint::Large => large_room_cells(self.origin).to_vec(),
        }
    }

    /// Checks if a cell belongs to this room.
    pub fn contains(&self, cell: GridCell) -> bool {
        match self.footprint {
            RoomFootprint::Single => cell == self.origin,
            RoomFootprint::Large => {
                cell.x >= self.origin.x
                    && cell.x <= self.origin.x + 1
                    && cell.y >= self.origin.y
                    && cell.y <= self.origin.y + 1
            }
        }
    }

    /// World-space centre of the room.
    pub fn center(&self, mapping: &GridMapping) -> Vec2 {
        match self.footprint {
            RoomFootprint::Single => mapping.cell_center(self.origin),
            RoomFootprint::Large => mapping.large_room_center(self.origin),
        }
    }

    /// World-space bounds of the room.
    pub fn bounds(&self, mapping: &GridMapping) -> crate::utils::Bounds {
        match self.footprint {
            RoomFootprint::Single => mapping.cell_bounds(self.origin),
            RoomFootprint::Large => mapping.large_room_bounds(self.origin),
        }
    }
}

/// The four cells of a 2x2 room anchored at `origin`: origin, east, north, north-east.
pub fn large_room_cells(origin: GridCell) -> [GridCell; 4] {
    [
        origin,
        origin + GridCell::new(1, 0),
        origin + GridCell::new(0, 1),
        origin + GridCell::new(1, 1),
    ]
}

/// Trait for procedural generators.
///
/// Every generation pass implements this trait so passes can be run,
/// validated and logged the same way.
pub trait Generator<T> {
    /// Generates content using the provided configuration and random number generator.
    fn generate(&self, config: &GenerationConfig, rng: &mut GameRng) -> LabyrinthResult<T>;

    /// Validates that the generated content meets requirements.
    fn validate(&self, content: &T, config: &GenerationConfig) -> LabyrinthResult<()>;

    /// Gets the generator type name for logging and debugging.
    fn generator_type(&self) -> &'static str;
}

/// Generates a dungeon layout from a configuration alone.
///
/// # Examples
///
/// ```
/// use labyrinth::{generate_dungeon, GenerationConfig, RoomType};
///
/// let layout = generate_dungeon(&GenerationConfig::for_testing(42)).unwrap();
/// assert_eq!(layout.role(layout.start_cell()), Some(RoomType::Start));
/// ```
pub fn generate_dungeon(config: &GenerationConfig) -> LabyrinthResult<DungeonLayout> {
    let mut rng = utils::create_rng(config);
    DungeonGenerator::new().generate(config, &mut rng)
}

/// Utility functions for generation algorithms.
pub mod utils {
    use super::*;
    use pathfinding::prelude::bfs_reach;
    use std::collections::HashSet;

    /// Creates a seeded random number generator from the config.
    pub fn create_rng(config: &GenerationConfig) -> GameRng {
        GameRng::new(config.seed)
    }

    /// Validates the structural guarantees every layout must keep.
    ///
    /// Checks that every cell is reachable from the start through doors or
    /// large-room interiors, that there is exactly one start and at most one
    /// boss, that door masks are mutual, and that no cell is claimed twice.
    pub fn validate_layout(layout: &DungeonLayout, config: &GenerationConfig) -> LabyrinthResult<()> {
        let reachable: HashSet<GridCell> =
            bfs_reach(layout.start_cell(), |&cell| layout.connected_neighbors(cell)).collect();
        if reachable.len() != layout.cell_count() {
            return Err(LabyrinthError::InvalidLayout(format!(
                "layout is disconnected: {} of {} cells reachable",
                reachable.len(),
                layout.cell_count()
            )));
        }

        let starts = layout.cells_with_role(RoomType::Start).count();
        if starts != 1 {
            return Err(LabyrinthError::InvalidLayout(format!(
                "layout has {} start cells",
                starts
            )));
        }

        let bosses: Vec<GridCell> = layout.cells_with_role(RoomType::Boss).collect();
        if bosses.len() > 1 {
            return Err(LabyrinthError::InvalidLayout(format!(
                "layout has {} boss cells",
                bosses.len()
            )));
        }
        if let Some(&boss) = bosses.first() {
            let distance = layout.distance_from_start(boss).unwrap_or(0);
            if distance < config.min_boss_distance {
                return Err(LabyrinthError::InvalidLayout(format!(
                    "boss at {} is only {} steps from the start",
                    boss, distance
                )));
            }
        }

        let mut claimed = HashSet::new();
        for room in layout.rooms() {
            for cell in room.cells() {
                if !claimed.insert(cell) {
                    return Err(LabyrinthError::InvalidLayout(format!(
                        "cell {} is claimed by more than one room",
                        cell
                    )));
                }
            }
        }

        for cell in layout.occupied_cells() {
            for dir in crate::utils::Direction::ALL {
                let other = cell.step(dir);
                if layout.door_mask(cell).has(dir) != layout.door_mask(other).has(dir.opposite())
                    && layout.has_room(other)
                {
                    return Err(LabyrinthError::InvalidLayout(format!(
                        "door between {} and {} is one-way",
                        cell, other
                    )));
                }
            }
        }

        Ok(())
    }
}
