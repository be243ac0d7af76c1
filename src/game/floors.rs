//! # Floor Progression
//!
//! Each floor of a run is generated from its own config: the room target
//! grows with depth and the seed is derived from the run's base seed, so a
//! base seed reproduces every floor of the run.

use super::{Enemy, EnemyId, RoomStates};
use crate::generation::{
    generate_dungeon, DungeonLayout, EncounterGenerator, GenerationConfig, Generator, ObstacleGenerator,
    SpawnPoint,
};
use crate::navigation::{AgentSettings, NavigationConfig, NavigationManager};
use crate::utils::GameRng;
use crate::LabyrinthResult;
use serde::{Deserialize, Serialize};

/// Odd 64-bit constant used to spread floor indices across the seed space.
const FLOOR_SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// How a run's floors grow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloorPlan {
    /// Template for every floor; its seed is the run's base seed
    pub base: GenerationConfig,
    /// Cells on the first floor
    pub starting_rooms: u32,
    /// Extra cells per floor descended
    pub rooms_per_floor: u32,
    /// The floor the run is on, counting from 0
    pub floor: u32,
}

impl Default for FloorPlan {
    fn default() -> Self {
        Self::new(GenerationConfig::default())
    }
}

impl FloorPlan {
    pub const DEFAULT_STARTING_ROOMS: u32 = 12;
    pub const DEFAULT_ROOMS_PER_FLOOR: u32 = 3;

    pub fn new(base: GenerationConfig) -> Self {
        Self {
            base,
            starting_rooms: Self::DEFAULT_STARTING_ROOMS,
            rooms_per_floor: Self::DEFAULT_ROOMS_PER_FLOOR,
            floor: 0,
        }
    }

    pub fn base_seed(&self) -> u64 {
        self.base.seed
    }

    /// Seed of floor `index`. Floor 0 uses the base seed unchanged.
    pub fn seed_for(&self, index: u32) -> u64 {
        self.base.seed ^ u64::from(index).wrapping_mul(FLOOR_SEED_MIX)
    }

    /// Cell target of floor `index`.
    pub fn rooms_for(&self, index: u32) -> u32 {
        self.starting_rooms
            .saturating_add(index.saturating_mul(self.rooms_per_floor))
    }

    /// Generation config for floor `index`.
    ///
    /// # Examples
    ///
    /// ```
    /// use labyrinth::{FloorPlan, GenerationConfig};
    ///
    /// let plan = FloorPlan::new(GenerationConfig::new(9));
    /// assert_eq!(plan.config_for(0).target_rooms, 12);
    /// assert_eq!(plan.config_for(2).target_rooms, 18);
    /// assert_eq!(plan.config_for(0).seed, 9);
    /// ```
    pub fn config_for(&self, index: u32) -> GenerationConfig {
        GenerationConfig {
            seed: self.seed_for(index),
            target_rooms: self.rooms_for(index),
            ..self.base.clone()
        }
    }

    /// Config of the floor the run is on.
    pub fn current_config(&self) -> GenerationConfig {
        self.config_for(self.floor)
    }

    /// Moves the run one floor down and returns the new floor index.
    pub fn advance(&mut self) -> u32 {
        self.floor = self.floor.saturating_add(1);
        log::info!("Descending to floor {}", self.floor);
        self.floor
    }

    /// Generates the floor the run is on.
    pub fn build_current(&self, nav_config: &NavigationConfig) -> LabyrinthResult<Floor> {
        self.build_floor(self.floor, nav_config)
    }

    /// Runs every generation pass for floor `index` and builds its
    /// navigation graph.
    ///
    /// A starved layout is still returned; the shortfall is only logged.
    pub fn build_floor(&self, index: u32, nav_config: &NavigationConfig) -> LabyrinthResult<Floor> {
        let config = self.config_for(index);
        config.validate()?;

        let layout = generate_dungeon(&config)?;
        if let Some(shortfall) = layout.shortfall() {
            log::warn!("Floor {}: {}", index, shortfall);
        }

        // Obstacles and spawns draw from a stream separate from the layout's
        // so changing rock settings never reshapes the room graph.
        let mut rng = GameRng::new(config.seed.wrapping_add(1));
        let obstacles = ObstacleGenerator::new(&layout).generate(&config, &mut rng)?;
        let spawns = EncounterGenerator::new(&layout, &obstacles).generate(&config, &mut rng)?;
        let rooms = RoomStates::new(&layout, &spawns);
        let navigation = NavigationManager::for_layout(&layout, obstacles, nav_config)?;

        log::info!(
            "Floor {} ready: {} cells, {} rooms, {} spawns",
            index,
            layout.cell_count(),
            layout.rooms().len(),
            spawns.len()
        );
        Ok(Floor {
            number: index,
            config,
            layout,
            spawns,
            rooms,
            navigation,
        })
    }
}

/// Everything generated for one floor.
#[derive(Debug, Clone)]
pub struct Floor {
    pub number: u32,
    pub config: GenerationConfig,
    pub layout: DungeonLayout,
    pub spawns: Vec<SpawnPoint>,
    pub rooms: RoomStates,
    /// Navigation graph built against the floor's obstacles
    pub navigation: NavigationManager,
}

impl Floor {
    /// One dormant enemy per spawn point, numbered in spawn order.
    pub fn spawn_enemies(&self, settings: &AgentSettings, rng: &mut GameRng) -> Vec<Enemy> {
        self.spawns
            .iter()
            .enumerate()
            .map(|(i, spawn)| Enemy::from_spawn(EnemyId(i as u32), spawn, settings.clone(), rng))
            .collect()
    }
}
