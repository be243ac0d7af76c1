//! # Labyrinth
//!
//! Procedural dungeon layouts and waypoint navigation for a 2D action roguelike.
//!
//! ## Architecture Overview
//!
//! The crate is split into a few cooperating systems:
//!
//! - **Generation**: grows a connected room graph on an integer grid, assigns
//!   room roles and door masks, and scatters rock obstacles and enemy spawns
//! - **Navigation**: a waypoint graph with A* search, path merging and
//!   line-of-sight shortcuts, consumed by navigation agents
//! - **Game**: enemy behaviors, room lock overlays and floor progression that
//!   drive agents through the navigation core every tick
//! - **Utils**: shared world-space math, grid mapping and the seeded RNG
//!
//! Generation always completes before the navigation graph is built, and the
//! navigation graph must be built before any agent queries it. Both are plain
//! values owned by the caller; nothing in the crate is global.

pub mod game;
pub mod generation;
pub mod navigation;
pub mod utils;

// Core module re-exports
pub use game::*;
pub use generation::*;
pub use navigation::*;
pub use utils::*;

pub use generation::{
    DoorMask, DungeonGenerator, DungeonLayout, GenerationConfig, Generator, Room, RoomId,
    RoomType,
};

pub use navigation::{
    AgentMode, AgentSettings, LineOfSight, MovementResult, NavNodeId, NavigationAgent,
    NavigationConfig, NavigationGraph, NavigationManager, NavigationPath, ObstacleField,
    ObstacleLayer, PathPlanner,
};

/// Core error type for the Labyrinth crate.
#[derive(thiserror::Error, Debug)]
pub enum LabyrinthError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Configuration is malformed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Fewer rooms were placed than requested. The layout is still usable.
    #[error("Generation starved: placed {placed} of {requested} rooms")]
    GenerationStarved { requested: u32, placed: u32 },

    /// A generated layout broke one of its structural guarantees
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    /// A 2x2 room cannot be placed at this origin
    #[error("Invalid large room footprint at {origin}")]
    InvalidFootprint { origin: GridCell },

    /// The navigation graph has no nodes to answer the query
    #[error("No navigation node found")]
    NoNodeFound,

    /// A* exhausted its open set without reaching the goal
    #[error("No path from node {start} to node {goal}")]
    PathNotFound { start: NavNodeId, goal: NavNodeId },

    /// A* hit its expansion bound before reaching the goal
    #[error("Path search gave up after {expansions} expansions")]
    SearchLimitReached { expansions: usize },

    /// The navigation graph is structurally broken
    #[error("Invalid navigation graph: {0}")]
    InvalidGraph(String),
}

impl LabyrinthError {
    /// Whether a navigating caller should fall back to moving straight at its target.
    pub fn is_navigation_fallback(&self) -> bool {
        matches!(
            self,
            LabyrinthError::NoNodeFound
                | LabyrinthError::PathNotFound { .. }
                | LabyrinthError::SearchLimitReached { .. }
        )
    }
}

/// Result type used throughout the Labyrinth codebase.
pub type LabyrinthResult<T> = Result<T, LabyrinthError>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tuning constants.
pub mod config {
    /// Default number of grid cells a dungeon tries to fill
    pub const DEFAULT_TARGET_ROOMS: u32 = 12;

    /// Default minimum BFS distance between the start room and the boss room
    pub const DEFAULT_MIN_BOSS_DISTANCE: u32 = 5;

    /// Default chance of trying a 2x2 room when expanding
    pub const DEFAULT_LARGE_ROOM_PROBABILITY: f64 = 0.25;

    /// Default world-space size of one room cell
    pub const DEFAULT_ROOM_SPACING: (f32, f32) = (12.0, 8.0);

    /// Default agent movement speed in world units per second
    pub const DEFAULT_AGENT_SPEED: f32 = 3.0;

    /// Default agent sight range in world units
    pub const DEFAULT_SIGHT_RANGE: f32 = 10.0;

    /// Distance at which an agent counts as standing on a waypoint
    pub const ARRIVAL_EPSILON: f32 = 0.1;

    /// Default bound on A* node expansions per query
    pub const DEFAULT_MAX_EXPANSIONS: usize = 20_000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_fallback_classification() {
        assert!(LabyrinthError::NoNodeFound.is_navigation_fallback());
        assert!(LabyrinthError::PathNotFound {
            start: NavNodeId(0),
            goal: NavNodeId(1)
        }
        .is_navigation_fallback());
        assert!(LabyrinthError::SearchLimitReached { expansions: 10 }.is_navigation_fallback());
        assert!(!LabyrinthError::InvalidConfig("bad".to_string()).is_navigation_fallback());
    }

    #[test]
    fn test_error_messages() {
        let err = LabyrinthError::GenerationStarved {
            requested: 12,
            placed: 9,
        };
        assert_eq!(err.to_string(), "Generation starved: placed 9 of 12 rooms");

        let err = LabyrinthError::InvalidFootprint {
            origin: GridCell::new(2, -1),
        };
        assert_eq!(err.to_string(), "Invalid large room footprint at (2, -1)");
    }
}
