//! # Navigation Module
//!
//! Waypoint navigation for agents moving through a generated floor.
//!
//! A [`NavigationGraph`] of world-space nodes is sampled over the walkable
//! parts of the floor. [`PathPlanner`] answers shortest-path queries on it
//! with A*, and [`NavigationAgent`] turns those paths into per-tick movement,
//! merging replans into the path it already follows and cutting corners
//! whenever line of sight allows.
//!
//! Everything is owned by a [`NavigationManager`]. A manager only exists once
//! its graph has been built and checked, so holding one means queries are
//! legal.

pub mod agent;
pub mod astar;
pub mod graph;
pub mod path;
pub mod sight;

pub use agent::*;
pub use astar::*;
pub use graph::*;
pub use path::*;
pub use sight::*;

use crate::generation::DungeonLayout;
use crate::utils::{Bounds, GameRng, Vec2};
use crate::{LabyrinthError, LabyrinthResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a node in its [`NavigationGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NavNodeId(pub usize);

impl fmt::Display for NavNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A waypoint and its outgoing connections.
///
/// Search scores are not stored here; every query keeps its own table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavNode {
    pub id: NavNodeId,
    pub position: Vec2,
    pub connections: Vec<NavNodeId>,
}

impl NavNode {
    pub fn new(id: NavNodeId, position: Vec2) -> Self {
        Self {
            id,
            position,
            connections: Vec::new(),
        }
    }
}

/// Settings for sampling and searching the navigation graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Distance between neighbouring sample points
    pub node_spacing: f32,
    /// Points whose circle of this radius touches an obstacle are dropped
    pub node_radius: f32,
    /// Connect diagonal neighbours as well as orthogonal ones
    pub connect_diagonals: bool,
    /// Only connect nodes that can see each other
    pub check_connection_sight: bool,
    /// Upper bound on A* expansions per query
    pub max_expansions: usize,
    /// Obstacle layers that block nodes and connections
    pub layers: ObstacleLayer,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            node_spacing: 1.0,
            node_radius: 0.4,
            connect_diagonals: true,
            check_connection_sight: true,
            max_expansions: crate::config::DEFAULT_MAX_EXPANSIONS,
            layers: ObstacleLayer::SOLID,
        }
    }
}

impl NavigationConfig {
    /// A coarse graph that is quick to build in tests.
    pub fn for_testing() -> Self {
        Self {
            node_spacing: 2.0,
            node_radius: 0.2,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> LabyrinthResult<()> {
        if self.node_spacing <= 0.0 {
            return Err(LabyrinthError::InvalidConfig(format!(
                "node_spacing must be positive, got {}",
                self.node_spacing
            )));
        }
        if self.node_radius < 0.0 {
            return Err(LabyrinthError::InvalidConfig(
                "node_radius cannot be negative".to_string(),
            ));
        }
        if self.max_expansions == 0 {
            return Err(LabyrinthError::InvalidConfig(
                "max_expansions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A built navigation graph together with the world it was built against.
///
/// Construct one with [`NavigationManager::build`],
/// [`NavigationManager::for_layout`] or [`NavigationManager::from_graph`];
/// each returns only after the graph is complete and consistent.
#[derive(Debug, Clone)]
pub struct NavigationManager<S: LineOfSight = ObstacleField> {
    graph: NavigationGraph,
    planner: PathPlanner,
    sight: S,
}

impl<S: LineOfSight> NavigationManager<S> {
    /// Samples a graph over `regions` and wraps it.
    ///
    /// # Examples
    ///
    /// ```
    /// use labyrinth::{Bounds, NavigationConfig, NavigationManager, OpenSight, Vec2};
    ///
    /// let room = Bounds::from_center(Vec2::ZERO, Vec2::new(3.0, 3.0));
    /// let nav = NavigationManager::build(&NavigationConfig::default(), &[room], OpenSight).unwrap();
    /// assert_eq!(nav.graph().len(), 36);
    /// ```
    pub fn build(config: &NavigationConfig, regions: &[Bounds], sight: S) -> LabyrinthResult<Self> {
        config.validate()?;
        let graph = NodeGraphBuilder::from_config(config).build(regions, &sight);
        if graph.is_empty() {
            return Err(LabyrinthError::InvalidGraph(
                "sampling produced no walkable nodes".to_string(),
            ));
        }
        log::info!(
            "Built navigation graph with {} nodes and {} connections",
            graph.len(),
            graph.connection_count()
        );
        Self::from_graph(graph, sight, config)
    }

    /// Wraps an existing graph after checking its connections.
    pub fn from_graph(graph: NavigationGraph, sight: S, config: &NavigationConfig) -> LabyrinthResult<Self> {
        config.validate()?;
        graph.validate()?;
        Ok(Self {
            graph,
            planner: PathPlanner::new(config.max_expansions),
            sight,
        })
    }

    pub fn graph(&self) -> &NavigationGraph {
        &self.graph
    }

    pub fn planner(&self) -> &PathPlanner {
        &self.planner
    }

    pub fn sight(&self) -> &S {
        &self.sight
    }

    /// The node closest to `position`.
    pub fn find_nearest_node(&self, position: Vec2) -> LabyrinthResult<NavNodeId> {
        self.graph.find_nearest_node(position)
    }

    /// A uniformly random node, for idle wandering.
    pub fn get_random_node(&self, rng: &mut GameRng) -> Option<NavNodeId> {
        self.graph.random_node(rng)
    }

    pub fn generate_path(
        &self,
        start: NavNodeId,
        goal: NavNodeId,
        skip_first_node: bool,
    ) -> LabyrinthResult<NavigationPath> {
        self.planner.generate_path(&self.graph, start, goal, skip_first_node)
    }

    /// Path between the nodes nearest to two world points.
    pub fn path_between(&self, from: Vec2, to: Vec2) -> LabyrinthResult<NavigationPath> {
        let start = self.find_nearest_node(from)?;
        let goal = self.find_nearest_node(to)?;
        self.generate_path(start, goal, false)
    }
}

impl NavigationManager<ObstacleField> {
    /// Samples a graph over every room cell of a generated floor.
    pub fn for_layout(
        layout: &DungeonLayout,
        obstacles: ObstacleField,
        config: &NavigationConfig,
    ) -> LabyrinthResult<Self> {
        let mapping = layout.mapping();
        let regions: Vec<Bounds> = layout
            .occupied_cells()
            .map(|cell| mapping.cell_bounds(cell))
            .collect();
        Self::build(config, &regions, obstacles)
    }
}
