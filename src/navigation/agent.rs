//! # Navigation Agents
//!
//! Per-tick movement for anything that walks the navigation graph.
//!
//! An agent is either moving straight at its target ([`AgentMode::Direct`])
//! or following a planned path ([`AgentMode::Pathing`]). Callers pick a
//! target with [`NavigationAgent::set_destination`] and advance with
//! [`NavigationAgent::follow_path`] once per frame.

use super::{LineOfSight, NavNodeId, NavigationManager, NavigationPath, ObstacleLayer};
use crate::utils::Vec2;
use crate::{LabyrinthError, LabyrinthResult};
use serde::{Deserialize, Serialize};

/// How an agent is currently moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AgentMode {
    /// Straight at the target
    #[default]
    Direct,
    /// Along the held path
    Pathing,
}

/// Movement tuning for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// World units per second
    pub speed: f32,
    /// Targets further than this are never walked to directly
    pub max_sight_range: f32,
    /// Half the body width, used for clearance rays
    pub half_width: f32,
    /// Distance at which a waypoint counts as reached
    pub arrival_epsilon: f32,
    /// Seconds before a failed query may be repeated
    pub replan_backoff: f32,
    /// Layers that block sight and movement
    pub layers: ObstacleLayer,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            speed: crate::config::DEFAULT_AGENT_SPEED,
            max_sight_range: crate::config::DEFAULT_SIGHT_RANGE,
            half_width: 0.25,
            arrival_epsilon: crate::config::ARRIVAL_EPSILON,
            replan_backoff: 0.5,
            layers: ObstacleLayer::SOLID,
        }
    }
}

impl AgentSettings {
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn validate(&self) -> LabyrinthResult<()> {
        if self.speed <= 0.0 {
            return Err(LabyrinthError::InvalidConfig(format!(
                "agent speed must be positive, got {}",
                self.speed
            )));
        }
        if self.max_sight_range <= 0.0 || self.arrival_epsilon <= 0.0 {
            return Err(LabyrinthError::InvalidConfig(
                "sight range and arrival epsilon must be positive".to_string(),
            ));
        }
        if self.half_width < 0.0 || self.replan_backoff < 0.0 {
            return Err(LabyrinthError::InvalidConfig(
                "half_width and replan_backoff cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of one movement tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementResult {
    pub position: Vec2,
    pub is_walking: bool,
    pub mode: AgentMode,
}

/// A failed query and how long until it may be asked again.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Backoff {
    query: Option<(NavNodeId, NavNodeId)>,
    remaining: f32,
}

/// Position, target and path of one navigating entity.
#[derive(Debug, Clone)]
pub struct NavigationAgent {
    position: Vec2,
    target: Vec2,
    mode: AgentMode,
    path: NavigationPath,
    current_node: Option<NavNodeId>,
    last_visited: Option<NavNodeId>,
    backoff: Option<Backoff>,
    settings: AgentSettings,
}

impl NavigationAgent {
    pub fn new(position: Vec2, settings: AgentSettings) -> Self {
        Self {
            position,
            target: position,
            mode: AgentMode::Direct,
            path: NavigationPath::new(),
            current_node: None,
            last_visited: None,
            backoff: None,
            settings,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Moves the agent without walking, e.g. after a jump.
    pub fn teleport(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn target(&self) -> Vec2 {
        self.target
    }

    pub fn mode(&self) -> AgentMode {
        self.mode
    }

    pub fn path(&self) -> &NavigationPath {
        &self.path
    }

    pub fn current_node(&self) -> Option<NavNodeId> {
        self.current_node
    }

    pub fn last_visited(&self) -> Option<NavNodeId> {
        self.last_visited
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut AgentSettings {
        &mut self.settings
    }

    /// Whether a failed query is still cooling down.
    pub fn is_backing_off(&self) -> bool {
        self.backoff.is_some()
    }

    /// Drops the path and stands still.
    pub fn stop(&mut self) {
        self.path.clear();
        self.mode = AgentMode::Direct;
        self.target = self.position;
    }

    /// Whether `point` is in sight range and reachable in a straight line.
    pub fn can_reach_directly<S: LineOfSight>(&self, point: Vec2, nav: &NavigationManager<S>) -> bool {
        self.position.distance(point) < self.settings.max_sight_range
            && nav
                .sight()
                .has_clearance(self.position, point, self.settings.half_width, self.settings.layers)
    }

    /// Picks a new target and decides how to get there.
    ///
    /// Visible targets in range are approached directly. Anything else is
    /// planned on the graph, merged into the held path and trimmed to the
    /// furthest node already in view. Navigation failures leave the agent in
    /// direct mode and start a backoff for that query.
    pub fn set_destination<S: LineOfSight>(&mut self, target: Vec2, nav: &NavigationManager<S>) -> AgentMode {
        self.target = target;

        if self.can_reach_directly(target, nav) {
            self.path.clear();
            self.mode = AgentMode::Direct;
            return self.mode;
        }

        match self.plan(target, nav) {
            Ok(()) if !self.path.is_empty() => {
                self.mode = AgentMode::Pathing;
            }
            Ok(()) => {
                self.mode = AgentMode::Direct;
            }
            Err(err) if err.is_navigation_fallback() => {
                log::debug!("Falling back to direct movement towards {:?}: {}", target, err);
                self.path.clear();
                self.mode = AgentMode::Direct;
            }
            Err(err) => {
                log::warn!("Navigation query failed: {}", err);
                self.path.clear();
                self.mode = AgentMode::Direct;
            }
        }
        self.mode
    }

    fn plan<S: LineOfSight>(&mut self, target: Vec2, nav: &NavigationManager<S>) -> LabyrinthResult<()> {
        let (start, goal) = match (nav.find_nearest_node(self.position), nav.find_nearest_node(target)) {
            (Ok(start), Ok(goal)) => (start, goal),
            (Err(err), _) | (_, Err(err)) => {
                if self.backoff.is_none() {
                    log::warn!("No navigation node near the agent or its target");
                    self.start_backoff(None);
                }
                return Err(err);
            }
        };
        self.current_node = Some(start);

        if let Some(backoff) = self.backoff {
            if backoff.query.is_none() || backoff.query == Some((start, goal)) {
                return Err(LabyrinthError::PathNotFound { start, goal });
            }
        }

        let skip_first = self.last_visited == Some(start);
        let fresh = match nav.generate_path(start, goal, skip_first) {
            Ok(path) => path,
            Err(err) => {
                if err.is_navigation_fallback() {
                    self.start_backoff(Some((start, goal)));
                }
                return Err(err);
            }
        };
        self.backoff = None;

        if self.path.is_empty() {
            self.path = fresh;
        } else {
            self.path.merge_with(&fresh);
        }
        self.path.trim_to_furthest_visible(
            self.position,
            nav.sight(),
            self.settings.half_width,
            self.settings.layers,
        );
        Ok(())
    }

    fn start_backoff(&mut self, query: Option<(NavNodeId, NavNodeId)>) {
        self.backoff = Some(Backoff {
            query,
            remaining: self.settings.replan_backoff,
        });
    }

    fn tick_backoff(&mut self, dt: f32) {
        if let Some(backoff) = &mut self.backoff {
            backoff.remaining -= dt;
            if backoff.remaining <= 0.0 {
                self.backoff = None;
            }
        }
    }

    /// Advances the agent by one tick of `dt` seconds.
    ///
    /// A walking agent covers `speed * dt` per tick. Step distance left over
    /// after reaching a node carries on towards the next node, or towards the
    /// target once the path is used up.
    pub fn follow_path<S: LineOfSight>(&mut self, dt: f32, nav: &NavigationManager<S>) -> MovementResult {
        self.tick_backoff(dt);

        if self.mode == AgentMode::Pathing && self.path.is_empty() {
            self.set_destination(self.target, nav);
        }
        if self.mode == AgentMode::Pathing && self.can_reach_directly(self.target, nav) {
            self.path.clear();
            self.mode = AgentMode::Direct;
        }

        match self.mode {
            AgentMode::Pathing => self.step_along_path(dt, nav),
            AgentMode::Direct => self.step_direct(dt, nav),
        }
    }

    fn step_along_path<S: LineOfSight>(&mut self, dt: f32, nav: &NavigationManager<S>) -> MovementResult {
        let (half_width, layers) = (self.settings.half_width, self.settings.layers);

        let head_visible = self
            .path
            .front()
            .map(|head| nav.sight().has_clearance(self.position, head.position, half_width, layers))
            .unwrap_or(false);
        if !head_visible
            && self
                .path
                .skip_to_first_visible(self.position, nav.sight(), half_width, layers)
                .is_none()
        {
            // Stand still this tick; the empty path forces a replan on the next one.
            log::debug!("Path ahead of the agent is fully occluded; standing still this tick");
            self.path.clear();
            return self.result(false);
        }

        // Distance left to walk this tick. Reaching a node hands the rest to
        // the next node, or to the target once the path is done.
        let mut budget = self.settings.speed * dt;
        while let Some(head) = self.path.front().copied() {
            let distance = self.position.distance(head.position);
            if distance > budget {
                self.position = self.position.move_towards(head.position, budget);
                if self.position.distance(head.position) < self.settings.arrival_epsilon {
                    self.arrive_at(head.id, nav);
                }
                break;
            }

            self.position = head.position;
            budget -= distance;
            self.arrive_at(head.id, nav);
            if self.mode == AgentMode::Direct {
                self.position = self.position.move_towards(self.target, budget);
                break;
            }
            let next_visible = self
                .path
                .front()
                .map_or(false, |next| nav.sight().has_clearance(self.position, next.position, half_width, layers));
            if !next_visible {
                break;
            }
        }
        self.result(true)
    }

    /// Pops the reached head node and drops to direct mode when nothing is
    /// left to follow.
    fn arrive_at<S: LineOfSight>(&mut self, node: NavNodeId, nav: &NavigationManager<S>) {
        self.path.pop_front();
        self.current_node = Some(node);
        self.last_visited = Some(node);
        if self.path.is_empty() || self.can_reach_directly(self.target, nav) {
            self.path.clear();
            self.mode = AgentMode::Direct;
        }
    }

    fn step_direct<S: LineOfSight>(&mut self, dt: f32, nav: &NavigationManager<S>) -> MovementResult {
        let before = self.position;
        self.position = self.position.move_towards(self.target, self.settings.speed * dt);
        let moved = self.position != before;

        if moved && self.position.distance(self.target) < self.settings.arrival_epsilon {
            if let Ok(node) = nav.find_nearest_node(self.position) {
                self.current_node = Some(node);
                self.last_visited = Some(node);
            }
        }
        self.result(moved)
    }

    fn result(&self, is_walking: bool) -> MovementResult {
        MovementResult {
            position: self.position,
            is_walking,
            mode: self.mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::{NavigationConfig, NavigationGraph, ObstacleField, OpenSight};
    use crate::utils::Bounds;

    /// Two open areas joined by a gap in a wall at x=0 between y=2 and y=3.
    fn walled_world() -> NavigationManager<ObstacleField> {
        let mut field = ObstacleField::new();
        field.add_rect(
            Bounds::from_corners(Vec2::new(-0.2, -5.0), Vec2::new(0.2, 2.0)),
            ObstacleLayer::WALLS,
        );
        field.add_rect(
            Bounds::from_corners(Vec2::new(-0.2, 3.0), Vec2::new(0.2, 5.0)),
            ObstacleLayer::WALLS,
        );
        let region = Bounds::from_corners(Vec2::new(-4.0, -4.0), Vec2::new(4.0, 4.0));
        let config = NavigationConfig {
            node_radius: 0.1,
            ..NavigationConfig::default()
        };
        NavigationManager::build(&config, &[region], field).unwrap()
    }

    fn settings() -> AgentSettings {
        AgentSettings {
            half_width: 0.0,
            ..AgentSettings::default()
        }
    }

    fn run(agent: &mut NavigationAgent, nav: &NavigationManager<ObstacleField>, ticks: usize) -> Vec<MovementResult> {
        (0..ticks).map(|_| agent.follow_path(0.05, nav)).collect()
    }

    #[test]
    fn test_agent_settings_validation() {
        assert!(AgentSettings::default().validate().is_ok());
        assert!(AgentSettings::default().with_speed(0.0).validate().is_err());
    }

    #[test]
    fn test_visible_target_uses_direct_mode() {
        let nav = walled_world();
        let mut agent = NavigationAgent::new(Vec2::new(-3.0, -3.0), settings());
        assert_eq!(agent.set_destination(Vec2::new(-1.0, -1.0), &nav), AgentMode::Direct);
        assert!(agent.path().is_empty());

        let step = agent.follow_path(0.1, &nav);
        assert!(step.is_walking);
        assert!((step.position.distance(Vec2::new(-3.0, -3.0)) - 0.3).abs() < 1e-4);
    }

    #[test]
    fn test_direct_movement_does_not_overshoot() {
        let nav = walled_world();
        let mut agent = NavigationAgent::new(Vec2::new(-2.0, 0.0), settings());
        agent.set_destination(Vec2::new(-1.9, 0.0), &nav);
        let step = agent.follow_path(1.0, &nav);
        assert_eq!(step.position, Vec2::new(-1.9, 0.0));
        let idle = agent.follow_path(1.0, &nav);
        assert!(!idle.is_walking);
        assert!(agent.current_node().is_some());
    }

    #[test]
    fn test_occluded_target_plans_through_gap() {
        let nav = walled_world();
        let mut agent = NavigationAgent::new(Vec2::new(-2.5, -2.5), settings());
        let target = Vec2::new(2.5, -2.5);
        assert_eq!(agent.set_destination(target, &nav), AgentMode::Pathing);
        assert!(!agent.path().is_empty());

        let mut crossed_gap = false;
        for step in run(&mut agent, &nav, 400) {
            if step.position.x.abs() < 0.3 {
                assert!(step.position.y > 2.0 && step.position.y < 3.0);
                crossed_gap = true;
            }
        }
        assert!(crossed_gap);
        assert!(agent.position().distance(target) < 0.05);
        assert_eq!(agent.mode(), AgentMode::Direct);
    }

    #[test]
    fn test_out_of_range_target_is_planned() {
        let nav = NavigationManager::build(
            &NavigationConfig::default(),
            &[Bounds::from_corners(Vec2::ZERO, Vec2::new(20.0, 2.0))],
            OpenSight,
        )
        .unwrap();
        let mut agent = NavigationAgent::new(Vec2::new(0.5, 0.5), AgentSettings::default());
        assert_eq!(agent.set_destination(Vec2::new(19.5, 0.5), &nav), AgentMode::Pathing);
    }

    #[test]
    fn test_disconnected_graph_falls_back_with_backoff() {
        let mut graph = NavigationGraph::new();
        graph.add_node(Vec2::new(0.0, 0.0));
        graph.add_node(Vec2::new(30.0, 0.0));
        let nav = NavigationManager::from_graph(graph, OpenSight, &NavigationConfig::default()).unwrap();

        let mut agent = NavigationAgent::new(Vec2::ZERO, AgentSettings::default());
        assert_eq!(agent.set_destination(Vec2::new(30.0, 0.0), &nav), AgentMode::Direct);
        assert!(agent.is_backing_off());

        // Direct movement still makes progress while the backoff runs out.
        let step = agent.follow_path(0.25, &nav);
        assert!(step.is_walking);
        assert!(agent.is_backing_off());
        agent.follow_path(0.3, &nav);
        assert!(!agent.is_backing_off());
    }

    #[test]
    fn test_empty_graph_is_not_fatal() {
        let nav = NavigationManager::from_graph(NavigationGraph::new(), OpenSight, &NavigationConfig::default()).unwrap();
        let mut agent = NavigationAgent::new(Vec2::ZERO, AgentSettings::default());
        assert_eq!(agent.set_destination(Vec2::new(50.0, 0.0), &nav), AgentMode::Direct);
        let step = agent.follow_path(1.0, &nav);
        assert!(step.position.distance(Vec2::new(3.0, 0.0)) < 1e-4);
    }

    #[test]
    fn test_replan_merges_into_held_path() {
        let nav = walled_world();
        let mut agent = NavigationAgent::new(Vec2::new(-2.5, -2.5), settings());
        agent.set_destination(Vec2::new(2.5, -2.5), &nav);
        let before = agent.path().back().map(|n| n.id);

        agent.set_destination(Vec2::new(2.5, -1.5), &nav);
        assert_eq!(agent.mode(), AgentMode::Pathing);
        let after = agent.path().back().map(|n| n.id);
        assert_ne!(before, after);
        assert_eq!(after, nav.find_nearest_node(Vec2::new(2.5, -1.5)).ok());
    }

    #[test]
    fn test_reaching_a_node_keeps_the_rest_of_the_step() {
        // A bent corridor around two walls: neither c nor the target at
        // (3, 2) can be seen from the start, but c can be seen from b.
        let mut graph = NavigationGraph::new();
        let a = graph.add_node(Vec2::new(0.0, 0.0));
        let b = graph.add_node(Vec2::new(1.0, 0.0));
        let c = graph.add_node(Vec2::new(1.0, 2.0));
        let d = graph.add_node(Vec2::new(3.0, 2.0));
        for (x, y) in [(a, b), (b, c), (c, d)] {
            graph.connect_mutual(x, y).unwrap();
        }
        let mut field = ObstacleField::new();
        field.add_rect(
            Bounds::from_corners(Vec2::new(0.5, 0.3), Vec2::new(0.9, 3.0)),
            ObstacleLayer::WALLS,
        );
        field.add_rect(
            Bounds::from_corners(Vec2::new(1.3, -1.0), Vec2::new(2.8, 1.7)),
            ObstacleLayer::WALLS,
        );
        let nav = NavigationManager::from_graph(graph, field, &NavigationConfig::default()).unwrap();

        let mut agent = NavigationAgent::new(Vec2::new(0.4, 0.0), settings().with_speed(1.0));
        let target = Vec2::new(3.0, 2.0);
        assert_eq!(agent.set_destination(target, &nav), AgentMode::Pathing);
        assert_eq!(agent.path().front().map(|n| n.id), Some(b));

        // 0.6 to reach b, then 0.4 up the corridor towards c.
        let step = agent.follow_path(1.0, &nav);
        assert!(step.is_walking);
        assert!(step.position.distance(Vec2::new(1.0, 0.4)) < 1e-4);
        assert_eq!(agent.last_visited(), Some(b));
    }

    #[test]
    fn test_stop_clears_path() {
        let nav = walled_world();
        let mut agent = NavigationAgent::new(Vec2::new(-2.5, -2.5), settings());
        agent.set_destination(Vec2::new(2.5, -2.5), &nav);
        agent.stop();
        assert!(agent.path().is_empty());
        assert!(!agent.follow_path(0.1, &nav).is_walking);
    }
}
