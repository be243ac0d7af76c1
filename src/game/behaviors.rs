//! # Enemy Behaviors
//!
//! The four regular enemy behaviors. Each one only talks to the world through
//! its [`NavigationAgent`] and the [`WorldContext`] it is handed.

use super::{BehaviorEvent, WorldContext};
use crate::navigation::{LineOfSight, NavNodeId, NavigationAgent};
use crate::utils::{GameRng, Vec2};
use serde::{Deserialize, Serialize};

/// Chases the player, re-targeting every `tick_rate` seconds. The first
/// tick after waking always re-targets.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerBehavior {
    pub tick_rate: f32,
    elapsed: f32,
}

impl Default for RunnerBehavior {
    fn default() -> Self {
        Self::new(0.2)
    }
}

impl RunnerBehavior {
    pub fn new(tick_rate: f32) -> Self {
        Self {
            tick_rate,
            elapsed: tick_rate,
        }
    }

    pub fn on_tick<S: LineOfSight>(
        &mut self,
        agent: &mut NavigationAgent,
        world: &WorldContext<'_, S>,
        events: &mut Vec<BehaviorEvent>,
    ) -> bool {
        if let Some(player) = world.player {
            if self.elapsed >= self.tick_rate {
                let mode = agent.set_destination(player, world.nav);
                events.push(BehaviorEvent::Retargeted { target: player, mode });
                self.elapsed = 0.0;
            }
        }
        self.elapsed += world.dt;
        true
    }
}

/// Closes in until it has a clear shot, then holds still and fires on a
/// cooldown.
#[derive(Debug, Clone, PartialEq)]
pub struct ShooterBehavior {
    pub tick_rate: f32,
    /// Seconds between shots
    pub cooldown: f32,
    /// The player is ignored beyond this distance
    pub sight_range: f32,
    elapsed: f32,
    charge: f32,
}

impl Default for ShooterBehavior {
    fn default() -> Self {
        Self {
            tick_rate: 0.2,
            cooldown: 1.5,
            sight_range: 12.0,
            // Act on the first tick after waking.
            elapsed: 0.2,
            charge: 0.0,
        }
    }
}

impl ShooterBehavior {
    /// Whether the shooter has a clear shot at `player`.
    pub fn has_shot<S: LineOfSight>(&self, agent: &NavigationAgent, player: Vec2, world: &WorldContext<'_, S>) -> bool {
        let origin = agent.position();
        origin.distance(player) <= self.sight_range
            && world.nav.sight().can_see(origin, player, agent.settings().layers)
    }

    pub fn on_tick<S: LineOfSight>(
        &mut self,
        agent: &mut NavigationAgent,
        world: &WorldContext<'_, S>,
        events: &mut Vec<BehaviorEvent>,
    ) -> bool {
        if let Some(player) = world.player {
            if self.elapsed >= self.tick_rate {
                if self.has_shot(agent, player, world) {
                    agent.stop();
                    if self.charge >= self.cooldown {
                        let origin = agent.position();
                        events.push(BehaviorEvent::Fired {
                            origin,
                            direction: (player - origin).normalized(),
                        });
                        self.charge = 0.0;
                    }
                    self.charge += self.tick_rate;
                } else {
                    let mode = agent.set_destination(player, world.nav);
                    events.push(BehaviorEvent::Retargeted { target: player, mode });
                }
                self.elapsed = 0.0;
            }
        }
        self.elapsed += world.dt;
        true
    }
}

/// Jump tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumperSettings {
    /// Seconds a jump takes from take-off to landing
    pub jump_duration: f32,
    pub max_jump_distance: f32,
    /// Chance of picking a landing spot weighted towards the player
    pub player_bias: f32,
    /// Wait between jumps is drawn uniformly from this range
    pub cooldown_range: (f32, f32),
}

impl Default for JumperSettings {
    fn default() -> Self {
        Self {
            jump_duration: 0.3,
            max_jump_distance: 5.0,
            player_bias: 0.1,
            cooldown_range: (0.5, 1.5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum JumpState {
    Waiting { elapsed: f32, cooldown: f32 },
    Jumping { from: Vec2, to: Vec2, elapsed: f32 },
}

/// Hops between visible waypoints instead of walking.
#[derive(Debug, Clone, PartialEq)]
pub struct JumperBehavior {
    pub settings: JumperSettings,
    state: JumpState,
}

impl JumperBehavior {
    pub fn new(settings: JumperSettings, rng: &mut GameRng) -> Self {
        let cooldown = rng.range_f32(settings.cooldown_range.0, settings.cooldown_range.1);
        Self {
            settings,
            state: JumpState::Waiting { elapsed: 0.0, cooldown },
        }
    }

    pub fn is_jumping(&self) -> bool {
        matches!(self.state, JumpState::Jumping { .. })
    }

    /// Picks a landing node in range and in sight of the agent.
    pub fn pick_landing<S: LineOfSight>(
        &self,
        agent: &NavigationAgent,
        world: &WorldContext<'_, S>,
        rng: &mut GameRng,
    ) -> Option<Vec2> {
        let origin = agent.position();
        let layers = agent.settings().layers;
        let candidates: Vec<Vec2> = world
            .nav
            .graph()
            .nodes()
            .iter()
            .map(|n| n.position)
            .filter(|p| p.distance(origin) <= self.settings.max_jump_distance)
            .filter(|p| world.nav.sight().can_see(origin, *p, layers))
            .collect();

        match world.player {
            Some(player) if rng.value() < self.settings.player_bias => rng
                .choose_weighted(&candidates, |p| 1.0 / (p.distance(player) + 0.1))
                .copied(),
            _ => rng.index(candidates.len()).map(|i| candidates[i]),
        }
    }

    pub fn on_tick<S: LineOfSight>(
        &mut self,
        agent: &mut NavigationAgent,
        world: &WorldContext<'_, S>,
        rng: &mut GameRng,
        events: &mut Vec<BehaviorEvent>,
    ) -> bool {
        match self.state {
            JumpState::Jumping { from, to, elapsed } => {
                let elapsed = elapsed + world.dt;
                let t = if self.settings.jump_duration > 0.0 {
                    elapsed / self.settings.jump_duration
                } else {
                    1.0
                };
                if t >= 1.0 {
                    agent.teleport(to);
                    agent.stop();
                    events.push(BehaviorEvent::JumpLanded { at: to });
                    let (min, max) = self.settings.cooldown_range;
                    self.state = JumpState::Waiting {
                        elapsed: 0.0,
                        cooldown: rng.range_f32(min, max),
                    };
                } else {
                    agent.teleport(from.lerp(to, t));
                    self.state = JumpState::Jumping { from, to, elapsed };
                }
            }
            JumpState::Waiting { elapsed, cooldown } => {
                let elapsed = elapsed + world.dt;
                self.state = JumpState::Waiting { elapsed, cooldown };
                if elapsed >= cooldown {
                    if let Some(to) = self.pick_landing(agent, world, rng) {
                        let from = agent.position();
                        events.push(BehaviorEvent::JumpStarted { from, to });
                        self.state = JumpState::Jumping { from, to, elapsed: 0.0 };
                    }
                }
            }
        }
        false
    }
}

/// Wanders between random waypoints.
#[derive(Debug, Clone, PartialEq)]
pub struct PatrollerBehavior {
    /// How close counts as having reached a waypoint
    pub arrival_distance: f32,
    waypoint: Option<NavNodeId>,
}

impl Default for PatrollerBehavior {
    fn default() -> Self {
        Self {
            arrival_distance: 0.5,
            waypoint: None,
        }
    }
}

impl PatrollerBehavior {
    pub fn waypoint(&self) -> Option<NavNodeId> {
        self.waypoint
    }

    pub fn on_tick<S: LineOfSight>(
        &mut self,
        agent: &mut NavigationAgent,
        world: &WorldContext<'_, S>,
        rng: &mut GameRng,
        events: &mut Vec<BehaviorEvent>,
    ) -> bool {
        let arrived = self
            .waypoint
            .and_then(|id| world.nav.graph().position(id))
            .map_or(true, |p| p.distance(agent.position()) < self.arrival_distance);
        if arrived {
            if let Some(node) = world.nav.get_random_node(rng) {
                if let Some(position) = world.nav.graph().position(node) {
                    agent.set_destination(position, world.nav);
                    events.push(BehaviorEvent::PatrolTarget { node });
                    self.waypoint = Some(node);
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::{AgentMode, AgentSettings, NavigationConfig, NavigationManager, ObstacleField, ObstacleLayer, OpenSight};
    use crate::utils::Bounds;

    fn open_floor() -> NavigationManager<OpenSight> {
        let region = Bounds::from_corners(Vec2::new(-6.0, -4.0), Vec2::new(6.0, 4.0));
        NavigationManager::build(&NavigationConfig::default(), &[region], OpenSight).unwrap()
    }

    /// An open floor with a wall between x=-0.2 and x=0.2 below y=2.
    fn walled_floor() -> NavigationManager<ObstacleField> {
        let mut field = ObstacleField::new();
        field.add_rect(
            Bounds::from_corners(Vec2::new(-0.2, -4.0), Vec2::new(0.2, 2.0)),
            ObstacleLayer::WALLS,
        );
        let region = Bounds::from_corners(Vec2::new(-6.0, -4.0), Vec2::new(6.0, 4.0));
        let config = NavigationConfig {
            node_radius: 0.1,
            ..NavigationConfig::default()
        };
        NavigationManager::build(&config, &[region], field).unwrap()
    }

    fn agent_at(x: f32, y: f32) -> NavigationAgent {
        NavigationAgent::new(Vec2::new(x, y), AgentSettings::default())
    }

    #[test]
    fn test_runner_retargets_on_tick_rate() {
        let nav = open_floor();
        let mut runner = RunnerBehavior::default();
        let mut agent = agent_at(-4.0, 0.0);
        let mut events = Vec::new();

        let world = WorldContext::new(&nav, Some(Vec2::new(4.0, 0.0)), 0.1);
        let retarget = BehaviorEvent::Retargeted {
            target: Vec2::new(4.0, 0.0),
            mode: AgentMode::Direct,
        };

        // Freshly woken runners pick up the player straight away.
        runner.on_tick(&mut agent, &world, &mut events);
        assert_eq!(events, vec![retarget]);
        assert_eq!(agent.target(), Vec2::new(4.0, 0.0));

        runner.on_tick(&mut agent, &world, &mut events);
        assert_eq!(events.len(), 1);
        runner.on_tick(&mut agent, &world, &mut events);
        assert_eq!(events, vec![retarget, retarget]);
    }

    #[test]
    fn test_runner_without_player_does_nothing() {
        let nav = open_floor();
        let mut runner = RunnerBehavior::default();
        let mut agent = agent_at(0.0, 0.0);
        let mut events = Vec::new();
        let world = WorldContext::new(&nav, None, 1.0);
        for _ in 0..3 {
            runner.on_tick(&mut agent, &world, &mut events);
        }
        assert!(events.is_empty());
    }

    #[test]
    fn test_shooter_holds_and_fires_with_clear_shot() {
        let nav = open_floor();
        let mut shooter = ShooterBehavior::default();
        let mut agent = agent_at(-4.0, 0.0);
        let player = Vec2::new(4.0, 0.0);
        let world = WorldContext::new(&nav, Some(player), 0.2);

        let mut events = Vec::new();
        for _ in 0..12 {
            shooter.on_tick(&mut agent, &world, &mut events);
        }
        let shots: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, BehaviorEvent::Fired { .. }))
            .collect();
        assert_eq!(shots.len(), 1);
        assert_eq!(
            shots[0],
            &BehaviorEvent::Fired {
                origin: Vec2::new(-4.0, 0.0),
                direction: Vec2::new(1.0, 0.0)
            }
        );
        assert_eq!(agent.target(), agent.position());
    }

    #[test]
    fn test_shooter_chases_without_shot() {
        let nav = walled_floor();
        let mut shooter = ShooterBehavior::default();
        let mut agent = agent_at(-3.0, -2.0);
        let world = WorldContext::new(&nav, Some(Vec2::new(3.0, -2.0)), 0.2);
        let mut events = Vec::new();
        shooter.on_tick(&mut agent, &world, &mut events);

        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            BehaviorEvent::Retargeted {
                mode: AgentMode::Pathing,
                ..
            }
        ));
    }

    #[test]
    fn test_jumper_lands_on_visible_node() {
        let nav = walled_floor();
        let mut rng = GameRng::new(11);
        let settings = JumperSettings {
            cooldown_range: (0.1, 0.1),
            ..JumperSettings::default()
        };
        let mut jumper = JumperBehavior::new(settings, &mut rng);
        let mut agent = agent_at(-2.5, -1.5);
        let world = WorldContext::new(&nav, Some(Vec2::new(3.0, 0.0)), 0.1);

        let mut events = Vec::new();
        for _ in 0..10 {
            assert!(!jumper.on_tick(&mut agent, &world, &mut rng, &mut events));
        }

        let Some(BehaviorEvent::JumpStarted { from, to }) = events.first().copied() else {
            panic!("expected a jump, got {events:?}");
        };
        assert_eq!(from, Vec2::new(-2.5, -1.5));
        assert!(from.distance(to) <= 5.0);
        assert!(nav.sight().can_see(from, to, ObstacleLayer::SOLID));
        assert!(events.contains(&BehaviorEvent::JumpLanded { at: to }));
    }

    #[test]
    fn test_jumper_interpolates_mid_jump() {
        let nav = open_floor();
        let mut rng = GameRng::new(3);
        let settings = JumperSettings {
            cooldown_range: (0.0, 0.0),
            jump_duration: 1.0,
            ..JumperSettings::default()
        };
        let mut jumper = JumperBehavior::new(settings, &mut rng);
        let mut agent = agent_at(0.5, 0.5);
        let world = WorldContext::new(&nav, None, 0.5);
        let mut events = Vec::new();

        jumper.on_tick(&mut agent, &world, &mut rng, &mut events);
        assert!(jumper.is_jumping());
        let Some(BehaviorEvent::JumpStarted { from, to }) = events.first().copied() else {
            panic!("expected a jump");
        };
        jumper.on_tick(&mut agent, &world, &mut rng, &mut events);
        assert!(agent.position().distance(from.lerp(to, 0.5)) < 1e-4);
        jumper.on_tick(&mut agent, &world, &mut rng, &mut events);
        assert!(!jumper.is_jumping());
        assert_eq!(agent.position(), to);
    }

    #[test]
    fn test_patroller_picks_new_waypoint_on_arrival() {
        let nav = open_floor();
        let mut rng = GameRng::new(8);
        let mut patroller = PatrollerBehavior::default();
        let mut agent = agent_at(0.0, 0.0);
        let world = WorldContext::new(&nav, None, 0.1);
        let mut events = Vec::new();

        patroller.on_tick(&mut agent, &world, &mut rng, &mut events);
        let first = patroller.waypoint().unwrap();
        assert_eq!(events, vec![BehaviorEvent::PatrolTarget { node: first }]);

        // Standing on the waypoint triggers the next pick.
        agent.teleport(nav.graph().position(first).unwrap());
        patroller.on_tick(&mut agent, &world, &mut rng, &mut events);
        assert_eq!(events.len(), 2);
    }
}
