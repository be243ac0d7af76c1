//! # Game Module
//!
//! The gameplay layer that drives navigation every tick.
//!
//! Enemies pair a [`NavigationAgent`] with one behavior from a small closed
//! set. Each tick the behavior looks at a read-only [`WorldContext`], may pick
//! a new destination, and reports what it did as [`BehaviorEvent`]s. Room
//! lock state and floor progression live in [`rooms`] and [`floors`].

pub mod behaviors;
pub mod floors;
pub mod rooms;

pub use behaviors::*;
pub use floors::*;
pub use rooms::*;

use crate::generation::{EnemyKind, RoomId, SpawnPoint};
use crate::navigation::{
    AgentMode, AgentSettings, LineOfSight, MovementResult, NavNodeId, NavigationAgent, NavigationManager,
    ObstacleField,
};
use crate::utils::{GameRng, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an enemy within one floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(pub u32);

impl fmt::Display for EnemyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "enemy {}", self.0)
    }
}

/// Everything a behavior may look at during one tick.
#[derive(Debug)]
pub struct WorldContext<'a, S: LineOfSight = ObstacleField> {
    pub nav: &'a NavigationManager<S>,
    /// Where the player stands, if there is one
    pub player: Option<Vec2>,
    /// Seconds since the previous tick
    pub dt: f32,
}

impl<'a, S: LineOfSight> WorldContext<'a, S> {
    pub fn new(nav: &'a NavigationManager<S>, player: Option<Vec2>, dt: f32) -> Self {
        Self { nav, player, dt }
    }
}

/// Something a behavior did that the rest of the game may react to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BehaviorEvent {
    /// A new destination was handed to the agent
    Retargeted { target: Vec2, mode: AgentMode },
    /// A projectile left `origin` heading along `direction`
    Fired { origin: Vec2, direction: Vec2 },
    JumpStarted { from: Vec2, to: Vec2 },
    JumpLanded { at: Vec2 },
    /// A patrol waypoint was picked
    PatrolTarget { node: NavNodeId },
}

/// Result of ticking one enemy.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub movement: MovementResult,
    pub events: Vec<BehaviorEvent>,
}

/// The closed set of enemy behaviors.
#[derive(Debug, Clone)]
pub enum EnemyBehavior {
    Runner(RunnerBehavior),
    Shooter(ShooterBehavior),
    Jumper(JumperBehavior),
    Patroller(PatrollerBehavior),
}

impl EnemyBehavior {
    /// Default behavior for an enemy kind.
    pub fn for_kind(kind: EnemyKind, rng: &mut GameRng) -> Self {
        match kind {
            EnemyKind::Runner => EnemyBehavior::Runner(RunnerBehavior::default()),
            EnemyKind::Shooter => EnemyBehavior::Shooter(ShooterBehavior::default()),
            EnemyKind::Jumper => EnemyBehavior::Jumper(JumperBehavior::new(JumperSettings::default(), rng)),
            EnemyKind::Patroller => EnemyBehavior::Patroller(PatrollerBehavior::default()),
        }
    }

    pub fn kind(&self) -> EnemyKind {
        match self {
            EnemyBehavior::Runner(_) => EnemyKind::Runner,
            EnemyBehavior::Shooter(_) => EnemyKind::Shooter,
            EnemyBehavior::Jumper(_) => EnemyKind::Jumper,
            EnemyBehavior::Patroller(_) => EnemyKind::Patroller,
        }
    }

    /// Runs one tick of the behavior. Returns whether the agent should walk
    /// this tick; behaviors that move the body themselves return `false`.
    pub fn on_tick<S: LineOfSight>(
        &mut self,
        agent: &mut NavigationAgent,
        world: &WorldContext<'_, S>,
        rng: &mut GameRng,
        events: &mut Vec<BehaviorEvent>,
    ) -> bool {
        match self {
            EnemyBehavior::Runner(b) => b.on_tick(agent, world, events),
            EnemyBehavior::Shooter(b) => b.on_tick(agent, world, events),
            EnemyBehavior::Jumper(b) => b.on_tick(agent, world, rng, events),
            EnemyBehavior::Patroller(b) => b.on_tick(agent, world, rng, events),
        }
    }
}

/// An enemy: body, health and behavior.
#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: EnemyId,
    pub room: RoomId,
    pub agent: NavigationAgent,
    pub behavior: EnemyBehavior,
    pub health: u32,
    /// Dormant enemies do nothing until their room is entered
    pub active: bool,
}

impl Enemy {
    pub const DEFAULT_HEALTH: u32 = 3;

    pub fn new(id: EnemyId, room: RoomId, agent: NavigationAgent, behavior: EnemyBehavior) -> Self {
        Self {
            id,
            room,
            agent,
            behavior,
            health: Self::DEFAULT_HEALTH,
            active: false,
        }
    }

    /// A dormant enemy standing on its spawn point.
    pub fn from_spawn(id: EnemyId, spawn: &SpawnPoint, settings: AgentSettings, rng: &mut GameRng) -> Self {
        let agent = NavigationAgent::new(spawn.position, settings);
        Self::new(id, spawn.room, agent, EnemyBehavior::for_kind(spawn.kind, rng))
    }

    pub fn kind(&self) -> EnemyKind {
        self.behavior.kind()
    }

    pub fn position(&self) -> Vec2 {
        self.agent.position()
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Applies damage and reports whether this blow was fatal.
    pub fn take_damage(&mut self, amount: u32) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.health = self.health.saturating_sub(amount);
        if self.health == 0 {
            log::debug!("{} ({:?}) died", self.id, self.kind());
            self.agent.stop();
            return true;
        }
        false
    }

    /// Runs the behavior, then moves the agent if the behavior allows it.
    pub fn tick<S: LineOfSight>(&mut self, world: &WorldContext<'_, S>, rng: &mut GameRng) -> TickOutcome {
        let mut events = Vec::new();
        if !self.active || !self.is_alive() {
            return TickOutcome {
                movement: self.standing(),
                events,
            };
        }

        let walk = self.behavior.on_tick(&mut self.agent, world, rng, &mut events);
        let movement = if walk {
            self.agent.follow_path(world.dt, world.nav)
        } else {
            self.standing()
        };
        TickOutcome { movement, events }
    }

    fn standing(&self) -> MovementResult {
        MovementResult {
            position: self.agent.position(),
            is_walking: false,
            mode: self.agent.mode(),
        }
    }
}
