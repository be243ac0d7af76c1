//! # Labyrinth Command Line Entry Point
//!
//! Generates a dungeon floor, prints it as an ASCII map or JSON, and can run
//! a short chase simulation to exercise the navigation core.

use clap::Parser;
use labyrinth::{
    AgentSettings, DungeonLayout, Enemy, EnemyBehavior, EnemyId, FloorPlan, GameRng, GenerationConfig,
    LabyrinthError, LabyrinthResult, NavigationAgent, NavigationConfig, RunnerBehavior, SpawnPoint,
    WorldContext,
};
use serde::Serialize;
#[cfg(feature = "dev-tools")]
use tracing::Level;

/// Seconds of simulated time per chase tick.
const SIMULATION_STEP: f32 = 0.1;

/// Command line arguments for the labyrinth generator.
#[derive(Parser, Debug)]
#[command(name = "labyrinth")]
#[command(about = "Procedural dungeon layouts and A* navigation for a 2D roguelike")]
#[command(version)]
struct Args {
    /// Random seed for dungeon generation
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of room cells to fill
    #[arg(short, long)]
    rooms: Option<u32>,

    /// Minimum BFS distance between the start and the boss room
    #[arg(long)]
    min_boss_distance: Option<u32>,

    /// Chance of trying a 2x2 room on each expansion
    #[arg(long)]
    large_room_probability: Option<f64>,

    /// JSON generation config; the flags above override its fields
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Floor of the run to generate, counting from 0
    #[arg(long, default_value_t = 0)]
    floor: u32,

    /// Print the floor as JSON instead of an ASCII map
    #[arg(long)]
    json: bool,

    /// Run a chase simulation for this many ticks
    #[arg(long)]
    simulate: Option<u32>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

/// What `--json` prints.
#[derive(Serialize)]
struct FloorReport<'a> {
    floor: u32,
    seed: u64,
    layout: &'a DungeonLayout,
    spawns: &'a [SpawnPoint],
}

fn main() -> LabyrinthResult<()> {
    let args = Args::parse();
    initialize_logging(&args.log_level);
    log::info!("Starting labyrinth v{}", labyrinth::VERSION);

    let config = load_config(&args)?;
    let plan = FloorPlan {
        starting_rooms: config.target_rooms,
        ..FloorPlan::new(config)
    };
    let floor = plan.build_floor(args.floor, &NavigationConfig::default())?;

    if args.json {
        let report = FloorReport {
            floor: floor.number,
            seed: floor.config.seed,
            layout: &floor.layout,
            spawns: &floor.spawns,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Floor {} (seed {})", floor.number, floor.config.seed);
        print!("{}", floor.layout.to_ascii());
        println!(
            "{} cells, {} rooms, {} enemies, {} navigation nodes",
            floor.layout.cell_count(),
            floor.layout.rooms().len(),
            floor.spawns.len(),
            floor.navigation.graph().len()
        );
        if let Some(shortfall) = floor.layout.shortfall() {
            println!("warning: {}", shortfall);
        }
    }

    if let Some(ticks) = args.simulate {
        simulate_chase(&floor, ticks)?;
    }
    Ok(())
}

/// Initializes logging: `tracing` with dev tools, `env_logger` otherwise.
fn initialize_logging(log_level: &str) {
    #[cfg(feature = "dev-tools")]
    {
        let level = match log_level.to_lowercase().as_str() {
            "error" => Level::ERROR,
            "warn" => Level::WARN,
            "info" => Level::INFO,
            "debug" => Level::DEBUG,
            "trace" => Level::TRACE,
            _ => Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .init();
    }

    #[cfg(not(feature = "dev-tools"))]
    {
        env_logger::Builder::new()
            .parse_filters(log_level)
            .format_timestamp(None)
            .init();
    }
}

/// Builds the generation config from the optional file plus flag overrides.
fn load_config(args: &Args) -> LabyrinthResult<GenerationConfig> {
    let mut config = match &args.config {
        Some(path) => GenerationConfig::from_json_file(path)?,
        None => GenerationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(rooms) = args.rooms {
        config.target_rooms = rooms;
    }
    if let Some(distance) = args.min_boss_distance {
        config.min_boss_distance = distance;
    }
    if let Some(probability) = args.large_room_probability {
        config.large_room_probability = probability;
    }
    config.validate()?;
    Ok(config)
}

/// Puts a runner in a room next to the start and lets it chase a player
/// standing in the start room.
fn simulate_chase(floor: &labyrinth::Floor, ticks: u32) -> LabyrinthResult<()> {
    let layout = &floor.layout;
    let start = layout.start_cell();
    let neighbour = layout
        .connected_neighbors(start)
        .into_iter()
        .find(|&cell| layout.get_room(cell).map(|r| r.id) != layout.get_room(start).map(|r| r.id))
        .ok_or_else(|| LabyrinthError::InvalidLayout("start room has no neighbouring room".to_string()))?;
    let room = layout
        .get_room(neighbour)
        .ok_or_else(|| LabyrinthError::InvalidLayout(format!("no room at {}", neighbour)))?;

    let player = layout.start_world_position();
    let spawn = layout.mapping().cell_center(neighbour);
    let agent = NavigationAgent::new(spawn, AgentSettings::default());
    let mut chaser = Enemy::new(
        EnemyId(0),
        room.id,
        agent,
        EnemyBehavior::Runner(RunnerBehavior::default()),
    );
    chaser.active = true;

    println!(
        "Chase: runner at ({:.2}, {:.2}) in {}, player at ({:.2}, {:.2})",
        spawn.x, spawn.y, room.id, player.x, player.y
    );

    let mut rng = GameRng::new(floor.config.seed);
    let world = WorldContext::new(&floor.navigation, Some(player), SIMULATION_STEP);
    for tick in 0..ticks {
        let outcome = chaser.tick(&world, &mut rng);
        let position = outcome.movement.position;
        println!(
            "tick {:>4}: ({:>7.2}, {:>7.2}) {:?}{}",
            tick,
            position.x,
            position.y,
            outcome.movement.mode,
            if outcome.movement.is_walking { "" } else { " (idle)" }
        );
        if position.distance(player) <= chaser.agent.settings().arrival_epsilon {
            println!("Runner reached the player after {} ticks", tick + 1);
            return Ok(());
        }
    }
    println!(
        "Runner is {:.2} units from the player after {} ticks",
        chaser.position().distance(player),
        ticks
    );
    Ok(())
}
