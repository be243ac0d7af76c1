//! # Obstacle Generation
//!
//! Rock patterns inside combat rooms and walls around every room.
//!
//! Rocks come from a fixed library of 9x5 patterns laid over the room. A
//! pattern is only used when enough of its open floor is connected, and may be
//! mirrored. Walls line the outer edges of each room and leave a gap at every
//! door.

use crate::generation::{DoorPlacement, DungeonLayout, GenerationConfig, Generator, Room};
use crate::navigation::{ObstacleField, ObstacleLayer};
use crate::utils::{Bounds, Direction, GameRng, GridMapping, Vec2};
use crate::{LabyrinthError, LabyrinthResult};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Pattern width in tiles.
pub const PATTERN_WIDTH: usize = 9;
/// Pattern height in tiles.
pub const PATTERN_HEIGHT: usize = 5;

/// A rock layout. Row 0 is the north edge of the room; `1` marks a rock.
pub type RockPattern = [[u8; PATTERN_WIDTH]; PATTERN_HEIGHT];

/// The rock pattern library.
pub const ROCK_PATTERNS: [RockPattern; 20] = [
    [
        [0, 0, 1, 1, 1, 1, 1, 0, 0],
        [0, 1, 0, 0, 0, 0, 0, 1, 0],
        [1, 0, 0, 0, 0, 0, 0, 0, 1],
        [0, 1, 0, 0, 0, 0, 0, 1, 0],
        [0, 0, 1, 1, 1, 1, 1, 0, 0],
    ],
    [
        [1, 1, 0, 0, 0, 0, 0, 1, 1],
        [1, 0, 0, 0, 0, 0, 0, 0, 1],
        [0, 0, 0, 0, 0, 0, 0, 0, 0],
        [1, 0, 0, 0, 0, 0, 0, 0, 1],
        [1, 1, 0, 0, 0, 0, 0, 1, 1],
    ],
    [
        [1, 0, 0, 0, 0, 0, 0, 0, 1],
        [1, 0, 0, 0, 0, 0, 0, 0, 1],
        [1, 0, 0, 0, 0, 0, 0, 0, 1],
        [1, 0, 0, 0, 0, 0, 0, 0, 1],
        [1, 0, 0, 0, 0, 0, 0, 0, 1],
    ],
    [
        [0, 0, 0, 0, 0, 0, 0, 0, 0],
        [1, 1, 1, 1, 1, 1, 1, 1, 1],
        [0, 0, 0, 0, 0, 0, 0, 0, 0],
        [1, 1, 1, 1, 1, 1, 1, 1, 1],
        [0, 0, 0, 0, 0, 0, 0, 0, 0],
    ],
    [
        [0, 0, 0, 0, 0, 0, 0, 0, 0],
        [0, 1, 1, 1, 1, 1, 1, 1, 0],
        [0, 1, 1, 1, 1, 1, 1, 1, 0],
        [0, 1, 1, 1, 1, 1, 1, 1, 0],
        [0, 0, 0, 0, 0, 0, 0, 0, 0],
    ],
    [
        [1, 0, 0, 0, 0, 0, 0, 0, 0],
        [0, 1, 0, 0, 0, 0, 0, 0, 0],
        [0, 0, 1, 0, 0, 0, 0, 0, 0],
        [0, 0, 0, 1, 0, 0, 0, 0, 0],
        [0, 0, 0, 0, 1, 0, 0, 0, 0],
    ],
    [
        [1, 0, 0, 0, 0, 0, 0, 0, 1],
        [0, 1, 0, 0, 0, 0, 0, 1, 0],
        [0, 0, 1, 0, 0, 0, 1, 0, 0],
        [0, 1, 0, 0, 0, 0, 0, 1, 0],
        [1, 0, 0, 0, 0, 0, 0, 0, 1],
    ],
    [
        [1, 1, 1, 0, 0, 0, 0, 0, 0],
        [1, 0, 0, 0, 0, 0, 0, 0, 0],
        [1, 0, 0, 0, 0, 0, 0, 0, 0],
        [1, 0, 0, 0, 0, 0, 0, 0, 0],
        [1, 1, 1, 0, 0, 0, 0, 0, 0],
    ],
    [
        [0, 0, 0, 0, 0, 0, 1, 1, 1],
        [0, 0, 0, 0, 0, 0, 0, 0, 1],
        [0, 0, 0, 0, 0, 0, 0, 0, 1],
        [0, 0, 0, 0, 0, 0, 0, 0, 1],
        [0, 0, 0, 0, 0, 0, 1, 1, 1],
    ],
    [
        [0, 1, 1, 1, 0, 1, 1, 1, 0],
        [1, 0, 0, 0, 1, 0, 0, 0, 1],
        [1, 0, 0, 0, 1, 0, 0, 0, 1],
        [1, 0, 0, 0, 1, 0, 0, 0, 1],
        [0, 1, 1, 1, 0, 1, 1, 1, 0],
    ],
    [
        [0, 0, 0, 1, 1, 1, 0, 0, 0],
        [0, 0, 0, 1, 1, 1, 0, 0, 0],
        [1, 1, 1, 1, 1, 1, 1, 1, 1],
        [0, 0, 0, 1, 1, 1, 0, 0, 0],
        [0, 0, 0, 1, 1, 1, 0, 0, 0],
    ],
    [
        [1, 0, 1, 0, 1, 0, 1, 0, 1],
        [0, 1, 0, 1, 0, 1, 0, 1, 0],
        [1, 0, 1, 0, 1, 0, 1, 0, 1],
        [0, 1, 0, 1, 0, 1, 0, 1, 0],
        [1, 0, 1, 0, 1, 0, 1, 0, 1],
    ],
    [
        [1, 1, 1, 1, 1, 1, 1, 1, 1],
        [1, 0, 0, 0, 0, 0, 0, 0, 1],
        [1, 0, 0, 0, 0, 0, 0, 0, 1],
        [1, 0, 0, 0, 0, 0, 0, 0, 1],
        [1, 1, 1, 1, 1, 1, 1, 1, 1],
    ],
    [
        [1, 0, 0, 1, 0, 0, 1, 0, 0],
        [0, 1, 0, 0, 1, 0, 0, 1, 0],
        [0, 0, 1, 0, 0, 1, 0, 0, 1],
        [0, 1, 0, 0, 1, 0, 0, 1, 0],
        [1, 0, 0, 1, 0, 0, 1, 0, 0],
    ],
    [
        [0, 0, 0, 0, 0, 0, 0, 0, 0],
        [0, 0, 0, 0, 0, 0, 0, 0, 0],
        [0, 1, 1, 1, 1, 1, 1, 1, 0],
        [1, 1, 1, 1, 1, 1, 1, 1, 1],
        [1, 1, 1, 1, 1, 1, 1, 1, 1],
    ],
    [
        [1, 1, 1, 1, 1, 1, 1, 1, 1],
        [1, 1, 1, 1, 1, 1, 1, 1, 1],
        [0, 1, 1, 1, 1, 1, 1, 1, 0],
        [0, 0, 0, 0, 0, 0, 0, 0, 0],
        [0, 0, 0, 0, 0, 0, 0, 0, 0],
    ],
    [
        [1, 1, 1, 1, 1, 1, 1, 1, 1],
        [1, 0, 0, 0, 0, 0, 0, 0, 0],
        [1, 0, 0, 0, 0, 0, 0, 0, 0],
        [1, 0, 0, 0, 0, 0, 0, 0, 0],
        [1, 1, 1, 1, 1, 1, 1, 1, 1],
    ],
    [
        [0, 0, 0, 0, 0, 0, 0, 0, 0],
        [1, 0, 0, 0, 0, 0, 0, 0, 1],
        [1, 0, 0, 0, 0, 0, 0, 0, 1],
        [1, 0, 0, 0, 0, 0, 0, 0, 1],
        [1, 1, 1, 1, 1, 1, 1, 1, 1],
    ],
    [
        [1, 1, 1, 1, 1, 1, 1, 1, 1],
        [1, 0, 0, 0, 0, 0, 0, 0, 1],
        [1, 0, 0, 0, 0, 0, 0, 0, 1],
        [1, 0, 0, 0, 0, 0, 0, 0, 1],
        [0, 0, 0, 0, 0, 0, 0, 0, 0],
    ],
    [
        [0, 1, 0, 0, 1, 0, 0, 1, 0],
        [1, 0, 0, 1, 0, 0, 1, 0, 1],
        [0, 0, 1, 0, 0, 1, 0, 0, 0],
        [1, 0, 0, 0, 1, 0, 0, 0, 1],
        [0, 1, 0, 1, 0, 1, 0, 1, 0],
    ],
];

/// Rock placement settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RockSettings {
    /// Whether combat rooms get rocks at all
    pub enabled: bool,
    /// Collision radius of one rock
    pub rock_radius: f32,
    /// World-space size of one pattern tile
    pub tile_size: f32,
    /// Horizontal and vertical squeeze applied to the pattern grid
    pub grid_shrink: Vec2,
    /// Rocks closer than this to the room edge are dropped
    pub wall_margin: f32,
    /// Half width of the lane kept clear in front of each door
    pub door_width: f32,
    /// How far into the room the door lane reaches
    pub door_depth: f32,
    /// Minimum share of the pattern that must be connected open floor
    pub min_open_ratio: f32,
    /// Extra draws allowed when a pattern is too closed
    pub max_pattern_rerolls: u32,
    /// Whether patterns may be flipped
    pub allow_mirroring: bool,
}

impl Default for RockSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            rock_radius: 0.45,
            tile_size: 1.2,
            grid_shrink: Vec2::new(0.82, 0.85),
            wall_margin: 0.4,
            door_width: 1.8,
            door_depth: 1.9,
            min_open_ratio: 0.4,
            max_pattern_rerolls: 5,
            allow_mirroring: true,
        }
    }
}

impl RockSettings {
    /// Settings that never place rocks.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> LabyrinthResult<()> {
        if self.rock_radius <= 0.0 || self.tile_size <= 0.0 {
            return Err(LabyrinthError::InvalidConfig(
                "rock_radius and tile_size must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_open_ratio) {
            return Err(LabyrinthError::InvalidConfig(format!(
                "min_open_ratio must be within [0, 1], got {}",
                self.min_open_ratio
            )));
        }
        if self.wall_margin < 0.0 || self.door_width < 0.0 || self.door_depth < 0.0 {
            return Err(LabyrinthError::InvalidConfig(
                "rock clearances cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Wall settings for room edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallSettings {
    /// Thickness of a wall, measured into the room
    pub thickness: f32,
    /// Width of the opening left at a door
    pub door_gap: f32,
}

impl Default for WallSettings {
    fn default() -> Self {
        Self {
            thickness: 0.5,
            door_gap: 2.0,
        }
    }
}

impl WallSettings {
    pub fn validate(&self) -> LabyrinthResult<()> {
        if self.thickness <= 0.0 || self.door_gap <= 0.0 {
            return Err(LabyrinthError::InvalidConfig(
                "wall thickness and door gap must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Share of the pattern's tiles that are open and connected to the first
/// open tile in reading order. A pattern with no open tile scores zero.
///
/// # Examples
///
/// ```
/// use labyrinth::{pattern_open_ratio, ROCK_PATTERNS};
///
/// // The ring leaves its centre connected to the corners through the gaps.
/// assert!(pattern_open_ratio(&ROCK_PATTERNS[1]) > 0.7);
/// ```
pub fn pattern_open_ratio(pattern: &RockPattern) -> f32 {
    let Some(start) = (0..PATTERN_HEIGHT)
        .flat_map(|y| (0..PATTERN_WIDTH).map(move |x| (x, y)))
        .find(|&(x, y)| pattern[y][x] == 0)
    else {
        return 0.0;
    };

    let mut visited = [[false; PATTERN_WIDTH]; PATTERN_HEIGHT];
    let mut queue = VecDeque::new();
    visited[start.1][start.0] = true;
    queue.push_back(start);
    let mut reachable = 0usize;

    while let Some((x, y)) = queue.pop_front() {
        reachable += 1;
        let steps = [
            (x + 1, y),
            (x.wrapping_sub(1), y),
            (x, y + 1),
            (x, y.wrapping_sub(1)),
        ];
        for (nx, ny) in steps {
            if nx >= PATTERN_WIDTH || ny >= PATTERN_HEIGHT {
                continue;
            }
            if visited[ny][nx] || pattern[ny][nx] == 1 {
                continue;
            }
            visited[ny][nx] = true;
            queue.push_back((nx, ny));
        }
    }

    reachable as f32 / (PATTERN_WIDTH * PATTERN_HEIGHT) as f32
}

/// Whether enough of the pattern stays walkable.
pub fn is_pattern_walkable(pattern: &RockPattern, min_open_ratio: f32) -> bool {
    pattern_open_ratio(pattern) >= min_open_ratio
}

/// Flips a pattern left-right and/or top-bottom.
pub fn mirror_pattern(pattern: &RockPattern, horizontal: bool, vertical: bool) -> RockPattern {
    let mut result = [[0; PATTERN_WIDTH]; PATTERN_HEIGHT];
    for (y, row) in result.iter_mut().enumerate() {
        for (x, tile) in row.iter_mut().enumerate() {
            let sy = if vertical { PATTERN_HEIGHT - 1 - y } else { y };
            let sx = if horizontal { PATTERN_WIDTH - 1 - x } else { x };
            *tile = pattern[sy][sx];
        }
    }
    result
}

/// Draws a pattern, re-rolling a bounded number of times while it is too closed.
pub fn choose_pattern(settings: &RockSettings, rng: &mut GameRng) -> RockPattern {
    let draw = |rng: &mut GameRng| {
        let index = rng.index(ROCK_PATTERNS.len()).unwrap_or(0);
        ROCK_PATTERNS[index]
    };

    let mut pattern = draw(rng);
    let mut rerolls = 0;
    while !is_pattern_walkable(&pattern, settings.min_open_ratio) && rerolls < settings.max_pattern_rerolls {
        pattern = draw(rng);
        rerolls += 1;
    }

    if settings.allow_mirroring {
        let horizontal = rng.chance(0.5);
        let vertical = rng.chance(0.5);
        pattern = mirror_pattern(&pattern, horizontal, vertical);
    }
    pattern
}

/// World positions of the rocks a pattern puts in `room`.
///
/// The pattern is centred on the room and stretched with it, so a 2x2 room
/// gets the same layout at twice the scale. Rocks in the wall margin or in
/// a lane in front of a door are dropped.
pub fn rock_positions(
    room: &Room,
    mapping: &GridMapping,
    pattern: &RockPattern,
    settings: &RockSettings,
) -> Vec<Vec2> {
    let bounds = room.bounds(mapping);
    let center = bounds.center();
    let half = bounds.half_extents();
    let scale = Vec2::new(
        half.x / (mapping.spacing.x * 0.5),
        half.y / (mapping.spacing.y * 0.5),
    );
    let step = Vec2::new(
        settings.tile_size * settings.grid_shrink.x * scale.x,
        settings.tile_size * settings.grid_shrink.y * scale.y,
    );
    let mid_x = (PATTERN_WIDTH - 1) as f32 / 2.0;
    let mid_y = (PATTERN_HEIGHT - 1) as f32 / 2.0;

    let mut rocks = Vec::new();
    for (y, row) in pattern.iter().enumerate() {
        for (x, &tile) in row.iter().enumerate() {
            if tile == 0 {
                continue;
            }
            let offset = Vec2::new(
                (x as f32 - mid_x) * step.x,
                (mid_y - y as f32) * step.y,
            );
            if offset.x.abs() > half.x - settings.wall_margin
                || offset.y.abs() > half.y - settings.wall_margin
            {
                continue;
            }

            let position = center + offset;
            if room
                .doors
                .iter()
                .any(|door| in_door_lane(door, position, mapping, settings))
            {
                continue;
            }
            rocks.push(position);
        }
    }
    rocks
}

fn in_door_lane(door: &DoorPlacement, point: Vec2, mapping: &GridMapping, settings: &RockSettings) -> bool {
    let outward = door.direction.to_vec2();
    let from_door = point - door.world_point(mapping);
    let depth = -from_door.dot(outward);
    let lateral = from_door.dot(outward.perpendicular()).abs();
    depth < settings.door_depth && lateral < settings.door_width
}

/// Wall rectangles along one edge of a cell, leaving a centred gap when the
/// edge has a door. Returns the walls and the doorway.
pub fn edge_walls(cell_bounds: &Bounds, direction: Direction, settings: &WallSettings, door: bool) -> (Vec<Bounds>, Option<Bounds>) {
    let (min, max) = (cell_bounds.min, cell_bounds.max);
    let t = settings.thickness;
    // The strip along the edge, inside the cell.
    let strip = match direction {
        Direction::North => Bounds::from_corners(Vec2::new(min.x, max.y - t), max),
        Direction::South => Bounds::from_corners(min, Vec2::new(max.x, min.y + t)),
        Direction::East => Bounds::from_corners(Vec2::new(max.x - t, min.y), max),
        Direction::West => Bounds::from_corners(min, Vec2::new(min.x + t, max.y)),
    };
    if !door {
        return (vec![strip], None);
    }

    let center = cell_bounds.center();
    let half_gap = settings.door_gap * 0.5;
    match direction {
        Direction::North | Direction::South => {
            let left = Bounds::from_corners(strip.min, Vec2::new(center.x - half_gap, strip.max.y));
            let right = Bounds::from_corners(Vec2::new(center.x + half_gap, strip.min.y), strip.max);
            let gap = Bounds::from_corners(
                Vec2::new(center.x - half_gap, strip.min.y),
                Vec2::new(center.x + half_gap, strip.max.y),
            );
            (vec![left, right], Some(gap))
        }
        Direction::East | Direction::West => {
            let lower = Bounds::from_corners(strip.min, Vec2::new(strip.max.x, center.y - half_gap));
            let upper = Bounds::from_corners(Vec2::new(strip.min.x, center.y + half_gap), strip.max);
            let gap = Bounds::from_corners(
                Vec2::new(strip.min.x, center.y - half_gap),
                Vec2::new(strip.max.x, center.y + half_gap),
            );
            (vec![lower, upper], Some(gap))
        }
    }
}

/// Builds the obstacle field of a layout: rocks in combat rooms, walls on
/// every outward room edge and a doorway marker in every door gap.
#[derive(Debug, Clone)]
pub struct ObstacleGenerator<'a> {
    layout: &'a DungeonLayout,
}

impl<'a> ObstacleGenerator<'a> {
    pub fn new(layout: &'a DungeonLayout) -> Self {
        Self { layout }
    }

    fn add_walls(&self, field: &mut ObstacleField, room: &Room, settings: &WallSettings) {
        let mapping = self.layout.mapping();
        for cell in room.cells() {
            let bounds = mapping.cell_bounds(cell);
            for direction in Direction::ALL {
                if room.contains(cell.step(direction)) {
                    continue;
                }
                let door = room
                    .doors
                    .iter()
                    .any(|d| d.cell == cell && d.direction == direction);
                let (walls, gap) = edge_walls(&bounds, direction, settings, door);
                for wall in walls {
                    field.add_rect(wall, ObstacleLayer::WALLS);
                }
                if let Some(gap) = gap {
                    field.add_rect(gap, ObstacleLayer::DOORS);
                }
            }
        }
    }
}

impl Generator<ObstacleField> for ObstacleGenerator<'_> {
    fn generate(&self, config: &GenerationConfig, rng: &mut GameRng) -> LabyrinthResult<ObstacleField> {
        config.rocks.validate()?;
        config.walls.validate()?;

        let mapping = self.layout.mapping();
        let mut field = ObstacleField::new();
        let mut rock_count = 0;

        for room in self.layout.rooms() {
            self.add_walls(&mut field, room, &config.walls);

            if !config.rocks.enabled || !room.room_type.is_combat_room() {
                continue;
            }
            let pattern = choose_pattern(&config.rocks, rng);
            for position in rock_positions(room, mapping, &pattern, &config.rocks) {
                field.add_circle(position, config.rocks.rock_radius, ObstacleLayer::ROCKS);
                rock_count += 1;
            }
        }

        log::debug!(
            "Placed {} rocks and {} wall segments",
            rock_count,
            field.count(ObstacleLayer::WALLS)
        );
        self.validate(&field, config)?;
        Ok(field)
    }

    fn validate(&self, field: &ObstacleField, _config: &GenerationConfig) -> LabyrinthResult<()> {
        let mapping = self.layout.mapping();
        for room in self.layout.rooms() {
            if room.room_type.is_combat_room() {
                continue;
            }
            let bounds = room.bounds(mapping);
            if field
                .circles()
                .iter()
                .any(|c| c.layer.contains(ObstacleLayer::ROCKS) && bounds.contains(c.center))
            {
                return Err(LabyrinthError::InvalidLayout(format!(
                    "{} is a {:?} room but has rocks",
                    room.id, room.room_type
                )));
            }
        }
        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "ObstacleGenerator"
    }
}
