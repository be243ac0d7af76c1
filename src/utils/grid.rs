//! # Grid Utilities
//!
//! Integer room-grid coordinates, cardinal directions, grid/world mapping and
//! breadth-first traversal shared by generation and navigation.

use crate::utils::math::{Bounds, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// A slot on the dungeon's room grid. `y` grows northward.
///
/// # Examples
///
/// ```
/// use labyrinth::{Direction, GridCell};
///
/// let cell = GridCell::new(2, 3);
/// assert_eq!(cell.step(Direction::North), GridCell::new(2, 4));
/// assert_eq!(cell.neighbors().len(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
}

impl GridCell {
    /// Creates a new cell with the given coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the origin cell (0, 0).
    pub const fn origin() -> Self {
        Self::new(0, 0)
    }

    /// The neighbouring cell one step in `direction`.
    pub fn step(self, direction: Direction) -> GridCell {
        self + direction.delta()
    }

    /// The 4 cardinal neighbours in N, E, S, W order.
    pub fn neighbors(self) -> [GridCell; 4] {
        Direction::ALL.map(|d| self.step(d))
    }

    /// Calculates the Manhattan distance to another cell.
    pub fn manhattan_distance(self, other: GridCell) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }

    /// Whether the two cells share an edge.
    pub fn is_adjacent(self, other: GridCell) -> bool {
        self.manhattan_distance(other) == 1
    }

    /// The direction that leads from `self` to an adjacent `other`.
    pub fn direction_to(self, other: GridCell) -> Option<Direction> {
        Direction::from_delta(other - self)
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl std::ops::Add for GridCell {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for GridCell {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

/// Cardinal directions on the room grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// All directions in their canonical N, E, S, W order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Converts a direction to a cell delta.
    pub fn delta(self) -> GridCell {
        match self {
            Direction::North => GridCell::new(0, 1),
            Direction::East => GridCell::new(1, 0),
            Direction::South => GridCell::new(0, -1),
            Direction::West => GridCell::new(-1, 0),
        }
    }

    /// Converts a cell delta to a direction.
    ///
    /// Returns None if the delta isn't a single cardinal step.
    pub fn from_delta(delta: GridCell) -> Option<Direction> {
        match (delta.x, delta.y) {
            (0, 1) => Some(Direction::North),
            (1, 0) => Some(Direction::East),
            (0, -1) => Some(Direction::South),
            (-1, 0) => Some(Direction::West),
            _ => None,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// Unit world-space vector for this direction.
    pub fn to_vec2(self) -> Vec2 {
        let d = self.delta();
        Vec2::new(d.x as f32, d.y as f32)
    }

    /// Single-letter label used by maps and logs.
    pub fn label(self) -> char {
        match self {
            Direction::North => 'N',
            Direction::East => 'E',
            Direction::South => 'S',
            Direction::West => 'W',
        }
    }
}

/// Maps room-grid cells to world space.
///
/// A 1x1 room at `cell` is centred on `cell * spacing`; a 2x2 room anchored at
/// `origin` is centred half a cell further north-east.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridMapping {
    /// World-space size of one room cell
    pub spacing: Vec2,
}

impl GridMapping {
    pub fn new(spacing: Vec2) -> Self {
        Self { spacing }
    }

    /// World-space centre of a single cell.
    pub fn cell_center(&self, cell: GridCell) -> Vec2 {
        Vec2::new(cell.x as f32 * self.spacing.x, cell.y as f32 * self.spacing.y)
    }

    /// World-space bounds of a single cell.
    pub fn cell_bounds(&self, cell: GridCell) -> Bounds {
        Bounds::from_center(self.cell_center(cell), self.spacing * 0.5)
    }

    /// World-space centre of a 2x2 room anchored at `origin`.
    pub fn large_room_center(&self, origin: GridCell) -> Vec2 {
        self.cell_center(origin) + self.spacing * 0.5
    }

    /// World-space bounds of a 2x2 room anchored at `origin`.
    pub fn large_room_bounds(&self, origin: GridCell) -> Bounds {
        Bounds::from_center(self.large_room_center(origin), self.spacing)
    }

    /// The cell whose bounds contain `point`.
    pub fn cell_at(&self, point: Vec2) -> GridCell {
        GridCell::new(
            (point.x / self.spacing.x).round() as i32,
            (point.y / self.spacing.y).round() as i32,
        )
    }

    /// World point in the middle of the edge of `cell` facing `direction`.
    pub fn edge_midpoint(&self, cell: GridCell, direction: Direction) -> Vec2 {
        let d = direction.to_vec2();
        self.cell_center(cell) + Vec2::new(d.x * self.spacing.x * 0.5, d.y * self.spacing.y * 0.5)
    }
}

impl Default for GridMapping {
    fn default() -> Self {
        let (x, y) = crate::config::DEFAULT_ROOM_SPACING;
        Self::new(Vec2::new(x, y))
    }
}

/// Breadth-first distances from `start`.
///
/// `neighbors` yields the cells reachable in one step from a cell. The result
/// lists every reached cell with its distance, in visitation order, so ties
/// between equally distant cells resolve the same way on every run.
///
/// # Examples
///
/// ```
/// use labyrinth::{bfs_distances, GridCell};
/// use std::collections::HashSet;
///
/// let open: HashSet<_> = (0..4).map(|x| GridCell::new(x, 0)).collect();
/// let dist = bfs_distances(GridCell::origin(), |c| {
///     c.neighbors().into_iter().filter(|n| open.contains(n)).collect::<Vec<_>>()
/// });
/// assert_eq!(dist.last(), Some(&(GridCell::new(3, 0), 3)));
/// ```
pub fn bfs_distances<F, I>(start: GridCell, mut neighbors: F) -> Vec<(GridCell, u32)>
where
    F: FnMut(GridCell) -> I,
    I: IntoIterator<Item = GridCell>,
{
    let mut seen: HashMap<GridCell, u32> = HashMap::new();
    let mut order = Vec::new();
    let mut queue = VecDeque::new();

    seen.insert(start, 0);
    queue.push_back(start);

    while let Some(cell) = queue.pop_front() {
        let dist = seen[&cell];
        order.push((cell, dist));
        for next in neighbors(cell) {
            if !seen.contains_key(&next) {
                seen.insert(next, dist + 1);
                queue.push_back(next);
            }
        }
    }

    order
}
