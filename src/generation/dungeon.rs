//! # Dungeon Generation
//!
//! Procedural dungeon layouts grown outward from a start cell on the room grid.
//!
//! The generator keeps a frontier of placed cells that may still sprout new
//! rooms. Each step picks a random frontier cell and tries the cardinal
//! directions in random order. A new cell may touch at most one occupied cell,
//! which keeps the room graph a tree. Every expansion may instead try a 2x2
//! room; when its footprint does not fit, a single room is placed.

use crate::generation::{
    large_room_cells, DoorMask, DoorPlacement, GenerationConfig, Generator, Room, RoomFootprint,
    RoomId, RoomType,
};
use crate::utils::{bfs_distances, Direction, GameRng, GridCell, GridMapping, Vec2};
use crate::{LabyrinthError, LabyrinthResult};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Frontier-growth dungeon generator.
///
/// Produces a connected [`DungeonLayout`] with a start room at the origin,
/// an optional boss room and door masks for every cell.
#[derive(Debug, Clone)]
pub struct DungeonGenerator {
    /// Directions the growth step may expand in
    pub directions: Vec<Direction>,
}

impl DungeonGenerator {
    /// Creates a generator that grows in all four directions.
    ///
    /// # Examples
    ///
    /// ```
    /// use labyrinth::{DungeonGenerator, GameRng, GenerationConfig, Generator};
    ///
    /// let config = GenerationConfig::for_testing(42);
    /// let mut rng = GameRng::new(config.seed);
    /// let layout = DungeonGenerator::new().generate(&config, &mut rng).unwrap();
    /// assert_eq!(layout.cell_count(), 12);
    /// ```
    pub fn new() -> Self {
        Self {
            directions: Direction::ALL.to_vec(),
        }
    }

    /// Creates a generator restricted to the given directions.
    pub fn with_directions(directions: Vec<Direction>) -> Self {
        Self { directions }
    }

    /// Runs the frontier growth and returns the placed rooms in placement order.
    fn grow(&self, config: &GenerationConfig, rng: &mut GameRng) -> Vec<(GridCell, RoomFootprint)> {
        let start = GridCell::origin();
        let mut growth = Growth::new(start);
        let mut frontier = vec![start];
        let mut placed = 1u32;

        while placed < config.target_rooms && !frontier.is_empty() {
            let Some(slot) = rng.index(frontier.len()) else {
                break;
            };
            let current = frontier[slot];

            let mut order = self.directions.clone();
            rng.shuffle(&mut order);

            let mut expanded = false;
            for direction in order {
                let next = current.step(direction);
                if growth.is_occupied(next) || growth.occupied_neighbors(next) > 1 {
                    continue;
                }

                if config.large_room_probability > 0.0 && rng.chance(config.large_room_probability) {
                    match growth.check_large_footprint(next) {
                        Ok(()) => {
                            growth.place(next, RoomFootprint::Large);
                            frontier.push(next);
                            placed += 4;
                            expanded = true;
                            break;
                        }
                        Err(err) => log::debug!("{}, placing a single room instead", err),
                    }
                }

                growth.place(next, RoomFootprint::Single);
                frontier.push(next);
                placed += 1;
                expanded = true;
                break;
            }

            if !expanded {
                frontier.remove(slot);
            }
        }

        growth.placements
    }
}

impl Default for DungeonGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator<DungeonLayout> for DungeonGenerator {
    fn generate(&self, config: &GenerationConfig, rng: &mut GameRng) -> LabyrinthResult<DungeonLayout> {
        config.validate()?;
        if self.directions.is_empty() {
            return Err(LabyrinthError::InvalidConfig(
                "dungeon generator has no growth directions".to_string(),
            ));
        }

        let placements = self.grow(config, rng);
        let mut layout = DungeonLayout::from_placements(
            config.seed,
            config.target_rooms,
            config.grid_mapping(),
            &placements,
        )?;

        match layout.assign_boss(config.min_boss_distance) {
            Some(boss) => log::debug!("Boss room at {}", boss),
            None => log::debug!(
                "No room is {} steps from the start, floor has no boss",
                config.min_boss_distance
            ),
        }
        layout.assign_treasure(config.treasure_rooms, rng);

        if let Some(shortfall) = layout.shortfall() {
            log::warn!("{}", shortfall);
        }
        log::info!(
            "Generated {} rooms covering {} cells (seed {})",
            layout.rooms().len(),
            layout.cell_count(),
            config.seed
        );

        self.validate(&layout, config)?;
        Ok(layout)
    }

    fn validate(&self, layout: &DungeonLayout, config: &GenerationConfig) -> LabyrinthResult<()> {
        super::utils::validate_layout(layout, config)
    }

    fn generator_type(&self) -> &'static str {
        "DungeonGenerator"
    }
}

/// Occupancy bookkeeping while the dungeon grows.
struct Growth {
    occupied: HashSet<GridCell>,
    placements: Vec<(GridCell, RoomFootprint)>,
}

impl Growth {
    fn new(start: GridCell) -> Self {
        let mut occupied = HashSet::new();
        occupied.insert(start);
        Self {
            occupied,
            placements: vec![(start, RoomFootprint::Single)],
        }
    }

    fn is_occupied(&self, cell: GridCell) -> bool {
        self.occupied.contains(&cell)
    }

    fn occupied_neighbors(&self, cell: GridCell) -> usize {
        cell.neighbors()
            .iter()
            .filter(|n| self.occupied.contains(*n))
            .count()
    }

    /// A 2x2 room fits when all four cells are free and the block as a whole
    /// touches at most one occupied cell.
    fn check_large_footprint(&self, origin: GridCell) -> LabyrinthResult<()> {
        let cells = large_room_cells(origin);
        if cells.iter().any(|c| self.occupied.contains(c)) {
            return Err(LabyrinthError::InvalidFootprint { origin });
        }

        let touching: HashSet<GridCell> = cells
            .iter()
            .flat_map(|c| c.neighbors())
            .filter(|n| !cells.contains(n) && self.occupied.contains(n))
            .collect();
        if touching.len() > 1 {
            return Err(LabyrinthError::InvalidFootprint { origin });
        }
        Ok(())
    }

    fn place(&mut self, origin: GridCell, footprint: RoomFootprint) {
        match footprint {
            RoomFootprint::Single => {
                self.occupied.insert(origin);
            }
            RoomFootprint::Large => self.occupied.extend(large_room_cells(origin)),
        }
        self.placements.push((origin, footprint));
    }
}

/// Per-cell state of a generated layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutCell {
    pub cell: GridCell,
    /// Room that owns this cell
    pub room: RoomId,
    pub role: RoomType,
    pub doors: DoorMask,
    /// BFS distance from the start cell, if reachable
    pub distance: Option<u32>,
}

/// A generated dungeon: rooms, per-cell roles and door masks.
///
/// Immutable once generation finishes. Door locking during play is an
/// overlay kept elsewhere and never changes the masks stored here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DungeonLayout {
    seed: u64,
    requested_rooms: u32,
    mapping: GridMapping,
    rooms: Vec<Room>,
    cells: Vec<LayoutCell>,
    #[serde(skip)]
    index: HashMap<GridCell, usize>,
}

impl DungeonLayout {
    /// Builds a layout from rooms given in placement order.
    ///
    /// The first placement is the start room and must be a single cell. Door
    /// masks and distances are computed; every other cell starts out Normal.
    ///
    /// # Examples
    ///
    /// ```
    /// use labyrinth::{Direction, DungeonLayout, GridCell, GridMapping, RoomFootprint};
    ///
    /// let layout = DungeonLayout::from_placements(
    ///     0,
    ///     2,
    ///     GridMapping::default(),
    ///     &[(GridCell::new(0, 0), RoomFootprint::Single), (GridCell::new(1, 0), RoomFootprint::Single)],
    /// )
    /// .unwrap();
    /// assert!(layout.door_mask(GridCell::new(0, 0)).has(Direction::East));
    /// ```
    pub fn from_placements(
        seed: u64,
        requested_rooms: u32,
        mapping: GridMapping,
        placements: &[(GridCell, RoomFootprint)],
    ) -> LabyrinthResult<Self> {
        let Some(&(start, start_footprint)) = placements.first() else {
            return Err(LabyrinthError::InvalidLayout("layout has no rooms".to_string()));
        };
        if start_footprint != RoomFootprint::Single {
            return Err(LabyrinthError::InvalidLayout(
                "the start room must be a single cell".to_string(),
            ));
        }

        let mut rooms = Vec::with_capacity(placements.len());
        let mut cells = Vec::new();
        let mut index = HashMap::new();

        for (i, &(origin, footprint)) in placements.iter().enumerate() {
            let id = RoomId(i as u32);
            let room = Room::new(id, origin, footprint, RoomType::Normal);
            for cell in room.cells() {
                if index.contains_key(&cell) {
                    return Err(match footprint {
                        RoomFootprint::Large => LabyrinthError::InvalidFootprint { origin },
                        RoomFootprint::Single => LabyrinthError::InvalidLayout(format!(
                            "cell {} is placed twice",
                            cell
                        )),
                    });
                }
                index.insert(cell, cells.len());
                cells.push(LayoutCell {
                    cell,
                    room: id,
                    role: RoomType::Normal,
                    doors: DoorMask::empty(),
                    distance: None,
                });
            }
            rooms.push(room);
        }

        let mut layout = Self {
            seed,
            requested_rooms,
            mapping,
            rooms,
            cells,
            index,
        };
        layout.compute_doors();
        layout.compute_distances();
        layout.set_role(start, RoomType::Start);
        Ok(layout)
    }

    fn compute_doors(&mut self) {
        for i in 0..self.cells.len() {
            let here = self.cells[i];
            let mut mask = DoorMask::empty();
            for direction in Direction::ALL {
                if let Some(&j) = self.index.get(&here.cell.step(direction)) {
                    // Seams inside a large room are open floor, not doors.
                    if self.cells[j].room != here.room {
                        mask |= DoorMask::from_direction(direction);
                    }
                }
            }
            self.cells[i].doors = mask;
        }

        let doors: Vec<Vec<DoorPlacement>> = self
            .rooms
            .iter()
            .map(|room| {
                room.cells()
                    .into_iter()
                    .flat_map(|cell| {
                        self.door_mask(cell)
                            .directions()
                            .map(move |d| DoorPlacement::new(cell, d))
                    })
                    .collect()
            })
            .collect();
        for (room, room_doors) in self.rooms.iter_mut().zip(doors) {
            room.doors = room_doors;
        }
    }

    fn compute_distances(&mut self) {
        let distances = bfs_distances(self.start_cell(), |c| self.connected_neighbors(c));
        for (cell, distance) in distances {
            if let Some(&i) = self.index.get(&cell) {
                self.cells[i].distance = Some(distance);
            }
        }
    }

    fn set_role(&mut self, cell: GridCell, role: RoomType) {
        if let Some(&i) = self.index.get(&cell) {
            self.cells[i].role = role;
            let room = self.cells[i].room;
            self.rooms[room.0 as usize].room_type = role;
        }
    }

    /// Marks the cell farthest from the start as the boss room when it is at
    /// least `min_distance` steps away. Ties go to the cell reached first.
    pub(crate) fn assign_boss(&mut self, min_distance: u32) -> Option<GridCell> {
        let start = self.start_cell();
        let mut farthest = (start, 0);
        for (cell, distance) in bfs_distances(start, |c| self.connected_neighbors(c)) {
            if distance > farthest.1 {
                farthest = (cell, distance);
            }
        }

        let (cell, distance) = farthest;
        if cell == start || distance < min_distance {
            return None;
        }
        self.set_role(cell, RoomType::Boss);
        Some(cell)
    }

    /// Marks up to `count` single Normal cells as treasure rooms, preferring
    /// dead ends. Returns how many were marked.
    pub(crate) fn assign_treasure(&mut self, count: u32, rng: &mut GameRng) -> usize {
        if count == 0 {
            return 0;
        }

        let (mut dead_ends, mut others): (Vec<GridCell>, Vec<GridCell>) = self
            .cells
            .iter()
            .filter(|c| c.role == RoomType::Normal && !self.rooms[c.room.0 as usize].is_large())
            .map(|c| c.cell)
            .partition(|&cell| self.occupied_neighbor_count(cell) == 1);
        rng.shuffle(&mut dead_ends);
        rng.shuffle(&mut others);

        let chosen: Vec<GridCell> = dead_ends
            .into_iter()
            .chain(others)
            .take(count as usize)
            .collect();
        for &cell in &chosen {
            self.set_role(cell, RoomType::Treasure);
        }
        if chosen.len() < count as usize {
            log::debug!("Only {} of {} treasure rooms fit", chosen.len(), count);
        }
        chosen.len()
    }

    /// Seed the layout was generated from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of cells the generator was asked to fill.
    pub fn requested_rooms(&self) -> u32 {
        self.requested_rooms
    }

    pub fn mapping(&self) -> &GridMapping {
        &self.mapping
    }

    /// Number of occupied grid cells. A 2x2 room counts four times.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// The start cell, always the first placed cell.
    pub fn start_cell(&self) -> GridCell {
        self.cells.first().map(|c| c.cell).unwrap_or_else(GridCell::origin)
    }

    /// World-space centre of the start room.
    pub fn start_world_position(&self) -> Vec2 {
        self.mapping.cell_center(self.start_cell())
    }

    /// Whether any room covers `cell`.
    pub fn has_room(&self, cell: GridCell) -> bool {
        self.index.contains_key(&cell)
    }

    /// The room covering `cell`. Any cell of a 2x2 room resolves to that room.
    pub fn get_room(&self, cell: GridCell) -> Option<&Room> {
        self.cell_info(cell)
            .and_then(|info| self.rooms.get(info.room.0 as usize))
    }

    pub fn cell_info(&self, cell: GridCell) -> Option<&LayoutCell> {
        self.index.get(&cell).map(|&i| &self.cells[i])
    }

    /// Every room once, in placement order.
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// Occupied cells in placement order.
    pub fn occupied_cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        self.cells.iter().map(|c| c.cell)
    }

    /// Role of a single cell.
    ///
    /// Roles are tracked per cell, so a large room holding the boss cell has
    /// exactly one `Boss` cell while its other three cells stay `Normal`. The
    /// room itself reports `Boss` through [`Room::room_type`] from any of its
    /// cells.
    pub fn role(&self, cell: GridCell) -> Option<RoomType> {
        self.cell_info(cell).map(|c| c.role)
    }

    pub fn cells_with_role(&self, role: RoomType) -> impl Iterator<Item = GridCell> + '_ {
        self.cells
            .iter()
            .filter(move |c| c.role == role)
            .map(|c| c.cell)
    }

    pub fn boss_cell(&self) -> Option<GridCell> {
        self.cells_with_role(RoomType::Boss).next()
    }

    /// BFS distance from the start cell.
    pub fn distance_from_start(&self, cell: GridCell) -> Option<u32> {
        self.cell_info(cell).and_then(|c| c.distance)
    }

    /// Door mask of a cell. Unoccupied cells have no doors.
    pub fn door_mask(&self, cell: GridCell) -> DoorMask {
        self.cell_info(cell).map(|c| c.doors).unwrap_or_default()
    }

    pub fn is_large_room_origin(&self, cell: GridCell) -> bool {
        self.get_room(cell)
            .map(|room| room.is_large() && room.origin == cell)
            .unwrap_or(false)
    }

    /// Cells reachable in one step, through a door or across a large room's interior.
    pub fn connected_neighbors(&self, cell: GridCell) -> Vec<GridCell> {
        let Some(here) = self.cell_info(cell) else {
            return Vec::new();
        };
        Direction::ALL
            .iter()
            .filter_map(|&d| {
                let other = self.cell_info(cell.step(d))?;
                (here.doors.has(d) || other.room == here.room).then_some(other.cell)
            })
            .collect()
    }

    /// The room entered by walking through the door of `cell` facing `direction`.
    pub fn door_target(&self, cell: GridCell, direction: Direction) -> Option<&Room> {
        if !self.door_mask(cell).has(direction) {
            return None;
        }
        self.get_room(cell.step(direction))
    }

    fn occupied_neighbor_count(&self, cell: GridCell) -> usize {
        cell.neighbors()
            .iter()
            .filter(|&&n| self.has_room(n))
            .count()
    }

    /// `GenerationStarved` when fewer cells were filled than requested.
    pub fn shortfall(&self) -> Option<LabyrinthError> {
        let placed = self.cells.len() as u32;
        (placed < self.requested_rooms).then_some(LabyrinthError::GenerationStarved {
            requested: self.requested_rooms,
            placed,
        })
    }

    /// Smallest and largest occupied coordinates.
    pub fn cell_extent(&self) -> (GridCell, GridCell) {
        let start = self.start_cell();
        self.occupied_cells().fold((start, start), |(lo, hi), c| {
            (
                GridCell::new(lo.x.min(c.x), lo.y.min(c.y)),
                GridCell::new(hi.x.max(c.x), hi.y.max(c.y)),
            )
        })
    }

    fn cell_glyph(&self, info: &LayoutCell) -> char {
        let large = self.rooms[info.room.0 as usize].is_large();
        match info.role {
            RoomType::Normal if large => 'L',
            role => role.glyph(),
        }
    }

    /// Renders the layout as text, north at the top.
    ///
    /// Rooms use their role glyph (`L` for a normal 2x2 room), `-` and `|`
    /// mark doors, and large-room interiors are filled in.
    pub fn to_ascii(&self) -> String {
        let (lo, hi) = self.cell_extent();
        let width = ((hi.x - lo.x) * 2 + 1) as usize;
        let mut out = String::new();

        for y in (lo.y..=hi.y).rev() {
            let mut row = String::with_capacity(width);
            let mut below = String::with_capacity(width);
            for x in lo.x..=hi.x {
                let cell = GridCell::new(x, y);
                let here = self.cell_info(cell);
                row.push(here.map(|c| self.cell_glyph(c)).unwrap_or(' '));

                if x < hi.x {
                    row.push(self.seam_glyph(cell, Direction::East, '-'));
                }
                if y > lo.y {
                    below.push(self.seam_glyph(cell, Direction::South, '|'));
                    if x < hi.x {
                        let corner = [
                            cell,
                            cell.step(Direction::East),
                            cell.step(Direction::South),
                            cell + GridCell::new(1, -1),
                        ];
                        let owners: Vec<Option<RoomId>> = corner
                            .iter()
                            .map(|&c| self.cell_info(c).map(|i| i.room))
                            .collect();
                        let filled = owners[0].is_some() && owners.iter().all(|r| *r == owners[0]);
                        below.push(if filled { 'L' } else { ' ' });
                    }
                }
            }
            out.push_str(row.trim_end());
            out.push('\n');
            if y > lo.y {
                out.push_str(below.trim_end());
                out.push('\n');
            }
        }
        out
    }

    fn seam_glyph(&self, cell: GridCell, direction: Direction, door: char) -> char {
        let (Some(a), Some(b)) = (self.cell_info(cell), self.cell_info(cell.step(direction))) else {
            return ' ';
        };
        if a.doors.has(direction) {
            door
        } else if a.room == b.room {
            'L'
        } else {
            ' '
        }
    }

    /// Serializes the layout as pretty-printed JSON.
    pub fn to_json(&self) -> LabyrinthResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::utils;

    fn single(x: i32, y: i32) -> (GridCell, RoomFootprint) {
        (GridCell::new(x, y), RoomFootprint::Single)
    }

    fn layout_of(placements: &[(GridCell, RoomFootprint)]) -> DungeonLayout {
        DungeonLayout::from_placements(0, placements.len() as u32, GridMapping::default(), placements)
            .unwrap()
    }

    #[test]
    fn test_dungeon_generator_creation() {
        let generator = DungeonGenerator::new();
        assert_eq!(generator.directions, Direction::ALL.to_vec());
        assert_eq!(generator.generator_type(), "DungeonGenerator");
    }

    #[test]
    fn test_empty_direction_set_fails_fast() {
        let generator = DungeonGenerator::with_directions(Vec::new());
        let config = GenerationConfig::for_testing(1);
        let mut rng = utils::create_rng(&config);
        assert!(matches!(
            generator.generate(&config, &mut rng),
            Err(LabyrinthError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_small_rooms_fill_target_exactly() {
        let config = GenerationConfig::for_testing(42);
        let mut rng = utils::create_rng(&config);
        let layout = DungeonGenerator::new().generate(&config, &mut rng).unwrap();

        assert_eq!(layout.cell_count(), 12);
        assert_eq!(layout.rooms().len(), 12);
        assert_eq!(layout.start_cell(), GridCell::origin());
        assert_eq!(layout.role(GridCell::origin()), Some(RoomType::Start));
        assert!(layout.rooms().iter().all(|r| !r.is_large()));
        assert!(layout.shortfall().is_none());
    }

    #[test]
    fn test_growth_keeps_a_tree() {
        for seed in 0..20 {
            let config = GenerationConfig::new(seed).with_target_rooms(20);
            let layout = generate_with(&config);

            // Each room joins the dungeon through exactly one door pair.
            let door_bits: usize = layout
                .occupied_cells()
                .map(|c| layout.door_mask(c).bits().count_ones() as usize)
                .sum();
            assert_eq!(door_bits / 2, layout.rooms().len() - 1, "seed {}", seed);
        }
    }

    fn generate_with(config: &GenerationConfig) -> DungeonLayout {
        let mut rng = utils::create_rng(config);
        DungeonGenerator::new().generate(config, &mut rng).unwrap()
    }

    #[test]
    fn test_large_rooms_have_no_internal_doors() {
        let config = GenerationConfig::new(7)
            .with_target_rooms(30)
            .with_large_room_probability(1.0);
        let layout = generate_with(&config);

        let large: Vec<&Room> = layout.rooms().iter().filter(|r| r.is_large()).collect();
        assert!(!large.is_empty());
        for room in large {
            let origin = room.origin;
            assert!(layout.is_large_room_origin(origin));
            assert!(!layout.door_mask(origin).has(Direction::East));
            assert!(!layout.door_mask(origin).has(Direction::North));
            let ne = origin + GridCell::new(1, 1);
            assert!(!layout.door_mask(ne).has(Direction::South));
            assert!(!layout.door_mask(ne).has(Direction::West));
            assert_eq!(layout.get_room(ne).map(|r| r.id), Some(room.id));
            assert!(room.doors.len() <= 8);
        }
    }

    #[test]
    fn test_large_footprint_rules() {
        let mut growth = Growth::new(GridCell::origin());
        assert!(growth.check_large_footprint(GridCell::new(1, 0)).is_ok());
        // Overlaps the start cell.
        assert!(matches!(
            growth.check_large_footprint(GridCell::new(-1, 0)),
            Err(LabyrinthError::InvalidFootprint { .. })
        ));

        growth.place(GridCell::new(0, 1), RoomFootprint::Single);
        growth.place(GridCell::new(0, 2), RoomFootprint::Single);
        // Would touch both (0, 1) and (0, 2).
        assert!(growth.check_large_footprint(GridCell::new(1, 1)).is_err());
        assert!(growth.check_large_footprint(GridCell::new(1, 3)).is_ok());
    }

    #[test]
    fn test_from_placements_rejects_overlap() {
        let overlap = DungeonLayout::from_placements(
            0,
            5,
            GridMapping::default(),
            &[single(0, 0), (GridCell::new(1, 0), RoomFootprint::Large), (GridCell::new(2, 1), RoomFootprint::Large)],
        );
        assert!(matches!(overlap, Err(LabyrinthError::InvalidFootprint { origin }) if origin == GridCell::new(2, 1)));

        let twice = DungeonLayout::from_placements(0, 2, GridMapping::default(), &[single(0, 0), single(0, 0)]);
        assert!(matches!(twice, Err(LabyrinthError::InvalidLayout(_))));

        let empty = DungeonLayout::from_placements(0, 1, GridMapping::default(), &[]);
        assert!(empty.is_err());
    }

    #[test]
    fn test_boss_needs_minimum_distance() {
        let line: Vec<_> = (0..6).map(|x| single(x, 0)).collect();

        let mut layout = layout_of(&line);
        assert_eq!(layout.assign_boss(5), Some(GridCell::new(5, 0)));
        assert_eq!(layout.role(GridCell::new(5, 0)), Some(RoomType::Boss));
        assert_eq!(layout.distance_from_start(GridCell::new(5, 0)), Some(5));

        let mut layout = layout_of(&line);
        assert_eq!(layout.assign_boss(6), None);
        assert_eq!(layout.boss_cell(), None);

        let mut lonely = layout_of(&[single(0, 0)]);
        assert_eq!(lonely.assign_boss(0), None);
    }

    #[test]
    fn test_boss_in_large_room_marks_one_cell() {
        let mut layout = layout_of(&[single(0, 0), (GridCell::new(1, 0), RoomFootprint::Large)]);
        let boss = layout.assign_boss(1).unwrap();
        assert_eq!(boss, GridCell::new(2, 1));
        assert_eq!(layout.distance_from_start(boss), Some(3));

        assert_eq!(layout.cells_with_role(RoomType::Boss).collect::<Vec<_>>(), vec![boss]);
        for cell in [GridCell::new(1, 0), GridCell::new(2, 0), GridCell::new(1, 1)] {
            assert_eq!(layout.role(cell), Some(RoomType::Normal));
            assert_eq!(layout.get_room(cell).map(|r| r.room_type), Some(RoomType::Boss));
        }
    }

    #[test]
    fn test_treasure_prefers_dead_ends() {
        // (0,0) - (1,0) - (2,0), with (1,1) hanging off the middle.
        let mut layout = layout_of(&[single(0, 0), single(1, 0), single(2, 0), single(1, 1)]);
        let mut rng = GameRng::new(3);
        assert_eq!(layout.assign_treasure(2, &mut rng), 2);

        let treasure: HashSet<GridCell> = layout.cells_with_role(RoomType::Treasure).collect();
        assert!(treasure.contains(&GridCell::new(2, 0)));
        assert!(treasure.contains(&GridCell::new(1, 1)));

        let mut rng = GameRng::new(3);
        let mut small = layout_of(&[single(0, 0), single(1, 0)]);
        assert_eq!(small.assign_treasure(3, &mut rng), 1);
    }

    #[test]
    fn test_large_room_lookup_and_door_targets() {
        let layout = layout_of(&[single(0, 0), (GridCell::new(1, 0), RoomFootprint::Large)]);
        assert_eq!(layout.cell_count(), 5);
        assert_eq!(layout.rooms().len(), 2);

        let room = layout.door_target(GridCell::origin(), Direction::East).unwrap();
        assert!(room.is_large());
        assert_eq!(layout.get_room(GridCell::new(2, 1)).map(|r| r.id), Some(room.id));
        assert_eq!(layout.door_target(GridCell::origin(), Direction::North), None);
        assert_eq!(room.doors, vec![DoorPlacement::new(GridCell::new(1, 0), Direction::West)]);

        let mut neighbors = layout.connected_neighbors(GridCell::new(1, 0));
        neighbors.sort();
        assert_eq!(neighbors, vec![GridCell::new(0, 0), GridCell::new(1, 1), GridCell::new(2, 0)]);
    }

    #[test]
    fn test_shortfall_reports_starvation() {
        let layout = DungeonLayout::from_placements(0, 4, GridMapping::default(), &[single(0, 0), single(0, 1)]).unwrap();
        assert!(matches!(
            layout.shortfall(),
            Some(LabyrinthError::GenerationStarved { requested: 4, placed: 2 })
        ));
    }

    #[test]
    fn test_ascii_map() {
        let layout = layout_of(&[single(0, 0), single(1, 0), single(1, 1)]);
        assert_eq!(layout.to_ascii(), "  #\n  |\nS-#\n");

        let large = layout_of(&[single(0, 0), (GridCell::new(1, 0), RoomFootprint::Large)]);
        assert_eq!(large.to_ascii(), "  LLL\n  LLL\nS-LLL\n");
    }

    #[test]
    fn test_layout_json() {
        let layout = layout_of(&[single(0, 0), single(0, -1)]);
        let json = layout.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["rooms"].as_array().map(|r| r.len()), Some(2));
        assert_eq!(value["cells"][0]["doors"], 4);
    }
}
