//! Structural properties of generated dungeons across many seeds.

use labyrinth::{
    generate_dungeon, Direction, DungeonLayout, GenerationConfig, GridCell, LabyrinthError, LabyrinthResult,
    RoomType,
};
use pathfinding::prelude::bfs_reach;
use proptest::prelude::*;
use std::collections::HashSet;
use std::io::Write;

fn reachable_cells(layout: &DungeonLayout) -> HashSet<GridCell> {
    bfs_reach(layout.start_cell(), |&cell| layout.connected_neighbors(cell)).collect()
}

fn masks_are_mutual(layout: &DungeonLayout) -> bool {
    layout.occupied_cells().all(|cell| {
        Direction::ALL.iter().all(|&dir| {
            let other = cell.step(dir);
            !layout.has_room(other)
                || layout.door_mask(cell).has(dir) == layout.door_mask(other).has(dir.opposite())
        })
    })
}

fn config_strategy() -> impl Strategy<Value = GenerationConfig> {
    (any::<u64>(), 1_u32..40, 0_u32..8, 0.0_f64..=1.0).prop_map(|(seed, rooms, boss, large)| {
        GenerationConfig::new(seed)
            .with_target_rooms(rooms)
            .with_min_boss_distance(boss)
            .with_large_room_probability(large)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn generation_is_deterministic(config in config_strategy()) {
        let a = generate_dungeon(&config).unwrap();
        let b = generate_dungeon(&config).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn every_cell_is_reachable_from_start(config in config_strategy()) {
        let layout = generate_dungeon(&config).unwrap();
        let reachable = reachable_cells(&layout);
        prop_assert_eq!(reachable.len(), layout.cell_count(), "seed={}", config.seed);
    }

    #[test]
    fn roles_are_well_formed(config in config_strategy()) {
        let layout = generate_dungeon(&config).unwrap();
        prop_assert_eq!(layout.cells_with_role(RoomType::Start).count(), 1);
        prop_assert_eq!(layout.role(GridCell::new(0, 0)), Some(RoomType::Start));

        let bosses: Vec<GridCell> = layout.cells_with_role(RoomType::Boss).collect();
        prop_assert!(bosses.len() <= 1);
        if let Some(&boss) = bosses.first() {
            prop_assert!(layout.distance_from_start(boss).unwrap() >= config.min_boss_distance);
            prop_assert!(boss != layout.start_cell());
        }

        let treasure = layout.cells_with_role(RoomType::Treasure).count() as u32;
        prop_assert!(treasure <= config.treasure_rooms);
    }

    #[test]
    fn door_masks_are_mutual(config in config_strategy()) {
        let layout = generate_dungeon(&config).unwrap();
        prop_assert!(masks_are_mutual(&layout), "seed={}", config.seed);
    }

    #[test]
    fn rooms_never_share_cells(config in config_strategy()) {
        let layout = generate_dungeon(&config).unwrap();
        let mut claimed = HashSet::new();
        for room in layout.rooms() {
            for cell in room.cells() {
                prop_assert!(claimed.insert(cell), "{} claimed twice", cell);
                prop_assert_eq!(layout.get_room(cell).map(|r| r.id), Some(room.id));
            }
        }
        prop_assert_eq!(claimed.len(), layout.cell_count());
    }

    #[test]
    fn starvation_is_reported_not_fatal(config in config_strategy()) {
        let layout = generate_dungeon(&config).unwrap();
        let placed = layout.cell_count() as u32;
        // A large room on the last step may overshoot the target by up to 3 cells.
        prop_assert!(placed <= config.target_rooms + 3);
        match layout.shortfall() {
            Some(LabyrinthError::GenerationStarved { requested, placed: reported }) => {
                prop_assert_eq!(requested, config.target_rooms);
                prop_assert_eq!(reported, placed);
                prop_assert!(placed < config.target_rooms);
            }
            Some(other) => prop_assert!(false, "unexpected shortfall {:?}", other),
            None => prop_assert!(placed >= config.target_rooms),
        }
    }
}

#[test]
fn test_seed_42_scenario() -> LabyrinthResult<()> {
    let config = GenerationConfig::for_testing(42)
        .with_target_rooms(12)
        .with_min_boss_distance(5);
    let layout = generate_dungeon(&config)?;

    assert_eq!(layout.cell_count(), 12);
    assert_eq!(layout.rooms().len(), 12);
    assert!(layout.rooms().iter().all(|r| !r.is_large()));
    assert_eq!(layout.start_cell(), GridCell::new(0, 0));
    assert_eq!(layout.role(GridCell::new(0, 0)), Some(RoomType::Start));
    assert!(masks_are_mutual(&layout));
    assert!(layout.shortfall().is_none());

    // The boss sits on a farthest cell whenever one is far enough away.
    let farthest = layout
        .occupied_cells()
        .filter_map(|c| layout.distance_from_start(c))
        .max()
        .unwrap_or(0);
    match layout.boss_cell() {
        Some(boss) => {
            assert_eq!(layout.distance_from_start(boss), Some(farthest));
            assert!(farthest >= 5);
        }
        None => assert!(farthest < 5),
    }

    let again = generate_dungeon(&config)?;
    assert_eq!(again.boss_cell(), layout.boss_cell());
    assert_eq!(again.to_ascii(), layout.to_ascii());
    Ok(())
}

#[test]
fn test_different_seeds_differ() -> LabyrinthResult<()> {
    let layouts: Vec<String> = (0..6)
        .map(|seed| generate_dungeon(&GenerationConfig::for_testing(seed)).map(|l| l.to_ascii()))
        .collect::<LabyrinthResult<_>>()?;
    let distinct: HashSet<&String> = layouts.iter().collect();
    assert!(distinct.len() > 1);
    Ok(())
}

#[test]
fn test_invalid_config_fails_fast() {
    let zero = GenerationConfig::new(1).with_target_rooms(0);
    assert!(matches!(generate_dungeon(&zero), Err(LabyrinthError::InvalidConfig(_))));

    let probability = GenerationConfig::new(1).with_large_room_probability(1.5);
    assert!(matches!(generate_dungeon(&probability), Err(LabyrinthError::InvalidConfig(_))));
}

#[test]
fn test_config_file_overrides_defaults() -> LabyrinthResult<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(
        file,
        r#"{{ "seed": 99, "target_rooms": 20, "large_room_probability": 0.0, "rocks": {{ "enabled": false }} }}"#
    )?;

    let config = GenerationConfig::from_json_file(file.path())?;
    assert_eq!(config.seed, 99);
    assert_eq!(config.target_rooms, 20);
    assert!(!config.rocks.enabled);
    assert_eq!(config.min_boss_distance, GenerationConfig::default().min_boss_distance);

    let layout = generate_dungeon(&config)?;
    assert_eq!(layout.seed(), 99);
    assert_eq!(layout.requested_rooms(), 20);
    Ok(())
}

#[test]
fn test_config_file_rejects_bad_values() -> LabyrinthResult<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, r#"{{ "target_rooms": 0 }}"#)?;
    assert!(matches!(
        GenerationConfig::from_json_file(file.path()),
        Err(LabyrinthError::InvalidConfig(_))
    ));

    let mut garbage = tempfile::NamedTempFile::new()?;
    writeln!(garbage, "not json")?;
    assert!(matches!(
        GenerationConfig::from_json_file(garbage.path()),
        Err(LabyrinthError::Serde(_))
    ));
    Ok(())
}
