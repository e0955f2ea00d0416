// Single-step validation.
//
// `try_step` decides whether a mover at elevation `z` can enter tile
// `(x, y)` and, if so, at which elevation it lands. It classifies the
// destination tile, sorts the records bottom to top and caps them with a
// synthetic ceiling, then scans upward: every blocking record with at
// least `block_height` of headroom above the current floor opens a window
// in which a lower surface or bridge top can be stood on. The candidate
// closest to the starting elevation wins. Reach is bounded by the
// clearance range of the tile being left (`clearance.rs`).
//
// `can_walk` layers the diagonal rule on top: a diagonal step needs both
// adjacent cardinal steps to be clear, otherwise the mover slides along
// the first clear cardinal instead (clockwise first).
//
// Everything here is a pure function of the world snapshot and the
// `StepContext`, so the search can call it thousands of times per request.
//
// See also: `occupancy.rs` (record classification), `pathfinding.rs`
// (the only caller of `can_walk` during search).

use crate::avatar::AvatarStatus;
use crate::clearance::resolve_vertical_range;
use crate::config::{CEILING_Z, MIN_Z, WalkConfig};
use crate::occupancy::{OccupancyFlags, OccupancyRecord, classify};
use crate::types::{Direction, MovementMode, Position};
use crate::world::WorldView;

/// Everything the step rules need besides the coordinates: the world, the
/// configuration, and the avatar facts that change what blocks.
pub struct StepContext<'a, W: WorldView + ?Sized> {
    pub world: &'a W,
    pub config: &'a WalkConfig,
    pub mode: MovementMode,
    /// Elevation of the avatar; objects below it are skipped while a
    /// custom house is edited.
    pub avatar_z: i32,
    pub is_gm: bool,
    pub ignore_characters: bool,
}

impl<'a, W: WorldView + ?Sized> StepContext<'a, W> {
    /// Context for a generic mover in `mode`, standing at elevation 0.
    /// Creatures are ignored only when the mode or profile says so.
    pub fn new(world: &'a W, config: &'a WalkConfig, mode: MovementMode) -> Self {
        Self {
            world,
            config,
            mode,
            avatar_z: 0,
            is_gm: false,
            ignore_characters: config.profile.ignore_stamina_check
                || mode == MovementMode::DeadOrGm,
        }
    }

    /// Context for the avatar described by `status`.
    pub fn for_avatar(world: &'a W, config: &'a WalkConfig, status: &AvatarStatus) -> Self {
        let mode = status.movement_mode(&config.graphics);
        Self {
            world,
            config,
            mode,
            avatar_z: status.position.z,
            is_gm: status.is_gm(&config.graphics),
            ignore_characters: status.ignores_characters(mode, &config.profile),
        }
    }
}

/// Elevation reached by stepping from `z` into `(x, y)` along `direction`,
/// or `None` when the tile cannot be entered.
pub fn try_step<W: WorldView + ?Sized>(
    ctx: &StepContext<'_, W>,
    x: i32,
    y: i32,
    z: i32,
    direction: Direction,
) -> Option<i32> {
    let range = resolve_vertical_range(ctx, x, y, z, direction);

    if ctx.world.custom_house().is_some_and(|area| !area.contains(x, y)) {
        return None;
    }

    let mut records = classify(ctx, x, y);
    if records.is_empty() {
        return None;
    }
    records.sort_by_key(|r| (r.z, r.height));
    records.push(OccupancyRecord::ceiling(CEILING_Z));

    let block_height = ctx.config.block_height;
    let max_z = range.max_z;
    let mut min_z = range.min_z;
    let z = z.max(min_z);

    let mut result_z = MIN_Z;
    let mut best_delta = i32::MAX;
    let mut current_z = MIN_Z;

    for (i, record) in records.iter().enumerate() {
        if ctx.mode == MovementMode::Flying
            && record.flags.contains(OccupancyFlags::NO_DIAGONAL)
            && (record.average_z - z).abs() <= ctx.config.flying_snap_range
        {
            result_z = if record.average_z != MIN_Z {
                record.average_z
            } else {
                current_z
            };
            break;
        }

        if !record.flags.contains(OccupancyFlags::IMPASSABLE_OR_SURFACE) {
            continue;
        }

        if record.z - min_z >= block_height {
            for candidate in records[..i].iter().rev() {
                let surface = candidate.flags.contains(OccupancyFlags::SURFACE);
                let bridge = candidate.flags.contains(OccupancyFlags::BRIDGE);
                if !surface && !bridge {
                    continue;
                }
                let top = candidate.average_z;
                let reachable = (surface && top <= max_z) || (bridge && candidate.z <= max_z);
                if top >= current_z && record.z - top >= block_height && reachable {
                    let delta = (z - top).abs();
                    if delta < best_delta {
                        best_delta = delta;
                        result_z = top;
                    }
                }
            }
        }

        min_z = min_z.max(record.average_z);
        current_z = current_z.max(record.average_z);
    }

    (result_z != MIN_Z).then_some(result_z)
}

/// A validated step: the direction actually taken and where it lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    pub direction: Direction,
    pub position: Position,
}

/// Validate a step from `from` in `direction`, applying the diagonal rule.
/// The returned direction differs from `direction` when a blocked diagonal
/// fell back to one of its cardinal neighbours.
pub fn can_walk<W: WorldView + ?Sized>(
    ctx: &StepContext<'_, W>,
    direction: Direction,
    from: Position,
) -> Option<StepOutcome> {
    let step = |dir: Direction| {
        let to = from.offset(dir);
        try_step(ctx, to.x, to.y, from.z, dir).map(|z| StepOutcome {
            direction: dir,
            position: Position::new(to.x, to.y, z),
        })
    };

    let primary = step(direction);
    if !direction.is_diagonal() {
        return primary;
    }

    let corners = [direction.clockwise(), direction.counter_clockwise()];
    if primary.is_some() && corners.iter().all(|&corner| step(corner).is_some()) {
        return primary;
    }
    corners.into_iter().find_map(step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{
        EditArea, LandTile, StaticObject, StaticTileData, TileFlags, TileMap, WorldObject,
    };

    const GRASS: u16 = 0x0003;
    const WALL: u16 = 0x0080;
    const STAIR: u16 = 0x0750;

    fn map() -> TileMap {
        let mut map = TileMap::new(8, 8, LandTile::flat(GRASS, 0, TileFlags::empty()));
        map.define_static(WALL, StaticTileData::new(TileFlags::IMPASSABLE, 20));
        map.define_static(
            STAIR,
            StaticTileData::new(TileFlags::SURFACE | TileFlags::BRIDGE, 10),
        );
        map
    }

    fn wall(map: &mut TileMap, x: i32, y: i32) {
        map.place(x, y, WorldObject::Static(StaticObject { graphic: WALL, z: 0 }));
    }

    #[test]
    fn flat_ground_keeps_elevation() {
        let map = map();
        let config = WalkConfig::default();
        let ctx = StepContext::new(&map, &config, MovementMode::Normal);
        assert_eq!(try_step(&ctx, 3, 2, 0, Direction::East), Some(0));
    }

    #[test]
    fn wall_blocks() {
        let mut map = map();
        wall(&mut map, 3, 2);
        let config = WalkConfig::default();
        let ctx = StepContext::new(&map, &config, MovementMode::Normal);
        assert_eq!(try_step(&ctx, 3, 2, 0, Direction::East), None);
    }

    #[test]
    fn off_map_blocks() {
        let map = map();
        let config = WalkConfig::default();
        let ctx = StepContext::new(&map, &config, MovementMode::Normal);
        assert_eq!(try_step(&ctx, 8, 2, 0, Direction::East), None);
    }

    #[test]
    fn stairs_climb_half_a_step_at_a_time() {
        let mut map = map();
        map.place(3, 2, WorldObject::Static(StaticObject { graphic: STAIR, z: 0 }));
        map.place(4, 2, WorldObject::Static(StaticObject { graphic: STAIR, z: 5 }));
        let config = WalkConfig::default();
        let ctx = StepContext::new(&map, &config, MovementMode::Normal);
        assert_eq!(try_step(&ctx, 3, 2, 0, Direction::East), Some(5));
        assert_eq!(try_step(&ctx, 4, 2, 5, Direction::East), Some(10));
    }

    #[test]
    fn repeated_validation_is_deterministic() {
        let mut map = map();
        map.place(3, 2, WorldObject::Static(StaticObject { graphic: STAIR, z: 0 }));
        let config = WalkConfig::default();
        let ctx = StepContext::new(&map, &config, MovementMode::Normal);
        let first = try_step(&ctx, 3, 2, 0, Direction::East);
        for _ in 0..10 {
            assert_eq!(try_step(&ctx, 3, 2, 0, Direction::East), first);
        }
    }

    #[test]
    fn flying_snaps_to_no_diagonal_tiles() {
        let mut map = map();
        map.set_land(
            3,
            2,
            LandTile::flat(GRASS, 0, TileFlags::IMPASSABLE | TileFlags::NO_DIAGONAL),
        );
        let config = WalkConfig::default();

        let walking = StepContext::new(&map, &config, MovementMode::Normal);
        assert_eq!(try_step(&walking, 3, 2, 0, Direction::East), None);

        let flying = StepContext::new(&map, &config, MovementMode::Flying);
        assert_eq!(try_step(&flying, 3, 2, 20, Direction::East), Some(0));
        // Out of snap range.
        assert_eq!(try_step(&flying, 3, 2, 26, Direction::East), None);
    }

    #[test]
    fn custom_house_edit_confines_steps() {
        let mut map = map();
        map.set_edit_area(Some(EditArea { min_x: 0, min_y: 0, max_x: 3, max_y: 3 }));
        let config = WalkConfig::default();
        let ctx = StepContext::new(&map, &config, MovementMode::Normal);
        assert_eq!(try_step(&ctx, 3, 3, 0, Direction::East), Some(0));
        assert_eq!(try_step(&ctx, 4, 3, 0, Direction::East), None);
    }

    #[test]
    fn open_diagonal_is_kept() {
        let map = map();
        let config = WalkConfig::default();
        let ctx = StepContext::new(&map, &config, MovementMode::Normal);
        let outcome = can_walk(&ctx, Direction::SouthEast, Position::new(2, 2, 0)).unwrap();
        assert_eq!(outcome.direction, Direction::SouthEast);
        assert_eq!(outcome.position, Position::new(3, 3, 0));
    }

    #[test]
    fn blocked_corner_substitutes_cardinal() {
        let mut map = map();
        // East corner of a south-east step from (2, 2).
        wall(&mut map, 3, 2);
        let config = WalkConfig::default();
        let ctx = StepContext::new(&map, &config, MovementMode::Normal);
        let outcome = can_walk(&ctx, Direction::SouthEast, Position::new(2, 2, 0)).unwrap();
        assert_eq!(outcome.direction, Direction::South);
        assert_eq!(outcome.position, Position::new(2, 3, 0));
    }

    #[test]
    fn both_corners_blocked_fails() {
        let mut map = map();
        wall(&mut map, 3, 2);
        wall(&mut map, 2, 3);
        let config = WalkConfig::default();
        let ctx = StepContext::new(&map, &config, MovementMode::Normal);
        assert_eq!(can_walk(&ctx, Direction::SouthEast, Position::new(2, 2, 0)), None);
    }

    #[test]
    fn avatar_context_follows_status() {
        let map = map();
        let config = WalkConfig::default();
        let mut status = AvatarStatus::standing_at(Position::new(1, 1, 7));
        status.body = config.graphics.gm_body;
        let ctx = StepContext::for_avatar(&map, &config, &status);
        assert_eq!(ctx.mode, MovementMode::DeadOrGm);
        assert!(ctx.is_gm);
        assert!(ctx.ignore_characters);
        assert_eq!(ctx.avatar_z, 7);
    }
}
