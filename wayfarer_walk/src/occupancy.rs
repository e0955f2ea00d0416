// Tile occupancy classification.
//
// Turns the object stack of one map tile into the occupancy records the
// step validator scans: each record is a vertical interval (`z` up to
// `average_z`, with a `height`) tagged with what it does to a mover. An
// impassable-or-surface record is something you either stand on or bump
// into; surface and bridge records are walkable tops; no-diagonal marks
// tiles a flying gargoyle lands on directly.
//
// Which objects count, and how, depends on the movement mode: ghosts and
// game masters pass through doors, light items and a few statics; a
// sea-horse rider only floats on wet tiles; creatures block only a tired
// avatar on the main map. Graphic ranges for the special cases come from
// `GraphicRules` in the config.
//
// See also: `step.rs` for `StepContext` and the floor scan over these
// records, `clearance.rs` which classifies the tile being left.

use crate::step::StepContext;
use crate::types::MovementMode;
use crate::world::{
    ItemObject, LandTile, MultiObject, MultiState, TileFlags, WorldObject, WorldView,
};
use bitflags::bitflags;
use smallvec::SmallVec;

bitflags! {
    /// What an occupancy record does to a mover.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct OccupancyFlags: u8 {
        const IMPASSABLE_OR_SURFACE = 1 << 0;
        const SURFACE = 1 << 1;
        const BRIDGE = 1 << 2;
        const NO_DIAGONAL = 1 << 3;
    }
}

/// The kind of object a record was built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordSource {
    /// Terrain; carries the corners so the resolver can handle slopes.
    Land(LandTile),
    Static,
    Item,
    Multi,
    Mobile,
    /// Synthetic top-of-world record appended by the step validator.
    Ceiling,
}

/// One vertical interval on a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OccupancyRecord {
    pub flags: OccupancyFlags,
    /// Bottom of the object.
    pub z: i32,
    /// Elevation a mover stands at on top of the object.
    pub average_z: i32,
    pub height: i32,
    pub source: RecordSource,
}

impl OccupancyRecord {
    pub fn ceiling(z: i32) -> Self {
        Self {
            flags: OccupancyFlags::IMPASSABLE_OR_SURFACE,
            z,
            average_z: z,
            height: z,
            source: RecordSource::Ceiling,
        }
    }

    /// The terrain tile behind this record, if it is drawn as a slope.
    pub fn stretched_land(&self) -> Option<&LandTile> {
        match &self.source {
            RecordSource::Land(land) if land.is_stretched() => Some(land),
            _ => None,
        }
    }
}

/// Records of one tile, bottom to top. Tiles rarely hold more than a few.
pub type TileRecords = SmallVec<[OccupancyRecord; 8]>;

/// Classify the objects on `(x, y)`. Returns an empty list for unloaded or
/// off-map tiles, which the validator treats as impassable.
pub fn classify<W: WorldView + ?Sized>(ctx: &StepContext<'_, W>, x: i32, y: i32) -> TileRecords {
    let mut records = TileRecords::new();
    let Some(stack) = ctx.world.tile(x, y) else {
        return records;
    };
    let editing_house = ctx.world.custom_house().is_some();

    for object in stack {
        if editing_house && object.z() < ctx.avatar_z {
            continue;
        }
        let record = match object {
            WorldObject::Land(land) => classify_land(ctx, land),
            WorldObject::Mobile(mobile) => {
                if ctx.ignore_characters || mobile.dead || mobile.ignores_characters {
                    None
                } else {
                    let height = ctx.config.character_height;
                    Some(OccupancyRecord {
                        flags: OccupancyFlags::IMPASSABLE_OR_SURFACE,
                        z: mobile.z,
                        average_z: mobile.z + height,
                        height,
                        source: RecordSource::Mobile,
                    })
                }
            }
            WorldObject::Item(item) => classify_item(ctx, item),
            WorldObject::Multi(multi) => classify_multi(ctx, multi, editing_house),
            WorldObject::Static(s) => {
                classify_static(ctx, s.graphic, s.z, false, RecordSource::Static)
            }
            WorldObject::Effect { .. } => None,
        };
        records.extend(record);
    }
    records
}

fn classify_land<W: WorldView + ?Sized>(
    ctx: &StepContext<'_, W>,
    land: &LandTile,
) -> Option<OccupancyRecord> {
    if ctx.config.graphics.is_no_draw_land(land.graphic) {
        return None;
    }
    let walkable = OccupancyFlags::IMPASSABLE_OR_SURFACE
        | OccupancyFlags::SURFACE
        | OccupancyFlags::BRIDGE;
    let mut flags = OccupancyFlags::IMPASSABLE_OR_SURFACE;
    if ctx.mode == MovementMode::OnSeaHorse {
        if land.flags.contains(TileFlags::WET) {
            flags = walkable;
        }
    } else {
        if !land.flags.contains(TileFlags::IMPASSABLE) {
            flags = walkable;
        }
        if ctx.mode == MovementMode::Flying && land.flags.contains(TileFlags::NO_DIAGONAL) {
            flags |= OccupancyFlags::NO_DIAGONAL;
        }
    }
    let min_z = land.min_z();
    let average_z = land.average_z();
    Some(OccupancyRecord {
        flags,
        z: min_z,
        average_z,
        height: average_z - min_z,
        source: RecordSource::Land(*land),
    })
}

fn classify_item<W: WorldView + ?Sized>(
    ctx: &StepContext<'_, W>,
    item: &ItemObject,
) -> Option<OccupancyRecord> {
    let data = ctx.world.static_data(item.graphic);
    if item.multi || data.flags.contains(TileFlags::INTERNAL) {
        return None;
    }
    let door = data.flags.contains(TileFlags::DOOR);
    let rules = &ctx.config.graphics;
    let ghost_passes = ctx.mode == MovementMode::DeadOrGm
        && (door || data.weight <= rules.light_item_max_weight || (ctx.is_gm && !item.locked));
    let drop_flags = ghost_passes
        || (ctx.config.profile.smooth_doors && door)
        || rules.is_passable_decoration(item.graphic);
    classify_static(ctx, item.graphic, item.z, drop_flags, RecordSource::Item)
}

fn classify_multi<W: WorldView + ?Sized>(
    ctx: &StepContext<'_, W>,
    multi: &MultiObject,
    editing_house: bool,
) -> Option<OccupancyRecord> {
    let editable_part = editing_house
        && multi.custom
        && !multi.state.contains(MultiState::GENERIC_INTERNAL);
    if editable_part || multi.preview {
        return None;
    }
    let drop_flags = multi.state.contains(MultiState::IGNORE_IN_RENDER);
    classify_static(ctx, multi.graphic, multi.z, drop_flags, RecordSource::Multi)
}

/// Shared rule for statics and the items/multis that survived their own
/// filters: flags come from static tile data.
fn classify_static<W: WorldView + ?Sized>(
    ctx: &StepContext<'_, W>,
    graphic: u16,
    z: i32,
    mut drop_flags: bool,
    source: RecordSource,
) -> Option<OccupancyRecord> {
    let data = ctx.world.static_data(graphic);
    let mut flags = OccupancyFlags::empty();

    if ctx.mode == MovementMode::OnSeaHorse {
        if data.flags.contains(TileFlags::WET) {
            flags = OccupancyFlags::SURFACE | OccupancyFlags::BRIDGE;
        }
    } else {
        let impassable = data.flags.contains(TileFlags::IMPASSABLE);
        let surface = data.flags.contains(TileFlags::SURFACE);
        if impassable || surface {
            flags = OccupancyFlags::IMPASSABLE_OR_SURFACE;
        }
        if !impassable {
            if surface {
                flags |= OccupancyFlags::SURFACE;
            }
            if data.flags.contains(TileFlags::BRIDGE) {
                flags |= OccupancyFlags::BRIDGE;
            }
        }
        if ctx.mode == MovementMode::DeadOrGm && ctx.config.graphics.is_ghost_passable(graphic) {
            drop_flags = true;
        }
        if drop_flags {
            flags.remove(OccupancyFlags::IMPASSABLE_OR_SURFACE);
        }
        if ctx.mode == MovementMode::Flying && data.flags.contains(TileFlags::NO_DIAGONAL) {
            flags |= OccupancyFlags::NO_DIAGONAL;
        }
    }

    if flags.is_empty() {
        return None;
    }
    let standing = if data.flags.contains(TileFlags::BRIDGE) {
        data.height / 2
    } else {
        data.height
    };
    Some(OccupancyRecord {
        flags,
        z,
        average_z: z + standing,
        height: data.height,
        source,
    })
}
