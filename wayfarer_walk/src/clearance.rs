// Vertical clearance of the tile being left.
//
// Before a step is validated, the tile the mover stands on (one step
// *behind* the destination along the step direction) bounds how far the
// mover can drop and climb. The floor the mover stands on raises the lower
// bound; a bridge at the current elevation (stairs, ramps) extends the
// upper bound to its top. Sloped terrain contributes the elevation of the
// slope edge facing the step instead of its average.
//
// See also: `step.rs` which consumes the range, `world.rs` for
// `LandTile::directional_average_z`.

use crate::config::MIN_Z;
use crate::occupancy::{OccupancyFlags, classify};
use crate::step::StepContext;
use crate::types::Direction;
use crate::world::WorldView;

/// Elevation bounds for a step leaving a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerticalRange {
    pub min_z: i32,
    pub max_z: i32,
}

/// Bounds for a step from elevation `z` into `(x, y)` along `direction`.
/// The tile examined is the one the mover leaves.
pub fn resolve_vertical_range<W: WorldView + ?Sized>(
    ctx: &StepContext<'_, W>,
    x: i32,
    y: i32,
    z: i32,
    direction: Direction,
) -> VerticalRange {
    let mut range = VerticalRange { min_z: MIN_Z, max_z: z };
    let (dx, dy) = direction.opposite().offset();
    let records = classify(ctx, x + dx, y + dy);
    if records.is_empty() {
        return range;
    }

    for record in &records {
        let average_z = record.average_z;
        match record.stretched_land() {
            Some(land) if average_z <= z => {
                let edge_z = land.directional_average_z(direction);
                range.min_z = range.min_z.max(edge_z);
                range.max_z = range.max_z.max(edge_z);
            }
            _ => {
                if record.flags.contains(OccupancyFlags::IMPASSABLE_OR_SURFACE)
                    && average_z <= z
                {
                    range.min_z = range.min_z.max(average_z);
                }
                if record.flags.contains(OccupancyFlags::BRIDGE) && average_z == z {
                    range.max_z = range.max_z.max(record.z + record.height);
                    range.min_z = range.min_z.min(record.z);
                }
            }
        }
    }

    range.max_z += ctx.config.clearance_padding;
    range
}
