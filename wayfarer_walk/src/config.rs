// Data-driven walk configuration.
//
// Every tunable of the planner lives in `WalkConfig`: the search budget,
// step costs, elevation clearances, executor rate limits, and the
// game-data graphic ranges that special-case individual tiles. The search
// code never embeds magic numbers; it reads them from here, which keeps the
// occupancy and search logic testable against synthetic game data.
//
// Graphic special cases are grouped into `GraphicRules`, user preferences
// into `ProfileFlags`. Both nest inside `WalkConfig` and load from the same
// JSON document. Missing fields fall back to `WalkConfig::default()`, which
// carries the values the live client ships with.
//
// See also: `occupancy.rs` (graphic rules, character height), `step.rs`
// (block height, flying snap range), `pathfinding.rs` (budget, costs),
// `executor.rs` (step quota, run threshold).

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Lowest elevation in game data; doubles as the "no floor found" sentinel.
pub const MIN_Z: i32 = -128;

/// Elevation of the synthetic ceiling record that bounds every floor scan.
pub const CEILING_Z: i32 = 128;

// ---------------------------------------------------------------------------
// Graphic rules
// ---------------------------------------------------------------------------

/// Inclusive range of tile graphic ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphicRange {
    pub start: u16,
    pub end: u16,
}

impl GraphicRange {
    pub const fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    pub const fn single(graphic: u16) -> Self {
        Self::new(graphic, graphic)
    }

    pub fn contains(&self, graphic: u16) -> bool {
        (self.start..=self.end).contains(&graphic)
    }
}

fn any_contains(ranges: &[GraphicRange], graphic: u16) -> bool {
    ranges.iter().any(|r| r.contains(graphic))
}

/// Graphic ids and thresholds that special-case individual objects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicRules {
    /// Land graphics that are never drawn and never occupy their tile.
    pub no_draw_land: Vec<GraphicRange>,
    /// Plant- and decoration-like items that never block, in any mode.
    pub passable_decorations: Vec<GraphicRange>,
    /// Statics a ghost or game master walks through.
    pub ghost_passable_statics: Vec<GraphicRange>,
    /// Body graphic of a game-master avatar.
    pub gm_body: u16,
    /// Mount graphic that switches movement to wet tiles only.
    pub sea_horse_mount: u16,
    /// Items at or below this weight stop blocking ghosts and game masters.
    pub light_item_max_weight: u8,
}

impl GraphicRules {
    pub fn is_no_draw_land(&self, graphic: u16) -> bool {
        any_contains(&self.no_draw_land, graphic)
    }

    pub fn is_passable_decoration(&self, graphic: u16) -> bool {
        any_contains(&self.passable_decorations, graphic)
    }

    pub fn is_ghost_passable(&self, graphic: u16) -> bool {
        any_contains(&self.ghost_passable_statics, graphic)
    }
}

impl Default for GraphicRules {
    fn default() -> Self {
        Self {
            no_draw_land: vec![
                GraphicRange::single(0x0002),
                GraphicRange::new(0x01AE, 0x01B5),
                GraphicRange::single(0x01DB),
            ],
            passable_decorations: vec![
                GraphicRange::new(0x3946, 0x3964),
                GraphicRange::single(0x0082),
            ],
            ghost_passable_statics: vec![
                GraphicRange::single(0x0692),
                GraphicRange::new(0x06F5, 0x06F6),
                GraphicRange::single(0x0846),
                GraphicRange::single(0x0873),
            ],
            gm_body: 0x03DB,
            sea_horse_mount: 0x3EB3,
            light_item_max_weight: 0x5A,
        }
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// User preferences the planner reads but never changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileFlags {
    /// Doors open automatically, so they never block a route.
    pub smooth_doors: bool,
    /// Walk through other creatures regardless of stamina.
    pub ignore_stamina_check: bool,
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level walk configuration. Loaded from JSON, read-only during a search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Maximum number of closed nodes before a search gives up.
    pub max_nodes: usize,

    /// Side length of the square node lattice centred on the start tile.
    /// Positions outside it are unreachable for that search.
    pub node_window: i32,

    /// Cost of one cardinal step. Diagonal steps cost `step_cost * √2`.
    pub step_cost: f64,

    /// Multiplier applied to a step that changes direction from its parent.
    pub turn_penalty: f64,

    /// Minimum vertical clearance a character needs under an obstacle.
    pub block_height: i32,

    /// Vertical extent of a standing creature.
    pub character_height: i32,

    /// Headroom added to the resolver's upper bound.
    pub clearance_padding: i32,

    /// While flying, a no-diagonal surface within this many units of the
    /// current elevation is landed on directly.
    pub flying_snap_range: i32,

    /// Unacknowledged steps the avatar may have in flight.
    pub max_step_count: u32,

    /// Routes whose start is further than this from the target are run.
    pub run_distance_threshold: f64,

    pub graphics: GraphicRules,

    pub profile: ProfileFlags,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            max_nodes: 10_000,
            node_window: 500,
            step_cost: 1.0,
            turn_penalty: 1.5,
            block_height: 16,
            character_height: 16,
            clearance_padding: 2,
            flying_snap_range: 25,
            max_step_count: 5,
            run_distance_threshold: 4.0,
            graphics: GraphicRules::default(),
            profile: ProfileFlags::default(),
        }
    }
}

impl WalkConfig {
    /// Parse a config from JSON. Omitted fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject values the search cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_nodes == 0 {
            return Err(ConfigError::Invalid("max_nodes must be at least 1"));
        }
        if self.node_window < 1 {
            return Err(ConfigError::Invalid("node_window must be at least 1"));
        }
        if self.step_cost.is_nan() || self.step_cost <= 0.0 {
            return Err(ConfigError::Invalid("step_cost must be positive"));
        }
        if self.turn_penalty.is_nan() || self.turn_penalty < 1.0 {
            return Err(ConfigError::Invalid("turn_penalty must be at least 1.0"));
        }
        Ok(())
    }
}
