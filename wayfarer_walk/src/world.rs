// World collaborator: what the planner reads from the tile map.
//
// The planner never owns world state. It reads tiles through the
// `WorldView` trait: the bottom-to-top stack of objects on a tile, the
// static tile data table, and whether a custom house is being edited.
// World objects are a closed set (`WorldObject`) matched exhaustively by
// the occupancy classifier.
//
// `TileMap` is a dense in-memory `WorldView`, stored as a flat
// `Vec<Vec<WorldObject>>` indexed by `x + y * width`. Out-of-bounds tiles
// read as `None`, which the planner treats as unloaded map. It loads from a
// compact JSON definition (`TileMapDef`: a ground tile, placed objects, and
// a static tile table) and backs the scenario tests, the benchmark, and the
// `route_probe` binary.
//
// Terrain is modelled by its four corner heights. `LandTile` derives the
// values the planner needs (lowest corner, average elevation, whether the
// tile is stretched, and the average elevation seen when entering from a
// given direction) the same way the client's renderer does.
//
// See also: `occupancy.rs` which classifies each `WorldObject`,
// `clearance.rs` which uses `LandTile::directional_average_z`.

use crate::error::MapError;
use crate::types::Direction;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// Tile data
// ---------------------------------------------------------------------------

bitflags! {
    /// Tile data flags shared by land and static graphics.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct TileFlags: u16 {
        const IMPASSABLE = 1 << 0;
        const SURFACE = 1 << 1;
        const BRIDGE = 1 << 2;
        const WET = 1 << 3;
        const NO_DIAGONAL = 1 << 4;
        const DOOR = 1 << 5;
        const INTERNAL = 1 << 6;
    }
}

/// Static tile data for one item/static graphic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticTileData {
    pub flags: TileFlags,
    pub height: i32,
    /// A missing weight reads as heavy.
    #[serde(default = "heavy_weight")]
    pub weight: u8,
}

const fn heavy_weight() -> u8 {
    u8::MAX
}

impl StaticTileData {
    pub const fn new(flags: TileFlags, height: i32) -> Self {
        Self {
            flags,
            height,
            weight: heavy_weight(),
        }
    }

    pub const fn with_weight(mut self, weight: u8) -> Self {
        self.weight = weight;
        self
    }
}

impl Default for StaticTileData {
    fn default() -> Self {
        Self::new(TileFlags::empty(), 0)
    }
}

// ---------------------------------------------------------------------------
// World objects
// ---------------------------------------------------------------------------

/// A terrain tile, described by the heights of its four corners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandTile {
    pub graphic: u16,
    /// Corner heights: `[top, right, bottom, left]`. `top` is the tile's own
    /// elevation; the others are sampled from the east, south-east and south
    /// neighbours.
    pub corners: [i32; 4],
    pub flags: TileFlags,
}

impl LandTile {
    pub const fn new(graphic: u16, corners: [i32; 4], flags: TileFlags) -> Self {
        Self {
            graphic,
            corners,
            flags,
        }
    }

    /// A level tile at elevation `z`.
    pub const fn flat(graphic: u16, z: i32, flags: TileFlags) -> Self {
        Self::new(graphic, [z, z, z, z], flags)
    }

    pub fn z(&self) -> i32 {
        self.corners[0]
    }

    pub fn min_z(&self) -> i32 {
        self.corners.iter().copied().min().unwrap_or(self.corners[0])
    }

    /// Standing elevation: the mean of the flatter diagonal.
    pub fn average_z(&self) -> i32 {
        let [top, right, bottom, left] = self.corners;
        if (top - bottom).abs() <= (left - right).abs() {
            (top + bottom) >> 1
        } else {
            (left + right) >> 1
        }
    }

    /// A stretched tile is drawn as a slope rather than a flat diamond.
    pub fn is_stretched(&self) -> bool {
        self.corners.iter().any(|&c| c != self.corners[0])
    }

    /// Elevation of the slope edge facing `direction`. Diagonal directions
    /// point at a single corner; cardinal ones average two adjacent corners.
    pub fn directional_average_z(&self, direction: Direction) -> i32 {
        let d = usize::from(direction.index());
        let result = self.corners[((d >> 1) + 1) & 3];
        if d & 1 != 0 {
            result
        } else {
            (result + self.corners[d >> 1]) >> 1
        }
    }
}

/// A map static (fixed decoration, wall, floor piece).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticObject {
    pub graphic: u16,
    pub z: i32,
}

/// A dynamic item lying on the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemObject {
    pub serial: u32,
    pub graphic: u16,
    pub z: i32,
    #[serde(default)]
    pub locked: bool,
    /// Placeholder item standing in for a whole multi-tile structure.
    #[serde(default)]
    pub multi: bool,
}

bitflags! {
    /// Custom-house state carried by a multi component.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct MultiState: u8 {
        const GENERIC_INTERNAL = 1 << 0;
        const IGNORE_IN_RENDER = 1 << 1;
    }
}

/// One component of a multi-tile structure (house, boat).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiObject {
    pub graphic: u16,
    pub z: i32,
    /// Part of a player-designed custom house.
    #[serde(default)]
    pub custom: bool,
    /// Placement preview shown before a house is built.
    #[serde(default)]
    pub preview: bool,
    #[serde(default = "MultiState::empty")]
    pub state: MultiState,
}

/// Another creature standing on the tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MobileObject {
    pub serial: u32,
    pub z: i32,
    #[serde(default)]
    pub dead: bool,
    /// The creature never blocks others (e.g. a hidden game master).
    #[serde(default)]
    pub ignores_characters: bool,
}

/// Everything that can occupy a map tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldObject {
    Land(LandTile),
    Static(StaticObject),
    Item(ItemObject),
    Multi(MultiObject),
    Mobile(MobileObject),
    /// Visual effect; never affects movement.
    Effect { z: i32 },
}

impl WorldObject {
    /// Elevation used to order the tile stack.
    pub fn z(&self) -> i32 {
        match self {
            WorldObject::Land(land) => land.z(),
            WorldObject::Static(s) => s.z,
            WorldObject::Item(item) => item.z,
            WorldObject::Multi(multi) => multi.z,
            WorldObject::Mobile(mobile) => mobile.z,
            WorldObject::Effect { z } => *z,
        }
    }
}

/// Rectangle of a custom house under edit, inclusive on both corners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditArea {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl EditArea {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
    }
}

// ---------------------------------------------------------------------------
// WorldView trait
// ---------------------------------------------------------------------------

/// Read-only access to the map, as consumed by the planner.
pub trait WorldView {
    /// Objects on the tile at `(x, y)`, bottom to top. `None` for tiles that
    /// are not loaded or lie outside the map.
    fn tile(&self, x: i32, y: i32) -> Option<&[WorldObject]>;

    /// Tile data for a static/item graphic.
    fn static_data(&self, graphic: u16) -> StaticTileData;

    /// The area of a custom house currently being edited, if any.
    fn custom_house(&self) -> Option<EditArea> {
        None
    }
}

// ---------------------------------------------------------------------------
// TileMap
// ---------------------------------------------------------------------------

/// Dense in-memory tile map.
#[derive(Clone, Debug)]
pub struct TileMap {
    /// Flat storage: index = x + y * width.
    stacks: Vec<Vec<WorldObject>>,
    width: u32,
    height: u32,
    statics: BTreeMap<u16, StaticTileData>,
    edit_area: Option<EditArea>,
}

impl TileMap {
    /// Create a `width` x `height` map covered by `ground`.
    pub fn new(width: u32, height: u32, ground: LandTile) -> Self {
        let total = (width as usize) * (height as usize);
        Self {
            stacks: vec![vec![WorldObject::Land(ground)]; total],
            width,
            height,
            statics: BTreeMap::new(),
            edit_area: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.in_bounds(x, y)
            .then(|| x as usize + y as usize * self.width as usize)
    }

    /// Register tile data for a static/item graphic.
    pub fn define_static(&mut self, graphic: u16, data: StaticTileData) {
        self.statics.insert(graphic, data);
    }

    /// Place an object, keeping the stack ordered by elevation. Objects at
    /// the same elevation keep insertion order. Returns `false` (and places
    /// nothing) when `(x, y)` lies outside the map.
    pub fn place(&mut self, x: i32, y: i32, object: WorldObject) -> bool {
        let Some(i) = self.index(x, y) else {
            return false;
        };
        let stack = &mut self.stacks[i];
        let at = stack.partition_point(|o| o.z() <= object.z());
        stack.insert(at, object);
        true
    }

    /// Replace the terrain of a tile. No-op outside the map.
    pub fn set_land(&mut self, x: i32, y: i32, land: LandTile) {
        if let Some(i) = self.index(x, y) {
            self.stacks[i].retain(|o| !matches!(o, WorldObject::Land(_)));
            self.place(x, y, WorldObject::Land(land));
        }
    }

    pub fn set_edit_area(&mut self, area: Option<EditArea>) {
        self.edit_area = area;
    }

    /// Build a map from its JSON-friendly definition.
    pub fn from_def(def: TileMapDef) -> Result<Self, MapError> {
        if def.width == 0 || def.height == 0 {
            return Err(MapError::EmptyMap {
                width: def.width,
                height: def.height,
            });
        }
        let mut map = Self::new(def.width, def.height, def.ground);
        map.statics = def.statics;
        map.edit_area = def.edit_area;
        for placed in def.objects {
            match placed.object {
                WorldObject::Land(land) if map.in_bounds(placed.x, placed.y) => {
                    map.set_land(placed.x, placed.y, land);
                }
                object => {
                    if !map.place(placed.x, placed.y, object) {
                        return Err(MapError::PlacementOutOfBounds {
                            x: placed.x,
                            y: placed.y,
                        });
                    }
                }
            }
        }
        Ok(map)
    }

    pub fn from_json(json: &str) -> Result<Self, MapError> {
        let def: TileMapDef = serde_json::from_str(json)?;
        Self::from_def(def)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

impl WorldView for TileMap {
    fn tile(&self, x: i32, y: i32) -> Option<&[WorldObject]> {
        self.index(x, y).map(|i| self.stacks[i].as_slice())
    }

    fn static_data(&self, graphic: u16) -> StaticTileData {
        self.statics.get(&graphic).copied().unwrap_or_default()
    }

    fn custom_house(&self) -> Option<EditArea> {
        self.edit_area
    }
}

/// An object placed at a map coordinate in a `TileMapDef`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlacedObject {
    pub x: i32,
    pub y: i32,
    pub object: WorldObject,
}

/// JSON definition of a `TileMap`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileMapDef {
    pub width: u32,
    pub height: u32,
    /// Terrain covering every tile not overridden in `objects`.
    pub ground: LandTile,
    /// Land entries replace the ground; everything else is stacked on top.
    #[serde(default)]
    pub objects: Vec<PlacedObject>,
    #[serde(default)]
    pub statics: BTreeMap<u16, StaticTileData>,
    #[serde(default)]
    pub edit_area: Option<EditArea>,
}
