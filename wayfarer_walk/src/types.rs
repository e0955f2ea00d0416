// Core types shared across the walk planner.
//
// Defines map positions (`Position`), the eight compass directions a mover
// can step in (`Direction`), and the movement modes that change which
// objects block a step (`MovementMode`). All types derive `Serialize` and
// `Deserialize` so routes and map fixtures can be dumped as JSON.
//
// Map axes follow the world client's conventions:
// - X: east  (positive) / west  (negative)
// - Y: south (positive) / north (negative)
// - Z: elevation, a signed byte range in game data (-128..=127)
//
// See also: `world.rs` for the tile stacks positions index into,
// `step.rs` for how a `Direction` turns into a validated step.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A map position. Two positions with equal `(x, y, z)` are the same search
/// node; `z` is part of identity because one `(x, y)` column can host
/// several walkable elevations (bridges, stairs, upper floors).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Straight-line distance over the map plane, ignoring elevation.
    pub fn planar_distance(self, other: Self) -> f64 {
        let dx = f64::from(other.x - self.x);
        let dy = f64::from(other.y - self.y);
        (dx * dx + dy * dy).sqrt()
    }

    /// The `(x, y)` one step away in `direction`, keeping this elevation.
    pub fn offset(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self::new(self.x + dx, self.y + dy, self.z)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// One of the eight step directions, numbered clockwise from north the way
/// the game protocol numbers them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    North = 0,
    NorthEast = 1,
    East = 2,
    SouthEast = 3,
    South = 4,
    SouthWest = 5,
    West = 6,
    NorthWest = 7,
}

impl Direction {
    /// All directions in protocol order. Search expansion iterates this.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Direction for a protocol index. Only the low three bits are used.
    pub const fn from_index(index: u8) -> Self {
        Self::ALL[(index & 7) as usize]
    }

    pub const fn index(self) -> u8 {
        self as u8
    }

    pub const fn is_diagonal(self) -> bool {
        self.index() % 2 == 1
    }

    /// `(dx, dy)` of one step in this direction.
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }

    pub const fn opposite(self) -> Self {
        Self::from_index(self.index() ^ 4)
    }

    /// The next direction clockwise (one eighth turn).
    pub const fn clockwise(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    /// The next direction counter-clockwise (one eighth turn).
    pub const fn counter_clockwise(self) -> Self {
        Self::from_index(self.index() + 7)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "N",
            Direction::NorthEast => "NE",
            Direction::East => "E",
            Direction::SouthEast => "SE",
            Direction::South => "S",
            Direction::SouthWest => "SW",
            Direction::West => "W",
            Direction::NorthWest => "NW",
        };
        f.pad(name)
    }
}

// ---------------------------------------------------------------------------
// Movement modes
// ---------------------------------------------------------------------------

/// How the avatar is currently moving. The mode changes which terrain and
/// objects count as obstacles during occupancy classification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementMode {
    /// Walking or riding an ordinary mount.
    #[default]
    Normal,
    /// Ghost or game-master body: doors, light items and some statics stop
    /// blocking, and other creatures are ignored.
    DeadOrGm,
    /// Riding a sea creature: only wet tiles are walkable.
    OnSeaHorse,
    /// Gargoyle flight: no-diagonal tiles snap to their surface elevation.
    Flying,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_indices_roundtrip() {
        for (i, dir) in Direction::ALL.iter().enumerate() {
            assert_eq!(dir.index() as usize, i);
            assert_eq!(Direction::from_index(i as u8), *dir);
        }
        // High bits are masked off.
        assert_eq!(Direction::from_index(10), Direction::East);
    }

    #[test]
    fn opposite_directions_cancel_offsets() {
        for dir in Direction::ALL {
            let (dx, dy) = dir.offset();
            let (ox, oy) = dir.opposite().offset();
            assert_eq!((dx + ox, dy + oy), (0, 0), "{dir} vs {}", dir.opposite());
        }
    }

    #[test]
    fn diagonal_neighbours_are_cardinal() {
        for dir in Direction::ALL.into_iter().filter(|d| d.is_diagonal()) {
            assert!(!dir.clockwise().is_diagonal());
            assert!(!dir.counter_clockwise().is_diagonal());
        }
        assert_eq!(Direction::NorthWest.clockwise(), Direction::North);
        assert_eq!(Direction::North.counter_clockwise(), Direction::NorthWest);
    }

    #[test]
    fn planar_distance_ignores_elevation() {
        let a = Position::new(100, 100, 0);
        let b = Position::new(103, 104, 40);
        assert_eq!(a.planar_distance(b), 5.0);
        assert_eq!(b.planar_distance(a), 5.0);
    }

    #[test]
    fn offset_keeps_elevation() {
        let p = Position::new(5, 5, 12);
        assert_eq!(p.offset(Direction::SouthWest), Position::new(4, 6, 12));
    }

    #[test]
    fn direction_serialization_roundtrip() {
        let json = serde_json::to_string(&Direction::SouthEast).unwrap();
        let restored: Direction = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, Direction::SouthEast);
    }
}
