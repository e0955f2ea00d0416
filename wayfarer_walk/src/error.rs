// Error types for the walk planner.
//
// Expected outcomes (no path, out-of-lattice expansion, exhausted node
// budget, a rejected step) are never errors; they surface as `false` or a
// `TickOutcome`. The enums here cover the remaining cases:
// - `GraphError`: a search-graph invariant was violated. This is a bug in
//   the engine, never a property of the map.
// - `ConfigError` / `MapError`: loading JSON configuration or map fixtures.

use crate::types::Position;
use thiserror::Error;

/// Internal consistency violation in the search graph.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A second node was registered for a position already in the table.
    #[error("node {0} is already registered")]
    AlreadyRegistered(Position),

    /// Costs or parent of a closed node were about to be rewritten.
    #[error("node {0} is closed and cannot be revised")]
    ClosedRevision(Position),

    /// A node was popped and closed twice.
    #[error("node {0} is already closed")]
    AlreadyClosed(Position),

    /// The search origin itself does not fit the node lattice.
    #[error("start {0} lies outside the search lattice")]
    StartOutsideLattice(Position),
}

/// Failure to load a `WalkConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config value: {0}")]
    Invalid(&'static str),
}

/// Failure to build a `TileMap` from a definition.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to read map file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid map JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("map dimensions must be non-zero, got {width}x{height}")]
    EmptyMap { width: u32, height: u32 },

    #[error("object placed at ({x}, {y}) lies outside the map")]
    PlacementOutOfBounds { x: i32, y: i32 },
}
