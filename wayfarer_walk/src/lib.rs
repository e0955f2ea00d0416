// wayfarer_walk: autonomous walk planner for a tile-based, multi-elevation
// world client.
//
// Given a target tile and a tolerance, the planner searches the map around
// the player's avatar for an elevation-aware route (stairs, bridges, upper
// floors, mode-dependent obstacles) and then plays it back one step per
// game tick, in lockstep with the avatar's step-rate limiter. It never
// owns world state: the map is read through `WorldView` and the avatar is
// driven through `Avatar`, so the crate runs headless in tests and tools.
//
// Module overview:
// - `session.rs`:     PathfindingSession: request/tick/cancel facade, walk flags.
// - `pathfinding.rs`: A* search with direction-change penalty and goal tolerance.
// - `graph.rs`:       SearchGraph: node arena, position index, open set.
// - `step.rs`:        Step validator (`try_step`, `can_walk`) and StepContext.
// - `clearance.rs`:   Vertical clearance of the tile being left.
// - `occupancy.rs`:   Tile occupancy classifier (object stack -> records).
// - `executor.rs`:    Route and RouteExecutor, per-tick playback.
// - `world.rs`:       WorldView trait, world objects, TileMap.
// - `avatar.rs`:      Avatar trait, AvatarStatus, movement mode derivation.
// - `config.rs`:      WalkConfig: all tunables and graphic special cases.
// - `error.rs`:       GraphError, ConfigError, MapError.
// - `types.rs`:       Position, Direction, MovementMode.
//
// The `route_probe` binary (src/bin/route_probe.rs) plans a route on a JSON
// map from the command line.
//
// **Determinism.** Step validation is a pure function of the world snapshot
// and the step context, and the open set breaks cost ties by insertion
// order, so the same request on the same map always yields the same route.

pub mod avatar;
pub mod clearance;
pub mod config;
pub mod error;
pub mod executor;
pub mod graph;
pub mod occupancy;
pub mod pathfinding;
pub mod session;
pub mod step;
pub mod types;
pub mod world;
