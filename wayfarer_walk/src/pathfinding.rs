// A* route search over the tile map.
//
// The search graph is built lazily: the start node is registered and
// closed, then each expansion asks the step validator (`can_walk`) for
// all eight neighbours of the current node. Accepted neighbours are
// inserted into, or revised in, the `SearchGraph`; the cheapest open node
// is expanded next. The heuristic is the straight-line (x, y) distance to
// the target.
//
// Step costs: a cardinal step costs `step_cost`, a diagonal `√2 ·
// step_cost`, and either is multiplied by `turn_penalty` when it changes
// direction from the step before it. The start node has no direction, so
// the first step is never penalised. This biases routes toward long
// straight runs.
//
// Any node created or revised within `tolerance` of the target becomes a
// goal candidate; the cheapest candidate is kept. The goal is confirmed
// once no open node is cheaper than it. The search also stops when the
// open set runs dry, when `max_nodes` nodes have been closed (the best
// candidate so far is still used), or when the walk flag is cleared from
// another thread.
//
// See also: `graph.rs` for node storage and the open set, `step.rs` for
// step validation, `session.rs` which turns the result into a `Route`.

use crate::error::GraphError;
use crate::executor::RouteStep;
use crate::graph::{NewNode, NodeHandle, SearchGraph};
use crate::step::{StepContext, can_walk};
use crate::types::{Direction, Position};
use crate::world::WorldView;
use serde::{Deserialize, Serialize};
use std::f64::consts::SQRT_2;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Where to search from and to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub start: Position,
    pub target: Position,
    /// Any position within this (x, y) distance of `target` is a goal.
    pub tolerance: u32,
}

impl RouteRequest {
    /// Whether `position` satisfies the request.
    pub fn accepts(&self, position: Position) -> bool {
        position.planar_distance(self.target) <= f64::from(self.tolerance)
    }
}

/// Counters from one search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Nodes created, including the start node.
    pub opened: usize,
    /// Nodes expanded, including the start node.
    pub closed: usize,
    pub goal_found: bool,
    /// The walk flag was cleared while searching.
    pub cancelled: bool,
}

/// A path from the start (exclusive) to the goal (inclusive).
#[derive(Clone, Debug, PartialEq)]
pub struct FoundPath {
    pub steps: Vec<RouteStep>,
    /// Accumulated step cost, direction penalties included.
    pub total_cost: f64,
}

/// Result of a search that kept the graph consistent.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchOutcome {
    pub path: Option<FoundPath>,
    pub stats: SearchStats,
}

/// Cost of a step of base cost `cost` in `direction`, following a step in
/// `parent_direction`.
pub fn turn_cost(
    cost: f64,
    parent_direction: Option<Direction>,
    direction: Direction,
    turn_penalty: f64,
) -> f64 {
    match parent_direction {
        Some(parent) if parent != direction => cost * turn_penalty,
        _ => cost,
    }
}

/// Run A* for `request`. The graph is reset first and left populated so
/// the caller can inspect it; `active` is polled before every expansion.
///
/// Returns `Err` only when the graph detects an internal inconsistency.
pub fn find_path<W: WorldView + ?Sized>(
    ctx: &StepContext<'_, W>,
    graph: &mut SearchGraph,
    request: &RouteRequest,
    active: &AtomicBool,
) -> Result<SearchOutcome, GraphError> {
    let config = ctx.config;
    graph.reset(request.start, config.node_window);

    let start = graph
        .insert(NewNode {
            position: request.start,
            direction: None,
            parent: None,
            start_cost: 0.0,
            heuristic: request.start.planar_distance(request.target),
        })?
        .ok_or(GraphError::StartOutsideLattice(request.start))?;
    graph.close(start)?;

    let mut goal: Option<NodeHandle> = None;
    let mut cancelled = false;
    let mut current = start;

    loop {
        if !active.load(Ordering::Acquire) {
            cancelled = true;
            break;
        }

        expand(ctx, graph, request, current, &mut goal)?;

        if graph.closed_count() >= config.max_nodes {
            break;
        }
        let Some(next) = graph.pop_cheapest() else {
            break;
        };
        if goal.is_some_and(|g| graph.node(g).total <= graph.node(next).total) {
            break;
        }
        graph.close(next)?;
        current = next;
    }

    let stats = SearchStats {
        opened: graph.len(),
        closed: graph.closed_count(),
        goal_found: goal.is_some() && !cancelled,
        cancelled,
    };
    let path = match goal {
        Some(goal) if !cancelled => Some(build_path(graph, goal)),
        _ => None,
    };

    debug!(
        start = %request.start,
        target = %request.target,
        tolerance = request.tolerance,
        opened = stats.opened,
        closed = stats.closed,
        steps = path.as_ref().map_or(0, |p| p.steps.len()),
        cancelled,
        "route search finished"
    );

    Ok(SearchOutcome { path, stats })
}

/// Open or revise every neighbour of `current` the step validator accepts.
fn expand<W: WorldView + ?Sized>(
    ctx: &StepContext<'_, W>,
    graph: &mut SearchGraph,
    request: &RouteRequest,
    current: NodeHandle,
    goal: &mut Option<NodeHandle>,
) -> Result<(), GraphError> {
    let config = ctx.config;
    let (from, from_direction, from_cost) = {
        let node = graph.node(current);
        (node.position, node.direction, node.start_cost)
    };

    for direction in Direction::ALL {
        let Some(outcome) = can_walk(ctx, direction, from) else {
            continue;
        };
        // Substituted corner moves are found by their own direction.
        if outcome.direction != direction {
            continue;
        }
        let intended = from.offset(direction);
        if (outcome.position.x, outcome.position.y) != (intended.x, intended.y) {
            continue;
        }

        let base = if direction.is_diagonal() {
            config.step_cost * SQRT_2
        } else {
            config.step_cost
        };
        let start_cost =
            from_cost + turn_cost(base, from_direction, direction, config.turn_penalty);

        let touched = match graph.find(outcome.position) {
            Some(existing) if graph.node(existing).closed => None,
            Some(existing) => graph
                .revise(existing, current, direction, start_cost)?
                .then_some(existing),
            None => graph.insert(NewNode {
                position: outcome.position,
                direction: Some(direction),
                parent: Some(current),
                start_cost,
                heuristic: outcome.position.planar_distance(request.target),
            })?,
        };

        if let Some(handle) = touched {
            let node = graph.node(handle);
            if request.accepts(node.position)
                && goal.is_none_or(|g| graph.node(g).total > node.total)
            {
                *goal = Some(handle);
            }
        }
    }
    Ok(())
}

fn build_path(graph: &SearchGraph, goal: NodeHandle) -> FoundPath {
    let steps = graph
        .path_to(goal)
        .into_iter()
        .filter_map(|handle| {
            let node = graph.node(handle);
            node.direction.map(|direction| RouteStep {
                position: node.position,
                direction,
            })
        })
        .collect();
    FoundPath {
        steps,
        total_cost: graph.node(goal).start_cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WalkConfig;
    use crate::types::MovementMode;
    use crate::world::{LandTile, StaticObject, StaticTileData, TileFlags, TileMap, WorldObject};

    const GRASS: u16 = 0x0003;
    const WALL: u16 = 0x0080;

    fn open_map(size: u32) -> TileMap {
        let mut map = TileMap::new(size, size, LandTile::flat(GRASS, 0, TileFlags::empty()));
        map.define_static(WALL, StaticTileData::new(TileFlags::IMPASSABLE, 20));
        map
    }

    fn wall(map: &mut TileMap, x: i32, y: i32) {
        map.place(x, y, WorldObject::Static(StaticObject { graphic: WALL, z: 0 }));
    }

    fn search(map: &TileMap, config: &WalkConfig, request: RouteRequest) -> SearchOutcome {
        let ctx = StepContext::new(map, config, MovementMode::Normal);
        let mut graph = SearchGraph::new();
        find_path(&ctx, &mut graph, &request, &AtomicBool::new(true)).unwrap()
    }

    fn request(start: (i32, i32), target: (i32, i32), tolerance: u32) -> RouteRequest {
        RouteRequest {
            start: Position::new(start.0, start.1, 0),
            target: Position::new(target.0, target.1, 0),
            tolerance,
        }
    }

    #[test]
    fn straight_line_has_no_turns() {
        let map = open_map(16);
        let config = WalkConfig::default();
        let outcome = search(&map, &config, request((2, 2), (5, 2), 0));
        let path = outcome.path.unwrap();
        let dirs: Vec<Direction> = path.steps.iter().map(|s| s.direction).collect();
        assert_eq!(dirs, vec![Direction::East; 3]);
        assert_eq!(path.total_cost, 3.0);
        assert_eq!(path.steps.last().unwrap().position, Position::new(5, 2, 0));
        assert!(outcome.stats.goal_found);
    }

    fn sequence_cost(directions: &[Direction]) -> f64 {
        let mut previous = None;
        let mut total = 0.0;
        for &direction in directions {
            total += turn_cost(1.0, previous, direction, 1.5);
            previous = Some(direction);
        }
        total
    }

    #[test]
    fn turn_penalty_applies_on_direction_change() {
        use Direction::{East, South};
        assert_eq!(turn_cost(1.0, None, East, 1.5), 1.0);
        assert_eq!(turn_cost(1.0, Some(East), East, 1.5), 1.0);
        assert_eq!(turn_cost(1.0, Some(East), South, 1.5), 1.5);

        assert_eq!(sequence_cost(&[East, East, South, South]), 4.5);
        assert_eq!(sequence_cost(&[East, South, East, South]), 5.5);
    }

    #[test]
    fn search_prefers_fewer_turns() {
        let map = open_map(16);
        let config = WalkConfig::default();
        // Two diagonals then one cardinal turn beats any route that
        // alternates directions.
        let path = search(&map, &config, request((2, 2), (5, 4), 0)).path.unwrap();
        let dirs: Vec<Direction> = path.steps.iter().map(|s| s.direction).collect();
        assert_eq!(
            dirs,
            vec![Direction::SouthEast, Direction::SouthEast, Direction::East]
        );
        assert!((path.total_cost - (2.0 * SQRT_2 + 1.5)).abs() < 1e-9);
    }

    #[test]
    fn diagonal_run_costs_root_two_per_step() {
        let map = open_map(16);
        let config = WalkConfig::default();
        let path = search(&map, &config, request((2, 2), (4, 4), 0)).path.unwrap();
        let dirs: Vec<Direction> = path.steps.iter().map(|s| s.direction).collect();
        assert_eq!(dirs, vec![Direction::SouthEast; 2]);
        assert!((path.total_cost - 2.0 * SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn detours_around_a_wall() {
        let mut map = open_map(16);
        for y in 0..6 {
            wall(&mut map, 5, y);
        }
        let config = WalkConfig::default();
        let path = search(&map, &config, request((2, 2), (8, 2), 0)).path.unwrap();
        assert_eq!(path.steps.last().unwrap().position, Position::new(8, 2, 0));
        assert!(path.steps.iter().all(|s| s.position.x != 5 || s.position.y >= 6));
        // Every step moves exactly one tile.
        let mut at = Position::new(2, 2, 0);
        for step in &path.steps {
            assert_eq!(at.offset(step.direction), Position::new(step.position.x, step.position.y, 0));
            at = step.position;
        }
    }

    #[test]
    fn diagonals_never_cut_a_walled_corner() {
        let mut map = open_map(16);
        wall(&mut map, 5, 5);
        let config = WalkConfig::default();
        let blocked = Position::new(5, 5, 0);

        for target in [(5, 6), (6, 6), (6, 4), (7, 3)] {
            let path = search(&map, &config, request((4, 5), target, 0)).path.unwrap();
            let mut at = Position::new(4, 5, 0);
            for step in &path.steps {
                if step.direction.is_diagonal() {
                    let cw = at.offset(step.direction.clockwise());
                    let ccw = at.offset(step.direction.counter_clockwise());
                    assert_ne!(cw, blocked, "{target:?}: {} from {at:?}", step.direction);
                    assert_ne!(ccw, blocked, "{target:?}: {} from {at:?}", step.direction);
                }
                at = step.position;
            }
            assert_eq!(at, Position::new(target.0, target.1, 0));
        }

        // South-east would clip the wall, so the route goes around it.
        let path = search(&map, &config, request((4, 5), (5, 6), 0)).path.unwrap();
        let dirs: Vec<Direction> = path.steps.iter().map(|s| s.direction).collect();
        assert_eq!(dirs, vec![Direction::South, Direction::East]);
        assert_eq!(path.total_cost, 2.5);
    }

    #[test]
    fn enclosed_target_has_no_path() {
        let mut map = open_map(16);
        for (x, y) in [(9, 9), (10, 9), (11, 9), (9, 10), (11, 10), (9, 11), (10, 11), (11, 11)] {
            wall(&mut map, x, y);
        }
        let config = WalkConfig::default();
        let outcome = search(&map, &config, request((2, 2), (10, 10), 0));
        assert!(outcome.path.is_none());
        assert!(!outcome.stats.goal_found);
        // Every reachable tile was expanded: 256 tiles minus the ring and its centre.
        assert_eq!(outcome.stats.closed, 256 - 9);
    }

    #[test]
    fn tolerance_stops_short() {
        let mut map = open_map(16);
        wall(&mut map, 10, 2);
        let config = WalkConfig::default();
        let outcome = search(&map, &config, request((2, 2), (10, 2), 2));
        let path = outcome.path.unwrap();
        let end = path.steps.last().unwrap().position;
        assert!(end.planar_distance(Position::new(10, 2, 0)) <= 2.0);
        assert_eq!(end, Position::new(8, 2, 0));
    }

    #[test]
    fn node_budget_is_exact() {
        let mut map = open_map(64);
        for (x, y) in [(59, 59), (60, 59), (61, 59), (59, 60), (61, 60), (59, 61), (60, 61), (61, 61)] {
            wall(&mut map, x, y);
        }
        let config = WalkConfig {
            max_nodes: 100,
            ..WalkConfig::default()
        };
        let outcome = search(&map, &config, request((2, 2), (60, 60), 0));
        assert_eq!(outcome.stats.closed, 100);
        assert!(outcome.path.is_none());
    }

    #[test]
    fn budget_exhaustion_keeps_best_candidate() {
        let map = open_map(32);
        let config = WalkConfig {
            max_nodes: 3,
            turn_penalty: 10.0,
            ..WalkConfig::default()
        };
        // Every route to (12, 11) turns once, so the goal stays costlier than
        // the open frontier and is never confirmed within three expansions.
        let outcome = search(&map, &config, request((10, 10), (12, 11), 0));
        assert_eq!(outcome.stats.closed, 3);
        let path = outcome.path.unwrap();
        let dirs: Vec<Direction> = path.steps.iter().map(|s| s.direction).collect();
        // Found first via (11, 10), then revised through the cheaper (11, 11).
        assert_eq!(dirs, vec![Direction::SouthEast, Direction::East]);
        assert!((path.total_cost - (SQRT_2 + 10.0)).abs() < 1e-9);
    }

    #[test]
    fn lattice_window_bounds_the_search() {
        let map = open_map(64);
        let config = WalkConfig {
            node_window: 10,
            ..WalkConfig::default()
        };
        // Target lies beyond the lattice edge (start + 5).
        let outcome = search(&map, &config, request((20, 20), (30, 20), 0));
        assert!(outcome.path.is_none());
        assert_eq!(outcome.stats.closed, 100);
    }

    #[test]
    fn cleared_flag_cancels_search() {
        let map = open_map(16);
        let config = WalkConfig::default();
        let ctx = StepContext::new(&map, &config, MovementMode::Normal);
        let mut graph = SearchGraph::new();
        let outcome = find_path(
            &ctx,
            &mut graph,
            &request((2, 2), (10, 2), 0),
            &AtomicBool::new(false),
        )
        .unwrap();
        assert!(outcome.path.is_none());
        assert!(outcome.stats.cancelled);
        assert_eq!(outcome.stats.closed, 1);
    }

    #[test]
    fn no_position_is_expanded_twice() {
        let mut map = open_map(24);
        for y in 2..20 {
            wall(&mut map, 12, y);
        }
        let config = WalkConfig::default();
        let ctx = StepContext::new(&map, &config, MovementMode::Normal);
        let mut graph = SearchGraph::new();
        find_path(&ctx, &mut graph, &request((4, 10), (20, 10), 0), &AtomicBool::new(true))
            .unwrap();
        let mut seen = std::collections::HashSet::new();
        for node in graph.nodes() {
            assert!(seen.insert(node.position), "duplicate node at {}", node.position);
            assert!((node.total - (node.start_cost + node.heuristic)).abs() < 1e-9);
            assert!(node.start_cost >= 0.0);
        }
    }
}
