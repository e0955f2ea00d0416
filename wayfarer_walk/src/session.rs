// Pathfinding session: the planner's public entry point.
//
// A `PathfindingSession` owns everything one autonomous walk needs: the
// walk configuration, the reusable search graph, the route executor and
// the host-facing flags. Only one walk is active at a time; a new request
// cancels the previous one before searching.
//
// The "walk active" flag is an `Arc<AtomicBool>` so that a host thread
// holding a `CancelHandle` can stop a walk without locking the session.
// The search loop polls it before every expansion and `tick` checks it
// before issuing a move. Everything else is behind `&mut self`; hosts that
// search and tick on different threads put the session in one `Mutex`.
//
// See also: `pathfinding.rs` (search), `executor.rs` (per-tick playback).

use crate::avatar::Avatar;
use crate::config::WalkConfig;
use crate::executor::{Route, RouteExecutor, TickOutcome};
use crate::graph::SearchGraph;
use crate::pathfinding::{RouteRequest, SearchStats, find_path};
use crate::step::StepContext;
use crate::types::Position;
use crate::world::WorldView;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, warn};

/// Clonable handle that cancels the session's walk from anywhere.
#[derive(Clone, Debug)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Stop the walk. A search in progress exits at its next expansion.
    pub fn cancel(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_walking(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// One autonomous walker.
pub struct PathfindingSession {
    config: WalkConfig,
    graph: SearchGraph,
    executor: RouteExecutor,
    walking: Arc<AtomicBool>,
    can_be_cancelled: bool,
    movement_blocked: bool,
    force_run: bool,
    last_stats: Option<SearchStats>,
}

impl PathfindingSession {
    pub fn new(config: WalkConfig) -> Self {
        Self {
            config,
            graph: SearchGraph::new(),
            executor: RouteExecutor::new(),
            walking: Arc::new(AtomicBool::new(false)),
            can_be_cancelled: false,
            movement_blocked: false,
            force_run: false,
            last_stats: None,
        }
    }

    pub fn config(&self) -> &WalkConfig {
        &self.config
    }

    /// Plan a route from the avatar's position to within `tolerance` tiles
    /// of `target`. Returns `true` iff a non-empty route was produced; the
    /// first step is issued by the next `tick`.
    pub fn request_route<W, A>(
        &mut self,
        world: &W,
        avatar: &A,
        target: Position,
        tolerance: u32,
    ) -> bool
    where
        W: WorldView + ?Sized,
        A: Avatar + ?Sized,
    {
        let status = avatar.status();
        if status.paralyzed {
            debug!("avatar is paralyzed, route request ignored");
            return false;
        }

        self.cancel();
        self.can_be_cancelled = true;
        if let Err(err) = self.config.validate() {
            warn!(%err, "walk config rejected, route request ignored");
            self.last_stats = None;
            return false;
        }

        let request = RouteRequest {
            start: status.position,
            target,
            tolerance,
        };
        if request.accepts(status.position) {
            debug!(start = %status.position, %target, tolerance, "already at target");
            self.last_stats = None;
            return false;
        }

        self.walking.store(true, Ordering::Release);
        let ctx = StepContext::for_avatar(world, &self.config, &status);
        let searched = find_path(&ctx, &mut self.graph, &request, &self.walking);
        self.graph.clear();

        let outcome = match searched {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(%err, "search graph invariant violated");
                debug_assert!(false, "search graph invariant violated: {err}");
                self.last_stats = None;
                self.cancel();
                return false;
            }
        };
        self.last_stats = Some(outcome.stats);

        match outcome.path {
            Some(path) if !path.steps.is_empty() && self.is_walking() => {
                let run = status.position.planar_distance(target)
                    > self.config.run_distance_threshold;
                debug!(steps = path.steps.len(), run, cost = path.total_cost, "route planned");
                self.executor.load(Route::new(path.steps, run, path.total_cost));
                true
            }
            _ => {
                debug!(start = %status.position, %target, tolerance, "no route");
                self.cancel();
                false
            }
        }
    }

    /// Advance the active route by at most one step.
    pub fn tick<A: Avatar + ?Sized>(&mut self, avatar: &mut A, now_ms: u64) -> TickOutcome {
        if !self.is_walking() {
            self.executor.clear();
            return TickOutcome::Idle;
        }
        if self.movement_blocked {
            return TickOutcome::Waiting;
        }
        let outcome = self.executor.tick(avatar, &self.config, self.force_run, now_ms);
        match outcome {
            TickOutcome::Completed | TickOutcome::Rejected | TickOutcome::Idle => self.cancel(),
            TickOutcome::Waiting | TickOutcome::Walked { .. } => {}
        }
        outcome
    }

    /// Stop the current walk and drop its route. Safe to call at any time.
    pub fn cancel(&mut self) {
        self.walking.store(false, Ordering::Release);
        self.executor.clear();
    }

    pub fn is_walking(&self) -> bool {
        self.walking.load(Ordering::Acquire)
    }

    /// Whether user input may interrupt the current walk. Set on every
    /// request; hosts clear it for scripted walks.
    pub fn can_be_cancelled(&self) -> bool {
        self.can_be_cancelled
    }

    pub fn set_can_be_cancelled(&mut self, value: bool) {
        self.can_be_cancelled = value;
    }

    /// While set, `tick` issues no moves; the route is kept.
    pub fn is_movement_blocked(&self) -> bool {
        self.movement_blocked
    }

    pub fn set_movement_blocked(&mut self, value: bool) {
        self.movement_blocked = value;
    }

    /// Run every step, whatever the route's length.
    pub fn force_run(&self) -> bool {
        self.force_run
    }

    pub fn set_force_run(&mut self, value: bool) {
        self.force_run = value;
    }

    /// The active route, if a walk is in progress.
    pub fn route(&self) -> Option<&Route> {
        if self.is_walking() {
            self.executor.route()
        } else {
            None
        }
    }

    /// Counters of the most recent search.
    pub fn last_stats(&self) -> Option<SearchStats> {
        self.last_stats
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.walking))
    }
}
