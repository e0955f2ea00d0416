// Route execution, one step per game tick.
//
// A `Route` is the frozen result of a search: the steps from the start
// (exclusive) to the goal (inclusive), a cursor to the next unexecuted
// step, and whether to run. `RouteExecutor` owns the current route and is
// polled once per tick. A tick only issues a move when the avatar is in
// the world and its step limiter has room; the avatar turns in place when
// it is not yet facing the step direction, so the cursor only advances
// once the facing already matches.
//
// The executor never decides whether a walk is active; `session.rs` gates
// ticks on the session's walk flag and clears it on completion or
// rejection.

use crate::avatar::Avatar;
use crate::config::WalkConfig;
use crate::types::{Direction, Position};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// One step of a route: the direction to move and where it lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStep {
    pub position: Position,
    pub direction: Direction,
}

/// A planned route and its progress.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    steps: Vec<RouteStep>,
    cursor: usize,
    run: bool,
    total_cost: f64,
}

impl Route {
    pub fn new(steps: Vec<RouteStep>, run: bool, total_cost: f64) -> Self {
        Self {
            steps,
            cursor: 0,
            run,
            total_cost,
        }
    }

    pub fn steps(&self) -> &[RouteStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Index of the next unexecuted step.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn next_step(&self) -> Option<&RouteStep> {
        self.steps.get(self.cursor)
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.steps.len()
    }

    pub fn run(&self) -> bool {
        self.run
    }

    /// Path cost of the search that produced this route.
    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    /// Final position of the route, if it has any steps.
    pub fn destination(&self) -> Option<Position> {
        self.steps.last().map(|s| s.position)
    }
}

/// What a single tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// No route loaded.
    Idle,
    /// The avatar is not ready for another step this tick.
    Waiting,
    /// A walk request was accepted. `advanced` is false when the request
    /// only turned the avatar toward the step.
    Walked { direction: Direction, advanced: bool },
    /// Every step has been issued; the route was dropped.
    Completed,
    /// The avatar refused the step; the route was dropped.
    Rejected,
}

/// Plays a `Route` back through an `Avatar`.
#[derive(Clone, Debug, Default)]
pub struct RouteExecutor {
    route: Option<Route>,
}

impl RouteExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, route: Route) {
        self.route = Some(route);
    }

    pub fn clear(&mut self) {
        self.route = None;
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    /// Issue at most one step. `force_run` runs regardless of the route's
    /// own run flag.
    pub fn tick<A: Avatar + ?Sized>(
        &mut self,
        avatar: &mut A,
        config: &WalkConfig,
        force_run: bool,
        now_ms: u64,
    ) -> TickOutcome {
        let Some(route) = self.route.as_mut() else {
            return TickOutcome::Idle;
        };
        if !avatar.in_world() || !avatar.limiter().allows_step(config.max_step_count, now_ms) {
            return TickOutcome::Waiting;
        }

        let Some(step) = route.steps.get(route.cursor).copied() else {
            debug!(steps = route.steps.len(), "route completed");
            self.route = None;
            return TickOutcome::Completed;
        };

        let (_, facing) = avatar.end_position();
        let advanced = facing == step.direction;
        if advanced {
            route.cursor += 1;
        }

        let run = route.run || force_run;
        if !avatar.walk(step.direction, run) {
            warn!(
                direction = %step.direction,
                position = %step.position,
                "step rejected, cancelling walk"
            );
            self.route = None;
            return TickOutcome::Rejected;
        }

        trace!(
            direction = %step.direction,
            cursor = route.cursor,
            run,
            "walk issued"
        );
        TickOutcome::Walked {
            direction: step.direction,
            advanced,
        }
    }
}
