// Test-only avatar for end-to-end walk scenarios.
//
// `TestWalker` owns a `TileMap` and plays the part of both the player
// avatar and the game server: every step request is validated with the
// real step rules (`can_walk`) against the walker's own map, so a route
// that the planner produced is executed exactly as the live client would
// execute it. Tests can change the map after planning, refuse steps, or
// throttle the step limiter to exercise the executor's gating.
//
// The only test-specific code here is the bookkeeping (`WalkEvent` log,
// simulated clock, step acknowledgements). Planning and step validation
// use the same code paths as the client.
//
// See also: `tests/scenarios.rs` for the scenarios.

use wayfarer_walk::avatar::{Avatar, AvatarStatus, StepLimiter};
use wayfarer_walk::config::WalkConfig;
use wayfarer_walk::executor::TickOutcome;
use wayfarer_walk::session::PathfindingSession;
use wayfarer_walk::step::{StepContext, can_walk};
use wayfarer_walk::types::{Direction, Position};
use wayfarer_walk::world::{
    LandTile, MobileObject, StaticObject, StaticTileData, TileFlags, TileMap, WorldObject,
};

pub const GRASS: u16 = 0x0003;
pub const WATER: u16 = 0x00A8;
pub const WALL: u16 = 0x0080;
pub const FLOOR: u16 = 0x0495;
pub const STAIR: u16 = 0x0750;

/// Simulated time between two ticks.
pub const TICK_MS: u64 = 100;

/// A flat grass map with the scenario statics defined: an impassable
/// 20-high `WALL`, a zero-height `FLOOR` surface and a 10-high `STAIR`
/// bridge (stood on at half height).
pub fn flat_map(width: u32, height: u32) -> TileMap {
    let mut map = TileMap::new(width, height, LandTile::flat(GRASS, 0, TileFlags::empty()));
    map.define_static(WALL, StaticTileData::new(TileFlags::IMPASSABLE, 20));
    map.define_static(FLOOR, StaticTileData::new(TileFlags::SURFACE, 0));
    map.define_static(
        STAIR,
        StaticTileData::new(TileFlags::SURFACE | TileFlags::BRIDGE, 10),
    );
    map
}

pub fn place_wall(map: &mut TileMap, x: i32, y: i32) {
    map.place(x, y, WorldObject::Static(StaticObject { graphic: WALL, z: 0 }));
}

pub fn place_static(map: &mut TileMap, graphic: u16, x: i32, y: i32, z: i32) {
    map.place(x, y, WorldObject::Static(StaticObject { graphic, z }));
}

pub fn place_mobile(map: &mut TileMap, serial: u32, x: i32, y: i32) {
    map.place(
        x,
        y,
        WorldObject::Mobile(MobileObject {
            serial,
            z: 0,
            dead: false,
            ignores_characters: false,
        }),
    );
}

/// Wall in every tile of the 3x3 ring around `(cx, cy)`, leaving the centre.
pub fn enclose(map: &mut TileMap, cx: i32, cy: i32) {
    for dy in -1..=1 {
        for dx in -1..=1 {
            if (dx, dy) != (0, 0) {
                place_wall(map, cx + dx, cy + dy);
            }
        }
    }
}

/// What the walker did with one `walk` request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkEvent {
    Turned(Direction),
    Stepped {
        direction: Direction,
        to: Position,
        run: bool,
    },
    Refused(Direction),
}

/// Avatar and server stand-in that moves on its own `TileMap`.
pub struct TestWalker {
    pub map: TileMap,
    pub config: WalkConfig,
    pub status: AvatarStatus,
    pub facing: Direction,
    pub limiter: StepLimiter,
    pub in_world: bool,
    /// Delay the limiter imposes after each step.
    pub step_delay_ms: u64,
    /// Acknowledge steps immediately instead of leaving them in flight.
    pub auto_confirm: bool,
    /// Refuse every step request after this many accepted steps.
    pub refuse_after: Option<usize>,
    pub log: Vec<WalkEvent>,
    clock_ms: u64,
}

impl TestWalker {
    pub fn new(map: TileMap, position: Position, facing: Direction) -> Self {
        Self {
            map,
            config: WalkConfig::default(),
            status: AvatarStatus::standing_at(position),
            facing,
            limiter: StepLimiter::default(),
            in_world: true,
            step_delay_ms: 0,
            auto_confirm: true,
            refuse_after: None,
            log: Vec::new(),
            clock_ms: 0,
        }
    }

    pub fn position(&self) -> Position {
        self.status.position
    }

    pub fn now_ms(&self) -> u64 {
        self.clock_ms
    }

    pub fn steps_taken(&self) -> usize {
        self.log
            .iter()
            .filter(|e| matches!(e, WalkEvent::Stepped { .. }))
            .count()
    }

    pub fn stepped_positions(&self) -> Vec<Position> {
        self.log
            .iter()
            .filter_map(|e| match e {
                WalkEvent::Stepped { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }

    /// Plan a route from the walker's position on its own map.
    pub fn request(
        &self,
        session: &mut PathfindingSession,
        target: Position,
        tolerance: u32,
    ) -> bool {
        session.request_route(&self.map, self, target, tolerance)
    }

    /// Acknowledge every step in flight.
    pub fn confirm_steps(&mut self) {
        self.limiter.steps_count = 0;
    }

    /// Tick the session until it stops walking or `max_ticks` have passed.
    /// Returns every tick outcome in order.
    pub fn run_until_idle(
        &mut self,
        session: &mut PathfindingSession,
        max_ticks: usize,
    ) -> Vec<TickOutcome> {
        let mut outcomes = Vec::new();
        for _ in 0..max_ticks {
            let now = self.clock_ms;
            let outcome = session.tick(self, now);
            outcomes.push(outcome);
            if self.auto_confirm {
                self.confirm_steps();
            }
            self.clock_ms += TICK_MS;
            if !session.is_walking() {
                break;
            }
        }
        outcomes
    }
}

impl Avatar for TestWalker {
    fn status(&self) -> AvatarStatus {
        self.status.clone()
    }

    fn end_position(&self) -> (Position, Direction) {
        (self.status.position, self.facing)
    }

    fn limiter(&self) -> StepLimiter {
        self.limiter
    }

    fn in_world(&self) -> bool {
        self.in_world
    }

    fn walk(&mut self, direction: Direction, run: bool) -> bool {
        if self
            .refuse_after
            .is_some_and(|limit| self.steps_taken() >= limit)
        {
            self.log.push(WalkEvent::Refused(direction));
            return false;
        }
        if self.facing != direction {
            self.facing = direction;
            self.log.push(WalkEvent::Turned(direction));
            return true;
        }

        let ctx = StepContext::for_avatar(&self.map, &self.config, &self.status);
        let landed = can_walk(&ctx, direction, self.status.position)
            .filter(|outcome| outcome.direction == direction)
            .map(|outcome| outcome.position);
        let Some(to) = landed else {
            self.log.push(WalkEvent::Refused(direction));
            return false;
        };

        self.status.position = to;
        self.limiter.steps_count += 1;
        self.limiter.next_step_at = self.clock_ms + self.step_delay_ms;
        self.log.push(WalkEvent::Stepped { direction, to, run });
        true
    }
}
