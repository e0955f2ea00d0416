// Avatar collaborator: the player character the planner moves.
//
// The planner reads an `AvatarStatus` snapshot when a route is requested
// (position, body, mount, stamina) and derives the `MovementMode` from it.
// During execution it asks the avatar for its predicted end position and
// facing, checks the step limiter, and issues `walk` calls. Movement
// itself, including turning in place before a step, is the avatar's job.
//
// See also: `executor.rs` which drives `Avatar::walk`, `step.rs` which
// consumes the movement mode and the ignore-characters rule.

use crate::config::{GraphicRules, ProfileFlags};
use crate::types::{Direction, MovementMode, Position};
use serde::{Deserialize, Serialize};

/// Snapshot of the avatar's state relevant to planning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarStatus {
    pub position: Position,
    pub body: u16,
    pub dead: bool,
    pub gargoyle: bool,
    pub flying: bool,
    pub paralyzed: bool,
    /// Graphic of the mount, if riding.
    pub mount: Option<u16>,
    pub stamina: u16,
    pub stamina_max: u16,
    pub map_index: u8,
    /// The avatar walks through other creatures (e.g. a hidden game master).
    pub ignore_characters: bool,
}

impl AvatarStatus {
    /// A healthy human standing at `position` on map 0 with full stamina.
    pub fn standing_at(position: Position) -> Self {
        Self {
            position,
            body: 0x0190,
            dead: false,
            gargoyle: false,
            flying: false,
            paralyzed: false,
            mount: None,
            stamina: 100,
            stamina_max: 100,
            map_index: 0,
            ignore_characters: false,
        }
    }

    pub fn is_gm(&self, rules: &GraphicRules) -> bool {
        self.body == rules.gm_body
    }

    /// Movement mode implied by body, flight and mount. Death and the GM
    /// body take precedence over flight, which takes precedence over mounts.
    pub fn movement_mode(&self, rules: &GraphicRules) -> MovementMode {
        if self.dead || self.is_gm(rules) {
            MovementMode::DeadOrGm
        } else if self.gargoyle && self.flying {
            MovementMode::Flying
        } else if self.mount == Some(rules.sea_horse_mount) {
            MovementMode::OnSeaHorse
        } else {
            MovementMode::Normal
        }
    }

    /// Whether other creatures stop blocking. Only a tired avatar on the
    /// main map is blocked by them.
    pub fn ignores_characters(&self, mode: MovementMode, profile: &ProfileFlags) -> bool {
        profile.ignore_stamina_check
            || mode == MovementMode::DeadOrGm
            || self.ignore_characters
            || !(self.stamina < self.stamina_max && self.map_index == 0)
    }
}

/// Step throttling state of the avatar's walker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepLimiter {
    /// Steps sent to the server and not yet acknowledged.
    pub steps_count: u32,
    /// Earliest tick (ms) at which the next step may be sent.
    pub next_step_at: u64,
}

impl StepLimiter {
    pub fn allows_step(&self, max_step_count: u32, now_ms: u64) -> bool {
        self.steps_count < max_step_count && self.next_step_at <= now_ms
    }
}

/// The avatar as seen by the planner.
pub trait Avatar {
    fn status(&self) -> AvatarStatus;

    /// Position and facing once all queued steps have been applied.
    fn end_position(&self) -> (Position, Direction);

    fn limiter(&self) -> StepLimiter;

    /// `false` while the client is not connected to a game world.
    fn in_world(&self) -> bool {
        true
    }

    /// Request one step (or a turn, if not facing `direction`). Returns
    /// `false` when the request is refused.
    fn walk(&mut self, direction: Direction, run: bool) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> AvatarStatus {
        AvatarStatus::standing_at(Position::new(10, 10, 0))
    }

    #[test]
    fn movement_mode_precedence() {
        let rules = GraphicRules::default();
        let mut s = status();
        assert_eq!(s.movement_mode(&rules), MovementMode::Normal);

        s.mount = Some(rules.sea_horse_mount);
        assert_eq!(s.movement_mode(&rules), MovementMode::OnSeaHorse);

        s.gargoyle = true;
        s.flying = true;
        assert_eq!(s.movement_mode(&rules), MovementMode::Flying);

        s.dead = true;
        assert_eq!(s.movement_mode(&rules), MovementMode::DeadOrGm);

        let mut gm = status();
        gm.body = rules.gm_body;
        assert_eq!(gm.movement_mode(&rules), MovementMode::DeadOrGm);
        assert!(gm.is_gm(&rules));
    }

    #[test]
    fn other_mount_is_normal() {
        let rules = GraphicRules::default();
        let mut s = status();
        s.mount = Some(0x3EA2);
        assert_eq!(s.movement_mode(&rules), MovementMode::Normal);
    }

    #[test]
    fn only_tired_avatars_on_main_map_are_blocked_by_characters() {
        let profile = ProfileFlags::default();
        let mut s = status();
        // Full stamina: characters ignored.
        assert!(s.ignores_characters(MovementMode::Normal, &profile));

        s.stamina = 50;
        assert!(!s.ignores_characters(MovementMode::Normal, &profile));
        assert!(s.ignores_characters(MovementMode::DeadOrGm, &profile));

        s.map_index = 1;
        assert!(s.ignores_characters(MovementMode::Normal, &profile));

        s.map_index = 0;
        s.ignore_characters = true;
        assert!(s.ignores_characters(MovementMode::Normal, &profile));

        s.ignore_characters = false;
        let skip = ProfileFlags {
            ignore_stamina_check: true,
            ..ProfileFlags::default()
        };
        assert!(s.ignores_characters(MovementMode::Normal, &skip));
    }

    #[test]
    fn limiter_gates_on_count_and_time() {
        let limiter = StepLimiter {
            steps_count: 2,
            next_step_at: 1000,
        };
        assert!(!limiter.allows_step(5, 999));
        assert!(limiter.allows_step(5, 1000));
        assert!(!limiter.allows_step(2, 2000));
    }
}
