//! Puppy Runner - A side-scrolling treat-collecting arcade game
//!
//! Core modules:
//! - `sim`: Deterministic run-session simulation (state machine, spawning, scroll, turns)
//! - `tuning`: Data-driven game balance
//!
//! Rendering, physics integration, audio and input polling are external
//! collaborators. The core talks to them through plain data: it accepts a
//! [`sim::TickInput`] each frame and emits [`sim::Command`]s.

pub mod sim;
pub mod tuning;

pub use sim::{Command, RunMode, RunSession, SessionPhase, TickInput, tick};
pub use tuning::{Tuning, TuningError};

/// Game configuration constants
pub mod consts {
    /// Viewport dimensions (pixels)
    pub const VIEWPORT_WIDTH: f32 = 800.0;
    pub const VIEWPORT_HEIGHT: f32 = 600.0;

    /// Height of the ground strip at the bottom of the viewport
    pub const GROUND_HEIGHT: f32 = 32.0;

    /// Nominal frame duration the scroll math is expressed against (60 Hz)
    pub const EXPECTED_FRAME_MS: f32 = 1000.0 / 60.0;

    /// Arcade gravity (pixels/s²)
    pub const GRAVITY: f32 = 1200.0;
    /// Jump launch speed (pixels/s, upward)
    pub const JUMP_VELOCITY: f32 = 450.0;
    /// Double jump
    pub const MAX_JUMPS: u8 = 2;

    /// Single-player base scroll speed (pixels/s)
    pub const BASE_SCROLL_SPEED: f32 = 200.0;
    /// Two-player fixed scroll speed (pixels/s)
    pub const TWO_PLAYER_SCROLL_SPEED: f32 = 450.0;

    /// Difficulty ramp (single-player only)
    pub const SPEED_INCREASE_INTERVAL_MS: u32 = 10_000;
    pub const SPEED_INCREASE_AMOUNT: f32 = 0.1;

    /// Run ends once this many collectibles slip past
    pub const MAX_MISSED: u32 = 3;

    /// Two-player turn timing
    pub const TURN_TIME_LIMIT_MS: u32 = 60_000;
    pub const TURN_TRANSITION_DELAY_MS: u32 = 2_500;

    /// Player spawn point (x fixed, y above the ground)
    pub const PLAYER_START_X: f32 = 100.0;
    pub const PLAYER_START_HEIGHT: f32 = 100.0;
}

/// Projectile rise height for a launch speed under constant gravity (`v²/2g`)
#[inline]
pub fn rise_height(launch_speed: f32, gravity: f32) -> f32 {
    if gravity <= 0.0 {
        return 0.0;
    }
    (launch_speed * launch_speed) / (2.0 * gravity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rise_height_matches_default_jump() {
        let rise = rise_height(consts::JUMP_VELOCITY, consts::GRAVITY);
        assert!((rise - 84.375).abs() < 1e-4);
    }

    #[test]
    fn test_rise_height_zero_gravity() {
        assert_eq!(rise_height(450.0, 0.0), 0.0);
    }
}
