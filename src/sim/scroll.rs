//! World scroll speed and difficulty ramp
//!
//! Single-player runs speed up by a fixed step every interval of unpaused
//! play; two-player runs scroll at a fixed, faster speed.

use crate::consts::EXPECTED_FRAME_MS;

/// Owns the difficulty multiplier and the ground scroll offset
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyController {
    /// Mode speed before the multiplier (pixels/s)
    base_speed: f32,
    /// Whether the step timer is running
    ramping: bool,
    step_interval_ms: u32,
    step_amount: f32,
    /// Steps applied so far; the multiplier is derived from this
    steps: u32,
    elapsed_ms: u32,
    /// Accumulated ground tile offset
    scroll_position: f32,
}

impl DifficultyController {
    pub fn new(base_speed: f32, ramping: bool, step_interval_ms: u32, step_amount: f32) -> Self {
        Self {
            base_speed,
            ramping,
            step_interval_ms,
            step_amount,
            steps: 0,
            elapsed_ms: 0,
            scroll_position: 0.0,
        }
    }

    /// Controller that never scrolls (menu)
    pub fn idle() -> Self {
        Self::new(0.0, false, 1, 0.0)
    }

    /// Current difficulty multiplier (1.0 plus one step per interval elapsed)
    pub fn multiplier(&self) -> f32 {
        1.0 + self.steps as f32 * self.step_amount
    }

    /// Current world speed in pixels per second
    pub fn current_speed(&self) -> f32 {
        self.base_speed * self.multiplier()
    }

    /// Ground offset for a tick of `delta_ms`, normalized to the nominal frame
    pub fn scroll_delta(&self, delta_ms: u32) -> f32 {
        (self.current_speed() / EXPECTED_FRAME_MS) * (delta_ms as f32 / EXPECTED_FRAME_MS)
    }

    /// Advance the ground and the step timer; returns the number of difficulty steps taken
    pub fn advance(&mut self, delta_ms: u32) -> u32 {
        self.scroll_position += self.scroll_delta(delta_ms);
        if !self.ramping || self.step_interval_ms == 0 {
            return 0;
        }

        self.elapsed_ms = self.elapsed_ms.saturating_add(delta_ms);
        let mut stepped = 0;
        while self.elapsed_ms >= self.step_interval_ms {
            self.elapsed_ms -= self.step_interval_ms;
            self.steps += 1;
            stepped += 1;
            log::info!("Game speed: {:.2}x", self.multiplier());
        }
        stepped
    }

    /// Cancel the step timer; the current multiplier is kept
    pub fn stop(&mut self) {
        self.ramping = false;
        self.elapsed_ms = 0;
    }

    pub fn is_ramping(&self) -> bool {
        self.ramping
    }

    pub fn scroll_position(&self) -> f32 {
        self.scroll_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_player() -> DifficultyController {
        DifficultyController::new(200.0, true, 10_000, 0.1)
    }

    #[test]
    fn test_multiplier_steps_every_interval() {
        let mut ctrl = single_player();
        assert_eq!(ctrl.multiplier(), 1.0);
        for _ in 0..1875 {
            ctrl.advance(16);
        }
        // 30000 ms -> three steps
        assert!((ctrl.multiplier() - 1.3).abs() < 1e-5);
        assert!((ctrl.current_speed() - 260.0).abs() < 1e-3);
    }

    #[test]
    fn test_single_long_delta_catches_up() {
        let mut ctrl = single_player();
        assert_eq!(ctrl.advance(25_000), 2);
        assert!((ctrl.multiplier() - 1.2).abs() < 1e-5);
    }

    #[test]
    fn test_fixed_speed_never_ramps() {
        let mut ctrl = DifficultyController::new(450.0, false, 10_000, 0.1);
        assert_eq!(ctrl.advance(120_000), 0);
        assert_eq!(ctrl.current_speed(), 450.0);
    }

    #[test]
    fn test_stop_freezes_multiplier() {
        let mut ctrl = single_player();
        ctrl.advance(10_000);
        ctrl.stop();
        ctrl.advance(50_000);
        assert!((ctrl.multiplier() - 1.1).abs() < 1e-5);
        assert!(!ctrl.is_ramping());
    }

    #[test]
    fn test_scroll_delta_is_frame_rate_independent() {
        let ctrl = single_player();
        let one_big = ctrl.scroll_delta(32);
        let two_small = ctrl.scroll_delta(16) * 2.0;
        assert!((one_big - two_small).abs() < 1e-4);
    }
}
