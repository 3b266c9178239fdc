//! Data-driven game balance
//!
//! Every number the run session depends on lives here so a level designer can
//! tweak pacing from a JSON file without touching the simulation.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::sim::RunMode;

/// Errors raised while loading or validating tuning data
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse tuning json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid tuning value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Inclusive range a spawn timer draws its next interval from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnWindow {
    pub min_ms: u32,
    pub max_ms: u32,
}

impl SpawnWindow {
    pub const fn new(min_ms: u32, max_ms: u32) -> Self {
        Self { min_ms, max_ms }
    }

    /// A window that never jitters
    pub const fn fixed(ms: u32) -> Self {
        Self { min_ms: ms, max_ms: ms }
    }

    pub fn is_fixed(&self) -> bool {
        self.min_ms == self.max_ms
    }

    pub fn contains(&self, ms: u32) -> bool {
        (self.min_ms..=self.max_ms).contains(&ms)
    }
}

/// Values that differ between single-player and two-player runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeTuning {
    /// Scroll speed before the difficulty multiplier (pixels/s)
    pub scroll_speed: f32,
    pub collectible_interval: SpawnWindow,
    pub decoration_interval: SpawnWindow,
    pub platform_interval: SpawnWindow,
    /// Decorations scattered across the screen when a run or turn starts
    pub initial_decorations: u32,
    /// Whether the difficulty multiplier ramps over time
    pub difficulty_ramp: bool,
    /// Run animation speed factor when the ramp is off
    pub animation_factor: f32,
}

impl ModeTuning {
    pub fn single_player() -> Self {
        Self {
            scroll_speed: BASE_SCROLL_SPEED,
            collectible_interval: SpawnWindow::fixed(2000),
            decoration_interval: SpawnWindow::new(1500, 4000),
            platform_interval: SpawnWindow::new(4000, 7000),
            initial_decorations: 5,
            difficulty_ramp: true,
            animation_factor: 1.0,
        }
    }

    pub fn two_player() -> Self {
        Self {
            scroll_speed: TWO_PLAYER_SCROLL_SPEED,
            collectible_interval: SpawnWindow::fixed(600),
            decoration_interval: SpawnWindow::new(800, 2000),
            platform_interval: SpawnWindow::new(2000, 4000),
            initial_decorations: 8,
            difficulty_ramp: false,
            animation_factor: 1.8,
        }
    }
}

/// `ModeTuning` as written in a tuning file: any field left out keeps the
/// value of the mode it overrides
#[derive(Debug, Default, Deserialize)]
struct ModeTuningOverlay {
    scroll_speed: Option<f32>,
    collectible_interval: Option<SpawnWindow>,
    decoration_interval: Option<SpawnWindow>,
    platform_interval: Option<SpawnWindow>,
    initial_decorations: Option<u32>,
    difficulty_ramp: Option<bool>,
    animation_factor: Option<f32>,
}

impl ModeTuningOverlay {
    fn over(self, base: ModeTuning) -> ModeTuning {
        ModeTuning {
            scroll_speed: self.scroll_speed.unwrap_or(base.scroll_speed),
            collectible_interval: self.collectible_interval.unwrap_or(base.collectible_interval),
            decoration_interval: self.decoration_interval.unwrap_or(base.decoration_interval),
            platform_interval: self.platform_interval.unwrap_or(base.platform_interval),
            initial_decorations: self.initial_decorations.unwrap_or(base.initial_decorations),
            difficulty_ramp: self.difficulty_ramp.unwrap_or(base.difficulty_ramp),
            animation_factor: self.animation_factor.unwrap_or(base.animation_factor),
        }
    }
}

fn single_player_mode<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ModeTuning, D::Error> {
    ModeTuningOverlay::deserialize(deserializer)
        .map(|overlay| overlay.over(ModeTuning::single_player()))
}

fn two_player_mode<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ModeTuning, D::Error> {
    ModeTuningOverlay::deserialize(deserializer)
        .map(|overlay| overlay.over(ModeTuning::two_player()))
}

/// Largest accepted viewport side, keeps derived positions finite
const MAX_VIEWPORT_SIDE: f32 = 100_000.0;

/// Complete balance sheet for a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === World ===
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub ground_height: f32,
    pub gravity: f32,

    // === Player ===
    pub jump_velocity: f32,
    pub max_jumps: u8,
    pub player_start_x: f32,
    pub player_start_height: f32,
    /// Run animation frame rate at 1x speed
    pub run_animation_fps: f32,

    // === Modes ===
    #[serde(deserialize_with = "single_player_mode")]
    pub single_player: ModeTuning,
    #[serde(deserialize_with = "two_player_mode")]
    pub two_player: ModeTuning,

    // === Difficulty ===
    pub speed_increase_interval_ms: u32,
    pub speed_increase_amount: f32,

    // === Rules ===
    pub max_missed: u32,
    pub turn_time_limit_ms: u32,
    pub turn_transition_delay_ms: u32,

    // === Entity sizes ===
    /// Displayed collectible width (textures are scaled to this)
    pub collectible_size: f32,
    /// Unscaled decoration width, multiplied by the layer scale
    pub decoration_width: f32,
    /// Platform width when only the placeholder texture is available
    pub platform_fallback_width: f32,
    /// Horizontal stretch applied to the primary platform texture
    pub platform_asset_stretch: f32,

    // === Placement ===
    /// Collectibles spawn no higher than this fraction of the viewport height
    pub collectible_band_top: f32,
    /// Gap kept between the lowest collectible and the ground
    pub collectible_ground_margin: f32,
    /// Platform tops sit at least this far below the single-jump apex
    pub platform_apex_margin: f32,
    /// Lowest platform top, as a fraction of the jump rise above the ground
    pub platform_low_fraction: f32,
    /// Absolute clamps on the platform band (y, screen space)
    pub platform_min_y: f32,
    pub platform_max_y_floor: f32,
    /// Band used when the computed platform band inverts
    pub platform_fallback_band: (f32, f32),

    // === Off-screen margins ===
    pub collectible_exit_margin: f32,
    pub decoration_exit_margin: f32,
    pub platform_exit_margin: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            viewport_width: VIEWPORT_WIDTH,
            viewport_height: VIEWPORT_HEIGHT,
            ground_height: GROUND_HEIGHT,
            gravity: GRAVITY,

            jump_velocity: JUMP_VELOCITY,
            max_jumps: MAX_JUMPS,
            player_start_x: PLAYER_START_X,
            player_start_height: PLAYER_START_HEIGHT,
            run_animation_fps: 10.0,

            single_player: ModeTuning::single_player(),
            two_player: ModeTuning::two_player(),

            speed_increase_interval_ms: SPEED_INCREASE_INTERVAL_MS,
            speed_increase_amount: SPEED_INCREASE_AMOUNT,

            max_missed: MAX_MISSED,
            turn_time_limit_ms: TURN_TIME_LIMIT_MS,
            turn_transition_delay_ms: TURN_TRANSITION_DELAY_MS,

            collectible_size: 50.0,
            decoration_width: 256.0,
            platform_fallback_width: 200.0,
            platform_asset_stretch: 2.0,

            collectible_band_top: 0.4,
            collectible_ground_margin: 50.0,
            platform_apex_margin: 30.0,
            platform_low_fraction: 0.4,
            platform_min_y: 100.0,
            platform_max_y_floor: 150.0,
            platform_fallback_band: (400.0, 500.0),

            collectible_exit_margin: 20.0,
            decoration_exit_margin: 50.0,
            platform_exit_margin: 0.0,
        }
    }
}

impl Tuning {
    /// Parse tuning from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load tuning from a JSON file on disk
    pub fn load(path: &Path) -> Result<Self, TuningError> {
        let json = std::fs::read_to_string(path).map_err(|source| TuningError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), TuningError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> TuningError {
            TuningError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        let floats = [
            ("viewport_width", self.viewport_width),
            ("viewport_height", self.viewport_height),
            ("ground_height", self.ground_height),
            ("gravity", self.gravity),
            ("jump_velocity", self.jump_velocity),
            ("player_start_x", self.player_start_x),
            ("player_start_height", self.player_start_height),
            ("run_animation_fps", self.run_animation_fps),
            ("speed_increase_amount", self.speed_increase_amount),
            ("collectible_size", self.collectible_size),
            ("decoration_width", self.decoration_width),
            ("platform_fallback_width", self.platform_fallback_width),
            ("platform_asset_stretch", self.platform_asset_stretch),
            ("collectible_band_top", self.collectible_band_top),
            ("collectible_ground_margin", self.collectible_ground_margin),
            ("platform_apex_margin", self.platform_apex_margin),
            ("platform_low_fraction", self.platform_low_fraction),
            ("platform_min_y", self.platform_min_y),
            ("platform_max_y_floor", self.platform_max_y_floor),
            ("platform_fallback_band", self.platform_fallback_band.0),
            ("platform_fallback_band", self.platform_fallback_band.1),
            ("collectible_exit_margin", self.collectible_exit_margin),
            ("decoration_exit_margin", self.decoration_exit_margin),
            ("platform_exit_margin", self.platform_exit_margin),
            ("single_player.scroll_speed", self.single_player.scroll_speed),
            ("single_player.animation_factor", self.single_player.animation_factor),
            ("two_player.scroll_speed", self.two_player.scroll_speed),
            ("two_player.animation_factor", self.two_player.animation_factor),
        ];
        if let Some((field, value)) = floats.into_iter().find(|(_, value)| !value.is_finite()) {
            return Err(invalid(field, format!("{value} is not a finite number")));
        }

        if self.viewport_width <= 0.0 || self.viewport_height <= 0.0 {
            return Err(invalid("viewport", "dimensions must be positive"));
        }
        if self.viewport_width > MAX_VIEWPORT_SIDE || self.viewport_height > MAX_VIEWPORT_SIDE {
            return Err(invalid(
                "viewport",
                format!("dimensions may not exceed {MAX_VIEWPORT_SIDE}"),
            ));
        }
        if !(0.0..=1.0).contains(&self.collectible_band_top) {
            return Err(invalid("collectible_band_top", "must be a fraction in [0, 1]"));
        }
        if self.collectible_ground_margin < 0.0 {
            return Err(invalid("collectible_ground_margin", "must not be negative"));
        }
        if !(0.0..=1.0).contains(&self.platform_low_fraction) {
            return Err(invalid("platform_low_fraction", "must be a fraction in [0, 1]"));
        }
        if !crate::rise_height(self.jump_velocity, self.gravity).is_finite() {
            return Err(invalid("jump_velocity", "jump rise overflows for this gravity"));
        }
        let (band_high, band_low) = self.platform_fallback_band;
        if band_high > band_low {
            return Err(invalid(
                "platform_fallback_band",
                format!("top {band_high} lies below bottom {band_low}"),
            ));
        }
        if self.ground_height < 0.0 || self.ground_height >= self.viewport_height {
            return Err(invalid("ground_height", "must fit inside the viewport"));
        }
        if self.max_jumps == 0 {
            return Err(invalid("max_jumps", "at least one jump is required"));
        }
        if self.speed_increase_interval_ms == 0 {
            return Err(invalid("speed_increase_interval_ms", "must be non-zero"));
        }
        if self.speed_increase_amount < 0.0 {
            return Err(invalid("speed_increase_amount", "difficulty may not decrease"));
        }
        if self.max_missed == 0 {
            return Err(invalid("max_missed", "must allow at least one miss"));
        }
        if self.turn_time_limit_ms == 0 {
            return Err(invalid("turn_time_limit_ms", "must be non-zero"));
        }
        for (name, mode) in [("single_player", &self.single_player), ("two_player", &self.two_player)] {
            if mode.scroll_speed <= 0.0 {
                return Err(invalid("scroll_speed", format!("{name}: must be positive")));
            }
            for window in [
                mode.collectible_interval,
                mode.decoration_interval,
                mode.platform_interval,
            ] {
                if window.min_ms == 0 || window.min_ms > window.max_ms {
                    return Err(invalid(
                        "spawn interval",
                        format!("{name}: window {}..={} ms is empty or zero", window.min_ms, window.max_ms),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Per-mode values, `None` outside a run
    pub fn mode(&self, mode: RunMode) -> Option<&ModeTuning> {
        match mode {
            RunMode::SinglePlayer => Some(&self.single_player),
            RunMode::TwoPlayer => Some(&self.two_player),
            RunMode::None => None,
        }
    }

    /// Screen-space y of the top of the ground strip
    pub fn ground_top(&self) -> f32 {
        self.viewport_height - self.ground_height
    }

    /// Where the player is placed at the start of a run or turn
    pub fn player_start(&self) -> glam::Vec2 {
        glam::Vec2::new(
            self.player_start_x,
            self.ground_top() - self.player_start_height,
        )
    }
}
