//! Procedural entity spawning
//!
//! Three independent jittered timers (collectibles, decorations, platforms)
//! decide *when* something appears; the placement helpers decide *where* and
//! *how fast*. All randomness comes from the session's seeded RNG.

use glam::Vec2;
use rand::Rng;

use super::state::{AssetAvailability, AssetStatus, EntityId, EntityKind, RunMode, SpawnedEntity};
use crate::rise_height;
use crate::tuning::{SpawnWindow, Tuning};

/// Draw the next interval from a spawn window (fixed windows consume no randomness)
pub fn draw_interval<R: Rng>(window: SpawnWindow, rng: &mut R) -> u32 {
    if window.is_fixed() {
        window.min_ms
    } else {
        rng.random_range(window.min_ms..=window.max_ms)
    }
}

/// Jitter policy: next interval for `kind` in `mode`, `None` outside a run
pub fn next_interval<R: Rng>(
    tuning: &Tuning,
    mode: RunMode,
    kind: EntityKind,
    rng: &mut R,
) -> Option<u32> {
    let mode_tuning = tuning.mode(mode)?;
    let window = match kind {
        EntityKind::Collectible => mode_tuning.collectible_interval,
        EntityKind::Decoration => mode_tuning.decoration_interval,
        EntityKind::Platform => mode_tuning.platform_interval,
    };
    Some(draw_interval(window, rng))
}

/// A periodic timer whose period is redrawn after every fire
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnTimer {
    pub window: SpawnWindow,
    pub interval_ms: u32,
    pub elapsed_ms: u32,
}

impl SpawnTimer {
    pub fn new<R: Rng>(window: SpawnWindow, rng: &mut R) -> Self {
        Self {
            window,
            interval_ms: draw_interval(window, rng),
            elapsed_ms: 0,
        }
    }

    /// Advance by `delta_ms`; returns how many times the timer fired
    pub fn advance<R: Rng>(&mut self, delta_ms: u32, rng: &mut R) -> u32 {
        self.elapsed_ms = self.elapsed_ms.saturating_add(delta_ms);
        let mut fired = 0;
        while self.interval_ms > 0 && self.elapsed_ms >= self.interval_ms {
            self.elapsed_ms -= self.interval_ms;
            self.interval_ms = draw_interval(self.window, rng);
            fired += 1;
        }
        fired
    }

    pub fn remaining_ms(&self) -> u32 {
        self.interval_ms.saturating_sub(self.elapsed_ms)
    }
}

/// Owns the three spawn timers for the current run or turn
#[derive(Debug, Clone, Default)]
pub struct EntitySpawner {
    collectible: Option<SpawnTimer>,
    decoration: Option<SpawnTimer>,
    platform: Option<SpawnTimer>,
}

impl EntitySpawner {
    /// (Re)create all timers with the mode's windows.
    ///
    /// Kinds whose asset is missing get no timer at all.
    pub fn arm<R: Rng>(
        &mut self,
        tuning: &Tuning,
        mode: RunMode,
        assets: &AssetAvailability,
        rng: &mut R,
    ) {
        self.cancel_all();
        let Some(mode_tuning) = tuning.mode(mode) else {
            log::debug!("Spawner not armed outside a run");
            return;
        };

        for kind in EntityKind::ALL {
            if !assets.status(kind).is_usable() {
                log::debug!("Spawning disabled for {:?}: no texture available", kind);
                continue;
            }
            let window = match kind {
                EntityKind::Collectible => mode_tuning.collectible_interval,
                EntityKind::Decoration => mode_tuning.decoration_interval,
                EntityKind::Platform => mode_tuning.platform_interval,
            };
            *self.slot_mut(kind) = Some(SpawnTimer::new(window, rng));
        }
    }

    /// Drop every timer; nothing fires until the next `arm`
    pub fn cancel_all(&mut self) {
        self.collectible = None;
        self.decoration = None;
        self.platform = None;
    }

    pub fn timer(&self, kind: EntityKind) -> Option<&SpawnTimer> {
        match kind {
            EntityKind::Collectible => self.collectible.as_ref(),
            EntityKind::Decoration => self.decoration.as_ref(),
            EntityKind::Platform => self.platform.as_ref(),
        }
    }

    pub fn is_armed(&self, kind: EntityKind) -> bool {
        self.timer(kind).is_some()
    }

    pub fn any_armed(&self) -> bool {
        EntityKind::ALL.iter().any(|&kind| self.is_armed(kind))
    }

    /// Advance all armed timers, returning the kinds that fired (in fire order per kind)
    pub fn advance<R: Rng>(&mut self, delta_ms: u32, rng: &mut R) -> Vec<EntityKind> {
        let mut fired = Vec::new();
        for kind in EntityKind::ALL {
            if let Some(timer) = self.slot_mut(kind) {
                let count = timer.advance(delta_ms, rng);
                fired.extend(std::iter::repeat_n(kind, count as usize));
            }
        }
        fired
    }

    fn slot_mut(&mut self, kind: EntityKind) -> &mut Option<SpawnTimer> {
        match kind {
            EntityKind::Collectible => &mut self.collectible,
            EntityKind::Decoration => &mut self.decoration,
            EntityKind::Platform => &mut self.platform,
        }
    }
}

/// One parallax band of background decorations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecorationLayer {
    pub base_scale: f32,
    pub depth: f32,
    pub parallax: f32,
}

/// Layer 1 is furthest back (small, slow), layer 5 nearest (large, fast)
pub const DECORATION_LAYERS: [DecorationLayer; 5] = [
    DecorationLayer { base_scale: 0.25, depth: -1.9, parallax: 0.2 },
    DecorationLayer { base_scale: 0.35, depth: -1.7, parallax: 0.3 },
    DecorationLayer { base_scale: 0.5, depth: -1.5, parallax: 0.5 },
    DecorationLayer { base_scale: 0.6, depth: -1.3, parallax: 0.65 },
    DecorationLayer { base_scale: 0.75, depth: -1.1, parallax: 0.8 },
];

/// Render depths of the gameplay layers
pub const COLLECTIBLE_DEPTH: f32 = 1.0;
pub const PLATFORM_DEPTH: f32 = 0.0;

/// Vertical band (screen space, y down) for platform tops.
///
/// The highest platform sits a margin below the single-jump apex, the lowest
/// a fraction of the rise above the ground. Falls back to a fixed band if the
/// two cross.
pub fn platform_band(tuning: &Tuning) -> (f32, f32) {
    let ground_top = tuning.ground_top();
    let rise = rise_height(tuning.jump_velocity, tuning.gravity);
    let high = (ground_top - rise + tuning.platform_apex_margin).max(tuning.platform_min_y);
    let low = (ground_top - rise * tuning.platform_low_fraction).max(tuning.platform_max_y_floor);
    if high > low {
        log::warn!(
            "Platform band inverted ({:.1} > {:.1}), using fallback {:?}",
            high,
            low,
            tuning.platform_fallback_band
        );
        let (a, b) = tuning.platform_fallback_band;
        return (a.min(b), a.max(b));
    }
    (high, low)
}

/// Vertical band for collectibles: from a fraction of the viewport down to
/// a margin above the ground
pub fn collectible_band(tuning: &Tuning) -> (f32, f32) {
    let top = tuning.viewport_height * tuning.collectible_band_top;
    let bottom = tuning.ground_top() - tuning.collectible_ground_margin;
    (top.min(bottom), bottom)
}

/// Displayed platform width for the available texture
pub fn platform_width(tuning: &Tuning, assets: &AssetAvailability) -> f32 {
    match (assets.platform, assets.platform_asset_width) {
        (AssetStatus::Primary, Some(width)) => width as f32 * tuning.platform_asset_stretch,
        _ => tuning.platform_fallback_width,
    }
}

/// Computes creation requests for the current scroll speed
#[derive(Debug, Clone, Copy)]
pub struct Placement<'a> {
    pub tuning: &'a Tuning,
    pub assets: &'a AssetAvailability,
    /// Current world scroll speed (pixels/s, difficulty already applied)
    pub scroll_speed: f32,
}

impl Placement<'_> {
    pub fn spawn<R: Rng>(&self, kind: EntityKind, id: EntityId, rng: &mut R) -> SpawnedEntity {
        match kind {
            EntityKind::Collectible => self.collectible(id, rng),
            EntityKind::Decoration => self.decoration(id, None, rng),
            EntityKind::Platform => self.platform(id, rng),
        }
    }

    pub fn collectible<R: Rng>(&self, id: EntityId, rng: &mut R) -> SpawnedEntity {
        let (top, bottom) = collectible_band(self.tuning);
        let y = rng.random_range(top..=bottom);
        SpawnedEntity {
            id,
            kind: EntityKind::Collectible,
            position: Vec2::new(self.tuning.viewport_width + 50.0, y),
            velocity_x: -self.scroll_speed,
            depth: COLLECTIBLE_DEPTH,
            scale: 1.0,
            width: self.tuning.collectible_size,
            one_way: false,
        }
    }

    /// Background decoration standing on the ground; `x` pins the spawn
    /// position (initial scatter), otherwise it enters just off the right edge
    pub fn decoration<R: Rng>(&self, id: EntityId, x: Option<f32>, rng: &mut R) -> SpawnedEntity {
        let layer = DECORATION_LAYERS[rng.random_range(0..DECORATION_LAYERS.len())];
        let scale = layer.base_scale * rng.random_range(0.9f32..=1.1);
        let x = x.unwrap_or_else(|| self.tuning.viewport_width + rng.random_range(50.0f32..=200.0));
        SpawnedEntity {
            id,
            kind: EntityKind::Decoration,
            position: Vec2::new(x, self.tuning.ground_top()),
            velocity_x: -(self.scroll_speed * layer.parallax),
            depth: layer.depth,
            scale,
            width: self.tuning.decoration_width * scale,
            one_way: false,
        }
    }

    pub fn platform<R: Rng>(&self, id: EntityId, rng: &mut R) -> SpawnedEntity {
        let (high, low) = platform_band(self.tuning);
        let y = rng.random_range(high..=low);
        let width = platform_width(self.tuning, self.assets);
        let scale = match (self.assets.platform, self.assets.platform_asset_width) {
            (AssetStatus::Primary, Some(_)) => self.tuning.platform_asset_stretch,
            _ => 1.0,
        };
        SpawnedEntity {
            id,
            kind: EntityKind::Platform,
            position: Vec2::new(self.tuning.viewport_width + width / 2.0, y),
            velocity_x: -self.scroll_speed,
            depth: PLATFORM_DEPTH,
            scale,
            width,
            one_way: true,
        }
    }
}
