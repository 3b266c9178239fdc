//! Session state and entity bookkeeping types
//!
//! Everything the run-session state machine owns lives here. Entities
//! themselves belong to the rendering/physics collaborator; the core only
//! keeps enough of each one to apply the off-screen rule.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Which game the player picked from the menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunMode {
    #[default]
    None,
    SinglePlayer,
    TwoPlayer,
}

/// Top-level phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Waiting for a mode selection
    #[default]
    Menu,
    /// Active run (either mode)
    Playing,
    /// Run suspended by the player
    Paused,
    /// Between two-player turns
    TurnTransition,
    /// Single-player run ended
    GameOver,
    /// Two-player match ended
    MatchResult,
}

impl SessionPhase {
    /// Phases a finished session can return to the menu from
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::GameOver | SessionPhase::MatchResult)
    }
}

/// Session-wide flags, mutated only by [`super::RunSession`] transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSessionState {
    pub mode: RunMode,
    pub is_game_over: bool,
    pub is_paused: bool,
    /// Scroll speed multiplier (>= 1.0)
    pub scroll_speed_multiplier: f32,
    /// Jumps spent since last touching ground
    pub jumps_used: u8,
}

impl Default for GameSessionState {
    fn default() -> Self {
        Self {
            mode: RunMode::None,
            is_game_over: false,
            is_paused: false,
            scroll_speed_multiplier: 1.0,
            jumps_used: 0,
        }
    }
}

/// Handle for an entity created through the rendering/physics collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Kinds of entity the spawner produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Treat the player collects
    Collectible,
    /// Parallax background tree (visual only)
    Decoration,
    /// One-way platform the player can land on
    Platform,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Collectible,
        EntityKind::Decoration,
        EntityKind::Platform,
    ];
}

/// Creation request handed to the rendering/physics collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnedEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Center x; y is the center for collectibles/platforms, the base for decorations
    pub position: Vec2,
    /// Pixels per second (negative = scrolling left)
    pub velocity_x: f32,
    /// Render depth (more negative = further back)
    pub depth: f32,
    pub scale: f32,
    /// Displayed width in pixels
    pub width: f32,
    /// Only the top edge collides (platforms)
    pub one_way: bool,
}

/// What the core remembers about a live entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// Center x, integrated from `velocity_x` every tick
    pub x: f32,
    pub width: f32,
    pub velocity_x: f32,
}

impl TrackedEntity {
    pub fn from_spawn(spawned: &SpawnedEntity) -> Self {
        Self {
            id: spawned.id,
            kind: spawned.kind,
            x: spawned.position.x,
            width: spawned.width,
            velocity_x: spawned.velocity_x,
        }
    }

    /// Right-most x of the entity
    pub fn trailing_edge(&self) -> f32 {
        self.x + self.width / 2.0
    }

    /// True once the whole entity has scrolled past `-margin`
    pub fn is_off_screen(&self, margin: f32) -> bool {
        self.trailing_edge() < -margin
    }
}

/// Whether a kind's texture loaded, or only a generated placeholder did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AssetStatus {
    #[default]
    Primary,
    Fallback,
    Missing,
}

impl AssetStatus {
    pub fn is_usable(&self) -> bool {
        !matches!(self, AssetStatus::Missing)
    }
}

/// Asset availability reported by the renderer after loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssetAvailability {
    pub collectible: AssetStatus,
    pub decoration: AssetStatus,
    pub platform: AssetStatus,
    /// Native width of the primary platform texture
    pub platform_asset_width: Option<u32>,
}

impl AssetAvailability {
    pub fn status(&self, kind: EntityKind) -> AssetStatus {
        match kind {
            EntityKind::Collectible => self.collectible,
            EntityKind::Decoration => self.decoration,
            EntityKind::Platform => self.platform,
        }
    }
}
