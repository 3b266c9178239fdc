//! Deterministic simulation module
//!
//! All run-session logic lives here. This module must be pure and deterministic:
//! - Time only advances through explicit `tick` calls
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering, audio or platform dependencies

pub mod command;
pub mod scroll;
pub mod score;
pub mod session;
pub mod spawner;
pub mod state;
pub mod tick;
pub mod turns;

pub use command::{Command, CommandQueue, SoundId};
pub use scroll::DifficultyController;
pub use score::{MatchOutcome, ScoreState};
pub use session::{RunSession, TransitionError};
pub use spawner::{
    DECORATION_LAYERS, DecorationLayer, EntitySpawner, Placement, SpawnTimer, next_interval,
    platform_band,
};
pub use state::{
    AssetAvailability, AssetStatus, EntityId, EntityKind, GameSessionState, RunMode,
    SessionPhase, SpawnedEntity, TrackedEntity,
};
pub use tick::{TickInput, tick};
pub use turns::{Player, TurnController, TurnEvent, TurnState};
