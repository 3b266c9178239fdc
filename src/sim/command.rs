//! Outgoing requests to the rendering, audio and UI collaborators
//!
//! The core never calls into a renderer or audio device. Each operation
//! appends commands to a queue and the frame driver drains it once per frame,
//! in order.

use serde::{Deserialize, Serialize};

use super::state::{EntityId, SpawnedEntity};

/// Sound cues the core asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundId {
    Collect,
    GameOver,
    MatchEnd,
}

/// A single request to an external collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    // === Rendering / physics ===
    CreateEntity(SpawnedEntity),
    DestroyEntity(EntityId),
    /// Place the player at a start point with zero velocity
    ResetPlayer { x: f32, y: f32 },
    /// Apply an upward launch to the player
    Jump { velocity_y: f32 },
    /// Stop player motion and animation
    FreezePlayer,
    SetRunAnimationRate(f32),
    /// Suspend or resume physics and animation clocks
    SetWorldPaused(bool),

    // === Audio ===
    PlayOnce(SoundId),
    SetBackgroundMusicPaused(bool),

    // === UI ===
    ShowMenu,
    SetScoreText(String),
    SetTurnText(String),
    SetTimerText(String),
    ShowGameOver,
    ShowMatchResult {
        winner_label: String,
        p1_total: u32,
        p2_total: u32,
    },
    ShowPaused(bool),
}

/// FIFO of commands produced since the last drain
#[derive(Debug, Default)]
pub struct CommandQueue {
    commands: Vec<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn send(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    /// Take every pending command, leaving the queue empty
    pub fn drain(&mut self) -> impl Iterator<Item = Command> + '_ {
        self.commands.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}
