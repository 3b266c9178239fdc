//! Two-player turn sequencing
//!
//! Player 1 plays a fixed-length turn, a short get-ready delay follows, then
//! player 2 plays. Only one countdown exists at a time.

use serde::{Deserialize, Serialize};

/// Which player is at the controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub fn number(&self) -> u8 {
        match self {
            Player::One => 1,
            Player::Two => 2,
        }
    }

    pub fn next(&self) -> Option<Player> {
        match self {
            Player::One => Some(Player::Two),
            Player::Two => None,
        }
    }
}

/// Turn controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TurnState {
    #[default]
    Idle,
    TurnActive { player: Player, remaining_ms: u32 },
    TransitionDelay { next: Player, remaining_ms: u32 },
}

/// Outcome of advancing the turn clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEvent {
    /// Countdown for this player's turn hit zero
    TurnExpired(Player),
    /// Get-ready delay elapsed; this player's turn should start
    TransitionElapsed(Player),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnController {
    state: TurnState,
    turn_time_limit_ms: u32,
    transition_delay_ms: u32,
}

impl TurnController {
    pub fn new(turn_time_limit_ms: u32, transition_delay_ms: u32) -> Self {
        Self {
            state: TurnState::Idle,
            turn_time_limit_ms,
            transition_delay_ms,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn turn_time_limit_ms(&self) -> u32 {
        self.turn_time_limit_ms
    }

    pub fn is_turn_active(&self) -> bool {
        matches!(self.state, TurnState::TurnActive { .. })
    }

    pub fn in_transition(&self) -> bool {
        matches!(self.state, TurnState::TransitionDelay { .. })
    }

    pub fn remaining_ms(&self) -> u32 {
        match self.state {
            TurnState::TurnActive { remaining_ms, .. }
            | TurnState::TransitionDelay { remaining_ms, .. } => remaining_ms,
            TurnState::Idle => 0,
        }
    }

    /// Begin a turn, replacing any pending countdown
    pub fn start_turn(&mut self, player: Player) {
        self.state = TurnState::TurnActive {
            player,
            remaining_ms: self.turn_time_limit_ms,
        };
    }

    /// Close the active turn. Returns the player who just finished and enters
    /// the get-ready delay if another player is due.
    pub fn end_turn(&mut self) -> Option<Player> {
        let TurnState::TurnActive { player, .. } = self.state else {
            return None;
        };
        self.state = match player.next() {
            Some(next) => TurnState::TransitionDelay {
                next,
                remaining_ms: self.transition_delay_ms,
            },
            None => TurnState::Idle,
        };
        Some(player)
    }

    /// Drop any countdown or delay
    pub fn cancel(&mut self) {
        self.state = TurnState::Idle;
    }

    /// Advance the active countdown or delay by `delta_ms`
    pub fn advance(&mut self, delta_ms: u32) -> Option<TurnEvent> {
        match &mut self.state {
            TurnState::Idle => None,
            TurnState::TurnActive { player, remaining_ms } => {
                *remaining_ms = remaining_ms.saturating_sub(delta_ms);
                (*remaining_ms == 0).then_some(TurnEvent::TurnExpired(*player))
            }
            TurnState::TransitionDelay { next, remaining_ms } => {
                *remaining_ms = remaining_ms.saturating_sub(delta_ms);
                (*remaining_ms == 0).then_some(TurnEvent::TransitionElapsed(*next))
            }
        }
    }

    /// Whole seconds left on the turn clock, rounded up for display
    pub fn display_seconds(&self) -> u32 {
        match self.state {
            TurnState::TurnActive { remaining_ms, .. } => remaining_ms.div_ceil(1000),
            _ => 0,
        }
    }
}
