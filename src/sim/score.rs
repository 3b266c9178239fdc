//! Score and attrition bookkeeping

use serde::{Deserialize, Serialize};

use super::state::RunMode;
use super::turns::Player;

/// Collected/missed counters plus per-player totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreState {
    /// Single-player: whole run. Two-player: current turn only.
    pub items_collected: u32,
    /// Single-player only
    pub items_missed: u32,
    pub player1_total: u32,
    pub player2_total: u32,
    pub current_player: Player,
}

impl Default for ScoreState {
    fn default() -> Self {
        Self {
            items_collected: 0,
            items_missed: 0,
            player1_total: 0,
            player2_total: 0,
            current_player: Player::One,
        }
    }
}

/// Winner of a two-player match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    Winner(Player),
    Tie,
}

impl MatchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            MatchOutcome::Winner(Player::One) => "Player 1 Wins!",
            MatchOutcome::Winner(Player::Two) => "Player 2 Wins!",
            MatchOutcome::Tie => "It's a Tie!",
        }
    }
}

impl ScoreState {
    pub fn record_collect(&mut self) {
        self.items_collected += 1;
    }

    /// Count a miss; returns true when the loss limit is reached
    pub fn record_miss(&mut self, limit: u32) -> bool {
        self.items_missed = (self.items_missed + 1).min(limit);
        self.is_lost(limit)
    }

    pub fn is_lost(&self, limit: u32) -> bool {
        self.items_missed >= limit
    }

    /// Bank the current turn's count into the current player's total
    pub fn bank_turn(&mut self) -> u32 {
        let banked = self.items_collected;
        match self.current_player {
            Player::One => self.player1_total += banked,
            Player::Two => self.player2_total += banked,
        }
        banked
    }

    /// Reset the per-turn counter for a new turn
    pub fn begin_turn(&mut self, player: Player) {
        self.current_player = player;
        self.items_collected = 0;
    }

    /// Strictly higher total wins; equal totals tie
    pub fn outcome(&self) -> MatchOutcome {
        match self.player1_total.cmp(&self.player2_total) {
            std::cmp::Ordering::Greater => MatchOutcome::Winner(Player::One),
            std::cmp::Ordering::Less => MatchOutcome::Winner(Player::Two),
            std::cmp::Ordering::Equal => MatchOutcome::Tie,
        }
    }

    /// HUD score line for the given mode
    pub fn display(&self, mode: RunMode, missed_limit: u32) -> String {
        match mode {
            RunMode::TwoPlayer => format!(
                "P1: {} | P2: {}\nTurn: P{} | Treats This Turn: {}",
                self.player1_total,
                self.player2_total,
                self.current_player.number(),
                self.items_collected
            ),
            _ => format!(
                "Collected: {}\nMissed: {}/{}",
                self.items_collected, self.items_missed, missed_limit
            ),
        }
    }
}
