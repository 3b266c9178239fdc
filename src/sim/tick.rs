//! Per-frame simulation driver
//!
//! Folds one frame of collaborator reports (input edges, ground contact,
//! overlaps, removals) into the session, then advances it.

use serde::{Deserialize, Serialize};

use super::session::RunSession;
use super::state::{EntityId, SessionPhase};

/// Everything the collaborators reported for a single frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickInput {
    /// Jump key went down this frame
    pub jump_pressed: bool,
    /// Pause key went down this frame
    pub pause_pressed: bool,
    /// Player is standing on the ground or a platform
    pub blocked_down: bool,
    /// Entities the player overlapped this frame
    pub overlaps: Vec<EntityId>,
    /// Entities the physics collaborator culled on its own
    pub removed: Vec<EntityId>,
}

/// Advance the session by one frame of `delta_ms`
pub fn tick(session: &mut RunSession, input: &TickInput, delta_ms: u32) {
    // Handle pause toggle
    if input.pause_pressed {
        match session.toggle_pause() {
            Ok(()) if session.phase() == SessionPhase::Paused => return,
            Ok(()) => {}
            Err(err) => log::debug!("pause ignored: {err}"),
        }
    }

    if session.phase() != SessionPhase::Playing {
        // Between turns only the get-ready clock runs
        session.tick(delta_ms);
        return;
    }

    // Ground contact before the jump edge so a grounded jump leaves one air jump
    if input.blocked_down {
        session.land();
    }
    if input.jump_pressed {
        if let Err(err) = session.jump() {
            log::debug!("jump ignored: {err}");
        }
    }

    // Collections and removals land before timers and the turn clock
    for &id in &input.overlaps {
        if let Err(err) = session.collect(id) {
            log::debug!("overlap ignored: {err}");
        }
    }
    for &id in &input.removed {
        if session.phase() != SessionPhase::Playing {
            break;
        }
        if let Err(err) = session.entity_removed(id) {
            log::debug!("removal ignored: {err}");
        }
    }

    session.tick(delta_ms);
}
