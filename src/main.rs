//! Puppy Runner headless entry point
//!
//! Runs a full session against a scripted stand-in for the renderer, physics
//! and input collaborators, and prints the HUD as it changes.
//!
//! Usage: `puppy-runner [1p|2p] [seed] [tuning.json]`

use std::path::Path;

use puppy_runner::consts::EXPECTED_FRAME_MS;
use puppy_runner::sim::{Command, EntityId, EntityKind, SpawnedEntity};
use puppy_runner::{RunMode, RunSession, SessionPhase, TickInput, Tuning, tick};

/// Upper bound on simulated time before the demo gives up
const MAX_RUN_MS: u64 = 10 * 60 * 1000;

/// Stand-in for the physics world: tracks treats and decides which ones the
/// "player" grabs as they pass.
#[derive(Default)]
struct ScriptedWorld {
    treats: Vec<(EntityId, f32, f32)>,
    airborne_frames: u32,
    frame: u64,
}

impl ScriptedWorld {
    fn apply(&mut self, command: &Command) {
        match command {
            Command::CreateEntity(SpawnedEntity {
                id,
                kind: EntityKind::Collectible,
                position,
                velocity_x,
                ..
            }) => self.treats.push((*id, position.x, *velocity_x)),
            Command::DestroyEntity(id) => self.treats.retain(|(t, _, _)| t != id),
            Command::Jump { .. } => self.airborne_frames = 40,
            Command::SetScoreText(text) => println!("[score] {}", text.replace('\n', " | ")),
            Command::SetTurnText(text) => println!("[turn] {text}"),
            Command::ShowGameOver => println!("[hud] GAME OVER"),
            Command::ShowMatchResult {
                winner_label,
                p1_total,
                p2_total,
            } => println!("[hud] {winner_label} (P1: {p1_total}, P2: {p2_total})"),
            other => log::trace!("{:?}", other),
        }
    }

    /// Advance treats and build the next frame's input
    fn step(&mut self, delta_ms: u32, player_x: f32) -> TickInput {
        self.frame += 1;
        let dt = delta_ms as f32 / 1000.0;
        let mut overlaps = Vec::new();
        for (id, x, vx) in &mut self.treats {
            let before = *x;
            *x += *vx * dt;
            // the bot misses roughly one treat in four
            let crossed = before >= player_x && *x < player_x;
            if crossed && id.0.wrapping_mul(2654435761) % 4 != 0 {
                overlaps.push(*id);
            }
        }

        self.airborne_frames = self.airborne_frames.saturating_sub(1);
        TickInput {
            jump_pressed: self.frame % 90 == 0,
            blocked_down: self.airborne_frames == 0,
            overlaps,
            ..Default::default()
        }
    }
}

fn parse_mode(arg: Option<&str>) -> RunMode {
    match arg {
        Some("2p") | Some("two") => RunMode::TwoPlayer,
        _ => RunMode::SinglePlayer,
    }
}

fn load_tuning(path: Option<&str>) -> Tuning {
    let Some(path) = path else {
        return Tuning::default();
    };
    match Tuning::load(Path::new(path)) {
        Ok(tuning) => tuning,
        Err(err) => {
            log::warn!("{err}; falling back to default tuning");
            Tuning::default()
        }
    }
}

fn main() {
    env_logger::init();
    log::info!("Puppy Runner (headless) starting...");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = parse_mode(args.first().map(String::as_str));
    let seed = args
        .get(1)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0x5EED);
    let tuning = load_tuning(args.get(2).map(String::as_str));
    let player_x = tuning.player_start_x;

    let mut session = RunSession::new(seed, tuning);
    let mut world = ScriptedWorld::default();
    if let Err(err) = session.select_mode(mode) {
        log::error!("could not start run: {err}");
        return;
    }

    let delta_ms = EXPECTED_FRAME_MS.round() as u32;
    let mut elapsed: u64 = 0;
    while !session.phase().is_terminal() && elapsed < MAX_RUN_MS {
        for command in session.drain_commands() {
            world.apply(&command);
        }
        let input = if session.phase() == SessionPhase::Playing {
            world.step(delta_ms, player_x)
        } else {
            TickInput::default()
        };
        tick(&mut session, &input, delta_ms);
        elapsed += u64::from(delta_ms);
    }
    for command in session.drain_commands() {
        world.apply(&command);
    }

    let score = session.score();
    println!(
        "Finished in {:.1}s of game time: phase {:?}, speed {:.1}x, collected {}, missed {}, P1 {}, P2 {}",
        elapsed as f64 / 1000.0,
        session.phase(),
        session.state().scroll_speed_multiplier,
        score.items_collected,
        score.items_missed,
        score.player1_total,
        score.player2_total
    );
}
