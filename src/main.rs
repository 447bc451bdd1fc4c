mod display;

use std::collections::HashMap;
use std::io::{stdout, BufWriter, Write};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crossterm::{
    cursor,
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    terminal, ExecutableCommand,
};
use glam::Vec2;

use space_shooter::events::GameEvent;
use space_shooter::{ConfigError, Game, GameConfig, Input};

const FRAME: Duration = Duration::from_millis(33); // ≈30 FPS

/// A key is considered "held" if its last press/repeat event arrived within
/// this many frames.  Covers terminals that don't emit key-release events:
/// the OS key-repeat rate is ≥ 15 Hz, so a window of 4 frames (≈133 ms) is
/// always refreshed before expiry.
const HOLD_WINDOW: u64 = 4;

/// Environment variable holding a fixed session seed.
const SEED_VAR: &str = "SPACE_SHOOTER_SEED";

#[derive(thiserror::Error, Debug)]
enum AppError {
    #[error("terminal error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Returns true if `key` was seen within the last `HOLD_WINDOW` frames.
fn is_held(key_frame: &HashMap<KeyCode, u64>, key: &KeyCode, frame: u64) -> bool {
    key_frame
        .get(key)
        .map(|&last| frame.saturating_sub(last) <= HOLD_WINDOW)
        .unwrap_or(false)
}

fn any_held(key_frame: &HashMap<KeyCode, u64>, keys: &[KeyCode], frame: u64) -> bool {
    keys.iter().any(|k| is_held(key_frame, k, frame))
}

/// Collapse the held-key map into this frame's `Input`.
fn read_input(key_frame: &HashMap<KeyCode, u64>, frame: u64, confirm: bool) -> Input {
    let axis = |neg: &[KeyCode], pos: &[KeyCode]| {
        let n = any_held(key_frame, neg, frame) as i32 as f32;
        let p = any_held(key_frame, pos, frame) as i32 as f32;
        p - n
    };
    let x = axis(
        &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')],
        &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')],
    );
    let y = axis(
        &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')],
        &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')],
    );
    Input {
        movement: Vec2::new(x, y),
        fire: is_held(key_frame, &KeyCode::Char(' '), frame),
        confirm,
    }
}

/// Fire-and-forget hook for sound and HUD collaborators.  The terminal
/// front end has no audio, so events only go to the log.
fn announce(event: &GameEvent) {
    match event {
        GameEvent::ShotFired { .. } => log::trace!("{event:?}"),
        GameEvent::GameOver { score } => log::info!("final score {score}"),
        _ => log::debug!("{event:?}"),
    }
}

// ── Frame loop ────────────────────────────────────────────────────────────────

/// Input model: instead of acting on each key event individually, we maintain
/// a `key_frame` map that records the frame number of the last press/repeat
/// event for every key.  Each frame we check which keys are still "fresh"
/// (within `HOLD_WINDOW` frames) and hand them to the core together.  ENTER
/// is edge-triggered so one press advances exactly one screen.
fn run<W: Write>(out: &mut W, rx: &mpsc::Receiver<Event>, mut game: Game) -> Result<(), AppError> {
    let mut key_frame: HashMap<KeyCode, u64> = HashMap::new();
    let mut frame: u64 = 0;
    let mut last = Instant::now();

    loop {
        let frame_start = Instant::now();
        frame += 1;
        let mut confirm = false;

        // ── Drain all pending input events (non-blocking) ─────────────────────
        while let Ok(ev) = rx.try_recv() {
            let Event::Key(KeyEvent {
                code,
                kind,
                modifiers,
                ..
            }) = ev
            else {
                continue;
            };
            match kind {
                KeyEventKind::Press => {
                    key_frame.insert(code, frame);
                    match code {
                        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return Ok(()),
                        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                            return Ok(());
                        }
                        KeyCode::Enter => confirm = true,
                        _ => {}
                    }
                }
                KeyEventKind::Repeat => {
                    key_frame.insert(code, frame);
                }
                KeyEventKind::Release => {
                    key_frame.remove(&code);
                }
            }
        }

        let input = read_input(&key_frame, frame, confirm);
        let dt = last.elapsed().as_secs_f32();
        last = Instant::now();

        let result = game.tick(dt, &input);
        for event in &result.events {
            announce(event);
        }

        let (width, height) = terminal::size()?;
        display::render(out, &result.snapshot, width, height)?;

        let elapsed = frame_start.elapsed();
        if elapsed < FRAME {
            thread::sleep(FRAME - elapsed);
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<(), AppError> {
    // Logs go to stderr; redirect it (`2> shooter.log`) while playing.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => GameConfig::load_from_file(&path)?,
        None => GameConfig::default(),
    };
    let seed = std::env::var(SEED_VAR)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or_else(rand::random);
    log::info!("starting with seed {seed}");

    let raw_out = stdout();
    let mut out = BufWriter::new(raw_out);

    terminal::enable_raw_mode()?;
    out.execute(terminal::EnterAlternateScreen)?;
    out.execute(cursor::Hide)?;

    // Request key-release (and key-repeat) events from the terminal.
    // Ghostty / kitty-protocol terminals support this; others fall back gracefully.
    let keyboard_enhanced = out
        .execute(PushKeyboardEnhancementFlags(
            KeyboardEnhancementFlags::REPORT_EVENT_TYPES,
        ))
        .is_ok();

    // Dedicate a thread exclusively to blocking event reads, sending them
    // through a channel so the frame loop never has to block on I/O.
    let (tx, rx) = mpsc::channel::<Event>();
    thread::spawn(move || loop {
        match event::read() {
            Ok(ev) => {
                if tx.send(ev).is_err() {
                    break; // receiver dropped → program exiting
                }
            }
            Err(_) => break,
        }
    });

    let result = run(&mut out, &rx, Game::new(config, seed));

    // Always restore the terminal
    if keyboard_enhanced {
        let _ = out.execute(PopKeyboardEnhancementFlags);
    }
    let _ = out.execute(cursor::Show);
    let _ = out.execute(terminal::LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();

    result
}
