/// Rendering layer: all terminal I/O lives here.
///
/// Each function receives a mutable writer and an immutable snapshot of the
/// game.  No game logic is performed; world coordinates are only scaled onto
/// the terminal grid.

use std::io::Write;

use crossterm::{
    cursor,
    style::{self, Color, Print},
    terminal, QueueableCommand,
};
use glam::Vec2;
use space_shooter::compute::{EntityView, Snapshot};
use space_shooter::entities::{Archetype, BuffKind, Category, Faction, GameStatus, PowerupKind};

// ── Colour palette ────────────────────────────────────────────────────────────

const C_BORDER: Color = Color::DarkBlue;
const C_HUD_SCORE: Color = Color::Yellow;
const C_HUD_HEALTH: Color = Color::Red;
const C_PLAYER: Color = Color::White;
const C_DESTROYER: Color = Color::Green;
const C_SLASHER: Color = Color::Red;
const C_TANKER: Color = Color::DarkYellow;
const C_SHOT_PLAYER: Color = Color::Cyan;
const C_SHOT_ENEMY: Color = Color::Magenta;
const C_HINT: Color = Color::DarkGrey;
const C_BUFF: Color = Color::Yellow;

/// Terminal geometry of the play field.
struct Grid {
    width: u16,
    height: u16,
    arena: Vec2,
}

impl Grid {
    /// Map a world position to a cell inside the border, or `None` when it
    /// lies outside the arena.
    fn cell(&self, pos: Vec2) -> Option<(u16, u16)> {
        if pos.x < 0.0 || pos.y < 0.0 || pos.x > self.arena.x || pos.y > self.arena.y {
            return None;
        }
        let cols = self.width.saturating_sub(2).max(1) as f32;
        let rows = self.height.saturating_sub(4).max(1) as f32;
        let col = 1 + ((pos.x / self.arena.x) * (cols - 1.0)).round() as u16;
        let row = 2 + ((pos.y / self.arena.y) * (rows - 1.0)).round() as u16;
        Some((col, row))
    }
}

// ── Public entry point ────────────────────────────────────────────────────────

/// Render one complete frame.
pub fn render<W: Write>(
    out: &mut W,
    snap: &Snapshot,
    width: u16,
    height: u16,
) -> std::io::Result<()> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;
    let grid = Grid {
        width,
        height,
        arena: snap.arena,
    };

    match snap.status {
        GameStatus::Splash => draw_splash(out, &grid)?,
        GameStatus::Menu => draw_menu(out, &grid, snap)?,
        GameStatus::Playing | GameStatus::GameOver => {
            draw_border(out, &grid)?;
            draw_hud(out, &grid, snap)?;
            for view in &snap.entities {
                draw_entity(out, &grid, view)?;
            }
            draw_controls_hint(out, &grid)?;
            if snap.status == GameStatus::GameOver {
                draw_game_over(out, &grid, snap)?;
            }
        }
    }

    // Park cursor in a harmless spot and flush
    out.queue(style::ResetColor)?;
    out.queue(cursor::MoveTo(0, height.saturating_sub(1)))?;
    out.flush()?;
    Ok(())
}

// ── Title screens ─────────────────────────────────────────────────────────────

fn centered<W: Write>(
    out: &mut W,
    grid: &Grid,
    row: u16,
    text: &str,
    color: Color,
) -> std::io::Result<()> {
    let col = (grid.width / 2).saturating_sub(text.chars().count() as u16 / 2);
    out.queue(cursor::MoveTo(col, row))?;
    out.queue(style::SetForegroundColor(color))?;
    out.queue(Print(text))?;
    Ok(())
}

fn draw_splash<W: Write>(out: &mut W, grid: &Grid) -> std::io::Result<()> {
    let cy = grid.height / 2;
    centered(out, grid, cy.saturating_sub(1), "★  SPACE  SHOOTER  ★", Color::Cyan)?;
    centered(out, grid, cy + 1, "press ENTER", Color::DarkGrey)?;
    Ok(())
}

fn draw_menu<W: Write>(out: &mut W, grid: &Grid, snap: &Snapshot) -> std::io::Result<()> {
    let cy = grid.height / 2;
    centered(out, grid, cy.saturating_sub(6), "★  SPACE  SHOOTER  ★", Color::Cyan)?;
    if snap.high_score > 0 {
        let best = format!("Best Score: {}", snap.high_score);
        centered(out, grid, cy.saturating_sub(5), &best, Color::Yellow)?;
    }

    let left = (grid.width / 2).saturating_sub(18);
    let enemies: &[(&str, Color, &str)] = &[
        ("«▼»", C_DESTROYER, " Destroyer - keeps its distance, fires plasma"),
        ("\\v/", C_SLASHER, " Slasher   - dives at you and explodes"),
        ("[█]", C_TANKER, " Tanker    - armoured, heals, launches slashers"),
    ];
    for (i, (sym, color, desc)) in enemies.iter().enumerate() {
        out.queue(cursor::MoveTo(left, cy.saturating_sub(3) + i as u16))?;
        out.queue(style::SetForegroundColor(*color))?;
        out.queue(Print(sym))?;
        out.queue(style::SetForegroundColor(Color::DarkGrey))?;
        out.queue(Print(*desc))?;
    }

    out.queue(cursor::MoveTo(left, cy + 1))?;
    out.queue(style::SetForegroundColor(Color::DarkGrey))?;
    out.queue(Print("Power-ups (fly into them):"))?;
    for (i, kind) in PowerupKind::ALL.iter().enumerate() {
        let (sym, color) = powerup_glyph(*kind);
        out.queue(cursor::MoveTo(left, cy + 2 + i as u16))?;
        out.queue(style::SetForegroundColor(color))?;
        out.queue(Print(sym))?;
        out.queue(style::SetForegroundColor(Color::DarkGrey))?;
        out.queue(Print(format!(" {kind:?}")))?;
    }

    centered(out, grid, cy + 8, "ENTER : Start   Q : Quit", Color::White)?;
    Ok(())
}

// ── Border ────────────────────────────────────────────────────────────────────

fn draw_border<W: Write>(out: &mut W, grid: &Grid) -> std::io::Result<()> {
    let w = grid.width as usize;
    let h = grid.height;

    out.queue(style::SetForegroundColor(C_BORDER))?;

    out.queue(cursor::MoveTo(0, 1))?;
    out.queue(Print(format!("┌{}┐", "─".repeat(w.saturating_sub(2)))))?;

    out.queue(cursor::MoveTo(0, h.saturating_sub(2)))?;
    out.queue(Print(format!("└{}┘", "─".repeat(w.saturating_sub(2)))))?;

    for row in 2..h.saturating_sub(2) {
        out.queue(cursor::MoveTo(0, row))?;
        out.queue(Print("│"))?;
        out.queue(cursor::MoveTo(grid.width.saturating_sub(1), row))?;
        out.queue(Print("│"))?;
    }

    Ok(())
}

// ── HUD (row 0) ───────────────────────────────────────────────────────────────

fn draw_hud<W: Write>(out: &mut W, grid: &Grid, snap: &Snapshot) -> std::io::Result<()> {
    // Score and high score (left)
    out.queue(cursor::MoveTo(1, 0))?;
    out.queue(style::SetForegroundColor(C_HUD_SCORE))?;
    out.queue(Print(format!(
        "Score:{:>6}  Hi:{:>6}",
        snap.score, snap.high_score
    )))?;

    // Tier and clock (centre)
    let tier = format!("[ TIER {} · {:>3.0}s ]", snap.tier + 1, snap.elapsed);
    let tx = (grid.width / 2).saturating_sub(tier.chars().count() as u16 / 2);
    out.queue(cursor::MoveTo(tx, 0))?;
    out.queue(style::SetForegroundColor(Color::White))?;
    out.queue(Print(&tier))?;

    // Buffs + health bar (right)
    let Some(player) = &snap.player else {
        return Ok(());
    };
    let buffs: String = player
        .buffs
        .iter()
        .map(|b| format!("[{} {:>2.0}s] ", buff_tag(b.kind), b.remaining.ceil()))
        .collect();
    let filled = if player.max_health > 0.0 {
        ((player.health / player.max_health) * 10.0).ceil() as usize
    } else {
        0
    };
    let bar = format!(
        "HP {}{}",
        "█".repeat(filled.min(10)),
        "░".repeat(10 - filled.min(10))
    );

    let total = buffs.chars().count() + bar.chars().count();
    let rx = grid.width.saturating_sub(total as u16 + 1);
    out.queue(cursor::MoveTo(rx, 0))?;
    if !buffs.is_empty() {
        out.queue(style::SetForegroundColor(C_BUFF))?;
        out.queue(Print(&buffs))?;
    }
    out.queue(style::SetForegroundColor(C_HUD_HEALTH))?;
    out.queue(Print(&bar))?;

    Ok(())
}

fn buff_tag(kind: BuffKind) -> &'static str {
    match kind {
        BuffKind::RapidFire => "! RAPID",
        BuffKind::Shield => "◈ SHIELD",
        BuffKind::SpreadShot => "★ SPREAD",
        BuffKind::Piercing => "↑ PIERCE",
    }
}

// ── Entities ──────────────────────────────────────────────────────────────────

fn powerup_glyph(kind: PowerupKind) -> (&'static str, Color) {
    match kind {
        PowerupKind::Heal => ("✚", Color::Green),
        PowerupKind::RapidFire => ("!", Color::Cyan),
        PowerupKind::Shield => ("◈", Color::Blue),
        PowerupKind::SpreadShot => ("★", Color::Yellow),
        PowerupKind::Piercing => ("↑", Color::White),
    }
}

fn draw_entity<W: Write>(out: &mut W, grid: &Grid, view: &EntityView) -> std::io::Result<()> {
    let Some((col, row)) = grid.cell(view.pos) else {
        return Ok(());
    };

    let (glyph, color): (&str, Color) = match view.category {
        Category::Player => ("▲", C_PLAYER),
        Category::Enemy => match view.archetype {
            Some(Archetype::Destroyer) => ("«▼»", C_DESTROYER),
            Some(Archetype::Tanker) => ("[█]", C_TANKER),
            _ => ("\\v/", C_SLASHER),
        },
        Category::Projectile => match view.faction {
            Some(Faction::Player) => ("║", C_SHOT_PLAYER),
            _ => ("•", C_SHOT_ENEMY),
        },
        Category::Powerup => view.powerup.map(powerup_glyph).unwrap_or(("?", Color::White)),
    };

    // Wide sprites are centred on the cell.
    let half = glyph.chars().count() as u16 / 2;
    out.queue(cursor::MoveTo(col.saturating_sub(half).max(1), row))?;
    out.queue(style::SetForegroundColor(color))?;
    out.queue(Print(glyph))?;

    // Damaged enemies show a dim marker underneath.
    if view.category == Category::Enemy && view.health_fraction < 0.5 {
        let below = row + 1;
        if below < grid.height.saturating_sub(2) {
            out.queue(cursor::MoveTo(col, below))?;
            out.queue(style::SetForegroundColor(Color::DarkGrey))?;
            out.queue(Print("·"))?;
        }
    }
    Ok(())
}

// ── Controls hint (last row) ──────────────────────────────────────────────────

fn draw_controls_hint<W: Write>(out: &mut W, grid: &Grid) -> std::io::Result<()> {
    out.queue(cursor::MoveTo(1, grid.height.saturating_sub(1)))?;
    out.queue(style::SetForegroundColor(C_HINT))?;
    out.queue(Print("←↑↓→ / WASD : Move   SPACE : Shoot   Q : Quit"))?;
    Ok(())
}

// ── Game-over overlay ─────────────────────────────────────────────────────────

fn draw_game_over<W: Write>(out: &mut W, grid: &Grid, snap: &Snapshot) -> std::io::Result<()> {
    let score_line = format!("Final Score: {:>6}", snap.score);
    let kills_line = format!("Ships downed: {:>5}", snap.kills);
    let new_best = snap.score >= snap.high_score && snap.score > 0;
    let best_line = if new_best {
        format!("★ NEW BEST: {:>6} ★", snap.high_score)
    } else {
        format!("Best Score:  {:>6}", snap.high_score)
    };

    let lines: &[(&str, Color)] = &[
        ("╔════════════════════╗", Color::Red),
        ("║    GAME  OVER      ║", Color::Red),
        ("╚════════════════════╝", Color::Red),
        (score_line.as_str(), Color::Yellow),
        (kills_line.as_str(), Color::White),
        (best_line.as_str(), if new_best { Color::Yellow } else { Color::DarkGrey }),
        ("ENTER - Menu  Q - Quit", Color::White),
    ];

    let start_row = (grid.height / 2).saturating_sub(lines.len() as u16 / 2);
    for (i, (msg, color)) in lines.iter().enumerate() {
        centered(out, grid, start_row + i as u16, msg, *color)?;
    }

    Ok(())
}
