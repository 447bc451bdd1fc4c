/// Enemy and powerup scheduling.
///
/// Difficulty is a pure function of *progress*: elapsed session seconds plus
/// a score bonus.  The enemy interval shrinks linearly from `base_interval`
/// to `min_interval` over `ramp_seconds` of progress and the archetype mix
/// follows an explicit tier table, so identical time/score always yields the
/// identical schedule.  All randomness (positions, archetype draw) comes
/// through the injected RNG.

use glam::Vec2;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::config::{ArenaConfig, GameConfig, SpawningConfig, TierConfig};
use crate::entities::{Archetype, Entity, PowerupKind};
use crate::ships;

// ── Difficulty curve (pure) ──────────────────────────────────────────────────

/// Seconds between enemy spawns at the given progress.  Non-increasing in
/// `progress`: `base_interval` at 0, `min_interval` from `ramp_seconds` on.
pub fn spawn_interval(progress: f32, cfg: &SpawningConfig) -> f32 {
    let t = if cfg.ramp_seconds > 0.0 {
        (progress.max(0.0) / cfg.ramp_seconds).min(1.0)
    } else {
        1.0
    };
    cfg.base_interval - (cfg.base_interval - cfg.min_interval) * t
}

/// Index of the last tier whose threshold has been reached.
pub fn tier_for(progress: f32, cfg: &SpawningConfig) -> usize {
    cfg.tiers
        .iter()
        .rposition(|tier| tier.starts_at <= progress)
        .unwrap_or(0)
}

/// Weighted archetype draw for one enemy of the given tier.
pub fn choose_archetype(tier: &TierConfig, rng: &mut impl Rng) -> Archetype {
    let weights = Archetype::ENEMIES.map(|a| u64::from(tier.weight(a)));
    match WeightedIndex::new(weights) {
        Ok(dist) => Archetype::ENEMIES[dist.sample(rng)],
        Err(err) => {
            log::warn!("unusable tier weights {weights:?} ({err}), defaulting to slasher");
            Archetype::Slasher
        }
    }
}

// ── Placement ────────────────────────────────────────────────────────────────

/// Whether `pos` is at least `safe_distance` from the player (or there is
/// no player).
pub fn is_safe(pos: Vec2, player_pos: Option<Vec2>, safe_distance: f32) -> bool {
    player_pos.map_or(true, |p| p.distance(pos) >= safe_distance)
}

/// Uniform draw from `[lo, hi)`, or `lo` when the range is empty.
fn span(lo: f32, hi: f32, rng: &mut impl Rng) -> f32 {
    if hi > lo {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}

/// A point just outside the top, left or right edge (top twice as likely),
/// rerolled while it is within `safe_distance` of the player.  `None` when
/// every try landed too close.
pub fn enemy_spawn_position(
    arena: &ArenaConfig,
    cfg: &SpawningConfig,
    player_pos: Option<Vec2>,
    rng: &mut impl Rng,
) -> Option<Vec2> {
    let off = cfg.edge_offset;
    (0..=cfg.max_rerolls)
        .map(|_| match rng.gen_range(0..4) {
            0 => Vec2::new(-off, span(0.0, arena.height * 0.6, rng)),
            1 => Vec2::new(arena.width + off, span(0.0, arena.height * 0.6, rng)),
            _ => Vec2::new(span(0.0, arena.width, rng), -off),
        })
        .find(|&pos| is_safe(pos, player_pos, cfg.safe_distance))
}

/// A point in the top quarter of the arena, rerolled like enemy positions.
pub fn powerup_spawn_position(
    config: &GameConfig,
    player_pos: Option<Vec2>,
    rng: &mut impl Rng,
) -> Option<Vec2> {
    let arena = &config.arena;
    let half = config.powerups.half_extent;
    (0..=config.spawning.max_rerolls)
        .map(|_| {
            Vec2::new(
                span(half, arena.width - half, rng),
                span(half, arena.height * 0.25, rng),
            )
        })
        .find(|&pos| is_safe(pos, player_pos, config.spawning.safe_distance))
}

// ── Schedule state ───────────────────────────────────────────────────────────

/// Per-session spawn bookkeeping.  Only [`SpawnDirector::run`] advances it.
#[derive(Clone, Debug)]
pub struct SpawnDirector {
    elapsed: f32,
    enemy_timer: f32,
    powerup_timer: f32,
    tier: usize,
    pending_drops: Vec<Vec2>,
    enemies_spawned: u32,
    powerups_spawned: u32,
}

impl SpawnDirector {
    pub fn new(cfg: &SpawningConfig) -> Self {
        Self {
            elapsed: 0.0,
            enemy_timer: cfg.base_interval,
            powerup_timer: cfg.powerup_interval,
            tier: 0,
            pending_drops: Vec::new(),
            enemies_spawned: 0,
            powerups_spawned: 0,
        }
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn tier(&self) -> usize {
        self.tier
    }

    pub fn enemies_spawned(&self) -> u32 {
        self.enemies_spawned
    }

    pub fn powerups_spawned(&self) -> u32 {
        self.powerups_spawned
    }

    /// Seconds until the next enemy wave.
    pub fn enemy_timer(&self) -> f32 {
        self.enemy_timer
    }

    pub fn pending_drops(&self) -> &[Vec2] {
        &self.pending_drops
    }

    pub fn progress(&self, score: u32, cfg: &SpawningConfig) -> f32 {
        self.elapsed + score as f32 * cfg.seconds_per_point
    }

    /// Place a powerup at `pos` on the next spawn phase.
    pub fn queue_drop(&mut self, pos: Vec2) {
        self.pending_drops.push(pos);
    }

    /// Advance the timers by `dt` and return whatever should enter play.
    pub fn run(
        &mut self,
        dt: f32,
        score: u32,
        player_pos: Option<Vec2>,
        config: &GameConfig,
        rng: &mut impl Rng,
    ) -> Vec<Entity> {
        let cfg = &config.spawning;
        self.elapsed += dt;
        let progress = self.progress(score, cfg);

        let tier_index = tier_for(progress, cfg);
        if tier_index != self.tier {
            log::info!(
                "difficulty tier {} -> {} at {:.1}s",
                self.tier,
                tier_index,
                self.elapsed
            );
            self.tier = tier_index;
        }

        let mut spawned = Vec::new();

        // ── Enemy wave ───────────────────────────────────────────────────────
        self.enemy_timer -= dt;
        if self.enemy_timer <= 0.0 {
            self.enemy_timer = spawn_interval(progress, cfg);
            if let Some(tier) = cfg.tiers.get(tier_index) {
                for _ in 0..tier.burst {
                    let archetype = choose_archetype(tier, rng);
                    match enemy_spawn_position(&config.arena, cfg, player_pos, rng) {
                        Some(pos) => {
                            log::debug!("spawning {archetype:?} at {pos:?}");
                            spawned.push(ships::new_enemy(archetype, pos, config));
                            self.enemies_spawned += 1;
                        }
                        None => log::debug!("no safe position for {archetype:?}, skipped"),
                    }
                }
            }
        }

        // ── Timed powerup ────────────────────────────────────────────────────
        if cfg.powerup_interval > 0.0 {
            self.powerup_timer -= dt;
            if self.powerup_timer <= 0.0 {
                self.powerup_timer = cfg.powerup_interval;
                let kind = random_powerup(rng);
                match powerup_spawn_position(config, player_pos, rng) {
                    Some(pos) => {
                        spawned.push(Entity::new_powerup(kind, pos, &config.powerups));
                        self.powerups_spawned += 1;
                    }
                    None => log::debug!("no safe position for {kind:?}, skipped"),
                }
            }
        }

        // ── Death drops ──────────────────────────────────────────────────────
        for pos in std::mem::take(&mut self.pending_drops) {
            if !is_safe(pos, player_pos, cfg.safe_distance) {
                log::debug!("drop at {pos:?} too close to the player, skipped");
                continue;
            }
            let kind = random_powerup(rng);
            spawned.push(Entity::new_powerup(kind, pos, &config.powerups));
            self.powerups_spawned += 1;
        }

        spawned
    }
}

fn random_powerup(rng: &mut impl Rng) -> PowerupKind {
    PowerupKind::ALL[rng.gen_range(0..PowerupKind::ALL.len())]
}
