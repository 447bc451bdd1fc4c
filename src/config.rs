//! Tunable gameplay parameters.
//!
//! A TOML file only needs to name the values it changes: the document is
//! laid over the serialized defaults before it is deserialized, so a
//! partial `[ships.slasher]` table keeps the slasher's own numbers.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::entities::Archetype;

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Values that parse but cannot drive a game
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ── Sections ─────────────────────────────────────────────────────────────────

/// Play-field dimensions in world units.  Origin is the top-left corner,
/// `y` grows downward.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub width: f32,
    pub height: f32,
    /// Distance beyond the arena edge after which enemies and projectiles
    /// are despawned.
    pub despawn_margin: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            despawn_margin: 80.0,
        }
    }
}

/// Per-archetype ship attributes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipStats {
    pub radius: f32,
    pub max_health: f32,
    /// World units per second.
    pub speed: f32,
    /// Seconds between shots (0 = never fires).
    pub fire_interval: f32,
    /// Damage dealt to the other side of a contact.
    pub contact_damage: f32,
    /// Flat reduction applied to every incoming hit.
    pub armor: f32,
    /// Points awarded when the player destroys this ship.
    pub score: u32,
}

impl Default for ShipStats {
    fn default() -> Self {
        Self {
            radius: 12.0,
            max_health: 100.0,
            speed: 100.0,
            fire_interval: 0.0,
            contact_damage: 10.0,
            armor: 0.0,
            score: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipsConfig {
    pub player: ShipStats,
    pub destroyer: ShipStats,
    pub slasher: ShipStats,
    pub tanker: ShipStats,
    /// Preferred distance a destroyer keeps from the player.
    pub destroyer_standoff: f32,
    /// Destroyers only fire while the player is within this range.
    pub destroyer_fire_range: f32,
    pub tanker_regen_per_second: f32,
    /// Seconds between slasher minions launched by a tanker (0 = never).
    pub tanker_minion_interval: f32,
    /// Seconds an enemy waits after a contact exchange before the next one.
    pub contact_rearm_seconds: f32,
}

impl ShipsConfig {
    pub fn stats(&self, archetype: Archetype) -> &ShipStats {
        match archetype {
            Archetype::Player => &self.player,
            Archetype::Destroyer => &self.destroyer,
            Archetype::Slasher => &self.slasher,
            Archetype::Tanker => &self.tanker,
        }
    }
}

impl Default for ShipsConfig {
    fn default() -> Self {
        Self {
            player: ShipStats {
                radius: 12.0,
                max_health: 100.0,
                speed: 260.0,
                fire_interval: 0.18,
                contact_damage: 20.0,
                armor: 0.0,
                score: 0,
            },
            destroyer: ShipStats {
                radius: 16.0,
                max_health: 60.0,
                speed: 70.0,
                fire_interval: 1.6,
                contact_damage: 25.0,
                armor: 0.0,
                score: 150,
            },
            slasher: ShipStats {
                radius: 10.0,
                max_health: 20.0,
                speed: 210.0,
                fire_interval: 0.0,
                contact_damage: 20.0,
                armor: 0.0,
                score: 100,
            },
            tanker: ShipStats {
                radius: 22.0,
                max_health: 200.0,
                speed: 40.0,
                fire_interval: 0.0,
                contact_damage: 35.0,
                armor: 4.0,
                score: 300,
            },
            destroyer_standoff: 220.0,
            destroyer_fire_range: 450.0,
            tanker_regen_per_second: 3.0,
            tanker_minion_interval: 6.0,
            contact_rearm_seconds: 0.75,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileStats {
    pub speed: f32,
    pub damage: f32,
    pub radius: f32,
    /// Seconds before the projectile fizzles out.
    pub lifetime: f32,
}

impl Default for ProjectileStats {
    fn default() -> Self {
        Self {
            speed: 400.0,
            damage: 10.0,
            radius: 3.0,
            lifetime: 2.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponsConfig {
    pub player_shot: ProjectileStats,
    pub enemy_shot: ProjectileStats,
    /// Angle between neighbouring shots of a SpreadShot volley.
    pub spread_degrees: f32,
    /// Fire-interval multiplier while RapidFire is active.
    pub rapid_fire_factor: f32,
}

impl Default for WeaponsConfig {
    fn default() -> Self {
        Self {
            player_shot: ProjectileStats {
                speed: 520.0,
                damage: 10.0,
                radius: 3.0,
                lifetime: 2.5,
            },
            enemy_shot: ProjectileStats {
                speed: 240.0,
                damage: 12.0,
                radius: 4.0,
                lifetime: 4.0,
            },
            spread_degrees: 12.0,
            rapid_fire_factor: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerupsConfig {
    /// Half width and half height of the pickup box.
    pub half_extent: f32,
    /// Downward drift speed.
    pub fall_speed: f32,
    /// Seconds a powerup stays in play before vanishing.
    pub lifetime: f32,
    pub heal_amount: f32,
    pub rapid_fire_seconds: f32,
    pub shield_seconds: f32,
    pub spread_shot_seconds: f32,
    pub piercing_seconds: f32,
}

impl Default for PowerupsConfig {
    fn default() -> Self {
        Self {
            half_extent: 8.0,
            fall_speed: 60.0,
            lifetime: 10.0,
            heal_amount: 30.0,
            rapid_fire_seconds: 8.0,
            shield_seconds: 6.0,
            spread_shot_seconds: 8.0,
            piercing_seconds: 6.0,
        }
    }
}

/// One row of the difficulty table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    /// Progress (seconds, score-adjusted) at which this tier takes over.
    pub starts_at: f32,
    pub slasher_weight: u32,
    pub destroyer_weight: u32,
    pub tanker_weight: u32,
    /// Enemies spawned each time the enemy timer fires.
    pub burst: u32,
}

impl TierConfig {
    pub fn weight(&self, archetype: Archetype) -> u32 {
        match archetype {
            Archetype::Player => 0,
            Archetype::Destroyer => self.destroyer_weight,
            Archetype::Slasher => self.slasher_weight,
            Archetype::Tanker => self.tanker_weight,
        }
    }
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            starts_at: 0.0,
            slasher_weight: 1,
            destroyer_weight: 0,
            tanker_weight: 0,
            burst: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawningConfig {
    /// Enemy spawn interval at the start of a session (I0).
    pub base_interval: f32,
    /// Floor the interval settles at (Imin).
    pub min_interval: f32,
    /// Progress at which the interval reaches its floor (T_max).
    pub ramp_seconds: f32,
    /// Progress credited per point of score.
    pub seconds_per_point: f32,
    pub powerup_interval: f32,
    /// Chance that a destroyed enemy drops a powerup.
    pub drop_chance: f64,
    /// No new entity may appear closer than this to the player.
    pub safe_distance: f32,
    pub max_rerolls: u32,
    /// How far outside the edge new enemies appear.
    pub edge_offset: f32,
    pub tiers: Vec<TierConfig>,
}

impl Default for SpawningConfig {
    fn default() -> Self {
        Self {
            base_interval: 2.5,
            min_interval: 0.6,
            ramp_seconds: 180.0,
            seconds_per_point: 0.02,
            powerup_interval: 15.0,
            drop_chance: 0.12,
            safe_distance: 120.0,
            max_rerolls: 8,
            edge_offset: 30.0,
            tiers: vec![
                TierConfig {
                    starts_at: 0.0,
                    slasher_weight: 70,
                    destroyer_weight: 30,
                    tanker_weight: 0,
                    burst: 1,
                },
                TierConfig {
                    starts_at: 45.0,
                    slasher_weight: 50,
                    destroyer_weight: 35,
                    tanker_weight: 15,
                    burst: 1,
                },
                TierConfig {
                    starts_at: 90.0,
                    slasher_weight: 40,
                    destroyer_weight: 35,
                    tanker_weight: 25,
                    burst: 2,
                },
                TierConfig {
                    starts_at: 150.0,
                    slasher_weight: 35,
                    destroyer_weight: 35,
                    tanker_weight: 30,
                    burst: 3,
                },
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Largest delta a single tick will simulate.
    pub max_dt: f32,
    /// Seconds the splash screen stays up without input.
    pub splash_seconds: f32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            max_dt: 0.1,
            splash_seconds: 2.0,
        }
    }
}

// ── Root ─────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub arena: ArenaConfig,
    pub ships: ShipsConfig,
    pub weapons: WeaponsConfig,
    pub powerups: PowerupsConfig,
    pub spawning: SpawningConfig,
    pub timing: TimingConfig,
}

impl GameConfig {
    /// Read, parse and validate a TOML file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        log::info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse a (possibly partial) document.  Values it names replace the
    /// defaults; everything else, including fields of a partially given
    /// table such as `[ships.slasher]`, keeps the default for that spot.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let patch: toml::Table = contents.parse()?;
        let mut merged = match toml::Value::try_from(Self::default())? {
            toml::Value::Table(table) => table,
            other => {
                return Err(ConfigError::Invalid(format!(
                    "defaults did not serialize to a table: {other}"
                )))
            }
        };
        overlay(&mut merged, patch);

        let config: Self = toml::Value::Table(merged).try_into()?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.arena.width <= 0.0 || self.arena.height <= 0.0 {
            return invalid(format!(
                "arena must have a positive size, got {}x{}",
                self.arena.width, self.arena.height
            ));
        }
        for archetype in Archetype::ALL {
            let stats = self.ships.stats(archetype);
            if stats.radius <= 0.0 || stats.max_health <= 0.0 {
                return invalid(format!(
                    "{archetype:?} needs a positive radius and max_health"
                ));
            }
        }

        let spawning = &self.spawning;
        if spawning.min_interval <= 0.0 || spawning.base_interval < spawning.min_interval {
            return invalid(format!(
                "spawn intervals must satisfy 0 < min_interval <= base_interval, got {} and {}",
                spawning.min_interval, spawning.base_interval
            ));
        }
        if spawning.ramp_seconds <= 0.0 {
            return invalid("ramp_seconds must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&spawning.drop_chance) {
            return invalid(format!("drop_chance {} is not a probability", spawning.drop_chance));
        }
        match spawning.tiers.first() {
            None => return invalid("at least one spawn tier is required".to_string()),
            Some(first) if first.starts_at != 0.0 => {
                return invalid("the first spawn tier must start at 0".to_string());
            }
            Some(_) => {}
        }
        for pair in spawning.tiers.windows(2) {
            if pair[1].starts_at <= pair[0].starts_at {
                return invalid("spawn tier thresholds must be strictly ascending".to_string());
            }
        }
        for (i, tier) in spawning.tiers.iter().enumerate() {
            let total = u64::from(tier.slasher_weight)
                + u64::from(tier.destroyer_weight)
                + u64::from(tier.tanker_weight);
            if total == 0 {
                return invalid(format!("spawn tier {i} has no archetype weight"));
            }
            if tier.burst == 0 {
                return invalid(format!("spawn tier {i} has a burst of 0"));
            }
        }
        if self.timing.max_dt <= 0.0 {
            return invalid("max_dt must be positive".to_string());
        }
        Ok(())
    }
}

/// Recursively lay `patch` over `base`.  Tables merge key by key; any other
/// value (arrays included, so a tier table is replaced whole) overwrites.
fn overlay(base: &mut toml::Table, patch: toml::Table) {
    for (key, value) in patch {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(table)) => {
                overlay(existing, table)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
