/// Simulation entity types: data plus the lifecycle helpers every
/// category shares.  Archetype behaviour lives in `ships`.

use glam::Vec2;
use slotmap::new_key_type;

use crate::config::{PowerupsConfig, ProjectileStats, ShipStats};

new_key_type! {
    /// Generation-tagged handle into the session's entity set.  A handle to
    /// a purged entity never resolves to a newer occupant of the same slot.
    pub struct EntityId;
}

// ── Tags ─────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Player,
    Enemy,
    Projectile,
    Powerup,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Faction {
    Player,
    Enemy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Archetype {
    Player,
    /// Slow, keeps its distance and fires aimed plasma.
    Destroyer,
    /// Fast melee diver that self-destructs on contact.
    Slasher,
    /// Armoured, regenerating and launches slasher minions.
    Tanker,
}

impl Archetype {
    pub const ALL: [Archetype; 4] = [
        Archetype::Player,
        Archetype::Destroyer,
        Archetype::Slasher,
        Archetype::Tanker,
    ];

    pub const ENEMIES: [Archetype; 3] =
        [Archetype::Slasher, Archetype::Destroyer, Archetype::Tanker];

    pub fn faction(self) -> Faction {
        match self {
            Archetype::Player => Faction::Player,
            Archetype::Destroyer | Archetype::Slasher | Archetype::Tanker => Faction::Enemy,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameStatus {
    Splash,
    Menu,
    Playing,
    GameOver,
}

// ── Geometry ─────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Circle { radius: f32 },
    /// Axis-aligned box centred on the entity position.
    Aabb { half_extents: Vec2 },
}

impl Shape {
    /// Radius of the smallest circle enclosing the shape.
    pub fn bounding_radius(&self) -> f32 {
        match *self {
            Shape::Circle { radius } => radius,
            Shape::Aabb { half_extents } => half_extents.length(),
        }
    }
}

// ── Buffs & powerups ─────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuffKind {
    RapidFire,
    Shield,
    SpreadShot,
    Piercing,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Buff {
    pub kind: BuffKind,
    /// Seconds left before the buff lapses.
    pub remaining: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PowerupKind {
    /// Instantly restores health.
    Heal,
    /// Shortens the fire interval.
    RapidFire,
    /// Absorbs all incoming damage.
    Shield,
    /// Three-way fanned volley.
    SpreadShot,
    /// Shots pass through enemies.
    Piercing,
}

impl PowerupKind {
    pub const ALL: [PowerupKind; 5] = [
        PowerupKind::Heal,
        PowerupKind::RapidFire,
        PowerupKind::Shield,
        PowerupKind::SpreadShot,
        PowerupKind::Piercing,
    ];

    /// The timed buff this powerup grants, if it is not instant.
    pub fn buff(self) -> Option<BuffKind> {
        match self {
            PowerupKind::Heal => None,
            PowerupKind::RapidFire => Some(BuffKind::RapidFire),
            PowerupKind::Shield => Some(BuffKind::Shield),
            PowerupKind::SpreadShot => Some(BuffKind::SpreadShot),
            PowerupKind::Piercing => Some(BuffKind::Piercing),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PowerupEffect {
    pub kind: PowerupKind,
    pub magnitude: f32,
    /// Zero for instant effects.
    pub duration: f32,
}

impl PowerupEffect {
    pub fn from_config(kind: PowerupKind, cfg: &PowerupsConfig) -> Self {
        let (magnitude, duration) = match kind {
            PowerupKind::Heal => (cfg.heal_amount, 0.0),
            PowerupKind::RapidFire => (1.0, cfg.rapid_fire_seconds),
            PowerupKind::Shield => (1.0, cfg.shield_seconds),
            PowerupKind::SpreadShot => (1.0, cfg.spread_shot_seconds),
            PowerupKind::Piercing => (1.0, cfg.piercing_seconds),
        };
        Self {
            kind,
            magnitude,
            duration,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Powerup {
    pub effect: PowerupEffect,
    /// Seconds until the pickup vanishes uncollected.
    pub lifetime: f32,
}

// ── Projectiles ──────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProjectileKind {
    /// Standard player shot.
    Bolt,
    /// Player shot fired under the Piercing buff.
    Lance,
    /// Enemy shot.
    Plasma,
}

impl ProjectileKind {
    /// Whether the projectile survives its first hit.
    pub fn pierces(self) -> bool {
        matches!(self, ProjectileKind::Lance)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Projectile {
    pub kind: ProjectileKind,
    pub faction: Faction,
    pub damage: f32,
    /// Seconds of flight left.
    pub lifetime: f32,
    /// Targets already struck; a piercing shot never hits one twice.
    pub struck: Vec<EntityId>,
}

// ── Ships ────────────────────────────────────────────────────────────────────

/// Per-tick steering for the player ship.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Controls {
    /// Unit-length (or shorter) movement direction.
    pub steer: Vec2,
    pub trigger: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ship {
    pub archetype: Archetype,
    pub stats: ShipStats,
    pub weapon_cooldown: f32,
    /// Tanker minion timer.
    pub ability_cooldown: f32,
    /// Time before another contact exchange can happen.
    pub contact_cooldown: f32,
    pub controls: Controls,
    pub buffs: Vec<Buff>,
}

impl Ship {
    pub fn faction(&self) -> Faction {
        self.archetype.faction()
    }

    pub fn has_buff(&self, kind: BuffKind) -> bool {
        self.buffs.iter().any(|b| b.kind == kind && b.remaining > 0.0)
    }

    pub fn buff_remaining(&self, kind: BuffKind) -> f32 {
        self.buffs
            .iter()
            .find(|b| b.kind == kind)
            .map(|b| b.remaining)
            .unwrap_or(0.0)
    }

    /// Start a buff, or extend a running one to at least `duration`.
    pub fn grant_buff(&mut self, kind: BuffKind, duration: f32) {
        match self.buffs.iter_mut().find(|b| b.kind == kind) {
            Some(buff) => buff.remaining = buff.remaining.max(duration),
            None => self.buffs.push(Buff {
                kind,
                remaining: duration,
            }),
        }
    }

    /// Count every buff down and drop the ones that ran out.
    pub fn tick_buffs(&mut self, dt: f32) {
        for buff in &mut self.buffs {
            buff.remaining -= dt;
        }
        self.buffs.retain(|b| b.remaining > 0.0);
    }
}

// ── Entity ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub enum EntityKind {
    Ship(Ship),
    Projectile(Projectile),
    Powerup(Powerup),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    /// Creation order within the session; fixes collision resolution order.
    pub serial: u64,
    pub pos: Vec2,
    pub vel: Vec2,
    pub shape: Shape,
    pub health: f32,
    pub max_health: f32,
    pub alive: bool,
    pub kind: EntityKind,
}

impl Entity {
    pub fn new_ship(archetype: Archetype, stats: &ShipStats, pos: Vec2) -> Self {
        Self {
            serial: 0,
            pos,
            vel: Vec2::ZERO,
            shape: Shape::Circle {
                radius: stats.radius,
            },
            health: stats.max_health,
            max_health: stats.max_health,
            alive: true,
            kind: EntityKind::Ship(Ship {
                archetype,
                stats: stats.clone(),
                weapon_cooldown: stats.fire_interval,
                ability_cooldown: 0.0,
                contact_cooldown: 0.0,
                controls: Controls::default(),
                buffs: Vec::new(),
            }),
        }
    }

    /// A projectile flying along `dir` (normalised here; zero falls back to
    /// straight down the screen for enemies, straight up for the player).
    pub fn new_projectile(
        kind: ProjectileKind,
        faction: Faction,
        pos: Vec2,
        dir: Vec2,
        stats: &ProjectileStats,
    ) -> Self {
        let fallback = match faction {
            Faction::Player => Vec2::NEG_Y,
            Faction::Enemy => Vec2::Y,
        };
        let dir = dir.try_normalize().unwrap_or(fallback);
        Self {
            serial: 0,
            pos,
            vel: dir * stats.speed,
            shape: Shape::Circle {
                radius: stats.radius,
            },
            health: 1.0,
            max_health: 1.0,
            alive: true,
            kind: EntityKind::Projectile(Projectile {
                kind,
                faction,
                damage: stats.damage,
                lifetime: stats.lifetime,
                struck: Vec::new(),
            }),
        }
    }

    pub fn new_powerup(kind: PowerupKind, pos: Vec2, cfg: &PowerupsConfig) -> Self {
        Self {
            serial: 0,
            pos,
            vel: Vec2::new(0.0, cfg.fall_speed),
            shape: Shape::Aabb {
                half_extents: Vec2::splat(cfg.half_extent),
            },
            health: 1.0,
            max_health: 1.0,
            alive: true,
            kind: EntityKind::Powerup(Powerup {
                effect: PowerupEffect::from_config(kind, cfg),
                lifetime: cfg.lifetime,
            }),
        }
    }

    pub fn category(&self) -> Category {
        match &self.kind {
            EntityKind::Ship(ship) => match ship.faction() {
                Faction::Player => Category::Player,
                Faction::Enemy => Category::Enemy,
            },
            EntityKind::Projectile(_) => Category::Projectile,
            EntityKind::Powerup(_) => Category::Powerup,
        }
    }

    /// Side the entity fights for; powerups are neutral.
    pub fn faction(&self) -> Option<Faction> {
        match &self.kind {
            EntityKind::Ship(ship) => Some(ship.faction()),
            EntityKind::Projectile(p) => Some(p.faction),
            EntityKind::Powerup(_) => None,
        }
    }

    pub fn archetype(&self) -> Option<Archetype> {
        self.as_ship().map(|s| s.archetype)
    }

    pub fn as_ship(&self) -> Option<&Ship> {
        match &self.kind {
            EntityKind::Ship(ship) => Some(ship),
            _ => None,
        }
    }

    pub fn as_ship_mut(&mut self) -> Option<&mut Ship> {
        match &mut self.kind {
            EntityKind::Ship(ship) => Some(ship),
            _ => None,
        }
    }

    pub fn as_projectile(&self) -> Option<&Projectile> {
        match &self.kind {
            EntityKind::Projectile(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_powerup(&self) -> Option<&Powerup> {
        match &self.kind {
            EntityKind::Powerup(p) => Some(p),
            _ => None,
        }
    }

    pub fn health_fraction(&self) -> f32 {
        if self.max_health <= 0.0 {
            return 0.0;
        }
        (self.health / self.max_health).clamp(0.0, 1.0)
    }

    /// Subtract `amount` from health, clamping at zero.  Returns `true` only
    /// on the hit that takes the entity from alive to dead; damage to an
    /// already-dead entity changes nothing.
    pub fn apply_damage(&mut self, amount: f32) -> bool {
        if !self.alive || !(amount > 0.0) {
            return false;
        }
        self.health = (self.health - amount).max(0.0);
        if self.health <= 0.0 {
            self.alive = false;
            return true;
        }
        false
    }

    pub fn heal(&mut self, amount: f32) {
        if self.alive && amount > 0.0 {
            self.health = (self.health + amount).min(self.max_health);
        }
    }

    /// Remove from play without damage accounting (expiry, despawn, pickup).
    pub fn retire(&mut self) {
        self.alive = false;
    }
}
