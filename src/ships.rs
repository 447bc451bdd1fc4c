/// Per-archetype behaviour: movement and attack policies (`update`) and
/// the reaction to a touch from another entity (`on_collision`).
///
/// Dispatch is an exhaustive `match` over `EntityKind` and `Archetype`, so a
/// new archetype cannot be added without deciding how it moves and reacts.

use glam::Vec2;

use crate::config::{ArenaConfig, GameConfig};
use crate::entities::{
    Archetype, BuffKind, Category, Entity, EntityId, EntityKind, Faction, PowerupEffect,
    PowerupKind, ProjectileKind, Ship,
};
use crate::events::GameEvent;
use crate::spawning;

/// Destroyers hold position while within this distance of their standoff.
const STANDOFF_BAND: f32 = 20.0;

/// Strafing speed of a destroyer relative to its cruise speed.
const STRAFE_FACTOR: f32 = 0.5;

// ── Construction ─────────────────────────────────────────────────────────────

/// The player ship, centred horizontally near the bottom of the arena.
pub fn new_player(config: &GameConfig) -> Entity {
    let pos = Vec2::new(config.arena.width / 2.0, config.arena.height * 0.85);
    let mut player = Entity::new_ship(Archetype::Player, &config.ships.player, pos);
    if let Some(ship) = player.as_ship_mut() {
        ship.weapon_cooldown = 0.0;
    }
    player
}

pub fn new_enemy(archetype: Archetype, pos: Vec2, config: &GameConfig) -> Entity {
    debug_assert!(archetype != Archetype::Player, "new_enemy called for the player");
    let mut enemy = Entity::new_ship(archetype, config.ships.stats(archetype), pos);
    if let Some(ship) = enemy.as_ship_mut() {
        if archetype == Archetype::Tanker {
            ship.ability_cooldown = config.ships.tanker_minion_interval;
        }
    }
    enemy
}

// ── Update ───────────────────────────────────────────────────────────────────

pub struct UpdateContext<'a> {
    /// `None` once the player has been purged.
    pub player_pos: Option<Vec2>,
    pub config: &'a GameConfig,
}

/// New entities and events produced while updating.
#[derive(Debug, Default)]
pub struct Outbox {
    pub entities: Vec<Entity>,
    pub events: Vec<GameEvent>,
}

/// Advance one entity by `dt` seconds.  Never fails: an entity that leaves
/// the arena beyond the despawn margin is retired, the player is clamped.
pub fn update(entity: &mut Entity, dt: f32, ctx: &UpdateContext, out: &mut Outbox) {
    if !entity.alive {
        return;
    }
    let arena = &ctx.config.arena;

    let archetype = match &mut entity.kind {
        EntityKind::Ship(ship) => Some(ship.archetype),
        EntityKind::Projectile(projectile) => {
            entity.pos += entity.vel * dt;
            projectile.lifetime -= dt;
            if projectile.lifetime <= 0.0 || outside(entity.pos, arena) {
                entity.alive = false;
            }
            None
        }
        EntityKind::Powerup(powerup) => {
            entity.pos += entity.vel * dt;
            powerup.lifetime -= dt;
            if powerup.lifetime <= 0.0 || outside(entity.pos, arena) {
                entity.alive = false;
            }
            None
        }
    };

    match archetype {
        Some(Archetype::Player) => update_player(entity, dt, ctx, out),
        Some(Archetype::Destroyer) => update_destroyer(entity, dt, ctx, out),
        Some(Archetype::Slasher) => update_slasher(entity, dt, ctx),
        Some(Archetype::Tanker) => update_tanker(entity, dt, ctx, out),
        None => {}
    }
}

fn update_player(entity: &mut Entity, dt: f32, ctx: &UpdateContext, out: &mut Outbox) {
    let Some(ship) = entity.as_ship() else { return };
    let vel = ship.controls.steer * ship.stats.speed;
    entity.vel = vel;
    entity.pos += vel * dt;

    let r = entity.shape.bounding_radius();
    let arena = &ctx.config.arena;
    entity.pos.x = clamp_inside(entity.pos.x, r, arena.width);
    entity.pos.y = clamp_inside(entity.pos.y, r, arena.height);

    let pos = entity.pos;
    let Some(ship) = entity.as_ship_mut() else { return };
    ship.weapon_cooldown = (ship.weapon_cooldown - dt).max(0.0);
    if ship.controls.trigger && ship.stats.fire_interval > 0.0 && ship.weapon_cooldown <= 0.0 {
        fire_player_volley(ship, pos + Vec2::new(0.0, -r), ctx.config, out);
    }
    ship.tick_buffs(dt);
}

/// Keep a body of radius `r` inside `[0, extent]`; a body wider than the
/// arena is pinned to the centre.
fn clamp_inside(v: f32, r: f32, extent: f32) -> f32 {
    if 2.0 * r >= extent {
        return extent / 2.0;
    }
    v.clamp(r, extent - r)
}

fn fire_player_volley(ship: &mut Ship, muzzle: Vec2, config: &GameConfig, out: &mut Outbox) {
    let weapons = &config.weapons;
    let kind = if ship.has_buff(BuffKind::Piercing) {
        ProjectileKind::Lance
    } else {
        ProjectileKind::Bolt
    };
    let angles: &[f32] = if ship.has_buff(BuffKind::SpreadShot) {
        &[-1.0, 0.0, 1.0]
    } else {
        &[0.0]
    };
    for step in angles {
        let angle = (step * weapons.spread_degrees).to_radians();
        let dir = Vec2::new(angle.sin(), -angle.cos());
        out.entities.push(Entity::new_projectile(
            kind,
            Faction::Player,
            muzzle,
            dir,
            &weapons.player_shot,
        ));
    }
    out.events.push(GameEvent::ShotFired {
        faction: Faction::Player,
    });

    let factor = if ship.has_buff(BuffKind::RapidFire) {
        weapons.rapid_fire_factor
    } else {
        1.0
    };
    ship.weapon_cooldown = ship.stats.fire_interval * factor;
}

fn update_destroyer(entity: &mut Entity, dt: f32, ctx: &UpdateContext, out: &mut Outbox) {
    let ships = &ctx.config.ships;
    let serial = entity.serial;
    let pos = entity.pos;
    let radius = entity.shape.bounding_radius();
    let Some(ship) = entity.as_ship_mut() else { return };
    let speed = ship.stats.speed;
    tick_enemy_timers(ship, dt);

    let vel = match ctx.player_pos {
        Some(target) => {
            let to_player = target - pos;
            let dist = to_player.length();
            let dir = to_player.try_normalize().unwrap_or(Vec2::Y);

            if ship.stats.fire_interval > 0.0
                && ship.weapon_cooldown <= 0.0
                && dist <= ships.destroyer_fire_range
            {
                out.entities.push(Entity::new_projectile(
                    ProjectileKind::Plasma,
                    Faction::Enemy,
                    pos + dir * radius,
                    dir,
                    &ctx.config.weapons.enemy_shot,
                ));
                out.events.push(GameEvent::ShotFired {
                    faction: Faction::Enemy,
                });
                ship.weapon_cooldown = ship.stats.fire_interval;
            }

            if dist > ships.destroyer_standoff + STANDOFF_BAND {
                dir * speed
            } else if dist < ships.destroyer_standoff - STANDOFF_BAND {
                -dir * speed
            } else {
                // Neighbouring destroyers strafe in opposite directions.
                let side = if serial % 2 == 0 { 1.0 } else { -1.0 };
                dir.perp() * speed * STRAFE_FACTOR * side
            }
        }
        None => Vec2::new(0.0, speed),
    };

    entity.vel = vel;
    entity.pos += vel * dt;
    despawn_if_outside(entity, &ctx.config.arena);
}

fn update_slasher(entity: &mut Entity, dt: f32, ctx: &UpdateContext) {
    let pos = entity.pos;
    let Some(ship) = entity.as_ship_mut() else { return };
    tick_enemy_timers(ship, dt);
    let speed = ship.stats.speed;

    entity.vel = chase(pos, ctx.player_pos) * speed;
    entity.pos += entity.vel * dt;
    despawn_if_outside(entity, &ctx.config.arena);
}

fn update_tanker(entity: &mut Entity, dt: f32, ctx: &UpdateContext, out: &mut Outbox) {
    let ships = &ctx.config.ships;
    let serial = entity.serial;
    let pos = entity.pos;
    let radius = entity.shape.bounding_radius();
    let dir = chase(pos, ctx.player_pos);

    entity.heal(ships.tanker_regen_per_second * dt);

    let Some(ship) = entity.as_ship_mut() else { return };
    tick_enemy_timers(ship, dt);
    let speed = ship.stats.speed;

    if ships.tanker_minion_interval > 0.0 {
        ship.ability_cooldown -= dt;
        if ship.ability_cooldown <= 0.0 {
            ship.ability_cooldown += ships.tanker_minion_interval;
            // Toward the player first, then sideways, then behind; never
            // inside the spawn safety radius.
            let reach = radius + ships.slasher.radius + 2.0;
            let launch = [dir, dir.perp(), -dir.perp(), -dir]
                .into_iter()
                .map(|d| pos + d * reach)
                .find(|&p| {
                    spawning::is_safe(p, ctx.player_pos, ctx.config.spawning.safe_distance)
                });
            match launch {
                Some(at) => out
                    .entities
                    .push(new_enemy(Archetype::Slasher, at, ctx.config)),
                None => log::debug!("tanker #{serial} too close to the player, minion skipped"),
            }
        }
    }

    entity.vel = dir * speed;
    entity.pos += entity.vel * dt;
    despawn_if_outside(entity, &ctx.config.arena);
}

fn tick_enemy_timers(ship: &mut Ship, dt: f32) {
    ship.weapon_cooldown = (ship.weapon_cooldown - dt).max(0.0);
    ship.contact_cooldown = (ship.contact_cooldown - dt).max(0.0);
}

/// Unit vector toward the player, or straight down when there is none.
fn chase(pos: Vec2, player_pos: Option<Vec2>) -> Vec2 {
    player_pos
        .and_then(|target| (target - pos).try_normalize())
        .unwrap_or(Vec2::Y)
}

fn outside(pos: Vec2, arena: &ArenaConfig) -> bool {
    let m = arena.despawn_margin;
    pos.x < -m || pos.y < -m || pos.x > arena.width + m || pos.y > arena.height + m
}

fn despawn_if_outside(entity: &mut Entity, arena: &ArenaConfig) {
    if outside(entity.pos, arena) {
        log::debug!("entity #{} left the arena at {:?}", entity.serial, entity.pos);
        entity.retire();
    }
}

// ── Collision response ───────────────────────────────────────────────────────

/// What an entity does to whatever it touches, captured before either side
/// of a pair is mutated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Impact {
    pub source: EntityId,
    pub category: Category,
    pub archetype: Option<Archetype>,
    pub damage: f32,
    pub effect: Option<PowerupEffect>,
}

pub fn impact(id: EntityId, entity: &Entity) -> Impact {
    let (damage, effect) = match &entity.kind {
        EntityKind::Ship(ship) => {
            let rearming = ship.faction() == Faction::Enemy && ship.contact_cooldown > 0.0;
            let damage = if rearming { 0.0 } else { ship.stats.contact_damage };
            (damage, None)
        }
        EntityKind::Projectile(p) => (p.damage, None),
        EntityKind::Powerup(p) => (0.0, Some(p.effect)),
    };
    Impact {
        source: id,
        category: entity.category(),
        archetype: entity.archetype(),
        damage,
        effect,
    }
}

/// Apply `other`'s effect to `entity`.
pub fn on_collision(
    id: EntityId,
    entity: &mut Entity,
    other: &Impact,
    config: &GameConfig,
    events: &mut Vec<GameEvent>,
) {
    if !entity.alive {
        return;
    }
    match entity.archetype() {
        Some(Archetype::Player) => player_hit_by(entity, other, events),
        Some(Archetype::Destroyer | Archetype::Slasher | Archetype::Tanker) => {
            enemy_hit_by(id, entity, other, config, events)
        }
        None => match &mut entity.kind {
            EntityKind::Projectile(projectile) => {
                if projectile.kind.pierces() {
                    projectile.struck.push(other.source);
                } else {
                    entity.alive = false;
                }
            }
            EntityKind::Powerup(_) => {
                if other.category == Category::Player {
                    entity.alive = false;
                }
            }
            EntityKind::Ship(_) => {}
        },
    }
}

fn player_hit_by(entity: &mut Entity, other: &Impact, events: &mut Vec<GameEvent>) {
    if let Some(effect) = other.effect {
        collect(entity, effect);
        events.push(GameEvent::PowerupCollected { kind: effect.kind });
        return;
    }
    if other.damage <= 0.0 {
        return;
    }
    if entity
        .as_ship()
        .is_some_and(|ship| ship.has_buff(BuffKind::Shield))
    {
        log::debug!("shield absorbed {} damage", other.damage);
        return;
    }

    let before = entity.health;
    let died = entity.apply_damage(other.damage);
    events.push(GameEvent::PlayerHit {
        damage: before - entity.health,
        health: entity.health,
    });
    if died {
        log::info!("player destroyed");
        events.push(GameEvent::PlayerDestroyed);
    }
}

fn collect(entity: &mut Entity, effect: PowerupEffect) {
    log::debug!("collected {:?}", effect.kind);
    match effect.kind.buff() {
        None => {
            if effect.kind == PowerupKind::Heal {
                entity.heal(effect.magnitude);
            }
        }
        Some(buff) => {
            if let Some(ship) = entity.as_ship_mut() {
                ship.grant_buff(buff, effect.duration);
            }
        }
    }
}

fn enemy_hit_by(
    id: EntityId,
    entity: &mut Entity,
    other: &Impact,
    config: &GameConfig,
    events: &mut Vec<GameEvent>,
) {
    let Some(ship) = entity.as_ship_mut() else { return };
    let archetype = ship.archetype;
    let armor = ship.stats.armor;
    let score = ship.stats.score;

    let damage = match other.category {
        Category::Projectile => mitigated(other.damage, armor),
        Category::Player if archetype == Archetype::Slasher => {
            // Slashers spend themselves on the hit they just delivered.
            entity.health = 0.0;
            entity.alive = false;
            log::debug!("slasher #{} self-destructed", entity.serial);
            events.push(GameEvent::EnemyDestroyed {
                id,
                archetype,
                pos: entity.pos,
                score: 0,
            });
            return;
        }
        Category::Player => {
            if ship.contact_cooldown > 0.0 {
                return;
            }
            ship.contact_cooldown = config.ships.contact_rearm_seconds;
            mitigated(other.damage, armor)
        }
        Category::Enemy | Category::Powerup => return,
    };

    if entity.apply_damage(damage) {
        log::debug!("{:?} #{} destroyed", archetype, entity.serial);
        events.push(GameEvent::EnemyDestroyed {
            id,
            archetype,
            pos: entity.pos,
            score,
        });
    }
}

/// Armour soaks a flat amount of every hit, but a hit always does something.
fn mitigated(damage: f32, armor: f32) -> f32 {
    if damage <= 0.0 {
        return 0.0;
    }
    (damage - armor).max(damage.min(1.0))
}
