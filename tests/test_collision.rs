use glam::Vec2;
use slotmap::SlotMap;

use space_shooter::collision::*;
use space_shooter::config::{GameConfig, ProjectileStats};
use space_shooter::entities::*;
use space_shooter::events::GameEvent;

// ── Helpers ───────────────────────────────────────────────────────────────────

type World = SlotMap<EntityId, Entity>;

/// Insert entities in order, stamping serials like a session does.
fn world(entities: Vec<Entity>) -> (World, Vec<EntityId>) {
    let mut map = World::with_key();
    let ids = entities
        .into_iter()
        .enumerate()
        .map(|(i, mut e)| {
            e.serial = i as u64;
            map.insert(e)
        })
        .collect();
    (map, ids)
}

fn player_at(pos: Vec2, radius: f32, cfg: &GameConfig) -> Entity {
    let mut stats = cfg.ships.player.clone();
    stats.radius = radius;
    Entity::new_ship(Archetype::Player, &stats, pos)
}

fn enemy_at(archetype: Archetype, pos: Vec2, cfg: &GameConfig) -> Entity {
    Entity::new_ship(archetype, cfg.ships.stats(archetype), pos)
}

fn shot(kind: ProjectileKind, faction: Faction, pos: Vec2, radius: f32, damage: f32) -> Entity {
    let stats = ProjectileStats {
        speed: 0.0,
        damage,
        radius,
        lifetime: 5.0,
    };
    Entity::new_projectile(kind, faction, pos, Vec2::ZERO, &stats)
}

fn run(map: &mut World, cfg: &GameConfig) -> (Vec<Interaction>, Vec<GameEvent>) {
    let mut events = Vec::new();
    let interactions = resolve(map, &BruteForce, cfg, &mut events);
    (interactions, events)
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[test]
fn enemy_shot_hits_player() {
    let cfg = GameConfig::default();
    let (mut map, ids) = world(vec![
        player_at(Vec2::new(100.0, 100.0), 10.0, &cfg),
        shot(ProjectileKind::Plasma, Faction::Enemy, Vec2::new(105.0, 100.0), 3.0, 12.0),
    ]);

    let (interactions, events) = run(&mut map, &cfg);

    assert_eq!(interactions.len(), 1);
    assert_eq!(interactions[0].kind, InteractionKind::ProjectileHit);
    assert_eq!(map[ids[0]].health, 88.0);
    assert!(map[ids[0]].alive);
    assert!(!map[ids[1]].alive);
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::PlayerHit { damage, .. } if *damage == 12.0)));
}

#[test]
fn non_piercing_shot_hits_only_the_oldest_target() {
    let cfg = GameConfig::default();
    let (mut map, ids) = world(vec![
        enemy_at(Archetype::Slasher, Vec2::new(205.0, 200.0), &cfg),
        enemy_at(Archetype::Slasher, Vec2::new(195.0, 200.0), &cfg),
        shot(ProjectileKind::Bolt, Faction::Player, Vec2::new(200.0, 200.0), 3.0, 10.0),
    ]);

    let (interactions, _) = run(&mut map, &cfg);

    assert_eq!(interactions.len(), 1);
    assert_eq!(interactions[0].first, ids[0]);
    assert_eq!(map[ids[0]].health, 10.0);
    assert_eq!(map[ids[1]].health, 20.0); // untouched
    assert!(!map[ids[2]].alive);
}

#[test]
fn piercing_shot_hits_every_overlapping_target_once() {
    let cfg = GameConfig::default();
    let (mut map, ids) = world(vec![
        enemy_at(Archetype::Slasher, Vec2::new(205.0, 200.0), &cfg),
        enemy_at(Archetype::Slasher, Vec2::new(195.0, 200.0), &cfg),
        shot(ProjectileKind::Lance, Faction::Player, Vec2::new(200.0, 200.0), 3.0, 5.0),
    ]);

    let (interactions, _) = run(&mut map, &cfg);
    assert_eq!(interactions.len(), 2);
    assert_eq!(map[ids[0]].health, 15.0);
    assert_eq!(map[ids[1]].health, 15.0);
    assert!(map[ids[2]].alive);

    // Still overlapping next pass, but both targets were already struck.
    let (interactions, _) = run(&mut map, &cfg);
    assert!(interactions.is_empty());
    assert_eq!(map[ids[0]].health, 15.0);
}

#[test]
fn dead_enemy_is_excluded_from_later_pairs() {
    let cfg = GameConfig::default();
    let mut weak = enemy_at(Archetype::Slasher, Vec2::new(300.0, 300.0), &cfg);
    weak.health = 10.0;
    let (mut map, ids) = world(vec![
        weak,
        shot(ProjectileKind::Bolt, Faction::Player, Vec2::new(300.0, 300.0), 3.0, 10.0),
        shot(ProjectileKind::Bolt, Faction::Player, Vec2::new(301.0, 300.0), 3.0, 10.0),
    ]);

    let (interactions, events) = run(&mut map, &cfg);

    assert_eq!(interactions.len(), 1);
    assert!(!map[ids[0]].alive);
    assert_eq!(map[ids[0]].health, 0.0);
    assert!(!map[ids[1]].alive);
    assert!(map[ids[2]].alive); // second shot never resolved
    let destroyed = events
        .iter()
        .filter(|e| matches!(e, GameEvent::EnemyDestroyed { .. }))
        .count();
    assert_eq!(destroyed, 1);
}

#[test]
fn overkill_clamps_health_at_zero() {
    let cfg = GameConfig::default();
    let (mut map, ids) = world(vec![
        enemy_at(Archetype::Slasher, Vec2::new(300.0, 300.0), &cfg),
        shot(ProjectileKind::Bolt, Faction::Player, Vec2::new(300.0, 300.0), 3.0, 500.0),
    ]);

    let (_, events) = run(&mut map, &cfg);

    assert_eq!(map[ids[0]].health, 0.0);
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::EnemyDestroyed { archetype: Archetype::Slasher, score: 100, .. }
    )));
}

#[test]
fn contact_applies_once_then_rearms() {
    let cfg = GameConfig::default();
    let (mut map, ids) = world(vec![
        player_at(Vec2::new(100.0, 100.0), 12.0, &cfg),
        enemy_at(Archetype::Destroyer, Vec2::new(110.0, 100.0), &cfg),
    ]);

    let (interactions, _) = run(&mut map, &cfg);
    assert_eq!(interactions.len(), 1);
    assert_eq!(interactions[0].kind, InteractionKind::Contact);
    assert_eq!(map[ids[0]].health, 75.0); // destroyer contact damage 25
    assert_eq!(map[ids[1]].health, 40.0); // player ram damage 20

    // Same overlap while the destroyer is re-arming: nothing changes.
    run(&mut map, &cfg);
    assert_eq!(map[ids[0]].health, 75.0);
    assert_eq!(map[ids[1]].health, 40.0);
}

#[test]
fn slasher_self_destructs_on_contact_without_score() {
    let cfg = GameConfig::default();
    let (mut map, ids) = world(vec![
        player_at(Vec2::new(100.0, 100.0), 12.0, &cfg),
        enemy_at(Archetype::Slasher, Vec2::new(105.0, 100.0), &cfg),
    ]);

    let (_, events) = run(&mut map, &cfg);

    assert_eq!(map[ids[0]].health, 80.0);
    assert!(!map[ids[1]].alive);
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::EnemyDestroyed { archetype: Archetype::Slasher, score: 0, .. }
    )));
}

#[test]
fn tanker_armor_soaks_part_of_a_hit() {
    let cfg = GameConfig::default();
    let (mut map, ids) = world(vec![
        enemy_at(Archetype::Tanker, Vec2::new(300.0, 300.0), &cfg),
        shot(ProjectileKind::Bolt, Faction::Player, Vec2::new(300.0, 300.0), 3.0, 10.0),
        shot(ProjectileKind::Bolt, Faction::Player, Vec2::new(310.0, 300.0), 3.0, 2.0),
    ]);

    run(&mut map, &cfg);

    // 10 - 4 armour, then a 2-damage hit floored at 1.
    assert_eq!(map[ids[0]].health, 200.0 - 6.0 - 1.0);
}

#[test]
fn player_collects_powerup() {
    let cfg = GameConfig::default();
    let mut player = player_at(Vec2::new(100.0, 100.0), 12.0, &cfg);
    player.health = 50.0;
    let (mut map, ids) = world(vec![
        player,
        Entity::new_powerup(PowerupKind::Heal, Vec2::new(115.0, 100.0), &cfg.powerups),
        Entity::new_powerup(PowerupKind::Shield, Vec2::new(100.0, 85.0), &cfg.powerups),
    ]);

    let (interactions, events) = run(&mut map, &cfg);

    assert_eq!(interactions.len(), 2);
    assert!(interactions.iter().all(|i| i.kind == InteractionKind::Pickup));
    assert_eq!(map[ids[0]].health, 80.0);
    assert!(map[ids[0]].as_ship().unwrap().has_buff(BuffKind::Shield));
    assert!(!map[ids[1]].alive);
    assert!(!map[ids[2]].alive);
    let collected = events
        .iter()
        .filter(|e| matches!(e, GameEvent::PowerupCollected { .. }))
        .count();
    assert_eq!(collected, 2);
}

#[test]
fn shield_absorbs_damage_but_shot_is_spent() {
    let cfg = GameConfig::default();
    let mut player = player_at(Vec2::new(100.0, 100.0), 12.0, &cfg);
    player
        .as_ship_mut()
        .unwrap()
        .grant_buff(BuffKind::Shield, 5.0);
    let (mut map, ids) = world(vec![
        player,
        shot(ProjectileKind::Plasma, Faction::Enemy, Vec2::new(100.0, 100.0), 4.0, 12.0),
    ]);

    let (_, events) = run(&mut map, &cfg);

    assert_eq!(map[ids[0]].health, 100.0);
    assert!(!map[ids[1]].alive);
    assert!(!events.iter().any(|e| matches!(e, GameEvent::PlayerHit { .. })));
}

#[test]
fn friendly_pairs_never_interact() {
    let cfg = GameConfig::default();
    let (mut map, ids) = world(vec![
        player_at(Vec2::new(100.0, 100.0), 12.0, &cfg),
        shot(ProjectileKind::Bolt, Faction::Player, Vec2::new(100.0, 100.0), 3.0, 10.0),
        enemy_at(Archetype::Slasher, Vec2::new(400.0, 400.0), &cfg),
        enemy_at(Archetype::Destroyer, Vec2::new(405.0, 400.0), &cfg),
        shot(ProjectileKind::Plasma, Faction::Enemy, Vec2::new(400.0, 400.0), 4.0, 12.0),
        Entity::new_powerup(PowerupKind::Heal, Vec2::new(400.0, 400.0), &cfg.powerups),
    ]);

    let (interactions, events) = run(&mut map, &cfg);

    assert!(interactions.is_empty());
    assert!(events.is_empty());
    assert!(ids.iter().all(|&id| map[id].alive));
}

#[test]
fn custom_broadphase_is_respected() {
    struct Nothing;
    impl Broadphase for Nothing {
        fn candidate_pairs(&self, _: &[Collider]) -> Vec<(usize, usize)> {
            Vec::new()
        }
    }

    let cfg = GameConfig::default();
    let (mut map, ids) = world(vec![
        player_at(Vec2::new(100.0, 100.0), 10.0, &cfg),
        shot(ProjectileKind::Plasma, Faction::Enemy, Vec2::new(100.0, 100.0), 3.0, 12.0),
    ]);
    let mut events = Vec::new();
    let interactions = resolve(&mut map, &Nothing, &cfg, &mut events);

    assert!(interactions.is_empty());
    assert_eq!(map[ids[0]].health, 100.0);
}

// ── Pure predicates ───────────────────────────────────────────────────────────

#[test]
fn circle_overlap_is_inclusive() {
    let a = Shape::Circle { radius: 10.0 };
    let b = Shape::Circle { radius: 3.0 };
    assert!(shapes_overlap(Vec2::ZERO, &a, Vec2::new(13.0, 0.0), &b));
    assert!(!shapes_overlap(Vec2::ZERO, &a, Vec2::new(13.1, 0.0), &b));
}

#[test]
fn box_overlaps() {
    let boxy = Shape::Aabb {
        half_extents: Vec2::new(5.0, 5.0),
    };
    let circle = Shape::Circle { radius: 2.0 };
    assert!(shapes_overlap(Vec2::ZERO, &boxy, Vec2::new(9.0, 9.0), &boxy));
    assert!(!shapes_overlap(Vec2::ZERO, &boxy, Vec2::new(11.0, 0.0), &boxy));
    // Circle near a corner: closest point is the corner itself.
    assert!(shapes_overlap(Vec2::ZERO, &boxy, Vec2::new(6.0, 6.0), &circle));
    assert!(!shapes_overlap(Vec2::new(6.5, 6.5), &circle, Vec2::ZERO, &boxy));
}
