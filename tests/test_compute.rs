use glam::Vec2;

use space_shooter::compute::*;
use space_shooter::config::{GameConfig, ProjectileStats};
use space_shooter::entities::*;
use space_shooter::events::GameEvent;
use space_shooter::ships;

const FRAME: f32 = 1.0 / 60.0;

fn confirm() -> Input {
    Input {
        confirm: true,
        ..Default::default()
    }
}

fn idle() -> Input {
    Input::default()
}

/// Spawning switched off so tests control every entity.
fn quiet_config() -> GameConfig {
    let mut config = GameConfig::default();
    config.spawning.base_interval = 1_000.0;
    config.spawning.powerup_interval = 0.0;
    config.spawning.drop_chance = 0.0;
    config
}

/// A game already past Splash and Menu.
fn playing(config: GameConfig) -> Game {
    let mut game = Game::new(config, 42);
    game.tick(FRAME, &confirm());
    game.tick(FRAME, &confirm());
    assert_eq!(game.status(), GameStatus::Playing);
    game
}

fn insert(game: &mut Game, entity: Entity) -> EntityId {
    game.session_mut().unwrap().insert(entity)
}

fn player_id(game: &Game) -> EntityId {
    game.session().unwrap().player_id()
}

/// A motionless shot, so the test decides exactly where it lands.
fn parked_shot(faction: Faction, pos: Vec2, damage: f32) -> Entity {
    let stats = ProjectileStats {
        speed: 0.0,
        damage,
        radius: 4.0,
        lifetime: 5.0,
    };
    let kind = match faction {
        Faction::Player => ProjectileKind::Bolt,
        Faction::Enemy => ProjectileKind::Plasma,
    };
    Entity::new_projectile(kind, faction, pos, Vec2::ZERO, &stats)
}

fn count(events: &[GameEvent], pred: impl Fn(&GameEvent) -> bool) -> usize {
    events.iter().filter(|e| pred(e)).count()
}

// ── State machine ─────────────────────────────────────────────────────────────

#[test]
fn splash_advances_on_confirm() {
    let mut game = Game::new(GameConfig::default(), 1);
    assert_eq!(game.status(), GameStatus::Splash);

    let result = game.tick(FRAME, &confirm());

    assert_eq!(result.status, GameStatus::Menu);
    assert_eq!(
        result.events,
        vec![GameEvent::StateChanged {
            from: GameStatus::Splash,
            to: GameStatus::Menu,
        }]
    );
}

#[test]
fn splash_times_out_into_the_menu() {
    let mut game = Game::new(GameConfig::default(), 1);
    for _ in 0..10 {
        game.tick(0.1, &idle());
    }
    assert_eq!(game.status(), GameStatus::Splash);
    for _ in 0..15 {
        game.tick(0.1, &idle());
    }
    assert_eq!(game.status(), GameStatus::Menu);
}

#[test]
fn menu_waits_for_confirm() {
    let mut game = Game::new(GameConfig::default(), 1);
    game.tick(FRAME, &confirm());
    for _ in 0..100 {
        game.tick(0.1, &idle());
    }
    assert_eq!(game.status(), GameStatus::Menu);
    assert!(game.session().is_none());
}

#[test]
fn starting_play_creates_a_fresh_session() {
    let game = playing(GameConfig::default());
    let snapshot = game.snapshot();

    assert_eq!(snapshot.status, GameStatus::Playing);
    assert_eq!(snapshot.score, 0);
    assert_eq!(snapshot.entities.len(), 1);
    assert_eq!(snapshot.entities[0].category, Category::Player);
    let player = snapshot.player.unwrap();
    assert_eq!(player.health, player.max_health);
    assert_eq!(player.pos, Vec2::new(400.0, 510.0));
}

#[test]
fn simultaneous_hits_end_the_game_exactly_once() {
    let mut game = playing(quiet_config());
    let id = player_id(&game);
    let pos = {
        let player = game.session_mut().unwrap().get_mut(id).unwrap();
        player.health = 20.0;
        player.pos
    };
    insert(&mut game, parked_shot(Faction::Enemy, pos, 12.0));
    insert(&mut game, parked_shot(Faction::Enemy, pos, 12.0));

    let result = game.tick(FRAME, &idle());

    assert_eq!(result.status, GameStatus::GameOver);
    assert_eq!(
        count(&result.events, |e| matches!(e, GameEvent::PlayerHit { .. })),
        2
    );
    assert_eq!(
        count(&result.events, |e| *e == GameEvent::PlayerDestroyed),
        1
    );
    assert_eq!(
        count(&result.events, |e| matches!(e, GameEvent::GameOver { .. })),
        1
    );
    assert!(result.snapshot.player.is_none()); // purged in the same tick

    // The session is released on the following tick and nothing fires again.
    let result = game.tick(FRAME, &idle());
    assert!(game.session().is_none());
    assert_eq!(result.status, GameStatus::GameOver);
    assert!(result.events.is_empty());
    assert!(result.snapshot.entities.is_empty());
}

#[test]
fn game_over_returns_to_menu_then_a_new_run() {
    let mut game = playing(quiet_config());
    let id = player_id(&game);
    game.session_mut().unwrap().get_mut(id).unwrap().health = 1.0;
    let pos = game.session().unwrap().player_pos().unwrap();
    insert(&mut game, parked_shot(Faction::Enemy, pos, 12.0));
    game.tick(FRAME, &idle());
    assert_eq!(game.status(), GameStatus::GameOver);

    game.tick(FRAME, &confirm());
    assert_eq!(game.status(), GameStatus::Menu);
    game.tick(FRAME, &confirm());
    assert_eq!(game.status(), GameStatus::Playing);

    let session = game.session().unwrap();
    assert!(session.player_alive());
    assert_eq!(session.score(), 0);
    assert_eq!(session.entities().len(), 1);
}

// ── Simulation step ───────────────────────────────────────────────────────────

#[test]
fn destroying_an_enemy_scores_its_value() {
    let mut game = playing(quiet_config());
    let at = Vec2::new(400.0, 100.0);
    let config = game.config().clone();
    let enemy = insert(&mut game, ships::new_enemy(Archetype::Destroyer, at, &config));
    insert(&mut game, parked_shot(Faction::Player, at, 100.0));

    let result = game.tick(FRAME, &idle());

    assert!(result.events.iter().any(|e| matches!(
        e,
        GameEvent::EnemyDestroyed {
            id,
            archetype: Archetype::Destroyer,
            score: 150,
            ..
        } if *id == enemy
    )));
    assert_eq!(result.snapshot.score, 150);
    assert_eq!(result.snapshot.kills, 1);
    assert_eq!(result.snapshot.high_score, 150);
    assert!(game.session().unwrap().get(enemy).is_none());
    assert_eq!(result.interactions.len(), 1);
}

#[test]
fn collisions_are_checked_after_movement() {
    let mut game = playing(quiet_config());
    let config = game.config().clone();
    let player_pos = game.session().unwrap().player_pos().unwrap();
    // 30 apart, 22 needed to touch; the slasher covers 21 in 0.1 s.
    let slasher = ships::new_enemy(
        Archetype::Slasher,
        player_pos - Vec2::new(0.0, 30.0),
        &config,
    );
    insert(&mut game, slasher);

    let result = game.tick(0.1, &idle());

    let player = result.snapshot.player.unwrap();
    assert_eq!(player.health, 80.0);
    // A self-destruct is not a kill.
    assert_eq!(result.snapshot.score, 0);
    assert_eq!(result.snapshot.kills, 0);
    assert_eq!(result.snapshot.entities.len(), 1);
}

#[test]
fn tanker_beside_the_player_cannot_drop_a_minion_on_it() {
    let mut game = playing(quiet_config());
    let config = game.config().clone();
    let player_pos = game.session().unwrap().player_pos().unwrap();
    let mut tanker = ships::new_enemy(
        Archetype::Tanker,
        player_pos - Vec2::new(0.0, 40.0),
        &config,
    );
    tanker.as_ship_mut().unwrap().ability_cooldown = 0.001;
    insert(&mut game, tanker);

    let result = game.tick(FRAME, &idle());

    assert_eq!(
        count(&result.events, |e| matches!(e, GameEvent::EnemySpawned { .. })),
        0
    );
    assert_eq!(
        count(&result.events, |e| matches!(e, GameEvent::PlayerHit { .. })),
        0
    );
    assert_eq!(result.snapshot.player.unwrap().health, 100.0);
}

#[test]
fn out_of_range_drop_chance_is_clamped() {
    for (chance, drops) in [(5.0, 1), (-1.0, 0), (f64::NAN, 0)] {
        let mut config = quiet_config();
        config.spawning.drop_chance = chance;
        let mut game = playing(config);
        let at = Vec2::new(400.0, 100.0);
        let enemy = ships::new_enemy(Archetype::Slasher, at, game.config());
        insert(&mut game, enemy);
        insert(&mut game, parked_shot(Faction::Player, at, 50.0));

        let result = game.tick(FRAME, &idle());

        assert_eq!(result.snapshot.kills, 1);
        let pending = game.session().unwrap().spawner().pending_drops().len();
        assert_eq!(pending, drops, "drop_chance {chance}");
    }
}

#[test]
fn first_wave_is_announced() {
    let mut config = GameConfig::default();
    config.spawning.powerup_interval = 0.0;
    let mut game = playing(config);

    let mut events = Vec::new();
    for _ in 0..30 {
        events.extend(game.tick(0.1, &idle()).events);
    }

    assert_eq!(
        count(&events, |e| matches!(e, GameEvent::EnemySpawned { .. })),
        1
    );
    assert_eq!(game.session().unwrap().spawner().enemies_spawned(), 1);
}

#[test]
fn firing_emits_projectiles_and_events() {
    let mut game = playing(quiet_config());
    let fire = Input {
        fire: true,
        ..Default::default()
    };

    let result = game.tick(FRAME, &fire);

    assert!(result.events.contains(&GameEvent::ShotFired {
        faction: Faction::Player
    }));
    let shots = result
        .snapshot
        .entities
        .iter()
        .filter(|v| v.category == Category::Projectile)
        .count();
    assert_eq!(shots, 1);
}

// ── Sanitising ────────────────────────────────────────────────────────────────

#[test]
fn bad_dt_is_sanitised() {
    let mut game = playing(quiet_config());

    game.tick(f32::NAN, &idle());
    game.tick(-1.0, &idle());
    assert_eq!(game.snapshot().elapsed, 0.0);

    game.tick(5.0, &idle());
    assert!((game.snapshot().elapsed - 0.1).abs() < 1e-6);
}

#[test]
fn movement_input_is_sanitised() {
    let long = Input {
        movement: Vec2::new(3.0, 4.0),
        ..Default::default()
    };
    assert!(long
        .sanitized()
        .movement
        .abs_diff_eq(Vec2::new(0.6, 0.8), 1e-6));

    let broken = Input {
        movement: Vec2::new(f32::NAN, 1.0),
        fire: true,
        confirm: false,
    };
    let clean = broken.sanitized();
    assert_eq!(clean.movement, Vec2::ZERO);
    assert!(clean.fire);

    let mut game = playing(quiet_config());
    let shove = Input {
        movement: Vec2::new(1_000.0, 0.0),
        ..Default::default()
    };
    let result = game.tick(0.1, &shove);
    let x = result.snapshot.player.unwrap().pos.x;
    assert!((x - 426.0).abs() < 1e-3);
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

#[test]
fn snapshot_lists_entities_in_creation_order() {
    let mut game = playing(quiet_config());
    let config = game.config().clone();
    let a = insert(
        &mut game,
        Entity::new_powerup(PowerupKind::Shield, Vec2::new(100.0, 100.0), &config.powerups),
    );
    let b = insert(
        &mut game,
        ships::new_enemy(Archetype::Tanker, Vec2::new(600.0, 100.0), &config),
    );
    let c = insert(
        &mut game,
        ships::new_enemy(Archetype::Destroyer, Vec2::new(200.0, 100.0), &config),
    );

    let snapshot = game.snapshot();
    let ids: Vec<EntityId> = snapshot.entities.iter().map(|v| v.id).collect();
    assert_eq!(ids, vec![player_id(&game), a, b, c]);
    assert_eq!(snapshot.entities[1].powerup, Some(PowerupKind::Shield));
    assert_eq!(snapshot.entities[2].archetype, Some(Archetype::Tanker));
    assert_eq!(snapshot.entities[3].faction, Some(Faction::Enemy));
}

#[test]
fn high_score_survives_later_runs() {
    let mut game = playing(quiet_config());
    let config = game.config().clone();
    let at = Vec2::new(400.0, 100.0);
    insert(&mut game, ships::new_enemy(Archetype::Slasher, at, &config));
    insert(&mut game, parked_shot(Faction::Player, at, 50.0));
    game.tick(FRAME, &idle());
    assert_eq!(game.high_score(), 100);

    // Lose, then start over.
    let id = player_id(&game);
    game.session_mut().unwrap().get_mut(id).unwrap().health = 1.0;
    let pos = game.session().unwrap().player_pos().unwrap();
    insert(&mut game, parked_shot(Faction::Enemy, pos, 12.0));
    let result = game.tick(FRAME, &idle());
    assert!(result.events.contains(&GameEvent::GameOver { score: 100 }));

    game.tick(FRAME, &confirm());
    let result = game.tick(FRAME, &confirm());
    assert_eq!(result.snapshot.score, 0);
    assert_eq!(result.snapshot.high_score, 100);
}

// ── Whole runs ────────────────────────────────────────────────────────────────

fn scripted_input(frame: u32) -> Input {
    let sway = if (frame / 90) % 2 == 0 { 1.0 } else { -1.0 };
    Input {
        movement: Vec2::new(sway, 0.0),
        fire: frame % 3 != 0,
        confirm: frame % 600 == 0,
    }
}

#[test]
fn same_seed_plays_out_identically() {
    let mut a = Game::new(GameConfig::default(), 7);
    let mut b = Game::new(GameConfig::default(), 7);
    for frame in 0..1_500 {
        let input = scripted_input(frame);
        let left = a.tick(FRAME, &input);
        let right = b.tick(FRAME, &input);
        assert_eq!(left.snapshot, right.snapshot);
        assert_eq!(left.events, right.events);
    }
}

#[test]
fn long_run_keeps_its_invariants() {
    let mut game = Game::new(GameConfig::default(), 2024);
    let mut game_overs = 0;
    let mut sessions = 0;

    for frame in 0..6_000 {
        let result = game.tick(FRAME, &scripted_input(frame));
        for event in &result.events {
            match event {
                GameEvent::GameOver { .. } => game_overs += 1,
                GameEvent::StateChanged {
                    to: GameStatus::Playing,
                    ..
                } => sessions += 1,
                _ => {}
            }
        }
        assert!(game_overs <= sessions);
        for view in &result.snapshot.entities {
            assert!(view.pos.is_finite());
            assert!((0.0..=1.0).contains(&view.health_fraction));
        }
        if let Some(player) = &result.snapshot.player {
            assert!(player.health >= 0.0 && player.health <= player.max_health);
            assert!(player.pos.x >= 0.0 && player.pos.x <= 800.0);
        }
    }
    assert!(sessions >= 1);
}
