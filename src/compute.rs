/// Game loop and state controller.
///
/// [`Game::tick`] is the whole contract with the outside world: it takes the
/// frame delta and this frame's input, runs one simulation step (while
/// playing) in a fixed phase order and returns a read-only snapshot plus the
/// events raised during the tick.  Nothing in here blocks or waits.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use slotmap::SlotMap;

use crate::collision::{self, Broadphase, BruteForce, Interaction};
use crate::config::GameConfig;
use crate::entities::{
    Archetype, Buff, Category, Controls, Entity, EntityId, Faction, GameStatus, PowerupKind,
};
use crate::events::GameEvent;
use crate::ships::{self, Outbox, UpdateContext};
use crate::spawning::SpawnDirector;

// ── Input / output surfaces ──────────────────────────────────────────────────

/// One frame of player intent, as supplied by the input collaborator.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Input {
    /// Desired direction; longer than 1 is normalised, non-finite is ignored.
    pub movement: Vec2,
    pub fire: bool,
    /// Start / continue / back to menu, depending on the state.
    pub confirm: bool,
}

impl Input {
    pub fn sanitized(&self) -> Self {
        let movement = if !self.movement.is_finite() {
            Vec2::ZERO
        } else if self.movement.length_squared() > 1.0 {
            self.movement.normalize()
        } else {
            self.movement
        };
        Self { movement, ..*self }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EntityView {
    pub id: EntityId,
    pub category: Category,
    pub archetype: Option<Archetype>,
    /// Side a ship or projectile belongs to; `None` for powerups.
    pub faction: Option<Faction>,
    pub powerup: Option<PowerupKind>,
    pub pos: Vec2,
    pub radius: f32,
    pub health_fraction: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlayerView {
    pub pos: Vec2,
    pub health: f32,
    pub max_health: f32,
    pub buffs: Vec<Buff>,
}

/// Everything a renderer needs after a tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub status: GameStatus,
    pub score: u32,
    pub high_score: u32,
    pub kills: u32,
    /// Seconds of play in the current (or last) session.
    pub elapsed: f32,
    pub tier: usize,
    pub arena: Vec2,
    pub player: Option<PlayerView>,
    /// Alive entities in creation order, the player included.
    pub entities: Vec<EntityView>,
}

#[derive(Clone, Debug)]
pub struct FrameResult {
    pub status: GameStatus,
    pub snapshot: Snapshot,
    pub events: Vec<GameEvent>,
    pub interactions: Vec<Interaction>,
}

// ── Session ──────────────────────────────────────────────────────────────────

/// All state belonging to one run from Menu to GameOver.
pub struct Session {
    entities: SlotMap<EntityId, Entity>,
    player: EntityId,
    spawner: SpawnDirector,
    score: u32,
    kills: u32,
    next_serial: u64,
    rng: StdRng,
}

impl Session {
    pub fn new(config: &GameConfig, seed: u64) -> Self {
        let mut session = Self {
            entities: SlotMap::with_key(),
            player: EntityId::default(),
            spawner: SpawnDirector::new(&config.spawning),
            score: 0,
            kills: 0,
            next_serial: 0,
            rng: StdRng::seed_from_u64(seed),
        };
        session.player = session.insert(ships::new_player(config));
        session
    }

    /// Add an entity, stamping its creation serial.
    pub fn insert(&mut self, mut entity: Entity) -> EntityId {
        entity.serial = self.next_serial;
        self.next_serial += 1;
        self.entities.insert(entity)
    }

    pub fn entities(&self) -> &SlotMap<EntityId, Entity> {
        &self.entities
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn player_id(&self) -> EntityId {
        self.player
    }

    pub fn player(&self) -> Option<&Entity> {
        self.entities.get(self.player)
    }

    pub fn player_alive(&self) -> bool {
        self.player().is_some_and(|p| p.alive)
    }

    pub fn player_pos(&self) -> Option<Vec2> {
        self.player().map(|p| p.pos)
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn kills(&self) -> u32 {
        self.kills
    }

    pub fn spawner(&self) -> &SpawnDirector {
        &self.spawner
    }

    pub fn spawner_mut(&mut self) -> &mut SpawnDirector {
        &mut self.spawner
    }

    /// One Playing tick: input, spawn, update, collide, purge, score.
    pub fn step(
        &mut self,
        dt: f32,
        input: &Input,
        config: &GameConfig,
        broadphase: &dyn Broadphase,
        events: &mut Vec<GameEvent>,
    ) -> Vec<Interaction> {
        // ── 1. Input ─────────────────────────────────────────────────────────
        if let Some(ship) = self
            .entities
            .get_mut(self.player)
            .and_then(|p| p.as_ship_mut())
        {
            ship.controls = Controls {
                steer: input.movement,
                trigger: input.fire,
            };
        }

        // ── 2. Spawn ─────────────────────────────────────────────────────────
        let player_pos = self.player_pos();
        let spawned = self
            .spawner
            .run(dt, self.score, player_pos, config, &mut self.rng);
        for entity in spawned {
            self.insert_announced(entity, events);
        }

        // ── 3. Update ────────────────────────────────────────────────────────
        // The player moves first so enemies steer toward where it is now.
        let mut outbox = Outbox::default();
        let player_id = self.player;
        if let Some(player) = self.entities.get_mut(player_id) {
            let ctx = UpdateContext {
                player_pos: None,
                config,
            };
            ships::update(player, dt, &ctx, &mut outbox);
        }
        let ctx = UpdateContext {
            player_pos: self.player_pos(),
            config,
        };
        for (id, entity) in self.entities.iter_mut() {
            if id != player_id {
                ships::update(entity, dt, &ctx, &mut outbox);
            }
        }
        for entity in outbox.entities {
            self.insert_announced(entity, events);
        }
        events.extend(outbox.events);

        // ── 4. Collide ───────────────────────────────────────────────────────
        let mut hits = Vec::new();
        let interactions = collision::resolve(&mut self.entities, broadphase, config, &mut hits);

        // ── 5. Purge ─────────────────────────────────────────────────────────
        let before = self.entities.len();
        self.entities.retain(|_, e| e.alive);
        let purged = before - self.entities.len();
        if purged > 0 {
            log::trace!("purged {purged} entities");
        }

        // ── 6. Score ─────────────────────────────────────────────────────────
        for event in &hits {
            if let GameEvent::EnemyDestroyed { score, pos, .. } = event {
                if *score == 0 {
                    continue;
                }
                self.score += score;
                self.kills += 1;
                if self.rng.gen_bool(drop_probability(config.spawning.drop_chance)) {
                    self.spawner.queue_drop(*pos);
                }
            }
        }
        events.extend(hits);

        interactions
    }

    fn insert_announced(&mut self, entity: Entity, events: &mut Vec<GameEvent>) {
        let archetype = entity.archetype();
        let powerup = entity.as_powerup().map(|p| p.effect.kind);
        let id = self.insert(entity);
        if let Some(archetype) = archetype {
            events.push(GameEvent::EnemySpawned { id, archetype });
        } else if let Some(kind) = powerup {
            events.push(GameEvent::PowerupSpawned { id, kind });
        }
    }
}

// ── State controller ─────────────────────────────────────────────────────────

pub struct Game {
    config: GameConfig,
    status: GameStatus,
    /// Seconds spent in the current status.
    status_time: f32,
    session: Option<Session>,
    /// Set on leaving Playing; the session is dropped at the next tick.
    discard_session: bool,
    high_score: u32,
    last_score: u32,
    last_kills: u32,
    last_elapsed: f32,
    seed: u64,
    sessions_started: u64,
    broadphase: Box<dyn Broadphase>,
    events: Vec<GameEvent>,
}

impl Game {
    /// A config that fails [`GameConfig::validate`] is still accepted, with a
    /// warning.
    pub fn new(config: GameConfig, seed: u64) -> Self {
        if let Err(err) = config.validate() {
            log::warn!("{err}");
        }
        Self {
            config,
            status: GameStatus::Splash,
            status_time: 0.0,
            session: None,
            discard_session: false,
            high_score: 0,
            last_score: 0,
            last_kills: 0,
            last_elapsed: 0.0,
            seed,
            sessions_started: 0,
            broadphase: Box::new(BruteForce),
            events: Vec::new(),
        }
    }

    /// Swap the collision broad phase.
    pub fn with_broadphase(mut self, broadphase: Box<dyn Broadphase>) -> Self {
        self.broadphase = broadphase;
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    /// Advance by one frame.  `dt` is in seconds; negative or non-finite
    /// values count as 0 and large ones are clamped to `timing.max_dt`.
    pub fn tick(&mut self, dt: f32, input: &Input) -> FrameResult {
        let dt = sanitize_dt(dt, self.config.timing.max_dt);
        let input = input.sanitized();

        if self.discard_session {
            self.session = None;
            self.discard_session = false;
        }
        self.status_time += dt;

        let mut interactions = Vec::new();
        match self.status {
            GameStatus::Splash => {
                if input.confirm || self.status_time >= self.config.timing.splash_seconds {
                    self.transition(GameStatus::Menu);
                }
            }
            GameStatus::Menu => {
                if input.confirm {
                    self.start_session();
                    self.transition(GameStatus::Playing);
                }
            }
            GameStatus::Playing => match self.session.as_mut() {
                Some(session) => {
                    interactions = session.step(
                        dt,
                        &input,
                        &self.config,
                        self.broadphase.as_ref(),
                        &mut self.events,
                    );
                    self.last_score = session.score();
                    self.last_kills = session.kills();
                    self.last_elapsed = session.spawner().elapsed();
                    self.high_score = self.high_score.max(self.last_score);

                    if !session.player_alive() {
                        log::info!("game over with score {}", self.last_score);
                        self.events.push(GameEvent::GameOver {
                            score: self.last_score,
                        });
                        self.discard_session = true;
                        self.transition(GameStatus::GameOver);
                    }
                }
                None => {
                    debug_assert!(false, "playing without a session");
                    self.transition(GameStatus::Menu);
                }
            },
            GameStatus::GameOver => {
                if input.confirm {
                    self.transition(GameStatus::Menu);
                }
            }
        }

        FrameResult {
            status: self.status,
            snapshot: self.snapshot(),
            events: std::mem::take(&mut self.events),
            interactions,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot {
            status: self.status,
            score: self.last_score,
            high_score: self.high_score,
            kills: self.last_kills,
            elapsed: self.last_elapsed,
            tier: 0,
            arena: Vec2::new(self.config.arena.width, self.config.arena.height),
            player: None,
            entities: Vec::new(),
        };
        let Some(session) = &self.session else {
            return snapshot;
        };

        snapshot.tier = session.spawner().tier();
        snapshot.player = session.player().and_then(|p| {
            p.as_ship().map(|ship| PlayerView {
                pos: p.pos,
                health: p.health,
                max_health: p.max_health,
                buffs: ship.buffs.clone(),
            })
        });
        let mut views: Vec<(u64, EntityView)> = session
            .entities()
            .iter()
            .filter(|(_, e)| e.alive)
            .map(|(id, e)| {
                (
                    e.serial,
                    EntityView {
                        id,
                        category: e.category(),
                        archetype: e.archetype(),
                        faction: e.faction(),
                        powerup: e.as_powerup().map(|p| p.effect.kind),
                        pos: e.pos,
                        radius: e.shape.bounding_radius(),
                        health_fraction: e.health_fraction(),
                    },
                )
            })
            .collect();
        views.sort_by_key(|(serial, _)| *serial);
        snapshot.entities = views.into_iter().map(|(_, v)| v).collect();
        snapshot
    }

    fn start_session(&mut self) {
        let seed = self.seed.wrapping_add(self.sessions_started);
        self.sessions_started += 1;
        log::info!("starting session {} (seed {seed})", self.sessions_started);
        self.session = Some(Session::new(&self.config, seed));
        self.discard_session = false;
        self.last_score = 0;
        self.last_kills = 0;
        self.last_elapsed = 0.0;
    }

    fn transition(&mut self, to: GameStatus) {
        let from = self.status;
        log::info!("{from:?} -> {to:?}");
        self.status = to;
        self.status_time = 0.0;
        self.events.push(GameEvent::StateChanged { from, to });
    }
}

fn sanitize_dt(dt: f32, max_dt: f32) -> f32 {
    if !dt.is_finite() || dt < 0.0 {
        0.0
    } else {
        dt.min(max_dt)
    }
}

/// `gen_bool` panics outside `[0, 1]`.
fn drop_probability(chance: f64) -> f64 {
    if chance.is_nan() {
        0.0
    } else {
        chance.clamp(0.0, 1.0)
    }
}
