/// Discrete notifications for audio, HUD and other collaborators.  The core
/// only appends to the queue; consumers drain it after each tick.

use glam::Vec2;

use crate::entities::{Archetype, EntityId, Faction, GameStatus, PowerupKind};

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    StateChanged {
        from: GameStatus,
        to: GameStatus,
    },
    EnemySpawned {
        id: EntityId,
        archetype: Archetype,
    },
    PowerupSpawned {
        id: EntityId,
        kind: PowerupKind,
    },
    ShotFired {
        faction: Faction,
    },
    /// `score` is zero when the enemy was not brought down by the player
    /// (a slasher self-destructing on contact).
    EnemyDestroyed {
        id: EntityId,
        archetype: Archetype,
        pos: Vec2,
        score: u32,
    },
    PlayerHit {
        damage: f32,
        health: f32,
    },
    PlayerDestroyed,
    PowerupCollected {
        kind: PowerupKind,
    },
    GameOver {
        score: u32,
    },
}
