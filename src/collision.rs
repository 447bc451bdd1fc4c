/// Collision detection and resolution for one tick.
///
/// Detection is split into three replaceable pieces:
///
/// * a [`Broadphase`] proposing candidate index pairs (brute force by default),
/// * the pure category filter [`interacts`],
/// * the pure geometric test [`overlaps`].
///
/// Resolution walks the surviving pairs in ascending creation order and lets
/// both sides react, skipping any pair whose member already died or was spent
/// earlier in the same pass.

use glam::Vec2;
use slotmap::SlotMap;

use crate::config::GameConfig;
use crate::entities::{Category, Entity, EntityId, EntityKind, Faction, Shape};
use crate::events::GameEvent;
use crate::ships;

/// The collision-relevant view of an entity, frozen at the start of the pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Collider {
    pub id: EntityId,
    pub serial: u64,
    pub category: Category,
    pub faction: Option<Faction>,
    pub pos: Vec2,
    pub shape: Shape,
}

impl Collider {
    pub fn of(id: EntityId, entity: &Entity) -> Self {
        Self {
            id,
            serial: entity.serial,
            category: entity.category(),
            faction: entity.faction(),
            pos: entity.pos,
            shape: entity.shape,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    ProjectileHit,
    Contact,
    Pickup,
}

/// One resolved pair.  `first` is always the older entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interaction {
    pub first: EntityId,
    pub second: EntityId,
    pub kind: InteractionKind,
}

// ── Broad phase ──────────────────────────────────────────────────────────────

/// Proposes index pairs `(i, j)` with `i < j` into the collider slice that
/// might overlap.  Must never omit a pair that does overlap.
pub trait Broadphase {
    fn candidate_pairs(&self, colliders: &[Collider]) -> Vec<(usize, usize)>;
}

/// Every pair.  Plenty for a few dozen entities.
#[derive(Clone, Copy, Debug, Default)]
pub struct BruteForce;

impl Broadphase for BruteForce {
    fn candidate_pairs(&self, colliders: &[Collider]) -> Vec<(usize, usize)> {
        let n = colliders.len();
        let mut pairs = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                pairs.push((i, j));
            }
        }
        pairs
    }
}

// ── Narrow phase (pure) ──────────────────────────────────────────────────────

/// Whether the two categories affect each other at all:
/// player shots × enemies, enemy shots × player, enemy × player contact,
/// powerup × player.
pub fn interacts(a: &Collider, b: &Collider) -> bool {
    fn one_way(x: &Collider, y: &Collider) -> bool {
        match (x.category, y.category) {
            (Category::Projectile, Category::Enemy) => x.faction == Some(Faction::Player),
            (Category::Projectile, Category::Player) => x.faction == Some(Faction::Enemy),
            (Category::Enemy, Category::Player) => true,
            (Category::Powerup, Category::Player) => true,
            _ => false,
        }
    }
    one_way(a, b) || one_way(b, a)
}

pub fn overlaps(a: &Collider, b: &Collider) -> bool {
    shapes_overlap(a.pos, &a.shape, b.pos, &b.shape)
}

/// Touching counts as overlapping.
pub fn shapes_overlap(pa: Vec2, sa: &Shape, pb: Vec2, sb: &Shape) -> bool {
    match (*sa, *sb) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            pa.distance_squared(pb) <= (ra + rb) * (ra + rb)
        }
        (Shape::Aabb { half_extents: ha }, Shape::Aabb { half_extents: hb }) => {
            let d = (pa - pb).abs();
            d.x <= ha.x + hb.x && d.y <= ha.y + hb.y
        }
        (Shape::Circle { radius }, Shape::Aabb { half_extents }) => {
            circle_box(pa, radius, pb, half_extents)
        }
        (Shape::Aabb { half_extents }, Shape::Circle { radius }) => {
            circle_box(pb, radius, pa, half_extents)
        }
    }
}

fn circle_box(center: Vec2, radius: f32, box_center: Vec2, half_extents: Vec2) -> bool {
    let closest = center.clamp(box_center - half_extents, box_center + half_extents);
    center.distance_squared(closest) <= radius * radius
}

// ── Resolution ───────────────────────────────────────────────────────────────

/// Detect and resolve every overlapping compatible pair among the alive
/// entities, mutating health and `alive` flags in place.
pub fn resolve(
    entities: &mut SlotMap<EntityId, Entity>,
    broadphase: &dyn Broadphase,
    config: &GameConfig,
    events: &mut Vec<GameEvent>,
) -> Vec<Interaction> {
    let mut colliders: Vec<Collider> = entities
        .iter()
        .filter(|(_, e)| e.alive)
        .map(|(id, e)| Collider::of(id, e))
        .collect();
    colliders.sort_by_key(|c| c.serial);

    let mut pairs: Vec<(Collider, Collider)> = broadphase
        .candidate_pairs(&colliders)
        .into_iter()
        .map(|(i, j)| {
            let (a, b) = (colliders[i], colliders[j]);
            if a.serial <= b.serial {
                (a, b)
            } else {
                (b, a)
            }
        })
        .filter(|(a, b)| interacts(a, b) && overlaps(a, b))
        .collect();
    pairs.sort_by_key(|(a, b)| (a.serial, b.serial));
    pairs.dedup_by_key(|(a, b)| (a.serial, b.serial));

    let mut interactions = Vec::with_capacity(pairs.len());
    for (a, b) in pairs {
        let (Some(first), Some(second)) = (entities.get(a.id), entities.get(b.id)) else {
            debug_assert!(false, "collision pair references a purged entity");
            continue;
        };
        // Killed, consumed or spent earlier in this pass.
        if !first.alive || !second.alive {
            continue;
        }
        if already_struck(first, b.id) || already_struck(second, a.id) {
            continue;
        }

        let first_impact = ships::impact(a.id, first);
        let second_impact = ships::impact(b.id, second);

        if let Some(first) = entities.get_mut(a.id) {
            ships::on_collision(a.id, first, &second_impact, config, events);
        }
        if let Some(second) = entities.get_mut(b.id) {
            ships::on_collision(b.id, second, &first_impact, config, events);
        }

        interactions.push(Interaction {
            first: a.id,
            second: b.id,
            kind: interaction_kind(a.category, b.category),
        });
    }

    if !interactions.is_empty() {
        log::trace!("resolved {} interactions", interactions.len());
    }
    interactions
}

fn already_struck(entity: &Entity, target: EntityId) -> bool {
    match &entity.kind {
        EntityKind::Projectile(p) => p.struck.contains(&target),
        _ => false,
    }
}

fn interaction_kind(a: Category, b: Category) -> InteractionKind {
    if a == Category::Projectile || b == Category::Projectile {
        InteractionKind::ProjectileHit
    } else if a == Category::Powerup || b == Category::Powerup {
        InteractionKind::Pickup
    } else {
        InteractionKind::Contact
    }
}
