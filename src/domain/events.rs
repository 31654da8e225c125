// Outgoing synchronization events produced by the authoritative world.

use super::entity::{Entity, EntityId, EntityKind};
use super::player::PlayerId;

/// Per-variant creation payload, field order matching the wire layout.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityPayload {
    Craft {
        id: EntityId,
        x: f64,
        y: f64,
        vel_x: f64,
        vel_y: f64,
        rotation: f64,
    },
    Body {
        radius: f64,
        id: EntityId,
        x: f64,
        y: f64,
        vel_x: f64,
        vel_y: f64,
        mass: f64,
        is_star: bool,
        is_blackhole: bool,
        color_r: u8,
        color_g: u8,
        color_b: u8,
    },
    Projectile {
        id: EntityId,
        x: f64,
        y: f64,
        vel_x: f64,
        vel_y: f64,
    },
}

impl EntityPayload {
    pub fn id(&self) -> EntityId {
        match self {
            EntityPayload::Craft { id, .. }
            | EntityPayload::Body { id, .. }
            | EntityPayload::Projectile { id, .. } => *id,
        }
    }
}

impl From<&Entity> for EntityPayload {
    fn from(e: &Entity) -> Self {
        match &e.kind {
            EntityKind::Craft(_) => EntityPayload::Craft {
                id: e.id,
                x: e.x,
                y: e.y,
                vel_x: e.vel_x,
                vel_y: e.vel_y,
                rotation: e.rotation,
            },
            EntityKind::Body(body) => EntityPayload::Body {
                radius: e.radius,
                id: e.id,
                x: e.x,
                y: e.y,
                vel_x: e.vel_x,
                vel_y: e.vel_y,
                mass: e.mass,
                is_star: body.star,
                is_blackhole: body.blackhole,
                color_r: e.color.r,
                color_g: e.color.g,
                color_b: e.color.b,
            },
            EntityKind::Projectile(_) => EntityPayload::Projectile {
                id: e.id,
                x: e.x,
                y: e.y,
                vel_x: e.vel_x,
                vel_y: e.vel_y,
            },
        }
    }
}

/// Compact periodic position update for one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEntry {
    Craft {
        id: EntityId,
        x: f64,
        y: f64,
        vel_x: f64,
        vel_y: f64,
        rotation: f64,
    },
    Motion {
        id: EntityId,
        x: f64,
        y: f64,
        vel_x: f64,
        vel_y: f64,
    },
}

impl SyncEntry {
    pub fn id(&self) -> EntityId {
        match self {
            SyncEntry::Craft { id, .. } | SyncEntry::Motion { id, .. } => *id,
        }
    }
}

impl From<&Entity> for SyncEntry {
    fn from(e: &Entity) -> Self {
        match e.kind {
            EntityKind::Craft(_) => SyncEntry::Craft {
                id: e.id,
                x: e.x,
                y: e.y,
                vel_x: e.vel_x,
                vel_y: e.vel_y,
                rotation: e.rotation,
            },
            EntityKind::Body(_) | EntityKind::Projectile(_) => SyncEntry::Motion {
                id: e.id,
                x: e.x,
                y: e.y,
                vel_x: e.vel_x,
                vel_y: e.vel_y,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Tells a joining player which craft it controls.
    Identity {
        player_id: PlayerId,
        entity_id: EntityId,
    },
    Create(EntityPayload),
    Delete {
        id: EntityId,
    },
    Sync(Vec<SyncEntry>),
    PlanetCollision {
        id: EntityId,
        mass: f64,
        radius: f64,
    },
    Notice {
        text: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    All,
    Player(PlayerId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: Recipient,
    pub event: SyncEvent,
}
