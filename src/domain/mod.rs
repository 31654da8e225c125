// Domain layer: core simulation types and rules.

pub mod entity;
pub mod events;
pub mod movement;
pub mod player;
pub mod quad;
pub mod systems;
pub mod tuning;
pub mod world;

pub use entity::{Body, Color, Craft, Entity, EntityId, EntityKey, EntityKind, Projectile, Snapshot};
pub use events::{EntityPayload, Outbound, Recipient, SyncEntry, SyncEvent};
pub use movement::Movement;
pub use player::{Player, PlayerId};
pub use tuning::Tuning;
pub use world::{Role, World, WorldSummary};
