// Authoritative entity registry and session bookkeeping.
//
// One `World` owns every live entity, the derived body/player sets, the
// end-of-tick deletion buffer, the outgoing sync queue and the speculative
// rollback window. Nothing here is global; the world is passed explicitly to
// every system.

use std::collections::HashMap;
use std::net::SocketAddr;

use rand::SeedableRng;
use rand::rngs::StdRng;
use slotmap::SlotMap;
use tracing::{debug, info};

use super::entity::{
    Body, Craft, Entity, EntityId, EntityKey, EntityKind, Projectile, Snapshot,
};
use super::events::{EntityPayload, Outbound, Recipient, SyncEntry, SyncEvent};
use super::player::{Player, PlayerId};
use super::systems::generation;
use super::tuning::Tuning;

/// First id handed out by a client world, keeping locally predicted entities
/// clear of the server's id space.
pub const LOCAL_ID_BASE: EntityId = 1 << 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Authoritative simulation; emits sync events.
    Server,
    /// Mirror of the server state; resolves terminal outcomes only while speculating.
    Client,
}

/// State captured by `sim_setup` and consumed by `sim_reset`.
#[derive(Debug)]
struct Speculation {
    saved: Vec<(EntityKey, Snapshot)>,
    // Entities created inside the window; destroyed on reset.
    spawned: Vec<EntityKey>,
    // Pre-existing entities deleted inside the window; inert until reset.
    suppressed: Vec<EntityKey>,
    time: f64,
}

/// Counts published for status endpoints and logs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorldSummary {
    pub entities: usize,
    pub stars: usize,
    pub planets: usize,
    pub players: usize,
    pub time: f64,
}

pub struct World {
    pub tuning: Tuning,
    role: Role,
    entities: SlotMap<EntityKey, Entity>,
    // Iteration order of the update passes.
    order: Vec<EntityKey>,
    by_id: HashMap<EntityId, EntityKey>,
    next_id: EntityId,
    stars: Vec<EntityKey>,
    planets: Vec<EntityKey>,
    players: Vec<Player>,
    delete_buffer: Vec<EntityKey>,
    followed: Option<EntityKey>,
    speculation: Option<Speculation>,
    outbox: Vec<Outbound>,
    time: f64,
    rng: StdRng,
}

impl World {
    pub fn new(role: Role, tuning: Tuning, seed: u64) -> Self {
        Self {
            tuning,
            role,
            entities: SlotMap::with_key(),
            order: Vec::new(),
            by_id: HashMap::new(),
            next_id: match role {
                Role::Server => 0,
                Role::Client => LOCAL_ID_BASE,
            },
            stars: Vec::new(),
            planets: Vec::new(),
            players: Vec::new(),
            delete_buffer: Vec::new(),
            followed: None,
            speculation: None,
            outbox: Vec::new(),
            time: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// True when terminal outcomes (deletions, absorption, spawned shots) are
    /// resolved locally: always on the server, on a client only while speculating.
    pub fn is_authoritative(&self) -> bool {
        self.role == Role::Server || self.is_simulating()
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub(crate) fn advance_clock(&mut self) {
        self.time += self.tuning.physics.delta;
    }

    /// Moves the clock back for a replay. Only honoured inside a speculative
    /// window, whose close restores the real time.
    pub(crate) fn rewind_clock(&mut self, time: f64) {
        if self.is_simulating() {
            self.time = time;
        }
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    // ---- entity registry -------------------------------------------------

    /// Registers a new entity under the next sequential id.
    pub fn spawn(&mut self, kind: EntityKind, mass: f64, radius: f64) -> EntityKey {
        let id = self.next_id;
        self.next_id += 1;
        let mut entity = Entity::new(id, kind, mass, radius);
        entity.ghost = self.role == Role::Client && self.is_simulating();
        let key = self.insert(entity);
        if let Some(window) = self.speculation.as_mut() {
            window.spawned.push(key);
        }
        key
    }

    pub fn spawn_craft(&mut self) -> EntityKey {
        let tuning = self.tuning.craft;
        self.spawn(EntityKind::Craft(Craft::default()), tuning.mass, tuning.radius)
    }

    pub fn spawn_body(&mut self, body: Body, radius: f64, mass: f64) -> EntityKey {
        let key = self.spawn(EntityKind::Body(body), mass, radius);
        if body.star {
            self.stars.push(key);
        } else {
            self.planets.push(key);
        }
        key
    }

    pub fn spawn_projectile(&mut self, owner: Option<EntityKey>) -> EntityKey {
        let tuning = self.tuning.projectile;
        let key = self.spawn(
            EntityKind::Projectile(Projectile { owner }),
            tuning.mass,
            tuning.radius,
        );
        self.entities[key].color = tuning.color;
        key
    }

    /// Mirrors a server-created entity under the server's id. An existing
    /// mirror with the same id is overwritten in place.
    pub fn adopt(&mut self, payload: &EntityPayload) -> EntityKey {
        let key = match self.by_id.get(&payload.id()).copied() {
            Some(key) => key,
            None => {
                let kind = match payload {
                    EntityPayload::Craft { .. } => EntityKind::Craft(Craft::default()),
                    EntityPayload::Body {
                        is_star,
                        is_blackhole,
                        ..
                    } => EntityKind::Body(Body {
                        star: *is_star,
                        blackhole: *is_blackhole,
                    }),
                    EntityPayload::Projectile { .. } => {
                        EntityKind::Projectile(Projectile::default())
                    }
                };
                let (mass, radius) = match payload {
                    EntityPayload::Craft { .. } => (self.tuning.craft.mass, self.tuning.craft.radius),
                    EntityPayload::Body { mass, radius, .. } => (*mass, *radius),
                    EntityPayload::Projectile { .. } => {
                        (self.tuning.projectile.mass, self.tuning.projectile.radius)
                    }
                };
                let key = self.insert(Entity::new(payload.id(), kind, mass, radius));
                if let EntityPayload::Body { is_star, .. } = payload {
                    if *is_star {
                        self.stars.push(key);
                    } else {
                        self.planets.push(key);
                    }
                }
                if let EntityPayload::Projectile { .. } = payload {
                    self.entities[key].color = self.tuning.projectile.color;
                }
                key
            }
        };

        let entity = &mut self.entities[key];
        match *payload {
            EntityPayload::Craft {
                x,
                y,
                vel_x,
                vel_y,
                rotation,
                ..
            } => {
                entity.set_position(x, y);
                entity.set_velocity(vel_x, vel_y);
                entity.rotation = rotation;
            }
            EntityPayload::Body {
                radius,
                x,
                y,
                vel_x,
                vel_y,
                mass,
                color_r,
                color_g,
                color_b,
                ..
            } => {
                entity.set_position(x, y);
                entity.set_velocity(vel_x, vel_y);
                entity.mass = mass;
                entity.radius = radius;
                entity.color = super::entity::Color::new(color_r, color_g, color_b);
            }
            EntityPayload::Projectile {
                x, y, vel_x, vel_y, ..
            } => {
                entity.set_position(x, y);
                entity.set_velocity(vel_x, vel_y);
            }
        }
        key
    }

    fn insert(&mut self, entity: Entity) -> EntityKey {
        let id = entity.id;
        let key = self.entities.insert(entity);
        self.order.push(key);
        self.by_id.insert(id, key);
        key
    }

    pub fn get(&self, key: EntityKey) -> Option<&Entity> {
        self.entities.get(key)
    }

    pub fn get_mut(&mut self, key: EntityKey) -> Option<&mut Entity> {
        self.entities.get_mut(key)
    }

    /// Every live entity in arena order, mutably.
    pub(crate) fn entities_mut(&mut self) -> impl Iterator<Item = (EntityKey, &mut Entity)> {
        self.entities.iter_mut()
    }

    pub(crate) fn pair_mut(&mut self, a: EntityKey, b: EntityKey) -> Option<[&mut Entity; 2]> {
        self.entities.get_disjoint_mut([a, b])
    }

    pub fn key_of(&self, id: EntityId) -> Option<EntityKey> {
        self.by_id.get(&id).copied()
    }

    pub fn get_by_id(&self, id: EntityId) -> Option<&Entity> {
        self.key_of(id).and_then(|key| self.entities.get(key))
    }

    /// Live entities in update order.
    pub fn keys(&self) -> &[EntityKey] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &Entity)> {
        self.order.iter().map(|&key| (key, &self.entities[key]))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        self.entities.contains_key(key)
    }

    pub fn stars(&self) -> &[EntityKey] {
        &self.stars
    }

    pub fn planets(&self) -> &[EntityKey] {
        &self.planets
    }

    /// Owner of a projectile, if both are still alive.
    pub fn projectile_owner(&self, projectile: EntityKey) -> Option<EntityKey> {
        match self.entities.get(projectile)?.kind {
            EntityKind::Projectile(Projectile { owner: Some(owner) }) => {
                self.entities.contains_key(owner).then_some(owner)
            }
            _ => None,
        }
    }

    pub fn follow(&mut self, key: Option<EntityKey>) {
        self.followed = key.filter(|&key| self.entities.contains_key(key));
    }

    /// Entity the presentation layer centres on, if still alive.
    pub fn followed(&self) -> Option<EntityKey> {
        self.followed.filter(|&key| self.entities.contains_key(key))
    }

    // ---- deletion --------------------------------------------------------

    /// Defers a deletion to the end of the current tick.
    pub fn queue_delete(&mut self, key: EntityKey) {
        if !self.delete_buffer.contains(&key) {
            self.delete_buffer.push(key);
        }
    }

    pub fn is_pending_delete(&self, key: EntityKey) -> bool {
        self.delete_buffer.contains(&key)
    }

    pub fn flush_deletions(&mut self) {
        let pending = std::mem::take(&mut self.delete_buffer);
        for key in pending {
            let spawned_here = self
                .speculation
                .as_ref()
                .map(|window| window.spawned.contains(&key));
            match spawned_here {
                Some(false) => {
                    if let Some(window) = self.speculation.as_mut() {
                        if !window.suppressed.contains(&key) {
                            window.suppressed.push(key);
                        }
                    }
                }
                Some(true) | None => {
                    self.destroy(key);
                }
            }
        }
    }

    /// True for entities a speculative window has deleted; the update passes skip them.
    pub fn is_suppressed(&self, key: EntityKey) -> bool {
        self.speculation
            .as_ref()
            .is_some_and(|window| window.suppressed.contains(&key))
    }

    /// Removes an entity and scrubs every reference other entities hold to it.
    pub fn destroy(&mut self, key: EntityKey) -> Option<Entity> {
        let entity = self.entities.remove(key)?;
        debug!(entity_id = entity.id, "deleting entity");

        if let Some(pos) = self.order.iter().position(|&k| k == key) {
            self.order.remove(pos);
        }
        if self.by_id.get(&entity.id) == Some(&key) {
            self.by_id.remove(&entity.id);
        }
        for other in self.entities.values_mut() {
            other.near.retain(|&k| k != key);
            if let EntityKind::Projectile(projectile) = &mut other.kind {
                if projectile.owner == Some(key) {
                    projectile.owner = None;
                }
            }
        }
        if self.followed == Some(key) {
            self.followed = None;
        }
        self.stars.retain(|&k| k != key);
        self.planets.retain(|&k| k != key);
        self.delete_buffer.retain(|&k| k != key);
        if let Some(window) = self.speculation.as_mut() {
            window.spawned.retain(|&k| k != key);
        }

        self.emit(Recipient::All, SyncEvent::Delete { id: entity.id });
        Some(entity)
    }

    pub fn destroy_by_id(&mut self, id: EntityId) -> Option<Entity> {
        let key = self.key_of(id)?;
        self.destroy(key)
    }

    /// Tears down every entity at once. Back-reference scrubbing is skipped
    /// because nothing survives the clear; ids keep counting up.
    pub fn clear(&mut self) {
        let removed: Vec<EntityId> = self.order.iter().map(|&k| self.entities[k].id).collect();
        info!(entities = removed.len(), "clearing world");
        self.entities.clear();
        self.order.clear();
        self.by_id.clear();
        self.stars.clear();
        self.planets.clear();
        self.players.clear();
        self.delete_buffer.clear();
        self.followed = None;
        self.speculation = None;
        for id in removed {
            self.emit(Recipient::All, SyncEvent::Delete { id });
        }
    }

    // ---- players ---------------------------------------------------------

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn player_for_craft(&self, craft: EntityKey) -> Option<&Player> {
        self.players.iter().find(|p| p.craft == craft)
    }

    pub fn player_for_craft_mut(&mut self, craft: EntityKey) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.craft == craft)
    }

    /// Spawns a craft for a new player, announces it, then sends the joining
    /// player its identity followed by the full current state.
    pub fn add_player(
        &mut self,
        id: PlayerId,
        username: Option<String>,
        address: Option<SocketAddr>,
    ) -> EntityKey {
        let craft = self.spawn_craft();
        generation::setup_ship(self, craft);
        self.sync_creation(craft);

        let player = Player::new(id, craft, username, address);
        info!(player_id = id, name = %player.name(), "player joined");
        self.players.push(player);

        let entity_id = self.entities[craft].id;
        self.emit(
            Recipient::Player(id),
            SyncEvent::Identity {
                player_id: id,
                entity_id,
            },
        );
        self.send_full_state(id);
        craft
    }

    /// Removes a player, announces the departure and queues its craft for deletion.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        let pos = self.players.iter().position(|p| p.id == id)?;
        let player = self.players.swap_remove(pos);
        self.relay_notice(format!("<{}> has disconnected.", player.name()));
        self.queue_delete(player.craft);
        Some(player)
    }

    // ---- synchronization -------------------------------------------------

    fn emit(&mut self, to: Recipient, event: SyncEvent) {
        if self.role == Role::Server && !self.is_simulating() {
            self.outbox.push(Outbound { to, event });
        }
    }

    pub fn drain_outbox(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    /// Announces an entity's creation to every connected player.
    pub fn sync_creation(&mut self, key: EntityKey) {
        if let Some(entity) = self.entities.get(key) {
            let payload = EntityPayload::from(entity);
            self.emit(Recipient::All, SyncEvent::Create(payload));
        }
    }

    pub fn send_full_state(&mut self, player: PlayerId) {
        let payloads: Vec<EntityPayload> = self
            .order
            .iter()
            .map(|&key| EntityPayload::from(&self.entities[key]))
            .collect();
        for payload in payloads {
            self.emit(Recipient::Player(player), SyncEvent::Create(payload));
        }
    }

    /// Queues a position/velocity update for every live entity.
    pub fn emit_sync(&mut self) {
        let entries: Vec<SyncEntry> = self
            .order
            .iter()
            .map(|&key| SyncEntry::from(&self.entities[key]))
            .collect();
        if !entries.is_empty() {
            self.emit(Recipient::All, SyncEvent::Sync(entries));
        }
    }

    pub fn emit_planet_collision(&mut self, key: EntityKey) {
        if let Some(e) = self.entities.get(key) {
            let event = SyncEvent::PlanetCollision {
                id: e.id,
                mass: e.mass,
                radius: e.radius,
            };
            self.emit(Recipient::All, event);
        }
    }

    /// Logs a narrative notice and relays it to every player.
    pub fn relay_notice(&mut self, text: String) {
        if self.is_simulating() {
            return;
        }
        info!(notice = %text, "notice");
        self.emit(Recipient::All, SyncEvent::Notice { text });
    }

    // ---- speculation -----------------------------------------------------

    pub fn is_simulating(&self) -> bool {
        self.speculation.is_some()
    }

    /// Opens a speculative window, saving every entity's physical state.
    pub fn sim_setup(&mut self) {
        let saved = self
            .order
            .iter()
            .map(|&key| (key, self.entities[key].snapshot()))
            .collect();
        self.speculation = Some(Speculation {
            saved,
            spawned: Vec::new(),
            suppressed: Vec::new(),
            time: self.time,
        });
    }

    /// Closes the speculative window, restoring every saved entity verbatim
    /// and destroying anything created inside it.
    pub fn sim_reset(&mut self) {
        let Some(window) = self.speculation.take() else {
            return;
        };
        for key in window.spawned.iter().rev() {
            self.destroy(*key);
        }
        for (key, snapshot) in &window.saved {
            if let Some(entity) = self.entities.get_mut(*key) {
                entity.restore(snapshot);
            }
        }
        self.delete_buffer.clear();
        self.time = window.time;
    }

    pub fn summary(&self) -> WorldSummary {
        WorldSummary {
            entities: self.entities.len(),
            stars: self.stars.len(),
            planets: self.planets.len(),
            players: self.players.len(),
            time: self.time,
        }
    }
}
