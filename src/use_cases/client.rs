// Client-side mirror of the server world with local prediction of the own craft.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::domain::entity::{Craft, Point, TRAJECTORY_LIMIT};
use crate::domain::systems::physics;
use crate::domain::{
    EntityId, EntityKey, Movement, PlayerId, Role, SyncEntry, SyncEvent, Tuning, World,
};

#[derive(Debug, Clone, Copy)]
pub struct ClientSettings {
    /// Inputs replayed on top of an authoritative update; roughly the round trip in ticks.
    pub replay_ticks: usize,
    /// Distance beyond which a replayed correction replaces the local prediction.
    pub correction_threshold: f64,
    /// Notices kept for display.
    pub notice_limit: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            replay_ticks: 6,
            correction_threshold: 4.0,
            notice_limit: 5,
        }
    }
}

/// One predicted tick: the input and the own-craft state it started from.
#[derive(Debug, Clone)]
struct Recorded {
    movement: Movement,
    time: f64,
    rotate_vel: f64,
    craft: Craft,
}

pub struct ClientSession {
    world: World,
    settings: ClientSettings,
    player_id: Option<PlayerId>,
    // Known from Identity, possibly before the matching Create arrives.
    own_entity: Option<EntityId>,
    history: VecDeque<Recorded>,
    notices: VecDeque<String>,
}

impl ClientSession {
    pub fn new(tuning: Tuning, settings: ClientSettings) -> Self {
        Self {
            world: World::new(Role::Client, tuning, 0),
            settings,
            player_id: None,
            own_entity: None,
            history: VecDeque::with_capacity(settings.replay_ticks),
            notices: VecDeque::with_capacity(settings.notice_limit),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        self.player_id
    }

    /// Handle of the locally controlled craft once it has been created.
    pub fn own_craft(&self) -> Option<EntityKey> {
        self.own_entity.and_then(|id| self.world.key_of(id))
    }

    /// Most recent notices, oldest first.
    pub fn notices(&self) -> impl Iterator<Item = &str> {
        self.notices.iter().map(String::as_str)
    }

    pub fn apply(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Identity {
                player_id,
                entity_id,
            } => {
                debug!(player_id, entity_id, "identity assigned");
                self.player_id = Some(player_id);
                self.own_entity = Some(entity_id);
                self.world.follow(self.own_craft());
            }
            SyncEvent::Create(payload) => {
                let key = self.world.adopt(&payload);
                if Some(payload.id()) == self.own_entity {
                    self.world.follow(Some(key));
                }
            }
            SyncEvent::Delete { id } => {
                if self.world.destroy_by_id(id).is_none() {
                    trace!(entity_id = id, "delete for unknown entity");
                }
            }
            SyncEvent::Sync(entries) => {
                for entry in &entries {
                    match self.world.key_of(entry.id()) {
                        Some(key) if Some(key) == self.own_craft() => self.reconcile(key, entry),
                        Some(key) => apply_entry(&mut self.world, key, entry),
                        None => trace!(entity_id = entry.id(), "sync for unknown entity"),
                    }
                }
            }
            SyncEvent::PlanetCollision { id, mass, radius } => {
                if let Some(body) = self.world.key_of(id).and_then(|k| self.world.get_mut(k)) {
                    body.mass = mass;
                    body.radius = radius;
                }
            }
            SyncEvent::Notice { text } => {
                if self.notices.len() == self.settings.notice_limit {
                    self.notices.pop_front();
                }
                self.notices.push_back(text);
            }
        }
    }

    /// Advances the local mirror one tick, steering the own craft with `movement`.
    pub fn tick(&mut self, movement: Movement) {
        let own = self.own_craft();
        let recorded = own.and_then(|key| self.world.get(key)).and_then(|e| {
            e.as_craft().map(|craft| Recorded {
                movement,
                time: self.world.time(),
                rotate_vel: e.rotate_vel,
                craft: craft.clone(),
            })
        });
        let controls: Vec<(EntityKey, Movement)> =
            own.map(|key| (key, movement)).into_iter().collect();
        physics::step(&mut self.world, &controls);

        let Some(recorded) = recorded else {
            return;
        };
        if self.history.len() == self.settings.replay_ticks {
            self.history.pop_front();
        }
        if self.settings.replay_ticks > 0 {
            self.history.push_back(recorded);
        }
    }

    /// Replays recent inputs on top of an authoritative own-craft state inside
    /// a speculative window. The replay starts from the cooldowns, charge and
    /// clock recorded with the oldest input. The result replaces the
    /// prediction only when the two have drifted further apart than the
    /// correction threshold.
    fn reconcile(&mut self, key: EntityKey, entry: &SyncEntry) {
        let Some(predicted) = self.world.get(key).map(|e| e.snapshot()) else {
            return;
        };

        self.world.sim_setup();
        apply_entry(&mut self.world, key, entry);
        if let Some(oldest) = self.history.front() {
            self.world.rewind_clock(oldest.time);
            if let Some(e) = self.world.get_mut(key) {
                e.rotate_vel = oldest.rotate_vel;
                if let Some(craft) = e.as_craft_mut() {
                    craft.clone_from(&oldest.craft);
                }
            }
        }
        for recorded in &self.history {
            physics::step_entity(&mut self.world, key, recorded.movement);
        }
        let corrected = self.world.get(key).map(|e| e.snapshot());
        self.world.sim_reset();

        let Some(corrected) = corrected else {
            return;
        };
        let error2 = corrected.position_error2(&predicted);
        if error2 > self.settings.correction_threshold.powi(2) {
            debug!(error = error2.sqrt(), "correcting predicted craft");
            if let Some(e) = self.world.get_mut(key) {
                e.restore(&corrected);
            }
        }
    }

    /// Simulates the whole mirror `ticks` ahead inside a speculative window and
    /// records every entity's path relative to the followed entity.
    pub fn predict_trajectories(&mut self, ticks: usize) {
        let followed = self.world.followed();
        for (_, e) in self.world.entities_mut() {
            e.trajectory.clear();
        }

        self.world.sim_setup();
        for _ in 0..ticks.min(TRAJECTORY_LIMIT) {
            physics::step(&mut self.world, &[]);
            let (ox, oy) = followed
                .and_then(|key| self.world.get(key))
                .map(|e| (e.x, e.y))
                .unwrap_or_default();
            for (_, e) in self.world.entities_mut() {
                e.trajectory.push_back(Point {
                    x: e.x - ox,
                    y: e.y - oy,
                });
            }
        }
        self.world.sim_reset();
    }
}

fn apply_entry(world: &mut World, key: EntityKey, entry: &SyncEntry) {
    let Some(e) = world.get_mut(key) else {
        return;
    };
    match *entry {
        SyncEntry::Craft {
            x,
            y,
            vel_x,
            vel_y,
            rotation,
            ..
        } => {
            e.set_position(x, y);
            e.set_velocity(vel_x, vel_y);
            e.rotation = rotation;
        }
        SyncEntry::Motion {
            x, y, vel_x, vel_y, ..
        } => {
            e.set_position(x, y);
            e.set_velocity(vel_x, vel_y);
        }
    }
}
