// Domain-level simulation entities: shared kinematics plus per-variant state.

use std::collections::VecDeque;

use slotmap::new_key_type;

new_key_type! {
    /// Stable arena handle for a live entity. Lookups through a freed handle
    /// return `None`, so handles double as weak references.
    pub struct EntityKey;
}

/// Network-visible identity. Assigned sequentially and never reused.
pub type EntityId = u64;

/// Maximum number of points kept in an entity's trajectory preview.
pub const TRAJECTORY_LIMIT: usize = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Player- or AI-controlled ship.
#[derive(Debug, Clone, PartialEq)]
pub struct Craft {
    pub last_boosted: f64,
    pub last_shot: f64,
    // Bounded to [0, 2 * hyperboost_time] by the control system.
    pub hyperboost_charge: f64,
    pub burning: bool,
}

impl Default for Craft {
    fn default() -> Self {
        Self {
            last_boosted: f64::NEG_INFINITY,
            last_shot: f64::NEG_INFINITY,
            hyperboost_charge: 0.0,
            burning: false,
        }
    }
}

/// Star, black hole, planet or moon.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Body {
    pub star: bool,
    pub blackhole: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Projectile {
    // Weak: resolve through `World::projectile_owner`, which checks liveness.
    pub(crate) owner: Option<EntityKey>,
}

/// Closed set of simulated variants.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Craft(Craft),
    Body(Body),
    Projectile(Projectile),
}

/// Variant tag without payload, for dispatch tables and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindTag {
    Craft,
    Body,
    Projectile,
}

impl EntityKind {
    pub fn tag(&self) -> KindTag {
        match self {
            EntityKind::Craft(_) => KindTag::Craft,
            EntityKind::Body(_) => KindTag::Body,
            EntityKind::Projectile(_) => KindTag::Projectile,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub x: f64,
    pub y: f64,
    pub vel_x: f64,
    pub vel_y: f64,
    /// Degrees.
    pub rotation: f64,
    /// Degrees per second.
    pub rotate_vel: f64,
    pub mass: f64,
    pub radius: f64,
    pub color: Color,
    pub ghost: bool,
    pub kind: EntityKind,
    /// Predicted positions relative to the followed entity, for presentation only.
    pub trajectory: VecDeque<Point>,

    // Broad-phase neighbour cache, refreshed on a cooldown.
    pub(crate) near: Vec<EntityKey>,
    pub(crate) last_collide_scan: f64,
}

impl Entity {
    pub fn new(id: EntityId, kind: EntityKind, mass: f64, radius: f64) -> Self {
        Self {
            id,
            x: 0.0,
            y: 0.0,
            vel_x: 0.0,
            vel_y: 0.0,
            rotation: 0.0,
            rotate_vel: 0.0,
            mass,
            radius,
            color: Color::new(255, 255, 255),
            ghost: false,
            kind,
            trajectory: VecDeque::new(),
            near: Vec::new(),
            last_collide_scan: f64::NEG_INFINITY,
        }
    }

    pub fn tag(&self) -> KindTag {
        self.kind.tag()
    }

    pub fn is_body(&self) -> bool {
        matches!(self.kind, EntityKind::Body(_))
    }

    pub fn is_star(&self) -> bool {
        matches!(self.kind, EntityKind::Body(Body { star: true, .. }))
    }

    pub fn as_craft(&self) -> Option<&Craft> {
        match &self.kind {
            EntityKind::Craft(craft) => Some(craft),
            _ => None,
        }
    }

    pub fn as_craft_mut(&mut self) -> Option<&mut Craft> {
        match &mut self.kind {
            EntityKind::Craft(craft) => Some(craft),
            _ => None,
        }
    }

    pub fn as_body(&self) -> Option<&Body> {
        match &self.kind {
            EntityKind::Body(body) => Some(body),
            _ => None,
        }
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    pub fn set_velocity(&mut self, vel_x: f64, vel_y: f64) {
        self.vel_x = vel_x;
        self.vel_y = vel_y;
    }

    pub fn add_velocity(&mut self, dx: f64, dy: f64) {
        self.vel_x += dx;
        self.vel_y += dy;
    }

    /// Current broad-phase neighbour candidates.
    pub fn near(&self) -> &[EntityKey] {
        &self.near
    }

    pub fn dist2_to(&self, other: &Entity) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn overlaps(&self, other: &Entity) -> bool {
        let reach = self.radius + other.radius;
        self.dist2_to(other) <= reach * reach
    }

    /// Captures every mutable physical field needed to undo a speculative step.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            x: self.x,
            y: self.y,
            vel_x: self.vel_x,
            vel_y: self.vel_y,
            rotation: self.rotation,
            rotate_vel: self.rotate_vel,
            mass: self.mass,
            radius: self.radius,
            near: self.near.clone(),
            last_collide_scan: self.last_collide_scan,
            craft: self.as_craft().cloned(),
        }
    }

    /// Restores the fields captured by [`Entity::snapshot`] verbatim.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.x = snapshot.x;
        self.y = snapshot.y;
        self.vel_x = snapshot.vel_x;
        self.vel_y = snapshot.vel_y;
        self.rotation = snapshot.rotation;
        self.rotate_vel = snapshot.rotate_vel;
        self.mass = snapshot.mass;
        self.radius = snapshot.radius;
        self.near.clone_from(&snapshot.near);
        self.last_collide_scan = snapshot.last_collide_scan;
        if let (EntityKind::Craft(craft), Some(saved)) = (&mut self.kind, &snapshot.craft) {
            craft.clone_from(saved);
        }
    }
}

/// Saved physical state of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub x: f64,
    pub y: f64,
    pub vel_x: f64,
    pub vel_y: f64,
    pub rotation: f64,
    pub rotate_vel: f64,
    pub mass: f64,
    pub radius: f64,
    pub near: Vec<EntityKey>,
    pub last_collide_scan: f64,
    pub craft: Option<Craft>,
}

impl Snapshot {
    /// Squared positional distance between two snapshots.
    pub fn position_error2(&self, other: &Snapshot) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn craft() -> Entity {
        let mut e = Entity::new(7, EntityKind::Craft(Craft::default()), 20_000.0, 16.0);
        e.set_position(3.0, -4.0);
        e.set_velocity(1.5, 2.5);
        e.rotation = 45.0;
        e.rotate_vel = -10.0;
        e
    }

    #[test]
    fn restore_undoes_every_physical_change() {
        let mut e = craft();
        let saved = e.snapshot();

        e.set_position(100.0, 100.0);
        e.add_velocity(9.0, 9.0);
        e.rotation = 0.0;
        e.mass *= 2.0;
        e.radius = 1.0;
        e.last_collide_scan = 12.0;
        if let Some(c) = e.as_craft_mut() {
            c.hyperboost_charge = 1.0;
            c.burning = true;
            c.last_shot = 3.0;
        }

        e.restore(&saved);
        assert_eq!(e.snapshot(), saved);
    }

    #[test]
    fn overlap_is_inclusive_at_touching_distance() {
        let a = craft();
        let mut b = craft();
        b.set_position(a.x + a.radius + b.radius, a.y);
        assert!(a.overlaps(&b));
        b.x += 0.001;
        assert!(!a.overlaps(&b));
    }
}
