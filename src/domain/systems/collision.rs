// Broad-phase neighbour caching, narrow-phase overlap tests and collision response.

use tracing::{debug, info};

use crate::domain::entity::{Entity, EntityKey, KindTag};
use crate::domain::tuning::PhysicsTuning;
use crate::domain::world::World;

use super::generation;

/// Runs the interaction scan for one entity: refreshes its neighbour cache if
/// the cooldown has elapsed, then resolves every overlapping neighbour.
pub fn scan(world: &mut World, key: EntityKey) {
    if world.is_pending_delete(key) {
        return;
    }
    refresh_near(world, key);

    let near = match world.get(key) {
        Some(e) => e.near.clone(),
        None => return,
    };
    for other in near {
        if world.is_pending_delete(other) || world.is_suppressed(other) {
            continue;
        }
        let touching = match (world.get(key), world.get(other)) {
            (Some(a), Some(b)) => a.overlaps(b) && !(a.ghost && b.ghost && a.tag() == b.tag()),
            _ => false,
        };
        if touching && resolve(world, key, other) == Flow::Break {
            break;
        }
    }
}

/// Rebuilds the neighbour cache, keeping entities expected to close the gap
/// within the scan horizon given their current relative speed.
fn refresh_near(world: &mut World, key: EntityKey) {
    let physics = world.tuning.physics;
    let now = world.time();
    let Some(e) = world.get(key) else {
        return;
    };
    if now - e.last_collide_scan <= physics.collide_scan_spacing {
        return;
    }

    let near: Vec<EntityKey> = world
        .iter()
        .filter(|&(other_key, other)| {
            other_key != key
                && !world.is_suppressed(other_key)
                && !(e.ghost && other.ghost && e.tag() == KindTag::Craft && other.tag() == KindTag::Craft)
                && closing_time2(e, other, &physics) < physics.collide_scan_distance2
        })
        .map(|(other_key, _)| other_key)
        .collect();

    if let Some(e) = world.get_mut(key) {
        e.near = near;
        e.last_collide_scan = now;
    }
}

/// Squared time to contact at the current closing speed (negative when
/// already overlapping). The speed is clamped so slow pairs are not dropped.
fn closing_time2(a: &Entity, b: &Entity, physics: &PhysicsTuning) -> f64 {
    let reach = a.radius + b.radius;
    let gap2 = a.dist2_to(b) - reach * reach;
    let dvx = a.vel_x - b.vel_x;
    let dvy = a.vel_y - b.vel_y;
    gap2 / (dvx * dvx + dvy * dvy).max(physics.min_closing_speed2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Break,
}

fn resolve(world: &mut World, key: EntityKey, other: EntityKey) -> Flow {
    collide(world, key, other, true);

    let (Some(a), Some(b)) = (world.get(key), world.get(other)) else {
        return Flow::Break;
    };
    let (a_tag, b_tag) = (a.tag(), b.tag());

    if a.is_star() && b_tag == KindTag::Craft {
        incinerate(world, other);
        return Flow::Break;
    }
    if a_tag == KindTag::Body && b_tag == KindTag::Body {
        if a.mass >= b.mass && world.is_authoritative() {
            absorb(world, key, other);
        }
        return Flow::Break;
    }
    if a_tag == KindTag::Projectile || b_tag == KindTag::Projectile {
        return Flow::Break;
    }
    Flow::Continue
}

/// Collision response of `key` against `other`, mirrored once onto `other`
/// when `collide_other` is set.
pub fn collide(world: &mut World, key: EntityKey, other: EntityKey, collide_other: bool) {
    let (Some(a), Some(b)) = (world.get(key), world.get(other)) else {
        return;
    };
    match (a.tag(), b.tag()) {
        (KindTag::Projectile, KindTag::Craft) => {
            kill(world, key, other);
            return;
        }
        (KindTag::Projectile, KindTag::Body) => {
            if world.is_authoritative() {
                world.queue_delete(key);
            }
            return;
        }
        (_, KindTag::Projectile) => return,
        _ => {}
    }

    let physics = world.tuning.physics;
    if let Some([a, b]) = world.pair_mut(key, other) {
        impulse(a, b, &physics);
    }
    if collide_other {
        collide(world, other, key, false);
    }
}

/// Velocity and position correction applied to `a` only.
fn impulse(a: &mut Entity, b: &Entity, physics: &PhysicsTuning) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let dist = dx.hypot(dy);
    if dist <= 0.0 {
        return;
    }
    let (nx, ny) = (dx / dist, dy / dist);
    let dvx = a.vel_x - b.vel_x;
    let dvy = a.vel_y - b.vel_y;
    let speed = dvx.hypot(dvy);

    let mass_factor = (b.mass / a.mass).min(1.0);
    // Cosine between the contact normal and the approach velocity.
    let alignment = if speed > 0.0 {
        (nx * dvx + ny * dvy) / speed
    } else {
        0.0
    };
    let factor = mass_factor * alignment * physics.collide_restitution;
    if factor < 0.0 {
        return;
    }

    let friction = mass_factor * physics.friction * physics.delta;
    a.vel_x -= speed * nx * factor + friction * dvx;
    a.vel_y -= speed * ny * factor + friction * dvy;

    let reach = a.radius + b.radius;
    a.x = (a.x + (b.x - reach * nx) * mass_factor) / (1.0 + mass_factor);
    a.y = (a.y + (b.y - reach * ny) * mass_factor) / (1.0 + mass_factor);
}

fn kill(world: &mut World, projectile: EntityKey, craft: EntityKey) {
    if !world.is_authoritative() {
        return;
    }
    if let Some(owner) = world.projectile_owner(projectile) {
        if let Some(player) = world.player_for_craft_mut(owner) {
            player.kills += 1;
        }
    }
    world.queue_delete(projectile);

    if world.is_simulating() {
        world.queue_delete(craft);
        return;
    }
    let victim = world.player_for_craft(craft).map(|p| (p.id, p.name()));
    match victim {
        Some((player_id, name)) => {
            info!(player_id, "craft destroyed");
            world.relay_notice(format!("<{name}> has been killed."));
            generation::setup_ship(world, craft);
        }
        None => world.queue_delete(craft),
    }
}

fn incinerate(world: &mut World, craft: EntityKey) {
    let victim = if world.is_simulating() {
        None
    } else {
        world.player_for_craft(craft).map(|p| (p.id, p.name()))
    };
    match victim {
        Some((player_id, name)) => {
            info!(player_id, "craft incinerated");
            world.relay_notice(format!("<{name}> has been incinerated."));
            generation::setup_ship(world, craft);
        }
        None if world.is_authoritative() => world.queue_delete(craft),
        None => {}
    }
}

/// Merges `light` into `heavy`, conserving mass and scaling the radius by the
/// square root of the mass ratio.
fn absorb(world: &mut World, heavy: EntityKey, light: EntityKey) {
    let Some(absorbed_mass) = world.get(light).map(|e| e.mass) else {
        return;
    };
    let Some(survivor) = world.get_mut(heavy) else {
        return;
    };
    let mass = survivor.mass + absorbed_mass;
    survivor.radius *= (mass / survivor.mass).sqrt();
    survivor.mass = mass;
    let (survivor_id, radius) = (survivor.id, survivor.radius);

    if world.is_simulating() {
        debug!(survivor_id, "speculative merge");
    } else {
        let absorbed = world.get(light).map(|e| e.id);
        info!(survivor_id, absorbed, mass, radius, "bodies merged");
    }
    world.emit_planet_collision(heavy);
    world.queue_delete(light);
}
