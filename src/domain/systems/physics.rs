use crate::domain::entity::EntityKey;
use crate::domain::movement::Movement;
use crate::domain::tuning::GravityMode;
use crate::domain::world::World;

use super::{collision, control, gravity};

/// Current movement of every player's craft, in player order.
pub fn player_controls(world: &World) -> Vec<(EntityKey, Movement)> {
    world
        .players()
        .iter()
        .map(|player| (player.craft, player.controls))
        .collect()
}

/// Advances the world by one fixed timestep.
///
/// Controls are applied first, then every entity moves (pass 1) before any
/// entity interacts (pass 2), so collisions and gravity always see post-motion
/// positions. Deletions discovered along the way are applied at the very end.
pub fn step(world: &mut World, controls: &[(EntityKey, Movement)]) {
    for &(craft, movement) in controls {
        control::control(world, craft, movement);
    }
    integrate(world);
    interact(world);
    world.flush_deletions();
    world.advance_clock();
}

/// Advances a single entity against the otherwise frozen world: used to
/// replay recorded inputs for one craft during reconciliation.
pub fn step_entity(world: &mut World, key: EntityKey, movement: Movement) {
    control::control(world, key, movement);
    let dt = world.tuning.physics.delta;
    let (dvx, dvy) = gravity::pull_on(world, key);
    if let Some(e) = world.get_mut(key) {
        e.x += e.vel_x * dt;
        e.y += e.vel_y * dt;
        e.rotation += e.rotate_vel * dt;
        e.add_velocity(dvx, dvy);
    }
    world.advance_clock();
}

fn integrate(world: &mut World) {
    let dt = world.tuning.physics.delta;
    let keys = world.keys().to_vec();
    for key in keys {
        if world.is_suppressed(key) {
            continue;
        }
        if let Some(e) = world.get_mut(key) {
            e.x += e.vel_x * dt;
            e.y += e.vel_y * dt;
            e.rotation += e.rotate_vel * dt;
        }
    }
}

fn interact(world: &mut World) {
    let direct = world.tuning.physics.gravity_mode == GravityMode::Direct;
    let keys = world.keys().to_vec();
    for key in keys {
        if !world.contains(key) || world.is_suppressed(key) {
            continue;
        }
        collision::scan(world, key);
        if direct && world.get(key).is_some_and(|e| e.is_body()) {
            gravity::pull_from(world, key);
        }
    }
    if let GravityMode::BarnesHut { theta } = world.tuning.physics.gravity_mode {
        gravity::barnes_hut(world, theta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Body;
    use crate::domain::tuning::Tuning;
    use crate::domain::world::Role;
    use approx::assert_relative_eq;

    #[test]
    fn motion_is_explicit_euler_on_the_fixed_timestep() {
        let mut world = World::new(Role::Server, Tuning::default(), 3);
        let craft = world.spawn_craft();
        let e = world.get_mut(craft).unwrap();
        e.set_velocity(60.0, -30.0);
        e.rotate_vel = 90.0;

        step(&mut world, &[]);

        let e = world.get(craft).unwrap();
        assert_relative_eq!(e.x, 1.0);
        assert_relative_eq!(e.y, -0.5);
        assert_relative_eq!(e.rotation, 1.5);
        assert_relative_eq!(world.time(), 1.0 / 60.0);
    }

    #[test]
    fn overlapping_bodies_merge_into_the_heavier_one() {
        let mut world = World::new(Role::Server, Tuning::default(), 3);
        let heavy = world.spawn_body(Body::default(), 10.0, 100.0);
        let light = world.spawn_body(Body::default(), 8.0, 50.0);
        world.get_mut(light).unwrap().set_position(5.0, 0.0);

        step(&mut world, &[]);

        assert_eq!(world.len(), 1);
        assert!(!world.contains(light));
        let survivor = world.get(heavy).unwrap();
        assert_relative_eq!(survivor.mass, 150.0);
        assert_relative_eq!(survivor.radius, 10.0 * 1.5f64.sqrt());
        assert_eq!(world.planets(), &[heavy]);
    }

    #[test]
    fn equal_bodies_merge_exactly_once() {
        let mut world = World::new(Role::Server, Tuning::default(), 3);
        let a = world.spawn_body(Body::default(), 10.0, 80.0);
        let b = world.spawn_body(Body::default(), 10.0, 80.0);
        world.get_mut(b).unwrap().set_position(4.0, 0.0);

        step(&mut world, &[]);

        assert_eq!(world.len(), 1);
        let (_, survivor) = world.iter().next().unwrap();
        assert_relative_eq!(survivor.mass, 160.0);
        assert!(world.contains(a) ^ world.contains(b));
    }
}
