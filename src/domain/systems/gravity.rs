// Point-mass gravity from gravitating bodies.

use crate::domain::entity::EntityKey;
use crate::domain::quad::{QuadItem, QuadTree};
use crate::domain::world::World;

/// Applies one body's pull to every other live entity, plus the reaction of
/// every non-body back onto the body.
///
/// Body-on-body pairs get no reaction term: the other body's own pass applies
/// the opposite pull, so each ordered pair is counted exactly once per tick.
pub fn pull_from(world: &mut World, body: EntityKey) {
    let Some(source) = world.get(body) else {
        return;
    };
    let (bx, by, mass) = (source.x, source.y, source.mass);
    let gravity = world.tuning.physics.gravity;
    let dt = world.tuning.physics.delta;

    let (mut react_x, mut react_y) = (0.0, 0.0);
    for (key, e) in world.entities_mut() {
        if key == body {
            continue;
        }
        let dx = e.x - bx;
        let dy = e.y - by;
        let dist2 = dx * dx + dy * dy;
        if dist2 <= 0.0 {
            continue;
        }
        let k = gravity / (dist2 * dist2.sqrt()) * dt;
        e.add_velocity(-mass * dx * k, -mass * dy * k);
        if !e.is_body() {
            react_x += e.mass * dx * k;
            react_y += e.mass * dy * k;
        }
    }
    if let Some(source) = world.get_mut(body) {
        source.add_velocity(react_x, react_y);
    }
}

/// Velocity change one tick of gravity from every body would give `key`.
pub fn pull_on(world: &World, key: EntityKey) -> (f64, f64) {
    let Some(target) = world.get(key) else {
        return (0.0, 0.0);
    };
    let gravity = world.tuning.physics.gravity;
    let dt = world.tuning.physics.delta;
    let (mut dvx, mut dvy) = (0.0, 0.0);
    for &body in world.stars().iter().chain(world.planets()) {
        if body == key || world.is_suppressed(body) {
            continue;
        }
        let Some(source) = world.get(body) else {
            continue;
        };
        let dx = source.x - target.x;
        let dy = source.y - target.y;
        let dist2 = dx * dx + dy * dy;
        if dist2 <= 0.0 {
            continue;
        }
        let k = gravity * source.mass / (dist2 * dist2.sqrt()) * dt;
        dvx += dx * k;
        dvy += dy * k;
    }
    (dvx, dvy)
}

/// Quadtree-approximated body pulls for every entity. Reactions from
/// non-bodies onto bodies are summed directly.
pub fn barnes_hut(world: &mut World, theta: f64) {
    let gravity = world.tuning.physics.gravity;
    let dt = world.tuning.physics.delta;

    let bodies: Vec<QuadItem> = world
        .iter()
        .filter(|(key, e)| e.is_body() && !world.is_suppressed(*key))
        .map(|(key, e)| QuadItem {
            key,
            x: e.x,
            y: e.y,
            mass: e.mass,
        })
        .collect();
    if bodies.is_empty() {
        return;
    }
    let tree = QuadTree::enclosing(&bodies);

    let movers: Vec<(f64, f64, f64)> = world
        .iter()
        .filter(|(key, e)| !e.is_body() && !world.is_suppressed(*key))
        .map(|(_, e)| (e.x, e.y, e.mass))
        .collect();

    let mut deltas: Vec<(EntityKey, f64, f64)> = world
        .iter()
        .filter(|(key, _)| !world.is_suppressed(*key))
        .map(|(key, e)| {
            let (ax, ay) = tree.acceleration_at(e.x, e.y, key, gravity, theta);
            (key, ax * dt, ay * dt)
        })
        .collect();

    for (key, dvx, dvy) in deltas.iter_mut() {
        let Some(item) = bodies.iter().find(|item| item.key == *key) else {
            continue;
        };
        for &(mx, my, mass) in &movers {
            let dx = mx - item.x;
            let dy = my - item.y;
            let dist2 = dx * dx + dy * dy;
            if dist2 <= 0.0 {
                continue;
            }
            let k = gravity * mass / (dist2 * dist2.sqrt()) * dt;
            *dvx += dx * k;
            *dvy += dy * k;
        }
    }

    for (key, dvx, dvy) in deltas {
        if let Some(e) = world.get_mut(key) {
            e.add_velocity(dvx, dvy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Body;
    use crate::domain::tuning::Tuning;
    use crate::domain::world::Role;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn momentum(world: &World) -> (f64, f64) {
        world.iter().fold((0.0, 0.0), |(px, py), (_, e)| {
            (px + e.mass * e.vel_x, py + e.mass * e.vel_y)
        })
    }

    fn scattered(seed: u64) -> World {
        let mut world = World::new(Role::Server, Tuning::default(), seed);
        let mut rng = StdRng::seed_from_u64(seed);
        for i in 0..12 {
            let key = if i % 3 == 0 {
                world.spawn_craft()
            } else {
                world.spawn_body(Body::default(), 100.0, rng.random_range(1.0e6..1.0e8))
            };
            let e = world.get_mut(key).unwrap();
            e.set_position(
                rng.random_range(-50_000.0..50_000.0),
                rng.random_range(-50_000.0..50_000.0),
            );
            e.set_velocity(rng.random_range(-10.0..10.0), rng.random_range(-10.0..10.0));
        }
        world
    }

    #[test]
    fn mutual_pulls_conserve_momentum() {
        let mut world = scattered(21);
        let (px, py) = momentum(&world);

        let bodies: Vec<EntityKey> = world.planets().to_vec();
        for body in bodies {
            pull_from(&mut world, body);
        }

        let (qx, qy) = momentum(&world);
        let scale = world.iter().map(|(_, e)| e.mass * e.vel_x.abs()).sum::<f64>();
        assert_relative_eq!(qx, px, epsilon = scale * 1e-12);
        assert_relative_eq!(qy, py, epsilon = scale * 1e-12);
    }

    #[test]
    fn two_bodies_each_pulled_once_by_the_other() {
        let mut world = World::new(Role::Server, Tuning::default(), 1);
        let a = world.spawn_body(Body::default(), 10.0, 1.0e6);
        let b = world.spawn_body(Body::default(), 10.0, 2.0e6);
        world.get_mut(b).unwrap().set_position(1000.0, 0.0);

        pull_from(&mut world, a);
        pull_from(&mut world, b);

        let g = world.tuning.physics.gravity;
        let dt = world.tuning.physics.delta;
        // a accelerates toward b with G * m_b / d^2, and vice versa.
        assert_relative_eq!(world.get(a).unwrap().vel_x, g * 2.0e6 / 1.0e6 * dt);
        assert_relative_eq!(world.get(b).unwrap().vel_x, -g * 1.0e6 / 1.0e6 * dt);
    }

    fn velocities(world: &World) -> Vec<(f64, f64)> {
        world.iter().map(|(_, e)| (e.vel_x, e.vel_y)).collect()
    }

    #[test]
    fn barnes_hut_with_zero_theta_is_exact() {
        let mut direct = scattered(8);
        let mut tree = scattered(8);

        let bodies: Vec<EntityKey> = direct.planets().to_vec();
        for body in bodies {
            pull_from(&mut direct, body);
        }
        barnes_hut(&mut tree, 0.0);

        for ((dx, dy), (tx, ty)) in velocities(&direct).into_iter().zip(velocities(&tree)) {
            assert_relative_eq!(dx, tx, max_relative = 1e-9, epsilon = 1e-12);
            assert_relative_eq!(dy, ty, max_relative = 1e-9, epsilon = 1e-12);
        }
    }

    #[test]
    fn barnes_hut_approximates_a_distant_cluster() {
        let build = || {
            let mut world = World::new(Role::Server, Tuning::default(), 2);
            let mut rng = StdRng::seed_from_u64(2);
            for _ in 0..16 {
                let key = world.spawn_body(Body::default(), 50.0, rng.random_range(1.0e7..1.0e9));
                world.get_mut(key).unwrap().set_position(
                    rng.random_range(-1000.0..1000.0),
                    rng.random_range(-1000.0..1000.0),
                );
            }
            let probe = world.spawn_craft();
            world.get_mut(probe).unwrap().set_position(400_000.0, -300_000.0);
            (world, probe)
        };
        let (mut direct, probe) = build();
        let (mut tree, _) = build();

        let bodies: Vec<EntityKey> = direct.planets().to_vec();
        for body in bodies {
            pull_from(&mut direct, body);
        }
        barnes_hut(&mut tree, 0.5);

        let d = direct.get(probe).unwrap();
        let t = tree.get(probe).unwrap();
        assert_relative_eq!(t.vel_x, d.vel_x, max_relative = 1e-3);
        assert_relative_eq!(t.vel_y, d.vel_y, max_relative = 1e-3);
    }

    #[test]
    fn pull_on_matches_a_full_pass_for_a_craft() {
        let mut world = scattered(4);
        let craft = world
            .iter()
            .find(|(_, e)| e.as_craft().is_some())
            .map(|(k, _)| k)
            .unwrap();
        let before = world.get(craft).unwrap().snapshot();
        let (dvx, dvy) = pull_on(&world, craft);

        let bodies: Vec<EntityKey> = world.planets().to_vec();
        for body in bodies {
            pull_from(&mut world, body);
        }
        let after = world.get(craft).unwrap();
        assert_relative_eq!(after.vel_x - before.vel_x, dvx, max_relative = 1e-9);
        assert_relative_eq!(after.vel_y - before.vel_y, dvy, max_relative = 1e-9);
    }
}
