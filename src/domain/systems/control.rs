// Craft steering, thrust, boost, hyperboost and primary fire.

use crate::domain::entity::{Entity, EntityKey};
use crate::domain::movement::Movement;
use crate::domain::tuning::CraftTuning;
use crate::domain::world::World;

/// Unit heading for a rotation in degrees.
pub fn heading(rotation: f64) -> (f64, f64) {
    let rad = rotation.to_radians();
    (rad.cos(), rad.sin())
}

/// Applies one tick of control input to a craft. Non-craft keys are ignored.
pub fn control(world: &mut World, key: EntityKey, movement: Movement) {
    let tuning = world.tuning.craft;
    let dt = world.tuning.physics.delta;
    let now = world.time();
    let authoritative = world.is_authoritative();

    let Some(entity) = world.get_mut(key) else {
        return;
    };
    let Some(craft) = entity.as_craft() else {
        return;
    };
    let (mut charge, mut burning) = (craft.hyperboost_charge, craft.burning);
    let (hx, hy) = heading(entity.rotation);

    if movement.hyperboost() || burning {
        let rate = if burning { -2.0 } else { 1.0 };
        charge = (charge + dt * rate).clamp(0.0, 2.0 * tuning.hyperboost_time);
        burning = charge > tuning.hyperboost_time
            && (burning || (movement.boost() && charge > tuning.min_afterburn));

        if burning {
            entity.add_velocity(
                hx * tuning.afterburn_strength * dt,
                hy * tuning.afterburn_strength * dt,
            );
        } else {
            steer(entity, movement, tuning.hyperboost_rotate_speed, &tuning, dt);
            if charge > tuning.hyperboost_time {
                entity.add_velocity(
                    hx * tuning.hyperboost_strength * dt,
                    hy * tuning.hyperboost_strength * dt,
                );
            }
        }
        if let Some(craft) = entity.as_craft_mut() {
            craft.hyperboost_charge = charge;
            craft.burning = burning;
        }
        return;
    }

    // Forward wins when both directions are held.
    if movement.forward() {
        entity.add_velocity(hx * tuning.accel * dt, hy * tuning.accel * dt);
    } else if movement.backward() {
        entity.add_velocity(-hx * tuning.accel * dt, -hy * tuning.accel * dt);
    }
    steer(entity, movement, tuning.rotate_speed, &tuning, dt);

    let (mut boosted, mut fired) = (false, false);
    if let Some(craft) = entity.as_craft_mut() {
        craft.hyperboost_charge = 0.0;
        if movement.boost() && craft.last_boosted + tuning.boost_cooldown < now {
            craft.last_boosted = now;
            boosted = true;
        }
        if movement.primary_fire() && craft.last_shot + tuning.reload < now {
            craft.last_shot = now;
            fired = true;
        }
    }
    if boosted {
        entity.add_velocity(hx * tuning.boost_strength, hy * tuning.boost_strength);
    }
    // A plain client only tracks the cooldown; the server owns the projectile.
    if fired && authoritative {
        shoot(world, key);
    }
}

fn steer(entity: &mut Entity, movement: Movement, speed: f64, tuning: &CraftTuning, dt: f64) {
    if movement.turn_left() {
        entity.rotate_vel += speed * dt;
    } else if movement.turn_right() {
        entity.rotate_vel -= speed * dt;
    }
    let slow = speed * dt * tuning.rotate_slow_mult;
    if entity.rotate_vel.abs() <= slow {
        entity.rotate_vel = 0.0;
    } else {
        entity.rotate_vel -= slow * entity.rotate_vel.signum();
    }
}

/// Spawns a projectile just ahead of the craft and applies the recoil.
fn shoot(world: &mut World, key: EntityKey) {
    let shoot_power = world.tuning.craft.shoot_power;
    let projectile = world.tuning.projectile;
    let Some(e) = world.get(key) else {
        return;
    };
    let (hx, hy) = heading(e.rotation);
    let offset = e.radius + 2.0 * projectile.radius;
    let (x, y) = (e.x + hx * offset, e.y + hy * offset);
    let (vel_x, vel_y) = (e.vel_x + hx * shoot_power, e.vel_y + hy * shoot_power);
    let recoil = shoot_power * projectile.mass / e.mass;

    let shot = world.spawn_projectile(Some(key));
    if let Some(p) = world.get_mut(shot) {
        p.set_position(x, y);
        p.set_velocity(vel_x, vel_y);
    }
    if let Some(e) = world.get_mut(key) {
        e.add_velocity(-hx * recoil, -hy * recoil);
    }
    world.sync_creation(shot);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::KindTag;
    use crate::domain::events::SyncEvent;
    use crate::domain::tuning::Tuning;
    use crate::domain::world::Role;
    use approx::assert_relative_eq;

    fn world_with_craft(role: Role) -> (World, EntityKey) {
        let mut world = World::new(role, Tuning::default(), 9);
        let craft = world.spawn_craft();
        (world, craft)
    }

    fn shots(world: &World) -> usize {
        world
            .iter()
            .filter(|(_, e)| e.tag() == KindTag::Projectile)
            .count()
    }

    #[test]
    fn forward_thrust_follows_the_heading() {
        let (mut world, craft) = world_with_craft(Role::Server);
        world.get_mut(craft).unwrap().rotation = 90.0;

        control(&mut world, craft, Movement::FORWARD);

        let e = world.get(craft).unwrap();
        let dv = world.tuning.craft.accel * world.tuning.physics.delta;
        assert_relative_eq!(e.vel_x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(e.vel_y, dv);
    }

    #[test]
    fn opposing_inputs_favour_forward_and_left() {
        let (mut world, craft) = world_with_craft(Role::Server);
        control(&mut world, craft, Movement::FORWARD | Movement::BACKWARD);
        control(&mut world, craft, Movement::TURN_LEFT | Movement::TURN_RIGHT);

        let e = world.get(craft).unwrap();
        let dt = world.tuning.physics.delta;
        assert_relative_eq!(e.vel_x, world.tuning.craft.accel * dt);
        let c = world.tuning.craft;
        let turned = c.rotate_speed * dt * (1.0 - c.rotate_slow_mult);
        assert_relative_eq!(e.rotate_vel, turned);
    }

    #[test]
    fn turning_is_damped_back_to_rest() {
        let (mut world, craft) = world_with_craft(Role::Server);
        for _ in 0..10 {
            control(&mut world, craft, Movement::TURN_LEFT);
        }
        assert!(world.get(craft).unwrap().rotate_vel > 0.0);
        for _ in 0..200 {
            control(&mut world, craft, Movement::empty());
        }
        assert_eq!(world.get(craft).unwrap().rotate_vel, 0.0);
    }

    #[test]
    fn server_shot_conserves_momentum_and_is_announced() {
        let (mut world, craft) = world_with_craft(Role::Server);
        world.get_mut(craft).unwrap().set_velocity(5.0, 0.0);

        control(&mut world, craft, Movement::PRIMARY_FIRE);

        assert_eq!(shots(&world), 1);
        let (shot_key, shot) = world
            .iter()
            .find(|(_, e)| e.tag() == KindTag::Projectile)
            .unwrap();
        assert_eq!(world.projectile_owner(shot_key), Some(craft));
        let e = world.get(craft).unwrap();
        let gap = shot.x - e.x;
        assert_relative_eq!(gap, e.radius + 2.0 * shot.radius);
        // Zero net momentum change in the craft's original frame.
        let exchanged = e.mass * (e.vel_x - 5.0) + shot.mass * (shot.vel_x - 5.0);
        assert_relative_eq!(exchanged, 0.0, epsilon = 1e-6);
        assert!(
            world
                .drain_outbox()
                .iter()
                .any(|o| matches!(o.event, SyncEvent::Create(_)))
        );
    }

    #[test]
    fn reload_gates_consecutive_shots() {
        let (mut world, craft) = world_with_craft(Role::Server);
        control(&mut world, craft, Movement::PRIMARY_FIRE);
        control(&mut world, craft, Movement::PRIMARY_FIRE);
        assert_eq!(shots(&world), 1);

        let reload_ticks = (world.tuning.craft.reload / world.tuning.physics.delta).ceil() as usize + 1;
        for _ in 0..reload_ticks {
            world.advance_clock();
        }
        control(&mut world, craft, Movement::PRIMARY_FIRE);
        assert_eq!(shots(&world), 2);
    }

    #[test]
    fn plain_client_fire_only_starts_the_cooldown() {
        let (mut world, craft) = world_with_craft(Role::Client);
        control(&mut world, craft, Movement::PRIMARY_FIRE);
        assert_eq!(shots(&world), 0);
        assert_eq!(world.get(craft).unwrap().as_craft().unwrap().last_shot, 0.0);
    }

    #[test]
    fn hyperboost_charge_is_bounded_and_reset_on_release() {
        let (mut world, craft) = world_with_craft(Role::Server);
        let limit = 2.0 * world.tuning.craft.hyperboost_time;
        for _ in 0..2_000 {
            control(&mut world, craft, Movement::HYPERBOOST);
            let charge = world.get(craft).unwrap().as_craft().unwrap().hyperboost_charge;
            assert!((0.0..=limit).contains(&charge));
        }
        let charged = world.get(craft).unwrap().as_craft().unwrap().hyperboost_charge;
        assert_relative_eq!(charged, limit);
        assert!(world.get(craft).unwrap().vel_x > 0.0);

        control(&mut world, craft, Movement::empty());
        let c = world.get(craft).unwrap().as_craft().unwrap();
        assert_eq!(c.hyperboost_charge, 0.0);
        assert!(!c.burning);
    }

    #[test]
    fn afterburn_keeps_burning_until_the_charge_drains() {
        let (mut world, craft) = world_with_craft(Role::Server);
        let tuning = world.tuning.craft;
        while world.get(craft).unwrap().as_craft().unwrap().hyperboost_charge <= tuning.min_afterburn {
            control(&mut world, craft, Movement::HYPERBOOST);
        }
        control(&mut world, craft, Movement::HYPERBOOST | Movement::BOOST);
        assert!(world.get(craft).unwrap().as_craft().unwrap().burning);

        // Released: the burn continues on its own and drains the charge.
        let mut ticks = 0;
        while world.get(craft).unwrap().as_craft().unwrap().burning {
            control(&mut world, craft, Movement::empty());
            ticks += 1;
            assert!(ticks < 1_000);
        }
        let c = world.get(craft).unwrap().as_craft().unwrap();
        assert!(c.hyperboost_charge <= tuning.hyperboost_time);
    }
}
