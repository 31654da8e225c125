// Procedural star-system generation and craft spawn placement.

use std::f64::consts::TAU;

use rand::Rng;
use rand::rngs::StdRng;
use tracing::info;

use crate::domain::entity::{Body, Color, EntityKey};
use crate::domain::world::World;

const STAR_COLOR: Color = Color::new(255, 229, 97);
const BLACKHOLE_COLOR: Color = Color::new(0, 0, 0);
/// Black holes carry marginally more mass than a star so the two stay distinguishable.
const BLACKHOLE_MASS_FACTOR: f64 = 1.0001;

/// What one call to [`generate_system`] added to the world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratedSystem {
    pub stars: usize,
    pub planets: usize,
    pub moons: usize,
}

impl GeneratedSystem {
    /// Planets plus every recursively generated moon.
    pub fn total_planets(&self) -> usize {
        self.planets + self.moons
    }
}

#[derive(Debug, Clone, Copy)]
struct Parent {
    x: f64,
    y: f64,
    vel_x: f64,
    vel_y: f64,
    mass: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Planet,
    Moon,
}

fn uniform(rng: &mut StdRng, lo: f64, hi: f64) -> f64 {
    if hi > lo { rng.random_range(lo..hi) } else { lo }
}

/// Populates the world with one star system: stars on a ring in mutual orbit,
/// then planets in circular orbits around the combined star mass, each with
/// its own moons. Purely additive.
pub fn generate_system(world: &mut World) -> GeneratedSystem {
    let generation = world.tuning.generation;
    let physics = world.tuning.physics;

    let mut star_count = 1usize;
    while world.rng().random::<f64>() < generation.extra_star_chance {
        star_count += 1;
    }

    let ring = (star_count - 1) as f64 * generation.star_radius * 2.0;
    let mut stars: Vec<(EntityKey, f64)> = Vec::with_capacity(star_count);
    for i in 0..star_count {
        let angle = TAU * i as f64 / star_count as f64;
        let blackhole = world.rng().random::<f64>() < generation.blackhole_chance;
        let (radius, mass, color) = if blackhole {
            (
                physics.schwarzschild_radius(generation.star_mass),
                generation.star_mass * BLACKHOLE_MASS_FACTOR,
                BLACKHOLE_COLOR,
            )
        } else {
            (generation.star_radius, generation.star_mass, STAR_COLOR)
        };
        let key = world.spawn_body(Body { star: true, blackhole }, radius, mass);
        if let Some(star) = world.get_mut(key) {
            star.set_position(ring * angle.cos(), ring * angle.sin());
            star.color = color;
        }
        stars.push((key, angle));
    }

    if star_count > 1 {
        // Every star feels the same inward pull by symmetry; orbit at that rate.
        let (ax, ay) = net_acceleration(world, stars[0].0);
        let speed = (ax.hypot(ay) * ring).sqrt();
        for &(key, angle) in &stars {
            if let Some(star) = world.get_mut(key) {
                star.set_velocity(-speed * angle.sin(), speed * angle.cos());
            }
        }
    }

    let star_mass: f64 = stars
        .iter()
        .filter_map(|&(key, _)| world.get(key).map(|e| e.mass))
        .sum();
    let sqrt_stars = (star_count as f64).sqrt();
    let distance = generation.base_planet_distance
        + star_count as f64 * generation.star_radius * 2.0 * uniform(world.rng(), 1.0, 1.5);
    let count = (uniform(
        world.rng(),
        generation.base_min_planets,
        generation.base_max_planets,
    ) * sqrt_stars) as usize;

    let origin = Parent {
        x: 0.0,
        y: 0.0,
        vel_x: 0.0,
        vel_y: 0.0,
        mass: star_mass,
    };
    let mut generated = GeneratedSystem {
        stars: star_count,
        ..GeneratedSystem::default()
    };
    spawn_orbiters(
        world,
        origin,
        count,
        distance,
        (generation.min_planet_radius, generation.max_planet_radius),
        Tier::Planet,
        &mut generated,
    );

    info!(
        stars = generated.stars,
        planets = generated.planets,
        moons = generated.moons,
        "generated system"
    );
    generated
}

fn net_acceleration(world: &World, key: EntityKey) -> (f64, f64) {
    let Some(target) = world.get(key) else {
        return (0.0, 0.0);
    };
    let gravity = world.tuning.physics.gravity;
    world
        .stars()
        .iter()
        .filter(|&&other| other != key)
        .filter_map(|&other| world.get(other))
        .fold((0.0, 0.0), |(ax, ay), star| {
            let dx = star.x - target.x;
            let dy = star.y - target.y;
            let dist2 = dx * dx + dy * dy;
            let k = gravity * star.mass / (dist2 * dist2.sqrt());
            (ax + dx * k, ay + dy * k)
        })
}

/// Places `amount` bodies around `parent` at geometrically increasing
/// distances. Every body recurses to spawn its own moons.
fn spawn_orbiters(
    world: &mut World,
    parent: Parent,
    amount: usize,
    mut distance: f64,
    (min_radius, max_radius): (f64, f64),
    tier: Tier,
    generated: &mut GeneratedSystem,
) {
    let generation = world.tuning.generation;
    let physics = world.tuning.physics;
    // Expected distance of the outermost body, normalising the radius growth.
    let max_factor = ((generation.min_next_radius * generation.max_next_radius)
        .powf(amount as f64 * 0.5)
        * distance)
        .sqrt();

    for _ in 0..amount {
        let rng = world.rng();
        distance *= uniform(rng, generation.min_next_radius, generation.max_next_radius);
        let factor = distance.sqrt() / max_factor;
        let radius = uniform(rng, min_radius, max_radius * factor);
        let density = generation.base_density / radius.cbrt();
        let mass = radius * radius * density;
        let angle = uniform(rng, 0.0, TAU);
        let color = Color::new(
            rng.random_range(64..=255),
            rng.random_range(64..=255),
            rng.random_range(64..=255),
        );

        let speed = physics.orbital_speed(parent.mass, distance);
        let this = Parent {
            x: parent.x + distance * angle.cos(),
            y: parent.y + distance * angle.sin(),
            vel_x: parent.vel_x - speed * angle.sin(),
            vel_y: parent.vel_y + speed * angle.cos(),
            mass,
        };
        let key = world.spawn_body(Body::default(), radius, mass);
        if let Some(body) = world.get_mut(key) {
            body.set_position(this.x, this.y);
            body.set_velocity(this.vel_x, this.vel_y);
            body.color = color;
        }

        match tier {
            Tier::Planet => generated.planets += 1,
            Tier::Moon => generated.moons += 1,
        }

        let rng = world.rng();
        let moons =
            (uniform(rng, 0.0, 1.0) * radius * radius / generation.moon_factor.powi(2)) as usize;
        let spread = generation
            .max_moon_distance
            .powf((0.5 / (radius / generation.max_planet_radius)).min(1.0));
        let moon_distance = radius
            * (1.0
                + uniform(
                    rng,
                    generation.min_moon_distance,
                    generation.min_moon_distance + spread,
                ));
        spawn_orbiters(
            world,
            this,
            moons,
            moon_distance,
            (
                generation.min_moon_radius,
                radius * generation.max_moon_radius_frac,
            ),
            Tier::Moon,
            generated,
        );
    }
}

/// Places a craft in a circular orbit just above a random planet, or around
/// the origin when there are no planets. Resets its motion and charge.
pub fn setup_ship(world: &mut World, craft: EntityKey) {
    let craft_tuning = world.tuning.craft;
    let physics = world.tuning.physics;
    let planet_count = world.planets().len();
    let host = if planet_count == 0 {
        None
    } else {
        let pick = world.rng().random_range(0..planet_count);
        world.planets().get(pick).copied()
    };
    let (px, py, pvx, pvy, pr, pm) = host
        .and_then(|key| world.get(key))
        .map(|p| (p.x, p.y, p.vel_x, p.vel_y, p.radius, p.mass))
        .unwrap_or_default();

    let rng = world.rng();
    let distance = pr + uniform(
        rng,
        craft_tuning.spawn_min_distance,
        craft_tuning.spawn_max_distance,
    );
    let angle = uniform(rng, 0.0, TAU);
    let speed = if pm > 0.0 {
        physics.orbital_speed(pm, distance)
    } else {
        0.0
    };

    if let Some(e) = world.get_mut(craft) {
        e.set_position(px + distance * angle.cos(), py + distance * angle.sin());
        e.set_velocity(pvx - speed * angle.sin(), pvy + speed * angle.cos());
        e.rotate_vel = 0.0;
        if let Some(c) = e.as_craft_mut() {
            c.hyperboost_charge = 0.0;
            c.burning = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tuning::Tuning;
    use crate::domain::world::Role;
    use approx::assert_relative_eq;

    fn generate(seed: u64, tuning: Tuning) -> (World, GeneratedSystem) {
        let mut world = World::new(Role::Server, tuning, seed);
        let generated = generate_system(&mut world);
        (world, generated)
    }

    #[test]
    fn total_planet_count_includes_every_moon() {
        for seed in 0..20 {
            let (world, generated) = generate(seed, Tuning::default());
            assert!(generated.stars >= 1);
            assert_eq!(world.stars().len(), generated.stars);
            assert_eq!(world.planets().len(), generated.total_planets());
            assert_eq!(world.len(), generated.stars + generated.total_planets());
        }
    }

    #[test]
    fn planets_start_on_circular_orbits() {
        let mut tuning = Tuning::default();
        tuning.generation.extra_star_chance = 0.0;
        tuning.generation.blackhole_chance = 0.0;
        tuning.generation.moon_factor = f64::INFINITY;
        tuning.generation.base_min_planets = 4.0;

        for seed in 0..5 {
            let (world, generated) = generate(seed, tuning);
            assert_eq!(generated.moons, 0);
            let g = world.tuning.physics.gravity;
            let star_mass = tuning.generation.star_mass;
            for &key in world.planets() {
                let p = world.get(key).unwrap();
                let distance = p.x.hypot(p.y);
                let speed = p.vel_x.hypot(p.vel_y);
                assert_relative_eq!(speed, (g * star_mass / distance).sqrt(), max_relative = 1e-12);
                let radial = (p.x * p.vel_x + p.y * p.vel_y) / (distance * speed);
                assert_relative_eq!(radial, 0.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn multiple_stars_share_one_orbit() {
        let mut tuning = Tuning::default();
        tuning.generation.extra_star_chance = 0.8;
        let mut multi = 0;
        for seed in 0..10 {
            let (world, generated) = generate(seed, tuning);
            if generated.stars < 2 {
                continue;
            }
            multi += 1;
            let speeds: Vec<f64> = world
                .stars()
                .iter()
                .map(|&k| {
                    let s = world.get(k).unwrap();
                    s.vel_x.hypot(s.vel_y)
                })
                .collect();
            for speed in &speeds {
                assert!(*speed > 0.0);
                assert_relative_eq!(*speed, speeds[0], max_relative = 1e-12);
            }
        }
        assert!(multi > 0);
    }

    #[test]
    fn moons_spawn_moons_of_their_own() {
        let mut tuning = Tuning::default();
        tuning.generation.moon_factor = 100.0;
        let parent = Parent {
            x: 0.0,
            y: 0.0,
            vel_x: 0.0,
            vel_y: 0.0,
            mass: tuning.generation.star_mass,
        };

        let mut nested = false;
        for seed in 0..5 {
            let mut world = World::new(Role::Server, tuning, seed);
            let mut generated = GeneratedSystem::default();
            // One moon of fixed radius; anything beyond it is a moon's moon.
            spawn_orbiters(
                &mut world,
                parent,
                1,
                100_000.0,
                (1_000.0, 0.0),
                Tier::Moon,
                &mut generated,
            );
            assert_eq!(generated.planets, 0);
            assert_eq!(world.planets().len(), generated.moons);
            nested |= generated.moons > 1;
        }
        assert!(nested);
    }

    #[test]
    fn black_holes_use_the_schwarzschild_radius() {
        let mut tuning = Tuning::default();
        tuning.generation.blackhole_chance = 1.0;
        let (world, _) = generate(1, tuning);
        for &key in world.stars() {
            let star = world.get(key).unwrap();
            assert!(star.as_body().unwrap().blackhole);
            assert_relative_eq!(
                star.radius,
                world.tuning.physics.schwarzschild_radius(tuning.generation.star_mass)
            );
            assert_eq!(star.color, BLACKHOLE_COLOR);
        }
    }

    #[test]
    fn spawned_craft_orbits_just_above_a_planet() {
        let (mut world, _) = generate(12, Tuning::default());
        let craft = world.spawn_craft();
        setup_ship(&mut world, craft);

        let c = world.get(craft).unwrap();
        let tuning = world.tuning.craft;
        let host = world
            .planets()
            .iter()
            .filter_map(|&k| world.get(k))
            .find(|p| {
                let d = (c.x - p.x).hypot(c.y - p.y);
                d >= p.radius + tuning.spawn_min_distance && d <= p.radius + tuning.spawn_max_distance
            });
        assert!(host.is_some(), "craft not placed around any planet");
    }
}
