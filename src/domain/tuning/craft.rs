use crate::domain::entity::Color;

/// Gameplay tuning for player-controlled craft.
#[derive(Debug, Clone, Copy)]
pub struct CraftTuning {
    pub mass: f64,
    pub radius: f64,

    /// Thrust acceleration in units/s^2.
    pub accel: f64,

    /// Angular acceleration in degrees/s^2.
    pub rotate_speed: f64,

    /// Multiplier on `rotate_speed` used to bleed off angular velocity.
    pub rotate_slow_mult: f64,

    /// Instant velocity change of a boost.
    pub boost_strength: f64,
    pub boost_cooldown: f64,

    /// Seconds between primary-fire shots.
    pub reload: f64,

    /// Muzzle speed added to the craft velocity.
    pub shoot_power: f64,

    /// Charge (seconds) needed before hyperboost thrust kicks in.
    pub hyperboost_time: f64,
    pub hyperboost_strength: f64,
    pub hyperboost_rotate_speed: f64,

    /// Minimum charge for boost to ignite the afterburn.
    pub min_afterburn: f64,
    pub afterburn_strength: f64,

    /// Spawn distance band above the host planet's surface.
    pub spawn_min_distance: f64,
    pub spawn_max_distance: f64,
}

impl Default for CraftTuning {
    fn default() -> Self {
        Self {
            mass: 20_000.0,
            radius: 16.0,
            accel: 100.0,
            rotate_speed: 200.0,
            rotate_slow_mult: 0.5,
            boost_strength: 100.0,
            boost_cooldown: 12.0,
            reload: 0.5,
            shoot_power: 600.0,
            hyperboost_time: 3.0,
            hyperboost_strength: 1_000.0,
            hyperboost_rotate_speed: 40.0,
            min_afterburn: 4.5,
            afterburn_strength: 3_000.0,
            spawn_min_distance: 2_000.0,
            spawn_max_distance: 6_000.0,
        }
    }
}

/// Gameplay tuning for projectiles.
#[derive(Debug, Clone, Copy)]
pub struct ProjectileTuning {
    pub mass: f64,
    pub radius: f64,
    pub color: Color,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            mass: 2_000.0,
            radius: 6.0,
            color: Color::new(180, 0, 0),
        }
    }
}
