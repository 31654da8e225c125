// Constants shared by integration, collision and gravity.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GravityMode {
    /// Exact pairwise summation.
    Direct,
    /// Quadtree approximation of body pulls with opening angle `theta`.
    BarnesHut { theta: f64 },
}

#[derive(Debug, Clone, Copy)]
pub struct PhysicsTuning {
    /// Gravitational constant.
    pub gravity: f64,

    /// Fixed timestep in seconds. Never follows wall-clock jitter.
    pub delta: f64,

    /// Seconds between broad-phase neighbour refreshes.
    pub collide_scan_spacing: f64,

    /// Squared closing-time threshold (s^2) for keeping a broad-phase candidate.
    pub collide_scan_distance2: f64,

    /// Lower clamp on the squared relative speed in the broad-phase heuristic.
    pub min_closing_speed2: f64,

    /// Fraction of the approach velocity removed along the contact normal.
    pub collide_restitution: f64,

    /// Tangential velocity damping per second of contact.
    pub friction: f64,

    /// Squared speed of light, for Schwarzschild radii.
    pub light_speed2: f64,

    pub gravity_mode: GravityMode,
}

impl PhysicsTuning {
    /// Radius of a black hole with the given mass: 2GM / c^2.
    pub fn schwarzschild_radius(&self, mass: f64) -> f64 {
        2.0 * self.gravity * mass / self.light_speed2
    }

    /// Speed of a circular orbit at `distance` around `parent_mass`.
    pub fn orbital_speed(&self, parent_mass: f64, distance: f64) -> f64 {
        (self.gravity * parent_mass / distance).sqrt()
    }
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            gravity: 50.0,
            delta: 1.0 / 60.0,
            collide_scan_spacing: 0.5,
            collide_scan_distance2: 4.0,
            min_closing_speed2: 0.5,
            collide_restitution: 0.7,
            friction: 4.0,
            light_speed2: 50_000.0 * 50_000.0,
            gravity_mode: GravityMode::Direct,
        }
    }
}
