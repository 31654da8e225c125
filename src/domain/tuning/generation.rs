// Procedural star-system generation parameters.

#[derive(Debug, Clone, Copy)]
pub struct GenerationTuning {
    /// Chance of each additional star, sampled repeatedly.
    pub extra_star_chance: f64,
    pub blackhole_chance: f64,
    pub star_mass: f64,
    pub star_radius: f64,

    /// Distance of the innermost planet band before the first multiplier.
    pub base_planet_distance: f64,
    /// Planet count range for a single star; scaled by sqrt(star count).
    pub base_min_planets: f64,
    pub base_max_planets: f64,
    pub min_planet_radius: f64,
    pub max_planet_radius: f64,

    /// Each orbit distance multiplies the previous by a factor in this range.
    pub min_next_radius: f64,
    pub max_next_radius: f64,

    /// Mass = radius^2 * base_density / radius^(1/3).
    pub base_density: f64,

    /// Larger values mean fewer moons per planet radius.
    pub moon_factor: f64,
    pub min_moon_radius: f64,
    /// Upper bound of a moon's radius as a fraction of its parent's.
    pub max_moon_radius_frac: f64,
    pub min_moon_distance: f64,
    pub max_moon_distance: f64,
}

impl Default for GenerationTuning {
    fn default() -> Self {
        Self {
            extra_star_chance: 0.25,
            blackhole_chance: 0.1,
            star_mass: 5.0e9,
            star_radius: 2_000.0,
            base_planet_distance: 120_000.0,
            base_min_planets: 2.0,
            base_max_planets: 8.0,
            min_planet_radius: 200.0,
            max_planet_radius: 1_500.0,
            min_next_radius: 1.3,
            max_next_radius: 2.0,
            base_density: 100.0,
            moon_factor: 600.0,
            min_moon_radius: 30.0,
            max_moon_radius_frac: 0.3,
            min_moon_distance: 4.0,
            max_moon_distance: 20.0,
        }
    }
}
