use std::{env, time::Duration};

use crate::domain::Tuning;
use crate::domain::tuning::GravityMode;
use crate::use_cases::WorldSettings;

// Runtime/server constants (not gameplay tuning).

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
// Deep enough for the full-state burst a joining player receives.
pub const OUTBOUND_CHANNEL_CAPACITY: usize = 1024;

const DEFAULT_BARNES_HUT_THETA: f64 = 0.5;

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable environment value");
            None
        }
    }
}

pub fn http_port() -> u16 {
    parse_env("ORBIT_SERVER_PORT").unwrap_or(3001)
}

/// Seed for system generation and respawn placement; random unless pinned.
pub fn world_seed() -> u64 {
    parse_env("WORLD_SEED").unwrap_or_else(rand::random)
}

pub fn sync_spacing() -> Duration {
    Duration::from_millis(parse_env("SYNC_SPACING_MS").unwrap_or(50))
}

pub fn gravity_mode() -> GravityMode {
    match env::var("GRAVITY_MODE").as_deref().map(str::trim) {
        Ok("barnes-hut") => GravityMode::BarnesHut {
            theta: parse_env("BARNES_HUT_THETA").unwrap_or(DEFAULT_BARNES_HUT_THETA),
        },
        Ok("direct") | Err(_) => GravityMode::Direct,
        Ok(other) => {
            tracing::warn!(value = other, "unknown GRAVITY_MODE; using direct summation");
            GravityMode::Direct
        }
    }
}

/// Gameplay tuning with the startup overrides applied.
pub fn tuning() -> Tuning {
    let mut tuning = Tuning::default();
    if let Some(gravity) = parse_env("GRAVITY_CONSTANT") {
        tuning.physics.gravity = gravity;
    }
    if let Some(restitution) = parse_env("COLLIDE_RESTITUTION") {
        tuning.physics.collide_restitution = restitution;
    }
    tuning.physics.gravity_mode = gravity_mode();
    tuning
}

pub fn world_settings() -> WorldSettings {
    WorldSettings {
        tuning: tuning(),
        seed: world_seed(),
        sync_spacing: sync_spacing(),
    }
}
