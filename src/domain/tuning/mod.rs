// Gameplay tuning, kept separate from runtime/server configuration.

pub mod craft;
pub mod generation;
pub mod physics;

pub use craft::{CraftTuning, ProjectileTuning};
pub use generation::GenerationTuning;
pub use physics::{GravityMode, PhysicsTuning};

/// Every gameplay table a world needs, bundled so it can be passed around whole.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tuning {
    pub physics: PhysicsTuning,
    pub craft: CraftTuning,
    pub projectile: ProjectileTuning,
    pub generation: GenerationTuning,
}
