// Use-case level inputs/outputs for the world loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::domain::{Movement, PlayerId, SyncEvent, Tuning};

/// Events flowing from connections into the world task.
#[derive(Debug, Clone)]
pub enum GameEvent {
    Join {
        player_id: PlayerId,
        username: Option<String>,
        address: Option<SocketAddr>,
        // Per-player queue of sync events; a full or closed queue disconnects the player.
        outbound: mpsc::Sender<Arc<SyncEvent>>,
    },
    Leave {
        player_id: PlayerId,
    },
    Input {
        player_id: PlayerId,
        movement: Movement,
    },
    Chat {
        player_id: PlayerId,
        text: String,
    },
}

/// Startup parameters of the world task.
#[derive(Debug, Clone, Copy)]
pub struct WorldSettings {
    pub tuning: Tuning,
    pub seed: u64,
    /// Interval between periodic position updates; coarser than the physics tick.
    pub sync_spacing: Duration,
}

impl WorldSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(self.tuning.physics.delta)
    }

    /// Physics ticks between two sync broadcasts, at least one.
    pub fn ticks_per_sync(&self) -> u64 {
        let ratio = self.sync_spacing.as_secs_f64() / self.tuning.physics.delta;
        (ratio.round() as u64).max(1)
    }
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            tuning: Tuning::default(),
            seed: 0,
            sync_spacing: Duration::from_millis(50),
        }
    }
}
