use crate::domain::WorldSummary;
use crate::use_cases::GameEvent;
use tokio::sync::{mpsc, watch};

#[derive(Clone)]
pub struct AppState {
    // Joins, inputs, chat and leaves flowing from connections into the world task.
    pub input_tx: mpsc::Sender<GameEvent>,
    // Latest world counts published by the world task once per tick.
    pub summary_rx: watch::Receiver<WorldSummary>,
    // Per-player sync queue depth; a player that falls this far behind is dropped.
    pub outbound_capacity: usize,
}
