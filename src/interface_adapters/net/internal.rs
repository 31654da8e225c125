use crate::domain::WorldSummary;
use crate::interface_adapters::state::AppState;

use axum::{
    extract::{Json, State},
    response::IntoResponse,
};
use std::sync::Arc;

#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SystemStatusResponse {
    pub stars: usize,
    pub planets: usize,
    pub players: usize,
    pub entities: usize,
    // Simulated seconds since the system was generated.
    pub time: f64,
}

impl From<WorldSummary> for SystemStatusResponse {
    fn from(summary: WorldSummary) -> Self {
        Self {
            stars: summary.stars,
            planets: summary.planets,
            players: summary.players,
            entities: summary.entities,
            time: summary.time,
        }
    }
}

pub async fn system_status_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    // Copy out of the watch slot; never hold the borrow across anything else.
    let summary = *state.summary_rx.borrow();
    Json(SystemStatusResponse::from(summary))
}
