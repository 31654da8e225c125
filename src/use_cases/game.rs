use super::types::{GameEvent, WorldSettings};
use crate::domain::systems::{generation, physics};
use crate::domain::{Outbound, PlayerId, Recipient, Role, SyncEvent, World, WorldSummary};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Notify, mpsc, watch};
use tracing::{debug, info, warn};

type Outboxes = HashMap<PlayerId, mpsc::Sender<Arc<SyncEvent>>>;

/// Builds the authoritative world and populates it with one star system.
pub fn create_world(settings: &WorldSettings) -> World {
    let mut world = World::new(Role::Server, settings.tuning, settings.seed);
    generation::generate_system(&mut world);
    // Nobody is connected yet; joiners receive the full state on arrival.
    world.drain_outbox();
    world
}

pub async fn world_task(
    mut input_rx: mpsc::Receiver<GameEvent>,
    settings: WorldSettings,
    summary_tx: watch::Sender<WorldSummary>,
    shutdown: Arc<Notify>,
) {
    let mut world = create_world(&settings);
    let mut outboxes: Outboxes = HashMap::new();
    let ticks_per_sync = settings.ticks_per_sync();
    let mut tick: u64 = 0;
    let _ = summary_tx.send(world.summary());

    // Drive the fixed-step simulation at the physics rate.
    let mut interval = tokio::time::interval(settings.tick_interval());

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                info!(tick, "world task shutting down");
                break;
            }
            _ = interval.tick() => {}
        }

        while let Ok(ev) = input_rx.try_recv() {
            handle_event(&mut world, &mut outboxes, ev);
        }

        let controls = physics::player_controls(&world);
        physics::step(&mut world, &controls);
        tick += 1;
        if tick % ticks_per_sync == 0 {
            world.emit_sync();
        }

        deliver(&mut world, &mut outboxes);
        let _ = summary_tx.send(world.summary());
    }
}

pub fn handle_event(world: &mut World, outboxes: &mut Outboxes, ev: GameEvent) {
    match ev {
        GameEvent::Join {
            player_id,
            username,
            address,
            outbound,
        } => {
            if outboxes.contains_key(&player_id) {
                warn!(player_id, "duplicate join ignored");
                return;
            }
            outboxes.insert(player_id, outbound);
            world.add_player(player_id, username, address);
        }
        GameEvent::Leave { player_id } => {
            outboxes.remove(&player_id);
            if world.remove_player(player_id).is_some() {
                info!(player_id, "player left");
            }
        }
        GameEvent::Input {
            player_id,
            movement,
        } => {
            if let Some(player) = world.player_mut(player_id) {
                player.controls = movement;
            }
        }
        GameEvent::Chat { player_id, text } => {
            let Some(name) = world.player(player_id).map(|p| p.name()) else {
                return;
            };
            world.relay_notice(format!("<{name}> {text}"));
        }
    }
}

/// Routes every queued sync event to its recipients. A player whose queue is
/// closed or full is treated as disconnected.
pub fn deliver(world: &mut World, outboxes: &mut Outboxes) {
    let mut dropped: Vec<PlayerId> = Vec::new();
    for Outbound { to, event } in world.drain_outbox() {
        let event = Arc::new(event);
        match to {
            Recipient::All => {
                for (player_id, tx) in outboxes.iter() {
                    if tx.try_send(event.clone()).is_err() {
                        dropped.push(*player_id);
                    }
                }
            }
            Recipient::Player(player_id) => {
                if let Some(tx) = outboxes.get(&player_id) {
                    if tx.try_send(event).is_err() {
                        dropped.push(player_id);
                    }
                }
            }
        }
    }

    dropped.sort_unstable();
    dropped.dedup();
    for player_id in dropped {
        warn!(player_id, "outbound queue closed or full; disconnecting player");
        outboxes.remove(&player_id);
        if world.remove_player(player_id).is_none() {
            debug!(player_id, "player already removed");
        }
    }
}
