// Wire protocol DTOs and conversions for the public orbit server socket.

use crate::domain::{EntityPayload, Movement, SyncEntry, SyncEvent};
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Assigned identity and controlled craft after Join is accepted.
    Identity { player_id: u64, entity_id: u64 },
    Create(CreateDto),
    Delete { id: u64 },
    // Periodic authoritative positions for every live entity.
    Sync(Vec<SyncEntryDto>),
    PlanetCollision { id: u64, mass: f64, radius: f64 },
    Notice { text: String },
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Initial handshake; nothing else is accepted before it.
    Join(JoinPayload),
    // Full control snapshot, sent whenever it changes.
    Input(MovementDto),
    Chat { text: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JoinPayload {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementDto {
    #[serde(default)]
    pub forward: bool,
    #[serde(default)]
    pub backward: bool,
    #[serde(default)]
    pub turn_left: bool,
    #[serde(default)]
    pub turn_right: bool,
    #[serde(default)]
    pub boost: bool,
    #[serde(default)]
    pub hyperboost: bool,
    #[serde(default)]
    pub fire: bool,
}

impl From<MovementDto> for Movement {
    fn from(dto: MovementDto) -> Self {
        let mut movement = Movement::empty();
        movement.set(Movement::FORWARD, dto.forward);
        movement.set(Movement::BACKWARD, dto.backward);
        movement.set(Movement::TURN_LEFT, dto.turn_left);
        movement.set(Movement::TURN_RIGHT, dto.turn_right);
        movement.set(Movement::BOOST, dto.boost);
        movement.set(Movement::HYPERBOOST, dto.hyperboost);
        movement.set(Movement::PRIMARY_FIRE, dto.fire);
        movement
    }
}

impl From<Movement> for MovementDto {
    fn from(movement: Movement) -> Self {
        Self {
            forward: movement.forward(),
            backward: movement.backward(),
            turn_left: movement.turn_left(),
            turn_right: movement.turn_right(),
            boost: movement.boost(),
            hyperboost: movement.hyperboost(),
            fire: movement.primary_fire(),
        }
    }
}

/// Per-variant creation payload. The `kind` tag is emitted first and the
/// remaining fields keep their declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum CreateDto {
    Craft {
        id: u64,
        x: f64,
        y: f64,
        vel_x: f64,
        vel_y: f64,
        rotation: f64,
    },
    Body {
        radius: f64,
        id: u64,
        x: f64,
        y: f64,
        vel_x: f64,
        vel_y: f64,
        mass: f64,
        is_star: bool,
        is_blackhole: bool,
        color_r: u8,
        color_g: u8,
        color_b: u8,
    },
    Projectile {
        id: u64,
        x: f64,
        y: f64,
        vel_x: f64,
        vel_y: f64,
    },
}

impl From<&EntityPayload> for CreateDto {
    fn from(payload: &EntityPayload) -> Self {
        match *payload {
            EntityPayload::Craft {
                id,
                x,
                y,
                vel_x,
                vel_y,
                rotation,
            } => CreateDto::Craft {
                id,
                x,
                y,
                vel_x,
                vel_y,
                rotation,
            },
            EntityPayload::Body {
                radius,
                id,
                x,
                y,
                vel_x,
                vel_y,
                mass,
                is_star,
                is_blackhole,
                color_r,
                color_g,
                color_b,
            } => CreateDto::Body {
                radius,
                id,
                x,
                y,
                vel_x,
                vel_y,
                mass,
                is_star,
                is_blackhole,
                color_r,
                color_g,
                color_b,
            },
            EntityPayload::Projectile {
                id,
                x,
                y,
                vel_x,
                vel_y,
            } => CreateDto::Projectile {
                id,
                x,
                y,
                vel_x,
                vel_y,
            },
        }
    }
}

impl From<CreateDto> for EntityPayload {
    fn from(dto: CreateDto) -> Self {
        match dto {
            CreateDto::Craft {
                id,
                x,
                y,
                vel_x,
                vel_y,
                rotation,
            } => EntityPayload::Craft {
                id,
                x,
                y,
                vel_x,
                vel_y,
                rotation,
            },
            CreateDto::Body {
                radius,
                id,
                x,
                y,
                vel_x,
                vel_y,
                mass,
                is_star,
                is_blackhole,
                color_r,
                color_g,
                color_b,
            } => EntityPayload::Body {
                radius,
                id,
                x,
                y,
                vel_x,
                vel_y,
                mass,
                is_star,
                is_blackhole,
                color_r,
                color_g,
                color_b,
            },
            CreateDto::Projectile {
                id,
                x,
                y,
                vel_x,
                vel_y,
            } => EntityPayload::Projectile {
                id,
                x,
                y,
                vel_x,
                vel_y,
            },
        }
    }
}

/// Compact sync record; only craft carry a rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEntryDto {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub vel_x: f64,
    pub vel_y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

impl From<&SyncEntry> for SyncEntryDto {
    fn from(entry: &SyncEntry) -> Self {
        match *entry {
            SyncEntry::Craft {
                id,
                x,
                y,
                vel_x,
                vel_y,
                rotation,
            } => Self {
                id,
                x,
                y,
                vel_x,
                vel_y,
                rotation: Some(rotation),
            },
            SyncEntry::Motion {
                id,
                x,
                y,
                vel_x,
                vel_y,
            } => Self {
                id,
                x,
                y,
                vel_x,
                vel_y,
                rotation: None,
            },
        }
    }
}

impl From<SyncEntryDto> for SyncEntry {
    fn from(dto: SyncEntryDto) -> Self {
        let SyncEntryDto {
            id,
            x,
            y,
            vel_x,
            vel_y,
            rotation,
        } = dto;
        match rotation {
            Some(rotation) => SyncEntry::Craft {
                id,
                x,
                y,
                vel_x,
                vel_y,
                rotation,
            },
            None => SyncEntry::Motion {
                id,
                x,
                y,
                vel_x,
                vel_y,
            },
        }
    }
}

impl From<&SyncEvent> for ServerMessage {
    fn from(event: &SyncEvent) -> Self {
        match event {
            SyncEvent::Identity {
                player_id,
                entity_id,
            } => ServerMessage::Identity {
                player_id: *player_id,
                entity_id: *entity_id,
            },
            SyncEvent::Create(payload) => ServerMessage::Create(payload.into()),
            SyncEvent::Delete { id } => ServerMessage::Delete { id: *id },
            SyncEvent::Sync(entries) => {
                ServerMessage::Sync(entries.iter().map(SyncEntryDto::from).collect())
            }
            SyncEvent::PlanetCollision { id, mass, radius } => ServerMessage::PlanetCollision {
                id: *id,
                mass: *mass,
                radius: *radius,
            },
            SyncEvent::Notice { text } => ServerMessage::Notice { text: text.clone() },
        }
    }
}

// Lets a client feed decoded server messages straight into its session.
impl From<ServerMessage> for SyncEvent {
    fn from(msg: ServerMessage) -> Self {
        match msg {
            ServerMessage::Identity {
                player_id,
                entity_id,
            } => SyncEvent::Identity {
                player_id,
                entity_id,
            },
            ServerMessage::Create(dto) => SyncEvent::Create(dto.into()),
            ServerMessage::Delete { id } => SyncEvent::Delete { id },
            ServerMessage::Sync(entries) => {
                SyncEvent::Sync(entries.into_iter().map(SyncEntry::from).collect())
            }
            ServerMessage::PlanetCollision { id, mass, radius } => {
                SyncEvent::PlanetCollision { id, mass, radius }
            }
            ServerMessage::Notice { text } => SyncEvent::Notice { text },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_create_keeps_wire_field_order() {
        let event = SyncEvent::Create(EntityPayload::Body {
            radius: 12.5,
            id: 4,
            x: 1.0,
            y: 2.0,
            vel_x: 3.0,
            vel_y: 4.0,
            mass: 900.0,
            is_star: false,
            is_blackhole: false,
            color_r: 10,
            color_g: 20,
            color_b: 30,
        });
        let txt = serde_json::to_string(&ServerMessage::from(&event)).unwrap();
        assert_eq!(
            txt,
            concat!(
                r#"{"type":"Create","data":{"kind":"Body","radius":12.5,"id":4,"#,
                r#""x":1.0,"y":2.0,"vel_x":3.0,"vel_y":4.0,"mass":900.0,"#,
                r#""is_star":false,"is_blackhole":false,"color_r":10,"color_g":20,"color_b":30}}"#
            )
        );
    }

    #[test]
    fn only_craft_sync_entries_carry_rotation() {
        let event = SyncEvent::Sync(vec![
            SyncEntry::Craft {
                id: 1,
                x: 0.0,
                y: 0.0,
                vel_x: 0.0,
                vel_y: 0.0,
                rotation: 90.0,
            },
            SyncEntry::Motion {
                id: 2,
                x: 5.0,
                y: 0.0,
                vel_x: 0.0,
                vel_y: 1.0,
            },
        ]);
        let msg = ServerMessage::from(&event);
        let value = serde_json::to_value(&msg).unwrap();
        let entries = value["data"].as_array().unwrap();
        assert_eq!(entries[0]["rotation"], 90.0);
        assert!(entries[1].get("rotation").is_none());

        let decoded: ServerMessage = serde_json::from_value(value).unwrap();
        assert_eq!(SyncEvent::from(decoded), event);
    }

    #[test]
    fn client_messages_parse_with_defaults() {
        let join: ClientMessage =
            serde_json::from_str(r#"{"type":"Join","data":{}}"#).unwrap();
        assert!(matches!(join, ClientMessage::Join(JoinPayload { username: None })));

        let input: ClientMessage =
            serde_json::from_str(r#"{"type":"Input","data":{"forward":true,"fire":true}}"#)
                .unwrap();
        let ClientMessage::Input(dto) = input else {
            panic!("expected input");
        };
        assert_eq!(
            Movement::from(dto),
            Movement::FORWARD | Movement::PRIMARY_FIRE
        );

        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"Warp"}"#).is_err());
    }
}
