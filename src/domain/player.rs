// Session wrapper binding a connection to its controlled craft.

use std::net::SocketAddr;

use super::entity::EntityKey;
use super::movement::Movement;

pub type PlayerId = u64;

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub craft: EntityKey,
    pub username: Option<String>,
    pub address: Option<SocketAddr>,
    pub kills: u32,
    pub controls: Movement,
}

impl Player {
    pub fn new(
        id: PlayerId,
        craft: EntityKey,
        username: Option<String>,
        address: Option<SocketAddr>,
    ) -> Self {
        Self {
            id,
            craft,
            username: username.filter(|name| !name.is_empty()),
            address,
            kills: 0,
            controls: Movement::empty(),
        }
    }

    /// Display name: the explicit username, else the connection address.
    pub fn name(&self) -> String {
        if let Some(username) = &self.username {
            return username.clone();
        }
        match self.address {
            Some(addr) if addr.port() != 0 => addr.to_string(),
            Some(addr) => addr.ip().to_string(),
            None => format!("player-{}", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn key() -> EntityKey {
        EntityKey::from(KeyData::from_ffi(1))
    }

    #[test]
    fn name_prefers_username_then_address() {
        let addr: SocketAddr = "10.0.0.5:4410".parse().unwrap();
        let named = Player::new(1, key(), Some("ace".into()), Some(addr));
        assert_eq!(named.name(), "ace");

        let anonymous = Player::new(2, key(), Some(String::new()), Some(addr));
        assert_eq!(anonymous.name(), "10.0.0.5:4410");

        let portless = Player::new(3, key(), None, Some("10.0.0.5:0".parse().unwrap()));
        assert_eq!(portless.name(), "10.0.0.5");
    }
}
