// Use cases layer: application workflows for the orbit server and its clients.

pub mod client;
pub mod game;
pub mod types;

pub use client::{ClientSession, ClientSettings};
pub use types::{GameEvent, WorldSettings};
