//! Data models representing database entities and API payloads.

pub mod campaign;
pub mod character;
pub mod dice_roll;
pub mod map_pin;
pub mod npc;
pub mod session_log;
pub mod user;
