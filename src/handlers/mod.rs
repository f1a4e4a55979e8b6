//! HTTP route handlers.
//!
//! Handlers extract the request (path, query, JSON body, `AuthContext`),
//! run scoped queries or call into `services`, and map the outcome to a
//! status code and JSON body. Campaign-scoped handlers verify ownership of
//! the campaign before touching its children.

pub mod account;
pub mod auth;
pub mod campaigns;
pub mod characters;
pub mod dice;
pub mod health;
pub mod map_pins;
pub mod npcs;
pub mod session_logs;
