//! Business logic services.
//!
//! Services contain logic that is more than a single scoped query: auth
//! flows, the account deletion cascade, dice evaluation and outbound mail.

pub mod account_service;
pub mod auth_service;
pub mod credentials;
pub mod dice;
pub mod mail_service;
