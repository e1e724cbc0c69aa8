//! CLI command definitions.

pub mod chat;
pub mod recharge;
pub mod user;
