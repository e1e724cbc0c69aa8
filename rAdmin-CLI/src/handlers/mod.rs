//! Data fetching and display rows shared by the commands.

pub mod chat;
pub mod recharge;
pub mod user;
