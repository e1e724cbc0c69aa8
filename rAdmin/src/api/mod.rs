//! API modules.

mod auth;
mod chat;
mod recharge;
mod user;

pub use auth::{AuthApi, LoginResult};
pub use chat::ChatApi;
pub use recharge::RechargeApi;
pub use user::{
    ProfileUpdateBuilder, UserApi, UserFilters, UserListBuilder, UserListResult, DEFAULT_PAGE_SIZE,
};
