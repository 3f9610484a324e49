pub mod auth_user;
pub mod permission;

pub use auth_user::*;
pub use permission::*;
