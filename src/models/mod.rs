pub mod attachment;
pub mod auth;
pub mod ax;
pub mod category;
pub mod common;
pub mod coupon;
pub mod pagination;
pub mod permission;
pub mod product;
pub mod role;
pub mod user;

pub use attachment::*;
pub use auth::*;
pub use ax::*;
pub use category::*;
pub use common::*;
pub use coupon::*;
pub use pagination::*;
pub use permission::*;
pub use product::*;
pub use role::*;
pub use user::*;
