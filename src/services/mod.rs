pub mod attachment_service;
pub mod auth_service;
pub mod ax_service;
pub mod category_service;
pub mod coupon_service;
pub mod permission_service;
pub mod product_service;
pub mod role_service;
pub mod user_service;

pub use attachment_service::*;
pub use auth_service::*;
pub use ax_service::*;
pub use category_service::*;
pub use coupon_service::*;
pub use permission_service::*;
pub use product_service::*;
pub use role_service::*;
pub use user_service::*;
