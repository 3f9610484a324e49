pub mod attachment;
pub mod auth;
pub mod ax;
pub mod category;
pub mod coupon;
pub mod permission;
pub mod product;
pub mod role;
pub mod user;

pub use attachment::attachment_config;
pub use auth::auth_config;
pub use ax::ax_config;
pub use category::category_config;
pub use coupon::coupon_config;
pub use permission::permission_config;
pub use product::product_config;
pub use role::role_config;
pub use user::user_config;

use actix_web::{HttpResponse, web};
use serde_json::json;

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub fn health_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health));
}
