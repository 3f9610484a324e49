pub mod attachments;
pub mod axs;
pub mod categories;
pub mod coupons;
pub mod permissions;
pub mod product_categories;
pub mod products;
pub mod role_permissions;
pub mod roles;
pub mod user_roles;
pub mod users;

pub use attachments as attachment_entity;
pub use axs as ax_entity;
pub use categories as category_entity;
pub use coupons as coupon_entity;
pub use permissions as permission_entity;
pub use product_categories as product_category_entity;
pub use products as product_entity;
pub use role_permissions as role_permission_entity;
pub use roles as role_entity;
pub use user_roles as user_role_entity;
pub use users as user_entity;
