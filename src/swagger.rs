use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::signup,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::me,
        handlers::auth::logout,
        handlers::user::get_users,
        handlers::user::get_user,
        handlers::user::create_user,
        handlers::user::update_user,
        handlers::user::delete_user,
        handlers::role::get_roles,
        handlers::role::get_role,
        handlers::role::create_role,
        handlers::role::update_role,
        handlers::role::delete_role,
        handlers::permission::get_permissions,
        handlers::permission::get_permission,
        handlers::permission::create_permission,
        handlers::permission::update_permission,
        handlers::permission::delete_permission,
        handlers::coupon::get_coupons,
        handlers::coupon::get_coupon,
        handlers::coupon::get_coupon_by_code,
        handlers::coupon::create_coupon,
        handlers::coupon::update_coupon,
        handlers::coupon::delete_coupon,
        handlers::coupon::redeem_coupon,
        handlers::product::get_products,
        handlers::product::get_product,
        handlers::product::create_product,
        handlers::product::update_product,
        handlers::product::delete_product,
        handlers::category::get_categories,
        handlers::category::get_category_tree,
        handlers::category::get_category,
        handlers::category::get_category_by_slug,
        handlers::category::create_category,
        handlers::category::update_category,
        handlers::category::delete_category,
        handlers::attachment::get_attachments,
        handlers::attachment::get_attachment,
        handlers::attachment::create_attachment,
        handlers::attachment::update_attachment,
        handlers::attachment::delete_attachment,
        handlers::attachment::bind_attachments,
        handlers::ax::get_axs,
        handlers::ax::get_ax,
        handlers::ax::get_ax_by_slug,
        handlers::ax::create_ax,
        handlers::ax::update_ax,
        handlers::ax::delete_ax,
    ),
    components(
        schemas(
            ApiError,
            LoginRequest,
            SignupRequest,
            AuthResponse,
            CurrentUserResponse,
            UserResponse,
            UsersQuery,
            CreateUserRequest,
            UpdateUserRequest,
            RoleBrief,
            RoleResponse,
            RolesQuery,
            CreateRoleRequest,
            UpdateRoleRequest,
            PermissionResponse,
            PermissionsQuery,
            CreatePermissionRequest,
            UpdatePermissionRequest,
            CouponResponse,
            CouponsQuery,
            CreateCouponRequest,
            UpdateCouponRequest,
            RedeemCouponRequest,
            ProductResponse,
            ProductsQuery,
            CreateProductRequest,
            UpdateProductRequest,
            CategoryResponse,
            CategoryTreeNode,
            CategoriesQuery,
            CategoryTreeQuery,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            AttachmentResponse,
            AttachmentsQuery,
            CreateAttachmentRequest,
            UpdateAttachmentRequest,
            BindAttachmentsRequest,
            AxResponse,
            AxsQuery,
            CreateAxRequest,
            UpdateAxRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Signup, login and tokens"),
        (name = "user", description = "User management"),
        (name = "role", description = "Roles and their permissions"),
        (name = "permission", description = "Permission catalogue"),
        (name = "coupon", description = "Coupons and redemption"),
        (name = "product", description = "Product catalogue"),
        (name = "category", description = "Category tree"),
        (name = "attachment", description = "Uploaded file metadata"),
        (name = "ax", description = "Ad slots"),
    ),
    info(
        title = "Leaa Backend API",
        version = "1.0.0",
        description = "Leaa e-commerce back office REST API"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_area() {
        let doc = ApiDoc::openapi();
        for path in [
            "/auth/login",
            "/users/{id}",
            "/roles",
            "/permissions/{id}",
            "/coupons/redeem",
            "/products",
            "/categories/tree",
            "/attachments/bind",
            "/axs/slug/{slug}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
