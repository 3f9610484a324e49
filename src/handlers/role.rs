use crate::authorization::{Permission, require};
use crate::middlewares::current_user;
use crate::models::*;
use crate::services::RoleService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/roles",
    tag = "role",
    params(
        ("page" = Option<u64>, Query, description = "Page number, from 1"),
        ("page_size" = Option<u64>, Query, description = "Items per page"),
        ("q" = Option<String>, Query, description = "Matches name or slug")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Paginated roles with their permissions")
    )
)]
pub async fn get_roles(
    role_service: web::Data<RoleService>,
    req: HttpRequest,
    query: web::Query<RolesQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::RoleListRead) {
        return Ok(e.error_response());
    }

    match role_service.roles(&query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/roles/{id}",
    tag = "role",
    params(("id" = i32, Path, description = "Role id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "The role", body = RoleResponse),
        (status = 404, description = "Role not found")
    )
)]
pub async fn get_role(
    role_service: web::Data<RoleService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::RoleItemRead) {
        return Ok(e.error_response());
    }

    match role_service.role(path.into_inner()).await {
        Ok(role) => Ok(HttpResponse::Ok().json(ApiResponse::success(role))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/roles",
    tag = "role",
    request_body = CreateRoleRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Created", body = RoleResponse),
        (status = 400, description = "Invalid slug or unknown permission")
    )
)]
pub async fn create_role(
    role_service: web::Data<RoleService>,
    req: HttpRequest,
    request: web::Json<CreateRoleRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::RoleItemCreate) {
        return Ok(e.error_response());
    }

    match role_service.create_role(request.into_inner()).await {
        Ok(role) => Ok(HttpResponse::Ok().json(ApiResponse::success(role))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/roles/{id}",
    tag = "role",
    params(("id" = i32, Path, description = "Role id")),
    request_body = UpdateRoleRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Updated", body = RoleResponse)
    )
)]
pub async fn update_role(
    role_service: web::Data<RoleService>,
    req: HttpRequest,
    path: web::Path<i32>,
    request: web::Json<UpdateRoleRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::RoleItemUpdate) {
        return Ok(e.error_response());
    }

    match role_service
        .update_role(path.into_inner(), request.into_inner())
        .await
    {
        Ok(role) => Ok(HttpResponse::Ok().json(ApiResponse::success(role))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/roles/{id}",
    tag = "role",
    params(("id" = i32, Path, description = "Role id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Deleted", body = RoleBrief)
    )
)]
pub async fn delete_role(
    role_service: web::Data<RoleService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::RoleItemDelete) {
        return Ok(e.error_response());
    }

    match role_service.delete_role(path.into_inner()).await {
        Ok(role) => Ok(HttpResponse::Ok().json(ApiResponse::success(role))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn role_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/roles")
            .route("", web::get().to(get_roles))
            .route("", web::post().to(create_role))
            .route("/{id}", web::get().to(get_role))
            .route("/{id}", web::put().to(update_role))
            .route("/{id}", web::delete().to(delete_role)),
    );
}
