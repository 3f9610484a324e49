use crate::authorization::{Permission, require};
use crate::middlewares::current_user;
use crate::models::*;
use crate::services::PermissionService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/permissions",
    tag = "permission",
    params(
        ("page" = Option<u64>, Query, description = "Page number, from 1"),
        ("page_size" = Option<u64>, Query, description = "Items per page"),
        ("q" = Option<String>, Query, description = "Matches name or slug")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Paginated permissions")
    )
)]
pub async fn get_permissions(
    permission_service: web::Data<PermissionService>,
    req: HttpRequest,
    query: web::Query<PermissionsQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::PermissionListRead) {
        return Ok(e.error_response());
    }

    match permission_service.permissions(&query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/permissions/{id}",
    tag = "permission",
    params(("id" = i32, Path, description = "Permission id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "The permission", body = PermissionResponse),
        (status = 404, description = "Permission not found")
    )
)]
pub async fn get_permission(
    permission_service: web::Data<PermissionService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::PermissionItemRead) {
        return Ok(e.error_response());
    }

    match permission_service.permission(path.into_inner()).await {
        Ok(permission) => Ok(HttpResponse::Ok().json(ApiResponse::success(permission))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/permissions",
    tag = "permission",
    request_body = CreatePermissionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Created", body = PermissionResponse),
        (status = 400, description = "Invalid or duplicate slug")
    )
)]
pub async fn create_permission(
    permission_service: web::Data<PermissionService>,
    req: HttpRequest,
    request: web::Json<CreatePermissionRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::PermissionItemCreate) {
        return Ok(e.error_response());
    }

    match permission_service
        .create_permission(request.into_inner())
        .await
    {
        Ok(permission) => Ok(HttpResponse::Ok().json(ApiResponse::success(permission))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/permissions/{id}",
    tag = "permission",
    params(("id" = i32, Path, description = "Permission id")),
    request_body = UpdatePermissionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Updated", body = PermissionResponse)
    )
)]
pub async fn update_permission(
    permission_service: web::Data<PermissionService>,
    req: HttpRequest,
    path: web::Path<i32>,
    request: web::Json<UpdatePermissionRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::PermissionItemUpdate) {
        return Ok(e.error_response());
    }

    match permission_service
        .update_permission(path.into_inner(), request.into_inner())
        .await
    {
        Ok(permission) => Ok(HttpResponse::Ok().json(ApiResponse::success(permission))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/permissions/{id}",
    tag = "permission",
    params(("id" = i32, Path, description = "Permission id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Deleted", body = PermissionResponse)
    )
)]
pub async fn delete_permission(
    permission_service: web::Data<PermissionService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::PermissionItemDelete) {
        return Ok(e.error_response());
    }

    match permission_service.delete_permission(path.into_inner()).await {
        Ok(permission) => Ok(HttpResponse::Ok().json(ApiResponse::success(permission))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn permission_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/permissions")
            .route("", web::get().to(get_permissions))
            .route("", web::post().to(create_permission))
            .route("/{id}", web::get().to(get_permission))
            .route("/{id}", web::put().to(update_permission))
            .route("/{id}", web::delete().to(delete_permission)),
    );
}
