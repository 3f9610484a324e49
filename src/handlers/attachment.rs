use crate::authorization::{Permission, require};
use crate::middlewares::current_user;
use crate::models::*;
use crate::services::AttachmentService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/attachments",
    tag = "attachment",
    params(
        ("page" = Option<u64>, Query, description = "Page number, from 1"),
        ("page_size" = Option<u64>, Query, description = "Items per page"),
        ("q" = Option<String>, Query, description = "Matches title or alt"),
        ("module_name" = Option<String>, Query, description = "Owning module"),
        ("module_id" = Option<i32>, Query, description = "Owning row"),
        ("type_name" = Option<String>, Query, description = "Slot within the owner")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Paginated attachments ordered by sort")
    )
)]
pub async fn get_attachments(
    attachment_service: web::Data<AttachmentService>,
    req: HttpRequest,
    query: web::Query<AttachmentsQuery>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::AttachmentListRead) {
        return Ok(e.error_response());
    }

    match attachment_service.attachments(&query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/attachments/{id}",
    tag = "attachment",
    params(("id" = i32, Path, description = "Attachment id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "The attachment", body = AttachmentResponse),
        (status = 404, description = "Attachment not found")
    )
)]
pub async fn get_attachment(
    attachment_service: web::Data<AttachmentService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::AttachmentItemRead) {
        return Ok(e.error_response());
    }

    match attachment_service.attachment(path.into_inner()).await {
        Ok(attachment) => Ok(HttpResponse::Ok().json(ApiResponse::success(attachment))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/attachments",
    tag = "attachment",
    request_body = CreateAttachmentRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Created", body = AttachmentResponse)
    )
)]
pub async fn create_attachment(
    attachment_service: web::Data<AttachmentService>,
    req: HttpRequest,
    request: web::Json<CreateAttachmentRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::AttachmentItemCreate) {
        return Ok(e.error_response());
    }

    match attachment_service
        .create_attachment(request.into_inner())
        .await
    {
        Ok(attachment) => Ok(HttpResponse::Ok().json(ApiResponse::success(attachment))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/attachments/{id}",
    tag = "attachment",
    params(("id" = i32, Path, description = "Attachment id")),
    request_body = UpdateAttachmentRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Updated", body = AttachmentResponse)
    )
)]
pub async fn update_attachment(
    attachment_service: web::Data<AttachmentService>,
    req: HttpRequest,
    path: web::Path<i32>,
    request: web::Json<UpdateAttachmentRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::AttachmentItemUpdate) {
        return Ok(e.error_response());
    }

    match attachment_service
        .update_attachment(path.into_inner(), request.into_inner())
        .await
    {
        Ok(attachment) => Ok(HttpResponse::Ok().json(ApiResponse::success(attachment))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/attachments/{id}",
    tag = "attachment",
    params(("id" = i32, Path, description = "Attachment id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Deleted", body = AttachmentResponse)
    )
)]
pub async fn delete_attachment(
    attachment_service: web::Data<AttachmentService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::AttachmentItemDelete) {
        return Ok(e.error_response());
    }

    match attachment_service.delete_attachment(path.into_inner()).await {
        Ok(attachment) => Ok(HttpResponse::Ok().json(ApiResponse::success(attachment))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/attachments/bind",
    tag = "attachment",
    request_body = BindAttachmentsRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "The bound attachments in order", body = Vec<AttachmentResponse>),
        (status = 404, description = "Unknown attachment id")
    )
)]
pub async fn bind_attachments(
    attachment_service: web::Data<AttachmentService>,
    req: HttpRequest,
    request: web::Json<BindAttachmentsRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::AttachmentItemUpdate) {
        return Ok(e.error_response());
    }

    match attachment_service
        .bind_attachments(request.into_inner())
        .await
    {
        Ok(bound) => Ok(HttpResponse::Ok().json(ApiResponse::success(bound))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn attachment_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/attachments")
            .route("", web::get().to(get_attachments))
            .route("", web::post().to(create_attachment))
            .route("/bind", web::post().to(bind_attachments))
            .route("/{id}", web::get().to(get_attachment))
            .route("/{id}", web::put().to(update_attachment))
            .route("/{id}", web::delete().to(delete_attachment)),
    );
}
