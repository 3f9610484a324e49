use crate::authorization::{Permission, require};
use crate::middlewares::current_user;
use crate::models::*;
use crate::services::AxService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/axs",
    tag = "ax",
    params(
        ("page" = Option<u64>, Query, description = "Page number, from 1"),
        ("page_size" = Option<u64>, Query, description = "Items per page"),
        ("q" = Option<String>, Query, description = "Matches title or slug"),
        ("order_by" = Option<String>, Query, description = "Column to order by"),
        ("order_sort" = Option<String>, Query, description = "asc or desc")
    ),
    responses(
        (status = 200, description = "Paginated ad slots")
    )
)]
pub async fn get_axs(
    ax_service: web::Data<AxService>,
    req: HttpRequest,
    query: web::Query<AxsQuery>,
) -> Result<HttpResponse> {
    let caller = current_user(&req);
    match ax_service.axs(&query, caller.as_ref()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/axs/{id}",
    tag = "ax",
    params(("id" = i32, Path, description = "Ax id")),
    responses(
        (status = 200, description = "The ad slot with its attachments", body = AxResponse),
        (status = 404, description = "Missing or disabled")
    )
)]
pub async fn get_ax(
    ax_service: web::Data<AxService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    let caller = current_user(&req);
    match ax_service.ax(path.into_inner(), caller.as_ref()).await {
        Ok(ax) => Ok(HttpResponse::Ok().json(ApiResponse::success(ax))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/axs/slug/{slug}",
    tag = "ax",
    params(("slug" = String, Path, description = "Ax slug")),
    responses(
        (status = 200, description = "The ad slot with its attachments", body = AxResponse),
        (status = 404, description = "Missing or disabled")
    )
)]
pub async fn get_ax_by_slug(
    ax_service: web::Data<AxService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let caller = current_user(&req);
    match ax_service.ax_by_slug(&path, caller.as_ref()).await {
        Ok(ax) => Ok(HttpResponse::Ok().json(ApiResponse::success(ax))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/axs",
    tag = "ax",
    request_body = CreateAxRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Created", body = AxResponse),
        (status = 400, description = "Invalid or duplicate slug")
    )
)]
pub async fn create_ax(
    ax_service: web::Data<AxService>,
    req: HttpRequest,
    request: web::Json<CreateAxRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::AxItemCreate) {
        return Ok(e.error_response());
    }

    match ax_service.create_ax(request.into_inner()).await {
        Ok(ax) => Ok(HttpResponse::Ok().json(ApiResponse::success(ax))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/axs/{id}",
    tag = "ax",
    params(("id" = i32, Path, description = "Ax id")),
    request_body = UpdateAxRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Updated", body = AxResponse)
    )
)]
pub async fn update_ax(
    ax_service: web::Data<AxService>,
    req: HttpRequest,
    path: web::Path<i32>,
    request: web::Json<UpdateAxRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::AxItemUpdate) {
        return Ok(e.error_response());
    }

    match ax_service
        .update_ax(path.into_inner(), request.into_inner())
        .await
    {
        Ok(ax) => Ok(HttpResponse::Ok().json(ApiResponse::success(ax))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/axs/{id}",
    tag = "ax",
    params(("id" = i32, Path, description = "Ax id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Deleted along with its attachments", body = AxResponse)
    )
)]
pub async fn delete_ax(
    ax_service: web::Data<AxService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::AxItemDelete) {
        return Ok(e.error_response());
    }

    match ax_service.delete_ax(path.into_inner()).await {
        Ok(ax) => Ok(HttpResponse::Ok().json(ApiResponse::success(ax))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn ax_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/axs")
            .route("", web::get().to(get_axs))
            .route("", web::post().to(create_ax))
            .route("/slug/{slug}", web::get().to(get_ax_by_slug))
            .route("/{id}", web::get().to(get_ax))
            .route("/{id}", web::put().to(update_ax))
            .route("/{id}", web::delete().to(delete_ax)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middlewares::AuthMiddleware;
    use crate::services::AuthService;
    use crate::test_support::{
        assign_role, bearer, insert_role, insert_user, jwt_service, setup_db,
    };
    use actix_web::{App, http::StatusCode, test};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn test_disabled_slot_hidden_from_public() {
        let db = setup_db().await;
        let editor = insert_user(&db, "editor@leaa.com").await;
        let role = insert_role(
            &db,
            "editor",
            &[Permission::AxItemCreate, Permission::AxItemReadAllStatus],
        )
        .await;
        assign_role(&db, editor.id, role.id).await;

        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(AuthService::new(db.clone(), jwt_service())))
                .app_data(web::Data::new(AxService::new(db.clone())))
                .service(web::scope("/api/v1").configure(ax_config)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/axs")
            .insert_header(bearer(editor.id))
            .set_json(json!({ "title": "Home", "slug": "home-banner", "status": 0 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["slug"], "home-banner");

        let req = test::TestRequest::get()
            .uri("/api/v1/axs/slug/home-banner")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri("/api/v1/axs/slug/home-banner")
            .insert_header(bearer(editor.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
