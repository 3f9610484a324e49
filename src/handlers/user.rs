use crate::authorization::{Permission, require};
use crate::middlewares::current_user;
use crate::models::*;
use crate::services::UserService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/users",
    tag = "user",
    params(
        ("page" = Option<u64>, Query, description = "Page number, from 1"),
        ("page_size" = Option<u64>, Query, description = "Items per page, at most 100"),
        ("q" = Option<String>, Query, description = "Matches name or email"),
        ("order_by" = Option<String>, Query, description = "Column to order by"),
        ("order_sort" = Option<String>, Query, description = "asc or desc")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Paginated users"),
        (status = 403, description = "Missing user.list-read")
    )
)]
pub async fn get_users(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    query: web::Query<UsersQuery>,
) -> Result<HttpResponse> {
    let caller = current_user(&req);
    if let Err(e) = require(caller.as_ref(), Permission::UserListRead) {
        return Ok(e.error_response());
    }

    match user_service.users(&query, caller.as_ref()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "user",
    params(("id" = i32, Path, description = "User id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "The user with its roles", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::UserItemRead) {
        return Ok(e.error_response());
    }

    match user_service.user(path.into_inner()).await {
        Ok(user) => Ok(HttpResponse::Ok().json(ApiResponse::success(user))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "user",
    request_body = CreateUserRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Created", body = UserResponse),
        (status = 400, description = "Invalid input or duplicate email")
    )
)]
pub async fn create_user(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    request: web::Json<CreateUserRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::UserItemCreate) {
        return Ok(e.error_response());
    }

    match user_service.create_user(request.into_inner()).await {
        Ok(user) => Ok(HttpResponse::Ok().json(ApiResponse::success(user))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "user",
    params(("id" = i32, Path, description = "User id")),
    request_body = UpdateUserRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Updated", body = UserResponse),
        (status = 400, description = "Invalid input or protected demo account")
    )
)]
pub async fn update_user(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    path: web::Path<i32>,
    request: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse> {
    let caller = current_user(&req);
    let caller = match require(caller.as_ref(), Permission::UserItemUpdate) {
        Ok(caller) => caller,
        Err(e) => return Ok(e.error_response()),
    };

    match user_service
        .update_user(path.into_inner(), request.into_inner(), caller)
        .await
    {
        Ok(user) => Ok(HttpResponse::Ok().json(ApiResponse::success(user))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "user",
    params(("id" = i32, Path, description = "User id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Deleted", body = UserResponse),
        (status = 400, description = "Protected demo account")
    )
)]
pub async fn delete_user(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::UserItemDelete) {
        return Ok(e.error_response());
    }

    match user_service.delete_user(path.into_inner()).await {
        Ok(user) => Ok(HttpResponse::Ok().json(ApiResponse::success(user))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn user_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("", web::get().to(get_users))
            .route("", web::post().to(create_user))
            .route("/{id}", web::get().to(get_user))
            .route("/{id}", web::put().to(update_user))
            .route("/{id}", web::delete().to(delete_user)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DemoConfig;
    use crate::middlewares::AuthMiddleware;
    use crate::services::AuthService;
    use crate::test_support::{assign_role, bearer, insert_role, insert_user, jwt_service, setup_db};
    use actix_web::{App, http::StatusCode, test};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn test_demo_account_is_protected_over_http() {
        let db = setup_db().await;
        let seed = insert_user(&db, "admin@leaa.com").await;
        let role = insert_role(
            &db,
            "admin",
            &[Permission::UserItemUpdate, Permission::UserItemDelete],
        )
        .await;
        assign_role(&db, seed.id, role.id).await;
        let demo = DemoConfig {
            enabled: true,
            ..Default::default()
        };
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(AuthService::new(db.clone(), jwt_service())))
                .app_data(web::Data::new(UserService::new(db.clone(), demo)))
                .service(web::scope("/api/v1").configure(user_config)),
        )
        .await;

        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/users/{}", seed.id))
            .insert_header(bearer(seed.id))
            .set_json(json!({ "name": "changed" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["message"], "PLEASE DONT MODIFY DEMO DATA");

        let req = test::TestRequest::delete()
            .uri(&format!("/api/v1/users/{}", seed.id))
            .insert_header(bearer(seed.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_listing_requires_permission() {
        let db = setup_db().await;
        let user = insert_user(&db, "plain@leaa.com").await;
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(AuthService::new(db.clone(), jwt_service())))
                .app_data(web::Data::new(UserService::new(
                    db.clone(),
                    DemoConfig::default(),
                )))
                .service(web::scope("/api/v1").configure(user_config)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/users")
            .insert_header(bearer(user.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
