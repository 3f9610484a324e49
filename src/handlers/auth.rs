use crate::error::AppError;
use crate::middlewares::current_user;
use crate::models::*;
use crate::services::AuthService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Signed up", body = AuthResponse),
        (status = 400, description = "Invalid email or weak password")
    )
)]
pub async fn signup(
    auth_service: web::Data<AuthService>,
    request: web::Json<SignupRequest>,
) -> Result<HttpResponse> {
    match auth_service.signup(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "User or password error")
    )
)]
pub async fn login(
    auth_service: web::Data<AuthService>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    match auth_service.login(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "New access token", body = AuthResponse),
        (status = 401, description = "Missing or invalid refresh token")
    )
)]
pub async fn refresh(
    auth_service: web::Data<AuthService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    // The refresh token travels in the Authorization header.
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = token else {
        return Ok(HttpResponse::Unauthorized().json(ApiResponse::<()>::error(
            "AUTH_ERROR".to_string(),
            "Missing refresh token".to_string(),
        )));
    };

    match auth_service.refresh_token(token.trim()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "The caller with its roles and permissions", body = CurrentUserResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn me(auth_service: web::Data<AuthService>, req: HttpRequest) -> Result<HttpResponse> {
    match current_user(&req) {
        Some(user) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            auth_service.current_user(&user),
        ))),
        None => Ok(AppError::AuthError("Missing access token".to_string()).error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Logged out")
    )
)]
pub async fn logout(req: HttpRequest) -> Result<HttpResponse> {
    // Tokens are stateless; the client drops them.
    if let Some(user) = current_user(&req) {
        log::info!("User {} logged out", user.id());
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Logged out"
    })))
}

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/signup", web::post().to(signup))
            .route("/login", web::post().to(login))
            .route("/refresh", web::post().to(refresh))
            .route("/logout", web::post().to(logout))
            .route("/me", web::get().to(me)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::Permission;
    use crate::middlewares::AuthMiddleware;
    use crate::test_support::{
        TEST_PASSWORD, assign_role, bearer, insert_role, insert_user, jwt_service, setup_db,
    };
    use actix_web::{App, http::StatusCode, test};
    use serde_json::Value;

    #[actix_web::test]
    async fn test_login_then_me() {
        let db = setup_db().await;
        let user = insert_user(&db, "staff@leaa.com").await;
        let role = insert_role(&db, "staff", &[Permission::CouponItemRedeem]).await;
        assign_role(&db, user.id, role.id).await;
        let auth_service = AuthService::new(db.clone(), jwt_service());
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(auth_service.clone()))
                .app_data(web::Data::new(auth_service))
                .service(web::scope("/api/v1").configure(auth_config)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(json!({ "account": "staff@leaa.com", "password": TEST_PASSWORD }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        let token = body["data"]["access_token"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri("/api/v1/auth/me")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["user"]["email"], "staff@leaa.com");
        assert_eq!(body["data"]["roles"][0], "staff");
        assert_eq!(body["data"]["permissions"][0], "coupon.item-redeem");

        let req = test::TestRequest::get()
            .uri("/api/v1/auth/me")
            .insert_header(bearer(user.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_bad_login_and_forged_token() {
        let db = setup_db().await;
        insert_user(&db, "staff@leaa.com").await;
        let auth_service = AuthService::new(db.clone(), jwt_service());
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(auth_service.clone()))
                .app_data(web::Data::new(auth_service))
                .service(web::scope("/api/v1").configure(auth_config)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(json!({ "account": "staff@leaa.com", "password": "Nope12345" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["message"], "User or password error");

        let req = test::TestRequest::get()
            .uri("/api/v1/auth/me")
            .insert_header(("Authorization", "Bearer not.a.token"))
            .to_request();
        let resp = test::try_call_service(&app, req).await;
        let status = match resp {
            Ok(resp) => resp.status(),
            Err(e) => e.error_response().status(),
        };
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
