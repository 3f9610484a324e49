use crate::authorization::{Permission, require};
use crate::middlewares::current_user;
use crate::models::*;
use crate::services::CouponService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/coupons",
    tag = "coupon",
    params(
        ("page" = Option<u64>, Query, description = "Page number, from 1"),
        ("page_size" = Option<u64>, Query, description = "Items per page"),
        ("q" = Option<String>, Query, description = "Exact code or name"),
        ("order_by" = Option<String>, Query, description = "Column to order by"),
        ("order_sort" = Option<String>, Query, description = "asc or desc")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Coupons visible to the caller")
    )
)]
pub async fn get_coupons(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
    query: web::Query<CouponsQuery>,
) -> Result<HttpResponse> {
    let caller = current_user(&req);
    if let Err(e) = require(caller.as_ref(), Permission::CouponListRead) {
        return Ok(e.error_response());
    }

    match coupon_service.coupons(&query, caller.as_ref()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/coupons/{id}",
    tag = "coupon",
    params(("id" = i32, Path, description = "Coupon id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "The coupon", body = CouponResponse),
        (status = 404, description = "Missing or not visible to the caller")
    )
)]
pub async fn get_coupon(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    let caller = current_user(&req);
    if let Err(e) = require(caller.as_ref(), Permission::CouponItemRead) {
        return Ok(e.error_response());
    }

    match coupon_service.coupon(path.into_inner(), caller.as_ref()).await {
        Ok(coupon) => Ok(HttpResponse::Ok().json(ApiResponse::success(coupon))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/coupons/code/{code}",
    tag = "coupon",
    params(("code" = String, Path, description = "Coupon code")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "The coupon", body = CouponResponse),
        (status = 404, description = "Missing or not visible to the caller")
    )
)]
pub async fn get_coupon_by_code(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let caller = current_user(&req);
    if let Err(e) = require(caller.as_ref(), Permission::CouponItemRead) {
        return Ok(e.error_response());
    }

    match coupon_service
        .coupon_by_code(path.trim(), caller.as_ref())
        .await
    {
        Ok(coupon) => Ok(HttpResponse::Ok().json(ApiResponse::success(coupon))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/coupons",
    tag = "coupon",
    request_body = CreateCouponRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "First coupon of the generated batch", body = CouponResponse),
        (status = 400, description = "Invalid quantity, amount or type")
    )
)]
pub async fn create_coupon(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
    request: web::Json<CreateCouponRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::CouponItemCreate) {
        return Ok(e.error_response());
    }

    match coupon_service.create_coupon(request.into_inner()).await {
        Ok(coupon) => Ok(HttpResponse::Ok().json(ApiResponse::success(coupon))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/coupons/{id}",
    tag = "coupon",
    params(("id" = i32, Path, description = "Coupon id")),
    request_body = UpdateCouponRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Updated", body = CouponResponse)
    )
)]
pub async fn update_coupon(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
    path: web::Path<i32>,
    request: web::Json<UpdateCouponRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::CouponItemUpdate) {
        return Ok(e.error_response());
    }

    match coupon_service
        .update_coupon(path.into_inner(), request.into_inner())
        .await
    {
        Ok(coupon) => Ok(HttpResponse::Ok().json(ApiResponse::success(coupon))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/coupons/{id}",
    tag = "coupon",
    params(("id" = i32, Path, description = "Coupon id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Disabled", body = CouponResponse)
    )
)]
pub async fn delete_coupon(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::CouponItemDelete) {
        return Ok(e.error_response());
    }

    match coupon_service.delete_coupon(path.into_inner()).await {
        Ok(coupon) => Ok(HttpResponse::Ok().json(ApiResponse::success(coupon))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/coupons/redeem",
    tag = "coupon",
    request_body = RedeemCouponRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Redeemed", body = CouponResponse),
        (status = 400, description = "Unavailable, outside its window or already redeemed"),
        (status = 404, description = "Unknown code")
    )
)]
pub async fn redeem_coupon(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
    request: web::Json<RedeemCouponRequest>,
) -> Result<HttpResponse> {
    let caller = current_user(&req);
    let caller = match require(caller.as_ref(), Permission::CouponItemRedeem) {
        Ok(caller) => caller,
        Err(e) => return Ok(e.error_response()),
    };

    match coupon_service
        .redeem_coupon(request.into_inner(), caller)
        .await
    {
        Ok(coupon) => Ok(HttpResponse::Ok().json(ApiResponse::success(coupon))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn coupon_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/coupons")
            .route("", web::get().to(get_coupons))
            .route("", web::post().to(create_coupon))
            .route("/redeem", web::post().to(redeem_coupon))
            .route("/code/{code}", web::get().to(get_coupon_by_code))
            .route("/{id}", web::get().to(get_coupon))
            .route("/{id}", web::put().to(update_coupon))
            .route("/{id}", web::delete().to(delete_coupon)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middlewares::AuthMiddleware;
    use crate::services::AuthService;
    use crate::test_support::{
        CouponFixture, assign_role, bearer, insert_coupon, insert_role, insert_user,
        jwt_service, setup_db,
    };
    use actix_web::{App, http::StatusCode, test};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn test_redeem_over_http() {
        let db = setup_db().await;
        let member = insert_user(&db, "member@leaa.com").await;
        let role = insert_role(
            &db,
            "member",
            &[Permission::CouponItemRedeem, Permission::CouponItemRead],
        )
        .await;
        assign_role(&db, member.id, role.id).await;
        insert_coupon(&db, CouponFixture::redeemable("HTTPCODE")).await;

        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(AuthService::new(db.clone(), jwt_service())))
                .app_data(web::Data::new(CouponService::new(db.clone())))
                .service(web::scope("/api/v1").configure(coupon_config)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/coupons/redeem")
            .insert_header(bearer(member.id))
            .set_json(json!({ "code": "HTTPCODE" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["user_id"], member.id);

        // Second attempt loses.
        let req = test::TestRequest::post()
            .uri("/api/v1/coupons/redeem")
            .insert_header(bearer(member.id))
            .set_json(json!({ "code": "HTTPCODE" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // The owner sees it by code even without the all-user-id permission.
        let req = test::TestRequest::get()
            .uri("/api/v1/coupons/code/HTTPCODE")
            .insert_header(bearer(member.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_create_requires_permission() {
        let db = setup_db().await;
        let member = insert_user(&db, "member@leaa.com").await;
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(AuthService::new(db.clone(), jwt_service())))
                .app_data(web::Data::new(CouponService::new(db.clone())))
                .service(web::scope("/api/v1").configure(coupon_config)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/coupons")
            .insert_header(bearer(member.id))
            .set_json(json!({ "amount": 100, "quantity": 1 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
