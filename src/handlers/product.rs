use crate::authorization::{Permission, require};
use crate::middlewares::current_user;
use crate::models::*;
use crate::services::ProductService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

/// Public. Disabled products are listed only for callers with `product.list-read--all-status`.
#[utoipa::path(
    get,
    path = "/products",
    tag = "product",
    params(
        ("page" = Option<u64>, Query, description = "Page number, from 1"),
        ("page_size" = Option<u64>, Query, description = "Items per page"),
        ("q" = Option<String>, Query, description = "Matches name, fullname or serial"),
        ("category_id" = Option<i32>, Query, description = "Only products in this category"),
        ("order_by" = Option<String>, Query, description = "Column to order by"),
        ("order_sort" = Option<String>, Query, description = "asc or desc")
    ),
    responses(
        (status = 200, description = "Paginated products")
    )
)]
pub async fn get_products(
    product_service: web::Data<ProductService>,
    req: HttpRequest,
    query: web::Query<ProductsQuery>,
) -> Result<HttpResponse> {
    let caller = current_user(&req);
    match product_service.products(&query, caller.as_ref()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = "product",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "The product with its categories", body = ProductResponse),
        (status = 404, description = "Missing or disabled")
    )
)]
pub async fn get_product(
    product_service: web::Data<ProductService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    let caller = current_user(&req);
    match product_service
        .product(path.into_inner(), caller.as_ref())
        .await
    {
        Ok(product) => Ok(HttpResponse::Ok().json(ApiResponse::success(product))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/products",
    tag = "product",
    request_body = CreateProductRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Created", body = ProductResponse),
        (status = 400, description = "Duplicate serial or unknown category")
    )
)]
pub async fn create_product(
    product_service: web::Data<ProductService>,
    req: HttpRequest,
    request: web::Json<CreateProductRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::ProductItemCreate) {
        return Ok(e.error_response());
    }

    match product_service.create_product(request.into_inner()).await {
        Ok(product) => Ok(HttpResponse::Ok().json(ApiResponse::success(product))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/products/{id}",
    tag = "product",
    params(("id" = i32, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Updated", body = ProductResponse)
    )
)]
pub async fn update_product(
    product_service: web::Data<ProductService>,
    req: HttpRequest,
    path: web::Path<i32>,
    request: web::Json<UpdateProductRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::ProductItemUpdate) {
        return Ok(e.error_response());
    }

    match product_service
        .update_product(path.into_inner(), request.into_inner())
        .await
    {
        Ok(product) => Ok(HttpResponse::Ok().json(ApiResponse::success(product))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/products/{id}",
    tag = "product",
    params(("id" = i32, Path, description = "Product id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Deleted", body = ProductResponse)
    )
)]
pub async fn delete_product(
    product_service: web::Data<ProductService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::ProductItemDelete) {
        return Ok(e.error_response());
    }

    match product_service.delete_product(path.into_inner()).await {
        Ok(product) => Ok(HttpResponse::Ok().json(ApiResponse::success(product))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn product_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/products")
            .route("", web::get().to(get_products))
            .route("", web::post().to(create_product))
            .route("/{id}", web::get().to(get_product))
            .route("/{id}", web::put().to(update_product))
            .route("/{id}", web::delete().to(delete_product)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middlewares::AuthMiddleware;
    use crate::services::AuthService;
    use crate::test_support::{
        assign_role, bearer, insert_product, insert_role, insert_user, jwt_service, setup_db,
    };
    use actix_web::{App, http::StatusCode, test};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn test_anonymous_reads_and_gated_writes() {
        let db = setup_db().await;
        insert_product(&db, "P-ON", 1).await;
        let hidden = insert_product(&db, "P-OFF", 0).await;
        let editor = insert_user(&db, "editor@leaa.com").await;
        let role = insert_role(
            &db,
            "editor",
            &[Permission::ProductItemCreate, Permission::ProductListReadAllStatus],
        )
        .await;
        assign_role(&db, editor.id, role.id).await;

        let app = test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(AuthService::new(db.clone(), jwt_service())))
                .app_data(web::Data::new(ProductService::new(db.clone())))
                .service(web::scope("/api/v1").configure(product_config)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/products").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["total"], 1);

        let req = test::TestRequest::get()
            .uri("/api/v1/products")
            .insert_header(bearer(editor.id))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["total"], 2);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/products/{}", hidden.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post()
            .uri("/api/v1/products")
            .set_json(json!({ "name": "Tea", "serial": "P-NEW", "price": 100 }))
            .to_request();
        let resp = test::try_call_service(&app, req).await;
        let status = match resp {
            Ok(resp) => resp.status(),
            Err(e) => e.error_response().status(),
        };
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/v1/products")
            .insert_header(bearer(editor.id))
            .set_json(json!({ "name": "Tea", "serial": "P-NEW", "price": 100 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["serial"], "P-NEW");
    }
}
