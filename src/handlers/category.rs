use crate::authorization::{Permission, require};
use crate::middlewares::current_user;
use crate::models::*;
use crate::services::CategoryService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/categories",
    tag = "category",
    params(
        ("page" = Option<u64>, Query, description = "Page number, from 1"),
        ("page_size" = Option<u64>, Query, description = "Items per page"),
        ("q" = Option<String>, Query, description = "Matches name or slug"),
        ("parent_id" = Option<i32>, Query, description = "Direct children of this category"),
        ("order_by" = Option<String>, Query, description = "Column to order by"),
        ("order_sort" = Option<String>, Query, description = "asc or desc")
    ),
    responses(
        (status = 200, description = "Paginated categories")
    )
)]
pub async fn get_categories(
    category_service: web::Data<CategoryService>,
    query: web::Query<CategoriesQuery>,
) -> Result<HttpResponse> {
    match category_service.categories(&query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/categories/tree",
    tag = "category",
    params(
        ("parent_slug" = Option<String>, Query, description = "Root the tree at this category")
    ),
    responses(
        (status = 200, description = "Nested categories", body = Vec<CategoryTreeNode>),
        (status = 404, description = "Unknown parent slug")
    )
)]
pub async fn get_category_tree(
    category_service: web::Data<CategoryService>,
    query: web::Query<CategoryTreeQuery>,
) -> Result<HttpResponse> {
    match category_service
        .category_tree(query.parent_slug.as_deref())
        .await
    {
        Ok(tree) => Ok(HttpResponse::Ok().json(ApiResponse::success(tree))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/categories/{id}",
    tag = "category",
    params(("id" = i32, Path, description = "Category id")),
    responses(
        (status = 200, description = "The category", body = CategoryResponse),
        (status = 404, description = "Category not found")
    )
)]
pub async fn get_category(
    category_service: web::Data<CategoryService>,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    match category_service.category(path.into_inner()).await {
        Ok(category) => Ok(HttpResponse::Ok().json(ApiResponse::success(category))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/categories/slug/{slug}",
    tag = "category",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "The category", body = CategoryResponse),
        (status = 404, description = "Category not found")
    )
)]
pub async fn get_category_by_slug(
    category_service: web::Data<CategoryService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match category_service.category_by_slug(&path).await {
        Ok(category) => Ok(HttpResponse::Ok().json(ApiResponse::success(category))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/categories",
    tag = "category",
    request_body = CreateCategoryRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Created", body = CategoryResponse),
        (status = 400, description = "Invalid slug or unknown parent")
    )
)]
pub async fn create_category(
    category_service: web::Data<CategoryService>,
    req: HttpRequest,
    request: web::Json<CreateCategoryRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::CategoryItemCreate) {
        return Ok(e.error_response());
    }

    match category_service.create_category(request.into_inner()).await {
        Ok(category) => Ok(HttpResponse::Ok().json(ApiResponse::success(category))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/categories/{id}",
    tag = "category",
    params(("id" = i32, Path, description = "Category id")),
    request_body = UpdateCategoryRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Updated", body = CategoryResponse),
        (status = 400, description = "Parent would create a cycle")
    )
)]
pub async fn update_category(
    category_service: web::Data<CategoryService>,
    req: HttpRequest,
    path: web::Path<i32>,
    request: web::Json<UpdateCategoryRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::CategoryItemUpdate) {
        return Ok(e.error_response());
    }

    match category_service
        .update_category(path.into_inner(), request.into_inner())
        .await
    {
        Ok(category) => Ok(HttpResponse::Ok().json(ApiResponse::success(category))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = "category",
    params(("id" = i32, Path, description = "Category id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Deleted", body = CategoryResponse),
        (status = 400, description = "Category has children")
    )
)]
pub async fn delete_category(
    category_service: web::Data<CategoryService>,
    req: HttpRequest,
    path: web::Path<i32>,
) -> Result<HttpResponse> {
    if let Err(e) = require(current_user(&req).as_ref(), Permission::CategoryItemDelete) {
        return Ok(e.error_response());
    }

    match category_service.delete_category(path.into_inner()).await {
        Ok(category) => Ok(HttpResponse::Ok().json(ApiResponse::success(category))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn category_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/categories")
            .route("", web::get().to(get_categories))
            .route("", web::post().to(create_category))
            .route("/tree", web::get().to(get_category_tree))
            .route("/slug/{slug}", web::get().to(get_category_by_slug))
            .route("/{id}", web::get().to(get_category))
            .route("/{id}", web::put().to(update_category))
            .route("/{id}", web::delete().to(delete_category)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_category, setup_db};
    use actix_web::{App, test};
    use serde_json::Value;

    #[actix_web::test]
    async fn test_tree_route_wins_over_id() {
        let db = setup_db().await;
        let root = insert_category(&db, 0, "tea").await;
        insert_category(&db, root.id, "green").await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(CategoryService::new(db.clone())))
                .service(web::scope("/api/v1").configure(category_config)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/categories/tree")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"][0]["slug"], "tea");
        assert_eq!(body["data"][0]["children"][0]["slug"], "green");

        let req = test::TestRequest::get()
            .uri("/api/v1/categories/slug/green")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["parent_id"], root.id);
    }
}
