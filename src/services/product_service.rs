use crate::authorization::{AuthUser, Permission, can};
use crate::entities::{
    category_entity as categories, product_category_entity as product_categories,
    product_entity as products,
};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::crud::{apply_order, find_or_not_found, paginate};
use crate::utils::normalize_optional;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;

#[derive(Clone)]
pub struct ProductService {
    pool: DatabaseConnection,
}

impl ProductService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn products(
        &self,
        query: &ProductsQuery,
        caller: Option<&AuthUser>,
    ) -> AppResult<PaginatedResponse<ProductResponse>> {
        let params = PaginationParams::new(query.page, query.page_size);
        let mut select = products::Entity::find();

        if let Some(q) = normalize_optional(query.q.clone()) {
            select = select.filter(
                Condition::any()
                    .add(products::Column::Name.contains(&q))
                    .add(products::Column::Fullname.contains(&q))
                    .add(products::Column::Serial.contains(&q)),
            );
        }

        if let Some(category_id) = query.category_id {
            let product_ids: Vec<i32> = product_categories::Entity::find()
                .select_only()
                .column(product_categories::Column::ProductId)
                .filter(product_categories::Column::CategoryId.eq(category_id))
                .into_tuple()
                .all(&self.pool)
                .await?;
            select = select.filter(products::Column::Id.is_in(product_ids));
        }

        if !can(caller, Permission::ProductListReadAllStatus) {
            select = select.filter(products::Column::Status.eq(1));
        }

        let select = apply_order(
            select,
            query.order_by.as_deref(),
            query.order_sort.as_deref(),
            products::Column::Id,
        )?;
        let page = paginate(&self.pool, select, &params).await?;

        let product_ids: Vec<i32> = page.items.iter().map(|p| p.id).collect();
        let mut grouped = categories_by_product(&self.pool, &product_ids).await?;

        Ok(page.map(|product| {
            let cats = grouped.remove(&product.id).unwrap_or_default();
            ProductResponse::new(product, cats.into_iter().map(Into::into).collect())
        }))
    }

    pub async fn product(&self, id: i32, caller: Option<&AuthUser>) -> AppResult<ProductResponse> {
        let mut select = products::Entity::find_by_id(id);
        if !can(caller, Permission::ProductItemReadAllStatus) {
            select = select.filter(products::Column::Status.eq(1));
        }

        let product = select
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Product"))?;

        self.with_categories(product).await
    }

    pub async fn create_product(&self, request: CreateProductRequest) -> AppResult<ProductResponse> {
        let serial = request.serial.trim().to_string();
        if serial.is_empty() {
            return Err(AppError::ValidationError("Serial is required".to_string()));
        }
        self.ensure_serial_free(&serial, None).await?;
        if let Some(ids) = &request.category_ids {
            ensure_categories_exist(&self.pool, ids).await?;
        }

        let txn = self.pool.begin().await?;
        let product = products::ActiveModel {
            name: Set(request.name),
            fullname: Set(normalize_optional(request.fullname)),
            serial: Set(serial),
            price: Set(request.price),
            cost_price: Set(request.cost_price),
            market_price: Set(request.market_price),
            stock: Set(request.stock.unwrap_or(0)),
            description: Set(request.description),
            status: Set(request.status.unwrap_or(1)),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        if let Some(ids) = &request.category_ids {
            replace_product_categories(&txn, product.id, ids).await?;
        }
        txn.commit().await?;

        log::info!("Product {} created", product.serial);
        self.with_categories(product).await
    }

    pub async fn update_product(
        &self,
        id: i32,
        request: UpdateProductRequest,
    ) -> AppResult<ProductResponse> {
        if let Some(serial) = &request.serial {
            self.ensure_serial_free(serial.trim(), Some(id)).await?;
        }
        if let Some(ids) = &request.category_ids {
            ensure_categories_exist(&self.pool, ids).await?;
        }

        let txn = self.pool.begin().await?;
        let mut product = find_or_not_found::<products::Entity, _>(&txn, id, "Product")
            .await?
            .into_active_model();
        if let Some(name) = request.name {
            product.name = Set(name);
        }
        if let Some(fullname) = request.fullname {
            product.fullname = Set(normalize_optional(Some(fullname)));
        }
        if let Some(serial) = request.serial {
            product.serial = Set(serial.trim().to_string());
        }
        if let Some(price) = request.price {
            product.price = Set(price);
        }
        if let Some(cost_price) = request.cost_price {
            product.cost_price = Set(Some(cost_price));
        }
        if let Some(market_price) = request.market_price {
            product.market_price = Set(Some(market_price));
        }
        if let Some(stock) = request.stock {
            product.stock = Set(stock);
        }
        if let Some(description) = request.description {
            product.description = Set(Some(description));
        }
        if let Some(status) = request.status {
            product.status = Set(status);
        }
        product.updated_at = Set(Some(Utc::now()));
        let product = product.update(&txn).await?;

        if let Some(ids) = &request.category_ids {
            replace_product_categories(&txn, id, ids).await?;
        }
        txn.commit().await?;

        self.with_categories(product).await
    }

    pub async fn delete_product(&self, id: i32) -> AppResult<ProductResponse> {
        let product = find_or_not_found::<products::Entity, _>(&self.pool, id, "Product").await?;
        let response = self.with_categories(product).await?;

        let txn = self.pool.begin().await?;
        product_categories::Entity::delete_many()
            .filter(product_categories::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;
        products::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        log::info!("Product #{id} deleted");
        Ok(response)
    }

    async fn with_categories(&self, product: products::Model) -> AppResult<ProductResponse> {
        let cats = categories_by_product(&self.pool, &[product.id])
            .await?
            .remove(&product.id)
            .unwrap_or_default();

        Ok(ProductResponse::new(
            product,
            cats.into_iter().map(Into::into).collect(),
        ))
    }

    async fn ensure_serial_free(&self, serial: &str, except_id: Option<i32>) -> AppResult<()> {
        let existing = products::Entity::find()
            .filter(products::Column::Serial.eq(serial))
            .one(&self.pool)
            .await?;

        match existing {
            Some(p) if Some(p.id) != except_id => Err(AppError::ValidationError(format!(
                "Product serial already exists: {serial}"
            ))),
            _ => Ok(()),
        }
    }
}

async fn ensure_categories_exist<C: ConnectionTrait>(db: &C, ids: &[i32]) -> AppResult<()> {
    if ids.is_empty() {
        return Ok(());
    }

    let mut wanted = ids.to_vec();
    wanted.sort_unstable();
    wanted.dedup();

    let found = categories::Entity::find()
        .filter(categories::Column::Id.is_in(wanted.clone()))
        .all(db)
        .await?;
    if found.len() != wanted.len() {
        return Err(AppError::ValidationError("Unknown category id".to_string()));
    }

    Ok(())
}

async fn categories_by_product<C: ConnectionTrait>(
    db: &C,
    product_ids: &[i32],
) -> AppResult<HashMap<i32, Vec<categories::Model>>> {
    let mut grouped: HashMap<i32, Vec<categories::Model>> = HashMap::new();
    if product_ids.is_empty() {
        return Ok(grouped);
    }

    let links = product_categories::Entity::find()
        .filter(product_categories::Column::ProductId.is_in(product_ids.to_vec()))
        .all(db)
        .await?;
    if links.is_empty() {
        return Ok(grouped);
    }

    let category_ids: Vec<i32> = links.iter().map(|l| l.category_id).collect();
    let by_id: HashMap<i32, categories::Model> = categories::Entity::find()
        .filter(categories::Column::Id.is_in(category_ids))
        .order_by_asc(categories::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    for link in links {
        if let Some(category) = by_id.get(&link.category_id) {
            grouped
                .entry(link.product_id)
                .or_default()
                .push(category.clone());
        }
    }

    Ok(grouped)
}

async fn replace_product_categories<C: ConnectionTrait>(
    db: &C,
    product_id: i32,
    category_ids: &[i32],
) -> AppResult<()> {
    product_categories::Entity::delete_many()
        .filter(product_categories::Column::ProductId.eq(product_id))
        .exec(db)
        .await?;

    let mut ids = category_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(());
    }

    product_categories::Entity::insert_many(ids.into_iter().map(|category_id| {
        product_categories::ActiveModel {
            product_id: Set(product_id),
            category_id: Set(category_id),
        }
    }))
    .exec_without_returning(db)
    .await?;

    Ok(())
}
