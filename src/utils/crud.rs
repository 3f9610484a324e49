//! Generic CRUD routines shared by the entity services.

use crate::error::{AppError, AppResult};
use crate::models::{PaginatedResponse, PaginationParams, parse_order_sort};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ConnectionTrait, EntityTrait, IdenStatic,
    IntoActiveModel, Iterable, PaginatorTrait, PrimaryKeyTrait, QueryOrder, QuerySelect, Select,
};

/// Resolve a column of `E` from its snake_case name (as sent in `order_by`).
pub fn find_column<E: EntityTrait>(name: &str) -> Option<E::Column> {
    E::Column::iter().find(|column| column.as_str() == name)
}

/// Order `select` by the named column, falling back to `default_column` ascending.
pub fn apply_order<E: EntityTrait>(
    select: Select<E>,
    order_by: Option<&str>,
    order_sort: Option<&str>,
    default_column: E::Column,
) -> AppResult<Select<E>> {
    let column = match order_by.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => find_column::<E>(name)
            .ok_or_else(|| AppError::ValidationError(format!("Unknown order column: {name}")))?,
        None => default_column,
    };

    Ok(select.order_by(column, parse_order_sort(order_sort)))
}

pub async fn find_or_not_found<E, C>(db: &C, id: i32, name: &str) -> AppResult<E::Model>
where
    E: EntityTrait,
    E::PrimaryKey: PrimaryKeyTrait<ValueType = i32>,
    C: ConnectionTrait,
{
    E::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found(name))
}

/// Load row `id`, let `apply` change its active model, then persist it.
///
/// `apply` must set at least one column (services always touch `updated_at`).
pub async fn common_update<E, A, C, F>(db: &C, id: i32, name: &str, apply: F) -> AppResult<E::Model>
where
    E: EntityTrait,
    E::PrimaryKey: PrimaryKeyTrait<ValueType = i32>,
    E::Model: IntoActiveModel<A>,
    A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
    C: ConnectionTrait,
    F: FnOnce(&mut A),
{
    let model = find_or_not_found::<E, C>(db, id, name).await?;
    let mut active = model.into_active_model();
    apply(&mut active);

    let updated = active.update(db).await?;
    log::info!("{name} #{id} updated");

    Ok(updated)
}

/// Physically delete row `id`, returning it as it was.
pub async fn common_delete<E, C>(db: &C, id: i32, name: &str) -> AppResult<E::Model>
where
    E: EntityTrait,
    E::PrimaryKey: PrimaryKeyTrait<ValueType = i32>,
    C: ConnectionTrait,
{
    let model = find_or_not_found::<E, C>(db, id, name).await?;
    E::delete_by_id(id).exec(db).await?;
    log::info!("{name} #{id} deleted");

    Ok(model)
}

/// Count `select`, then fetch the requested page of it.
pub async fn paginate<E, C>(
    db: &C,
    select: Select<E>,
    params: &PaginationParams,
) -> AppResult<PaginatedResponse<E::Model>>
where
    E: EntityTrait,
    E::Model: Send + Sync + 'static,
    C: ConnectionTrait,
{
    let total = select.clone().count(db).await? as i64;

    let items = select
        .limit(params.get_limit())
        .offset(params.get_offset())
        .all(db)
        .await?;

    Ok(PaginatedResponse::new(items, params, total))
}
