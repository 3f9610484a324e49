use crate::authorization::Permission;
use crate::entities::{permission_entity as permissions, role_permission_entity as role_permissions};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::crud::{apply_order, common_delete, common_update, find_or_not_found, paginate};
use crate::utils::{normalize_optional, validate_slug};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};

#[derive(Clone)]
pub struct PermissionService {
    pool: DatabaseConnection,
}

impl PermissionService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn permissions(
        &self,
        query: &PermissionsQuery,
    ) -> AppResult<PaginatedResponse<PermissionResponse>> {
        let params = PaginationParams::new(query.page, query.page_size);
        let mut select = permissions::Entity::find();

        if let Some(q) = normalize_optional(query.q.clone()) {
            select = select.filter(
                Condition::any()
                    .add(permissions::Column::Name.contains(&q))
                    .add(permissions::Column::Slug.contains(&q)),
            );
        }

        let select = apply_order(
            select,
            query.order_by.as_deref(),
            query.order_sort.as_deref(),
            permissions::Column::Id,
        )?;

        Ok(paginate(&self.pool, select, &params)
            .await?
            .map(PermissionResponse::from))
    }

    pub async fn permission(&self, id: i32) -> AppResult<PermissionResponse> {
        let permission =
            find_or_not_found::<permissions::Entity, _>(&self.pool, id, "Permission").await?;
        Ok(permission.into())
    }

    pub async fn create_permission(
        &self,
        request: CreatePermissionRequest,
    ) -> AppResult<PermissionResponse> {
        validate_slug(&request.slug)?;
        warn_if_unknown(&request.slug);
        self.ensure_slug_free(&request.slug, None).await?;

        let permission = permissions::ActiveModel {
            name: Set(request.name),
            slug: Set(request.slug),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!("Permission {} created", permission.slug);
        Ok(permission.into())
    }

    pub async fn update_permission(
        &self,
        id: i32,
        request: UpdatePermissionRequest,
    ) -> AppResult<PermissionResponse> {
        if let Some(slug) = &request.slug {
            validate_slug(slug)?;
            warn_if_unknown(slug);
            self.ensure_slug_free(slug, Some(id)).await?;
        }

        let permission =
            common_update::<permissions::Entity, _, _, _>(&self.pool, id, "Permission", |am| {
                if let Some(name) = request.name {
                    am.name = Set(name);
                }
                if let Some(slug) = request.slug {
                    am.slug = Set(slug);
                }
                am.updated_at = Set(Some(Utc::now()));
            })
            .await?;

        Ok(permission.into())
    }

    pub async fn delete_permission(&self, id: i32) -> AppResult<PermissionResponse> {
        let txn = self.pool.begin().await?;
        role_permissions::Entity::delete_many()
            .filter(role_permissions::Column::PermissionId.eq(id))
            .exec(&txn)
            .await?;
        let permission = common_delete::<permissions::Entity, _>(&txn, id, "Permission").await?;
        txn.commit().await?;

        Ok(permission.into())
    }

    async fn ensure_slug_free(&self, slug: &str, except_id: Option<i32>) -> AppResult<()> {
        let existing = permissions::Entity::find()
            .filter(permissions::Column::Slug.eq(slug))
            .one(&self.pool)
            .await?;

        match existing {
            Some(p) if Some(p.id) != except_id => Err(AppError::ValidationError(format!(
                "Permission slug already exists: {slug}"
            ))),
            _ => Ok(()),
        }
    }
}

fn warn_if_unknown(slug: &str) {
    if slug.parse::<Permission>().is_err() {
        log::warn!("Permission slug {slug} is not checked anywhere and will grant nothing");
    }
}

/// Map permission slugs to ids; every slug must exist.
pub async fn permission_slugs_to_ids<C: ConnectionTrait>(
    db: &C,
    slugs: &[String],
) -> AppResult<Vec<i32>> {
    if slugs.is_empty() {
        return Ok(vec![]);
    }

    let found = permissions::Entity::find()
        .filter(permissions::Column::Slug.is_in(slugs.to_vec()))
        .all(db)
        .await?;

    if let Some(missing) = slugs.iter().find(|s| !found.iter().any(|p| &p.slug == *s)) {
        return Err(AppError::ValidationError(format!(
            "Unknown permission: {missing}"
        )));
    }

    Ok(found.into_iter().map(|p| p.id).collect())
}
