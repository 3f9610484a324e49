use crate::entities::{
    permission_entity as permissions, role_entity as roles,
    role_permission_entity as role_permissions, user_role_entity as user_roles,
};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::permission_service::permission_slugs_to_ids;
use crate::utils::crud::{apply_order, common_delete, find_or_not_found, paginate};
use crate::utils::{normalize_optional, validate_slug};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::collections::HashMap;

#[derive(Clone)]
pub struct RoleService {
    pool: DatabaseConnection,
}

impl RoleService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn roles(&self, query: &RolesQuery) -> AppResult<PaginatedResponse<RoleResponse>> {
        let params = PaginationParams::new(query.page, query.page_size);
        let mut select = roles::Entity::find();

        if let Some(q) = normalize_optional(query.q.clone()) {
            select = select.filter(
                Condition::any()
                    .add(roles::Column::Name.contains(&q))
                    .add(roles::Column::Slug.contains(&q)),
            );
        }

        let select = apply_order(
            select,
            query.order_by.as_deref(),
            query.order_sort.as_deref(),
            roles::Column::Id,
        )?;
        let page = paginate(&self.pool, select, &params).await?;

        let role_ids: Vec<i32> = page.items.iter().map(|r| r.id).collect();
        let mut grouped = permissions_by_role(&self.pool, &role_ids).await?;

        Ok(page.map(|role| {
            let perms = grouped.remove(&role.id).unwrap_or_default();
            RoleResponse::new(role, perms.into_iter().map(Into::into).collect())
        }))
    }

    pub async fn role(&self, id: i32) -> AppResult<RoleResponse> {
        let role = find_or_not_found::<roles::Entity, _>(&self.pool, id, "Role").await?;
        let perms = permissions_of_roles(&self.pool, &[role.id]).await?;

        Ok(RoleResponse::new(role, perms.into_iter().map(Into::into).collect()))
    }

    pub async fn create_role(&self, request: CreateRoleRequest) -> AppResult<RoleResponse> {
        validate_slug(&request.slug)?;
        self.ensure_slug_free(&request.slug, None).await?;

        let permission_ids = self
            .resolve_permission_ids(request.permission_ids, request.permission_slugs)
            .await?;

        let txn = self.pool.begin().await?;
        let role = roles::ActiveModel {
            name: Set(request.name),
            slug: Set(request.slug),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        if let Some(ids) = permission_ids {
            replace_role_permissions(&txn, role.id, &ids).await?;
        }
        txn.commit().await?;

        log::info!("Role {} created", role.slug);
        self.role(role.id).await
    }

    pub async fn update_role(&self, id: i32, request: UpdateRoleRequest) -> AppResult<RoleResponse> {
        if let Some(slug) = &request.slug {
            validate_slug(slug)?;
            self.ensure_slug_free(slug, Some(id)).await?;
        }

        let permission_ids = self
            .resolve_permission_ids(request.permission_ids, request.permission_slugs)
            .await?;

        let txn = self.pool.begin().await?;
        let mut role = find_or_not_found::<roles::Entity, _>(&txn, id, "Role")
            .await?
            .into_active_model();
        if let Some(name) = request.name {
            role.name = Set(name);
        }
        if let Some(slug) = request.slug {
            role.slug = Set(slug);
        }
        role.updated_at = Set(Some(Utc::now()));
        role.update(&txn).await?;

        if let Some(ids) = permission_ids {
            replace_role_permissions(&txn, id, &ids).await?;
        }
        txn.commit().await?;

        self.role(id).await
    }

    pub async fn delete_role(&self, id: i32) -> AppResult<RoleBrief> {
        let txn = self.pool.begin().await?;
        user_roles::Entity::delete_many()
            .filter(user_roles::Column::RoleId.eq(id))
            .exec(&txn)
            .await?;
        role_permissions::Entity::delete_many()
            .filter(role_permissions::Column::RoleId.eq(id))
            .exec(&txn)
            .await?;
        let role = common_delete::<roles::Entity, _>(&txn, id, "Role").await?;
        txn.commit().await?;

        Ok(role.into())
    }

    pub async fn role_slugs_to_ids(&self, slugs: &[String]) -> AppResult<Vec<i32>> {
        role_slugs_to_ids(&self.pool, slugs).await
    }

    async fn resolve_permission_ids(
        &self,
        ids: Option<Vec<i32>>,
        slugs: Option<Vec<String>>,
    ) -> AppResult<Option<Vec<i32>>> {
        // Slugs win when both are given.
        let ids = match (ids, slugs) {
            (_, Some(slugs)) => permission_slugs_to_ids(&self.pool, &slugs).await?,
            (Some(ids), None) => ids,
            (None, None) => return Ok(None),
        };

        if !ids.is_empty() {
            let found = permissions::Entity::find()
                .filter(permissions::Column::Id.is_in(ids.clone()))
                .all(&self.pool)
                .await?;
            if found.len() != dedup(&ids).len() {
                return Err(AppError::ValidationError("Unknown permission id".to_string()));
            }
        }

        Ok(Some(dedup(&ids)))
    }

    async fn ensure_slug_free(&self, slug: &str, except_id: Option<i32>) -> AppResult<()> {
        let existing = roles::Entity::find()
            .filter(roles::Column::Slug.eq(slug))
            .one(&self.pool)
            .await?;

        match existing {
            Some(role) if Some(role.id) != except_id => Err(AppError::ValidationError(format!(
                "Role slug already exists: {slug}"
            ))),
            _ => Ok(()),
        }
    }
}

fn dedup(ids: &[i32]) -> Vec<i32> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Map role slugs to ids; every slug must exist.
pub async fn role_slugs_to_ids<C: ConnectionTrait>(db: &C, slugs: &[String]) -> AppResult<Vec<i32>> {
    if slugs.is_empty() {
        return Ok(vec![]);
    }

    let found = roles::Entity::find()
        .filter(roles::Column::Slug.is_in(slugs.to_vec()))
        .all(db)
        .await?;

    if let Some(missing) = slugs.iter().find(|s| !found.iter().any(|r| &r.slug == *s)) {
        return Err(AppError::ValidationError(format!("Unknown role: {missing}")));
    }

    Ok(found.into_iter().map(|r| r.id).collect())
}

pub async fn roles_of_user<C: ConnectionTrait>(db: &C, user_id: i32) -> AppResult<Vec<roles::Model>> {
    let role_ids: Vec<i32> = user_roles::Entity::find()
        .filter(user_roles::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|link| link.role_id)
        .collect();

    if role_ids.is_empty() {
        return Ok(vec![]);
    }

    Ok(roles::Entity::find()
        .filter(roles::Column::Id.is_in(role_ids))
        .order_by_asc(roles::Column::Id)
        .all(db)
        .await?)
}

/// Distinct permissions granted by any of `role_ids`.
pub async fn permissions_of_roles<C: ConnectionTrait>(
    db: &C,
    role_ids: &[i32],
) -> AppResult<Vec<permissions::Model>> {
    if role_ids.is_empty() {
        return Ok(vec![]);
    }

    let permission_ids: Vec<i32> = role_permissions::Entity::find()
        .filter(role_permissions::Column::RoleId.is_in(role_ids.to_vec()))
        .all(db)
        .await?
        .into_iter()
        .map(|link| link.permission_id)
        .collect();

    if permission_ids.is_empty() {
        return Ok(vec![]);
    }

    Ok(permissions::Entity::find()
        .filter(permissions::Column::Id.is_in(dedup(&permission_ids)))
        .order_by_asc(permissions::Column::Id)
        .all(db)
        .await?)
}

async fn permissions_by_role<C: ConnectionTrait>(
    db: &C,
    role_ids: &[i32],
) -> AppResult<HashMap<i32, Vec<permissions::Model>>> {
    let mut grouped: HashMap<i32, Vec<permissions::Model>> = HashMap::new();
    if role_ids.is_empty() {
        return Ok(grouped);
    }

    let links = role_permissions::Entity::find()
        .filter(role_permissions::Column::RoleId.is_in(role_ids.to_vec()))
        .all(db)
        .await?;
    let permission_ids: Vec<i32> = links.iter().map(|l| l.permission_id).collect();
    if permission_ids.is_empty() {
        return Ok(grouped);
    }

    let by_id: HashMap<i32, permissions::Model> = permissions::Entity::find()
        .filter(permissions::Column::Id.is_in(dedup(&permission_ids)))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    for link in links {
        if let Some(p) = by_id.get(&link.permission_id) {
            grouped.entry(link.role_id).or_default().push(p.clone());
        }
    }

    Ok(grouped)
}

pub async fn replace_role_permissions<C: ConnectionTrait>(
    db: &C,
    role_id: i32,
    permission_ids: &[i32],
) -> AppResult<()> {
    role_permissions::Entity::delete_many()
        .filter(role_permissions::Column::RoleId.eq(role_id))
        .exec(db)
        .await?;

    if permission_ids.is_empty() {
        return Ok(());
    }

    role_permissions::Entity::insert_many(permission_ids.iter().map(|&permission_id| {
        role_permissions::ActiveModel {
            role_id: Set(role_id),
            permission_id: Set(permission_id),
        }
    }))
    .exec_without_returning(db)
    .await?;

    Ok(())
}

pub async fn replace_user_roles<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    role_ids: &[i32],
) -> AppResult<()> {
    user_roles::Entity::delete_many()
        .filter(user_roles::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    if role_ids.is_empty() {
        return Ok(());
    }

    user_roles::Entity::insert_many(role_ids.iter().map(|&role_id| user_roles::ActiveModel {
        user_id: Set(user_id),
        role_id: Set(role_id),
    }))
    .exec_without_returning(db)
    .await?;

    Ok(())
}
