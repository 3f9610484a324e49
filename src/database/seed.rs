use crate::authorization::Permission;
use crate::entities::{
    permission_entity as permissions, role_entity as roles,
    role_permission_entity as role_permissions,
};
use crate::error::AppResult;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};

pub const ADMIN_ROLE: &str = "admin";
pub const MEMBER_ROLE: &str = "member";

const MEMBER_PERMISSIONS: &[Permission] = &[
    Permission::CouponListRead,
    Permission::CouponItemRead,
    Permission::CouponItemRedeem,
];

/// Insert every known permission slug and the `admin`/`member` roles when missing.
///
/// Runs on every start. Rows that already exist are left alone, except that `admin` is
/// topped up with permissions added since it was created.
pub async fn seed_defaults(pool: &DatabaseConnection) -> AppResult<()> {
    let txn = pool.begin().await?;

    let existing: Vec<String> = permissions::Entity::find()
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| p.slug)
        .collect();
    let missing: Vec<permissions::ActiveModel> = Permission::ALL
        .iter()
        .filter(|p| !existing.iter().any(|slug| slug == p.slug()))
        .map(|p| permissions::ActiveModel {
            name: Set(p.slug().to_string()),
            slug: Set(p.slug().to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        })
        .collect();
    if !missing.is_empty() {
        log::info!("Seeding {} permission(s)", missing.len());
        permissions::Entity::insert_many(missing)
            .exec_without_returning(&txn)
            .await?;
    }

    let all: Vec<permissions::Model> = permissions::Entity::find().all(&txn).await?;
    let ids_of = |wanted: &[Permission]| -> Vec<i32> {
        all.iter()
            .filter(|p| wanted.iter().any(|w| w.slug() == p.slug))
            .map(|p| p.id)
            .collect()
    };

    let admin = ensure_role(&txn, ADMIN_ROLE, "Administrator").await?;
    grant_missing(&txn, admin.id, &ids_of(Permission::ALL)).await?;

    let (member, created) = ensure_role_created(&txn, MEMBER_ROLE, "Member").await?;
    if created {
        grant_missing(&txn, member.id, &ids_of(MEMBER_PERMISSIONS)).await?;
    }

    txn.commit().await?;
    Ok(())
}

async fn ensure_role<C: ConnectionTrait>(db: &C, slug: &str, name: &str) -> AppResult<roles::Model> {
    Ok(ensure_role_created(db, slug, name).await?.0)
}

async fn ensure_role_created<C: ConnectionTrait>(
    db: &C,
    slug: &str,
    name: &str,
) -> AppResult<(roles::Model, bool)> {
    if let Some(role) = roles::Entity::find()
        .filter(roles::Column::Slug.eq(slug))
        .one(db)
        .await?
    {
        return Ok((role, false));
    }

    let role = roles::ActiveModel {
        name: Set(name.to_string()),
        slug: Set(slug.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    log::info!("Seeded role {slug}");
    Ok((role, true))
}

async fn grant_missing<C: ConnectionTrait>(
    db: &C,
    role_id: i32,
    permission_ids: &[i32],
) -> AppResult<()> {
    let held: Vec<i32> = role_permissions::Entity::find()
        .filter(role_permissions::Column::RoleId.eq(role_id))
        .all(db)
        .await?
        .into_iter()
        .map(|link| link.permission_id)
        .collect();

    let links: Vec<role_permissions::ActiveModel> = permission_ids
        .iter()
        .filter(|id| !held.contains(id))
        .map(|&permission_id| role_permissions::ActiveModel {
            role_id: Set(role_id),
            permission_id: Set(permission_id),
        })
        .collect();
    if links.is_empty() {
        return Ok(());
    }

    role_permissions::Entity::insert_many(links)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::role_service::permissions_of_roles;
    use crate::test_support::setup_db;
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let db = setup_db().await;
        seed_defaults(&db).await.unwrap();
        seed_defaults(&db).await.unwrap();

        let count = permissions::Entity::find().count(&db).await.unwrap();
        assert_eq!(count as usize, Permission::ALL.len());

        let admin = roles::Entity::find()
            .filter(roles::Column::Slug.eq(ADMIN_ROLE))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        let granted = permissions_of_roles(&db, &[admin.id]).await.unwrap();
        assert_eq!(granted.len(), Permission::ALL.len());
    }

    #[tokio::test]
    async fn test_member_can_redeem() {
        let db = setup_db().await;
        seed_defaults(&db).await.unwrap();

        let member = roles::Entity::find()
            .filter(roles::Column::Slug.eq(MEMBER_ROLE))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        let slugs: Vec<String> = permissions_of_roles(&db, &[member.id])
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert!(slugs.contains(&"coupon.item-redeem".to_string()));
        assert!(!slugs.contains(&"user.item-delete".to_string()));
    }
}
