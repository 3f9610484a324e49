use crate::authorization::{AuthUser, Permission, can};
use crate::config::DemoConfig;
use crate::entities::{role_entity as roles, user_entity as users, user_role_entity as user_roles};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::role_service::{replace_user_roles, role_slugs_to_ids, roles_of_user};
use crate::utils::crud::{apply_order, find_or_not_found, paginate};
use crate::utils::{
    hash_password, normalize_optional, validate_email, validate_password, validate_phone,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, Set, TransactionTrait,
};
use std::collections::HashMap;

pub const DEMO_DATA_MESSAGE: &str = "PLEASE DONT MODIFY DEMO DATA";
const IN_USE: &str = "Email or phone already in use";

#[derive(Clone)]
pub struct UserService {
    pool: DatabaseConnection,
    demo: DemoConfig,
}

/// The fields whose change invalidates tokens issued earlier.
#[derive(Debug, PartialEq)]
struct AuditedFields {
    password: String,
    is_admin: bool,
    status: i32,
    role_ids: Vec<i32>,
}

impl AuditedFields {
    fn of(user: &users::Model, mut role_ids: Vec<i32>) -> Self {
        role_ids.sort_unstable();
        role_ids.dedup();
        Self {
            password: user.password.clone(),
            is_admin: user.is_admin,
            status: user.status,
            role_ids,
        }
    }

    fn changed(&self, other: &Self) -> Vec<&'static str> {
        let mut fields = vec![];
        if self.password != other.password {
            fields.push("password");
        }
        if self.is_admin != other.is_admin {
            fields.push("is_admin");
        }
        if self.status != other.status {
            fields.push("status");
        }
        if self.role_ids != other.role_ids {
            fields.push("roles");
        }
        fields
    }
}

impl UserService {
    pub fn new(pool: DatabaseConnection, demo: DemoConfig) -> Self {
        Self { pool, demo }
    }

    pub async fn users(
        &self,
        query: &UsersQuery,
        caller: Option<&AuthUser>,
    ) -> AppResult<PaginatedResponse<UserResponse>> {
        let params = PaginationParams::new(query.page, query.page_size);
        let mut select = users::Entity::find();

        if let Some(q) = normalize_optional(query.q.clone()) {
            select = select.filter(
                Condition::any()
                    .add(users::Column::Name.contains(&q))
                    .add(users::Column::Email.contains(&q)),
            );
        }

        if !can(caller, Permission::UserListReadAllStatus) {
            select = select.filter(users::Column::Status.eq(1));
        }

        let select = apply_order(
            select,
            query.order_by.as_deref(),
            query.order_sort.as_deref(),
            users::Column::Id,
        )?;
        let page = paginate(&self.pool, select, &params).await?;

        if !can(caller, Permission::RoleListRead) {
            return Ok(page.map(UserResponse::from));
        }

        let user_ids: Vec<i32> = page.items.iter().map(|u| u.id).collect();
        let mut grouped = roles_by_user(&self.pool, &user_ids).await?;

        Ok(page.map(|user| {
            let user_roles = grouped.remove(&user.id).unwrap_or_default();
            UserResponse::from(user).with_roles(user_roles.into_iter().map(Into::into).collect())
        }))
    }

    pub async fn user(&self, id: i32) -> AppResult<UserResponse> {
        let user = find_or_not_found::<users::Entity, _>(&self.pool, id, "User").await?;
        let user_roles = roles_of_user(&self.pool, id).await?;

        Ok(UserResponse::from(user).with_roles(user_roles.into_iter().map(Into::into).collect()))
    }

    pub async fn user_by_email(&self, email: &str) -> AppResult<UserResponse> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        self.user(user.id).await
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> AppResult<UserResponse> {
        let email = request.email.trim().to_lowercase();
        validate_email(&email)?;
        let phone = normalize_optional(request.phone);
        if let Some(phone) = &phone {
            validate_phone(phone)?;
        }
        validate_password(&request.password)?;
        self.ensure_unique(Some(&email), phone.as_deref(), None)
            .await?;

        let role_ids = self
            .resolve_role_ids(request.role_ids, request.role_slugs)
            .await?;
        let password = hash_password(&request.password)?;

        let txn = self.pool.begin().await?;
        let user = users::ActiveModel {
            email: Set(email),
            phone: Set(phone),
            name: Set(normalize_optional(request.name)),
            password: Set(password),
            is_admin: Set(request.is_admin.unwrap_or(false)),
            status: Set(request.status.unwrap_or(1)),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| AppError::on_unique_violation(e, IN_USE))?;

        if let Some(ids) = role_ids {
            replace_user_roles(&txn, user.id, &ids).await?;
        }
        txn.commit().await?;

        log::info!("User {} created", user.id);
        self.user(user.id).await
    }

    /// Apply `request` to user `id`.
    ///
    /// When the password, admin flag, status or role set changes, `last_token_at` is stamped
    /// with the new `updated_at`, which invalidates every token issued before this update.
    pub async fn update_user(
        &self,
        id: i32,
        request: UpdateUserRequest,
        caller: &AuthUser,
    ) -> AppResult<UserResponse> {
        let before = find_or_not_found::<users::Entity, _>(&self.pool, id, "User").await?;
        self.guard_demo_data(&before)?;

        let email = match request.email {
            Some(email) => {
                let email = email.trim().to_lowercase();
                validate_email(&email)?;
                Some(email)
            }
            None => None,
        };
        let phone = normalize_optional(request.phone);
        if let Some(phone) = &phone {
            validate_phone(phone)?;
        }
        self.ensure_unique(email.as_deref(), phone.as_deref(), Some(id))
            .await?;

        let role_ids = self
            .resolve_role_ids(request.role_ids, request.role_slugs)
            .await?;
        let password = match request.password {
            Some(password) => {
                validate_password(&password)?;
                Some(hash_password(&password)?)
            }
            None => None,
        };

        let before_role_ids: Vec<i32> = roles_of_user(&self.pool, id)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        let before_fields = AuditedFields::of(&before, before_role_ids.clone());

        let txn = self.pool.begin().await?;
        let mut active = before.into_active_model();
        if let Some(email) = email {
            active.email = Set(email);
        }
        if let Some(phone) = phone {
            active.phone = Set(Some(phone));
        }
        if let Some(name) = request.name {
            active.name = Set(normalize_optional(Some(name)));
        }
        if let Some(password) = password {
            active.password = Set(password);
        }
        if let Some(is_admin) = request.is_admin {
            active.is_admin = Set(is_admin);
        }
        if let Some(status) = request.status {
            active.status = Set(status);
        }
        active.updated_at = Set(Some(Utc::now()));
        let mut after = active
            .update(&txn)
            .await
            .map_err(|e| AppError::on_unique_violation(e, IN_USE))?;

        if let Some(ids) = &role_ids {
            replace_user_roles(&txn, id, ids).await?;
        }

        let after_fields = AuditedFields::of(&after, role_ids.unwrap_or(before_role_ids));
        let changed = before_fields.changed(&after_fields);
        if !changed.is_empty() {
            let stamp = after.updated_at;
            let mut active = after.into_active_model();
            active.last_token_at = Set(stamp);
            after = active.update(&txn).await?;
            log::info!(
                "User {} changed {:?} by {}; earlier tokens revoked",
                id,
                changed,
                caller.id()
            );
        }
        txn.commit().await?;

        log::debug!("User {} updated at {:?}", after.id, after.updated_at);
        self.user(id).await
    }

    pub async fn delete_user(&self, id: i32) -> AppResult<UserResponse> {
        let user = find_or_not_found::<users::Entity, _>(&self.pool, id, "User").await?;
        self.guard_demo_data(&user)?;

        let txn = self.pool.begin().await?;
        user_roles::Entity::delete_many()
            .filter(user_roles::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        users::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        log::info!("User {id} deleted");
        Ok(user.into())
    }

    /// Add the role `role_slug` to the user with `email`, keeping the roles they already hold.
    /// Used from the command line to bootstrap the first administrator.
    pub async fn grant_role(&self, email: &str, role_slug: &str) -> AppResult<UserResponse> {
        let email = email.trim().to_lowercase();
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(&email))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;
        let granted = role_slugs_to_ids(&self.pool, &[role_slug.to_string()]).await?;

        let mut role_ids: Vec<i32> = roles_of_user(&self.pool, user.id)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        if granted.iter().all(|id| role_ids.contains(id)) {
            return self.user(user.id).await;
        }
        role_ids.extend(granted);

        let txn = self.pool.begin().await?;
        replace_user_roles(&txn, user.id, &role_ids).await?;
        let now = Utc::now();
        let mut active = user.into_active_model();
        active.last_token_at = Set(Some(now));
        active.updated_at = Set(Some(now));
        let user = active.update(&txn).await?;
        txn.commit().await?;

        log::info!("Granted role {role_slug} to user {}", user.id);
        self.user(user.id).await
    }

    /// Demo deployments refuse writes to the protected seed account whatever the caller holds.
    pub fn guard_demo_data(&self, user: &users::Model) -> AppResult<()> {
        if self.demo.guards_writes() && user.email == self.demo.protected_email {
            log::warn!("Refused write to demo account {}", user.email);
            return Err(AppError::error(DEMO_DATA_MESSAGE));
        }

        Ok(())
    }

    async fn resolve_role_ids(
        &self,
        ids: Option<Vec<i32>>,
        slugs: Option<Vec<String>>,
    ) -> AppResult<Option<Vec<i32>>> {
        let ids = match (ids, slugs) {
            (_, Some(slugs)) => role_slugs_to_ids(&self.pool, &slugs).await?,
            (Some(ids), None) => ids,
            (None, None) => return Ok(None),
        };

        let mut ids = ids;
        ids.sort_unstable();
        ids.dedup();

        if !ids.is_empty() {
            let found = roles::Entity::find()
                .filter(roles::Column::Id.is_in(ids.clone()))
                .all(&self.pool)
                .await?;
            if found.len() != ids.len() {
                return Err(AppError::ValidationError("Unknown role id".to_string()));
            }
        }

        Ok(Some(ids))
    }

    async fn ensure_unique(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
        except_id: Option<i32>,
    ) -> AppResult<()> {
        if email.is_none() && phone.is_none() {
            return Ok(());
        }

        let mut condition = Condition::any();
        if let Some(email) = email {
            condition = condition.add(users::Column::Email.eq(email));
        }
        if let Some(phone) = phone {
            condition = condition.add(users::Column::Phone.eq(phone));
        }

        let mut select = users::Entity::find().filter(condition);
        if let Some(id) = except_id {
            select = select.filter(users::Column::Id.ne(id));
        }

        if select.one(&self.pool).await?.is_some() {
            return Err(AppError::ValidationError(IN_USE.to_string()));
        }

        Ok(())
    }
}

async fn roles_by_user<C: ConnectionTrait>(
    db: &C,
    user_ids: &[i32],
) -> AppResult<HashMap<i32, Vec<roles::Model>>> {
    let mut grouped: HashMap<i32, Vec<roles::Model>> = HashMap::new();
    if user_ids.is_empty() {
        return Ok(grouped);
    }

    let links = user_roles::Entity::find()
        .filter(user_roles::Column::UserId.is_in(user_ids.to_vec()))
        .all(db)
        .await?;
    if links.is_empty() {
        return Ok(grouped);
    }

    let role_ids: Vec<i32> = links.iter().map(|l| l.role_id).collect();
    let by_id: HashMap<i32, roles::Model> = roles::Entity::find()
        .filter(roles::Column::Id.is_in(role_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|r| (r.id, r))
        .collect();

    for link in links {
        if let Some(role) = by_id.get(&link.role_id) {
            grouped.entry(link.user_id).or_default().push(role.clone());
        }
    }

    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{assign_role, auth_user, insert_role, insert_user, setup_db};

    fn admin() -> AuthUser {
        auth_user(999, &[Permission::UserItemUpdate, Permission::UserItemDelete])
    }

    fn demo_on() -> DemoConfig {
        DemoConfig {
            enabled: true,
            ..Default::default()
        }
    }

    async fn last_token_at(db: &DatabaseConnection, id: i32) -> Option<chrono::DateTime<Utc>> {
        users::Entity::find_by_id(id)
            .one(db)
            .await
            .unwrap()
            .unwrap()
            .last_token_at
    }

    #[tokio::test]
    async fn test_changing_roles_stamps_last_token_at() {
        let db = setup_db().await;
        let user = insert_user(&db, "staff@leaa.com").await;
        let staff = insert_role(&db, "staff", &[]).await;
        let editor = insert_role(&db, "editor", &[]).await;
        assign_role(&db, user.id, staff.id).await;
        let service = UserService::new(db.clone(), DemoConfig::default());

        let updated = service
            .update_user(
                user.id,
                UpdateUserRequest {
                    role_ids: Some(vec![editor.id]),
                    ..Default::default()
                },
                &admin(),
            )
            .await
            .unwrap();

        let stamp = last_token_at(&db, user.id).await;
        assert!(stamp.is_some());
        assert_eq!(stamp, updated.updated_at);
        let slugs: Vec<String> = updated.roles.unwrap().into_iter().map(|r| r.slug).collect();
        assert_eq!(slugs, vec!["editor"]);
    }

    #[tokio::test]
    async fn test_changing_only_name_keeps_last_token_at() {
        let db = setup_db().await;
        let user = insert_user(&db, "staff@leaa.com").await;
        let staff = insert_role(&db, "staff", &[]).await;
        assign_role(&db, user.id, staff.id).await;
        let service = UserService::new(db.clone(), DemoConfig::default());

        let updated = service
            .update_user(
                user.id,
                UpdateUserRequest {
                    name: Some("Renamed".to_string()),
                    // same role set as before
                    role_ids: Some(vec![staff.id]),
                    ..Default::default()
                },
                &admin(),
            )
            .await
            .unwrap();

        assert_eq!(updated.name.as_deref(), Some("Renamed"));
        assert!(last_token_at(&db, user.id).await.is_none());
    }

    #[tokio::test]
    async fn test_status_change_is_audited() {
        let db = setup_db().await;
        let user = insert_user(&db, "staff@leaa.com").await;
        let service = UserService::new(db.clone(), DemoConfig::default());

        service
            .update_user(
                user.id,
                UpdateUserRequest {
                    status: Some(0),
                    ..Default::default()
                },
                &admin(),
            )
            .await
            .unwrap();

        assert!(last_token_at(&db, user.id).await.is_some());
    }

    #[tokio::test]
    async fn test_demo_guard_blocks_protected_account() {
        let db = setup_db().await;
        let seed = insert_user(&db, "admin@leaa.com").await;
        let other = insert_user(&db, "other@leaa.com").await;
        let service = UserService::new(db.clone(), demo_on());

        let update = service
            .update_user(
                seed.id,
                UpdateUserRequest {
                    name: Some("hacked".to_string()),
                    ..Default::default()
                },
                &admin(),
            )
            .await;
        assert!(matches!(update, Err(AppError::Error(ref m)) if m == DEMO_DATA_MESSAGE));

        let delete = service.delete_user(seed.id).await;
        assert!(matches!(delete, Err(AppError::Error(ref m)) if m == DEMO_DATA_MESSAGE));

        let unchanged = service.user(seed.id).await.unwrap();
        assert_eq!(unchanged.name.as_deref(), Some("admin"));

        // other accounts are unaffected
        assert!(service.delete_user(other.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_demo_guard_lifted_by_override() {
        let db = setup_db().await;
        let seed = insert_user(&db, "admin@leaa.com").await;
        let demo = DemoConfig {
            allow_mutation: true,
            ..demo_on()
        };
        let service = UserService::new(db.clone(), demo);

        assert!(service.delete_user(seed.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_users_listing_gates() {
        let db = setup_db().await;
        let active = insert_user(&db, "active@leaa.com").await;
        let disabled = insert_user(&db, "disabled@leaa.com").await;
        let role = insert_role(&db, "staff", &[]).await;
        assign_role(&db, active.id, role.id).await;
        let mut am = disabled.into_active_model();
        am.status = Set(0);
        am.update(&db).await.unwrap();
        let service = UserService::new(db.clone(), DemoConfig::default());

        let reader = auth_user(100, &[Permission::UserListRead]);
        let page = service
            .users(&UsersQuery::default(), Some(&reader))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert!(page.items[0].roles.is_none());

        let full = auth_user(
            101,
            &[
                Permission::UserListRead,
                Permission::UserListReadAllStatus,
                Permission::RoleListRead,
            ],
        );
        let page = service
            .users(&UsersQuery::default(), Some(&full))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].roles.as_ref().unwrap().len(), 1);
        assert!(page.items[1].roles.as_ref().unwrap().is_empty());

        let searched = service
            .users(
                &UsersQuery {
                    q: Some("disabled".to_string()),
                    ..Default::default()
                },
                Some(&full),
            )
            .await
            .unwrap();
        assert_eq!(searched.total, 1);
    }

    #[tokio::test]
    async fn test_create_user_with_role_slugs() {
        let db = setup_db().await;
        insert_role(&db, "member", &[]).await;
        let service = UserService::new(db.clone(), DemoConfig::default());

        let created = service
            .create_user(CreateUserRequest {
                email: "New@Leaa.com".to_string(),
                password: "Password123".to_string(),
                role_slugs: Some(vec!["member".to_string()]),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.email, "new@leaa.com");
        assert_eq!(created.status, 1);
        assert_eq!(created.roles.unwrap()[0].slug, "member");

        let dup = service
            .create_user(CreateUserRequest {
                email: "new@leaa.com".to_string(),
                password: "Password123".to_string(),
                ..Default::default()
            })
            .await;
        assert!(matches!(dup, Err(AppError::ValidationError(_))));

        let found = service.user_by_email("new@leaa.com").await.unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn test_grant_role_keeps_existing_roles() {
        let db = setup_db().await;
        let user = insert_user(&db, "owner@leaa.com").await;
        let member = insert_role(&db, "member", &[]).await;
        insert_role(&db, "admin", &[]).await;
        assign_role(&db, user.id, member.id).await;
        let service = UserService::new(db.clone(), DemoConfig::default());

        let granted = service.grant_role("Owner@leaa.com", "admin").await.unwrap();
        let mut slugs: Vec<String> = granted.roles.unwrap().into_iter().map(|r| r.slug).collect();
        slugs.sort();
        assert_eq!(slugs, vec!["admin", "member"]);
        assert!(last_token_at(&db, user.id).await.is_some());

        let unknown = service.grant_role("owner@leaa.com", "ghost").await;
        assert!(matches!(unknown, Err(AppError::ValidationError(_))));
    }
}
