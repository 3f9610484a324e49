//! Fixtures for unit tests: an in-memory SQLite database built from the entity definitions.

use crate::authorization::{AuthUser, Permission};
use crate::entities::{
    attachment_entity as attachments, ax_entity as axs, category_entity as categories,
    coupon_entity as coupons, permission_entity as permissions,
    product_category_entity as product_categories, product_entity as products,
    role_entity as roles, role_permission_entity as role_permissions,
    user_entity as users, user_role_entity as user_roles,
};
use crate::utils::JwtService;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    DbBackend, EntityTrait, QueryFilter, Schema, Set,
};

pub const TEST_PASSWORD: &str = "Password123";

pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    // A second connection would open a second, empty in-memory database.
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.expect("connect sqlite");

    let schema = Schema::new(DbBackend::Sqlite);
    let backend = db.get_database_backend();
    let statements = [
        schema.create_table_from_entity(users::Entity),
        schema.create_table_from_entity(roles::Entity),
        schema.create_table_from_entity(permissions::Entity),
        schema.create_table_from_entity(user_roles::Entity),
        schema.create_table_from_entity(role_permissions::Entity),
        schema.create_table_from_entity(coupons::Entity),
        schema.create_table_from_entity(products::Entity),
        schema.create_table_from_entity(categories::Entity),
        schema.create_table_from_entity(product_categories::Entity),
        schema.create_table_from_entity(attachments::Entity),
        schema.create_table_from_entity(axs::Entity),
    ];
    for statement in statements {
        db.execute(backend.build(&statement))
            .await
            .expect("create table");
    }

    db
}

pub fn user_model(id: i32, email: &str) -> users::Model {
    users::Model {
        id,
        email: email.to_string(),
        phone: None,
        name: Some("tester".to_string()),
        password: String::new(),
        is_admin: false,
        status: 1,
        last_token_at: None,
        created_at: Utc::now(),
        updated_at: None,
    }
}

pub fn auth_user(id: i32, permissions: &[Permission]) -> AuthUser {
    AuthUser::new(
        user_model(id, &format!("user{id}@leaa.com")),
        vec![],
        permissions.iter().copied(),
    )
}

pub async fn insert_user(db: &DatabaseConnection, email: &str) -> users::Model {
    users::ActiveModel {
        email: Set(email.to_string()),
        name: Set(Some(email.split('@').next().unwrap_or("user").to_string())),
        // Low cost keeps the suite fast; verification works for any cost.
        password: Set(bcrypt::hash(TEST_PASSWORD, 4).expect("hash")),
        is_admin: Set(false),
        status: Set(1),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert user")
}

/// Create (or reuse) one permission row per slug and a role granting all of them.
pub async fn insert_role(
    db: &DatabaseConnection,
    slug: &str,
    grants: &[Permission],
) -> roles::Model {
    let role = roles::ActiveModel {
        name: Set(slug.to_string()),
        slug: Set(slug.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert role");

    for grant in grants {
        let existing = permissions::Entity::find()
            .filter(permissions::Column::Slug.eq(grant.slug()))
            .one(db)
            .await
            .expect("find permission");
        let permission = match existing {
            Some(p) => p,
            None => permissions::ActiveModel {
                name: Set(grant.slug().to_string()),
                slug: Set(grant.slug().to_string()),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(db)
            .await
            .expect("insert permission"),
        };

        role_permissions::ActiveModel {
            role_id: Set(role.id),
            permission_id: Set(permission.id),
        }
        .insert(db)
        .await
        .expect("link permission");
    }

    role
}

pub async fn assign_role(db: &DatabaseConnection, user_id: i32, role_id: i32) {
    user_roles::ActiveModel {
        user_id: Set(user_id),
        role_id: Set(role_id),
    }
    .insert(db)
    .await
    .expect("assign role");
}

pub struct CouponFixture {
    pub code: String,
    pub status: i32,
    pub user_id: Option<i32>,
    pub start_time: Option<DateTime<Utc>>,
    pub expire_time: Option<DateTime<Utc>>,
}

impl CouponFixture {
    /// Enabled, unredeemed and currently inside its redemption window.
    pub fn redeemable(code: &str) -> Self {
        let now = Utc::now();
        Self {
            code: code.to_string(),
            status: 1,
            user_id: None,
            start_time: Some(now - Duration::days(1)),
            expire_time: Some(now + Duration::days(1)),
        }
    }
}

pub async fn insert_coupon(db: &DatabaseConnection, fixture: CouponFixture) -> coupons::Model {
    coupons::ActiveModel {
        coupon_type: Set("coupon".to_string()),
        name: Set(Some(format!("coupon {}", fixture.code))),
        code: Set(fixture.code),
        amount: Set(500),
        over_amount: Set(0),
        quantity: Set(1),
        start_time: Set(fixture.start_time),
        expire_time: Set(fixture.expire_time),
        status: Set(fixture.status),
        user_id: Set(fixture.user_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert coupon")
}

pub async fn insert_category(
    db: &DatabaseConnection,
    parent_id: i32,
    slug: &str,
) -> categories::Model {
    categories::ActiveModel {
        parent_id: Set(parent_id),
        name: Set(slug.to_string()),
        slug: Set(slug.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert category")
}

pub async fn insert_product(db: &DatabaseConnection, serial: &str, status: i32) -> products::Model {
    products::ActiveModel {
        name: Set(format!("product {serial}")),
        serial: Set(serial.to_string()),
        price: Set(1999),
        stock: Set(10),
        status: Set(status),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert product")
}

pub fn jwt_service() -> JwtService {
    JwtService::new("test-secret", 3600, 86400)
}

/// `Authorization` header value carrying a fresh access token for `user_id`.
pub fn bearer(user_id: i32) -> (&'static str, String) {
    let token = jwt_service()
        .generate_access_token(user_id)
        .expect("sign token");
    ("Authorization", format!("Bearer {token}"))
}
