use crate::entities::user_entity as users;
use crate::models::RoleBrief;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub is_admin: bool,
    pub status: i32,
    pub last_token_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Present only when the caller may read roles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<RoleBrief>>,
}

impl From<users::Model> for UserResponse {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            phone: user.phone,
            name: user.name,
            is_admin: user.is_admin,
            status: user.status,
            last_token_at: user.last_token_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
            roles: None,
        }
    }
}

impl UserResponse {
    pub fn with_roles(mut self, roles: Vec<RoleBrief>) -> Self {
        self.roles = Some(roles);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UsersQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    /// Matches name or email (LIKE).
    pub q: Option<String>,
    pub order_by: Option<String>,
    pub order_sort: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[schema(example = "staff@leaa.com")]
    pub email: String,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub password: String,
    pub status: Option<i32>,
    pub is_admin: Option<bool>,
    pub role_ids: Option<Vec<i32>>,
    pub role_slugs: Option<Vec<String>>,
}

/// Every field is optional; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub status: Option<i32>,
    pub is_admin: Option<bool>,
    pub role_ids: Option<Vec<i32>>,
    pub role_slugs: Option<Vec<String>>,
}
