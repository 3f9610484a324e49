use crate::entities::role_entity as roles;
use crate::models::PermissionResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleBrief {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

impl From<roles::Model> for RoleBrief {
    fn from(role: roles::Model) -> Self {
        Self {
            id: role.id,
            name: role.name,
            slug: role.slug,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleResponse {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub permissions: Vec<PermissionResponse>,
}

impl RoleResponse {
    pub fn new(role: roles::Model, permissions: Vec<PermissionResponse>) -> Self {
        Self {
            id: role.id,
            name: role.name,
            slug: role.slug,
            created_at: role.created_at,
            updated_at: role.updated_at,
            permissions,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RolesQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub q: Option<String>,
    pub order_by: Option<String>,
    pub order_sort: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateRoleRequest {
    pub name: String,
    #[schema(example = "editor")]
    pub slug: String,
    pub permission_ids: Option<Vec<i32>>,
    pub permission_slugs: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub permission_ids: Option<Vec<i32>>,
    pub permission_slugs: Option<Vec<String>>,
}
