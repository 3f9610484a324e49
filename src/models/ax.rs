use crate::entities::ax_entity as axs;
use crate::models::AttachmentResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AxResponse {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub status: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<AttachmentResponse>>,
}

impl From<axs::Model> for AxResponse {
    fn from(ax: axs::Model) -> Self {
        Self {
            id: ax.id,
            title: ax.title,
            slug: ax.slug,
            description: ax.description,
            status: ax.status,
            created_at: ax.created_at,
            updated_at: ax.updated_at,
            attachments: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AxsQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub q: Option<String>,
    pub order_by: Option<String>,
    pub order_sort: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateAxRequest {
    pub title: String,
    #[schema(example = "home-banner")]
    pub slug: String,
    pub description: Option<String>,
    pub status: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateAxRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub status: Option<i32>,
    pub description: Option<String>,
    /// Attachment ids in display order; replaces the current set.
    pub attachment_ids: Option<Vec<i32>>,
}
