use crate::entities::attachment_entity as attachments;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttachmentResponse {
    pub id: i32,
    pub uuid: Uuid,
    pub title: String,
    pub alt: Option<String>,
    pub module_name: String,
    pub module_id: i32,
    pub type_name: String,
    pub ext: Option<String>,
    pub link: String,
    pub size: i64,
    pub sort: i32,
    pub status: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<attachments::Model> for AttachmentResponse {
    fn from(a: attachments::Model) -> Self {
        Self {
            id: a.id,
            uuid: a.uuid,
            title: a.title,
            alt: a.alt,
            module_name: a.module_name,
            module_id: a.module_id,
            type_name: a.type_name,
            ext: a.ext,
            link: a.link,
            size: a.size,
            sort: a.sort,
            status: a.status,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AttachmentsQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub q: Option<String>,
    pub module_name: Option<String>,
    pub module_id: Option<i32>,
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateAttachmentRequest {
    pub title: String,
    pub alt: Option<String>,
    #[schema(example = "ax")]
    pub module_name: String,
    pub module_id: Option<i32>,
    #[schema(example = "banner")]
    pub type_name: Option<String>,
    pub ext: Option<String>,
    pub link: String,
    pub size: Option<i64>,
    pub sort: Option<i32>,
    pub status: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateAttachmentRequest {
    pub title: Option<String>,
    pub alt: Option<String>,
    pub link: Option<String>,
    pub sort: Option<i32>,
    pub status: Option<i32>,
}

/// Re-point a set of attachments at one module row; list order becomes `sort`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BindAttachmentsRequest {
    pub module_name: String,
    pub module_id: i32,
    pub type_name: Option<String>,
    pub attachment_ids: Vec<i32>,
}
