use crate::entities::attachment_entity as attachments;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::crud::{common_delete, common_update, find_or_not_found, paginate};
use crate::utils::normalize_optional;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

pub const DEFAULT_TYPE_NAME: &str = "default";

#[derive(Clone)]
pub struct AttachmentService {
    pool: DatabaseConnection,
}

impl AttachmentService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// Ordered by `sort`, then `id`.
    pub async fn attachments(
        &self,
        query: &AttachmentsQuery,
    ) -> AppResult<PaginatedResponse<AttachmentResponse>> {
        let params = PaginationParams::new(query.page, query.page_size);
        let mut select = attachments::Entity::find();

        if let Some(q) = normalize_optional(query.q.clone()) {
            select = select.filter(
                Condition::any()
                    .add(attachments::Column::Title.contains(&q))
                    .add(attachments::Column::Alt.contains(&q)),
            );
        }
        if let Some(module_name) = normalize_optional(query.module_name.clone()) {
            select = select.filter(attachments::Column::ModuleName.eq(module_name));
        }
        if let Some(module_id) = query.module_id {
            select = select.filter(attachments::Column::ModuleId.eq(module_id));
        }
        if let Some(type_name) = normalize_optional(query.type_name.clone()) {
            select = select.filter(attachments::Column::TypeName.eq(type_name));
        }

        let select = select
            .order_by_asc(attachments::Column::Sort)
            .order_by_asc(attachments::Column::Id);

        Ok(paginate(&self.pool, select, &params)
            .await?
            .map(AttachmentResponse::from))
    }

    pub async fn attachment(&self, id: i32) -> AppResult<AttachmentResponse> {
        let attachment =
            find_or_not_found::<attachments::Entity, _>(&self.pool, id, "Attachment").await?;
        Ok(attachment.into())
    }

    pub async fn create_attachment(
        &self,
        request: CreateAttachmentRequest,
    ) -> AppResult<AttachmentResponse> {
        let module_name = request.module_name.trim().to_string();
        if module_name.is_empty() || request.link.trim().is_empty() {
            return Err(AppError::ValidationError(
                "module_name and link are required".to_string(),
            ));
        }

        let attachment = attachments::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            title: Set(request.title),
            alt: Set(normalize_optional(request.alt)),
            module_name: Set(module_name),
            module_id: Set(request.module_id.unwrap_or(0)),
            type_name: Set(normalize_optional(request.type_name)
                .unwrap_or_else(|| DEFAULT_TYPE_NAME.to_string())),
            ext: Set(normalize_optional(request.ext)),
            link: Set(request.link.trim().to_string()),
            size: Set(request.size.unwrap_or(0)),
            sort: Set(request.sort.unwrap_or(0)),
            status: Set(request.status.unwrap_or(1)),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!("Attachment {} created for {}", attachment.uuid, attachment.module_name);
        Ok(attachment.into())
    }

    pub async fn update_attachment(
        &self,
        id: i32,
        request: UpdateAttachmentRequest,
    ) -> AppResult<AttachmentResponse> {
        let attachment =
            common_update::<attachments::Entity, _, _, _>(&self.pool, id, "Attachment", |am| {
                if let Some(title) = request.title {
                    am.title = Set(title);
                }
                if let Some(alt) = request.alt {
                    am.alt = Set(normalize_optional(Some(alt)));
                }
                if let Some(link) = request.link {
                    am.link = Set(link);
                }
                if let Some(sort) = request.sort {
                    am.sort = Set(sort);
                }
                if let Some(status) = request.status {
                    am.status = Set(status);
                }
                am.updated_at = Set(Some(Utc::now()));
            })
            .await?;

        Ok(attachment.into())
    }

    pub async fn delete_attachment(&self, id: i32) -> AppResult<AttachmentResponse> {
        let attachment = common_delete::<attachments::Entity, _>(&self.pool, id, "Attachment").await?;
        Ok(attachment.into())
    }

    pub async fn bind_attachments(
        &self,
        request: BindAttachmentsRequest,
    ) -> AppResult<Vec<AttachmentResponse>> {
        let txn = self.pool.begin().await?;
        let bound = bind_attachments(
            &txn,
            &request.module_name,
            request.module_id,
            request.type_name.as_deref(),
            &request.attachment_ids,
        )
        .await?;
        txn.commit().await?;

        Ok(bound.into_iter().map(Into::into).collect())
    }
}

/// Point `attachment_ids` at `module_name`/`module_id`; their list order becomes `sort`.
pub async fn bind_attachments<C: ConnectionTrait>(
    db: &C,
    module_name: &str,
    module_id: i32,
    type_name: Option<&str>,
    attachment_ids: &[i32],
) -> AppResult<Vec<attachments::Model>> {
    let module_name = module_name.trim();
    if module_name.is_empty() {
        return Err(AppError::ValidationError("module_name is required".to_string()));
    }

    let mut bound = Vec::with_capacity(attachment_ids.len());
    for (index, &id) in attachment_ids.iter().enumerate() {
        let mut am = find_or_not_found::<attachments::Entity, _>(db, id, "Attachment")
            .await?
            .into_active_model();
        am.module_name = Set(module_name.to_string());
        am.module_id = Set(module_id);
        if let Some(type_name) = type_name {
            am.type_name = Set(type_name.to_string());
        }
        am.sort = Set(index as i32);
        am.updated_at = Set(Some(Utc::now()));
        bound.push(am.update(db).await?);
    }

    log::info!(
        "Bound {} attachment(s) to {module_name} #{module_id}",
        bound.len()
    );
    Ok(bound)
}

pub async fn attachments_of<C: ConnectionTrait>(
    db: &C,
    module_name: &str,
    module_id: i32,
) -> AppResult<Vec<attachments::Model>> {
    Ok(attachments::Entity::find()
        .filter(attachments::Column::ModuleName.eq(module_name))
        .filter(attachments::Column::ModuleId.eq(module_id))
        .order_by_asc(attachments::Column::Sort)
        .order_by_asc(attachments::Column::Id)
        .all(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_db;

    fn upload(title: &str, sort: i32) -> CreateAttachmentRequest {
        CreateAttachmentRequest {
            title: title.to_string(),
            module_name: "ax".to_string(),
            link: format!("/attachments/{title}.jpg"),
            ext: Some("jpg".to_string()),
            sort: Some(sort),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_attachment_defaults() {
        let db = setup_db().await;
        let service = AttachmentService::new(db.clone());

        let a = service.create_attachment(upload("a", 0)).await.unwrap();
        assert_eq!(a.type_name, DEFAULT_TYPE_NAME);
        assert_eq!(a.module_id, 0);
        assert_eq!(a.status, 1);

        let b = service.create_attachment(upload("b", 0)).await.unwrap();
        assert_ne!(a.uuid, b.uuid);

        let missing_link = service
            .create_attachment(CreateAttachmentRequest {
                link: " ".to_string(),
                ..upload("c", 0)
            })
            .await;
        assert!(matches!(missing_link, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_bind_resequences_sort() {
        let db = setup_db().await;
        let service = AttachmentService::new(db.clone());
        let a = service.create_attachment(upload("a", 5)).await.unwrap();
        let b = service.create_attachment(upload("b", 9)).await.unwrap();

        let bound = service
            .bind_attachments(BindAttachmentsRequest {
                module_name: "ax".to_string(),
                module_id: 3,
                type_name: Some("banner".to_string()),
                attachment_ids: vec![b.id, a.id],
            })
            .await
            .unwrap();
        assert_eq!(bound[0].id, b.id);
        assert_eq!(bound[0].sort, 0);
        assert_eq!(bound[1].sort, 1);

        let listed = service
            .attachments(&AttachmentsQuery {
                module_name: Some("ax".to_string()),
                module_id: Some(3),
                type_name: Some("banner".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let ids: Vec<i32> = listed.items.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn test_bind_unknown_attachment_rolls_back() {
        let db = setup_db().await;
        let service = AttachmentService::new(db.clone());
        let a = service.create_attachment(upload("a", 0)).await.unwrap();

        let result = service
            .bind_attachments(BindAttachmentsRequest {
                module_name: "ax".to_string(),
                module_id: 3,
                type_name: None,
                attachment_ids: vec![a.id, 999],
            })
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let unchanged = service.attachment(a.id).await.unwrap();
        assert_eq!(unchanged.module_id, 0);
    }
}
