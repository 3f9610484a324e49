use crate::authorization::{AuthUser, Permission, can};
use crate::entities::{attachment_entity as attachments, ax_entity as axs};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::attachment_service::{attachments_of, bind_attachments};
use crate::utils::crud::{apply_order, find_or_not_found, paginate};
use crate::utils::{normalize_optional, validate_slug};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryFilter, Set, TransactionTrait,
};

pub const AX_MODULE_NAME: &str = "ax";

#[derive(Clone)]
pub struct AxService {
    pool: DatabaseConnection,
}

impl AxService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn axs(
        &self,
        query: &AxsQuery,
        caller: Option<&AuthUser>,
    ) -> AppResult<PaginatedResponse<AxResponse>> {
        let params = PaginationParams::new(query.page, query.page_size);
        let mut select = axs::Entity::find();

        if let Some(q) = normalize_optional(query.q.clone()) {
            select = select.filter(
                Condition::any()
                    .add(axs::Column::Title.contains(&q))
                    .add(axs::Column::Slug.contains(&q)),
            );
        }
        if !can(caller, Permission::AxListReadAllStatus) {
            select = select.filter(axs::Column::Status.eq(1));
        }

        let select = apply_order(
            select,
            query.order_by.as_deref(),
            query.order_sort.as_deref(),
            axs::Column::Id,
        )?;

        Ok(paginate(&self.pool, select, &params).await?.map(AxResponse::from))
    }

    pub async fn ax(&self, id: i32, caller: Option<&AuthUser>) -> AppResult<AxResponse> {
        let mut select = axs::Entity::find_by_id(id);
        if !can(caller, Permission::AxItemReadAllStatus) {
            select = select.filter(axs::Column::Status.eq(1));
        }

        let ax = select
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Ax"))?;
        self.with_attachments(ax).await
    }

    pub async fn ax_by_slug(&self, slug: &str, caller: Option<&AuthUser>) -> AppResult<AxResponse> {
        let mut select = axs::Entity::find().filter(axs::Column::Slug.eq(slug));
        if !can(caller, Permission::AxItemReadAllStatus) {
            select = select.filter(axs::Column::Status.eq(1));
        }

        let ax = select
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Ax"))?;
        self.with_attachments(ax).await
    }

    pub async fn create_ax(&self, request: CreateAxRequest) -> AppResult<AxResponse> {
        validate_slug(&request.slug)?;
        self.ensure_slug_free(&request.slug, None).await?;

        let ax = axs::ActiveModel {
            title: Set(request.title),
            slug: Set(request.slug),
            description: Set(normalize_optional(request.description)),
            status: Set(request.status.unwrap_or(1)),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!("Ax {} created", ax.slug);
        self.with_attachments(ax).await
    }

    /// `attachment_ids`, when given, become the ax's attachments in that order.
    pub async fn update_ax(&self, id: i32, request: UpdateAxRequest) -> AppResult<AxResponse> {
        if let Some(slug) = &request.slug {
            validate_slug(slug)?;
            self.ensure_slug_free(slug, Some(id)).await?;
        }

        let txn = self.pool.begin().await?;
        let mut ax = find_or_not_found::<axs::Entity, _>(&txn, id, "Ax")
            .await?
            .into_active_model();
        if let Some(title) = request.title {
            ax.title = Set(title);
        }
        if let Some(slug) = request.slug {
            ax.slug = Set(slug);
        }
        if let Some(status) = request.status {
            ax.status = Set(status);
        }
        if let Some(description) = request.description {
            ax.description = Set(normalize_optional(Some(description)));
        }
        ax.updated_at = Set(Some(Utc::now()));
        let ax = ax.update(&txn).await?;

        if let Some(ids) = &request.attachment_ids {
            // Detach what is no longer listed, then bind the new set in order.
            attachments::Entity::update_many()
                .col_expr(attachments::Column::ModuleId, Expr::value(0))
                .filter(attachments::Column::ModuleName.eq(AX_MODULE_NAME))
                .filter(attachments::Column::ModuleId.eq(id))
                .filter(attachments::Column::Id.is_not_in(ids.clone()))
                .exec(&txn)
                .await?;
            bind_attachments(&txn, AX_MODULE_NAME, id, None, ids).await?;
        }
        txn.commit().await?;

        self.with_attachments(ax).await
    }

    pub async fn delete_ax(&self, id: i32) -> AppResult<AxResponse> {
        let ax = find_or_not_found::<axs::Entity, _>(&self.pool, id, "Ax").await?;
        let response = self.with_attachments(ax).await?;

        let txn = self.pool.begin().await?;
        attachments::Entity::delete_many()
            .filter(attachments::Column::ModuleName.eq(AX_MODULE_NAME))
            .filter(attachments::Column::ModuleId.eq(id))
            .exec(&txn)
            .await?;
        axs::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        log::info!("Ax #{id} deleted");
        Ok(response)
    }

    async fn with_attachments(&self, ax: axs::Model) -> AppResult<AxResponse> {
        let bound = attachments_of(&self.pool, AX_MODULE_NAME, ax.id).await?;
        let mut response = AxResponse::from(ax);
        response.attachments = Some(bound.into_iter().map(Into::into).collect());

        Ok(response)
    }

    async fn ensure_slug_free(&self, slug: &str, except_id: Option<i32>) -> AppResult<()> {
        let existing = axs::Entity::find()
            .filter(axs::Column::Slug.eq(slug))
            .one(&self.pool)
            .await?;

        match existing {
            Some(ax) if Some(ax.id) != except_id => Err(AppError::ValidationError(format!(
                "Ax slug already exists: {slug}"
            ))),
            _ => Ok(()),
        }
    }
}
