use crate::entities::{category_entity as categories, product_category_entity as product_categories};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::crud::{apply_order, common_delete, common_update, find_or_not_found, paginate};
use crate::utils::{normalize_optional, validate_slug};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::collections::HashMap;

pub const ROOT_PARENT_ID: i32 = 0;

#[derive(Clone)]
pub struct CategoryService {
    pool: DatabaseConnection,
}

/// Nest `all` under `root_id`, keeping each level in input order.
pub fn build_tree(all: Vec<categories::Model>, root_id: i32) -> Vec<CategoryTreeNode> {
    let mut by_parent: HashMap<i32, Vec<categories::Model>> = HashMap::new();
    for category in all {
        by_parent.entry(category.parent_id).or_default().push(category);
    }

    fn children_of(
        parent_id: i32,
        by_parent: &mut HashMap<i32, Vec<categories::Model>>,
    ) -> Vec<CategoryTreeNode> {
        let Some(level) = by_parent.remove(&parent_id) else {
            return vec![];
        };

        level
            .into_iter()
            .map(|c| CategoryTreeNode {
                children: children_of(c.id, by_parent),
                id: c.id,
                parent_id: c.parent_id,
                name: c.name,
                slug: c.slug,
            })
            .collect()
    }

    children_of(root_id, &mut by_parent)
}

impl CategoryService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn categories(
        &self,
        query: &CategoriesQuery,
    ) -> AppResult<PaginatedResponse<CategoryResponse>> {
        let params = PaginationParams::new(query.page, query.page_size);
        let mut select = categories::Entity::find();

        if let Some(q) = normalize_optional(query.q.clone()) {
            select = select.filter(
                Condition::any()
                    .add(categories::Column::Name.contains(&q))
                    .add(categories::Column::Slug.contains(&q)),
            );
        }
        if let Some(parent_id) = query.parent_id {
            select = select.filter(categories::Column::ParentId.eq(parent_id));
        }

        let select = apply_order(
            select,
            query.order_by.as_deref(),
            query.order_sort.as_deref(),
            categories::Column::Id,
        )?;

        Ok(paginate(&self.pool, select, &params)
            .await?
            .map(CategoryResponse::from))
    }

    pub async fn category_tree(&self, parent_slug: Option<&str>) -> AppResult<Vec<CategoryTreeNode>> {
        let root_id = match parent_slug.map(str::trim).filter(|s| !s.is_empty()) {
            Some(slug) => self.find_by_slug(slug).await?.id,
            None => ROOT_PARENT_ID,
        };

        let all = categories::Entity::find()
            .order_by_asc(categories::Column::Id)
            .all(&self.pool)
            .await?;

        Ok(build_tree(all, root_id))
    }

    pub async fn category(&self, id: i32) -> AppResult<CategoryResponse> {
        let category = find_or_not_found::<categories::Entity, _>(&self.pool, id, "Category").await?;
        Ok(category.into())
    }

    pub async fn category_by_slug(&self, slug: &str) -> AppResult<CategoryResponse> {
        Ok(self.find_by_slug(slug).await?.into())
    }

    pub async fn create_category(
        &self,
        request: CreateCategoryRequest,
    ) -> AppResult<CategoryResponse> {
        validate_slug(&request.slug)?;
        self.ensure_slug_free(&request.slug, None).await?;

        let parent_id = request.parent_id.unwrap_or(ROOT_PARENT_ID);
        self.ensure_parent_exists(parent_id).await?;

        let category = categories::ActiveModel {
            parent_id: Set(parent_id),
            name: Set(request.name),
            slug: Set(request.slug),
            description: Set(normalize_optional(request.description)),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!("Category {} created", category.slug);
        Ok(category.into())
    }

    pub async fn update_category(
        &self,
        id: i32,
        request: UpdateCategoryRequest,
    ) -> AppResult<CategoryResponse> {
        if let Some(slug) = &request.slug {
            validate_slug(slug)?;
            self.ensure_slug_free(slug, Some(id)).await?;
        }
        if let Some(parent_id) = request.parent_id {
            self.ensure_valid_parent(id, parent_id).await?;
        }

        let category =
            common_update::<categories::Entity, _, _, _>(&self.pool, id, "Category", |am| {
                if let Some(parent_id) = request.parent_id {
                    am.parent_id = Set(parent_id);
                }
                if let Some(name) = request.name {
                    am.name = Set(name);
                }
                if let Some(slug) = request.slug {
                    am.slug = Set(slug);
                }
                if let Some(description) = request.description {
                    am.description = Set(normalize_optional(Some(description)));
                }
                am.updated_at = Set(Some(Utc::now()));
            })
            .await?;

        Ok(category.into())
    }

    pub async fn delete_category(&self, id: i32) -> AppResult<CategoryResponse> {
        let children = categories::Entity::find()
            .filter(categories::Column::ParentId.eq(id))
            .count(&self.pool)
            .await?;
        if children > 0 {
            return Err(AppError::error("Category has children"));
        }

        let txn = self.pool.begin().await?;
        product_categories::Entity::delete_many()
            .filter(product_categories::Column::CategoryId.eq(id))
            .exec(&txn)
            .await?;
        let category = common_delete::<categories::Entity, _>(&txn, id, "Category").await?;
        txn.commit().await?;

        Ok(category.into())
    }

    async fn find_by_slug(&self, slug: &str) -> AppResult<categories::Model> {
        categories::Entity::find()
            .filter(categories::Column::Slug.eq(slug))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Category"))
    }

    async fn ensure_parent_exists(&self, parent_id: i32) -> AppResult<()> {
        if parent_id != ROOT_PARENT_ID {
            find_or_not_found::<categories::Entity, _>(&self.pool, parent_id, "Parent category")
                .await?;
        }

        Ok(())
    }

    /// A category may not hang below itself, directly or through its descendants.
    async fn ensure_valid_parent(&self, id: i32, parent_id: i32) -> AppResult<()> {
        self.ensure_parent_exists(parent_id).await?;

        let parents: HashMap<i32, i32> = categories::Entity::find()
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|c| (c.id, c.parent_id))
            .collect();

        let mut cursor = parent_id;
        let mut steps = 0;
        while cursor != ROOT_PARENT_ID && steps <= parents.len() {
            if cursor == id {
                return Err(AppError::ValidationError(
                    "A category cannot be its own parent".to_string(),
                ));
            }
            cursor = parents.get(&cursor).copied().unwrap_or(ROOT_PARENT_ID);
            steps += 1;
        }

        Ok(())
    }

    async fn ensure_slug_free(&self, slug: &str, except_id: Option<i32>) -> AppResult<()> {
        match self.find_by_slug(slug).await {
            Ok(existing) if Some(existing.id) != except_id => Err(AppError::ValidationError(
                format!("Category slug already exists: {slug}"),
            )),
            Ok(_) | Err(AppError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_category, setup_db};

    fn create(slug: &str, parent_id: Option<i32>) -> CreateCategoryRequest {
        CreateCategoryRequest {
            parent_id,
            name: slug.to_string(),
            slug: slug.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_category_tree_nests_children() {
        let db = setup_db().await;
        let clothes = insert_category(&db, 0, "clothes").await;
        let shoes = insert_category(&db, 0, "shoes").await;
        let shirts = insert_category(&db, clothes.id, "shirts").await;
        insert_category(&db, shirts.id, "t-shirts").await;
        insert_category(&db, shoes.id, "boots").await;
        let service = CategoryService::new(db.clone());

        let tree = service.category_tree(None).await.unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].slug, "clothes");
        assert_eq!(tree[0].children[0].slug, "shirts");
        assert_eq!(tree[0].children[0].children[0].slug, "t-shirts");
        assert_eq!(tree[1].children[0].slug, "boots");

        let subtree = service.category_tree(Some("clothes")).await.unwrap();
        assert_eq!(subtree.len(), 1);
        assert_eq!(subtree[0].slug, "shirts");

        assert!(matches!(
            service.category_tree(Some("ghost")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_category_cannot_be_its_own_ancestor() {
        let db = setup_db().await;
        let root = insert_category(&db, 0, "root").await;
        let child = insert_category(&db, root.id, "child").await;
        let service = CategoryService::new(db.clone());

        let own = service
            .update_category(
                root.id,
                UpdateCategoryRequest {
                    parent_id: Some(root.id),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(own, Err(AppError::ValidationError(_))));

        let cycle = service
            .update_category(
                root.id,
                UpdateCategoryRequest {
                    parent_id: Some(child.id),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(cycle, Err(AppError::ValidationError(_))));

        let moved = service
            .update_category(
                child.id,
                UpdateCategoryRequest {
                    parent_id: Some(0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.parent_id, 0);
    }

    #[tokio::test]
    async fn test_create_and_delete_category() {
        let db = setup_db().await;
        let service = CategoryService::new(db.clone());

        let parent = service.create_category(create("parent", None)).await.unwrap();
        let child = service
            .create_category(create("child", Some(parent.id)))
            .await
            .unwrap();
        assert_eq!(child.parent_id, parent.id);

        assert!(matches!(
            service.create_category(create("child", None)).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            service.create_category(create("orphan", Some(999))).await,
            Err(AppError::NotFound(_))
        ));

        assert!(matches!(
            service.delete_category(parent.id).await,
            Err(AppError::Error(_))
        ));
        service.delete_category(child.id).await.unwrap();
        service.delete_category(parent.id).await.unwrap();

        assert!(matches!(
            service.category_by_slug("parent").await,
            Err(AppError::NotFound(_))
        ));
    }
}
