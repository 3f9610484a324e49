use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// File metadata. The binary itself lives wherever `link` points.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "attachments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub uuid: Uuid,
    pub title: String,
    pub alt: Option<String>,
    /// Owning module (`ax`, `product`, ...) and row id within it.
    pub module_name: String,
    pub module_id: i32,
    /// Slot within the owning module (`banner`, `gallery`, ...).
    pub type_name: String,
    pub ext: Option<String>,
    pub link: String,
    pub size: i64,
    pub sort: i32,
    pub status: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
