use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    Phone,
    Name,
    Password,
    IsAdmin,
    Status,
    LastTokenAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Roles {
    Table,
    Id,
    Name,
    Slug,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Permissions {
    Table,
    Id,
    Name,
    Slug,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UsersRoles {
    Table,
    UserId,
    RoleId,
}

#[derive(DeriveIden)]
enum RolesPermissions {
    Table,
    RoleId,
    PermissionId,
}

#[derive(DeriveIden)]
enum Coupons {
    Table,
    Id,
    CouponType,
    Name,
    Code,
    Amount,
    OverAmount,
    Quantity,
    StartTime,
    ExpireTime,
    Status,
    UserId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    Name,
    Fullname,
    Serial,
    Price,
    CostPrice,
    MarketPrice,
    Stock,
    Description,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    ParentId,
    Name,
    Slug,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ProductsCategories {
    Table,
    ProductId,
    CategoryId,
}

#[derive(DeriveIden)]
enum Attachments {
    Table,
    Id,
    Uuid,
    Title,
    Alt,
    ModuleName,
    ModuleId,
    TypeName,
    Ext,
    Link,
    Size,
    Sort,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Axs {
    Table,
    Id,
    Title,
    Slug,
    Description,
    Status,
    CreatedAt,
    UpdatedAt,
}

fn id<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn created_at<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

fn updated_at<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col).timestamp_with_time_zone().null().to_owned()
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(&mut id(Users::Id))
                    .col(ColumnDef::new(Users::Email).string_len(255).not_null().unique_key())
                    .col(ColumnDef::new(Users::Phone).string_len(32).null().unique_key())
                    .col(ColumnDef::new(Users::Name).string_len(255).null())
                    .col(ColumnDef::new(Users::Password).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Users::IsAdmin)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Users::Status).integer().not_null().default(1))
                    .col(
                        ColumnDef::new(Users::LastTokenAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(&mut created_at(Users::CreatedAt))
                    .col(&mut updated_at(Users::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Roles::Table)
                    .if_not_exists()
                    .col(&mut id(Roles::Id))
                    .col(ColumnDef::new(Roles::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Roles::Slug).string_len(64).not_null().unique_key())
                    .col(&mut created_at(Roles::CreatedAt))
                    .col(&mut updated_at(Roles::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Permissions::Table)
                    .if_not_exists()
                    .col(&mut id(Permissions::Id))
                    .col(ColumnDef::new(Permissions::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Permissions::Slug)
                            .string_len(128)
                            .not_null()
                            .unique_key(),
                    )
                    .col(&mut created_at(Permissions::CreatedAt))
                    .col(&mut updated_at(Permissions::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UsersRoles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UsersRoles::UserId).integer().not_null())
                    .col(ColumnDef::new(UsersRoles::RoleId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(UsersRoles::UserId)
                            .col(UsersRoles::RoleId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_roles_user")
                            .from(UsersRoles::Table, UsersRoles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_roles_role")
                            .from(UsersRoles::Table, UsersRoles::RoleId)
                            .to(Roles::Table, Roles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RolesPermissions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(RolesPermissions::RoleId).integer().not_null())
                    .col(
                        ColumnDef::new(RolesPermissions::PermissionId)
                            .integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(RolesPermissions::RoleId)
                            .col(RolesPermissions::PermissionId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_roles_permissions_role")
                            .from(RolesPermissions::Table, RolesPermissions::RoleId)
                            .to(Roles::Table, Roles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_roles_permissions_permission")
                            .from(RolesPermissions::Table, RolesPermissions::PermissionId)
                            .to(Permissions::Table, Permissions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Coupons::Table)
                    .if_not_exists()
                    .col(&mut id(Coupons::Id))
                    .col(
                        ColumnDef::new(Coupons::CouponType)
                            .string_len(16)
                            .not_null()
                            .default("coupon"),
                    )
                    .col(ColumnDef::new(Coupons::Name).string_len(255).null())
                    .col(ColumnDef::new(Coupons::Code).string_len(32).not_null().unique_key())
                    .col(ColumnDef::new(Coupons::Amount).big_integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Coupons::OverAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Coupons::Quantity).integer().not_null().default(1))
                    .col(ColumnDef::new(Coupons::StartTime).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Coupons::ExpireTime).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Coupons::Status).integer().not_null().default(1))
                    // Redeeming user; no foreign key so coupons survive user deletion.
                    .col(ColumnDef::new(Coupons::UserId).integer().null())
                    .col(&mut created_at(Coupons::CreatedAt))
                    .col(&mut updated_at(Coupons::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_coupons_user_id")
                    .table(Coupons::Table)
                    .col(Coupons::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(&mut id(Products::Id))
                    .col(ColumnDef::new(Products::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Products::Fullname).string_len(255).null())
                    .col(ColumnDef::new(Products::Serial).string_len(64).not_null().unique_key())
                    .col(ColumnDef::new(Products::Price).big_integer().not_null().default(0))
                    .col(ColumnDef::new(Products::CostPrice).big_integer().null())
                    .col(ColumnDef::new(Products::MarketPrice).big_integer().null())
                    .col(ColumnDef::new(Products::Stock).integer().not_null().default(0))
                    .col(ColumnDef::new(Products::Description).text().null())
                    .col(ColumnDef::new(Products::Status).integer().not_null().default(1))
                    .col(&mut created_at(Products::CreatedAt))
                    .col(&mut updated_at(Products::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(&mut id(Categories::Id))
                    .col(
                        ColumnDef::new(Categories::ParentId)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Categories::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Categories::Slug).string_len(64).not_null().unique_key())
                    .col(ColumnDef::new(Categories::Description).text().null())
                    .col(&mut created_at(Categories::CreatedAt))
                    .col(&mut updated_at(Categories::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_categories_parent_id")
                    .table(Categories::Table)
                    .col(Categories::ParentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductsCategories::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ProductsCategories::ProductId).integer().not_null())
                    .col(ColumnDef::new(ProductsCategories::CategoryId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(ProductsCategories::ProductId)
                            .col(ProductsCategories::CategoryId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_categories_product")
                            .from(ProductsCategories::Table, ProductsCategories::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_categories_category")
                            .from(ProductsCategories::Table, ProductsCategories::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Attachments::Table)
                    .if_not_exists()
                    .col(&mut id(Attachments::Id))
                    .col(ColumnDef::new(Attachments::Uuid).uuid().not_null().unique_key())
                    .col(ColumnDef::new(Attachments::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Attachments::Alt).string_len(255).null())
                    .col(ColumnDef::new(Attachments::ModuleName).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Attachments::ModuleId)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Attachments::TypeName)
                            .string_len(64)
                            .not_null()
                            .default("default"),
                    )
                    .col(ColumnDef::new(Attachments::Ext).string_len(16).null())
                    .col(ColumnDef::new(Attachments::Link).string_len(1024).not_null())
                    .col(ColumnDef::new(Attachments::Size).big_integer().not_null().default(0))
                    .col(ColumnDef::new(Attachments::Sort).integer().not_null().default(0))
                    .col(ColumnDef::new(Attachments::Status).integer().not_null().default(1))
                    .col(&mut created_at(Attachments::CreatedAt))
                    .col(&mut updated_at(Attachments::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_attachments_module")
                    .table(Attachments::Table)
                    .col(Attachments::ModuleName)
                    .col(Attachments::ModuleId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Axs::Table)
                    .if_not_exists()
                    .col(&mut id(Axs::Id))
                    .col(ColumnDef::new(Axs::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Axs::Slug).string_len(64).not_null().unique_key())
                    .col(ColumnDef::new(Axs::Description).text().null())
                    .col(ColumnDef::new(Axs::Status).integer().not_null().default(1))
                    .col(&mut created_at(Axs::CreatedAt))
                    .col(&mut updated_at(Axs::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Join tables first so their foreign keys go before the tables they point at.
        for table in [
            ProductsCategories::Table.into_iden(),
            RolesPermissions::Table.into_iden(),
            UsersRoles::Table.into_iden(),
            Axs::Table.into_iden(),
            Attachments::Table.into_iden(),
            Categories::Table.into_iden(),
            Products::Table.into_iden(),
            Coupons::Table.into_iden(),
            Permissions::Table.into_iden(),
            Roles::Table.into_iden(),
            Users::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }

        Ok(())
    }
}
