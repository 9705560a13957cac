use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_reference_tables::Migration),
            Box::new(m20250101_000002_create_catalog_tables::Migration),
            Box::new(m20250101_000003_create_operations_tables::Migration),
        ]
    }
}

fn id_col<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col).uuid().not_null().primary_key().to_owned()
}

fn timestamp_col<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

fn active_col<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .boolean()
        .not_null()
        .default(true)
        .to_owned()
}

fn money_col<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .decimal_len(14, 4)
        .not_null()
        .default(0)
        .to_owned()
}

// Lookup tables and accounts: everything an item or order may reference.
mod m20250101_000001_create_reference_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_reference_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(id_col(Users::Id))
                        .col(ColumnDef::new(Users::Username).string().not_null().unique_key())
                        .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::Role).string_len(64).not_null())
                        .col(ColumnDef::new(Users::BranchId).uuid().null())
                        .col(active_col(Users::IsActive))
                        .col(
                            ColumnDef::new(Users::LastLoginAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(timestamp_col(Users::CreatedAt))
                        .col(timestamp_col(Users::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Roles::Table)
                        .if_not_exists()
                        .col(id_col(Roles::Id))
                        .col(ColumnDef::new(Roles::Name).string_len(64).not_null().unique_key())
                        .col(ColumnDef::new(Roles::Description).string().null())
                        .col(ColumnDef::new(Roles::Permissions).json().not_null())
                        .col(timestamp_col(Roles::CreatedAt))
                        .col(timestamp_col(Roles::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Branches::Table)
                        .if_not_exists()
                        .col(id_col(Branches::Id))
                        .col(ColumnDef::new(Branches::Name).string().not_null())
                        .col(ColumnDef::new(Branches::Code).string().null())
                        .col(ColumnDef::new(Branches::Address).string().null())
                        .col(ColumnDef::new(Branches::Phone).string().null())
                        .col(active_col(Branches::IsActive))
                        .col(timestamp_col(Branches::CreatedAt))
                        .col(timestamp_col(Branches::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Brands::Table)
                        .if_not_exists()
                        .col(id_col(Brands::Id))
                        .col(ColumnDef::new(Brands::Name).string().not_null())
                        .col(ColumnDef::new(Brands::Description).string().null())
                        .col(ColumnDef::new(Brands::LogoUrl).string().null())
                        .col(active_col(Brands::IsActive))
                        .col(timestamp_col(Brands::CreatedAt))
                        .col(timestamp_col(Brands::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Currencies::Table)
                        .if_not_exists()
                        .col(id_col(Currencies::Id))
                        .col(
                            ColumnDef::new(Currencies::Code)
                                .string_len(3)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Currencies::Name).string().not_null())
                        .col(ColumnDef::new(Currencies::Symbol).string().null())
                        .col(
                            ColumnDef::new(Currencies::ExchangeRate)
                                .decimal_len(16, 8)
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(Currencies::IsDefault)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(timestamp_col(Currencies::CreatedAt))
                        .col(timestamp_col(Currencies::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Departments::Table)
                        .if_not_exists()
                        .col(id_col(Departments::Id))
                        .col(ColumnDef::new(Departments::Name).string().not_null())
                        .col(ColumnDef::new(Departments::BranchId).uuid().null())
                        .col(ColumnDef::new(Departments::Description).string().null())
                        .col(active_col(Departments::IsActive))
                        .col(timestamp_col(Departments::CreatedAt))
                        .col(timestamp_col(Departments::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Sections::Table)
                        .if_not_exists()
                        .col(id_col(Sections::Id))
                        .col(ColumnDef::new(Sections::Name).string().not_null())
                        .col(ColumnDef::new(Sections::BranchId).uuid().null())
                        .col(ColumnDef::new(Sections::DepartmentId).uuid().null())
                        .col(ColumnDef::new(Sections::Description).string().null())
                        .col(active_col(Sections::IsActive))
                        .col(timestamp_col(Sections::CreatedAt))
                        .col(timestamp_col(Sections::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Taxes::Table)
                        .if_not_exists()
                        .col(id_col(Taxes::Id))
                        .col(ColumnDef::new(Taxes::Name).string().not_null())
                        .col(ColumnDef::new(Taxes::Rate).decimal_len(7, 4).not_null())
                        .col(ColumnDef::new(Taxes::Description).string().null())
                        .col(active_col(Taxes::IsActive))
                        .col(timestamp_col(Taxes::CreatedAt))
                        .col(timestamp_col(Taxes::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Units::Table)
                        .if_not_exists()
                        .col(id_col(Units::Id))
                        .col(ColumnDef::new(Units::Name).string().not_null())
                        .col(ColumnDef::new(Units::Symbol).string().null())
                        .col(ColumnDef::new(Units::BaseUnit).string_len(16).not_null())
                        .col(ColumnDef::new(Units::UnitType).string().not_null())
                        .col(
                            ColumnDef::new(Units::ConversionFactor)
                                .decimal_len(14, 4)
                                .not_null()
                                .default(1),
                        )
                        .col(active_col(Units::IsActive))
                        .col(timestamp_col(Units::CreatedAt))
                        .col(timestamp_col(Units::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ItemCategories::Table)
                        .if_not_exists()
                        .col(id_col(ItemCategories::Id))
                        .col(ColumnDef::new(ItemCategories::NameEn).string().not_null())
                        .col(ColumnDef::new(ItemCategories::NameLocal).string().null())
                        .col(ColumnDef::new(ItemCategories::Description).string().null())
                        .col(ColumnDef::new(ItemCategories::ParentId).uuid().null())
                        .col(active_col(ItemCategories::IsActive))
                        .col(timestamp_col(ItemCategories::CreatedAt))
                        .col(timestamp_col(ItemCategories::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_item_categories_parent_id")
                        .table(ItemCategories::Table)
                        .col(ItemCategories::ParentId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Suppliers::Table)
                        .if_not_exists()
                        .col(id_col(Suppliers::Id))
                        .col(ColumnDef::new(Suppliers::Name).string().not_null())
                        .col(ColumnDef::new(Suppliers::ContactName).string().null())
                        .col(ColumnDef::new(Suppliers::Email).string().null())
                        .col(ColumnDef::new(Suppliers::Phone).string().null())
                        .col(ColumnDef::new(Suppliers::Address).string().null())
                        .col(ColumnDef::new(Suppliers::TaxNumber).string().null())
                        .col(active_col(Suppliers::IsActive))
                        .col(timestamp_col(Suppliers::CreatedAt))
                        .col(timestamp_col(Suppliers::UpdatedAt))
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Suppliers::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ItemCategories::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Units::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Taxes::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Sections::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Departments::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Currencies::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Brands::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Branches::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Roles::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        Username,
        Email,
        PasswordHash,
        Role,
        BranchId,
        IsActive,
        LastLoginAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Roles {
        Table,
        Id,
        Name,
        Description,
        Permissions,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Branches {
        Table,
        Id,
        Name,
        Code,
        Address,
        Phone,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Brands {
        Table,
        Id,
        Name,
        Description,
        LogoUrl,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Currencies {
        Table,
        Id,
        Code,
        Name,
        Symbol,
        ExchangeRate,
        IsDefault,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Departments {
        Table,
        Id,
        Name,
        BranchId,
        Description,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Sections {
        Table,
        Id,
        Name,
        BranchId,
        DepartmentId,
        Description,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Taxes {
        Table,
        Id,
        Name,
        Rate,
        Description,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Units {
        Table,
        Id,
        Name,
        Symbol,
        BaseUnit,
        UnitType,
        ConversionFactor,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ItemCategories {
        Table,
        Id,
        NameEn,
        NameLocal,
        Description,
        ParentId,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Suppliers {
        Table,
        Id,
        Name,
        ContactName,
        Email,
        Phone,
        Address,
        TaxNumber,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

// Items with their standalone packaging rows and supplier associations.
mod m20250101_000002_create_catalog_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Items::Table)
                        .if_not_exists()
                        .col(id_col(Items::Id))
                        .col(
                            ColumnDef::new(Items::ItemCode)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Items::NameEn).string().not_null())
                        .col(ColumnDef::new(Items::NameLocal).string().null())
                        .col(ColumnDef::new(Items::Description).text().null())
                        .col(ColumnDef::new(Items::BaseUnit).string_len(16).not_null())
                        .col(ColumnDef::new(Items::UnitId).uuid().not_null())
                        .col(ColumnDef::new(Items::CategoryId).uuid().not_null())
                        .col(ColumnDef::new(Items::SubCategoryId).uuid().not_null())
                        .col(ColumnDef::new(Items::TaxId).uuid().null())
                        .col(ColumnDef::new(Items::BrandId).uuid().null())
                        .col(ColumnDef::new(Items::BranchId).uuid().null())
                        .col(money_col(Items::UnitPrice))
                        .col(
                            ColumnDef::new(Items::PriceIncludesVat)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Items::BasePackaging).json().null())
                        .col(ColumnDef::new(Items::PackPackaging).json().null())
                        .col(ColumnDef::new(Items::ImageUrl).string().null())
                        .col(ColumnDef::new(Items::ImagePublicId).string().null())
                        .col(active_col(Items::IsActive))
                        .col(timestamp_col(Items::CreatedAt))
                        .col(timestamp_col(Items::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            for (name, col) in [
                ("idx_items_category_id", Items::CategoryId),
                ("idx_items_sub_category_id", Items::SubCategoryId),
                ("idx_items_unit_id", Items::UnitId),
            ] {
                manager
                    .create_index(
                        Index::create()
                            .if_not_exists()
                            .name(name)
                            .table(Items::Table)
                            .col(col)
                            .to_owned(),
                    )
                    .await?;
            }

            manager
                .create_table(
                    Table::create()
                        .table(Packagings::Table)
                        .if_not_exists()
                        .col(id_col(Packagings::Id))
                        .col(ColumnDef::new(Packagings::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(Packagings::PackagingType)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Packagings::Amount).decimal_len(14, 4).not_null())
                        .col(ColumnDef::new(Packagings::Unit).string().not_null())
                        .col(ColumnDef::new(Packagings::PackSize).decimal_len(14, 4).null())
                        .col(ColumnDef::new(Packagings::PackUnit).string().null())
                        .col(ColumnDef::new(Packagings::ParentPackagingId).uuid().null())
                        .col(ColumnDef::new(Packagings::BranchId).uuid().null())
                        .col(ColumnDef::new(Packagings::BrandId).uuid().null())
                        .col(active_col(Packagings::IsActive))
                        .col(timestamp_col(Packagings::CreatedAt))
                        .col(timestamp_col(Packagings::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_packagings_item_id")
                        .table(Packagings::Table)
                        .col(Packagings::ItemId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SupplierItems::Table)
                        .if_not_exists()
                        .col(id_col(SupplierItems::Id))
                        .col(ColumnDef::new(SupplierItems::SupplierId).uuid().not_null())
                        .col(ColumnDef::new(SupplierItems::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(SupplierItems::PackagingType)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(SupplierItems::PackagingId).uuid().null())
                        .col(active_col(SupplierItems::IsActive))
                        .col(timestamp_col(SupplierItems::CreatedAt))
                        .col(timestamp_col(SupplierItems::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            // Lookup index only; the same supplier may serve several slots of one item.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_supplier_items_item_supplier")
                        .table(SupplierItems::Table)
                        .col(SupplierItems::ItemId)
                        .col(SupplierItems::SupplierId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SupplierItems::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Packagings::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Items::Table).if_exists().to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Items {
        Table,
        Id,
        ItemCode,
        NameEn,
        NameLocal,
        Description,
        BaseUnit,
        UnitId,
        CategoryId,
        SubCategoryId,
        TaxId,
        BrandId,
        BranchId,
        UnitPrice,
        PriceIncludesVat,
        BasePackaging,
        PackPackaging,
        ImageUrl,
        ImagePublicId,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Packagings {
        Table,
        Id,
        ItemId,
        PackagingType,
        Amount,
        Unit,
        PackSize,
        PackUnit,
        ParentPackagingId,
        BranchId,
        BrandId,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum SupplierItems {
        Table,
        Id,
        SupplierId,
        ItemId,
        PackagingType,
        PackagingId,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

// Day-to-day operations: purchase orders, wastage, recipes and media.
mod m20250101_000003_create_operations_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_operations_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(id_col(Orders::Id))
                        .col(
                            ColumnDef::new(Orders::OrderNumber)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::BranchId).uuid().null())
                        .col(ColumnDef::new(Orders::SupplierId).uuid().null())
                        .col(ColumnDef::new(Orders::SectionId).uuid().null())
                        .col(ColumnDef::new(Orders::Status).string_len(16).not_null())
                        .col(ColumnDef::new(Orders::Notes).text().null())
                        .col(money_col(Orders::TotalAmount))
                        .col(ColumnDef::new(Orders::CreatedBy).uuid().null())
                        .col(timestamp_col(Orders::OrderedAt))
                        .col(timestamp_col(Orders::CreatedAt))
                        .col(timestamp_col(Orders::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderLines::Table)
                        .if_not_exists()
                        .col(id_col(OrderLines::Id))
                        .col(ColumnDef::new(OrderLines::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderLines::ItemId).uuid().not_null())
                        .col(ColumnDef::new(OrderLines::PackagingId).uuid().null())
                        .col(ColumnDef::new(OrderLines::Quantity).decimal_len(14, 4).not_null())
                        .col(money_col(OrderLines::UnitPrice))
                        .col(money_col(OrderLines::LineTotal))
                        .col(timestamp_col(OrderLines::CreatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_lines_order_id")
                        .table(OrderLines::Table)
                        .col(OrderLines::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Wastages::Table)
                        .if_not_exists()
                        .col(id_col(Wastages::Id))
                        .col(ColumnDef::new(Wastages::ItemId).uuid().not_null())
                        .col(ColumnDef::new(Wastages::BranchId).uuid().null())
                        .col(ColumnDef::new(Wastages::SectionId).uuid().null())
                        .col(ColumnDef::new(Wastages::Quantity).decimal_len(14, 4).not_null())
                        .col(ColumnDef::new(Wastages::Unit).string().null())
                        .col(ColumnDef::new(Wastages::Reason).string().null())
                        .col(money_col(Wastages::Cost))
                        .col(ColumnDef::new(Wastages::RecordedBy).uuid().null())
                        .col(timestamp_col(Wastages::WastedAt))
                        .col(timestamp_col(Wastages::CreatedAt))
                        .col(timestamp_col(Wastages::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_wastages_item_id")
                        .table(Wastages::Table)
                        .col(Wastages::ItemId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(RecipeExperts::Table)
                        .if_not_exists()
                        .col(id_col(RecipeExperts::Id))
                        .col(ColumnDef::new(RecipeExperts::Name).string().not_null())
                        .col(ColumnDef::new(RecipeExperts::Description).text().null())
                        .col(
                            ColumnDef::new(RecipeExperts::Portions)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(RecipeExperts::Ingredients).json().not_null())
                        .col(active_col(RecipeExperts::IsActive))
                        .col(timestamp_col(RecipeExperts::CreatedAt))
                        .col(timestamp_col(RecipeExperts::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(GalleryImages::Table)
                        .if_not_exists()
                        .col(id_col(GalleryImages::Id))
                        .col(ColumnDef::new(GalleryImages::Title).string().null())
                        .col(ColumnDef::new(GalleryImages::Url).string().not_null())
                        .col(ColumnDef::new(GalleryImages::PublicId).string().not_null())
                        .col(ColumnDef::new(GalleryImages::ContentType).string().not_null())
                        .col(
                            ColumnDef::new(GalleryImages::SizeBytes)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(GalleryImages::UploadedBy).uuid().null())
                        .col(timestamp_col(GalleryImages::CreatedAt))
                        .col(timestamp_col(GalleryImages::UpdatedAt))
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(GalleryImages::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(RecipeExperts::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Wastages::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderLines::Table).if_exists().to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).if_exists().to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        OrderNumber,
        BranchId,
        SupplierId,
        SectionId,
        Status,
        Notes,
        TotalAmount,
        CreatedBy,
        OrderedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderLines {
        Table,
        Id,
        OrderId,
        ItemId,
        PackagingId,
        Quantity,
        UnitPrice,
        LineTotal,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Wastages {
        Table,
        Id,
        ItemId,
        BranchId,
        SectionId,
        Quantity,
        Unit,
        Reason,
        Cost,
        RecordedBy,
        WastedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum RecipeExperts {
        Table,
        Id,
        Name,
        Description,
        Portions,
        Ingredients,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum GalleryImages {
        Table,
        Id,
        Title,
        Url,
        PublicId,
        ContentType,
        SizeBytes,
        UploadedBy,
        CreatedAt,
        UpdatedAt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Database;
    use tempfile::TempDir;

    #[tokio::test]
    async fn schema_applies_and_reverts_on_sqlite() {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("schema.sqlite").display());
        let db = Database::connect(&url).await.unwrap();

        Migrator::up(&db, None).await.unwrap();
        let manager = SchemaManager::new(&db);
        for table in ["currencies", "items", "packagings", "orders", "users"] {
            assert!(manager.has_table(table).await.unwrap(), "{table} missing");
        }

        Migrator::down(&db, None).await.unwrap();
        assert!(!manager.has_table("currencies").await.unwrap());
        Migrator::up(&db, None).await.unwrap();
        assert!(manager.has_table("currencies").await.unwrap());
    }
}
