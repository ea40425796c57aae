use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

fn id_col() -> ColumnDef {
    ColumnDef::new(Alias::new("id"))
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn fk(
    name: &str,
    table: &str,
    column: &str,
    target: &str,
    on_delete: ForeignKeyAction,
) -> ForeignKeyCreateStatement {
    ForeignKey::create()
        .name(name)
        .from(Alias::new(table), Alias::new(column))
        .to(Alias::new(target), Alias::new("id"))
        .on_delete(on_delete)
        .to_owned()
}

/// Tables in creation order; dropped in reverse
const TABLES: &[&str] = &[
    "star",
    "star_alias",
    "reference",
    "origin",
    "instrument",
    "source",
    "datatype",
    "property",
    "timeseries",
    "dataset",
    "dataset_map",
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Stars and their alias sets
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("star"))
                    .if_not_exists()
                    .col(id_col())
                    .col(
                        ColumnDef::new(Alias::new("name"))
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Alias::new("coord")).string().not_null())
                    .col(ColumnDef::new(Alias::new("ra_deg")).double().not_null())
                    .col(ColumnDef::new(Alias::new("dec_deg")).double().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Alias::new("star_alias"))
                    .if_not_exists()
                    .col(id_col())
                    .col(ColumnDef::new(Alias::new("star_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("alias_type")).string().not_null())
                    .col(ColumnDef::new(Alias::new("name")).string().not_null())
                    .foreign_key(&mut fk(
                        "fk_star_alias_star",
                        "star_alias",
                        "star_id",
                        "star",
                        ForeignKeyAction::Cascade,
                    ))
                    .to_owned(),
            )
            .await?;

        // Aliases are looked up case-insensitively, so the index is only a
        // partial help; it is not unique since the same alias may be
        // attached twice.
        manager
            .create_index(
                Index::create()
                    .name("idx_star_alias_name")
                    .table(Alias::new("star_alias"))
                    .col(Alias::new("name"))
                    .to_owned(),
            )
            .await?;

        // Provenance
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("reference"))
                    .if_not_exists()
                    .col(id_col())
                    .col(
                        ColumnDef::new(Alias::new("name"))
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Alias::new("bibline")).text().not_null())
                    .col(ColumnDef::new(Alias::new("bibcode")).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Alias::new("origin"))
                    .if_not_exists()
                    .col(id_col())
                    .col(
                        ColumnDef::new(Alias::new("name"))
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Alias::new("kind")).string().not_null())
                    .col(ColumnDef::new(Alias::new("url")).text().null())
                    .col(ColumnDef::new(Alias::new("description")).text().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Alias::new("instrument"))
                    .if_not_exists()
                    .col(id_col())
                    .col(
                        ColumnDef::new(Alias::new("name"))
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Alias::new("long_name")).string().not_null())
                    .col(ColumnDef::new(Alias::new("url")).text().not_null())
                    .col(ColumnDef::new(Alias::new("description")).text().not_null())
                    .to_owned(),
            )
            .await?;

        // (name, version) uniqueness is enforced by the registry because a
        // NULL version never collides in a unique index.
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("source"))
                    .if_not_exists()
                    .col(id_col())
                    .col(ColumnDef::new(Alias::new("name")).string().not_null())
                    .col(ColumnDef::new(Alias::new("kind")).string().not_null())
                    .col(ColumnDef::new(Alias::new("version")).string().null())
                    .col(ColumnDef::new(Alias::new("origin_id")).integer().not_null())
                    .col(
                        ColumnDef::new(Alias::new("parent_source_id"))
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("source_time"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(&mut fk(
                        "fk_source_origin",
                        "source",
                        "origin_id",
                        "origin",
                        ForeignKeyAction::Restrict,
                    ))
                    .foreign_key(&mut fk(
                        "fk_source_parent",
                        "source",
                        "parent_source_id",
                        "source",
                        ForeignKeyAction::SetNull,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_source_name")
                    .table(Alias::new("source"))
                    .col(Alias::new("name"))
                    .to_owned(),
            )
            .await?;

        // Datatype metadata; each row owns one dat_<name> table
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("datatype"))
                    .if_not_exists()
                    .col(id_col())
                    .col(
                        ColumnDef::new(Alias::new("name"))
                            .string_len(48)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Alias::new("kind")).string_len(16).not_null())
                    .col(ColumnDef::new(Alias::new("unit")).string().not_null())
                    .col(ColumnDef::new(Alias::new("description")).text().not_null())
                    .to_owned(),
            )
            .await?;

        // Facts
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("property"))
                    .if_not_exists()
                    .col(id_col())
                    .col(ColumnDef::new(Alias::new("star_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("datatype_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("source_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("reference_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("instrument_id")).integer().null())
                    .foreign_key(&mut fk(
                        "fk_property_star",
                        "property",
                        "star_id",
                        "star",
                        ForeignKeyAction::Restrict,
                    ))
                    .foreign_key(&mut fk(
                        "fk_property_datatype",
                        "property",
                        "datatype_id",
                        "datatype",
                        ForeignKeyAction::Restrict,
                    ))
                    .foreign_key(&mut fk(
                        "fk_property_source",
                        "property",
                        "source_id",
                        "source",
                        ForeignKeyAction::Restrict,
                    ))
                    .foreign_key(&mut fk(
                        "fk_property_reference",
                        "property",
                        "reference_id",
                        "reference",
                        ForeignKeyAction::Restrict,
                    ))
                    .foreign_key(&mut fk(
                        "fk_property_instrument",
                        "property",
                        "instrument_id",
                        "instrument",
                        ForeignKeyAction::Restrict,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_property_source_datatype")
                    .table(Alias::new("property"))
                    .col(Alias::new("source_id"))
                    .col(Alias::new("datatype_id"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Alias::new("timeseries"))
                    .if_not_exists()
                    .col(id_col())
                    .col(ColumnDef::new(Alias::new("star_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("datatype_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("source_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("reference_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("instrument_id")).integer().null())
                    .col(
                        ColumnDef::new(Alias::new("last_appended"))
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(&mut fk(
                        "fk_timeseries_star",
                        "timeseries",
                        "star_id",
                        "star",
                        ForeignKeyAction::Restrict,
                    ))
                    .foreign_key(&mut fk(
                        "fk_timeseries_datatype",
                        "timeseries",
                        "datatype_id",
                        "datatype",
                        ForeignKeyAction::Restrict,
                    ))
                    .foreign_key(&mut fk(
                        "fk_timeseries_source",
                        "timeseries",
                        "source_id",
                        "source",
                        ForeignKeyAction::Restrict,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_timeseries_key")
                    .table(Alias::new("timeseries"))
                    .col(Alias::new("star_id"))
                    .col(Alias::new("datatype_id"))
                    .col(Alias::new("source_id"))
                    .col(Alias::new("reference_id"))
                    .to_owned(),
            )
            .await?;

        // Datasets
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("dataset"))
                    .if_not_exists()
                    .col(id_col())
                    .col(
                        ColumnDef::new(Alias::new("name"))
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Alias::new("description")).text().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Alias::new("dataset_map"))
                    .if_not_exists()
                    .col(id_col())
                    .col(ColumnDef::new(Alias::new("dataset_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("star_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("datatype_id")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("property_id")).integer().not_null())
                    .foreign_key(&mut fk(
                        "fk_dataset_map_dataset",
                        "dataset_map",
                        "dataset_id",
                        "dataset",
                        ForeignKeyAction::Cascade,
                    ))
                    .foreign_key(&mut fk(
                        "fk_dataset_map_property",
                        "dataset_map",
                        "property_id",
                        "property",
                        ForeignKeyAction::Cascade,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_dataset_map_dataset_datatype")
                    .table(Alias::new("dataset_map"))
                    .col(Alias::new("dataset_id"))
                    .col(Alias::new("datatype_id"))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in TABLES.iter().rev() {
            manager
                .drop_table(
                    Table::drop()
                        .table(Alias::new(*table))
                        .if_exists()
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }
}
