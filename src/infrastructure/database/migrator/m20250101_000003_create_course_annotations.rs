//! Create course_annotations table
//!
//! Finance annotations per (item kind, course).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CourseAnnotations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CourseAnnotations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CourseAnnotations::Kind).string_len(32).not_null())
                    .col(ColumnDef::new(CourseAnnotations::CourseId).string_len(128).not_null())
                    .col(ColumnDef::new(CourseAnnotations::Annotation).text().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_course_annotations_kind_course")
                    .table(CourseAnnotations::Table)
                    .col(CourseAnnotations::Kind)
                    .col(CourseAnnotations::CourseId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CourseAnnotations::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum CourseAnnotations {
    Table,
    Id,
    Kind,
    CourseId,
    Annotation,
}
