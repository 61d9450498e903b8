use sea_orm_migration::prelude::*;

use super::m20250612_000001_users_table::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Promos::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Promos::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Promos::UserId).string().not_null())
                    .col(ColumnDef::new(Promos::Promotion).string().not_null())
                    .col(
                        ColumnDef::new(Promos::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Promos::Table, Promos::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-promos-user-promotion")
                    .table(Promos::Table)
                    .col(Promos::UserId)
                    .col(Promos::Promotion)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::UserId).string().not_null())
                    .col(ColumnDef::new(Transactions::Plan).string().not_null())
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(ColumnDef::new(Transactions::Op).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-user")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Submissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Submissions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Submissions::UserId).string().not_null())
                    .col(ColumnDef::new(Submissions::Locale).string().not_null())
                    .col(ColumnDef::new(Submissions::Word).string().not_null())
                    .col(ColumnDef::new(Submissions::Comment).text().not_null())
                    .col(
                        ColumnDef::new(Submissions::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-submissions-user")
                    .table(Submissions::Table)
                    .col(Submissions::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Riddles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Riddles::Date).string().not_null())
                    .col(ColumnDef::new(Riddles::Locale).string().not_null())
                    .col(ColumnDef::new(Riddles::RiddleJson).text().not_null())
                    .col(
                        ColumnDef::new(Riddles::Created)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Riddles::Version)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .primary_key(Index::create().col(Riddles::Date).col(Riddles::Locale))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Images::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Images::UserId).string().not_null())
                    .col(ColumnDef::new(Images::Fmt).string().not_null())
                    .col(ColumnDef::new(Images::Image).binary().not_null())
                    .primary_key(Index::create().col(Images::UserId).col(Images::Fmt))
                    .foreign_key(
                        ForeignKey::create()
                            .from(Images::Table, Images::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Table::drop().table(Images::Table).to_owned(),
            Table::drop().table(Riddles::Table).to_owned(),
            Table::drop().table(Submissions::Table).to_owned(),
            Table::drop().table(Transactions::Table).to_owned(),
            Table::drop().table(Promos::Table).to_owned(),
        ] {
            manager.drop_table(table).await?;
        }
        Ok(())
    }
}

#[derive(Iden)]
pub enum Promos {
    Table,
    Id,
    UserId,
    Promotion,
    Timestamp,
}

#[derive(Iden)]
pub enum Transactions {
    Table,
    Id,
    UserId,
    Plan,
    Kind,
    Op,
    Timestamp,
}

#[derive(Iden)]
pub enum Submissions {
    Table,
    Id,
    UserId,
    Locale,
    Word,
    Comment,
    Timestamp,
}

#[derive(Iden)]
pub enum Riddles {
    Table,
    Date,
    Locale,
    RiddleJson,
    Created,
    Version,
}

#[derive(Iden)]
pub enum Images {
    Table,
    UserId,
    Fmt,
    Image,
}
