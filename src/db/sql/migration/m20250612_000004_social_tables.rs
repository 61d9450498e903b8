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
                    .table(Favorites::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Favorites::SrcUserId).string().not_null())
                    .col(ColumnDef::new(Favorites::DestUserId).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(Favorites::SrcUserId)
                            .col(Favorites::DestUserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Favorites::Table, Favorites::SrcUserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Favorites::Table, Favorites::DestUserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-favorites-dest")
                    .table(Favorites::Table)
                    .col(Favorites::DestUserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Blocks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Blocks::BlockerId).string().not_null())
                    .col(ColumnDef::new(Blocks::BlockedId).string().not_null())
                    .col(
                        ColumnDef::new(Blocks::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create().col(Blocks::BlockerId).col(Blocks::BlockedId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Blocks::Table, Blocks::BlockerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Blocks::Table, Blocks::BlockedId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-blocks-blocked")
                    .table(Blocks::Table)
                    .col(Blocks::BlockedId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Challenges::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Challenges::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Challenges::SrcUserId).string().not_null())
                    .col(ColumnDef::new(Challenges::DestUserId).string().not_null())
                    .col(ColumnDef::new(Challenges::Prefs).json().not_null())
                    .col(
                        ColumnDef::new(Challenges::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Challenges::Table, Challenges::SrcUserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Challenges::Table, Challenges::DestUserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-challenges-src-dest")
                    .table(Challenges::Table)
                    .col(Challenges::SrcUserId)
                    .col(Challenges::DestUserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-challenges-dest")
                    .table(Challenges::Table)
                    .col(Challenges::DestUserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Chats::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Chats::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Chats::Channel).string().not_null())
                    .col(ColumnDef::new(Chats::UserId).string().not_null())
                    .col(ColumnDef::new(Chats::RecipientId).string().null())
                    .col(ColumnDef::new(Chats::Msg).text().not_null())
                    .col(
                        ColumnDef::new(Chats::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-chats-channel-ts")
                    .table(Chats::Table)
                    .col(Chats::Channel)
                    .col(Chats::Timestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-chats-user")
                    .table(Chats::Table)
                    .col(Chats::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-chats-recipient")
                    .table(Chats::Table)
                    .col(Chats::RecipientId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Reports::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reports::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Reports::ReporterId).string().not_null())
                    .col(ColumnDef::new(Reports::ReportedId).string().not_null())
                    .col(ColumnDef::new(Reports::Code).integer().not_null().default(0))
                    .col(ColumnDef::new(Reports::Text).text().not_null())
                    .col(
                        ColumnDef::new(Reports::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-reports-reporter")
                    .table(Reports::Table)
                    .col(Reports::ReporterId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Table::drop().table(Reports::Table).to_owned(),
            Table::drop().table(Chats::Table).to_owned(),
            Table::drop().table(Challenges::Table).to_owned(),
            Table::drop().table(Blocks::Table).to_owned(),
            Table::drop().table(Favorites::Table).to_owned(),
        ] {
            manager.drop_table(table).await?;
        }
        Ok(())
    }
}

#[derive(Iden)]
pub enum Favorites {
    Table,
    SrcUserId,
    DestUserId,
}

#[derive(Iden)]
pub enum Blocks {
    Table,
    BlockerId,
    BlockedId,
    Timestamp,
}

#[derive(Iden)]
pub enum Challenges {
    Table,
    Id,
    SrcUserId,
    DestUserId,
    Prefs,
    Timestamp,
}

#[derive(Iden)]
pub enum Chats {
    Table,
    Id,
    Channel,
    UserId,
    RecipientId,
    Msg,
    Timestamp,
}

#[derive(Iden)]
pub enum Reports {
    Table,
    Id,
    ReporterId,
    ReportedId,
    Code,
    Text,
    Timestamp,
}
