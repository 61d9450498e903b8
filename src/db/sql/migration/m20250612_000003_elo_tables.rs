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
                    .table(EloRatings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(EloRatings::UserId).string().not_null())
                    .col(ColumnDef::new(EloRatings::Locale).string().not_null())
                    .col(
                        ColumnDef::new(EloRatings::Elo)
                            .integer()
                            .not_null()
                            .default(1200),
                    )
                    .col(
                        ColumnDef::new(EloRatings::HumanElo)
                            .integer()
                            .not_null()
                            .default(1200),
                    )
                    .col(
                        ColumnDef::new(EloRatings::ManualElo)
                            .integer()
                            .not_null()
                            .default(1200),
                    )
                    .col(
                        ColumnDef::new(EloRatings::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(EloRatings::UserId)
                            .col(EloRatings::Locale),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(EloRatings::Table, EloRatings::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-elo-ratings-locale-elo")
                    .table(EloRatings::Table)
                    .col(EloRatings::Locale)
                    .col(EloRatings::Elo)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-elo-ratings-locale-human-elo")
                    .table(EloRatings::Table)
                    .col(EloRatings::Locale)
                    .col(EloRatings::HumanElo)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Robots::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Robots::Locale).string().not_null())
                    .col(ColumnDef::new(Robots::Level).integer().not_null())
                    .col(
                        ColumnDef::new(Robots::Elo)
                            .integer()
                            .not_null()
                            .default(1200),
                    )
                    .primary_key(Index::create().col(Robots::Locale).col(Robots::Level))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Robots::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(EloRatings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum EloRatings {
    Table,
    UserId,
    Locale,
    Elo,
    HumanElo,
    ManualElo,
    Timestamp,
}

#[derive(Iden)]
pub enum Robots {
    Table,
    Locale,
    Level,
    Elo,
}
