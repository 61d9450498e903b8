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
                    .table(Games::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Games::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Games::Player0Id).string().null())
                    .col(ColumnDef::new(Games::Player1Id).string().null())
                    .col(ColumnDef::new(Games::Locale).string().not_null())
                    .col(ColumnDef::new(Games::Rack0).string().not_null())
                    .col(ColumnDef::new(Games::Rack1).string().not_null())
                    .col(
                        ColumnDef::new(Games::Irack0)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Games::Irack1)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Games::Score0).integer().not_null().default(0))
                    .col(ColumnDef::new(Games::Score1).integer().not_null().default(0))
                    .col(ColumnDef::new(Games::ToMove).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Games::RobotLevel)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Games::Over)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Games::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Games::TsLastMove)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Games::Moves).json().not_null())
                    .col(ColumnDef::new(Games::Prefs).json().not_null())
                    .col(
                        ColumnDef::new(Games::TileCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Games::Elo0).integer().null())
                    .col(ColumnDef::new(Games::Elo1).integer().null())
                    .col(ColumnDef::new(Games::Elo0Adj).integer().null())
                    .col(ColumnDef::new(Games::Elo1Adj).integer().null())
                    .col(ColumnDef::new(Games::HumanElo0).integer().null())
                    .col(ColumnDef::new(Games::HumanElo1).integer().null())
                    .col(ColumnDef::new(Games::HumanElo0Adj).integer().null())
                    .col(ColumnDef::new(Games::HumanElo1Adj).integer().null())
                    .col(ColumnDef::new(Games::ManualElo0).integer().null())
                    .col(ColumnDef::new(Games::ManualElo1).integer().null())
                    .col(ColumnDef::new(Games::ManualElo0Adj).integer().null())
                    .col(ColumnDef::new(Games::ManualElo1Adj).integer().null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Games::Table, Games::Player0Id)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Games::Table, Games::Player1Id)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-games-player0-over")
                    .table(Games::Table)
                    .col(Games::Player0Id)
                    .col(Games::Over)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-games-player1-over")
                    .table(Games::Table)
                    .col(Games::Player1Id)
                    .col(Games::Over)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-games-ts-last-move")
                    .table(Games::Table)
                    .col(Games::TsLastMove)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Zombies::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Zombies::GameId).string().not_null())
                    .col(ColumnDef::new(Zombies::UserId).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(Zombies::GameId)
                            .col(Zombies::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Zombies::Table, Zombies::GameId)
                            .to(Games::Table, Games::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Zombies::Table, Zombies::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-zombies-user")
                    .table(Zombies::Table)
                    .col(Zombies::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Zombies::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Games::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Games {
    Table,
    Id,
    Player0Id,
    Player1Id,
    Locale,
    Rack0,
    Rack1,
    Irack0,
    Irack1,
    Score0,
    Score1,
    ToMove,
    RobotLevel,
    Over,
    Timestamp,
    TsLastMove,
    Moves,
    Prefs,
    TileCount,
    Elo0,
    Elo1,
    Elo0Adj,
    Elo1Adj,
    HumanElo0,
    HumanElo1,
    HumanElo0Adj,
    HumanElo1Adj,
    ManualElo0,
    ManualElo1,
    ManualElo0Adj,
    ManualElo1Adj,
}

#[derive(Iden)]
pub enum Zombies {
    Table,
    GameId,
    UserId,
}
