use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Stats::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Stats::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Stats::UserId).string().null())
                    .col(
                        ColumnDef::new(Stats::RobotLevel)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Stats::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Stats::Games).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Stats::HumanGames)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Stats::ManualGames)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Stats::Elo).integer().not_null().default(1200))
                    .col(
                        ColumnDef::new(Stats::HumanElo)
                            .integer()
                            .not_null()
                            .default(1200),
                    )
                    .col(
                        ColumnDef::new(Stats::ManualElo)
                            .integer()
                            .not_null()
                            .default(1200),
                    )
                    .col(ColumnDef::new(Stats::Score).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Stats::HumanScore)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Stats::ManualScore)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Stats::ScoreAgainst)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Stats::HumanScoreAgainst)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Stats::ManualScoreAgainst)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Stats::Wins).integer().not_null().default(0))
                    .col(ColumnDef::new(Stats::Losses).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Stats::HumanWins)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Stats::HumanLosses)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Stats::ManualWins)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Stats::ManualLosses)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-stats-user-robot-ts")
                    .table(Stats::Table)
                    .col(Stats::UserId)
                    .col(Stats::RobotLevel)
                    .col(Stats::Timestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-stats-timestamp")
                    .table(Stats::Table)
                    .col(Stats::Timestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Ratings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Ratings::Kind).string().not_null())
                    .col(ColumnDef::new(Ratings::Rank).integer().not_null())
                    .col(ColumnDef::new(Ratings::UserId).string().null())
                    .col(
                        ColumnDef::new(Ratings::RobotLevel)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Ratings::Games).integer().not_null().default(0))
                    .col(ColumnDef::new(Ratings::Elo).integer().not_null().default(1200))
                    .col(ColumnDef::new(Ratings::Score).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Ratings::ScoreAgainst)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Ratings::Wins).integer().not_null().default(0))
                    .col(ColumnDef::new(Ratings::Losses).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Ratings::RankYesterday)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Ratings::GamesYesterday)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Ratings::EloYesterday)
                            .integer()
                            .not_null()
                            .default(1200),
                    )
                    .col(
                        ColumnDef::new(Ratings::ScoreYesterday)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Ratings::ScoreAgainstYesterday)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Ratings::WinsYesterday)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Ratings::LossesYesterday)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Ratings::RankWeekAgo)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Ratings::GamesWeekAgo)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Ratings::EloWeekAgo)
                            .integer()
                            .not_null()
                            .default(1200),
                    )
                    .col(
                        ColumnDef::new(Ratings::ScoreWeekAgo)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Ratings::ScoreAgainstWeekAgo)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Ratings::WinsWeekAgo)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Ratings::LossesWeekAgo)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Ratings::RankMonthAgo)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Ratings::GamesMonthAgo)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Ratings::EloMonthAgo)
                            .integer()
                            .not_null()
                            .default(1200),
                    )
                    .col(
                        ColumnDef::new(Ratings::ScoreMonthAgo)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Ratings::ScoreAgainstMonthAgo)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Ratings::WinsMonthAgo)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Ratings::LossesMonthAgo)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(Index::create().col(Ratings::Kind).col(Ratings::Rank))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Completions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Completions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Completions::Proctype).string().not_null())
                    .col(
                        ColumnDef::new(Completions::TsFrom)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Completions::TsTo)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Completions::Success)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Completions::Reason).text().not_null())
                    .col(
                        ColumnDef::new(Completions::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-completions-proctype")
                    .table(Completions::Table)
                    .col(Completions::Proctype)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Table::drop().table(Completions::Table).to_owned(),
            Table::drop().table(Ratings::Table).to_owned(),
            Table::drop().table(Stats::Table).to_owned(),
        ] {
            manager.drop_table(table).await?;
        }
        Ok(())
    }
}

#[derive(Iden)]
pub enum Stats {
    Table,
    Id,
    UserId,
    RobotLevel,
    Timestamp,
    Games,
    HumanGames,
    ManualGames,
    Elo,
    HumanElo,
    ManualElo,
    Score,
    HumanScore,
    ManualScore,
    ScoreAgainst,
    HumanScoreAgainst,
    ManualScoreAgainst,
    Wins,
    Losses,
    HumanWins,
    HumanLosses,
    ManualWins,
    ManualLosses,
}

#[derive(Iden)]
pub enum Ratings {
    Table,
    Kind,
    Rank,
    UserId,
    RobotLevel,
    Games,
    Elo,
    Score,
    ScoreAgainst,
    Wins,
    Losses,
    RankYesterday,
    GamesYesterday,
    EloYesterday,
    ScoreYesterday,
    ScoreAgainstYesterday,
    WinsYesterday,
    LossesYesterday,
    RankWeekAgo,
    GamesWeekAgo,
    EloWeekAgo,
    ScoreWeekAgo,
    ScoreAgainstWeekAgo,
    WinsWeekAgo,
    LossesWeekAgo,
    RankMonthAgo,
    GamesMonthAgo,
    EloMonthAgo,
    ScoreMonthAgo,
    ScoreAgainstMonthAgo,
    WinsMonthAgo,
    LossesMonthAgo,
}

#[derive(Iden)]
pub enum Completions {
    Table,
    Id,
    Proctype,
    TsFrom,
    TsTo,
    Success,
    Reason,
    Timestamp,
}
