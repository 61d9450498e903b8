use sea_orm_migration::prelude::*;

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
                    .col(
                        ColumnDef::new(Users::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Account).string().null())
                    .col(
                        ColumnDef::new(Users::Email)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Users::Nickname).string().not_null())
                    .col(
                        ColumnDef::new(Users::NickLc)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Users::NameLc)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Users::Image)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Users::ImageBlob).binary().null())
                    .col(ColumnDef::new(Users::Locale).string().not_null())
                    .col(
                        ColumnDef::new(Users::Location)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Users::Prefs).json().not_null())
                    .col(
                        ColumnDef::new(Users::Inactive)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::Ready)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Users::ReadyTimed)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Users::ChatDisabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Users::Plan).string().null())
                    .col(ColumnDef::new(Users::Elo).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Users::HumanElo)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::ManualElo)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::HighestScore)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Users::HighestScoreGame).string().null())
                    .col(ColumnDef::new(Users::BestWord).string().null())
                    .col(
                        ColumnDef::new(Users::BestWordScore)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Users::BestWordGame).string().null())
                    .col(ColumnDef::new(Users::Games).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Users::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Users::LastLogin)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-users-account")
                    .table(Users::Table)
                    .col(Users::Account)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-users-email")
                    .table(Users::Table)
                    .col(Users::Email)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-users-nick-lc")
                    .table(Users::Table)
                    .col(Users::NickLc)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-users-name-lc")
                    .table(Users::Table)
                    .col(Users::NameLc)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-users-human-elo")
                    .table(Users::Table)
                    .col(Users::HumanElo)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Users {
    Table,
    Id,
    Account,
    Email,
    Nickname,
    NickLc,
    NameLc,
    Image,
    ImageBlob,
    Locale,
    Location,
    Prefs,
    Inactive,
    Ready,
    ReadyTimed,
    ChatDisabled,
    Plan,
    Elo,
    HumanElo,
    ManualElo,
    HighestScore,
    HighestScoreGame,
    BestWord,
    BestWordScore,
    BestWordGame,
    Games,
    Timestamp,
    LastLogin,
}
