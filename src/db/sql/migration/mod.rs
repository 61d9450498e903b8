pub use sea_orm_migration::prelude::*;

mod m20250612_000001_users_table;
mod m20250612_000002_games_tables;
mod m20250612_000003_elo_tables;
mod m20250612_000004_social_tables;
mod m20250612_000005_stats_tables;
mod m20250612_000006_misc_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250612_000001_users_table::Migration),
            Box::new(m20250612_000002_games_tables::Migration),
            Box::new(m20250612_000003_elo_tables::Migration),
            Box::new(m20250612_000004_social_tables::Migration),
            Box::new(m20250612_000005_stats_tables::Migration),
            Box::new(m20250612_000006_misc_tables::Migration),
        ]
    }
}
