//! Relational backend over SeaORM.
//!
//! One connection pool is shared across requests; each request session
//! holds a real database transaction for its whole unit of work. Nested
//! scopes are savepoints: a failure inside one rolls back only that
//! scope while the request transaction continues.

use crate::db::{repos::*, Backend, DbError, DbResult};
use crate::utils::ids::generate_id;
use async_trait::async_trait;
use log::info;
use migration::{Migrator, MigratorTrait};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use std::{ops::Deref, sync::Arc};
use tokio::sync::{Mutex, MutexGuard};

pub mod entities;
pub mod migration;
mod repos;

use repos::*;

/// Connect to the relational database and bring the schema up to date
pub async fn connect(url: &str) -> DbResult<DatabaseConnection> {
    info!("Connecting to database..");

    let connection = sea_orm::Database::connect(url).await?;

    info!("Running migrations...");
    Migrator::up(&connection, None).await?;
    info!("Migrations complete.");

    Ok(connection)
}

struct TxnStack {
    /// The request-level transaction; None once committed or rolled back
    root: Option<DatabaseTransaction>,
    /// Open savepoints, innermost last
    nested: Vec<DatabaseTransaction>,
}

/// Shared per-request state: the transaction stack every repository
/// executes against
pub(crate) struct SqlSession {
    txns: Mutex<TxnStack>,
}

impl SqlSession {
    fn new(root: DatabaseTransaction) -> Self {
        Self {
            txns: Mutex::new(TxnStack {
                root: Some(root),
                nested: Vec::new(),
            }),
        }
    }

    /// Borrow the innermost open transaction. Requests are sequential
    /// internally, so holding the guard across the query is safe.
    pub async fn conn(&self) -> DbResult<ConnGuard<'_>> {
        let guard = self.txns.lock().await;
        if guard.root.is_none() {
            return Err(DbError::NoSession);
        }
        Ok(ConnGuard { guard })
    }

    async fn begin(&self) -> DbResult<()> {
        let mut guard = self.txns.lock().await;
        let savepoint = match guard.nested.last() {
            Some(txn) => txn.begin().await?,
            None => match &guard.root {
                Some(root) => root.begin().await?,
                None => return Err(DbError::NoSession),
            },
        };
        guard.nested.push(savepoint);
        Ok(())
    }

    async fn commit_nested(&self) -> DbResult<()> {
        let mut guard = self.txns.lock().await;
        match guard.nested.pop() {
            Some(txn) => Ok(txn.commit().await?),
            None => Err(DbError::NoSession),
        }
    }

    async fn rollback_nested(&self) -> DbResult<()> {
        let mut guard = self.txns.lock().await;
        match guard.nested.pop() {
            Some(txn) => Ok(txn.rollback().await?),
            None => Err(DbError::NoSession),
        }
    }

    async fn commit(&self) -> DbResult<()> {
        let mut guard = self.txns.lock().await;
        // Commit any scopes left open, innermost first
        while let Some(txn) = guard.nested.pop() {
            txn.commit().await?;
        }
        match guard.root.take() {
            Some(root) => Ok(root.commit().await?),
            None => Err(DbError::NoSession),
        }
    }

    async fn rollback(&self) -> DbResult<()> {
        let mut guard = self.txns.lock().await;
        while let Some(txn) = guard.nested.pop() {
            txn.rollback().await?;
        }
        match guard.root.take() {
            Some(root) => Ok(root.rollback().await?),
            None => Err(DbError::NoSession),
        }
    }

    async fn close(&self) -> DbResult<()> {
        let mut guard = self.txns.lock().await;
        guard.nested.clear();
        if let Some(root) = guard.root.take() {
            // A session closed without an explicit commit rolls back
            root.rollback().await?;
        }
        Ok(())
    }
}

/// Guard dereferencing to the innermost open transaction
pub(crate) struct ConnGuard<'a> {
    guard: MutexGuard<'a, TxnStack>,
}

impl Deref for ConnGuard<'_> {
    type Target = DatabaseTransaction;

    fn deref(&self) -> &Self::Target {
        match self.guard.nested.last() {
            Some(txn) => txn,
            None => self
                .guard
                .root
                .as_ref()
                .expect("transaction presence checked when the guard was created"),
        }
    }
}

/// Relational implementation of the persistence protocol
pub struct SqlBackend {
    session: Arc<SqlSession>,
    users: SqlUserRepository,
    games: SqlGameRepository,
    elo: SqlEloRepository,
    stats: SqlStatsRepository,
    favorites: SqlFavoriteRepository,
    challenges: SqlChallengeRepository,
    chat: SqlChatRepository,
    blocks: SqlBlockRepository,
    zombies: SqlZombieRepository,
    ratings: SqlRatingRepository,
    reports: SqlReportRepository,
    promos: SqlPromoRepository,
    transactions: SqlTransactionRepository,
    submissions: SqlSubmissionRepository,
    completions: SqlCompletionRepository,
    robots: SqlRobotRepository,
    riddles: SqlRiddleRepository,
    images: SqlImageRepository,
}

impl SqlBackend {
    pub async fn open(connection: &DatabaseConnection) -> DbResult<Self> {
        let root = connection.begin().await?;
        let session = Arc::new(SqlSession::new(root));
        Ok(Self {
            users: SqlUserRepository::new(session.clone()),
            games: SqlGameRepository::new(session.clone()),
            elo: SqlEloRepository::new(session.clone()),
            stats: SqlStatsRepository::new(session.clone()),
            favorites: SqlFavoriteRepository::new(session.clone()),
            challenges: SqlChallengeRepository::new(session.clone()),
            chat: SqlChatRepository::new(session.clone()),
            blocks: SqlBlockRepository::new(session.clone()),
            zombies: SqlZombieRepository::new(session.clone()),
            ratings: SqlRatingRepository::new(session.clone()),
            reports: SqlReportRepository::new(session.clone()),
            promos: SqlPromoRepository::new(session.clone()),
            transactions: SqlTransactionRepository::new(session.clone()),
            submissions: SqlSubmissionRepository::new(session.clone()),
            completions: SqlCompletionRepository::new(session.clone()),
            robots: SqlRobotRepository::new(session.clone()),
            riddles: SqlRiddleRepository::new(session.clone()),
            images: SqlImageRepository::new(session.clone()),
            session,
        })
    }
}

#[async_trait]
impl Backend for SqlBackend {
    fn users(&self) -> &dyn UserRepository {
        &self.users
    }
    fn games(&self) -> &dyn GameRepository {
        &self.games
    }
    fn elo(&self) -> &dyn EloRepository {
        &self.elo
    }
    fn stats(&self) -> &dyn StatsRepository {
        &self.stats
    }
    fn favorites(&self) -> &dyn FavoriteRepository {
        &self.favorites
    }
    fn challenges(&self) -> &dyn ChallengeRepository {
        &self.challenges
    }
    fn chat(&self) -> &dyn ChatRepository {
        &self.chat
    }
    fn blocks(&self) -> &dyn BlockRepository {
        &self.blocks
    }
    fn zombies(&self) -> &dyn ZombieRepository {
        &self.zombies
    }
    fn ratings(&self) -> &dyn RatingRepository {
        &self.ratings
    }
    fn reports(&self) -> &dyn ReportRepository {
        &self.reports
    }
    fn promos(&self) -> &dyn PromoRepository {
        &self.promos
    }
    fn transactions(&self) -> &dyn TransactionRepository {
        &self.transactions
    }
    fn submissions(&self) -> &dyn SubmissionRepository {
        &self.submissions
    }
    fn completions(&self) -> &dyn CompletionRepository {
        &self.completions
    }
    fn robots(&self) -> &dyn RobotRepository {
        &self.robots
    }
    fn riddles(&self) -> &dyn RiddleRepository {
        &self.riddles
    }
    fn images(&self) -> &dyn ImageRepository {
        &self.images
    }

    fn generate_id(&self) -> String {
        generate_id()
    }

    async fn begin(&self) -> DbResult<()> {
        self.session.begin().await
    }

    async fn commit_nested(&self) -> DbResult<()> {
        self.session.commit_nested().await
    }

    async fn rollback_nested(&self) -> DbResult<()> {
        self.session.rollback_nested().await
    }

    async fn commit(&self) -> DbResult<()> {
        self.session.commit().await
    }

    async fn rollback(&self) -> DbResult<()> {
        self.session.rollback().await
    }

    async fn close(&self) -> DbResult<()> {
        self.session.close().await
    }
}
