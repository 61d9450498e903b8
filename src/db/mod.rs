//! Pluggable persistence layer: a backend-agnostic repository protocol
//! implemented over two very different substrates, plus the per-request
//! session contract that application code works through.
//!
//! The outer service opens a request context yielding a [`Session`]; all
//! reads and writes inside the context share one logical unit of work.
//! On clean return the context commits, on error it rolls back, and in
//! both cases the backend is closed. Application code never manages
//! connections or transactions explicitly.

use crate::{
    config::{DatabaseBackend, DatabaseConfig},
    error::CoreResult,
};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use log::{error, warn};
use std::{ops::Deref, sync::Arc, sync::OnceLock};

pub mod docstore;
pub mod error;
pub mod records;
pub mod repos;
pub mod sql;

pub use error::{DbError, DbResult};
use repos::*;

/// A bundle of repositories sharing one unit of work, together with the
/// transaction controls of the underlying substrate.
///
/// `begin`/`commit_nested`/`rollback_nested` control a nested scope: a
/// savepoint on the relational backend, an optimistic-concurrency scope
/// on the document store. A failure inside a nested scope rolls back
/// only that scope; the surrounding request transaction continues unless
/// the error propagates.
#[async_trait]
pub trait Backend: Send + Sync {
    fn users(&self) -> &dyn UserRepository;
    fn games(&self) -> &dyn GameRepository;
    fn elo(&self) -> &dyn EloRepository;
    fn stats(&self) -> &dyn StatsRepository;
    fn favorites(&self) -> &dyn FavoriteRepository;
    fn challenges(&self) -> &dyn ChallengeRepository;
    fn chat(&self) -> &dyn ChatRepository;
    fn blocks(&self) -> &dyn BlockRepository;
    fn zombies(&self) -> &dyn ZombieRepository;
    fn ratings(&self) -> &dyn RatingRepository;
    fn reports(&self) -> &dyn ReportRepository;
    fn promos(&self) -> &dyn PromoRepository;
    fn transactions(&self) -> &dyn TransactionRepository;
    fn submissions(&self) -> &dyn SubmissionRepository;
    fn completions(&self) -> &dyn CompletionRepository;
    fn robots(&self) -> &dyn RobotRepository;
    fn riddles(&self) -> &dyn RiddleRepository;
    fn images(&self) -> &dyn ImageRepository;

    /// Generate a new opaque unique entity id
    fn generate_id(&self) -> String;

    /// Enter a nested transaction scope
    async fn begin(&self) -> DbResult<()>;

    /// Commit the innermost nested scope
    async fn commit_nested(&self) -> DbResult<()>;

    /// Roll back the innermost nested scope
    async fn rollback_nested(&self) -> DbResult<()>;

    /// Commit the request-level unit of work
    async fn commit(&self) -> DbResult<()>;

    /// Roll back the request-level unit of work
    async fn rollback(&self) -> DbResult<()>;

    /// Release the backend's resources; called exactly once per request
    async fn close(&self) -> DbResult<()>;
}

/// The request-scoped unit of work handed to application code
pub struct Session {
    backend: Box<dyn Backend>,
}

impl Session {
    fn new(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &dyn Backend {
        &*self.backend
    }

    /// Run `f` inside a nested transaction scope. Writes that must be
    /// atomic with respect to each other are enclosed here; on error the
    /// nested scope is rolled back and the error propagates.
    pub async fn transact<T>(
        &self,
        f: impl for<'a> FnOnce(&'a dyn Backend) -> BoxFuture<'a, CoreResult<T>>,
    ) -> CoreResult<T> {
        self.backend.begin().await?;
        match f(&*self.backend).await {
            Ok(value) => {
                self.backend.commit_nested().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rb_err) = self.backend.rollback_nested().await {
                    warn!("Error rolling back nested transaction: {rb_err}");
                }
                Err(err)
            }
        }
    }
}

impl Deref for Session {
    type Target = dyn Backend;

    fn deref(&self) -> &Self::Target {
        &*self.backend
    }
}

enum Provider {
    Doc(Arc<docstore::DocStore>),
    Sql(sea_orm::DatabaseConnection),
}

/// Process-wide manager for backend lifecycle. Initialized once at
/// startup with the chosen backend type and connection URL; afterwards
/// every request obtains its own [`Session`] from it.
pub struct SessionManager {
    provider: Provider,
}

impl SessionManager {
    /// Connect to the configured substrate. For the relational backend
    /// this creates the shared connection pool and runs migrations; for
    /// the document store it loads any persisted documents.
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        let provider = match config.backend {
            DatabaseBackend::DocStore => {
                let store = docstore::DocStore::open(config.data_dir.as_deref())?;
                Provider::Doc(Arc::new(store))
            }
            DatabaseBackend::Sql => {
                let url = config.url.as_deref().ok_or_else(|| {
                    DbError::Config("DATABASE_URL required for the relational backend".to_string())
                })?;
                let connection = sql::connect(url).await?;
                Provider::Sql(connection)
            }
        };
        Ok(Self { provider })
    }

    pub fn backend_type(&self) -> DatabaseBackend {
        match &self.provider {
            Provider::Doc(_) => DatabaseBackend::DocStore,
            Provider::Sql(_) => DatabaseBackend::Sql,
        }
    }

    /// Open a new request-scoped session
    pub async fn open(&self) -> DbResult<Session> {
        let backend: Box<dyn Backend> = match &self.provider {
            Provider::Doc(store) => Box::new(docstore::DocBackend::open(store.clone())),
            Provider::Sql(connection) => Box::new(sql::SqlBackend::open(connection).await?),
        };
        Ok(Session::new(backend))
    }

    /// Run `f` within a fresh request context: commit on clean return,
    /// roll back on error, close the backend in both cases. There is no
    /// partial-commit path.
    pub async fn run<T>(
        &self,
        f: impl for<'a> FnOnce(&'a Session) -> BoxFuture<'a, CoreResult<T>>,
    ) -> CoreResult<T> {
        let session = self.open().await?;
        let result = f(&session).await;
        let result = match result {
            Ok(value) => match session.commit().await {
                Ok(()) => Ok(value),
                Err(err) => {
                    error!("Error committing request transaction: {err}");
                    if let Err(rb_err) = session.rollback().await {
                        warn!("Error rolling back after failed commit: {rb_err}");
                    }
                    Err(err.into())
                }
            },
            Err(err) => {
                if let Err(rb_err) = session.rollback().await {
                    warn!("Error rolling back request transaction: {rb_err}");
                }
                Err(err)
            }
        };
        if let Err(err) = session.close().await {
            warn!("Error closing backend: {err}");
        }
        result
    }
}

/// The singleton session manager; initialized once at startup
static SESSION_MANAGER: OnceLock<SessionManager> = OnceLock::new();

/// Install the global session manager. Call once at application
/// startup, before handling any requests.
pub fn init_session_manager(manager: SessionManager) -> &'static SessionManager {
    if SESSION_MANAGER.set(manager).is_err() {
        warn!("Session manager already initialized; ignoring re-initialization");
    }
    get_session_manager()
}

/// The global session manager. Panics if [`init_session_manager`] has
/// not been called.
pub fn get_session_manager() -> &'static SessionManager {
    SESSION_MANAGER
        .get()
        .expect("Session manager not initialized; call init_session_manager() at startup")
}
