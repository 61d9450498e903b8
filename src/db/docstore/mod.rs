//! Embedded schemaless document store backend.
//!
//! Documents are JSON values addressed by stringly-typed ancestor keys
//! of shape `[(Kind, id), …]`, each carrying a version counter.
//! Mutations are durable per call; the request-level commit and
//! rollback are therefore no-ops. A nested transaction scope buffers
//! its writes and re-validates document versions on commit, failing
//! with a write conflict when another request got there first.

use crate::db::{repos::*, Backend, DbError, DbResult};
use crate::utils::ids::generate_id;
use async_trait::async_trait;
use log::warn;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

mod repos;

use repos::*;

/// Entity kind identifiers, the first element of every document key
pub mod kinds {
    pub const USER: &str = "User";
    pub const GAME: &str = "Game";
    pub const ELO: &str = "Elo";
    pub const ROBOT: &str = "Robot";
    pub const STATS: &str = "Stats";
    pub const RATING: &str = "Rating";
    pub const CHAT: &str = "Chat";
    pub const CHALLENGE: &str = "Challenge";
    pub const FAVORITE: &str = "Favorite";
    pub const BLOCK: &str = "Block";
    pub const ZOMBIE: &str = "Zombie";
    pub const REPORT: &str = "Report";
    pub const PROMO: &str = "Promo";
    pub const TRANSACTION: &str = "Transaction";
    pub const SUBMISSION: &str = "Submission";
    pub const COMPLETION: &str = "Completion";
    pub const RIDDLE: &str = "Riddle";
    pub const IMAGE: &str = "Image";
}

/// An ancestor key: a path of (kind, id) pairs. The last component names
/// the document itself; earlier components express ownership.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocKey {
    path: Vec<(&'static str, String)>,
}

impl DocKey {
    pub fn new(kind: &'static str, id: impl Into<String>) -> Self {
        Self {
            path: vec![(kind, id.into())],
        }
    }

    pub fn child(mut self, kind: &'static str, id: impl Into<String>) -> Self {
        self.path.push((kind, id.into()));
        self
    }

    /// The id of the document itself (last path component)
    pub fn id(&self) -> &str {
        &self.path[self.path.len() - 1].1
    }

    /// Flattened form used as the storage key, e.g. "User:u1/Elo:is_IS"
    pub fn flatten(&self) -> String {
        let parts: Vec<String> = self
            .path
            .iter()
            .map(|(kind, id)| format!("{kind}:{id}"))
            .collect();
        parts.join("/")
    }

    /// The kind of the document itself (last path component)
    pub fn kind(&self) -> &'static str {
        self.path[self.path.len() - 1].0
    }
}

/// Extract the id of the indicated path segment from a flattened key
pub(crate) fn key_segment(flat_key: &str, index: usize) -> Option<&str> {
    flat_key
        .split('/')
        .nth(index)
        .and_then(|segment| segment.splitn(2, ':').nth(1))
}

struct VersionedDoc {
    version: u64,
    doc: Value,
}

/// The process-wide document store shared by all requests
pub struct DocStore {
    kinds: RwLock<HashMap<&'static str, HashMap<String, VersionedDoc>>>,
    versions: AtomicU64,
    data_dir: Option<PathBuf>,
}

impl DocStore {
    /// Open the store, loading any documents persisted under `data_dir`
    pub fn open(data_dir: Option<&str>) -> DbResult<Self> {
        let store = Self {
            kinds: RwLock::new(HashMap::new()),
            versions: AtomicU64::new(1),
            data_dir: data_dir.map(PathBuf::from),
        };
        store.load()?;
        Ok(store)
    }

    fn load(&self) -> DbResult<()> {
        let Some(dir) = &self.data_dir else {
            return Ok(());
        };
        if !dir.exists() {
            fs::create_dir_all(dir)?;
            return Ok(());
        }
        let mut kinds = self.kinds.write();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let kind_name = entry.file_name().to_string_lossy().to_string();
            let Some(kind) = known_kind(&kind_name) else {
                warn!("Skipping unknown document kind directory: {kind_name}");
                continue;
            };
            let docs = kinds.entry(kind).or_default();
            for doc_entry in fs::read_dir(entry.path())? {
                let doc_entry = doc_entry?;
                let path = doc_entry.path();
                if path.extension().map(|e| e != "json").unwrap_or(true) {
                    continue;
                }
                let data = fs::read_to_string(&path)?;
                let doc: Value = serde_json::from_str(&data)?;
                let key = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().replace("__", "/"))
                    .unwrap_or_default();
                docs.insert(
                    key,
                    VersionedDoc {
                        version: self.versions.fetch_add(1, Ordering::Relaxed),
                        doc,
                    },
                );
            }
        }
        Ok(())
    }

    fn doc_path(&self, kind: &str, key: &str) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| dir.join(kind).join(format!("{}.json", key.replace('/', "__"))))
    }

    fn persist(&self, kind: &str, key: &str, doc: Option<&Value>) -> DbResult<()> {
        let Some(path) = self.doc_path(kind, key) else {
            return Ok(());
        };
        match doc {
            Some(doc) => {
                if let Some(parent) = path.parent() {
                    if !parent.exists() {
                        fs::create_dir_all(parent)?;
                    }
                }
                fs::write(&path, serde_json::to_vec(doc)?)?;
            }
            None => {
                if path.exists() {
                    fs::remove_file(&path)?;
                }
            }
        }
        Ok(())
    }

    /// Current version and contents of a document
    pub fn get(&self, key: &DocKey) -> Option<(u64, Value)> {
        let kinds = self.kinds.read();
        kinds
            .get(key.kind())
            .and_then(|docs| docs.get(&key.flatten()))
            .map(|vd| (vd.version, vd.doc.clone()))
    }

    /// Write a document unconditionally, bumping its version
    pub fn put(&self, key: &DocKey, doc: Value) -> DbResult<u64> {
        self.put_flat(key.kind(), &key.flatten(), doc)
    }

    fn put_flat(&self, kind: &'static str, flat: &str, doc: Value) -> DbResult<u64> {
        let version = self.versions.fetch_add(1, Ordering::Relaxed);
        {
            let mut kinds = self.kinds.write();
            kinds
                .entry(kind)
                .or_default()
                .insert(flat.to_string(), VersionedDoc {
                    version,
                    doc: doc.clone(),
                });
        }
        self.persist(kind, flat, Some(&doc))?;
        Ok(version)
    }

    /// Remove a document; true if it existed
    pub fn delete(&self, key: &DocKey) -> DbResult<bool> {
        self.delete_flat(key.kind(), &key.flatten())
    }

    fn delete_flat(&self, kind: &'static str, flat: &str) -> DbResult<bool> {
        let existed = {
            let mut kinds = self.kinds.write();
            kinds
                .get_mut(kind)
                .map(|docs| docs.remove(flat).is_some())
                .unwrap_or(false)
        };
        if existed {
            self.persist(kind, flat, None)?;
        }
        Ok(existed)
    }

    /// Snapshot every document of a kind as (flattened key, contents)
    pub fn scan(&self, kind: &str) -> Vec<(String, Value)> {
        let kinds = self.kinds.read();
        kinds
            .get(kind)
            .map(|docs| {
                docs.iter()
                    .map(|(key, vd)| (key.clone(), vd.doc.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Apply a buffered write set atomically, re-validating the version
    /// each entry observed when it was buffered
    fn apply_txn(&self, writes: &HashMap<(&'static str, String), PendingWrite>) -> DbResult<()> {
        let mut kinds = self.kinds.write();
        // Validate every expectation before mutating anything
        for ((kind, flat), write) in writes {
            let current = kinds.get(*kind).and_then(|docs| docs.get(flat));
            let current_version = current.map(|vd| vd.version);
            if current_version != write.expected {
                return Err(DbError::Conflict(format!("{kind}:{flat}")));
            }
        }
        let mut persists: Vec<(&'static str, String, Option<Value>)> = Vec::new();
        for ((kind, flat), write) in writes {
            match &write.op {
                PendingOp::Put(doc) => {
                    let version = self.versions.fetch_add(1, Ordering::Relaxed);
                    kinds.entry(*kind).or_default().insert(
                        flat.clone(),
                        VersionedDoc {
                            version,
                            doc: doc.clone(),
                        },
                    );
                    persists.push((*kind, flat.clone(), Some(doc.clone())));
                }
                PendingOp::Delete => {
                    if let Some(docs) = kinds.get_mut(*kind) {
                        docs.remove(flat);
                    }
                    persists.push((*kind, flat.clone(), None));
                }
            }
        }
        drop(kinds);
        for (kind, flat, doc) in persists {
            self.persist(kind, &flat, doc.as_ref())?;
        }
        Ok(())
    }
}

fn known_kind(name: &str) -> Option<&'static str> {
    use kinds::*;
    [
        USER,
        GAME,
        ELO,
        ROBOT,
        STATS,
        RATING,
        CHAT,
        CHALLENGE,
        FAVORITE,
        BLOCK,
        ZOMBIE,
        REPORT,
        PROMO,
        TRANSACTION,
        SUBMISSION,
        COMPLETION,
        RIDDLE,
        IMAGE,
    ]
    .into_iter()
    .find(|kind| *kind == name)
}

enum PendingOp {
    Put(Value),
    Delete,
}

struct PendingWrite {
    /// Version observed when the write was buffered; None for a new doc
    expected: Option<u64>,
    op: PendingOp,
}

struct DocTxn {
    depth: usize,
    writes: HashMap<(&'static str, String), PendingWrite>,
}

/// Per-request view onto the store, carrying the optimistic scope state
pub(crate) struct DocSession {
    store: Arc<DocStore>,
    txn: Mutex<Option<DocTxn>>,
}

impl DocSession {
    fn new(store: Arc<DocStore>) -> Self {
        Self {
            store,
            txn: Mutex::new(None),
        }
    }

    /// Read a document, observing writes buffered in the current scope
    pub fn get(&self, key: &DocKey) -> Option<Value> {
        let flat = key.flatten();
        {
            let txn = self.txn.lock();
            if let Some(txn) = &*txn {
                if let Some(write) = txn.writes.get(&(key.kind(), flat.clone())) {
                    return match &write.op {
                        PendingOp::Put(doc) => Some(doc.clone()),
                        PendingOp::Delete => None,
                    };
                }
            }
        }
        self.store.get(key).map(|(_, doc)| doc)
    }

    pub fn put(&self, key: &DocKey, doc: Value) -> DbResult<()> {
        let flat = key.flatten();
        let mut txn = self.txn.lock();
        match &mut *txn {
            Some(txn) => {
                let map_key = (key.kind(), flat);
                let expected = match txn.writes.get(&map_key) {
                    Some(write) => write.expected,
                    None => self.store.get(key).map(|(version, _)| version),
                };
                txn.writes.insert(
                    map_key,
                    PendingWrite {
                        expected,
                        op: PendingOp::Put(doc),
                    },
                );
                Ok(())
            }
            None => self.store.put(key, doc).map(|_| ()),
        }
    }

    pub fn delete(&self, key: &DocKey) -> DbResult<bool> {
        let flat = key.flatten();
        let mut txn = self.txn.lock();
        match &mut *txn {
            Some(txn) => {
                let map_key = (key.kind(), flat);
                let current = self.store.get(key);
                let expected = match txn.writes.get(&map_key) {
                    Some(write) => write.expected,
                    None => current.as_ref().map(|(version, _)| *version),
                };
                let existed = match txn.writes.get(&map_key) {
                    Some(write) => matches!(write.op, PendingOp::Put(_)),
                    None => current.is_some(),
                };
                txn.writes.insert(
                    map_key,
                    PendingWrite {
                        expected,
                        op: PendingOp::Delete,
                    },
                );
                Ok(existed)
            }
            None => self.store.delete(key),
        }
    }

    /// Snapshot a kind, overlaying writes buffered in the current scope
    pub fn scan(&self, kind: &'static str) -> Vec<(String, Value)> {
        let mut docs: HashMap<String, Value> = self.store.scan(kind).into_iter().collect();
        let txn = self.txn.lock();
        if let Some(txn) = &*txn {
            for ((write_kind, flat), write) in &txn.writes {
                if *write_kind != kind {
                    continue;
                }
                match &write.op {
                    PendingOp::Put(doc) => {
                        docs.insert(flat.clone(), doc.clone());
                    }
                    PendingOp::Delete => {
                        docs.remove(flat);
                    }
                }
            }
        }
        docs.into_iter().collect()
    }

    pub fn begin(&self) {
        let mut txn = self.txn.lock();
        match &mut *txn {
            Some(txn) => txn.depth += 1,
            None => {
                *txn = Some(DocTxn {
                    depth: 0,
                    writes: HashMap::new(),
                });
            }
        }
    }

    pub fn commit(&self) -> DbResult<()> {
        let mut guard = self.txn.lock();
        match guard.as_mut() {
            Some(inner) => {
                // Inner scopes only decrement the depth
                if inner.depth > 0 {
                    inner.depth -= 1;
                    return Ok(());
                }
            }
            None => return Err(DbError::NoSession),
        }
        let writes = guard.take().map(|inner| inner.writes).unwrap_or_default();
        drop(guard);
        if writes.is_empty() {
            return Ok(());
        }
        self.store.apply_txn(&writes)
    }

    pub fn rollback(&self) -> DbResult<()> {
        let mut guard = self.txn.lock();
        let Some(inner) = guard.as_mut() else {
            return Err(DbError::NoSession);
        };
        if inner.depth > 0 {
            inner.depth -= 1;
        } else {
            *guard = None;
        }
        Ok(())
    }
}

/// Document store implementation of the persistence protocol
pub struct DocBackend {
    session: Arc<DocSession>,
    users: DocUserRepository,
    games: DocGameRepository,
    elo: DocEloRepository,
    stats: DocStatsRepository,
    favorites: DocFavoriteRepository,
    challenges: DocChallengeRepository,
    chat: DocChatRepository,
    blocks: DocBlockRepository,
    zombies: DocZombieRepository,
    ratings: DocRatingRepository,
    reports: DocReportRepository,
    promos: DocPromoRepository,
    transactions: DocTransactionRepository,
    submissions: DocSubmissionRepository,
    completions: DocCompletionRepository,
    robots: DocRobotRepository,
    riddles: DocRiddleRepository,
    images: DocImageRepository,
}

impl DocBackend {
    pub fn open(store: Arc<DocStore>) -> Self {
        let session = Arc::new(DocSession::new(store));
        Self {
            users: DocUserRepository::new(session.clone()),
            games: DocGameRepository::new(session.clone()),
            elo: DocEloRepository::new(session.clone()),
            stats: DocStatsRepository::new(session.clone()),
            favorites: DocFavoriteRepository::new(session.clone()),
            challenges: DocChallengeRepository::new(session.clone()),
            chat: DocChatRepository::new(session.clone()),
            blocks: DocBlockRepository::new(session.clone()),
            zombies: DocZombieRepository::new(session.clone()),
            ratings: DocRatingRepository::new(session.clone()),
            reports: DocReportRepository::new(session.clone()),
            promos: DocPromoRepository::new(session.clone()),
            transactions: DocTransactionRepository::new(session.clone()),
            submissions: DocSubmissionRepository::new(session.clone()),
            completions: DocCompletionRepository::new(session.clone()),
            robots: DocRobotRepository::new(session.clone()),
            riddles: DocRiddleRepository::new(session.clone()),
            images: DocImageRepository::new(session.clone()),
            session,
        }
    }
}

#[async_trait]
impl Backend for DocBackend {
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
        self.session.begin();
        Ok(())
    }

    async fn commit_nested(&self) -> DbResult<()> {
        self.session.commit()
    }

    async fn rollback_nested(&self) -> DbResult<()> {
        self.session.rollback()
    }

    async fn commit(&self) -> DbResult<()> {
        // Mutations outside nested scopes are already durable
        Ok(())
    }

    async fn rollback(&self) -> DbResult<()> {
        // Best effort only: per-mutation durability cannot be undone
        warn!("Rollback requested on document store backend; mutations are already durable");
        Ok(())
    }

    async fn close(&self) -> DbResult<()> {
        Ok(())
    }
}
