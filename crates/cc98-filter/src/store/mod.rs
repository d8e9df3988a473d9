//! Persistent block list storage.
//!
//! [`BlockStore`] is the load/save contract shared by the filter engine and
//! the settings surface. Loads fail soft: a fresh store yields empty lists.
//! Saves replace both lists wholesale.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::entity::{BlockList, BlockedEntity, EntityKind};
use crate::error::{Error, Result};

/// Durable storage for the block list.
pub trait BlockStore: std::fmt::Debug {
    /// Load both lists. Missing data yields empty lists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn load(&self) -> Result<BlockList>;

    /// Replace both lists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn save(&mut self, list: &BlockList) -> Result<()>;
}

/// `SQLite` block list store.
#[derive(Debug)]
pub struct SqliteStore {
    path: PathBuf,
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a store at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_kind(&self, kind: EntityKind) -> Result<Vec<BlockedEntity>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, enabled, first_seen_ms, last_seen_ms, custom_label
            FROM blocked_entities WHERE kind = ?1 ORDER BY position
            ",
        )?;

        let entities = stmt
            .query_map([kind.as_str()], |row| {
                Ok(BlockedEntity {
                    id: row.get(0)?,
                    enabled: row.get(1)?,
                    first_seen_time: from_millis(row.get(2)?),
                    last_seen_time: from_millis(row.get(3)?),
                    custom_label: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entities)
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

impl BlockStore for SqliteStore {
    fn load(&self) -> Result<BlockList> {
        let list = BlockList::new(
            self.load_kind(EntityKind::User)?,
            self.load_kind(EntityKind::Board)?,
        );
        debug!(
            users = list.users.len(),
            boards = list.boards.len(),
            "Loaded block list"
        );
        Ok(list)
    }

    fn save(&mut self, list: &BlockList) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM blocked_entities", [])?;
        {
            let mut stmt = tx.prepare(
                r"
                INSERT INTO blocked_entities
                    (kind, id, position, enabled, first_seen_ms, last_seen_ms, custom_label)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )?;
            for kind in [EntityKind::User, EntityKind::Board] {
                for (position, entity) in list.entries(kind).iter().enumerate() {
                    stmt.execute(params![
                        kind.as_str(),
                        entity.id,
                        i64::try_from(position).unwrap_or(i64::MAX),
                        entity.enabled,
                        entity.first_seen_time.timestamp_millis(),
                        entity.last_seen_time.timestamp_millis(),
                        entity.custom_label,
                    ])?;
                }
            }
        }
        tx.commit()?;
        debug!(
            users = list.users.len(),
            boards = list.boards.len(),
            "Saved block list"
        );
        Ok(())
    }
}

/// In-process store. Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    list: Arc<Mutex<BlockList>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `list`.
    #[must_use]
    pub fn with_list(list: BlockList) -> Self {
        Self {
            list: Arc::new(Mutex::new(list)),
        }
    }
}

impl BlockStore for MemoryStore {
    fn load(&self) -> Result<BlockList> {
        self.list
            .lock()
            .map(|list| list.clone())
            .map_err(|_| Error::internal("memory store lock poisoned"))
    }

    fn save(&mut self, list: &BlockList) -> Result<()> {
        let mut guard = self
            .list
            .lock()
            .map_err(|_| Error::internal("memory store lock poisoned"))?;
        *guard = list.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn sample() -> BlockList {
        BlockList::new(
            vec![
                BlockedEntity::new("zed", at(1_000)).with_label("muted"),
                BlockedEntity::new("alice", at(2_000)).with_enabled(false),
            ],
            vec![BlockedEntity::new("Lounge", at(3_000))],
        )
    }

    #[test]
    fn test_fresh_store_loads_empty() {
        let store = SqliteStore::open_in_memory().unwrap();
        let list = store.load().unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_save_and_load_keeps_order_and_fields() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.save(&sample()).unwrap();

        let list = store.load().unwrap();
        assert_eq!(list, sample());
        assert_eq!(list.users[0].id, "zed");
        assert_eq!(list.users[0].custom_label.as_deref(), Some("muted"));
        assert!(!list.users[1].enabled);
        assert_eq!(list.boards[0].first_seen_time, at(3_000));
    }

    #[test]
    fn test_save_replaces_wholesale() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.save(&sample()).unwrap();

        let replacement = BlockList::new(vec![BlockedEntity::new("bob", at(5))], vec![]);
        store.save(&replacement).unwrap();

        assert_eq!(store.load().unwrap(), replacement);
    }

    #[test]
    fn test_same_id_in_both_kinds() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let list = BlockList::new(
            vec![BlockedEntity::new("same", at(1))],
            vec![BlockedEntity::new("same", at(1))],
        );
        store.save(&list).unwrap();
        assert_eq!(store.load().unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_ids_fail_without_partial_write() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.save(&sample()).unwrap();

        let bad = BlockList::new(
            vec![
                BlockedEntity::new("dup", at(1)),
                BlockedEntity::new("dup", at(2)),
            ],
            vec![],
        );
        assert!(store.save(&bad).is_err());
        assert_eq!(store.load().unwrap(), sample());
    }

    #[test]
    fn test_open_creates_file_and_reopens() {
        let dir = std::env::temp_dir().join(format!("cc98-filter-store-{}", std::process::id()));
        let path = dir.join("nested").join("blocklist.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            assert_eq!(store.path(), path.as_path());
            store.save(&sample()).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.load().unwrap(), sample());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_memory_store_clones_share_state() {
        let store = MemoryStore::new();
        let mut writer = store.clone();
        writer.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), sample());
    }

    #[test]
    fn test_memory_store_with_list() {
        let store = MemoryStore::with_list(sample());
        assert_eq!(store.load().unwrap().boards.len(), 1);
    }

    #[test]
    fn test_boxed_store() {
        let mut store: Box<dyn BlockStore> = Box::new(MemoryStore::new());
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap().users.len(), 2);
    }
}
