//! Block list management.
//!
//! [`BlockManager`] is the editing side of the block list. Every successful
//! mutation is saved to the store first and then broadcast to live engines.
//! A mutation that fails validation or cannot be saved leaves the list as it
//! was and broadcasts nothing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::entity::{BlockList, BlockedEntity, EntityKind};
use crate::error::{Error, Result};
use crate::message::{Broadcaster, Message};
use crate::store::BlockStore;

/// Counts shown by the settings surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BlockStats {
    /// All blocked users.
    pub users: usize,
    /// Users currently enabled.
    pub enabled_users: usize,
    /// All blocked boards.
    pub boards: usize,
    /// Boards currently enabled.
    pub enabled_boards: usize,
}

/// Edits the block list and keeps engines informed.
#[derive(Debug)]
pub struct BlockManager {
    list: BlockList,
    store: Box<dyn BlockStore>,
    broadcaster: Broadcaster,
}

impl BlockManager {
    /// Load the list from `store`. A failed load is logged and starts empty.
    pub fn open(store: Box<dyn BlockStore>, broadcaster: Broadcaster) -> Self {
        let list = match store.load() {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "Could not load block list, starting empty");
                BlockList::default()
            }
        };
        Self {
            list,
            store,
            broadcaster,
        }
    }

    /// The current list.
    #[must_use]
    pub fn list(&self) -> &BlockList {
        &self.list
    }

    /// The broadcaster engines subscribe to.
    #[must_use]
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Block a user or board.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyIdentifier`] for a blank id,
    /// [`Error::DuplicateEntity`] if it is already listed, or a storage error.
    pub fn add(&mut self, kind: EntityKind, id: &str) -> Result<BlockedEntity> {
        self.add_at(kind, id, Utc::now())
    }

    /// Block a user or board with an explicit first-seen time.
    ///
    /// # Errors
    ///
    /// See [`BlockManager::add`].
    pub fn add_at(&mut self, kind: EntityKind, id: &str, now: DateTime<Utc>) -> Result<BlockedEntity> {
        let id = id.trim();
        if id.is_empty() {
            return Err(Error::EmptyIdentifier { kind });
        }
        if self.list.contains(kind, id) {
            return Err(Error::duplicate(kind, id));
        }

        let entity = BlockedEntity::new(id, now);
        let mut next = self.list.clone();
        next.entries_mut(kind).push(entity.clone());
        self.commit(next)?;
        info!(%kind, id, "Blocked");
        Ok(entity)
    }

    /// Enable or disable an entry. Returns whether the flag changed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntityNotFound`] if the entry is not listed, or a
    /// storage error.
    pub fn set_enabled(&mut self, kind: EntityKind, id: &str, enabled: bool) -> Result<bool> {
        self.set_enabled_at(kind, id, enabled, Utc::now())
    }

    /// [`BlockManager::set_enabled`] with an explicit time for the
    /// disabled to enabled stamp.
    ///
    /// # Errors
    ///
    /// See [`BlockManager::set_enabled`].
    pub fn set_enabled_at(
        &mut self,
        kind: EntityKind,
        id: &str,
        enabled: bool,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let id = id.trim();
        let mut next = self.list.clone();
        let entity = next
            .get_mut(kind, id)
            .ok_or_else(|| Error::not_found(kind, id))?;
        if entity.enabled == enabled {
            return Ok(false);
        }
        entity.set_enabled(enabled, now);
        self.commit(next)?;
        info!(%kind, id, enabled, "Toggled");
        Ok(true)
    }

    /// Remove an entry, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntityNotFound`] if the entry is not listed, or a
    /// storage error.
    pub fn remove(&mut self, kind: EntityKind, id: &str) -> Result<BlockedEntity> {
        let id = id.trim();
        let mut next = self.list.clone();
        let entries = next.entries_mut(kind);
        let index = entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::not_found(kind, id))?;
        let removed = entries.remove(index);
        self.commit(next)?;
        info!(%kind, id, "Unblocked");
        Ok(removed)
    }

    /// Set or clear a user's replacement text. A blank label clears it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EntityNotFound`] if the user is not listed, or a
    /// storage error.
    pub fn set_label(&mut self, username: &str, label: Option<&str>) -> Result<()> {
        let username = username.trim();
        let label = label
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(ToString::to_string);

        let mut next = self.list.clone();
        let entity = next
            .get_mut(EntityKind::User, username)
            .ok_or_else(|| Error::not_found(EntityKind::User, username))?;
        entity.custom_label = label;
        self.commit(next)?;
        info!(user = username, "Label updated");
        Ok(())
    }

    /// Replace the whole list, deduplicated by id.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn replace_list(&mut self, mut list: BlockList) -> Result<()> {
        list.dedup();
        self.commit(list)
    }

    /// Entry and enabled counts per kind.
    #[must_use]
    pub fn stats(&self) -> BlockStats {
        let enabled = |entries: &[BlockedEntity]| entries.iter().filter(|e| e.enabled).count();
        BlockStats {
            users: self.list.users.len(),
            enabled_users: enabled(&self.list.users),
            boards: self.list.boards.len(),
            enabled_boards: enabled(&self.list.boards),
        }
    }

    fn commit(&mut self, next: BlockList) -> Result<()> {
        self.store.save(&next)?;
        self.list = next;
        self.broadcaster.publish(Message::update(&self.list));
        Ok(())
    }
}
