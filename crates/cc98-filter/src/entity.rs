//! Block list data model.
//!
//! A [`BlockedEntity`] names a user or a board to hide. The persisted
//! [`BlockList`] keeps both kinds in insertion order; the filter engine never
//! reads it directly but works from an [`ActiveBlockSet`] projected from it.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of a blocked entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A forum user, matched by username.
    User,
    /// A forum board, matched by board name.
    Board,
}

impl EntityKind {
    /// Stable string form, used as the storage key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Board => "board",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "board" => Ok(Self::Board),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Something to hide: a username or a board name.
///
/// Older backups used `username`/`name` and `firstBlockTime`/`lastBlockTime`;
/// those keys are accepted on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedEntity {
    /// Username or board name, unique within its kind.
    #[serde(alias = "username", alias = "name")]
    pub id: String,

    /// Whether the entity is currently active.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// When the entity was first added.
    #[serde(
        alias = "firstBlockTime",
        with = "chrono::serde::ts_milliseconds",
        default = "Utc::now"
    )]
    pub first_seen_time: DateTime<Utc>,

    /// Last time the entity went from disabled to enabled.
    #[serde(
        alias = "lastBlockTime",
        with = "chrono::serde::ts_milliseconds",
        default = "Utc::now"
    )]
    pub last_seen_time: DateTime<Utc>,

    /// Replacement text for redacted content (users only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_label: Option<String>,
}

impl BlockedEntity {
    /// Create a new enabled entity first seen at `now`.
    #[must_use]
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            first_seen_time: now,
            last_seen_time: now,
            custom_label: None,
        }
    }

    /// Builder-style label setter.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.custom_label = Some(label.into());
        self
    }

    /// Builder-style enabled setter.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// The custom label, if present and non-blank.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.custom_label
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
    }

    /// Set the enabled flag, stamping `last_seen_time` on a disabled to enabled transition.
    pub fn set_enabled(&mut self, enabled: bool, now: DateTime<Utc>) {
        if enabled && !self.enabled {
            self.last_seen_time = now;
        }
        self.enabled = enabled;
    }
}

/// The persisted block list: users and boards, each in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockList {
    /// Blocked users.
    #[serde(default)]
    pub users: Vec<BlockedEntity>,
    /// Blocked boards.
    #[serde(default)]
    pub boards: Vec<BlockedEntity>,
}

impl BlockList {
    /// Create a block list from both kinds.
    #[must_use]
    pub fn new(users: Vec<BlockedEntity>, boards: Vec<BlockedEntity>) -> Self {
        Self { users, boards }
    }

    /// Entries of one kind.
    #[must_use]
    pub fn entries(&self, kind: EntityKind) -> &[BlockedEntity] {
        match kind {
            EntityKind::User => &self.users,
            EntityKind::Board => &self.boards,
        }
    }

    /// Mutable entries of one kind.
    pub fn entries_mut(&mut self, kind: EntityKind) -> &mut Vec<BlockedEntity> {
        match kind {
            EntityKind::User => &mut self.users,
            EntityKind::Board => &mut self.boards,
        }
    }

    /// Look up an entity.
    #[must_use]
    pub fn get(&self, kind: EntityKind, id: &str) -> Option<&BlockedEntity> {
        self.entries(kind).iter().find(|e| e.id == id)
    }

    /// Look up an entity mutably.
    pub fn get_mut(&mut self, kind: EntityKind, id: &str) -> Option<&mut BlockedEntity> {
        self.entries_mut(kind).iter_mut().find(|e| e.id == id)
    }

    /// Check whether an entity of this kind and id is present.
    #[must_use]
    pub fn contains(&self, kind: EntityKind, id: &str) -> bool {
        self.get(kind, id).is_some()
    }

    /// Total number of entries across both kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len() + self.boards.len()
    }

    /// Check if both lists are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.boards.is_empty()
    }

    /// Drop repeated ids within each kind, keeping the first occurrence.
    pub fn dedup(&mut self) {
        for kind in [EntityKind::User, EntityKind::Board] {
            let mut seen = HashSet::new();
            self.entries_mut(kind).retain(|e| seen.insert(e.id.clone()));
        }
    }
}

/// The matching view of a [`BlockList`]: only enabled ids, split by kind.
///
/// Always rebuilt wholesale with [`ActiveBlockSet::project`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveBlockSet {
    users: HashSet<String>,
    boards: HashSet<String>,
    labels: HashMap<String, String>,
}

impl ActiveBlockSet {
    /// Project the enabled entries of a block list.
    #[must_use]
    pub fn project(list: &BlockList) -> Self {
        let mut set = Self::default();
        for user in list.users.iter().filter(|u| u.enabled) {
            set.users.insert(user.id.clone());
            if let Some(label) = user.label() {
                set.labels.insert(user.id.clone(), label.to_string());
            }
        }
        set.boards = list
            .boards
            .iter()
            .filter(|b| b.enabled)
            .map(|b| b.id.clone())
            .collect();
        set
    }

    /// Check whether a username is actively blocked.
    #[must_use]
    pub fn is_user_blocked(&self, username: &str) -> bool {
        self.users.contains(username)
    }

    /// Check whether a board name is actively blocked.
    #[must_use]
    pub fn is_board_blocked(&self, board: &str) -> bool {
        self.boards.contains(board)
    }

    /// The label to show for a blocked user, falling back to `default`.
    #[must_use]
    pub fn label_for<'a>(&'a self, username: &str, default: &'a str) -> &'a str {
        self.labels.get(username).map_or(default, String::as_str)
    }

    /// Number of active users.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Number of active boards.
    #[must_use]
    pub fn board_count(&self) -> usize {
        self.boards.len()
    }

    /// Check whether nothing is blocked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.boards.is_empty()
    }
}
