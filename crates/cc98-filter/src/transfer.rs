//! Backup export and import.
//!
//! A backup is a JSON document:
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "pluginVersion": "0.3.0",
//!   "timestamp": 1700000000000,
//!   "blockedUsers": [ ... ],
//!   "blockedBoards": [ ... ]
//! }
//! ```
//!
//! Import checks the document in stages (JSON syntax, the two arrays, then the
//! version) and only touches the live list once everything has passed.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::entity::{BlockList, BlockedEntity};
use crate::error::{Error, Result};
use crate::settings::BlockManager;

/// Backup format version written by [`export`].
pub const BACKUP_FORMAT_VERSION: &str = "1.0";

/// Version of this program, recorded in every backup.
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

const SUPPORTED_VERSION: f64 = 1.0;

/// A backup document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    /// Format version. Older backups may carry it as a JSON number.
    #[serde(default, deserialize_with = "version_text")]
    pub version: String,
    /// Version of the program that wrote the backup.
    #[serde(default)]
    pub plugin_version: String,
    /// When the backup was written.
    #[serde(with = "chrono::serde::ts_milliseconds", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Blocked users.
    pub blocked_users: Vec<BlockedEntity>,
    /// Blocked boards.
    pub blocked_boards: Vec<BlockedEntity>,
}

impl Backup {
    /// Render as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Snapshot a block list into a backup.
#[must_use]
pub fn export(list: &BlockList, now: DateTime<Utc>) -> Backup {
    Backup {
        version: BACKUP_FORMAT_VERSION.to_string(),
        plugin_version: PLUGIN_VERSION.to_string(),
        timestamp: now,
        blocked_users: list.users.clone(),
        blocked_boards: list.boards.clone(),
    }
}

/// Default file name for a backup written at `now`.
#[must_use]
pub fn backup_file_name(now: DateTime<Utc>) -> String {
    format!(
        "cc98_filter_backup_v{PLUGIN_VERSION}_{}.json",
        now.format("%Y-%m-%dT%H-%M-%S-%3fZ")
    )
}

/// Parse and validate a backup document.
///
/// # Errors
///
/// Returns [`Error::ImportFormat`] if the text is not JSON, either array is
/// missing or not an array, or an entry is malformed.
pub fn parse_backup(json: &str) -> Result<Backup> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| Error::import_format(format!("not valid JSON: {e}")))?;

    for key in ["blockedUsers", "blockedBoards"] {
        if !value.get(key).is_some_and(Value::is_array) {
            return Err(Error::import_format(format!(
                "missing or non-array field '{key}'"
            )));
        }
    }

    serde_json::from_value(value).map_err(|e| Error::import_format(e.to_string()))
}

/// Read a version written either as a string or as a number.
fn version_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "version must be a string or a number, found {other}"
        ))),
    }
}

/// How imported entries combine with the current list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportPolicy {
    /// Keep existing entries and append unseen ids.
    Merge,
    /// Discard the current lists.
    Replace,
}

/// What an import did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    /// The policy applied.
    pub policy: ImportPolicy,
    /// Users added (merge) or now listed (replace).
    pub users: usize,
    /// Boards added (merge) or now listed (replace).
    pub boards: usize,
}

impl fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.policy {
            ImportPolicy::Merge => write!(
                f,
                "merged {} new users and {} new boards",
                self.users, self.boards
            ),
            ImportPolicy::Replace => write!(
                f,
                "replaced with {} users and {} boards",
                self.users, self.boards
            ),
        }
    }
}

/// Operator confirmation hook. Receives the question, returns the answer.
pub type Confirm<'a> = &'a mut dyn FnMut(&str) -> bool;

/// Import a backup into `manager`.
///
/// A backup newer than the supported format asks `confirm` first.
///
/// # Errors
///
/// Returns [`Error::ImportFormat`] for a malformed document,
/// [`Error::ImportCancelled`] if the operator declines, or a storage error.
/// The live list is unchanged in every error case.
pub fn import(
    manager: &mut BlockManager,
    json: &str,
    policy: ImportPolicy,
    confirm: Confirm<'_>,
) -> Result<ImportOutcome> {
    let backup = parse_backup(json)?;

    if is_newer(&backup.version) {
        let question = format!(
            "Backup format {} is newer than the supported {BACKUP_FORMAT_VERSION} and may not import cleanly. Continue?",
            backup.version
        );
        if !confirm(&question) {
            info!(version = %backup.version, "Import declined");
            return Err(Error::ImportCancelled);
        }
    }

    let (next, outcome) = match policy {
        ImportPolicy::Merge => merge(manager.list(), backup),
        ImportPolicy::Replace => {
            let mut next = BlockList::new(backup.blocked_users, backup.blocked_boards);
            next.dedup();
            let outcome = ImportOutcome {
                policy,
                users: next.users.len(),
                boards: next.boards.len(),
            };
            (next, outcome)
        }
    };

    manager.replace_list(next)?;
    info!(%outcome, "Import complete");
    Ok(outcome)
}

fn merge(current: &BlockList, backup: Backup) -> (BlockList, ImportOutcome) {
    let mut next = current.clone();
    let users = append_unseen(&mut next.users, backup.blocked_users);
    let boards = append_unseen(&mut next.boards, backup.blocked_boards);
    (
        next,
        ImportOutcome {
            policy: ImportPolicy::Merge,
            users,
            boards,
        },
    )
}

fn append_unseen(entries: &mut Vec<BlockedEntity>, incoming: Vec<BlockedEntity>) -> usize {
    let mut added = 0;
    for mut entity in incoming {
        entity.id = entity.id.trim().to_string();
        if entity.id.is_empty() {
            warn!("Skipping backup entry with an empty id");
            continue;
        }
        if entries.iter().any(|e| e.id == entity.id) {
            continue;
        }
        entries.push(entity);
        added += 1;
    }
    added
}

/// Whether a version string reads as a number above the supported version.
/// Only the leading numeric part counts, so `"1.0.3"` is `1.0` and `"x"` is
/// not a number at all.
fn is_newer(version: &str) -> bool {
    leading_number(version).is_some_and(|v| v > SUPPORTED_VERSION)
}

fn leading_number(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in text.char_indices() {
        match c {
            '0'..='9' => end = i + 1,
            '.' if !seen_dot => seen_dot = true,
            '+' | '-' if i == 0 => {}
            _ => break,
        }
    }
    text[..end].parse().ok()
}
