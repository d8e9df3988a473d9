//! Processed-fragment bookkeeping.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::Surface;
use crate::dom::{Markup, NodeId};
use crate::entity::EntityKind;

/// Content-addressed identity of a processed fragment: (surface, owner, node).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FragmentKey(blake3::Hash);

impl FragmentKey {
    /// Derive the key for a fragment.
    #[must_use]
    pub fn new(surface: Surface, owner: &str, node: NodeId) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(surface.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(owner.as_bytes());
        hasher.update(&[0]);
        hasher.update(node.to_string().as_bytes());
        Self(hasher.finalize())
    }

    /// Short hex form written as the marker value.
    #[must_use]
    pub fn short(&self) -> String {
        self.0.to_hex().as_str()[..16].to_string()
    }
}

impl std::fmt::Display for FragmentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

/// What was done to a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Hidden whole because its board is blocked.
    Hidden,
    /// User fields rewritten in place.
    Redacted,
    /// Subtree replaced by the withheld panel.
    Withheld,
}

/// One fragment decision of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redaction {
    /// Ledger key.
    pub key: FragmentKey,
    /// Surface the fragment belongs to.
    pub surface: Surface,
    /// The fragment's outer element.
    pub node: NodeId,
    /// Kind of the owner that triggered the decision.
    pub owner_kind: EntityKind,
    /// Username or board name.
    pub owner: String,
    /// What the scan does to it.
    pub action: Action,
}

/// A ledger entry: the decision plus the pre-redaction subtree, if kept.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    /// The recorded decision.
    pub redaction: Redaction,
    /// The fragment as it was before the first rewrite.
    pub snapshot: Option<Markup>,
}

/// In-memory set of fragments the engine has already processed.
#[derive(Debug, Clone, Default)]
pub struct RedactionLedger {
    entries: HashMap<FragmentKey, LedgerEntry>,
    nodes: HashSet<NodeId>,
}

impl RedactionLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a processed fragment. A second record for the same key is ignored
    /// so the original snapshot survives.
    pub fn record(&mut self, redaction: Redaction, snapshot: Option<Markup>) -> bool {
        if self.entries.contains_key(&redaction.key) {
            return false;
        }
        self.nodes.insert(redaction.node);
        self.entries
            .insert(redaction.key, LedgerEntry { redaction, snapshot });
        true
    }

    /// Record a processed fragment, replacing an earlier entry for the same
    /// key. Used for fragments whose content the page may render again.
    pub fn replace(&mut self, redaction: Redaction, snapshot: Option<Markup>) {
        self.nodes.insert(redaction.node);
        self.entries
            .insert(redaction.key, LedgerEntry { redaction, snapshot });
    }

    /// Check whether a fragment node has been processed.
    #[must_use]
    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    /// Check for a key.
    #[must_use]
    pub fn contains(&self, key: &FragmentKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up an entry.
    #[must_use]
    pub fn get(&self, key: &FragmentKey) -> Option<&LedgerEntry> {
        self.entries.get(key)
    }

    /// Remove and return every entry matching `predicate`.
    pub fn drain_where<F>(&mut self, mut predicate: F) -> Vec<LedgerEntry>
    where
        F: FnMut(&Redaction) -> bool,
    {
        let keys: Vec<FragmentKey> = self
            .entries
            .values()
            .filter(|entry| predicate(&entry.redaction))
            .map(|entry| entry.redaction.key)
            .collect();
        let mut drained: Vec<LedgerEntry> = keys
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .collect();
        for entry in &drained {
            self.nodes.remove(&entry.redaction.node);
        }
        drained
    }

    /// Number of recorded fragments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recorded decisions, in no particular order.
    pub fn redactions(&self) -> impl Iterator<Item = &Redaction> {
        self.entries.values().map(|entry| &entry.redaction)
    }
}
