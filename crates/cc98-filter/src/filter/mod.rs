//! Content filtering.
//!
//! A scan is split in two. [`plan`] reads a document and the active block set
//! and decides what to change, returning a list of [`Command`]s; it never
//! mutates anything. [`apply`] carries the commands out. Fragments that were
//! already processed carry a marker attribute (and sit in the
//! [`RedactionLedger`]) and are skipped, which makes repeated scans idempotent.
//! Message windows are re-read every time instead: withholding removes the
//! title they are matched on.

mod command;
mod ledger;
mod plan;
mod surface;

pub use command::{apply, ApplyOutcome, Command};
pub use ledger::{Action, FragmentKey, LedgerEntry, Redaction, RedactionLedger};
pub use plan::plan;
pub use surface::{FieldSurface, Surface, SurfaceTable, WindowSurface};

use chrono::{DateTime, Utc};

use crate::config::{Config, LabelConfig, MarkerConfig};
use crate::dom::{Document, NodeId};
use crate::entity::ActiveBlockSet;
use crate::error::Result;

/// Everything a scan needs from the configuration, compiled once.
#[derive(Debug, Clone)]
pub struct FilterSettings {
    /// Fragment-shape selectors.
    pub surfaces: SurfaceTable,
    /// Placeholder text.
    pub labels: LabelConfig,
    /// Marker attribute names.
    pub markers: MarkerConfig,
    /// Replacement avatar image.
    pub icon_url: String,
    /// URL prefix of private-message pages.
    pub message_page_prefix: String,
}

impl FilterSettings {
    /// Compile the filter settings from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a selector or the title pattern does not compile.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            surfaces: SurfaceTable::compile(&config.selectors)?,
            labels: config.labels.clone(),
            markers: config.markers.clone(),
            icon_url: config.engine.icon_url.clone(),
            message_page_prefix: config.engine.message_page_prefix.clone(),
        })
    }

    /// Whether the message surfaces apply to a page. Unknown URLs match.
    #[must_use]
    pub fn is_message_page(&self, url: Option<&str>) -> bool {
        url.map_or(true, |url| url.starts_with(&self.message_page_prefix))
    }
}

/// Inputs of one scan.
#[derive(Debug, Clone, Copy)]
pub struct ScanContext<'a> {
    /// Compiled settings.
    pub settings: &'a FilterSettings,
    /// Who and what is blocked.
    pub blocks: &'a ActiveBlockSet,
    /// Fragments processed by earlier scans.
    pub ledger: Option<&'a RedactionLedger>,
    /// Timestamp written into redacted bodies.
    pub now: DateTime<Utc>,
}

impl<'a> ScanContext<'a> {
    /// Create a context without a ledger.
    #[must_use]
    pub fn new(settings: &'a FilterSettings, blocks: &'a ActiveBlockSet, now: DateTime<Utc>) -> Self {
        Self {
            settings,
            blocks,
            ledger: None,
            now,
        }
    }

    /// Also skip fragments recorded in `ledger`.
    #[must_use]
    pub fn with_ledger(mut self, ledger: &'a RedactionLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    fn is_processed(&self, doc: &Document, fragment: NodeId) -> bool {
        let markers = &self.settings.markers;
        doc.has_attr(fragment, &markers.redacted)
            || doc.has_attr(fragment, &markers.board_blocked)
            || self
                .ledger
                .is_some_and(|ledger| ledger.contains_node(fragment))
    }
}

/// The result of planning a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPlan {
    /// Mutations, in the order they must be applied.
    pub commands: Vec<Command>,
    /// One record per fragment the commands act on.
    pub redactions: Vec<Redaction>,
    /// Fragments skipped because they were already processed.
    pub skipped: usize,
}

impl ScanPlan {
    /// Check whether the scan changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of fragments receiving `action`.
    #[must_use]
    pub fn count(&self, action: Action) -> usize {
        self.redactions
            .iter()
            .filter(|redaction| redaction.action == action)
            .count()
    }
}
