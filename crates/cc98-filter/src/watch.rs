//! Page-change watching.
//!
//! The page side reports inserted nodes as [`MutationBatch`]es over a channel.
//! The engine asks the [`MutationWatcher`] whether a batch brought in any
//! interesting fragment and, if so, (re)arms its [`Debouncer`]. Bursts of
//! batches inside the delay collapse into one trailing re-scan.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::dom::{Document, NodeId, Selector};
use crate::error::{Error, Result};
use crate::filter::SurfaceTable;

/// A document shared between the page side and the engine on one thread.
pub type SharedDocument = Rc<RefCell<Document>>;

/// Nodes inserted by one page mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationBatch {
    /// Top-level inserted nodes. Their descendants came in with them.
    pub added: Vec<NodeId>,
}

impl MutationBatch {
    /// Create a batch.
    #[must_use]
    pub fn new(added: Vec<NodeId>) -> Self {
        Self { added }
    }
}

/// Decides whether a batch warrants a re-scan.
#[derive(Debug, Clone)]
pub struct MutationWatcher {
    root: Selector,
    shapes: Vec<Selector>,
}

impl MutationWatcher {
    /// Watch the subtree matching `root` for the given fragment shapes.
    #[must_use]
    pub fn new(root: Selector, shapes: Vec<Selector>) -> Self {
        Self { root, shapes }
    }

    /// Watch for every surface of a table.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not a valid selector.
    pub fn for_surfaces(root: &str, surfaces: &SurfaceTable) -> Result<Self> {
        Ok(Self::new(Selector::parse(root)?, surfaces.shapes()))
    }

    /// Check whether any inserted node, or a descendant of one, is an
    /// interesting fragment inside the observed root.
    #[must_use]
    pub fn is_relevant(&self, doc: &Document, batch: &MutationBatch) -> bool {
        batch.added.iter().any(|node| {
            doc.is_element(*node)
                && doc.is_attached(*node)
                && self.is_observed(doc, *node)
                && self.shapes.iter().any(|shape| {
                    doc.matches(*node, shape) || doc.select_first(*node, shape).is_some()
                })
        })
    }

    fn is_observed(&self, doc: &Document, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if doc.matches(id, &self.root) {
                return true;
            }
            current = doc.parent_element(id);
        }
        false
    }
}

/// Cancel-and-reschedule timer with at most one pending deadline.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    /// Create an idle debouncer.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// The configured delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm the timer `delay` from now, replacing any pending deadline.
    /// Returns `true` if a pending deadline was replaced.
    pub fn schedule(&mut self) -> bool {
        self.deadline.replace(Instant::now() + self.delay).is_some()
    }

    /// Drop the pending deadline. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Check for a pending deadline.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// The pending deadline.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Sleep until `deadline`, or forever when there is none.
pub async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// The page-script side: mutates the shared document and reports insertions.
#[derive(Debug, Clone)]
pub struct PageHandle {
    document: SharedDocument,
    sender: mpsc::UnboundedSender<MutationBatch>,
}

/// Create a page handle and the receiving end the engine listens on.
#[must_use]
pub fn page_channel(document: SharedDocument) -> (PageHandle, mpsc::UnboundedReceiver<MutationBatch>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (PageHandle { document, sender }, receiver)
}

impl PageHandle {
    /// The shared document.
    #[must_use]
    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    /// Parse `html` and append it under `parent`, then report the insertion.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` is not in the document.
    pub fn insert_html(&self, parent: NodeId, html: &str) -> Result<Vec<NodeId>> {
        let added = self.document.borrow_mut().append_html(parent, html)?;
        self.notify(MutationBatch::new(added.clone()));
        Ok(added)
    }

    /// Append `html` under the first element matching `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing matches `parent`.
    pub fn insert_html_into(&self, parent: &Selector, html: &str) -> Result<Vec<NodeId>> {
        let target = {
            let doc = self.document.borrow();
            doc.select_first(doc.root(), parent)
        };
        let target = target.ok_or_else(|| {
            Error::internal(format!("no element matches '{parent}' to insert into"))
        })?;
        self.insert_html(target, html)
    }

    /// Report a batch. An engine that has gone away is not an error.
    pub fn notify(&self, batch: MutationBatch) {
        trace!(nodes = batch.added.len(), "Reporting mutation batch");
        if self.sender.send(batch).is_err() {
            debug!("Mutation batch dropped, engine is gone");
        }
    }
}
