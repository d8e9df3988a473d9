//! Mutation commands and the adapter that applies them to a document.

use serde::Serialize;
use tracing::{trace, warn};

use crate::dom::{Document, Markup, NodeId};
use crate::error::Result;

/// One DOM mutation decided by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Make the node invisible.
    Hide {
        /// Target element.
        target: NodeId,
    },
    /// Set an attribute.
    SetAttr {
        /// Target element.
        target: NodeId,
        /// Attribute name.
        name: String,
        /// New value.
        value: String,
    },
    /// Merge one inline style declaration.
    SetStyle {
        /// Target element.
        target: NodeId,
        /// CSS property.
        property: String,
        /// CSS value.
        value: String,
    },
    /// Replace the children with a text node.
    SetText {
        /// Target element.
        target: NodeId,
        /// New text.
        text: String,
    },
    /// Replace the children with built content.
    ReplaceChildren {
        /// Target element.
        target: NodeId,
        /// New children.
        markup: Vec<Markup>,
    },
    /// Remove all children.
    ClearChildren {
        /// Target element.
        target: NodeId,
    },
    /// Detach the node from the page.
    Remove {
        /// Target node.
        target: NodeId,
    },
    /// Stamp a processed-fragment marker.
    Mark {
        /// Target fragment.
        target: NodeId,
        /// Marker attribute name.
        marker: String,
        /// Marker value.
        value: String,
    },
}

impl Command {
    /// The node the command acts on.
    #[must_use]
    pub fn target(&self) -> NodeId {
        match self {
            Self::Hide { target }
            | Self::SetAttr { target, .. }
            | Self::SetStyle { target, .. }
            | Self::SetText { target, .. }
            | Self::ReplaceChildren { target, .. }
            | Self::ClearChildren { target }
            | Self::Remove { target }
            | Self::Mark { target, .. } => *target,
        }
    }

    pub(crate) fn set_attr(target: NodeId, name: &str, value: impl Into<String>) -> Self {
        Self::SetAttr {
            target,
            name: name.to_string(),
            value: value.into(),
        }
    }

    pub(crate) fn set_style(target: NodeId, property: &str, value: &str) -> Self {
        Self::SetStyle {
            target,
            property: property.to_string(),
            value: value.to_string(),
        }
    }

    fn execute(&self, doc: &mut Document) -> Result<()> {
        match self {
            Self::Hide { target } => doc.set_style(*target, "display", "none"),
            Self::SetAttr {
                target,
                name,
                value,
            }
            | Self::Mark {
                target,
                marker: name,
                value,
            } => doc.set_attr(*target, name, value),
            Self::SetStyle {
                target,
                property,
                value,
            } => doc.set_style(*target, property, value),
            Self::SetText { target, text } => doc.set_text(*target, text),
            Self::ReplaceChildren { target, markup } => {
                doc.replace_children(*target, markup).map(|_| ())
            }
            Self::ClearChildren { target } => doc.clear_children(*target),
            Self::Remove { target } => doc.detach(*target),
        }
    }
}

/// Counts from one [`apply`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    /// Commands that changed the document.
    pub applied: usize,
    /// Commands skipped because their target was gone or unsuitable.
    pub skipped: usize,
}

/// Apply commands in order.
///
/// A command whose target is no longer attached (removed by the page or by an
/// earlier command) is skipped. A failing command is logged and skipped; it
/// never stops the rest.
pub fn apply(doc: &mut Document, commands: &[Command]) -> ApplyOutcome {
    let mut outcome = ApplyOutcome::default();
    for command in commands {
        let target = command.target();
        if !doc.is_attached(target) {
            trace!(%target, "Skipping command on detached node");
            outcome.skipped += 1;
            continue;
        }
        match command.execute(doc) {
            Ok(()) => outcome.applied += 1,
            Err(e) => {
                warn!(%target, error = %e, "Command failed");
                outcome.skipped += 1;
            }
        }
    }
    outcome
}
