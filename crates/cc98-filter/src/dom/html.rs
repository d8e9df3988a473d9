//! Parsing and serialization through `scraper` and html5ever.

use ego_tree::{NodeMut, NodeRef};
use scraper::{ElementRef, Html, Node};

use super::{Document, NodeId};
use crate::error::Result;

impl Document {
    /// Parse a full page.
    #[must_use]
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
            url: None,
        }
    }

    /// Parse a full page and record its URL.
    #[must_use]
    pub fn parse_with_url(html: &str, url: impl Into<String>) -> Self {
        Self::parse(html).with_url(url)
    }

    /// Parse an HTML fragment and append its top-level nodes under `parent`.
    ///
    /// Returns the ids of the appended top-level nodes.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` does not exist.
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Result<Vec<NodeId>> {
        let fragment = Html::parse_fragment(html);
        let mut parent = self.node_mut(parent)?;
        Ok(fragment
            .root_element()
            .children()
            .map(|child| graft(&mut parent, child))
            .collect())
    }

    /// Serialize the whole document.
    #[must_use]
    pub fn to_html(&self) -> String {
        self.html.html()
    }

    /// Serialize an element including its own tag. Empty for other nodes.
    #[must_use]
    pub fn outer_html(&self, id: NodeId) -> String {
        self.element(id)
            .map(|element| element.html())
            .unwrap_or_default()
    }

    /// Serialize an element's children. Empty for other nodes.
    #[must_use]
    pub fn inner_html(&self, id: NodeId) -> String {
        self.element(id)
            .map(|element| element.inner_html())
            .unwrap_or_default()
    }
}

/// Copy `source` and its subtree from a parsed fragment under `parent`.
fn graft(parent: &mut NodeMut<'_, Node>, source: NodeRef<'_, Node>) -> NodeId {
    let mut copy = parent.append(source.value().clone());
    for child in source.children() {
        graft(&mut copy, child);
    }
    NodeId(copy.id())
}
