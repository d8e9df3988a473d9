//! In-memory page model.
//!
//! A [`Document`] wraps a parsed [`scraper::Html`] tree. Nodes are addressed
//! by [`NodeId`], which stays valid for the life of the document: detaching a
//! node unlinks it from its parent but keeps it in the tree, so a stale id can
//! be recognised with [`Document::is_attached`].
//!
//! Queries go through [`Selector`], mutation through a handful of primitives
//! that mirror what a content script does to a live page.

mod html;
mod selector;

pub use selector::Selector;

use ego_tree::{NodeMut, NodeRef};
use html5ever::tendril::StrTendril;
use html5ever::{Attribute, LocalName, Namespace, QualName};
use scraper::node::{Element, Text};
use scraper::{CaseSensitivity, ElementRef, Html, Node};

use crate::error::{Error, Result};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Handle to a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(ego_tree::NodeId);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// An owned subtree, used to build placeholder content and to snapshot
/// fragments before they are rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    /// An element with attributes and children.
    Element {
        /// Lowercase tag name.
        tag: String,
        /// Attributes in source order.
        attrs: Vec<(String, String)>,
        /// Child subtrees.
        children: Vec<Markup>,
    },
    /// A text node.
    Text(String),
}

impl Markup {
    /// Start an element.
    #[must_use]
    pub fn element(tag: impl Into<String>) -> Self {
        Self::Element {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// A text node.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Add an attribute. No effect on text nodes.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Element { attrs, .. } = &mut self {
            attrs.push((name.into(), value.into()));
        }
        self
    }

    /// Add a `style` attribute.
    #[must_use]
    pub fn style(self, css: impl Into<String>) -> Self {
        self.attr("style", css)
    }

    /// Append a child. No effect on text nodes.
    #[must_use]
    pub fn child(mut self, child: Markup) -> Self {
        if let Self::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    /// Concatenated text of the subtree.
    #[must_use]
    pub fn text_content(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Element { children, .. } => children.iter().map(Self::text_content).collect(),
        }
    }

    fn from_node(node: NodeRef<'_, Node>) -> Option<Self> {
        match node.value() {
            Node::Text(text) => Some(Self::text(&**text)),
            Node::Element(element) => Some(Self::Element {
                tag: element.name().to_string(),
                attrs: owned_attrs(element),
                children: node.children().filter_map(Self::from_node).collect(),
            }),
            _ => None,
        }
    }
}

/// A parsed page.
#[derive(Debug, Clone)]
pub struct Document {
    html: Html,
    url: Option<String>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            html: Html::new_document(),
            url: None,
        }
    }

    /// Attach the page URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// The page URL, if known.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// The document root. It is not an element.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(self.html.tree.root().id())
    }

    /// Number of nodes held, detached ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.html.tree.nodes().count()
    }

    /// Check whether the document holds nothing but its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.html.tree.root().has_children()
    }

    fn node(&self, id: NodeId) -> Option<NodeRef<'_, Node>> {
        self.html.tree.get(id.0)
    }

    fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.node(id).and_then(ElementRef::wrap)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<NodeMut<'_, Node>> {
        self.html.tree.get_mut(id.0).ok_or(Error::NodeNotFound(id))
    }

    /// Rebuild an element with edited attributes. The element is replaced
    /// rather than patched so its cached id and classes stay in step.
    fn edit_attrs<F>(&mut self, id: NodeId, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<(String, String)>),
    {
        let mut node = self.node_mut(id)?;
        let Node::Element(element) = node.value() else {
            return Err(Error::internal(format!("node {id} is not an element")));
        };
        let mut attrs = owned_attrs(element);
        edit(&mut attrs);
        *element = Element::new(element.name.clone(), attributes(&attrs));
        Ok(())
    }

    /// Tag name of an element.
    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|element| element.value().name())
    }

    /// Check whether the node is an element.
    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    /// Attribute value of an element.
    #[must_use]
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    /// Check for an attribute.
    #[must_use]
    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// Check for a class in the `class` attribute.
    #[must_use]
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|element| {
            element
                .value()
                .has_class(class, CaseSensitivity::CaseSensitive)
        })
    }

    /// Set an attribute, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist or is not an element.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        self.edit_attrs(id, |attrs| {
            if let Some(slot) = attrs.iter_mut().find(|(key, _)| key == name) {
                slot.1 = value.to_string();
            } else {
                attrs.push((name.to_string(), value.to_string()));
            }
        })
    }

    /// Remove an attribute if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist or is not an element.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<()> {
        self.edit_attrs(id, |attrs| attrs.retain(|(key, _)| key != name))
    }

    /// Value of one declaration in the inline `style` attribute.
    #[must_use]
    pub fn style(&self, id: NodeId, property: &str) -> Option<String> {
        parse_declarations(self.attr(id, "style")?)
            .into_iter()
            .find(|(prop, _)| prop == property)
            .map(|(_, value)| value)
    }

    /// Merge one declaration into the inline `style` attribute.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist or is not an element.
    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) -> Result<()> {
        let mut declarations = self
            .attr(id, "style")
            .map(parse_declarations)
            .unwrap_or_default();
        if let Some(slot) = declarations.iter_mut().find(|(prop, _)| prop == property) {
            slot.1 = value.to_string();
        } else {
            declarations.push((property.to_string(), value.to_string()));
        }
        let css = declarations
            .iter()
            .map(|(prop, value)| format!("{prop}: {value};"))
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attr(id, "style", &css)
    }

    /// Parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent().map(|parent| NodeId(parent.id()))
    }

    /// Parent of a node, if that parent is an element.
    #[must_use]
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|parent| self.is_element(*parent))
    }

    /// Children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).map_or_else(Vec::new, |node| {
            node.children().map(|child| NodeId(child.id())).collect()
        })
    }

    /// Check whether the node is still reachable from the root.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(self.root(), id)
    }

    /// Check whether `ancestor` contains `id` (a node contains itself).
    #[must_use]
    pub fn contains(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.node(id).is_some_and(|node| {
            node.id() == ancestor.0 || node.ancestors().any(|up| up.id() == ancestor.0)
        })
    }

    /// Descendants of a node in document order, excluding the node itself.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).map_or_else(Vec::new, |node| {
            node.descendants()
                .skip(1)
                .map(|next| NodeId(next.id()))
                .collect()
        })
    }

    /// Concatenated text of a node and its descendants.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        self.node(id).map_or_else(String::new, |node| {
            node.descendants()
                .filter_map(|next| next.value().as_text())
                .map(|text| &**text)
                .collect()
        })
    }

    /// Append a built subtree under `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` does not exist.
    pub fn append_markup(&mut self, parent: NodeId, markup: &Markup) -> Result<NodeId> {
        let mut parent = self.node_mut(parent)?;
        Ok(build(&mut parent, markup))
    }

    /// Unlink all children of a node.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn clear_children(&mut self, id: NodeId) -> Result<()> {
        if self.node(id).is_none() {
            return Err(Error::NodeNotFound(id));
        }
        for child in self.children(id) {
            if let Some(mut child) = self.html.tree.get_mut(child.0) {
                child.detach();
            }
        }
        Ok(())
    }

    /// Replace a node's children with a single text node.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<()> {
        self.replace_children(id, &[Markup::text(text)])?;
        Ok(())
    }

    /// Replace a node's children with built subtrees.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn replace_children(&mut self, id: NodeId, markup: &[Markup]) -> Result<Vec<NodeId>> {
        self.clear_children(id)?;
        let mut node = self.node_mut(id)?;
        Ok(markup.iter().map(|m| build(&mut node, m)).collect())
    }

    /// Unlink a node from its parent. Detaching a detached node is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist or is the root.
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        if id == self.root() {
            return Err(Error::internal("cannot detach the document root"));
        }
        self.node_mut(id)?.detach();
        Ok(())
    }

    /// Owned copy of a subtree.
    #[must_use]
    pub fn snapshot(&self, id: NodeId) -> Option<Markup> {
        Markup::from_node(self.node(id)?)
    }

    /// Put a snapshot back in place: the element keeps its id but takes the
    /// snapshot's attributes and children.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist, is not an element, or the
    /// snapshot is a text node.
    pub fn restore(&mut self, id: NodeId, snapshot: &Markup) -> Result<()> {
        let Markup::Element {
            attrs, children, ..
        } = snapshot
        else {
            return Err(Error::internal("cannot restore an element from text"));
        };
        self.edit_attrs(id, |current| current.clone_from(attrs))?;
        self.replace_children(id, children)?;
        Ok(())
    }

    /// Check whether a node matches a selector.
    #[must_use]
    pub fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        self.element(id)
            .is_some_and(|element| selector.matches(&element))
    }

    fn matching<'a>(
        &'a self,
        scope: NodeId,
        selector: &'a Selector,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.node(scope)
            .into_iter()
            .flat_map(|scope| scope.descendants().skip(1))
            .filter_map(ElementRef::wrap)
            .filter(|element| selector.matches(element))
            .map(|element| NodeId(element.id()))
    }

    /// All element descendants of `scope` matching the selector, in document order.
    #[must_use]
    pub fn select(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.matching(scope, selector).collect()
    }

    /// First element descendant of `scope` matching the selector.
    #[must_use]
    pub fn select_first(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.matching(scope, selector).next()
    }

    /// First match of the first selector in `chain` that matches anything.
    ///
    /// This is the lookup used for fields that render differently across
    /// markup generations.
    #[must_use]
    pub fn select_fallback(&self, scope: NodeId, chain: &[Selector]) -> Option<NodeId> {
        chain
            .iter()
            .find_map(|selector| self.select_first(scope, selector))
    }
}

/// Append `markup` under `parent` and return the id of its top node.
fn build(parent: &mut NodeMut<'_, Node>, markup: &Markup) -> NodeId {
    match markup {
        Markup::Text(text) => NodeId(
            parent
                .append(Node::Text(Text {
                    text: StrTendril::from_slice(text),
                }))
                .id(),
        ),
        Markup::Element {
            tag,
            attrs,
            children,
        } => {
            let name = QualName::new(
                None,
                Namespace::from(HTML_NAMESPACE),
                LocalName::from(tag.to_ascii_lowercase()),
            );
            let mut node = parent.append(Node::Element(Element::new(name, attributes(attrs))));
            for child in children {
                build(&mut node, child);
            }
            NodeId(node.id())
        }
    }
}

fn owned_attrs(element: &Element) -> Vec<(String, String)> {
    element
        .attrs()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

fn attributes(attrs: &[(String, String)]) -> Vec<Attribute> {
    attrs
        .iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, Namespace::from(""), LocalName::from(name.as_str())),
            value: StrTendril::from_slice(value),
        })
        .collect()
}

fn parse_declarations(css: &str) -> Vec<(String, String)> {
    css.split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim();
            (!prop.is_empty()).then(|| (prop.to_ascii_lowercase(), value.trim().to_string()))
        })
        .collect()
}
