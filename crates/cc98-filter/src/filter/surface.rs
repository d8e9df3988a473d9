//! Compiled fragment-shape tables.

use regex::Regex;
use serde::Serialize;

use crate::config::{SelectorConfig, SurfaceSelectors, WindowSelectors};
use crate::dom::{Document, NodeId, Selector};
use crate::error::{Error, Result};

/// A kind of content fragment on a forum page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    /// A topic card in a topic list.
    Topic,
    /// A reply post in a thread.
    Reply,
    /// A row of the hot list.
    HotList,
    /// A contact entry in the private-message list.
    MessageContact,
    /// The open private-message conversation.
    MessageWindow,
}

impl Surface {
    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Topic => "topic",
            Self::Reply => "reply",
            Self::HotList => "hot_list",
            Self::MessageContact => "message_contact",
            Self::MessageWindow => "message_window",
        }
    }

    /// Whether the surface only exists on private-message pages.
    #[must_use]
    pub const fn is_message_page_only(self) -> bool {
        matches!(self, Self::MessageContact | Self::MessageWindow)
    }
}

impl std::fmt::Display for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selectors of one field-based surface, compiled.
#[derive(Debug, Clone)]
pub struct FieldSurface {
    pub(crate) surface: Surface,
    pub(crate) fragment: Option<Selector>,
    pub(crate) board: Vec<Selector>,
    pub(crate) username: Vec<Selector>,
    pub(crate) avatar: Vec<Selector>,
    pub(crate) title: Vec<Selector>,
    pub(crate) body: Vec<Selector>,
    pub(crate) info: Vec<Selector>,
    pub(crate) media: Vec<Selector>,
    pub(crate) chrome: Vec<Selector>,
    pub(crate) preview: Vec<Selector>,
}

impl FieldSurface {
    fn compile(surface: Surface, config: &SurfaceSelectors) -> Result<Self> {
        Ok(Self {
            surface,
            fragment: compile_union(&config.fragment)?,
            board: compile_chain(&config.board)?,
            username: compile_chain(&config.username)?,
            avatar: compile_chain(&config.avatar)?,
            title: compile_chain(&config.title)?,
            body: compile_chain(&config.body)?,
            info: compile_chain(&config.info)?,
            media: compile_chain(&config.media)?,
            chrome: compile_chain(&config.chrome)?,
            preview: compile_chain(&config.preview)?,
        })
    }

    /// Which surface this is.
    #[must_use]
    pub fn surface(&self) -> Surface {
        self.surface
    }

    /// Every fragment of this surface in the document.
    #[must_use]
    pub fn fragments(&self, doc: &Document) -> Vec<NodeId> {
        self.fragment
            .as_ref()
            .map(|shape| doc.select(doc.root(), shape))
            .unwrap_or_default()
    }
}

/// Selectors of the conversation window, compiled.
#[derive(Debug, Clone)]
pub struct WindowSurface {
    pub(crate) fragment: Option<Selector>,
    pub(crate) title: Vec<Selector>,
    pub(crate) pattern: Regex,
}

impl WindowSurface {
    fn compile(config: &WindowSelectors) -> Result<Self> {
        let pattern = Regex::new(&config.title_pattern).map_err(|e| Error::ConfigValidation {
            message: format!("invalid title_pattern '{}': {e}", config.title_pattern),
        })?;
        if pattern.captures_len() < 2 {
            return Err(Error::ConfigValidation {
                message: format!(
                    "title_pattern '{}' needs a capture group for the username",
                    config.title_pattern
                ),
            });
        }
        Ok(Self {
            fragment: compile_union(&config.fragment)?,
            title: compile_chain(&config.title)?,
            pattern,
        })
    }

    /// Every conversation window in the document.
    #[must_use]
    pub fn fragments(&self, doc: &Document) -> Vec<NodeId> {
        self.fragment
            .as_ref()
            .map(|shape| doc.select(doc.root(), shape))
            .unwrap_or_default()
    }

    /// Extract the correspondent's username from a window title.
    #[must_use]
    pub fn correspondent<'t>(&self, title: &'t str) -> Option<&'t str> {
        self.pattern
            .captures(title)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .filter(|name| !name.is_empty())
    }
}

/// All compiled surfaces, in scan order.
#[derive(Debug, Clone)]
pub struct SurfaceTable {
    pub(crate) fields: Vec<FieldSurface>,
    pub(crate) window: WindowSurface,
}

impl SurfaceTable {
    /// Compile every selector of the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first selector or pattern that fails to compile.
    pub fn compile(config: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            fields: vec![
                FieldSurface::compile(Surface::HotList, &config.hot_list)?,
                FieldSurface::compile(Surface::Topic, &config.topic)?,
                FieldSurface::compile(Surface::Reply, &config.reply)?,
                FieldSurface::compile(Surface::MessageContact, &config.message_contact)?,
            ],
            window: WindowSurface::compile(&config.message_window)?,
        })
    }

    /// The field-based surfaces.
    #[must_use]
    pub fn fields(&self) -> &[FieldSurface] {
        &self.fields
    }

    /// The conversation window surface.
    #[must_use]
    pub fn window(&self) -> &WindowSurface {
        &self.window
    }

    /// Fragment shapes of every surface, for the mutation watcher.
    #[must_use]
    pub fn shapes(&self) -> Vec<Selector> {
        self.fields
            .iter()
            .filter_map(|field| field.fragment.clone())
            .chain(self.window.fragment.clone())
            .collect()
    }
}

fn compile_chain(sources: &[String]) -> Result<Vec<Selector>> {
    sources.iter().map(|s| Selector::parse(s)).collect()
}

fn compile_union(sources: &[String]) -> Result<Option<Selector>> {
    if sources.is_empty() {
        return Ok(None);
    }
    compile_chain(sources)?;
    Selector::parse(&sources.join(", ")).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SurfaceTable {
        SurfaceTable::compile(&SelectorConfig::default()).unwrap()
    }

    #[test]
    fn test_default_table_compiles_in_scan_order() {
        let table = table();
        let order: Vec<Surface> = table.fields().iter().map(FieldSurface::surface).collect();
        assert_eq!(
            order,
            vec![
                Surface::HotList,
                Surface::Topic,
                Surface::Reply,
                Surface::MessageContact
            ]
        );
        assert_eq!(table.shapes().len(), 5);
    }

    #[test]
    fn test_fragments_cover_both_generations_in_document_order() {
        let doc = Document::parse(
            r#"<div class="card-topic" id="a"></div><div class="focus-topic" id="b"></div>"#,
        );
        let table = table();
        let topics = table.fields()[1].fragments(&doc);
        let ids: Vec<_> = topics.iter().map(|t| doc.attr(*t, "id").unwrap()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_fragment_list_disables_surface() {
        let mut config = SelectorConfig::default();
        config.hot_list.fragment.clear();
        let table = SurfaceTable::compile(&config).unwrap();
        let doc = Document::parse(r#"<div class="mainPageListRow"></div>"#);
        assert!(table.fields()[0].fragments(&doc).is_empty());
        assert_eq!(table.shapes().len(), 4);
    }

    #[test]
    fn test_bad_fragment_entry_is_reported_alone() {
        let mut config = SelectorConfig::default();
        config.topic.fragment = vec![".card-topic".to_string(), "[".to_string()];
        let err = SurfaceTable::compile(&config).unwrap_err();
        assert!(err.to_string().contains("'['"));
    }

    #[test]
    fn test_correspondent_extraction() {
        let table = table();
        let window = table.window();
        assert_eq!(window.correspondent("与 alice 的私信"), Some("alice"));
        assert_eq!(window.correspondent("与  张三  的私信"), Some("张三"));
        assert_eq!(window.correspondent("与alice的私信"), None);
        assert_eq!(window.correspondent("系统通知"), None);
    }

    #[test]
    fn test_pattern_without_group_rejected() {
        let mut config = SelectorConfig::default();
        config.message_window.title_pattern = "私信".to_string();
        let err = SurfaceTable::compile(&config).unwrap_err();
        assert!(err.to_string().contains("capture group"));
    }

    #[test]
    fn test_surface_names() {
        assert_eq!(Surface::HotList.to_string(), "hot_list");
        assert!(Surface::MessageWindow.is_message_page_only());
        assert!(!Surface::Reply.is_message_page_only());
    }
}
