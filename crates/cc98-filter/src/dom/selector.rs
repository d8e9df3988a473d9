//! Compiled CSS selectors for the fragment tables.

use std::str::FromStr;

use scraper::ElementRef;

use crate::error::{Error, Result};

/// A compiled selector list, kept together with its source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    compiled: scraper::Selector,
}

impl Selector {
    /// Compile a selector list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSelector`] if the text is not a valid selector.
    pub fn parse(source: &str) -> Result<Self> {
        let source = source.trim();
        let compiled = scraper::Selector::parse(source)
            .map_err(|e| Error::invalid_selector(source, e.to_string()))?;
        Ok(Self {
            source: source.to_string(),
            compiled,
        })
    }

    /// The selector text as written.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn matches(&self, element: &ElementRef<'_>) -> bool {
        self.compiled.matches(element)
    }
}

impl FromStr for Selector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    const PAGE: &str = r#"<html><body>
        <div id="list">
            <div class="reply" id="r1">
                <span class="userMessage-userName">alice</span>
                <div class="column" style="width: 60%;">posts</div>
            </div>
            <div class="card-topic" id="t1">
                <div class="card-topic-boardName"><a href="/board/9">Study</a></div>
                <img class="topic-portrait-small" src="p.png">
            </div>
        </div>
    </body></html>"#;

    fn ids(doc: &Document, selector: &str) -> Vec<String> {
        doc.select(doc.root(), &Selector::parse(selector).unwrap())
            .into_iter()
            .map(|id| doc.attr(id, "id").unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_fragment_table_shapes() {
        let doc = Document::parse(PAGE);
        assert_eq!(ids(&doc, ".reply, .card-topic"), vec!["r1", "t1"]);
        assert_eq!(ids(&doc, "#list > .reply"), vec!["r1"]);
        assert_eq!(ids(&doc, "body .card-topic"), vec!["t1"]);
    }

    #[test]
    fn test_attribute_substring_selectors() {
        let doc = Document::parse(PAGE);
        let portrait = Selector::parse(r#"img[class*="portrait"]"#).unwrap();
        assert!(doc.select_first(doc.root(), &portrait).is_some());
        let column = Selector::parse(r#".column[style*="width: 60%;"]"#).unwrap();
        assert_eq!(doc.select(doc.root(), &column).len(), 1);
        let link = Selector::parse(".card-topic-boardName a").unwrap();
        let link = doc.select_first(doc.root(), &link).unwrap();
        assert_eq!(doc.text_content(link), "Study");
    }

    #[test]
    fn test_invalid_selectors() {
        for bad in ["", "div[", "a >", ".userMessage-userName["] {
            let err = Selector::parse(bad).unwrap_err();
            assert!(
                matches!(err, Error::InvalidSelector { .. }),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_source_and_display() {
        let sel: Selector = "  .card-topic  ".parse().unwrap();
        assert_eq!(sel.source(), ".card-topic");
        assert_eq!(sel.to_string(), ".card-topic");
    }

    #[test]
    fn test_text_nodes_never_match() {
        let doc = Document::parse("<p>x</p>");
        let p = doc
            .select_first(doc.root(), &Selector::parse("p").unwrap())
            .unwrap();
        let text = doc.children(p)[0];
        assert!(!doc.matches(text, &Selector::parse("*").unwrap()));
    }
}
