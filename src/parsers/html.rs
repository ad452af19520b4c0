use scraper::{ElementRef, Html};
use url::Url;

use crate::parsers::text::{TextOptions, text_content};
use crate::parsers::tree::FlagTable;
use crate::parsers::process;
use crate::results::ActionElement;

/// A web page after noise removal and simplification
#[derive(Debug, Clone)]
pub struct Document {
    url: String,
    title: Option<String>,
    /// Tree as parsed, before any pass ran
    source: Html,
    /// Simplified tree
    tree: Html,
    flags: FlagTable,
    actions: Vec<ActionElement>,
    text: String,
}

impl Document {
    /// Parse and process a page. When `title` is missing or blank the page `<title>` is used.
    pub fn parse(url: &str, html: &str, title: Option<&str>) -> Self {
        let source = Html::parse_document(html);
        let base = match Url::parse(url) {
            Ok(base) => Some(base),
            Err(err) => {
                ::log::debug!("Not resolving links against `{}`: {}", url, err);
                None
            }
        };

        let title = title
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .map(str::to_string)
            .or_else(|| document_title(&source));

        let mut tree = source.clone();
        let (flags, actions) = process(&mut tree, base.as_ref());
        let text = body_text(&tree, &flags);

        ::log::info!(
            "Processed {}: {} actions, {} characters of text",
            url,
            actions.len(),
            text.len()
        );

        Self {
            url: url.to_string(),
            title,
            source,
            tree,
            flags,
            actions,
            text,
        }
    }

    /// Parse a page from raw bytes, replacing invalid UTF-8 sequences
    pub fn from_bytes(url: &str, bytes: &[u8], title: Option<&str>) -> Self {
        Self::parse(url, &String::from_utf8_lossy(bytes), title)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// The unprocessed tree
    pub fn source(&self) -> &Html {
        &self.source
    }

    /// The simplified tree
    pub fn tree(&self) -> &Html {
        &self.tree
    }

    pub fn flags(&self) -> &FlagTable {
        &self.flags
    }

    /// Actions in extraction order, unranked
    pub fn actions(&self) -> &[ActionElement] {
        &self.actions
    }

    /// Body text of the simplified tree, nested blocks indented
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Serialized simplified tree
    pub fn html(&self) -> String {
        self.tree.html()
    }
}

fn document_title(source: &Html) -> Option<String> {
    source
        .tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "title")
        .map(|element| {
            element
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|title| !title.is_empty())
}

fn body_text(tree: &Html, flags: &FlagTable) -> String {
    let body = tree
        .tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "body")
        .map(|element| element.id())
        .unwrap_or_else(|| tree.tree.root().id());
    text_content(tree, body, flags, &TextOptions::default())
}
