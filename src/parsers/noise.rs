//! Noise classification.
//!
//! Every pass is a function `(tree, flags) -> flags`: it only adds noise flags to the
//! side table and never touches the tree, except for comment removal which drops nodes
//! that carry no content at all.

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Node};

use crate::parsers::style::StyleIndex;
use crate::parsers::tree::{FlagTable, prune};

/// Declarations that make an element invisible
pub const HIDING_DECLARATIONS: [(&str, &str); 7] = [
    ("display", "none"),
    ("visibility", "hidden"),
    ("opacity", "0"),
    ("opacity", "0%"),
    ("transform", "scale(0)"),
    ("height", "0"),
    ("width", "0"),
];

/// Elements whose content is never rendered as page text
pub const NON_CONTENT_TAGS: [&str; 13] = [
    "head", "script", "style", "noscript", "template", "svg", "canvas", "iframe", "object",
    "embed", "meta", "link", "base",
];

/// Class name fragments that mark an element as hidden
const HIDDEN_CLASS_MARKERS: [&str; 3] = ["hidden", "invisible", "none"];

/// Inline style fragments (whitespace removed) that mark an element as hidden
const HIDDEN_STYLE_MARKERS: [&str; 2] = ["display:none", "visibility:hidden"];

/// Run every noise pass over the document
pub fn classify(html: &mut Html, styles: &StyleIndex, flags: FlagTable) -> FlagTable {
    let removed = remove_comments(html);
    ::log::debug!("Removed {} comment nodes", removed);

    let flags = flag_hidden_by_attribute(html, flags);
    let flags = flag_hidden_by_style(html, styles, flags);
    let flags = flag_non_content(html, flags);

    ::log::debug!("Flagged {} nodes as noise", flags.noise_count());
    flags
}

/// Detach all comment nodes, returning how many were removed
pub fn remove_comments(html: &mut Html) -> usize {
    let comments: Vec<NodeId> = html
        .tree
        .root()
        .descendants()
        .filter(|node| matches!(node.value(), Node::Comment(_)))
        .map(|node| node.id())
        .collect();
    for id in &comments {
        prune(html, *id);
    }
    comments.len()
}

/// Flag elements hidden through their class, inline style or `hidden` attribute
pub fn flag_hidden_by_attribute(html: &Html, mut flags: FlagTable) -> FlagTable {
    let hidden: Vec<NodeId> = html
        .tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| !is_document_frame(element))
        .filter(|element| is_hidden_by_attribute(element))
        .map(|element| element.id())
        .collect();

    let mut flagged = 0;
    for id in hidden {
        flagged += flags.flag_noise_subtree(html, id);
    }
    ::log::debug!("Hidden attributes flagged {} nodes", flagged);
    flags
}

fn is_hidden_by_attribute(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    if value.attr("hidden").is_some() {
        return true;
    }

    let hidden_class = value.classes().any(|class| {
        let class = class.to_ascii_lowercase();
        HIDDEN_CLASS_MARKERS
            .iter()
            .any(|marker| class.contains(marker))
    });
    if hidden_class {
        return true;
    }

    match value.attr("style") {
        Some(style) => {
            let compact: String = style
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            HIDDEN_STYLE_MARKERS
                .iter()
                .any(|marker| compact.contains(marker))
        }
        None => false,
    }
}

/// Flag elements matched by a stylesheet rule that hides them
pub fn flag_hidden_by_style(html: &Html, styles: &StyleIndex, mut flags: FlagTable) -> FlagTable {
    if styles.is_empty() {
        return flags;
    }

    let mut flagged = 0;
    for (property, value) in HIDING_DECLARATIONS {
        let matches = styles.elements_declaring(html, property, value);
        if !matches.skipped.is_empty() {
            ::log::trace!(
                "Skipped {} selectors declaring `{}: {}`",
                matches.skipped.len(),
                property,
                value
            );
        }
        for id in matches.nodes {
            let protected = html
                .tree
                .get(id)
                .and_then(ElementRef::wrap)
                .is_some_and(|element| is_document_frame(&element));
            if !protected {
                flagged += flags.flag_noise_subtree(html, id);
            }
        }
    }
    ::log::debug!("Style rules flagged {} nodes", flagged);
    flags
}

/// Flag non-content elements and everything beneath them
pub fn flag_non_content(html: &Html, mut flags: FlagTable) -> FlagTable {
    let ids: Vec<NodeId> = html
        .tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| NON_CONTENT_TAGS.contains(&element.value().name()))
        .map(|element| element.id())
        .collect();

    let mut flagged = 0;
    for id in ids {
        flagged += flags.flag_noise_subtree(html, id);
    }
    ::log::debug!("Non-content tags flagged {} nodes", flagged);
    flags
}

/// `html` and `body` frame the document and are never classified as noise
fn is_document_frame(element: &ElementRef<'_>) -> bool {
    matches!(element.value().name(), "html" | "body")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    fn ids(html: &Html, css: &str) -> Vec<NodeId> {
        let selector = Selector::parse(css).unwrap();
        html.select(&selector).map(|element| element.id()).collect()
    }

    fn run(source: &str) -> (Html, FlagTable) {
        let mut html = Html::parse_document(source);
        let styles = StyleIndex::from_document(&html);
        let flags = classify(&mut html, &styles, FlagTable::new());
        (html, flags)
    }

    #[test]
    fn test_inline_hidden_style_flags_subtree() {
        let (html, flags) = run(
            "<div style=\"display: none\"><a href=\"#\">x</a></div><p>Alex studied at Bard College</p>",
        );
        assert!(flags.is_noise(ids(&html, "div")[0]));
        assert!(flags.is_noise(ids(&html, "a")[0]));
        assert!(!flags.is_noise(ids(&html, "p")[0]));
    }

    #[test]
    fn test_hidden_classes_and_attribute() {
        let (html, flags) = run(
            "<p class=\"sr-invisible\">a</p><p class=\"d-none\">b</p><p hidden>c</p><p class=\"lead\">d</p>",
        );
        let paragraphs = ids(&html, "p");
        assert!(flags.is_noise(paragraphs[0]));
        assert!(flags.is_noise(paragraphs[1]));
        assert!(flags.is_noise(paragraphs[2]));
        assert!(!flags.is_noise(paragraphs[3]));
    }

    #[test]
    fn test_stylesheet_rules_flag_matching_elements() {
        let (html, flags) = run(
            "<html><head><style>.modal { opacity: 0 } .tip:hover { display: none } .strip { height: 0px }</style></head>\
             <body><div class=\"modal\"><p>in modal</p></div><div class=\"tip\">tip</div><div class=\"strip\">s</div></body></html>",
        );
        assert!(flags.is_noise(ids(&html, ".modal p")[0]));
        assert!(!flags.is_noise(ids(&html, ".tip")[0]));
        assert!(flags.is_noise(ids(&html, ".strip")[0]));
    }

    #[test]
    fn test_non_content_tags_and_comments() {
        let (html, flags) = run(
            "<html><head><title>t</title></head><body><!-- note --><script>var a;</script><p>text</p></body></html>",
        );
        assert!(flags.is_noise(ids(&html, "head")[0]));
        assert!(flags.is_noise(ids(&html, "title")[0]));
        assert!(flags.is_noise(ids(&html, "script")[0]));
        assert!(!flags.is_noise(ids(&html, "p")[0]));
        assert!(
            !html
                .tree
                .root()
                .descendants()
                .any(|node| matches!(node.value(), Node::Comment(_)))
        );
    }

    #[test]
    fn test_document_frame_is_never_noise() {
        let (html, flags) = run("<html class=\"hidden-scroll\"><body style=\"visibility:hidden\"><p>x</p></body></html>");
        assert!(!flags.is_noise(ids(&html, "html")[0]));
        assert!(!flags.is_noise(ids(&html, "body")[0]));
        assert!(!flags.is_noise(ids(&html, "p")[0]));
    }
}
