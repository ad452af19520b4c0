use ego_tree::{NodeId, NodeRef};
use scraper::{Html, Node};

use crate::parsers::tree::{FlagTable, own_text};

const TAB_SIZE: usize = 2;

/// Nesting depth past which a subtree is rendered as one flat line
pub const MAX_RENDER_DEPTH: usize = 64;

/// Configuration options for rendering a subtree as text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOptions {
    /// Keep block structure as indented lines instead of a single line
    pub multiline: bool,
    /// Bullet used for sibling text runs in multiline mode
    pub bullet: Option<String>,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            multiline: true,
            bullet: Some("-".to_string()),
        }
    }
}

impl TextOptions {
    /// Single-line rendering: blocks joined with `; `, line breaks with `, `
    pub fn single_line() -> Self {
        Self {
            multiline: false,
            bullet: None,
        }
    }

    /// Multiline rendering without bullets
    pub fn plain() -> Self {
        Self {
            multiline: true,
            bullet: None,
        }
    }
}

/// Render the text content of a node.
///
/// Nodes flagged as simplified are opaque leaves: their stored text is returned verbatim.
/// In multiline mode nested blocks are indented by two spaces and, when a bullet is set,
/// sibling text runs are bulleted.
pub fn text_content(html: &Html, id: NodeId, flags: &FlagTable, options: &TextOptions) -> String {
    match html.tree.get(id) {
        Some(node) => render(node, flags, options, 0),
        None => String::new(),
    }
}

fn render(
    node: NodeRef<'_, Node>,
    flags: &FlagTable,
    options: &TextOptions,
    depth: usize,
) -> String {
    if flags.is_simplified(node.id()) {
        return simplified_text(node);
    }
    if depth >= MAX_RENDER_DEPTH {
        return flat_text(node);
    }

    let parts: Vec<NodeRef<'_, Node>> = node
        .children()
        .filter(|child| match child.value() {
            Node::Text(text) => !text.trim().is_empty(),
            Node::Element(_) => true,
            _ => false,
        })
        .collect();
    let only_child = parts.len() == 1;

    let mut lines: Vec<String> = Vec::new();
    for child in parts {
        match child.value() {
            Node::Element(_) => {
                let text = render(child, flags, options, depth + 1);
                if text.is_empty() {
                    continue;
                }
                if options.multiline && !lines.is_empty() {
                    lines.push(indent(&text, TAB_SIZE, None));
                } else {
                    lines.push(text);
                }
            }
            Node::Text(text) => {
                let text = normalize_lines(text);
                if text.is_empty() {
                    continue;
                }
                if !options.multiline {
                    lines.push(text.split('\n').collect::<Vec<_>>().join(", "));
                } else if only_child {
                    lines.push(text);
                } else {
                    lines.push(indent(&text, TAB_SIZE, options.bullet.as_deref()));
                }
            }
            _ => {}
        }
    }

    if !options.multiline {
        return lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("; ");
    }

    let result = lines.join("\n");
    match options.bullet.as_deref() {
        Some(bullet)
            if lines.len() > 1 && !result.starts_with(bullet) && !result.starts_with(' ') =>
        {
            indent(&result, TAB_SIZE, Some(bullet))
        }
        _ => result,
    }
}

/// Every descendant text run on one line, whitespace-normalized
fn flat_text(node: NodeRef<'_, Node>) -> String {
    node.descendants()
        .filter_map(|descendant| descendant.value().as_text())
        .flat_map(|text| text.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stored text of a simplified leaf, line structure preserved
fn simplified_text(node: NodeRef<'_, Node>) -> String {
    node.children()
        .filter_map(|child| child.value().as_text())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prefix every non-empty line with `tab_size` spaces; with a bullet, the first line's
/// indentation is replaced by the bullet (`"- "` for a tab of two).
pub fn indent(text: &str, tab_size: usize, bullet: Option<&str>) -> String {
    let tab = " ".repeat(tab_size);
    let indented = text
        .split('\n')
        .map(|line| {
            if line.is_empty() {
                line.to_string()
            } else {
                format!("{}{}", tab, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let Some(bullet) = bullet.filter(|bullet| !bullet.is_empty()) else {
        return indented;
    };
    let Some(rest) = indented.strip_prefix(&tab) else {
        return indented;
    };

    let lead = match tab_size {
        0 => String::new(),
        1 => bullet.to_string(),
        size => format!("{}{} ", " ".repeat(size - 2), bullet),
    };
    format!("{}{}", lead, rest)
}

/// Collapse each line's inner whitespace and drop blank lines
pub fn normalize_lines(text: &str) -> String {
    text.lines()
        .map(normalize_whitespace_in_segment)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Normalizes whitespace within a single line or paragraph
pub fn normalize_whitespace_in_segment(segment: &str) -> String {
    segment.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text used for keyword matching against an element: its own text, or the stored
/// block for simplified leaves
pub fn match_text(html: &Html, id: NodeId, flags: &FlagTable) -> String {
    match html.tree.get(id) {
        Some(node) if flags.is_simplified(id) => simplified_text(node),
        Some(node) => own_text(node),
        None => String::new(),
    }
}
