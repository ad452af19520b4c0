//! Tree simplification.
//!
//! Runs after noise classification and action extraction. Noise subtrees are pruned,
//! wrapper and cosmetic tags are dissolved, and tables and lists are rewritten into
//! line-oriented text leaves flagged as simplified. `html`, `body` and simplified leaves
//! are never dissolved, so running the pass again with the returned flags is a no-op.

use ego_tree::{NodeId, NodeRef};
use scraper::node::Element;
use scraper::{ElementRef, Html, Node};

use crate::parsers::text::{TextOptions, normalize_lines, text_content};
use crate::parsers::tree::{
    FlagTable, drop_tag, element_child_count, element_ids, has_own_text, insert_text_before,
    is_attached, merge_adjacent_text, prune, replace_children_with_text, tag_name,
};

/// Inline tags that only affect presentation
pub const COSMETIC_TAGS: [&str; 24] = [
    "a", "abbr", "b", "bdi", "bdo", "cite", "data", "dfn", "em", "font", "i", "kbd", "mark",
    "q", "s", "samp", "small", "span", "strong", "sub", "sup", "time", "u", "var",
];

/// List containers and items keep their tags until the list is rewritten
const LIST_TAGS: [&str; 3] = ["ul", "ol", "li"];

/// Apply every simplification step in order
pub fn simplify(html: &mut Html, flags: FlagTable) -> FlagTable {
    let pruned = prune_noise(html, &flags);
    ::log::debug!("Pruned {} noise subtrees", pruned);

    drop_aria_hidden(html, &flags);
    strip_attributes(html);
    drop_empty(html, &flags);
    drop_cosmetic(html, &flags);
    let flags = rewrite_tables(html, flags);
    collapse_wrappers(html, &flags);
    let flags = rewrite_lists(html, flags);

    merge_adjacent_text(html);
    flags
}

fn is_frame(node: NodeRef<'_, Node>) -> bool {
    matches!(tag_name(node), Some("html" | "body"))
}

/// Whether a tag may be dissolved at all
fn is_droppable(html: &Html, id: NodeId, flags: &FlagTable) -> bool {
    match html.tree.get(id) {
        Some(node) => !is_frame(node) && !flags.is_simplified(id) && is_attached(html, id),
        None => false,
    }
}

/// Detach every attached noise subtree; returns how many subtrees were removed
pub fn prune_noise(html: &mut Html, flags: &FlagTable) -> usize {
    let noise: Vec<NodeId> = element_ids(html)
        .into_iter()
        .filter(|id| flags.is_noise(*id))
        .filter(|id| {
            html.tree
                .get(*id)
                .and_then(|node| node.parent())
                .is_some_and(|parent| !flags.is_noise(parent.id()))
        })
        .collect();
    for id in &noise {
        prune(html, *id);
    }
    noise.len()
}

/// Dissolve `aria-hidden="true"` elements, leaving a space where they were
pub fn drop_aria_hidden(html: &mut Html, flags: &FlagTable) {
    let hidden: Vec<NodeId> = element_ids(html)
        .into_iter()
        .filter(|id| {
            html.tree
                .get(*id)
                .and_then(|node| node.value().as_element())
                .and_then(|element| element.attr("aria-hidden"))
                .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
        })
        .collect();

    let mut dropped = 0;
    for id in hidden {
        if !is_droppable(html, id, flags) {
            continue;
        }
        insert_text_before(html, id, " ");
        drop_tag(html, id);
        dropped += 1;
    }
    if dropped > 0 {
        ::log::trace!("Dropped {} aria-hidden tags", dropped);
        merge_adjacent_text(html);
    }
}

/// Remove all attributes from every element
pub fn strip_attributes(html: &mut Html) {
    for id in element_ids(html) {
        let Some(mut node) = html.tree.get_mut(id) else {
            continue;
        };
        let name = match node.value().as_element() {
            Some(element) if element.attrs().next().is_some() => element.name.clone(),
            _ => continue,
        };
        *node.value() = Node::Element(Element::new(name, Vec::new()));
    }
}

/// Dissolve elements without text until nothing changes
pub fn drop_empty(html: &mut Html, flags: &FlagTable) {
    let mut rounds = 0;
    loop {
        let empty: Vec<NodeId> = element_ids(html)
            .into_iter()
            .filter(|id| {
                html.tree
                    .get(*id)
                    .and_then(ElementRef::wrap)
                    .is_some_and(|element| element.text().all(|text| text.trim().is_empty()))
            })
            .filter(|id| is_droppable(html, *id, flags))
            .collect();
        if empty.is_empty() {
            break;
        }
        for id in empty {
            drop_tag(html, id);
        }
        rounds += 1;
    }
    if rounds > 0 {
        ::log::trace!("Empty tags dissolved after {} rounds", rounds);
        merge_adjacent_text(html);
    }
}

/// Dissolve cosmetic inline tags
pub fn drop_cosmetic(html: &mut Html, flags: &FlagTable) {
    let cosmetic: Vec<NodeId> = element_ids(html)
        .into_iter()
        .filter(|id| {
            html.tree
                .get(*id)
                .and_then(tag_name)
                .is_some_and(|name| COSMETIC_TAGS.contains(&name))
        })
        .collect();
    for id in &cosmetic {
        if is_droppable(html, *id, flags) {
            drop_tag(html, *id);
        }
    }
    if !cosmetic.is_empty() {
        merge_adjacent_text(html);
    }
}

/// Rewrite tables into text leaves, innermost first
pub fn rewrite_tables(html: &mut Html, mut flags: FlagTable) -> FlagTable {
    let tables: Vec<NodeId> = element_ids(html)
        .into_iter()
        .rev()
        .filter(|id| !flags.is_simplified(*id))
        .filter(|id| html.tree.get(*id).and_then(tag_name) == Some("table"))
        .collect();

    for id in tables {
        let Some(text) = render_table(html, id, &flags) else {
            continue;
        };
        replace_children_with_text(html, id, &text);
        flags.flag_simplified(id);
    }
    flags
}

/// `[table]` (or `[table: caption]`) followed by one ` | `-joined line per row.
/// Header rows are followed and footer rows preceded by a `---` line.
pub fn render_table(html: &Html, table: NodeId, flags: &FlagTable) -> Option<String> {
    let node = html.tree.get(table)?;
    let options = TextOptions::single_line();
    let cell_text = |id: NodeId| {
        text_content(html, id, flags, &options)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    };

    let mut caption: Option<String> = None;
    let mut header = Vec::new();
    let mut body = Vec::new();
    let mut footer = Vec::new();

    for descendant in node.descendants().skip(1) {
        match tag_name(descendant) {
            Some("caption") if caption.is_none() => {
                caption = Some(cell_text(descendant.id())).filter(|text| !text.is_empty());
            }
            Some("tr") => {
                let cells: Vec<NodeRef<'_, Node>> = descendant
                    .children()
                    .filter(|child| matches!(tag_name(*child), Some("td" | "th")))
                    .collect();
                let texts: Vec<String> = cells.iter().map(|cell| cell_text(cell.id())).collect();
                if texts.iter().all(|text| text.is_empty()) {
                    continue;
                }

                let line = texts.join(" | ");
                let section = descendant.parent().and_then(tag_name);
                let all_headings = cells.iter().all(|cell| tag_name(*cell) == Some("th"));
                match section {
                    Some("thead") => header.push(line),
                    Some("tfoot") => footer.push(line),
                    _ if all_headings => header.push(line),
                    _ => body.push(line),
                }
            }
            _ => {}
        }
    }

    let mut lines = vec![match caption {
        Some(caption) => format!("[table: {}]", caption),
        None => "[table]".to_string(),
    }];
    if !header.is_empty() {
        lines.extend(header);
        lines.push("---".to_string());
    }
    lines.extend(body);
    if !footer.is_empty() {
        lines.push("---".to_string());
        lines.extend(footer);
    }
    Some(lines.join("\n"))
}

/// Dissolve elements that only wrap a single element child
pub fn collapse_wrappers(html: &mut Html, flags: &FlagTable) {
    let mut collapsed = 0;
    for id in element_ids(html) {
        let Some(node) = html.tree.get(id) else {
            continue;
        };
        if tag_name(node).is_some_and(|name| LIST_TAGS.contains(&name)) {
            continue;
        }
        if element_child_count(node) == 1
            && !has_own_text(node)
            && is_droppable(html, id, flags)
        {
            drop_tag(html, id);
            collapsed += 1;
        }
    }
    if collapsed > 0 {
        ::log::trace!("Collapsed {} wrapper tags", collapsed);
        merge_adjacent_text(html);
    }
}

/// Rewrite `ul`/`ol` lists into text leaves, innermost first
pub fn rewrite_lists(html: &mut Html, mut flags: FlagTable) -> FlagTable {
    let lists: Vec<NodeId> = element_ids(html)
        .into_iter()
        .rev()
        .filter(|id| !flags.is_simplified(*id))
        .filter(|id| matches!(html.tree.get(*id).and_then(tag_name), Some("ul" | "ol")))
        .collect();

    for id in lists {
        let Some(text) = render_list(html, id, &flags) else {
            continue;
        };
        replace_children_with_text(html, id, &text);
        flags.flag_simplified(id);
    }
    flags
}

/// One `- item` (or `1. item` for ordered lists) line per item; continuation lines
/// are indented under the item text
pub fn render_list(html: &Html, list: NodeId, flags: &FlagTable) -> Option<String> {
    let node = html.tree.get(list)?;
    let ordered = tag_name(node) == Some("ol");
    let options = TextOptions::plain();

    let items: Vec<String> = node
        .children()
        .filter_map(|child| match child.value() {
            Node::Element(_) => Some(text_content(html, child.id(), flags, &options)),
            Node::Text(text) => Some(normalize_lines(text)),
            _ => None,
        })
        .filter(|item| !item.trim().is_empty())
        .collect();
    if items.is_empty() {
        return None;
    }

    let mut lines = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let marker = if ordered {
            format!("{}. ", index + 1)
        } else {
            "- ".to_string()
        };
        let continuation = " ".repeat(marker.len());
        for (line_index, line) in item.lines().enumerate() {
            if line_index == 0 {
                lines.push(format!("{}{}", marker, line.trim()));
            } else if line.starts_with(' ') {
                lines.push(line.to_string());
            } else {
                lines.push(format!("{}{}", continuation, line));
            }
        }
    }
    Some(lines.join("\n"))
}
