//! Arena-level helpers over the scraper tree: per-node flags, structural paths and
//! the handful of edits the simplifier performs.

use std::collections::HashMap;

use ego_tree::{NodeId, NodeRef};
use scraper::node::Text;
use scraper::{Html, Node};

use crate::error::Skip;
use crate::results::{ActionKind, StructuralPath};

/// Classification of a node during processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeFlag {
    Noise,
    Action(ActionKind),
    Simplified,
}

/// Side table of node flags keyed by arena id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagTable {
    flags: HashMap<NodeId, NodeFlag>,
}

impl FlagTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: NodeId) -> Option<NodeFlag> {
        self.flags.get(&id).copied()
    }

    pub fn is_noise(&self, id: NodeId) -> bool {
        self.get(id) == Some(NodeFlag::Noise)
    }

    pub fn is_simplified(&self, id: NodeId) -> bool {
        self.get(id) == Some(NodeFlag::Simplified)
    }

    /// Flag a node and all its descendants as noise. Noise overrides any other flag.
    pub fn flag_noise_subtree(&mut self, html: &Html, id: NodeId) -> usize {
        let Some(node) = html.tree.get(id) else {
            return 0;
        };
        let mut flagged = 0;
        for descendant in node.descendants() {
            if self.flags.insert(descendant.id(), NodeFlag::Noise) != Some(NodeFlag::Noise) {
                flagged += 1;
            }
        }
        flagged
    }

    /// Flag a node as an action, unless it is already noise
    pub fn flag_action(&mut self, id: NodeId, kind: ActionKind) -> bool {
        if self.is_noise(id) {
            return false;
        }
        self.flags.insert(id, NodeFlag::Action(kind));
        true
    }

    pub fn flag_simplified(&mut self, id: NodeId) {
        self.flags.insert(id, NodeFlag::Simplified);
    }

    pub fn noise_count(&self) -> usize {
        self.flags
            .values()
            .filter(|flag| **flag == NodeFlag::Noise)
            .count()
    }
}

/// Whether the node is still reachable from the document root
pub fn is_attached(html: &Html, id: NodeId) -> bool {
    let root = html.tree.root().id();
    match html.tree.get(id) {
        Some(node) if node.id() == root => true,
        Some(node) => node.ancestors().last().map(|top| top.id()) == Some(root),
        None => false,
    }
}

/// Tag name of an element node
pub fn tag_name(node: NodeRef<'_, Node>) -> Option<&str> {
    node.value().as_element().map(|element| element.name())
}

/// Compute the XPath-like path of an element in the live tree
pub fn structural_path(html: &Html, id: NodeId) -> Result<StructuralPath, Skip> {
    let node = html.tree.get(id).ok_or(Skip::Detached)?;
    if !node.value().is_element() {
        return Err(Skip::NotAnElement);
    }
    if !is_attached(html, id) {
        return Err(Skip::Detached);
    }

    let mut segments = Vec::new();
    let mut current = Some(node);
    while let Some(node) = current {
        let Some(name) = tag_name(node) else {
            break;
        };
        segments.push(path_segment(node, name));
        current = node.parent();
    }
    segments.reverse();

    Ok(StructuralPath::new(format!("/{}", segments.join("/"))))
}

/// `name` or `name[n]` when same-named siblings exist (1-based)
fn path_segment(node: NodeRef<'_, Node>, name: &str) -> String {
    let Some(parent) = node.parent() else {
        return name.to_string();
    };
    let mut position = 0;
    let mut total = 0;
    for sibling in parent.children() {
        if tag_name(sibling) == Some(name) {
            total += 1;
            if sibling.id() == node.id() {
                position = total;
            }
        }
    }
    if total > 1 {
        format!("{}[{}]", name, position)
    } else {
        name.to_string()
    }
}

/// Text of the direct text children of a node, whitespace-normalized
pub fn own_text(node: NodeRef<'_, Node>) -> String {
    node.children()
        .filter_map(|child| child.value().as_text())
        .flat_map(|text| text.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether the element has no direct non-whitespace text
pub fn has_own_text(node: NodeRef<'_, Node>) -> bool {
    node.children()
        .filter_map(|child| child.value().as_text())
        .any(|text| !text.trim().is_empty())
}

/// Number of element children
pub fn element_child_count(node: NodeRef<'_, Node>) -> usize {
    node.children()
        .filter(|child| child.value().is_element())
        .count()
}

/// Element ids in document order, starting from the document root
pub fn element_ids(html: &Html) -> Vec<NodeId> {
    html.tree
        .root()
        .descendants()
        .filter(|node| node.value().is_element())
        .map(|node| node.id())
        .collect()
}

pub fn text_node(text: &str) -> Node {
    Node::Text(Text { text: text.into() })
}

/// Remove the element but keep its children in its place
pub fn drop_tag(html: &mut Html, id: NodeId) {
    let children: Vec<NodeId> = match html.tree.get(id) {
        Some(node) if node.parent().is_some() => node.children().map(|child| child.id()).collect(),
        _ => return,
    };
    let Some(mut node) = html.tree.get_mut(id) else {
        return;
    };
    for child in children {
        node.insert_id_before(child);
    }
    node.detach();
}

/// Detach a node together with its subtree
pub fn prune(html: &mut Html, id: NodeId) {
    if let Some(mut node) = html.tree.get_mut(id) {
        node.detach();
    }
}

/// Insert a text node right before the given node
pub fn insert_text_before(html: &mut Html, id: NodeId, text: &str) {
    let has_parent = html
        .tree
        .get(id)
        .is_some_and(|node| node.parent().is_some());
    if !has_parent {
        return;
    }
    if let Some(mut node) = html.tree.get_mut(id) {
        node.insert_before(text_node(text));
    }
}

/// Replace all children of an element with a single text node
pub fn replace_children_with_text(html: &mut Html, id: NodeId, text: &str) {
    let children: Vec<NodeId> = match html.tree.get(id) {
        Some(node) => node.children().map(|child| child.id()).collect(),
        None => return,
    };
    for child in children {
        prune(html, child);
    }
    if let Some(mut node) = html.tree.get_mut(id) {
        node.append(text_node(text));
    }
}

/// Merge runs of adjacent text nodes into the first node of each run
pub fn merge_adjacent_text(html: &mut Html) {
    let mut merges: Vec<(NodeId, String, Vec<NodeId>)> = Vec::new();

    for node in html.tree.root().descendants() {
        let mut run: Option<(NodeId, String, Vec<NodeId>)> = None;
        for child in node.children() {
            if let Some(text) = child.value().as_text() {
                if let Some((_, merged, absorbed)) = run.as_mut() {
                    merged.push_str(text);
                    absorbed.push(child.id());
                } else {
                    run = Some((child.id(), String::from(&**text), Vec::new()));
                }
            } else if let Some(finished) = run.take() {
                merges.push(finished);
            }
        }
        if let Some(finished) = run.take() {
            merges.push(finished);
        }
    }

    for (first, merged, absorbed) in merges {
        if absorbed.is_empty() {
            continue;
        }
        if let Some(mut node) = html.tree.get_mut(first) {
            *node.value() = text_node(&merged);
        }
        for id in absorbed {
            prune(html, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    fn first(html: &Html, css: &str) -> NodeId {
        let selector = Selector::parse(css).unwrap();
        html.select(&selector).next().unwrap().id()
    }

    #[test]
    fn test_structural_path_indexes_same_name_siblings() {
        let html = Html::parse_document(
            "<html><body><div>a</div><div><p>b</p><span>c</span><p>d</p></div></body></html>",
        );
        let id = first(&html, "div:nth-child(2) > p:nth-child(3)");
        assert_eq!(
            structural_path(&html, id).unwrap().as_str(),
            "/html/body/div[2]/p[2]"
        );

        let span = first(&html, "span");
        assert_eq!(
            structural_path(&html, span).unwrap().as_str(),
            "/html/body/div[2]/span"
        );
    }

    #[test]
    fn test_detached_node_has_no_path() {
        let mut html = Html::parse_document("<p><b>x</b></p>");
        let p = first(&html, "p");
        let b = first(&html, "b");
        prune(&mut html, p);
        assert!(!is_attached(&html, b));
        assert_eq!(structural_path(&html, b), Err(Skip::Detached));
    }

    #[test]
    fn test_drop_tag_promotes_children() {
        let mut html = Html::parse_document("<p>one <b>two</b> three</p>");
        let b = first(&html, "b");
        drop_tag(&mut html, b);
        merge_adjacent_text(&mut html);

        let p = html.tree.get(first(&html, "p")).unwrap();
        assert_eq!(p.children().count(), 1);
        assert_eq!(own_text(p), "one two three");
    }

    #[test]
    fn test_noise_overrides_action() {
        let html = Html::parse_document("<div><a>x</a></div>");
        let div = first(&html, "div");
        let a = first(&html, "a");
        let mut flags = FlagTable::new();
        assert!(flags.flag_action(a, ActionKind::Link));
        flags.flag_noise_subtree(&html, div);
        assert!(flags.is_noise(a));
        assert!(!flags.flag_action(a, ActionKind::Link));
    }

    #[test]
    fn test_replace_children_with_text() {
        let mut html = Html::parse_document("<ul><li>a</li><li>b</li></ul>");
        let ul = first(&html, "ul");
        replace_children_with_text(&mut html, ul, "- a\n- b");
        let node = html.tree.get(ul).unwrap();
        assert_eq!(node.children().count(), 1);
        assert_eq!(
            node.first_child().unwrap().value().as_text().map(|t| String::from(&**t)),
            Some("- a\n- b".to_string())
        );
    }
}
