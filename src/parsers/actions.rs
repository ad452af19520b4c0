//! Action extraction.
//!
//! Candidates are collected per kind from tag, attribute, event-handler, role and
//! stylesheet heuristics. Every candidate that survives noise classification gets its
//! structural path captured immediately, before the simplifier mutates the tree.

use std::collections::HashSet;

use ego_tree::NodeId;
use scraper::{ElementRef, Html};
use url::Url;

use crate::parsers::style::StyleIndex;
use crate::parsers::text::{TextOptions, text_content};
use crate::parsers::tree::{FlagTable, element_ids, structural_path};
use crate::results::{ActionElement, ActionKind, StructuralPath};

/// Input types that do not accept free text
const NON_TEXT_INPUT_TYPES: [&str; 10] = [
    "hidden", "button", "submit", "reset", "image", "checkbox", "radio", "file", "range",
    "color",
];

/// Input types rendered as push buttons
const BUTTON_INPUT_TYPES: [&str; 3] = ["button", "submit", "reset"];

const TEXT_ENTRY_ROLES: [&str; 3] = ["textbox", "searchbox", "combobox"];

const CLICK_HANDLERS: [&str; 4] = ["onclick", "ondblclick", "onmousedown", "onmouseup"];

/// Extraction order; a node claimed by an earlier kind is not materialized again
const PRIORITY: [ActionKind; 3] = [ActionKind::Input, ActionKind::Button, ActionKind::Link];

/// Detail keys recorded for inputs, in lookup order for the display content
const INPUT_CONTENT_KEYS: [&str; 4] = ["label", "aria-label", "placeholder", "name"];

/// Candidate node ids per action kind, in document order
#[derive(Debug, Default)]
pub struct Candidates {
    pub inputs: Vec<NodeId>,
    pub buttons: Vec<NodeId>,
    pub links: Vec<NodeId>,
}

impl Candidates {
    fn of(&self, kind: ActionKind) -> &[NodeId] {
        match kind {
            ActionKind::Input => &self.inputs,
            ActionKind::Button => &self.buttons,
            ActionKind::Link => &self.links,
        }
    }
}

/// Extract interactive elements from a noise-classified document.
///
/// Relative hrefs are resolved against `base` when one is given.
pub fn extract(
    html: &Html,
    styles: &StyleIndex,
    mut flags: FlagTable,
    base: Option<&Url>,
) -> (Vec<ActionElement>, FlagTable) {
    let candidates = collect_candidates(html, styles, &flags);
    ::log::debug!(
        "Action candidates: {} inputs, {} buttons, {} links",
        candidates.inputs.len(),
        candidates.buttons.len(),
        candidates.links.len()
    );

    // Paths are captured for every candidate before anything is materialized
    let mut claimed = HashSet::new();
    let mut flagged: Vec<(ActionKind, NodeId, StructuralPath)> = Vec::new();
    for kind in PRIORITY {
        for &id in candidates.of(kind) {
            if flags.is_noise(id) || !claimed.insert(id) {
                continue;
            }
            match structural_path(html, id) {
                Ok(path) => {
                    flags.flag_action(id, kind);
                    flagged.push((kind, id, path));
                }
                Err(skip) => {
                    ::log::warn!("Skipping {} candidate: {}", kind, skip);
                }
            }
        }
    }

    let mut actions = Vec::new();
    for (kind, id, path) in flagged {
        let Some(element) = html.tree.get(id).and_then(ElementRef::wrap) else {
            continue;
        };
        let action = match kind {
            ActionKind::Input => Some(materialize_input(html, element, path)),
            ActionKind::Button => materialize_button(html, element, &flags, path),
            ActionKind::Link => materialize_link(html, element, &flags, path, base),
        };
        match action {
            Some(action) => actions.push(action),
            None => ::log::trace!("Skipping {} candidate without content", kind),
        }
    }

    ::log::info!("Extracted {} actions", actions.len());
    (actions, flags)
}

/// Collect candidate ids per kind, skipping nodes already flagged as noise
pub fn collect_candidates(html: &Html, styles: &StyleIndex, flags: &FlagTable) -> Candidates {
    let mut candidates = Candidates::default();
    let single_line = TextOptions::single_line();
    let has_text = |id: NodeId| !text_content(html, id, flags, &single_line).trim().is_empty();

    for id in element_ids(html) {
        if flags.is_noise(id) {
            continue;
        }
        let Some(element) = html.tree.get(id).and_then(ElementRef::wrap) else {
            continue;
        };
        let value = element.value();
        let name = value.name();
        let role = value.attr("role").map(|role| role.trim().to_ascii_lowercase());
        let input_type = input_type(&element);

        let is_input = match name {
            "input" => !NON_TEXT_INPUT_TYPES.contains(&input_type.as_str()),
            "textarea" => true,
            _ => role
                .as_deref()
                .is_some_and(|role| TEXT_ENTRY_ROLES.contains(&role)),
        };
        if is_input {
            candidates.inputs.push(id);
        }

        let is_button = (name == "button" && has_text(id))
            || CLICK_HANDLERS
                .iter()
                .any(|handler| value.attr(handler).is_some())
            || (name == "input" && BUTTON_INPUT_TYPES.contains(&input_type.as_str()))
            || role.as_deref() == Some("button");
        if is_button {
            candidates.buttons.push(id);
        }

        let is_link = (name == "a" && has_text(id)) || role.as_deref() == Some("link");
        if is_link {
            candidates.links.push(id);
        }
    }

    // Elements made clickable by a stylesheet rule
    let pointer = styles.elements_declaring(html, "cursor", "pointer");
    for id in pointer.nodes {
        if flags.is_noise(id) || candidates.links.contains(&id) || !has_text(id) {
            continue;
        }
        candidates.links.push(id);
    }

    candidates
}

fn input_type(element: &ElementRef<'_>) -> String {
    match element.value().name() {
        "input" => element
            .value()
            .attr("type")
            .map(|kind| kind.trim().to_ascii_lowercase())
            .filter(|kind| !kind.is_empty())
            .unwrap_or_else(|| "text".to_string()),
        _ => String::new(),
    }
}

fn materialize_input(html: &Html, element: ElementRef<'_>, path: StructuralPath) -> ActionElement {
    let mut action = ActionElement::new(ActionKind::Input, element.id(), path);
    let value = element.value();

    for key in ["value", "placeholder", "name", "aria-label"] {
        if let Some(text) = value.attr(key).map(str::trim).filter(|text| !text.is_empty()) {
            action.details.insert(key.to_string(), text.to_string());
        }
    }
    let kind = input_type(&element);
    if !kind.is_empty() {
        action.details.insert("type".to_string(), kind);
    } else if value.name() == "textarea" {
        action.details.insert("type".to_string(), "textarea".to_string());
    }
    if let Some(label) = associated_label(html, &element) {
        action.details.insert("label".to_string(), label);
    }

    action.content = INPUT_CONTENT_KEYS
        .iter()
        .find_map(|key| action.details.get(*key).cloned())
        .unwrap_or_default();
    action
}

fn materialize_button(
    html: &Html,
    element: ElementRef<'_>,
    flags: &FlagTable,
    path: StructuralPath,
) -> Option<ActionElement> {
    let content = if element.value().name() == "input" {
        element
            .value()
            .attr("value")
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    } else {
        display_text(html, element.id(), flags)
    };
    if content.is_empty() {
        return None;
    }

    let mut action = ActionElement::new(ActionKind::Button, element.id(), path);
    action.content = content;
    Some(action)
}

fn materialize_link(
    html: &Html,
    element: ElementRef<'_>,
    flags: &FlagTable,
    path: StructuralPath,
    base: Option<&Url>,
) -> Option<ActionElement> {
    let content = display_text(html, element.id(), flags);
    if content.is_empty() {
        return None;
    }

    let mut action = ActionElement::new(ActionKind::Link, element.id(), path);
    action.content = content;
    if let Some(href) = link_target(element.value().attr("href"), base) {
        action.details.insert("href".to_string(), href);
    }
    Some(action)
}

fn display_text(html: &Html, id: NodeId, flags: &FlagTable) -> String {
    text_content(html, id, flags, &TextOptions::single_line())
        .trim()
        .to_string()
}

/// Usable link target: empty and in-page fragment hrefs are dropped
pub fn link_target(href: Option<&str>, base: Option<&Url>) -> Option<String> {
    let href = href.map(str::trim).filter(|href| !href.is_empty())?;
    if href.starts_with('#') {
        return None;
    }
    match base.map(|base| base.join(href)) {
        Some(Ok(resolved)) => Some(resolved.to_string()),
        Some(Err(err)) => {
            ::log::trace!("Keeping unresolvable href `{}`: {}", href, err);
            Some(href.to_string())
        }
        None => Some(href.to_string()),
    }
}

/// Text of the `<label>` pointing at the element by id, or of an enclosing `<label>`
fn associated_label(html: &Html, element: &ElementRef<'_>) -> Option<String> {
    let options = TextOptions::single_line();
    let flags = FlagTable::new();
    let label_text = |label: ElementRef<'_>| {
        let text = text_content(html, label.id(), &flags, &options);
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    };

    if let Some(id) = element.value().id().filter(|id| !id.is_empty()) {
        let by_id = html
            .tree
            .root()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|candidate| candidate.value().name() == "label")
            .find(|label| label.value().attr("for") == Some(id));
        if let Some(text) = by_id.and_then(label_text) {
            return Some(text);
        }
    }

    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "label")
        .and_then(label_text)
}
