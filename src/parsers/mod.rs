pub mod actions;
pub mod html;
pub mod noise;
pub mod simplify;
pub mod style;
pub mod text;
pub mod tree;

#[cfg(test)]
mod tests;

use scraper::Html;
use url::Url;

use crate::parsers::style::StyleIndex;
use crate::parsers::tree::{FlagTable, structural_path};
use crate::results::ActionElement;

/// Run the full page pipeline over a parsed tree, in place.
///
/// Styles are indexed once, then noise is classified, actions are extracted with their
/// paths captured, and the tree is simplified. Each action's `path` is recomputed
/// against the simplified tree and left empty when the element did not survive.
pub fn process(html: &mut Html, base: Option<&Url>) -> (FlagTable, Vec<ActionElement>) {
    process_with_flags(html, base, FlagTable::new())
}

/// Like [`process`], starting from an existing flag table
pub fn process_with_flags(
    html: &mut Html,
    base: Option<&Url>,
    flags: FlagTable,
) -> (FlagTable, Vec<ActionElement>) {
    let styles = StyleIndex::from_document(html);
    let flags = noise::classify(html, &styles, flags);
    let (mut actions, flags) = actions::extract(html, &styles, flags, base);
    let flags = simplify::simplify(html, flags);

    for action in &mut actions {
        action.path = structural_path(html, action.node).ok();
    }
    let surviving = actions.iter().filter(|action| action.path.is_some()).count();
    ::log::debug!(
        "{} of {} actions survived simplification",
        surviving,
        actions.len()
    );

    (flags, actions)
}
