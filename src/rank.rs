//! Relevance ranking of content fragments and actions against a relation query.

use std::collections::HashSet;

use ego_tree::NodeId;

use crate::config::ProcessorConfig;
use crate::error::{Error, Result};
use crate::expansion::KeywordExpander;
use crate::filter::KeywordFilter;
use crate::parsers::html::Document;
use crate::parsers::text::{TextOptions, match_text, text_content};
use crate::parsers::tree::{element_ids, is_attached, prune, structural_path, tag_name};
use crate::results::{
    ActionElement, ActionKind, ContentFragment, Dimension, Ranking, RelationQuery, Relevance,
    Relevancy, StructuralPath, ranking_order,
};

/// Location tiers by enclosing tag, checked in order; the first tag on the path wins
const LOCATION_TIERS: [(&str, Relevancy); 7] = [
    ("aside", Relevancy::Low),
    ("nav", Relevancy::Low),
    ("header", Relevancy::Medium),
    ("footer", Relevancy::Medium),
    ("article", Relevancy::Highest),
    ("section", Relevancy::Highest),
    ("main", Relevancy::High),
];

/// Relevance of a position in the page; MEDIUM outside any landmark
pub fn location_relevance(path: &StructuralPath) -> Relevancy {
    for (tag, tier) in LOCATION_TIERS {
        if path.tags().any(|segment| segment == tag) {
            return tier;
        }
    }
    Relevancy::Medium
}

/// Keywords for a query, sorted by tier.
///
/// The entity is HIGHEST, or HIGH when the title already names it. The attribute is
/// expanded and merged in. At least `top_k` keywords are kept, and never fewer than the
/// number of HIGHEST keywords.
pub fn top_keywords(
    query: &RelationQuery,
    title: Option<&str>,
    expander: &KeywordExpander,
    top_k: usize,
) -> Result<Vec<(String, Relevancy)>> {
    query.validate()?;
    if top_k == 0 {
        return Err(Error::InvalidConfig("top_k must be at least 1".to_string()));
    }

    let entity = query.entity.trim();
    let entity_tier = match title {
        Some(title) if title.to_lowercase().contains(&entity.to_lowercase()) => Relevancy::High,
        _ => Relevancy::Highest,
    };

    let mut keywords = vec![(entity.to_string(), entity_tier)];
    if let Some(attribute) = query.attribute() {
        keywords.extend(expander.expand(&[attribute])?);
    }

    keywords.sort_by(|a, b| b.1.cmp(&a.1));
    let mut seen = HashSet::new();
    keywords.retain(|(keyword, _)| seen.insert(keyword.to_lowercase()));

    let highest = keywords
        .iter()
        .filter(|(_, tier)| *tier == Relevancy::Highest)
        .count();
    keywords.truncate(top_k.max(highest));

    ::log::debug!("Top keywords for {}: {:?}", query, keywords);
    Ok(keywords)
}

/// Match keyword groups against the simplified tree, most relevant tier first.
///
/// Matching runs on a copy of the tree: each matched element is pruned from the copy so
/// lower tiers cannot match it again. Paths are taken from the unpruned tree.
pub fn rank_fragments(
    document: &Document,
    filter: &KeywordFilter,
    climb_short_matches: bool,
) -> Vec<ContentFragment> {
    let tree = document.tree();
    let flags = document.flags();
    let mut working = tree.clone();
    let options = TextOptions::default();
    let mut fragments = Vec::new();

    for group in filter.groups() {
        let matched: Vec<NodeId> = element_ids(&working)
            .into_iter()
            .filter(|id| group.is_match(&match_text(&working, *id, flags)))
            .collect();
        ::log::debug!(
            "{} elements matched {} keywords at {}",
            matched.len(),
            group.keywords().len(),
            group.tier()
        );

        for id in matched {
            if !is_attached(&working, id) {
                continue;
            }
            let mut target = id;
            while climb_short_matches
                && text_content(&working, target, flags, &options).chars().count()
                    < group.longest()
            {
                let parent = widen(&working, target);
                if parent == target {
                    break;
                }
                target = parent;
            }
            if !is_attached(&working, target) {
                continue;
            }

            let path = match structural_path(tree, target) {
                Ok(path) => path,
                Err(skip) => {
                    ::log::trace!("Skipping matched element: {}", skip);
                    continue;
                }
            };
            let location = location_relevance(&path);
            fragments.push(ContentFragment {
                content: text_content(&working, target, flags, &options),
                details: Default::default(),
                relevance: Relevance::content_at(group.tier(), location),
                path,
                node: target,
            });
            prune(&mut working, target);
        }
    }

    fragments.sort_by(|a, b| ranking_order(&a.relevance, &a.path, &b.relevance, &b.path));
    ::log::info!("Ranked {} content fragments", fragments.len());
    fragments
}

/// Parent of a matched element; `body` widens to itself
fn widen(tree: &scraper::Html, id: NodeId) -> NodeId {
    let Some(node) = tree.tree.get(id) else {
        return id;
    };
    if tag_name(node) == Some("body") {
        return id;
    }
    match node.parent() {
        Some(parent) if matches!(tag_name(parent), Some(name) if name != "html") => parent.id(),
        _ => id,
    }
}

/// Whether an action is a search field
fn is_search_input(action: &ActionElement) -> bool {
    action.kind == ActionKind::Input
        && (action.details_text().to_lowercase().contains("search")
            || action.content.to_lowercase().contains("search"))
}

/// Score, order and number actions. Search fields always get the top content tier.
pub fn rank_actions(actions: &[ActionElement], filter: &KeywordFilter) -> Vec<ActionElement> {
    let mut ranked: Vec<ActionElement> = actions
        .iter()
        .cloned()
        .map(|mut action| {
            action.relevance = Some(if is_search_input(&action) {
                ::log::debug!("Found search input: {}", action);
                Relevance::new().with(Dimension::Content, Relevancy::Highest)
            } else {
                let content = filter
                    .first_contained(&action.content)
                    .unwrap_or(Relevancy::Low);
                Relevance::content_at(content, location_relevance(&action.source_path))
            });
            action
        })
        .collect();

    ranked.sort_by(|a, b| {
        let empty = Relevance::new();
        ranking_order(
            a.relevance.as_ref().unwrap_or(&empty),
            &a.source_path,
            b.relevance.as_ref().unwrap_or(&empty),
            &b.source_path,
        )
    });
    for (index, action) in ranked.iter_mut().enumerate() {
        action.id = Some(index + 1);
    }

    ::log::info!("Ranked {} actions", ranked.len());
    ranked
}

/// Rank a processed document against a query
pub fn rank(
    document: &Document,
    query: &RelationQuery,
    expander: &KeywordExpander,
    config: &ProcessorConfig,
) -> Result<Ranking> {
    config.validate()?;
    let keywords = top_keywords(query, document.title(), expander, config.top_k)?;
    let filter = KeywordFilter::new(&keywords)?;

    let fragments = rank_fragments(document, &filter, config.climb_short_matches);
    let actions = rank_actions(document.actions(), &filter);

    Ok(Ranking {
        keywords,
        fragments,
        actions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expansion::{ExpansionContext, Stopwords, Synset};
    use std::collections::HashMap;

    fn expander() -> KeywordExpander {
        let aliases = HashMap::from([(
            "studied at".to_string(),
            vec!["educated at".to_string(), "alumni of".to_string()],
        )]);
        let lexicon = HashMap::from([(
            "studied".to_string(),
            vec![Synset::new(["study"]).with_related(["learn"])],
        )]);
        KeywordExpander::new(ExpansionContext::new(aliases, lexicon, Stopwords::english()))
    }

    fn query(entity: &str, attribute: Option<&str>) -> RelationQuery {
        RelationQuery::new(entity, attribute.map(str::to_string), None).unwrap()
    }

    #[test]
    fn test_location_precedence() {
        let tier = |path: &str| location_relevance(&StructuralPath::new(path));
        assert_eq!(tier("/html/body/main/article/p"), Relevancy::Highest);
        assert_eq!(tier("/html/body/main/p"), Relevancy::High);
        assert_eq!(tier("/html/body/main/aside/p"), Relevancy::Low);
        assert_eq!(tier("/html/body/header/nav/a"), Relevancy::Low);
        assert_eq!(tier("/html/body/footer/section/p"), Relevancy::Medium);
        assert_eq!(tier("/html/body/div[2]/p"), Relevancy::Medium);
        assert_eq!(tier("/html/body/navigation/p"), Relevancy::Medium);
    }

    #[test]
    fn test_top_keywords() {
        let keywords =
            top_keywords(&query("Alex", Some("studied at")), None, &expander(), 25).unwrap();
        assert_eq!(
            keywords,
            vec![
                ("Alex".to_string(), Relevancy::Highest),
                ("studied at".to_string(), Relevancy::Highest),
                ("educated at".to_string(), Relevancy::Highest),
                ("alumni of".to_string(), Relevancy::Highest),
                ("study".to_string(), Relevancy::High),
                ("learn".to_string(), Relevancy::Low),
            ]
        );

        let keywords = top_keywords(
            &query("Alex", Some("studied at")),
            Some("Profile of ALEX Doe"),
            &expander(),
            2,
        )
        .unwrap();
        assert_eq!(keywords.len(), 3);
        assert!(keywords.iter().all(|(_, tier)| *tier == Relevancy::Highest));
    }

    #[test]
    fn test_entity_in_title_is_lowered() {
        let keywords =
            top_keywords(&query("Alex", None), Some("Alex Doe"), &expander(), 25).unwrap();
        assert_eq!(keywords, vec![("Alex".to_string(), Relevancy::High)]);
    }

    #[test]
    fn test_blank_entity_is_rejected() {
        let invalid = RelationQuery {
            entity: " ".to_string(),
            attribute: None,
            value: None,
        };
        assert!(matches!(
            top_keywords(&invalid, None, &expander(), 25),
            Err(Error::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_fragments_match_once_at_highest_tier() {
        let document = Document::parse(
            "https://example.com",
            "<main><article><h1>Alex Doe Profile</h1><p>Alex studied at Bard College.</p></article>\
             <p>Courses to study and learn.</p><aside><h3>Related</h3><p>Learn more</p></aside></main>",
            None,
        );
        let ranking = rank(
            &document,
            &query("Alex", Some("studied at")),
            &expander(),
            &ProcessorConfig::default(),
        )
        .unwrap();

        let summary: Vec<(&str, f64)> = ranking
            .fragments
            .iter()
            .map(|fragment| (fragment.path.as_str(), fragment.relevance.total()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("/html/body/main/article/p", 1.0),
                ("/html/body/main/article/h1", 1.0),
                ("/html/body/main/p", 0.5625),
                ("/html/body/main/aside/p", 0.0625),
            ]
        );
        assert_eq!(ranking.fragments[0].content, "Alex studied at Bard College.");
    }

    #[test]
    fn test_short_match_climbs_to_parent() {
        let document = Document::parse(
            "https://example.com",
            "<section><h2>Alex</h2><p>Born 1990 in Ohio</p></section><p>educated at home</p>",
            None,
        );
        let keywords = vec![
            ("Alex".to_string(), Relevancy::Highest),
            ("educated at".to_string(), Relevancy::Highest),
        ];
        let filter = KeywordFilter::new(&keywords).unwrap();

        let fragments = rank_fragments(&document, &filter, true);
        let paths: Vec<&str> = fragments.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["/html/body/section", "/html/body/p"]);
        assert_eq!(fragments[0].content, "- Alex\n    Born 1990 in Ohio");

        let fragments = rank_fragments(&document, &filter, false);
        let paths: Vec<&str> = fragments.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["/html/body/section/h2", "/html/body/p"]);
    }

    #[test]
    fn test_long_element_text_does_not_climb() {
        let document = Document::parse(
            "https://example.com",
            "<div>Alex<p>Born 1990 in Ohio, worked as an engineer</p></div>\
             <p>Unrelated closing paragraph text</p>",
            None,
        );
        let keywords = vec![
            ("Alex".to_string(), Relevancy::Highest),
            ("educated at".to_string(), Relevancy::Highest),
        ];
        let filter = KeywordFilter::new(&keywords).unwrap();

        let fragments = rank_fragments(&document, &filter, true);
        let paths: Vec<&str> = fragments.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["/html/body/div"]);
    }

    #[test]
    fn test_short_match_climbs_until_long_enough() {
        let keywords = vec![
            ("Alex".to_string(), Relevancy::Highest),
            ("educated at home town".to_string(), Relevancy::Highest),
        ];
        let filter = KeywordFilter::new(&keywords).unwrap();

        let document = Document::parse(
            "https://example.com",
            "<article><div><h3>Alex</h3><h4>Bo</h4></div><p>Lives in Ohio now</p></article>",
            None,
        );
        let fragments = rank_fragments(&document, &filter, true);
        let paths: Vec<&str> = fragments.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["/html/body/article"]);

        let document = Document::parse("https://example.com", "<p>Alex</p>", None);
        let fragments = rank_fragments(&document, &filter, true);
        let paths: Vec<&str> = fragments.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["/html/body"]);
    }

    #[test]
    fn test_actions_are_numbered_by_relevance() {
        let document = Document::parse(
            "https://example.com",
            "<nav><a href=\"/alex\">Alex</a></nav><main><a href=\"/about\">About</a>\
             <button>Study programs</button></main><input type=\"search\" placeholder=\"Search\">",
            None,
        );
        let ranking = rank(
            &document,
            &query("Alex", Some("studied at")),
            &expander(),
            &ProcessorConfig::default(),
        )
        .unwrap();

        let summary: Vec<(Option<usize>, &str, f64)> = ranking
            .actions
            .iter()
            .map(|action| {
                (
                    action.id,
                    action.content.as_str(),
                    action.relevance.as_ref().map(Relevance::total).unwrap_or(0.0),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                (Some(1), "Search", 1.0),
                (Some(2), "Study programs", 0.5625),
                (Some(3), "Alex", 0.25),
                (Some(4), "About", 0.1875),
            ]
        );
    }
}
