use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use ego_tree::NodeId;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Ordinal relevance scale shared by keywords, content and location scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Relevancy {
    Low,
    Medium,
    High,
    Highest,
}

impl Relevancy {
    /// All tiers, most relevant first
    pub const DESCENDING: [Relevancy; 4] = [
        Relevancy::Highest,
        Relevancy::High,
        Relevancy::Medium,
        Relevancy::Low,
    ];

    /// Numeric weight of the tier
    pub fn value(self) -> f64 {
        match self {
            Relevancy::Low => 0.25,
            Relevancy::Medium => 0.5,
            Relevancy::High => 0.75,
            Relevancy::Highest => 1.0,
        }
    }
}

impl fmt::Display for Relevancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Relevancy::Low => "LOW",
            Relevancy::Medium => "MEDIUM",
            Relevancy::High => "HIGH",
            Relevancy::Highest => "HIGHEST",
        };
        f.write_str(name)
    }
}

/// Named dimension of a relevance score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Content,
    Location,
}

/// Relevance score: one tier per dimension, combined multiplicatively
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Relevance(BTreeMap<Dimension, Relevancy>);

impl Relevance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score built from a content tier and a location tier
    pub fn content_at(content: Relevancy, location: Relevancy) -> Self {
        Self::new()
            .with(Dimension::Content, content)
            .with(Dimension::Location, location)
    }

    pub fn with(mut self, dimension: Dimension, tier: Relevancy) -> Self {
        self.0.insert(dimension, tier);
        self
    }

    pub fn get(&self, dimension: Dimension) -> Option<Relevancy> {
        self.0.get(&dimension).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Product of the present dimensions; an empty score is worth nothing
    pub fn total(&self) -> f64 {
        if self.0.is_empty() {
            return 0.0;
        }
        self.0.values().map(|tier| tier.value()).product()
    }
}

/// XPath-like address of an element, e.g. `/html/body/div[2]/p`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuralPath(String);

impl StructuralPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tag names of the path segments, outermost first
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.0
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.split('[').next().unwrap_or(segment))
    }
}

impl fmt::Display for StructuralPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Total order used for fragments and actions: higher relevance, then shorter path,
/// then lexicographically smaller path.
pub fn ranking_order(
    a: &Relevance,
    a_path: &StructuralPath,
    b: &Relevance,
    b_path: &StructuralPath,
) -> Ordering {
    b.total()
        .total_cmp(&a.total())
        .then_with(|| a_path.len().cmp(&b_path.len()))
        .then_with(|| a_path.cmp(b_path))
}

/// Interactive element category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionKind {
    Input,
    Button,
    Link,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Input => "INPUT",
            ActionKind::Button => "BUTTON",
            ActionKind::Link => "LINK",
        };
        f.write_str(name)
    }
}

/// An interactive element exposed for navigation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionElement {
    /// Ordinal id, assigned after ranking (1 = most relevant)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<usize>,
    pub kind: ActionKind,
    /// Display text of the element
    pub content: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
    /// Path captured before any pruning happened
    pub source_path: StructuralPath,
    /// Path in the simplified tree, if the element survived simplification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<StructuralPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance: Option<Relevance>,
    #[serde(skip)]
    pub node: NodeId,
}

impl ActionElement {
    pub fn new(kind: ActionKind, node: NodeId, source_path: StructuralPath) -> Self {
        Self {
            id: None,
            kind,
            content: String::new(),
            details: BTreeMap::new(),
            source_path,
            path: None,
            relevance: None,
            node,
        }
    }

    /// Detail map rendered as `key=value` pairs
    pub fn details_text(&self) -> String {
        self.details
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ActionElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(id) = self.id {
            write!(f, "[{}] ", id)?;
        }
        write!(f, "{}", self.kind)?;
        if !self.content.is_empty() {
            write!(f, " {}", self.content)?;
        }
        if !self.details.is_empty() {
            write!(f, " ({})", self.details_text())?;
        }
        Ok(())
    }
}

/// A ranked piece of page content
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentFragment {
    pub path: StructuralPath,
    pub content: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
    pub relevance: Relevance,
    #[serde(skip)]
    pub node: NodeId,
}

/// Entity/attribute/value triple driving keyword selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationQuery {
    pub entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl RelationQuery {
    /// Create a query, rejecting a missing or blank entity
    pub fn new(
        entity: impl Into<String>,
        attribute: Option<String>,
        value: Option<String>,
    ) -> Result<Self> {
        let query = Self {
            entity: entity.into(),
            attribute,
            value,
        };
        query.validate()?;
        Ok(query)
    }

    pub fn validate(&self) -> Result<()> {
        if self.entity.trim().is_empty() {
            return Err(Error::InvalidQuery("entity must not be empty".to_string()));
        }
        Ok(())
    }

    /// Non-blank attribute, if any
    pub fn attribute(&self) -> Option<&str> {
        self.attribute
            .as_deref()
            .map(str::trim)
            .filter(|attribute| !attribute.is_empty())
    }
}

impl fmt::Display for RelationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}]",
            self.entity,
            self.attribute.as_deref().unwrap_or("?"),
            self.value.as_deref().unwrap_or("?")
        )
    }
}

/// Ranked output for one query against one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub keywords: Vec<(String, Relevancy)>,
    pub fragments: Vec<ContentFragment>,
    pub actions: Vec<ActionElement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relevance_total_is_product() {
        let relevance = Relevance::content_at(Relevancy::High, Relevancy::Medium);
        assert_eq!(relevance.total(), 0.375);

        let content_only = Relevance::new().with(Dimension::Content, Relevancy::Highest);
        assert_eq!(content_only.total(), 1.0);
    }

    #[test]
    fn test_empty_relevance_is_zero() {
        assert_eq!(Relevance::new().total(), 0.0);
    }

    #[test]
    fn test_ranking_order_tie_breaks() {
        let high = Relevance::content_at(Relevancy::Highest, Relevancy::Highest);
        let low = Relevance::content_at(Relevancy::Low, Relevancy::Medium);
        let short = StructuralPath::new("/html/body/p");
        let long = StructuralPath::new("/html/body/div/p");
        let sibling = StructuralPath::new("/html/body/b");

        assert_eq!(ranking_order(&high, &long, &low, &short), Ordering::Less);
        assert_eq!(ranking_order(&low, &short, &low, &long), Ordering::Less);
        assert_eq!(ranking_order(&low, &short, &low, &sibling), Ordering::Greater);
        assert_eq!(
            ranking_order(&Relevance::new(), &short, &low, &long),
            Ordering::Greater
        );
    }

    #[test]
    fn test_path_tags() {
        let path = StructuralPath::new("/html/body/div[2]/article/p[3]");
        let tags: Vec<&str> = path.tags().collect();
        assert_eq!(tags, vec!["html", "body", "div", "article", "p"]);
    }

    #[test]
    fn test_query_requires_entity() {
        assert!(RelationQuery::new("  ", None, None).is_err());
        let query = RelationQuery::new("Alex", Some(" ".to_string()), None).unwrap();
        assert_eq!(query.attribute(), None);
        assert_eq!(query.to_string(), "[Alex,  , ?]");
    }

    #[test]
    fn test_action_display() {
        let mut action = ActionElement::new(
            ActionKind::Link,
            ego_tree::Tree::new(0).root().id(),
            StructuralPath::new("/html/body/a"),
        );
        action.id = Some(2);
        action.content = "About".to_string();
        action
            .details
            .insert("href".to_string(), "https://example.com/about".to_string());
        assert_eq!(
            action.to_string(),
            "[2] LINK About (href=https://example.com/about)"
        );
    }
}
