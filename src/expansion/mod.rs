//! Keyword expansion.
//!
//! A seed phrase is expanded into a tiered keyword list from two collaborators: an alias
//! index (exact phrase to aliases, tier HIGHEST) and a lexical database (word to synonym
//! sets, direct words at HIGH and related words at LOW). Collaborators are held by an
//! [`ExpansionContext`] built once and handed to the [`KeywordExpander`].

pub mod sources;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::results::Relevancy;

pub use sources::{JsonAliasIndex, JsonLexicon, MorphyRules};

/// Exact-phrase alias lookup
pub trait AliasIndex: Send + Sync {
    /// Aliases of a normalized phrase; an unknown phrase has none
    fn aliases(&self, phrase: &str) -> Result<Vec<String>>;
}

/// Synonym set lookup
pub trait LexicalDatabase: Send + Sync {
    /// Synonym sets of a normalized word or phrase
    fn synsets(&self, word: &str) -> Result<Vec<Synset>>;
}

/// A synonym set: its word forms plus the word forms of related sets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synset {
    pub words: Vec<String>,
    #[serde(default)]
    pub related: Vec<Vec<String>>,
}

impl Synset {
    pub fn new<S: Into<String>>(words: impl IntoIterator<Item = S>) -> Self {
        Self {
            words: words.into_iter().map(Into::into).collect(),
            related: Vec::new(),
        }
    }

    pub fn with_related<S: Into<String>>(mut self, words: impl IntoIterator<Item = S>) -> Self {
        self.related.push(words.into_iter().map(Into::into).collect());
        self
    }
}

impl AliasIndex for HashMap<String, Vec<String>> {
    fn aliases(&self, phrase: &str) -> Result<Vec<String>> {
        Ok(self.get(phrase).cloned().unwrap_or_default())
    }
}

impl LexicalDatabase for HashMap<String, Vec<Synset>> {
    fn synsets(&self, word: &str) -> Result<Vec<Synset>> {
        Ok(self.get(word).cloned().unwrap_or_default())
    }
}

/// Lowercase a phrase and collapse its whitespace
pub fn normalize_phrase(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Words ignored when splitting seeds and dropped from the final keyword list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    pub fn new<S: AsRef<str>>(words: impl IntoIterator<Item = S>) -> Self {
        Self {
            words: words
                .into_iter()
                .map(|word| normalize_phrase(word.as_ref()))
                .filter(|word| !word.is_empty())
                .collect(),
        }
    }

    /// The built-in English list
    pub fn english() -> Self {
        Self::new(ENGLISH_STOPWORDS)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&normalize_phrase(word))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// What to do when a collaborator cannot be loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionFallback {
    /// Expand to the literal seed phrases only
    #[default]
    Literal,
    /// Return the error to the caller
    Fail,
}

/// Read-only collaborators of the expander
pub struct ExpansionContext {
    aliases: Box<dyn AliasIndex>,
    lexicon: Box<dyn LexicalDatabase>,
    stopwords: Stopwords,
}

impl ExpansionContext {
    pub fn new(
        aliases: impl AliasIndex + 'static,
        lexicon: impl LexicalDatabase + 'static,
        stopwords: Stopwords,
    ) -> Self {
        Self::from_boxed(Box::new(aliases), Box::new(lexicon), stopwords)
    }

    pub fn from_boxed(
        aliases: Box<dyn AliasIndex>,
        lexicon: Box<dyn LexicalDatabase>,
        stopwords: Stopwords,
    ) -> Self {
        Self {
            aliases,
            lexicon,
            stopwords,
        }
    }

    /// No aliases, no synonyms, English stopwords
    pub fn empty() -> Self {
        Self::new(
            HashMap::<String, Vec<String>>::new(),
            HashMap::<String, Vec<Synset>>::new(),
            Stopwords::english(),
        )
    }

    pub fn stopwords(&self) -> &Stopwords {
        &self.stopwords
    }
}

impl std::fmt::Debug for ExpansionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpansionContext")
            .field("stopwords", &self.stopwords.len())
            .finish_non_exhaustive()
    }
}

/// Tiered keyword list that keeps the first tier recorded for each keyword
#[derive(Debug, Default)]
struct TieredKeywords {
    seen: HashSet<String>,
    keywords: Vec<(String, Relevancy)>,
}

impl TieredKeywords {
    fn push(&mut self, keyword: &str, tier: Relevancy) {
        let keyword = keyword.replace('_', " ");
        let keyword = keyword.split_whitespace().collect::<Vec<_>>().join(" ");
        if keyword.is_empty() {
            return;
        }
        if self.seen.insert(keyword.to_lowercase()) {
            self.keywords.push((keyword, tier));
        }
    }
}

/// Expands seed phrases into tiered keyword lists
#[derive(Debug)]
pub struct KeywordExpander {
    context: ExpansionContext,
    fallback: ExpansionFallback,
}

impl KeywordExpander {
    pub fn new(context: ExpansionContext) -> Self {
        Self {
            context,
            fallback: ExpansionFallback::default(),
        }
    }

    pub fn with_fallback(mut self, fallback: ExpansionFallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn context(&self) -> &ExpansionContext {
        &self.context
    }

    /// Expand the seeds into `(keyword, tier)` pairs, most relevant first within each
    /// phase: seeds and aliases, then direct synonyms, then related words.
    pub fn expand(&self, seeds: &[&str]) -> Result<Vec<(String, Relevancy)>> {
        match self.expand_with_collaborators(seeds) {
            Ok(keywords) => Ok(keywords),
            Err(err @ Error::CollaboratorUnavailable { .. })
                if self.fallback == ExpansionFallback::Literal =>
            {
                ::log::warn!("Expanding literally: {}", err);
                Ok(self.literal(seeds))
            }
            Err(err) => Err(err),
        }
    }

    /// Seeds at HIGHEST, without stopwords
    pub fn literal(&self, seeds: &[&str]) -> Vec<(String, Relevancy)> {
        let mut tiered = TieredKeywords::default();
        for seed in seeds {
            tiered.push(seed, Relevancy::Highest);
        }
        self.without_stopwords(tiered.keywords)
    }

    fn expand_with_collaborators(&self, seeds: &[&str]) -> Result<Vec<(String, Relevancy)>> {
        let stopwords = &self.context.stopwords;
        let mut tiered = TieredKeywords::default();
        let mut lookups: Vec<String> = Vec::new();

        for seed in seeds {
            let phrase = normalize_phrase(seed);
            if phrase.is_empty() {
                continue;
            }
            tiered.push(seed, Relevancy::Highest);

            let aliases = self.context.aliases.aliases(&phrase)?;
            ::log::debug!("Aliases of `{}`: {:?}", phrase, aliases);
            for alias in &aliases {
                tiered.push(alias, Relevancy::Highest);
            }

            lookups.push(phrase.clone());
            for word in phrase.split(' ') {
                if !stopwords.contains(word) && !lookups.iter().any(|seen| seen == word) {
                    lookups.push(word.to_string());
                }
            }
        }

        let mut synsets = Vec::new();
        for word in &lookups {
            let found = self.context.lexicon.synsets(word)?;
            ::log::debug!("Expanding `{}`: {} synsets", word, found.len());
            synsets.extend(found);
        }

        for synset in &synsets {
            for word in &synset.words {
                tiered.push(word, Relevancy::High);
            }
        }
        for synset in &synsets {
            for related in &synset.related {
                for word in related {
                    tiered.push(word, Relevancy::Low);
                }
            }
            ::log::trace!("Related words of {:?} added", synset.words);
        }

        Ok(self.without_stopwords(tiered.keywords))
    }

    fn without_stopwords(&self, keywords: Vec<(String, Relevancy)>) -> Vec<(String, Relevancy)> {
        keywords
            .into_iter()
            .filter(|(keyword, _)| !self.context.stopwords.contains(keyword))
            .collect()
    }
}

/// Common English function words
pub const ENGLISH_STOPWORDS: [&str; 127] = [
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before",
    "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
    "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can",
    "will", "just", "don", "should", "now",
];
