use crate::config::ProcessorConfig;
use crate::error::{Error, Result};
use crate::expansion::{ExpansionContext, ExpansionFallback, KeywordExpander};
use crate::parsers::html::Document;
use crate::rank;
use crate::results::{Ranking, RelationQuery};
use std::path::Path;
use url::Url;

/// Builder struct for configuring page processing and ranking
#[derive(Debug, Default)]
pub struct PageProcessor {
    // The base configuration
    config: ProcessorConfig,

    // Keyword expander, built from the configuration on first use unless supplied
    expander: Option<KeywordExpander>,
}

impl PageProcessor {
    /// Create a new PageProcessor with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a configuration. Drops a previously supplied expansion context.
    pub fn with_config(mut self, config: ProcessorConfig) -> Self {
        self.config = config;
        self.expander = None;
        self
    }

    /// Load configuration from a JSON file
    pub fn with_config_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        let config = ProcessorConfig::from_file(path)?;
        Ok(self.with_config(config))
    }

    /// Apply configuration from a JSON string
    pub fn with_config_str(self, json: &str) -> Result<Self> {
        let config = ProcessorConfig::from_json(json)?;
        Ok(self.with_config(config))
    }

    /// Override the top_k setting
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.config.top_k = top_k;
        self
    }

    /// Override the fallback used when a collaborator is unavailable
    pub fn with_fallback(mut self, fallback: ExpansionFallback) -> Self {
        self.config.expansion.fallback = fallback;
        self.expander = self
            .expander
            .map(|expander| expander.with_fallback(fallback));
        self
    }

    /// Use the given collaborators instead of the configured data files
    pub fn with_context(mut self, context: ExpansionContext) -> Self {
        self.expander =
            Some(KeywordExpander::new(context).with_fallback(self.config.expansion.fallback));
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Parse and process a page. An empty URL is accepted; anything else must parse.
    pub fn document(&self, url: &str, html: &str, title: Option<&str>) -> Result<Document> {
        check_url(url)?;
        Ok(Document::parse(url, html, title))
    }

    /// Parse and process a page from raw bytes
    pub fn document_from_bytes(
        &self,
        url: &str,
        bytes: &[u8],
        title: Option<&str>,
    ) -> Result<Document> {
        check_url(url)?;
        Ok(Document::from_bytes(url, bytes, title))
    }

    /// Rank a processed page against a query
    pub fn rank(&mut self, document: &Document, query: &RelationQuery) -> Result<Ranking> {
        self.config.validate()?;
        query.validate()?;
        let config = self.config.clone();
        let expander = self.expander()?;
        rank::rank(document, query, expander, &config)
    }

    /// The keyword expander, building it from the configuration if needed
    pub fn expander(&mut self) -> Result<&KeywordExpander> {
        let expander = match self.expander.take() {
            Some(expander) => expander,
            None => {
                let expansion = &self.config.expansion;
                ::log::debug!("Building expansion context from {:?}", expansion);
                KeywordExpander::new(expansion.build_context()?).with_fallback(expansion.fallback)
            }
        };
        Ok(self.expander.insert(expander))
    }
}

fn check_url(url: &str) -> Result<()> {
    if url.is_empty() {
        return Ok(());
    }
    match Url::parse(url) {
        Ok(_) => Ok(()),
        Err(source) => Err(Error::InvalidUrl {
            url: url.to_string(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expansion::{Stopwords, Synset};
    use crate::results::Relevancy;
    use std::collections::HashMap;

    const PAGE: &str = "<main><p>Alex was educated at Bard College.</p><a href=\"/bard\">Bard</a></main>";

    fn context() -> ExpansionContext {
        let aliases = HashMap::from([(
            "studied at".to_string(),
            vec!["educated at".to_string()],
        )]);
        ExpansionContext::new(
            aliases,
            HashMap::<String, Vec<Synset>>::new(),
            Stopwords::english(),
        )
    }

    fn query() -> RelationQuery {
        RelationQuery::new("Alex", Some("studied at".to_string()), None).unwrap()
    }

    #[test]
    fn test_builder_overrides() {
        let processor = PageProcessor::new()
            .with_config_str(r#"{"top_k": 5}"#)
            .unwrap()
            .with_top_k(3)
            .with_fallback(ExpansionFallback::Fail);
        assert_eq!(processor.config().top_k, 3);
        assert_eq!(processor.config().expansion.fallback, ExpansionFallback::Fail);
    }

    #[test]
    fn test_invalid_config_str() {
        assert!(matches!(
            PageProcessor::new().with_config_str("{"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let processor = PageProcessor::new();
        assert!(matches!(
            processor.document("not a url", PAGE, None),
            Err(Error::InvalidUrl { .. })
        ));
        assert!(processor.document("", PAGE, None).is_ok());
    }

    #[test]
    fn test_rank_with_supplied_context() {
        let mut processor = PageProcessor::new().with_context(context());
        let document = processor
            .document("https://example.com/alex", PAGE, None)
            .unwrap();
        let ranking = processor.rank(&document, &query()).unwrap();

        assert!(
            ranking
                .keywords
                .contains(&("educated at".to_string(), Relevancy::Highest))
        );
        assert_eq!(
            ranking.fragments[0].content,
            "Alex was educated at Bard College."
        );
        assert_eq!(ranking.actions.len(), 1);
        assert_eq!(ranking.actions[0].id, Some(1));
        assert_eq!(
            ranking.actions[0].details.get("href").map(String::as_str),
            Some("https://example.com/bard")
        );
    }

    #[test]
    fn test_missing_lexicon_falls_back_to_literal_seeds() {
        let mut processor = PageProcessor::new()
            .with_config_str(r#"{"expansion": {"lexicon_path": "/nonexistent/lexicon.json"}}"#)
            .unwrap();
        let document = processor.document("", PAGE, None).unwrap();
        let ranking = processor.rank(&document, &query()).unwrap();
        assert_eq!(
            ranking.keywords,
            vec![
                ("Alex".to_string(), Relevancy::Highest),
                ("studied at".to_string(), Relevancy::Highest),
            ]
        );

        let mut processor = processor.with_fallback(ExpansionFallback::Fail);
        assert!(matches!(
            processor.rank(&document, &query()),
            Err(Error::CollaboratorUnavailable {
                name: "lexical database",
                ..
            })
        ));
    }

    #[test]
    fn test_zero_top_k_is_rejected() {
        let mut processor = PageProcessor::new().with_context(context()).with_top_k(0);
        let document = processor.document("", PAGE, None).unwrap();
        assert!(matches!(
            processor.rank(&document, &query()),
            Err(Error::InvalidConfig(_))
        ));
    }
}
