use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::expansion::sources::read_stopwords;
use crate::expansion::{
    AliasIndex, ExpansionContext, ExpansionFallback, JsonAliasIndex, JsonLexicon,
    LexicalDatabase, Stopwords, Synset,
};

/// Where the keyword expansion collaborators come from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionConfig {
    /// JSON alias index or property records; no aliases when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias_index_path: Option<PathBuf>,

    /// JSON lexical database; no synonyms when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lexicon_path: Option<PathBuf>,

    /// JSON array of stopwords; the built-in English list when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopwords_path: Option<PathBuf>,

    /// Behavior when a collaborator cannot be loaded
    #[serde(default)]
    pub fallback: ExpansionFallback,
}

impl ExpansionConfig {
    /// Build the collaborators. Alias and lexicon files are only read on first lookup;
    /// the stopword list is read now.
    pub fn build_context(&self) -> Result<ExpansionContext> {
        let aliases: Box<dyn AliasIndex> = match &self.alias_index_path {
            Some(path) => Box::new(JsonAliasIndex::new(path)),
            None => Box::new(HashMap::<String, Vec<String>>::new()),
        };
        let lexicon: Box<dyn LexicalDatabase> = match &self.lexicon_path {
            Some(path) => Box::new(JsonLexicon::new(path)),
            None => Box::new(HashMap::<String, Vec<Synset>>::new()),
        };
        let stopwords = match &self.stopwords_path {
            Some(path) => self.load_stopwords(path)?,
            None => Stopwords::english(),
        };

        Ok(ExpansionContext::from_boxed(aliases, lexicon, stopwords))
    }

    fn load_stopwords(&self, path: &Path) -> Result<Stopwords> {
        match read_stopwords(path) {
            Ok(stopwords) => Ok(stopwords),
            Err(err) if self.fallback == ExpansionFallback::Literal => {
                ::log::warn!("Using built-in stopwords: {}", err);
                Ok(Stopwords::english())
            }
            Err(err) => Err(Error::CollaboratorUnavailable {
                name: "stopwords",
                reason: err.to_string(),
            }),
        }
    }
}

/// Configuration for page processing and ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Minimum number of keywords kept for matching
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Widen a matched fragment to its parent when its text is shorter than the
    /// longest keyword of the matching tier
    #[serde(default = "default_climb_short_matches")]
    pub climb_short_matches: bool,

    #[serde(default)]
    pub expansion: ExpansionConfig,
}

/// Default value for top_k
fn default_top_k() -> usize {
    25
}

/// Default value for climb_short_matches
fn default_climb_short_matches() -> bool {
    true
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            climb_short_matches: default_climb_short_matches(),
            expansion: ExpansionConfig::default(),
        }
    }
}

impl ProcessorConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let io_error = |source| Error::Io {
            path: path.display().to_string(),
            source,
        };
        let mut file = File::open(path).map_err(io_error)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(io_error)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = ProcessorConfig::from_json("{}").unwrap();
        assert_eq!(config, ProcessorConfig::default());
        assert_eq!(config.top_k, 25);
        assert!(config.climb_short_matches);
        assert_eq!(config.expansion.fallback, ExpansionFallback::Literal);
    }

    #[test]
    fn test_full_config() {
        let config = ProcessorConfig::from_json(
            r#"{
                "top_k": 10,
                "climb_short_matches": false,
                "expansion": {
                    "alias_index_path": "data/props.json",
                    "lexicon_path": "data/lexicon.json",
                    "fallback": "fail"
                }
            }"#,
        )
        .unwrap();
        assert_eq!(config.top_k, 10);
        assert!(!config.climb_short_matches);
        assert_eq!(
            config.expansion.alias_index_path,
            Some(PathBuf::from("data/props.json"))
        );
        assert_eq!(config.expansion.stopwords_path, None);
        assert_eq!(config.expansion.fallback, ExpansionFallback::Fail);
    }

    #[test]
    fn test_invalid_top_k() {
        assert!(matches!(
            ProcessorConfig::from_json(r#"{"top_k": 0}"#),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_missing_stopwords_file() {
        let mut expansion = ExpansionConfig {
            stopwords_path: Some(PathBuf::from("/nonexistent/stopwords.json")),
            ..ExpansionConfig::default()
        };
        let context = expansion.build_context().unwrap();
        assert!(context.stopwords().contains("the"));

        expansion.fallback = ExpansionFallback::Fail;
        assert!(matches!(
            expansion.build_context(),
            Err(Error::CollaboratorUnavailable { name: "stopwords", .. })
        ));
    }

    #[test]
    fn test_missing_config_file() {
        assert!(matches!(
            ProcessorConfig::from_file("/nonexistent/page-sift.json"),
            Err(Error::Io { .. })
        ));
    }
}
