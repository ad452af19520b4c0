//! File-backed collaborators.
//!
//! Data files are read on first use and cached for the lifetime of the collaborator.
//! A file that cannot be read or decoded makes the collaborator unavailable; the
//! failure is remembered so the file is only tried once.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::expansion::{AliasIndex, LexicalDatabase, Stopwords, Synset, normalize_phrase};

type Loaded<T> = std::result::Result<T, String>;

/// Read and decode a JSON file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Load a stopword list stored as a JSON array of strings
pub fn read_stopwords(path: &Path) -> Result<Stopwords> {
    let words: Vec<String> = read_json(path)?;
    ::log::debug!("Loaded {} stopwords from {}", words.len(), path.display());
    Ok(Stopwords::new(words))
}

/// A property record: a label, its aliases and the kind of value it holds
#[derive(Debug, Clone, Deserialize)]
pub struct PropertyRecord {
    pub label: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub datatype: Option<String>,
}

/// Datatype of properties that identify records in other databases
const EXTERNAL_ID: &str = "external-id";

#[derive(Deserialize)]
#[serde(untagged)]
enum AliasSource {
    Index(HashMap<String, Vec<String>>),
    Records(Vec<PropertyRecord>),
}

/// Alias index read from a JSON file on first lookup.
///
/// The file holds either a ready index (`{"phrase": ["alias", ...]}`) or a list of
/// property records (`[{"label": ..., "aliases": [...], "datatype": ...}]`).
pub struct JsonAliasIndex {
    path: PathBuf,
    index: OnceLock<Loaded<HashMap<String, Vec<String>>>>,
}

impl JsonAliasIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            index: OnceLock::new(),
        }
    }

    /// Decode either supported layout into a normalized index
    pub fn parse(json: &str) -> Result<HashMap<String, Vec<String>>> {
        let index = match serde_json::from_str::<AliasSource>(json)? {
            AliasSource::Index(index) => {
                let mut normalized = HashMap::new();
                for (phrase, aliases) in index {
                    add_aliases(&mut normalized, &phrase, &aliases);
                }
                normalized
            }
            AliasSource::Records(records) => index_records(&records),
        };
        Ok(index)
    }

    fn load(&self) -> Result<&HashMap<String, Vec<String>>> {
        let loaded = self.index.get_or_init(|| {
            let result = fs::read_to_string(&self.path)
                .map_err(|err| format!("{}: {}", self.path.display(), err))
                .and_then(|json| Self::parse(&json).map_err(|err| err.to_string()));
            match &result {
                Ok(index) => ::log::info!(
                    "Loaded alias index with {} phrases from {}",
                    index.len(),
                    self.path.display()
                ),
                Err(reason) => ::log::warn!("Alias index unavailable: {}", reason),
            }
            result
        });
        loaded
            .as_ref()
            .map_err(|reason| Error::CollaboratorUnavailable {
                name: "alias index",
                reason: reason.clone(),
            })
    }
}

impl AliasIndex for JsonAliasIndex {
    fn aliases(&self, phrase: &str) -> Result<Vec<String>> {
        let index = self.load()?;
        Ok(index
            .get(&normalize_phrase(phrase))
            .cloned()
            .unwrap_or_default())
    }
}

/// Index every label and alias of the records to the record's full alias set,
/// leaving out external identifiers
pub fn index_records(records: &[PropertyRecord]) -> HashMap<String, Vec<String>> {
    let mut index = HashMap::new();
    let mut skipped = 0;

    for record in records {
        if record.datatype.as_deref() == Some(EXTERNAL_ID) {
            skipped += 1;
            continue;
        }
        let mut names = vec![record.label.clone()];
        names.extend(record.aliases.iter().cloned());

        add_aliases(&mut index, &record.label, &names);
        for alias in &record.aliases {
            add_aliases(&mut index, alias, &names);
        }
    }

    ::log::debug!(
        "Indexed {} properties, skipped {} external identifiers",
        records.len() - skipped,
        skipped
    );
    index
}

fn add_aliases(index: &mut HashMap<String, Vec<String>>, phrase: &str, aliases: &[String]) {
    let key = normalize_phrase(phrase);
    if key.is_empty() {
        return;
    }
    let entry = index.entry(key).or_default();
    for alias in aliases {
        if !entry.contains(alias) {
            entry.push(alias.clone());
        }
    }
}

/// Suffix detachment rules used to find the base form of an inflected word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorphyRules {
    rules: Vec<(String, String)>,
}

impl Default for MorphyRules {
    fn default() -> Self {
        Self::english()
    }
}

impl MorphyRules {
    pub fn new<S: Into<String>>(rules: impl IntoIterator<Item = (S, S)>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|(suffix, ending)| (suffix.into(), ending.into()))
                .collect(),
        }
    }

    /// Noun, verb and adjective detachments for English
    pub fn english() -> Self {
        Self::new([
            // nouns
            ("s", ""),
            ("ses", "s"),
            ("xes", "x"),
            ("zes", "z"),
            ("ches", "ch"),
            ("shes", "sh"),
            ("men", "man"),
            ("ies", "y"),
            // verbs
            ("ied", "y"),
            ("es", "e"),
            ("es", ""),
            ("ed", "e"),
            ("ed", ""),
            ("ing", "e"),
            ("ing", ""),
            // adjectives
            ("er", ""),
            ("est", ""),
            ("er", "e"),
            ("est", "e"),
        ])
    }

    /// Candidate base forms of a single word, in rule order
    pub fn candidates(&self, word: &str) -> Vec<String> {
        let mut candidates: Vec<String> = Vec::new();
        if word.contains(' ') {
            return candidates;
        }
        for (suffix, ending) in &self.rules {
            let Some(stem) = word.strip_suffix(suffix.as_str()) else {
                continue;
            };
            if stem.is_empty() {
                continue;
            }
            let candidate = format!("{}{}", stem, ending);
            if candidate != word && !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
        candidates
    }
}

/// Lexical database read from a JSON file on first lookup.
///
/// The file maps words to synonym sets:
/// `{"study": [{"words": ["study", "survey"], "related": [["learn"]]}]}`.
/// Words with no entry are retried through their base forms.
pub struct JsonLexicon {
    path: PathBuf,
    rules: MorphyRules,
    synsets: OnceLock<Loaded<HashMap<String, Vec<Synset>>>>,
}

impl JsonLexicon {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rules: MorphyRules::default(),
            synsets: OnceLock::new(),
        }
    }

    /// Build an already loaded lexicon from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let synsets = Self::parse(json)?;
        Ok(Self {
            path: PathBuf::new(),
            rules: MorphyRules::default(),
            synsets: OnceLock::from(Ok(synsets)),
        })
    }

    pub fn with_rules(mut self, rules: MorphyRules) -> Self {
        self.rules = rules;
        self
    }

    /// Decode the word map, normalizing its keys
    pub fn parse(json: &str) -> Result<HashMap<String, Vec<Synset>>> {
        let raw: HashMap<String, Vec<Synset>> = serde_json::from_str(json)?;
        let mut synsets: HashMap<String, Vec<Synset>> = HashMap::new();
        for (word, sets) in raw {
            let key = normalize_phrase(&word.replace('_', " "));
            if !key.is_empty() {
                synsets.entry(key).or_default().extend(sets);
            }
        }
        Ok(synsets)
    }

    fn load(&self) -> Result<&HashMap<String, Vec<Synset>>> {
        let loaded = self.synsets.get_or_init(|| {
            let result = fs::read_to_string(&self.path)
                .map_err(|err| format!("{}: {}", self.path.display(), err))
                .and_then(|json| Self::parse(&json).map_err(|err| err.to_string()));
            match &result {
                Ok(synsets) => ::log::info!(
                    "Loaded lexicon with {} entries from {}",
                    synsets.len(),
                    self.path.display()
                ),
                Err(reason) => ::log::warn!("Lexicon unavailable: {}", reason),
            }
            result
        });
        loaded
            .as_ref()
            .map_err(|reason| Error::CollaboratorUnavailable {
                name: "lexical database",
                reason: reason.clone(),
            })
    }
}

impl LexicalDatabase for JsonLexicon {
    fn synsets(&self, word: &str) -> Result<Vec<Synset>> {
        let synsets = self.load()?;
        let word = normalize_phrase(word);

        if let Some(found) = synsets.get(&word).filter(|found| !found.is_empty()) {
            return Ok(found.clone());
        }

        let mut found = Vec::new();
        for base in self.rules.candidates(&word) {
            if let Some(sets) = synsets.get(&base) {
                ::log::trace!("Lemmatized `{}` as `{}`", word, base);
                found.extend(sets.iter().cloned());
            }
        }
        Ok(found)
    }
}
