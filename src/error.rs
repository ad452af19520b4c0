use std::fmt;

use thiserror::Error;

/// Errors surfaced to callers of the crate
#[derive(Debug, Error)]
pub enum Error {
    /// The relation query broke its contract (entity missing or blank)
    #[error("invalid relation query: {0}")]
    InvalidQuery(String),

    /// Reading a configuration or collaborator data file failed
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON configuration or collaborator data could not be decoded
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The page URL could not be parsed
    #[error("invalid page URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A keyword expansion collaborator could not be loaded
    #[error("{name} is unavailable: {reason}")]
    CollaboratorUnavailable { name: &'static str, reason: String },

    /// A configuration value is out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A keyword match pattern failed to compile
    #[error("invalid keyword pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Reason a single selector, rule or node was skipped without failing the pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    /// The selector uses syntax the matcher does not support (pseudo-classes etc.)
    UnsupportedSelector { selector: String, reason: String },
    /// A style rule could not be parsed into a prelude and a block
    MalformedRule(String),
    /// The node was detached from the document before its path could be captured
    Detached,
    /// The node is not an element
    NotAnElement,
    /// The node carries no displayable text
    EmptyContent,
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skip::UnsupportedSelector { selector, reason } => {
                write!(f, "unsupported selector `{}`: {}", selector, reason)
            }
            Skip::MalformedRule(rule) => write!(f, "malformed rule `{}`", rule),
            Skip::Detached => write!(f, "node is detached from the document"),
            Skip::NotAnElement => write!(f, "node is not an element"),
            Skip::EmptyContent => write!(f, "node has no content"),
        }
    }
}
