//! Distills a raw web page into a cleaned tree, its interactive actions and the content
//! fragments most relevant to an entity/attribute query.

// Re-export modules
pub mod config;
pub mod error;
pub mod expansion;
pub mod filter;
pub mod pages;
pub mod parsers;
pub mod rank;
pub mod results;

// Re-export commonly used types for convenience
pub use config::{ExpansionConfig, ProcessorConfig};
pub use error::{Error, Result, Skip};
pub use expansion::{ExpansionContext, ExpansionFallback, KeywordExpander};
pub use pages::PageProcessor;
pub use parsers::html::Document;
pub use results::{
    ActionElement, ActionKind, ContentFragment, Ranking, RelationQuery, Relevance, Relevancy,
    StructuralPath,
};
