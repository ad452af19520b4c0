use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "page-sift")]
#[command(author = "Ryan Northey <ryan@synca.io>")]
#[command(about = "Distills a web page into clean text, actions and query-relevant fragments")]
#[command(version)]
pub struct Args {
    /// HTML file to process
    pub html_file: PathBuf,

    /// URL the page was fetched from (used to resolve links)
    #[arg(short, long, default_value = "")]
    pub url: String,

    /// Page title (defaults to the <title> element)
    #[arg(short, long)]
    pub title: Option<String>,

    /// Entity to rank content for; without it only the processed page is printed
    #[arg(short, long)]
    pub entity: Option<String>,

    /// Attribute of the entity, expanded into keywords
    #[arg(short, long)]
    pub attribute: Option<String>,

    /// Known value of the attribute
    #[arg(long)]
    pub value: Option<String>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Ranking or document summary as JSON
    Json,
    /// Plain text and numbered actions
    Text,
    /// Serialized simplified tree
    Html,
}
