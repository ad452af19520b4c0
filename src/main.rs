use clap::Parser;
use page_sift::{Document, PageProcessor, Ranking, RelationQuery};

mod args;
use args::{Args, OutputFormat};

fn main() {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    ::log::info!("Processing {}", args.html_file.display());

    let mut processor = PageProcessor::new();
    if let Some(path) = &args.config {
        processor = match processor.with_config_file(path) {
            Ok(processor) => processor,
            Err(err) => {
                ::log::error!("Failed to load configuration: {}", err);
                std::process::exit(1);
            }
        };
    }

    let bytes = match std::fs::read(&args.html_file) {
        Ok(bytes) => bytes,
        Err(err) => {
            ::log::error!("Failed to read {}: {}", args.html_file.display(), err);
            std::process::exit(1);
        }
    };

    let document = match processor.document_from_bytes(&args.url, &bytes, args.title.as_deref()) {
        Ok(document) => document,
        Err(err) => {
            ::log::error!("Failed to process page: {}", err);
            std::process::exit(1);
        }
    };

    let ranking = match &args.entity {
        Some(entity) => {
            let ranking = RelationQuery::new(entity.as_str(), args.attribute.clone(), args.value.clone())
                .and_then(|query| processor.rank(&document, &query));
            match ranking {
                Ok(ranking) => Some(ranking),
                Err(err) => {
                    ::log::error!("Failed to rank page: {}", err);
                    std::process::exit(1);
                }
            }
        }
        None => None,
    };

    match args.format {
        OutputFormat::Json => print_json(&document, ranking.as_ref()),
        OutputFormat::Text => print_text(&document, ranking.as_ref()),
        OutputFormat::Html => println!("{}", document.html()),
    }
}

fn print_json(document: &Document, ranking: Option<&Ranking>) {
    let value = match ranking {
        Some(ranking) => serde_json::to_value(ranking),
        None => Ok(serde_json::json!({
            "url": document.url(),
            "title": document.title(),
            "text": document.text(),
            "actions": document.actions(),
        })),
    };
    match value.and_then(|value| serde_json::to_string_pretty(&value)) {
        Ok(json) => println!("{}", json),
        Err(err) => {
            ::log::error!("Failed to serialize output: {}", err);
            std::process::exit(1);
        }
    }
}

fn print_text(document: &Document, ranking: Option<&Ranking>) {
    let Some(ranking) = ranking else {
        if let Some(title) = document.title() {
            println!("# {}\n", title);
        }
        println!("{}", document.text());
        println!();
        for action in document.actions() {
            println!("{}", action);
        }
        return;
    };

    let keywords: Vec<String> = ranking
        .keywords
        .iter()
        .map(|(keyword, tier)| format!("{} ({})", keyword, tier))
        .collect();
    println!("Keywords: {}\n", keywords.join(", "));

    for fragment in &ranking.fragments {
        println!("[{:.4}] {}", fragment.relevance.total(), fragment.path);
        println!("{}\n", fragment.content);
    }
    for action in &ranking.actions {
        println!("{}", action);
    }
}
