use scraper::Html;

use crate::parsers::html::Document;
use crate::parsers::text::MAX_RENDER_DEPTH;
use crate::parsers::tree::NodeFlag;
use crate::parsers::{process, process_with_flags};
use crate::results::ActionKind;

const PROFILE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Alex Doe - Profile</title>
  <style>
    .promo { display: none }
    @media (max-width: 600px) { .sidebar { visibility: hidden } }
    .tile { cursor: pointer }
    .tile:hover { opacity: 0 }
  </style>
  <script>window.track = true;</script>
</head>
<body>
  <!-- navigation -->
  <nav><a href="/">Home</a> <a href="/people">People</a></nav>
  <div class="promo"><a href="/buy">Buy now</a></div>
  <main>
    <article>
      <h1>Alex <span class="muted">Doe</span></h1>
      <p>Alex studied at <a href="/bard">Bard College</a>.</p>
      <table>
        <caption>Career</caption>
        <tr><th>Year</th><th>Role</th></tr>
        <tr><td>2010</td><td>Engineer</td></tr>
      </table>
      <ul><li>Chess</li><li>Sailing</li></ul>
    </article>
    <div class="tile">Open gallery</div>
    <form><label for="q">Search people</label><input id="q" type="search"><button type="submit">Go</button></form>
  </main>
  <aside class="sidebar"><p>Related</p></aside>
  <footer aria-hidden="true">Copyright</footer>
</body>
</html>"#;

#[test]
fn test_no_noise_survives() {
    let mut html = Html::parse_document(PROFILE_PAGE);
    let (flags, _) = process(&mut html, None);

    for node in html.tree.root().descendants() {
        assert!(!flags.is_noise(node.id()));
    }
    let serialized = html.html();
    assert!(!serialized.contains("Buy now"));
    assert!(!serialized.contains("Related"));
    assert!(!serialized.contains("window.track"));
    assert!(!serialized.contains("navigation"));
}

#[test]
fn test_actions_are_extracted_with_source_paths() {
    let mut html = Html::parse_document(PROFILE_PAGE);
    let base = url::Url::parse("https://example.com/people/alex").unwrap();
    let (_, actions) = process(&mut html, Some(&base));

    let summary: Vec<(ActionKind, &str)> = actions
        .iter()
        .map(|action| (action.kind, action.content.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (ActionKind::Input, "Search people"),
            (ActionKind::Button, "Go"),
            (ActionKind::Link, "Home"),
            (ActionKind::Link, "People"),
            (ActionKind::Link, "Bard College"),
            (ActionKind::Link, "Open gallery"),
        ]
    );
    assert_eq!(
        actions[4].source_path.as_str(),
        "/html/body/main/article/p/a"
    );
    assert_eq!(
        actions[4].details.get("href").map(String::as_str),
        Some("https://example.com/bard")
    );
    assert!(actions.iter().all(|action| action.id.is_none()));
}

#[test]
fn test_tables_and_lists_become_simplified_leaves() {
    let mut html = Html::parse_document(PROFILE_PAGE);
    let (flags, _) = process(&mut html, None);

    let serialized = html.html();
    assert!(serialized.contains("<table>[table: Career]\nYear | Role\n---\n2010 | Engineer</table>"));
    assert!(serialized.contains("<ul>- Chess\n- Sailing</ul>"));

    let simplified = html
        .tree
        .root()
        .descendants()
        .filter(|node| flags.get(node.id()) == Some(NodeFlag::Simplified))
        .count();
    assert_eq!(simplified, 2);
}

#[test]
fn test_pipeline_is_idempotent() {
    let mut html = Html::parse_document(PROFILE_PAGE);
    let (flags, _) = process(&mut html, None);
    let once = html.html();
    let flags_once = flags.clone();

    let (flags, actions) = process_with_flags(&mut html, None, flags);
    assert_eq!(html.html(), once);
    assert_eq!(flags, flags_once);
    assert!(actions.iter().all(|action| action.path.is_some()));
}

#[test]
fn test_malformed_markup_does_not_abort() {
    let mut html = Html::parse_document(
        "<style>.a { display: none } .b:nth-child(  { color: red } ::selection { }</style><div><p>Still <b>here</p><td>stray cell</div>",
    );
    let (_, _) = process(&mut html, None);
    let serialized = html.html();
    assert!(serialized.contains("Still here"));
    assert!(serialized.contains("stray cell"));
}

#[test]
fn test_deeply_nested_markup_is_processed() {
    let page = format!("{} end", "<div>x <b>y</b>".repeat(20_000));
    let document = Document::parse("https://example.com", &page, None);

    let text = document.text();
    assert!(text.starts_with("- x y"));
    assert!(text.ends_with("x y end"));
    assert!(text.lines().count() <= MAX_RENDER_DEPTH + 1);
}
