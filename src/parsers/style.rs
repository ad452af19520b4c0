//! Embedded stylesheet index.
//!
//! `<style>` blocks are tokenized with `cssparser` into selector/declaration pairs. The
//! index only answers existence queries of the form "which selectors declare
//! `property: value`", which is all the noise classifier and the action extractor need.

use std::collections::HashSet;

use cssparser::{ParseError, Parser, ParserInput, Token};
use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};

use crate::error::Skip;

/// Grouping at-rules whose blocks contain further style rules
const NESTING_AT_RULES: [&str; 5] = ["media", "supports", "layer", "document", "container"];

/// Grouping at-rules nested deeper than this are ignored
const MAX_AT_RULE_DEPTH: usize = 32;

/// One `property: value` pair of a rule block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Lowercased property name
    pub property: String,
    /// Lowercased value with `!important` and redundant whitespace removed
    pub value: String,
    /// First top-level identifier token of the value, lowercased
    pub keyword: Option<String>,
}

impl Declaration {
    fn new(property: &str, raw_value: &str) -> Self {
        Self {
            property: property.trim().to_ascii_lowercase(),
            value: normalize_value(raw_value),
            keyword: first_identifier(raw_value),
        }
    }

    /// Whether the declaration sets `property` to `wanted`.
    ///
    /// Identifier values are compared against the first identifier token of the value,
    /// so `cursor: url(hand.cur), pointer` declares `pointer`. Other values compare the
    /// first value component, with zero lengths equal regardless of unit.
    pub fn declares(&self, property: &str, wanted: &str) -> bool {
        if !self.property.eq_ignore_ascii_case(property) {
            return false;
        }
        let wanted = normalize_value(wanted);
        if is_identifier(&wanted) {
            return self.keyword.as_deref() == Some(wanted.as_str());
        }
        match first_component(&self.value) {
            Some(component) => canonical(component) == canonical(&wanted),
            None => false,
        }
    }
}

/// A parsed style rule: serialized selector prelude plus its declarations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    pub selector: String,
    pub declarations: Vec<Declaration>,
}

/// Elements matched by the selectors of a query, plus the selectors that were skipped
#[derive(Debug, Default)]
pub struct SelectorMatches {
    pub nodes: Vec<NodeId>,
    pub skipped: Vec<Skip>,
}

/// Ordered, read-only collection of style rules of one document
#[derive(Debug, Clone, Default)]
pub struct StyleIndex {
    rules: Vec<StyleRule>,
}

impl StyleIndex {
    /// Parse a single stylesheet
    pub fn parse(css: &str) -> Self {
        let mut rules = Vec::new();
        parse_stylesheet(css, &mut rules);
        Self { rules }
    }

    /// Parse every `<style>` block of the document, in document order
    pub fn from_document(html: &Html) -> Self {
        let mut rules = Vec::new();
        let mut blocks = 0;
        for node in html.tree.root().descendants() {
            let Some(element) = ElementRef::wrap(node) else {
                continue;
            };
            if element.value().name() != "style" {
                continue;
            }
            let css: String = element.text().collect();
            parse_stylesheet(&css, &mut rules);
            blocks += 1;
        }
        ::log::debug!(
            "Parsed {} style rules from {} style blocks",
            rules.len(),
            blocks
        );
        Self { rules }
    }

    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Selector preludes of every rule declaring `property: value`
    pub fn selectors_declaring(&self, property: &str, value: &str) -> Vec<String> {
        let mut selectors = Vec::new();
        for rule in &self.rules {
            if rule
                .declarations
                .iter()
                .any(|declaration| declaration.declares(property, value))
            {
                ::log::trace!(
                    "Found `{}: {}` at rule `{}`",
                    property,
                    value,
                    rule.selector
                );
                selectors.push(rule.selector.clone());
            }
        }
        selectors
    }

    /// Elements of `html` matched by any selector declaring `property: value`.
    /// Selectors the matcher cannot handle are skipped one by one.
    pub fn elements_declaring(&self, html: &Html, property: &str, value: &str) -> SelectorMatches {
        let mut matches = SelectorMatches::default();
        let mut seen = HashSet::new();

        for prelude in self.selectors_declaring(property, value) {
            for part in split_selector_list(&prelude) {
                match compile_selector(part) {
                    Ok(selector) => {
                        for element in html.select(&selector) {
                            if seen.insert(element.id()) {
                                matches.nodes.push(element.id());
                            }
                        }
                    }
                    Err(skip) => {
                        ::log::trace!("Skipping selector: {}", skip);
                        matches.skipped.push(skip);
                    }
                }
            }
        }

        matches
    }
}

/// Compile one complex selector, reporting unsupported syntax as a skip
pub fn compile_selector(selector: &str) -> Result<Selector, Skip> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Err(Skip::UnsupportedSelector {
            selector: String::new(),
            reason: "empty selector".to_string(),
        });
    }
    Selector::parse(selector).map_err(|err| Skip::UnsupportedSelector {
        selector: selector.to_string(),
        reason: format!("{:?}", err),
    })
}

/// Split a selector list on top-level commas
pub fn split_selector_list(prelude: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (index, c) in prelude.char_indices() {
        match (quote, c) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(prelude[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(prelude[start..].trim());
    parts.into_iter().filter(|part| !part.is_empty()).collect()
}

fn parse_stylesheet(css: &str, rules: &mut Vec<StyleRule>) {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    parse_rule_list(&mut parser, rules, 0);
}

/// How the prelude of a rule ended
enum PreludeEnd {
    Block,
    Statement,
    Eof,
}

fn parse_rule_list(parser: &mut Parser<'_, '_>, rules: &mut Vec<StyleRule>, depth: usize) {
    loop {
        let mut start = parser.position();
        let mut block_start = start;
        let mut at_rule: Option<String> = None;
        let mut first = true;

        let end = loop {
            let before = parser.position();
            let token = match parser.next() {
                Ok(token) => token.clone(),
                Err(_) => break PreludeEnd::Eof,
            };
            match token {
                Token::CDO | Token::CDC if first => {
                    start = parser.position();
                    continue;
                }
                Token::AtKeyword(ref name) if first => {
                    at_rule = Some(name.to_ascii_lowercase());
                }
                Token::CurlyBracketBlock => {
                    block_start = before;
                    break PreludeEnd::Block;
                }
                Token::Semicolon if at_rule.is_some() => break PreludeEnd::Statement,
                _ => {}
            }
            first = false;
        };

        match end {
            PreludeEnd::Eof => {
                let rest = parser.slice_from(start).trim();
                if !rest.is_empty() {
                    ::log::trace!("Skipping style rule: {}", Skip::MalformedRule(rest.to_string()));
                }
                return;
            }
            PreludeEnd::Statement => continue,
            PreludeEnd::Block => {}
        }

        let prelude = parser.slice(start..block_start).trim().to_string();
        match at_rule {
            Some(name) if depth >= MAX_AT_RULE_DEPTH => {
                ::log::trace!("Ignoring @{} block nested {} deep", name, depth);
            }
            Some(name) if NESTING_AT_RULES.contains(&name.as_str()) => {
                let nested = parser.parse_nested_block(|block| {
                    let mut nested = Vec::new();
                    parse_rule_list(block, &mut nested, depth + 1);
                    Ok::<_, ParseError<'_, ()>>(nested)
                });
                rules.extend(nested.unwrap_or_default());
            }
            Some(name) => {
                ::log::trace!("Ignoring @{} block", name);
            }
            None if prelude.is_empty() => {
                ::log::trace!("Skipping style rule: {}", Skip::MalformedRule("{...}".to_string()));
            }
            None => {
                let declarations = parser
                    .parse_nested_block(|block| {
                        Ok::<_, ParseError<'_, ()>>(parse_declarations(block))
                    })
                    .unwrap_or_default();
                rules.push(StyleRule {
                    selector: prelude,
                    declarations,
                });
            }
        }
    }
}

fn parse_declarations(block: &mut Parser<'_, '_>) -> Vec<Declaration> {
    let mut declarations = Vec::new();

    loop {
        let token = match block.next() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        let Token::Ident(property) = token else {
            skip_declaration(block);
            continue;
        };
        match block.next() {
            Ok(Token::Colon) => {}
            _ => {
                skip_declaration(block);
                continue;
            }
        }

        let value_start = block.position();
        let value_end = loop {
            let before = block.position();
            match block.next_including_whitespace_and_comments() {
                Ok(Token::Semicolon) => break before,
                Ok(_) => {}
                Err(_) => break block.position(),
            }
        };
        declarations.push(Declaration::new(
            &property,
            block.slice(value_start..value_end),
        ));
    }

    declarations
}

fn skip_declaration(block: &mut Parser<'_, '_>) {
    while let Ok(token) = block.next() {
        if matches!(token, Token::Semicolon) {
            break;
        }
    }
}

fn normalize_value(raw: &str) -> String {
    let lowered = raw.to_ascii_lowercase();
    let without_priority = match lowered.find('!') {
        Some(index) if lowered[index + 1..].trim() == "important" => &lowered[..index],
        _ => lowered.as_str(),
    };
    without_priority
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace("( ", "(")
        .replace(" )", ")")
        .replace(", ", ",")
}

/// First identifier token at the top level of a value; function arguments and URLs are
/// skipped over
fn first_identifier(raw: &str) -> Option<String> {
    let mut input = ParserInput::new(raw);
    let mut parser = Parser::new(&mut input);
    while let Ok(token) = parser.next() {
        if let Token::Ident(ident) = token {
            return Some(ident.to_ascii_lowercase());
        }
    }
    None
}

/// Whether a normalized value is a plain CSS identifier such as `none` or `pointer`
fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    let starts_like_ident = match chars.next() {
        Some('-') => chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '-' || c == '_'),
        Some(c) => c.is_ascii_alphabetic() || c == '_',
        None => false,
    };
    starts_like_ident
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// First whitespace-separated component outside of parentheses
fn first_component(value: &str) -> Option<&str> {
    let mut depth = 0usize;
    for (index, c) in value.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ' ' if depth == 0 => return Some(&value[..index]),
            _ => {}
        }
    }
    if value.is_empty() { None } else { Some(value) }
}

/// Zero lengths compare equal regardless of unit (`0px` == `0em` == `0`); `0%` stays distinct
fn canonical(component: &str) -> String {
    let numeric_end = component
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || matches!(c, '.' | '+' | '-')))
        .map(|(index, _)| index)
        .unwrap_or(component.len());
    if numeric_end == 0 {
        return component.to_string();
    }
    let (number, unit) = component.split_at(numeric_end);
    match number.parse::<f64>() {
        Ok(value) if value == 0.0 && unit == "%" => "0%".to_string(),
        Ok(value) if value == 0.0 => "0".to_string(),
        _ => component.to_string(),
    }
}
