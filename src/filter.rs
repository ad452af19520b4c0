use regex::Regex;

use crate::results::Relevancy;

/// Keywords of one relevance tier compiled into a single match pattern
#[derive(Debug, Clone)]
pub struct KeywordGroup {
    tier: Relevancy,
    keywords: Vec<String>,
    regex: Regex,
    /// Length in characters of the longest keyword of the group
    longest: usize,
}

impl KeywordGroup {
    /// Compile a group; returns `None` when no keyword is usable
    pub fn new(tier: Relevancy, keywords: Vec<String>) -> Result<Option<Self>, regex::Error> {
        let alternatives: Vec<String> = keywords
            .iter()
            .filter_map(|keyword| keyword_pattern(keyword))
            .collect();
        if alternatives.is_empty() {
            return Ok(None);
        }

        let regex = Regex::new(&format!("(?i)(?:{})", alternatives.join("|")))?;
        let longest = keywords
            .iter()
            .map(|keyword| keyword.trim().chars().count())
            .max()
            .unwrap_or(0);

        Ok(Some(Self {
            tier,
            keywords,
            regex,
            longest,
        }))
    }

    pub fn tier(&self) -> Relevancy {
        self.tier
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn longest(&self) -> usize {
        self.longest
    }

    /// Whether any keyword occurs in the text as a whole word, case-insensitively
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Whole-word, whitespace-tolerant pattern for one keyword. `\b` is only placed on an
/// edge where the keyword itself starts or ends with a word character.
pub fn keyword_pattern(keyword: &str) -> Option<String> {
    let words: Vec<String> = keyword.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return None;
    }

    let trimmed = keyword.trim();
    let is_word_char = |c: char| c.is_alphanumeric() || c == '_';
    let lead = if trimmed.chars().next().is_some_and(is_word_char) {
        r"\b"
    } else {
        ""
    };
    let tail = if trimmed.chars().last().is_some_and(is_word_char) {
        r"\b"
    } else {
        ""
    };

    Some(format!("{}{}{}", lead, words.join(r"\s+"), tail))
}

/// Tiered keyword groups, most relevant tier first
#[derive(Debug, Clone)]
pub struct KeywordFilter {
    keywords: Vec<(String, Relevancy)>,
    groups: Vec<KeywordGroup>,
}

impl KeywordFilter {
    /// Group the keywords by tier and compile one pattern per non-empty tier
    pub fn new(keywords: &[(String, Relevancy)]) -> Result<Self, regex::Error> {
        let mut groups = Vec::new();
        for tier in Relevancy::DESCENDING {
            let members: Vec<String> = keywords
                .iter()
                .filter(|(_, relevancy)| *relevancy == tier)
                .map(|(keyword, _)| keyword.clone())
                .collect();
            if let Some(group) = KeywordGroup::new(tier, members)? {
                groups.push(group);
            }
        }

        Ok(Self {
            keywords: keywords.to_vec(),
            groups,
        })
    }

    pub fn groups(&self) -> &[KeywordGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Tier of the first keyword, in descending tier order, contained in the text
    /// (case-insensitive substring)
    pub fn first_contained(&self, text: &str) -> Option<Relevancy> {
        let text = text.to_lowercase();
        for tier in Relevancy::DESCENDING {
            let contained = self
                .keywords
                .iter()
                .filter(|(_, relevancy)| *relevancy == tier)
                .any(|(keyword, _)| {
                    let keyword = keyword.trim().to_lowercase();
                    !keyword.is_empty() && text.contains(&keyword)
                });
            if contained {
                return Some(tier);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(pairs: &[(&str, Relevancy)]) -> Vec<(String, Relevancy)> {
        pairs
            .iter()
            .map(|(keyword, tier)| (keyword.to_string(), *tier))
            .collect()
    }

    #[test]
    fn test_groups_are_ordered_by_tier() {
        let filter = KeywordFilter::new(&keywords(&[
            ("study", Relevancy::High),
            ("Alex", Relevancy::Highest),
            ("learn", Relevancy::Low),
            ("educated at", Relevancy::Highest),
        ]))
        .unwrap();

        let tiers: Vec<Relevancy> = filter.groups().iter().map(|group| group.tier()).collect();
        assert_eq!(
            tiers,
            vec![Relevancy::Highest, Relevancy::High, Relevancy::Low]
        );
        assert_eq!(filter.groups()[0].longest(), 11);
    }

    #[test]
    fn test_whole_word_case_insensitive_match() {
        let group = KeywordGroup::new(
            Relevancy::Highest,
            vec!["studied at".to_string(), "C++".to_string()],
        )
        .unwrap()
        .unwrap();

        assert!(group.is_match("Alex STUDIED\n  at Bard"));
        assert!(!group.is_match("Alex studied atomic physics"));
        assert!(group.is_match("writes C++ daily"));
        assert!(!group.is_match("restudied at"));
    }

    #[test]
    fn test_keyword_pattern_escapes() {
        assert_eq!(keyword_pattern("a.b c"), Some(r"\ba\.b\s+c\b".to_string()));
        assert_eq!(keyword_pattern("(x)"), Some(r"\(x\)".to_string()));
        assert_eq!(keyword_pattern("   "), None);
    }

    #[test]
    fn test_first_contained_prefers_higher_tiers() {
        let filter = KeywordFilter::new(&keywords(&[
            ("search", Relevancy::Low),
            ("people", Relevancy::High),
        ]))
        .unwrap();
        assert_eq!(filter.first_contained("Search People"), Some(Relevancy::High));
        assert_eq!(filter.first_contained("Research"), Some(Relevancy::Low));
        assert_eq!(filter.first_contained("About"), None);
    }

    #[test]
    fn test_empty_groups_are_skipped() {
        let filter = KeywordFilter::new(&keywords(&[(" ", Relevancy::High)])).unwrap();
        assert!(filter.is_empty());
    }
}
