use crate::domain::news::NewsArticle;

pub const MAX_RELEVANT: usize = 10;

pub const NO_RELEVANT_NEWS: &str = "No recent relevant news found.";

// Matched case-insensitively as whole words.
const CORPORATE_SUFFIXES: &[&str] = &["corporation", "corp", "inc.", "inc", "ltd"];

pub fn core_name(display_name: &str) -> String {
    display_name
        .replace(',', " ")
        .split_whitespace()
        .filter(|word| {
            !CORPORATE_SUFFIXES
                .iter()
                .any(|suffix| word.eq_ignore_ascii_case(suffix))
        })
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .trim()
        .to_string()
}

#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    ticker: String,
    core_name: String,
}

impl RelevanceFilter {
    pub fn new(ticker: &str, display_name: &str) -> Self {
        Self {
            ticker: ticker.trim().to_lowercase(),
            core_name: core_name(display_name),
        }
    }

    pub fn core_name(&self) -> &str {
        &self.core_name
    }

    pub fn is_relevant(&self, headline: &str) -> bool {
        let headline = headline.to_lowercase();
        let contains = |term: &str| !term.is_empty() && headline.contains(term);
        contains(&self.ticker) || contains(&self.core_name)
    }

    pub fn select<'a>(&self, candidates: &'a [NewsArticle]) -> Vec<&'a NewsArticle> {
        candidates
            .iter()
            .filter(|article| self.is_relevant(&article.headline))
            .take(MAX_RELEVANT)
            .collect()
    }
}

pub fn format_digest(articles: &[&NewsArticle]) -> String {
    if articles.is_empty() {
        return NO_RELEVANT_NEWS.to_string();
    }

    articles
        .iter()
        .enumerate()
        .map(|(i, article)| {
            format!(
                "{}. {}\nSource: {}\nSummary: {}",
                i + 1,
                article.headline.trim(),
                article.source.trim(),
                article.summary.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
