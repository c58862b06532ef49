//! Keyword heuristics for category, sentiment and keyword extraction.

use std::collections::HashMap;

use nd_core::Sentiment;

pub const DEFAULT_CATEGORY: &str = "general";

/// First category with a matching term wins, so order matters.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("politics", &["government", "election", "president", "minister", "parliament", "vote", "political"]),
    ("technology", &["tech", "computer", "software", "internet", "digital", "ai", "artificial intelligence"]),
    ("business", &["economy", "market", "stock", "trade", "company", "financial", "investment"]),
    ("health", &["covid", "virus", "disease", "medical", "hospital", "doctor", "healthcare", "health"]),
    ("entertainment", &["movie", "film", "music", "celebrity", "actor", "actress", "concert"]),
    ("sports", &["football", "soccer", "basketball", "tournament", "championship", "olympic", "player"]),
    ("science", &["research", "scientist", "study", "discovery", "space", "nasa", "physics", "biology"]),
    ("environment", &["climate", "pollution", "environmental", "green", "sustainability", "conservation"]),
];

const POSITIVE_WORDS: &[&str] = &["good", "great", "excellent", "positive", "success", "happy", "win", "breakthrough"];
const NEGATIVE_WORDS: &[&str] = &["bad", "terrible", "negative", "failure", "sad", "lose", "crisis", "disaster", "death"];

const STOPWORDS: &[&str] = &[
    "a", "about", "after", "again", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been", "before",
    "but", "by", "can", "could", "did", "do", "does", "for", "from", "had", "has", "have", "he", "her", "his",
    "how", "if", "in", "into", "is", "it", "its", "more", "most", "new", "no", "not", "of", "on", "one", "or",
    "other", "our", "out", "over", "said", "says", "she", "so", "some", "than", "that", "the", "their", "them",
    "then", "there", "these", "they", "this", "those", "to", "two", "up", "was", "we", "were", "what", "when",
    "where", "which", "while", "who", "will", "with", "would", "year", "years", "you",
];

/// Lowercase alphanumeric words of `text`.
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Multi-word terms match as phrases, single terms as whole words, so "ai"
/// does not fire on "said".
fn contains_term(words: &[String], joined: &str, term: &str) -> bool {
    if term.contains(' ') {
        joined.contains(term)
    } else {
        words.iter().any(|w| w == term)
    }
}

pub fn detect_category(title: &str, text: &str) -> &'static str {
    let words = words(&format!("{} {}", title, text));
    let joined = words.join(" ");

    CATEGORIES
        .iter()
        .find(|(_, terms)| terms.iter().any(|term| contains_term(&words, &joined, term)))
        .map_or(DEFAULT_CATEGORY, |(category, _)| *category)
}

pub fn analyze_sentiment(text: &str) -> Sentiment {
    let words = words(text);
    let count = |list: &[&str]| words.iter().filter(|w| list.contains(&w.as_str())).count();

    let positive = count(POSITIVE_WORDS);
    let negative = count(NEGATIVE_WORDS);
    if positive > negative {
        Sentiment::Positive
    } else if negative > positive {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// The `limit` most frequent content words, ties broken by first appearance.
pub fn extract_keywords(text: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, word) in words(text).into_iter().enumerate() {
        if word.chars().count() < 3 || word.chars().all(|c| c.is_ascii_digit()) || STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        counts.entry(word).or_insert((0, position)).0 += 1;
    }

    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|(_, (a_count, a_pos)), (_, (b_count, b_pos))| b_count.cmp(a_count).then(a_pos.cmp(b_pos)));
    ranked.into_iter().take(limit).map(|(word, _)| word).collect()
}
