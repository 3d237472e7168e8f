//! Bag-of-words cosine similarity over term-frequency vectors.
use std::collections::HashMap;

/// Common English words carrying no retrieval signal.
const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "again", "all", "also", "an", "and", "any", "are", "as", "at", "be",
    "been", "before", "being", "both", "but", "by", "can", "could", "do", "does", "during", "each",
    "for", "from", "further", "had", "has", "have", "he", "her", "here", "his", "how", "if", "in",
    "into", "is", "it", "its", "itself", "may", "more", "most", "much", "no", "nor", "not", "of",
    "off", "on", "once", "only", "or", "other", "our", "out", "over", "own", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "them", "then", "there",
    "these", "they", "this", "those", "through", "to", "too", "under", "until", "up", "very",
    "was", "we", "were", "what", "when", "where", "which", "while", "who", "why", "will", "with",
    "would", "you", "your",
];

/// Lowercased tokens of two or more word characters, stop words removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2 && !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermVector {
    counts: HashMap<String, f64>,
    norm: f64,
}

impl TermVector {
    pub fn from_text(text: &str) -> Self {
        let mut counts = HashMap::new();
        for token in tokenize(text) {
            *counts.entry(token).or_insert(0.0) += 1.0;
        }
        let norm = counts.values().map(|c| c * c).sum::<f64>().sqrt();
        Self { counts, norm }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Cosine similarity in [0, 1]; zero when either side has no terms.
    pub fn cosine(&self, other: &TermVector) -> f64 {
        if self.norm == 0.0 || other.norm == 0.0 {
            return 0.0;
        }
        let (small, large) = if self.counts.len() <= other.counts.len() {
            (self, other)
        } else {
            (other, self)
        };
        let dot: f64 = small
            .counts
            .iter()
            .filter_map(|(term, a)| large.counts.get(term).map(|b| a * b))
            .sum();
        dot / (self.norm * other.norm)
    }
}

/// Precomputed document vectors for a fixed corpus.
#[derive(Debug, Clone, Default)]
pub struct LexicalIndex {
    documents: Vec<TermVector>,
}

impl LexicalIndex {
    pub fn build<'a>(documents: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            documents: documents.into_iter().map(TermVector::from_text).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Similarity of `query` to every document, in corpus order.
    pub fn similarities(&self, query: &str) -> Vec<f64> {
        let query = TermVector::from_text(query);
        self.documents.iter().map(|doc| query.cosine(doc)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_drops_stop_words_and_short_tokens() {
        assert_eq!(
            tokenize("The very Mild redness, a high_glycemic diet!"),
            vec!["mild", "redness", "high_glycemic", "diet"]
        );
    }

    #[test]
    fn test_identical_text_has_similarity_one() {
        let a = TermVector::from_text("redness inflammation redness");
        let b = TermVector::from_text("inflammation redness redness");
        assert!((a.cosine(&b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_disjoint_and_empty() {
        let a = TermVector::from_text("redness");
        let b = TermVector::from_text("blackheads");
        assert_eq!(a.cosine(&b), 0.0);
        assert_eq!(a.cosine(&TermVector::from_text("the of")), 0.0);
    }

    #[test]
    fn test_index_orders_by_overlap() {
        let index = LexicalIndex::build(["calms redness and inflammation", "unclogs blackheads"]);
        let sims = index.similarities("redness");
        assert_eq!(sims.len(), 2);
        assert!(sims[0] > 0.0);
        assert_eq!(sims[1], 0.0);
    }
}
