//! Semantic Index
//!
//! A term-frequency-inverse-document-frequency vector space over event
//! searchable text: unigrams and bigrams, English stop-words removed,
//! vocabulary capped by corpus frequency. Fitted lazily once per event kind
//! and rebuilt whenever new events invalidate the cache. Queries are scored
//! by cosine similarity against every document vector.

use std::collections::HashMap;

/// Common English stop-words excluded from the vocabulary.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "but", "by", "for", "from", "had", "has",
    "have", "he", "her", "his", "i", "if", "in", "into", "is", "it", "its", "it's", "me", "my",
    "no", "not", "of", "on", "or", "our", "she", "so", "that", "the", "their", "them", "then",
    "there", "these", "they", "this", "to", "was", "we", "were", "what", "when", "where", "which",
    "who", "will", "with", "you", "your",
];

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Tokenizes text into unigrams plus adjacent-pair bigrams, lowercased,
/// stop-words removed.
fn tokenize(text: &str) -> Vec<String> {
    let words: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 1 && !is_stop_word(w))
        .map(str::to_string)
        .collect();

    let mut terms = Vec::with_capacity(words.len() * 2);
    for pair in words.windows(2) {
        terms.push(format!("{} {}", pair[0], pair[1]));
    }
    terms.extend(words);
    terms
}

/// Cosine similarity between two sparse vectors keyed by vocabulary index.
fn cosine_similarity(a: &HashMap<usize, f64>, b: &HashMap<usize, f64>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    // Iterate the smaller map for the dot product.
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(idx, va)| large.get(idx).map(|vb| va * vb))
        .sum();

    let norm_a: f64 = a.values().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b: f64 = b.values().map(|v| v * v).sum::<f64>().sqrt();
    let denom = norm_a * norm_b;
    if denom < 1e-12 {
        return 0.0;
    }
    dot / denom
}

/// Lazily-fitted TF-IDF index over one event kind's documents.
#[derive(Debug, Clone, Default)]
pub struct SemanticIndex {
    /// Term to vocabulary slot
    vocab: HashMap<String, usize>,
    /// Smoothed inverse document frequency per vocabulary slot
    idf: Vec<f64>,
    /// One sparse TF-IDF vector per fitted document
    doc_vectors: Vec<HashMap<usize, f64>>,
    /// Event id per fitted document
    doc_ids: Vec<u64>,
    fitted: bool,
}

impl SemanticIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidates the fitted space; the next search refits.
    pub fn mark_dirty(&mut self) {
        self.fitted = false;
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Fits the vector space over `(event_id, searchable_text)` documents.
    ///
    /// The vocabulary keeps the `vocabulary_cap` most frequent terms across
    /// the corpus. Degenerate corpora (no usable terms) leave the index
    /// unfitted, which callers treat as a recency-fallback signal.
    pub fn fit<'a, I>(&mut self, documents: I, vocabulary_cap: usize)
    where
        I: IntoIterator<Item = (u64, &'a str)>,
    {
        let tokenized: Vec<(u64, Vec<String>)> = documents
            .into_iter()
            .map(|(id, text)| (id, tokenize(text)))
            .collect();

        // Corpus-wide term counts drive vocabulary selection.
        let mut term_counts: HashMap<&str, usize> = HashMap::new();
        for (_, terms) in &tokenized {
            for term in terms {
                *term_counts.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(&str, usize)> = term_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(vocabulary_cap);

        self.vocab = ranked
            .iter()
            .enumerate()
            .map(|(idx, (term, _))| (term.to_string(), idx))
            .collect();

        if self.vocab.is_empty() {
            self.idf.clear();
            self.doc_vectors.clear();
            self.doc_ids.clear();
            self.fitted = false;
            return;
        }

        // Document frequency per vocabulary slot.
        let n_docs = tokenized.len();
        let mut doc_freq = vec![0usize; self.vocab.len()];
        for (_, terms) in &tokenized {
            let mut seen = vec![false; self.vocab.len()];
            for term in terms {
                if let Some(&idx) = self.vocab.get(term.as_str()) {
                    if !seen[idx] {
                        seen[idx] = true;
                        doc_freq[idx] += 1;
                    }
                }
            }
        }

        // Smoothed IDF, as in the usual formulation.
        self.idf = doc_freq
            .iter()
            .map(|&df| (((n_docs + 1) as f64) / ((df + 1) as f64)).ln() + 1.0)
            .collect();

        self.doc_ids = tokenized.iter().map(|(id, _)| *id).collect();
        self.doc_vectors = tokenized
            .iter()
            .map(|(_, terms)| self.vectorize(terms))
            .collect();
        self.fitted = true;
    }

    fn vectorize(&self, terms: &[String]) -> HashMap<usize, f64> {
        let mut tf: HashMap<usize, f64> = HashMap::new();
        for term in terms {
            if let Some(&idx) = self.vocab.get(term.as_str()) {
                *tf.entry(idx).or_insert(0.0) += 1.0;
            }
        }
        for (idx, value) in tf.iter_mut() {
            *value *= self.idf[*idx];
        }
        tf
    }

    /// Scores the query against every fitted document, keeping only scores
    /// strictly above `min_similarity`, sorted descending, truncated to
    /// `top_k`. Returns `(event_id, similarity)` pairs.
    pub fn search(&self, query: &str, top_k: usize, min_similarity: f64) -> Vec<(u64, f64)> {
        if !self.fitted {
            return Vec::new();
        }

        let query_vec = self.vectorize(&tokenize(query));
        let mut scored: Vec<(u64, f64)> = self
            .doc_ids
            .iter()
            .zip(self.doc_vectors.iter())
            .map(|(&id, doc)| (id, cosine_similarity(&query_vec, doc)))
            .filter(|(_, sim)| *sim > min_similarity)
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }
}
