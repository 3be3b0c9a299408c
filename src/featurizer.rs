// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! TF-IDF text featurization
//!
//! Text is lowercased and split on non-alphanumeric characters; word
//! n-grams up to `max_ngram` form the vocabulary. Vectors are sparse and
//! L2-normalised. Terms unseen during fitting are ignored.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Sparse feature vector sorted by feature index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub entries: Vec<(usize, f64)>,
}

impl SparseVector {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Dot product against a dense weight vector
    pub fn dot(&self, dense: &[f64]) -> f64 {
        self.entries
            .iter()
            .map(|&(idx, value)| dense.get(idx).copied().unwrap_or(0.0) * value)
            .sum()
    }

    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturizerOptions {
    /// Longest word n-gram (1 = unigrams only)
    pub max_ngram: usize,
    /// Terms seen in fewer documents are left out of the vocabulary
    pub min_document_frequency: usize,
}

impl Default for FeaturizerOptions {
    fn default() -> Self {
        Self {
            max_ngram: 2,
            min_document_frequency: 1,
        }
    }
}

/// Fitted TF-IDF vocabulary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextFeaturizer {
    options: FeaturizerOptions,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    n_documents: usize,
}

impl TextFeaturizer {
    /// Build the vocabulary and IDF weights from training documents.
    ///
    /// Feature indices follow the lexical order of the terms, so fitting the
    /// same documents always yields the same layout.
    pub fn fit<S: AsRef<str>>(documents: &[S], options: FeaturizerOptions) -> Self {
        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();

        for doc in documents {
            let unique: HashSet<String> = Self::terms(doc.as_ref(), options.max_ngram).into_iter().collect();
            for term in unique {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let n_documents = documents.len();
        let mut vocabulary = HashMap::new();
        let mut idf = Vec::new();

        for (term, df) in document_frequency {
            if df < options.min_document_frequency {
                continue;
            }
            // smoothed idf: ln((1 + N) / (1 + df)) + 1
            idf.push(((1.0 + n_documents as f64) / (1.0 + df as f64)).ln() + 1.0);
            vocabulary.insert(term, vocabulary.len());
        }

        tracing::debug!(
            "Fitted featurizer on {} documents, vocabulary size {}",
            n_documents,
            vocabulary.len()
        );

        Self {
            options,
            vocabulary,
            idf,
            n_documents,
        }
    }

    /// Number of features produced by [`transform`](Self::transform)
    pub fn dimension(&self) -> usize {
        self.idf.len()
    }

    pub fn n_documents(&self) -> usize {
        self.n_documents
    }

    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in Self::terms(text, self.options.max_ngram) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();
        entries.sort_by_key(|(idx, _)| *idx);

        let norm = entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, value) in &mut entries {
                *value /= norm;
            }
        }

        SparseVector { entries }
    }

    pub fn transform_batch<S: AsRef<str>>(&self, texts: &[S]) -> Vec<SparseVector> {
        texts.iter().map(|t| self.transform(t.as_ref())).collect()
    }

    fn tokenize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    }

    /// Word n-grams from 1 up to `max_ngram`, joined by a single space
    fn terms(text: &str, max_ngram: usize) -> Vec<String> {
        let tokens = Self::tokenize(text);
        let mut terms = Vec::with_capacity(tokens.len() * max_ngram.max(1));

        for n in 1..=max_ngram.max(1) {
            if tokens.len() < n {
                break;
            }
            terms.extend(tokens.windows(n).map(|w| w.join(" ")));
        }

        terms
    }
}
