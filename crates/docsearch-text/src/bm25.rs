//! BM25 Okapi ranking structure.
//!
//! `idf(t) = ln(N - n_t + 0.5) - ln(n_t + 0.5)`; terms whose idf comes out
//! negative (present in more than half the corpus) are floored at
//! `epsilon * mean(idf)`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_K1: f64 = 1.5;
pub const DEFAULT_B: f64 = 0.75;
pub const DEFAULT_EPSILON: f64 = 0.25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bm25Okapi {
    k1: f64,
    b: f64,
    epsilon: f64,
    avgdl: f64,
    doc_len: Vec<usize>,
    doc_freqs: Vec<HashMap<String, u32>>,
    idf: HashMap<String, f64>,
}

impl Bm25Okapi {
    pub fn new(corpus: &[Vec<String>]) -> Self {
        Self::with_params(corpus, DEFAULT_K1, DEFAULT_B, DEFAULT_EPSILON)
    }

    pub fn with_params(corpus: &[Vec<String>], k1: f64, b: f64, epsilon: f64) -> Self {
        let mut doc_len = Vec::with_capacity(corpus.len());
        let mut doc_freqs = Vec::with_capacity(corpus.len());
        let mut containing: HashMap<&str, usize> = HashMap::new();
        let mut total_len = 0usize;

        for doc in corpus {
            total_len += doc.len();
            doc_len.push(doc.len());
            let mut freqs: HashMap<String, u32> = HashMap::new();
            for term in doc {
                let tf = freqs.entry(term.clone()).or_insert(0);
                if *tf == 0 {
                    *containing.entry(term.as_str()).or_insert(0) += 1;
                }
                *tf += 1;
            }
            doc_freqs.push(freqs);
        }

        let n = corpus.len() as f64;
        let avgdl = if corpus.is_empty() { 0.0 } else { total_len as f64 / n };

        let mut idf = HashMap::with_capacity(containing.len());
        let mut idf_sum = 0.0;
        let mut negative = Vec::new();
        for (term, df) in &containing {
            let df = *df as f64;
            let value = (n - df + 0.5).ln() - (df + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(term.to_string());
            }
            idf.insert(term.to_string(), value);
        }
        if !idf.is_empty() {
            let eps = epsilon * idf_sum / idf.len() as f64;
            for term in negative {
                idf.insert(term, eps);
            }
        }

        Self { k1, b, epsilon, avgdl, doc_len, doc_freqs, idf }
    }

    /// Number of documents the structure was built over.
    pub fn corpus_size(&self) -> usize {
        self.doc_len.len()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.idf.get(term).copied()
    }

    /// Score every document against `query`. Repeated query terms count once
    /// per occurrence.
    pub fn get_scores(&self, query: &[String]) -> Vec<f64> {
        let mut scores = vec![0.0; self.corpus_size()];
        if self.avgdl <= 0.0 {
            return scores;
        }
        for term in query {
            let Some(idf) = self.idf.get(term) else { continue };
            for (i, freqs) in self.doc_freqs.iter().enumerate() {
                let tf = f64::from(freqs.get(term).copied().unwrap_or(0));
                if tf == 0.0 {
                    continue;
                }
                let norm = 1.0 - self.b + self.b * self.doc_len[i] as f64 / self.avgdl;
                scores[i] += idf * (tf * (self.k1 + 1.0)) / (tf + self.k1 * norm);
            }
        }
        scores
    }

    /// Internal arrays agree on the corpus size.
    pub fn is_consistent(&self) -> bool {
        self.doc_len.len() == self.doc_freqs.len()
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }
}
