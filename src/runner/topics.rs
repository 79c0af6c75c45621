use std::sync::Arc;

use crate::{
    corpus::term::Vocabulary,
    error::RunnerError,
    runner::capability::TopTerms,
    utils::math::{cosine_similarity, masked, top_k_indices},
};

/// Topic x term weight table shared by every runner variant
#[derive(Debug, Clone)]
pub struct TopicTermTable {
    vocabulary: Arc<Vocabulary>,
    /// one row per topic, one column per term id
    weights: Vec<Vec<f64>>,
}

impl TopicTermTable {
    pub fn new(vocabulary: Arc<Vocabulary>, weights: Vec<Vec<f64>>) -> Self {
        debug_assert!(weights.iter().all(|row| row.len() == vocabulary.len()));
        Self { vocabulary, weights }
    }

    #[inline]
    pub fn topic_count(&self) -> usize {
        self.weights.len()
    }

    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    pub fn weights(&self, topic_id: usize) -> Option<&[f64]> {
        self.weights.get(topic_id).map(Vec::as_slice)
    }

    pub fn top_terms(&self, topic_id: usize, n: usize) -> Result<TopTerms, RunnerError> {
        let row = self.weights.get(topic_id).ok_or(RunnerError::OutOfRange {
            topic_id,
            topic_count: self.topic_count(),
        })?;
        let (terms, scores) = top_k_indices(row, n)
            .into_iter()
            .filter_map(|id| self.vocabulary.term(id).map(|t| (t.to_string(), row[id])))
            .unzip();
        Ok(TopTerms {
            topic_id,
            terms,
            scores,
        })
    }

    /// Term ids of the `n` strongest terms of every topic
    pub fn top_term_ids(&self, n: usize) -> Vec<Vec<usize>> {
        self.weights.iter().map(|row| top_k_indices(row, n)).collect()
    }

    /// Cosine similarity between topics restricted to their top `n_terms` terms
    /// Weights are non-negative so every entry lands in `[0, 1]`.
    pub fn correlation(&self, n_terms: usize) -> Vec<Vec<f64>> {
        let k = self.topic_count();
        let limit = if n_terms == 0 { usize::MAX } else { n_terms };
        let truncated: Vec<Vec<f64>> = self
            .weights
            .iter()
            .map(|row| masked(row, &top_k_indices(row, limit)))
            .collect();
        let mut matrix = vec![vec![0.0; k]; k];
        for i in 0..k {
            matrix[i][i] = 1.0;
            for j in (i + 1)..k {
                let sim = cosine_similarity(&truncated[i], &truncated[j]).clamp(0.0, 1.0);
                matrix[i][j] = sim;
                matrix[j][i] = sim;
            }
        }
        matrix
    }
}
