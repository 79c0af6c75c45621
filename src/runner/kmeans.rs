use std::sync::Arc;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use crate::{
    corpus::{term::EncodedCorpus, tfidf::tfidf_matrix, DocumentId},
    error::RunnerError,
    model::{Algorithm, ModelParameters},
    runner::{
        capability::{CapabilitySet, DocumentTopics, RunnerVariant, TopTerms, TopicRunner},
        topics::TopicTermTable,
    },
    utils::math::{cosine_similarity, normalize_l2},
};

/// Spherical k-means runner
///
/// Topics are cluster centroids of L2-normalized TF-IDF vectors.
/// A document's distribution is its cosine similarity to every centroid, so
/// it does not sum to 1.
#[derive(Debug, Clone)]
pub struct KMeansRunner {
    table: TopicTermTable,
    /// document x topic cosine similarity
    similarity: Vec<Vec<f64>>,
}

impl RunnerVariant for KMeansRunner {
    const KIND: Algorithm = Algorithm::KMeans;
    const CAPABILITIES: CapabilitySet = Algorithm::KMeans.capabilities();
}

impl KMeansRunner {
    pub fn train(corpus: &EncodedCorpus, parameters: &ModelParameters) -> Self {
        let mut x = tfidf_matrix(corpus);
        x.par_iter_mut().for_each(|row| normalize_l2(row));
        let k = parameters.topic_count;

        let mut order: Vec<usize> = (0..x.len()).collect();
        order.shuffle(&mut StdRng::seed_from_u64(parameters.seed));
        let mut centroids = seed_centroids(&x, &order, k, corpus.vocabulary.len());

        let mut assignment: Vec<usize> = vec![usize::MAX; x.len()];
        for round in 0..parameters.iterations {
            let next: Vec<usize> = x.par_iter().map(|row| nearest(row, &centroids)).collect();
            if next == assignment {
                debug!(round, "k-means converged");
                break;
            }
            assignment = next;

            for (t, centroid) in centroids.iter_mut().enumerate() {
                let mut sum = vec![0.0; corpus.vocabulary.len()];
                let mut members = 0;
                for (row, _) in x.iter().zip(&assignment).filter(|(_, a)| **a == t) {
                    sum.iter_mut().zip(row).for_each(|(s, v)| *s += v);
                    members += 1;
                }
                // empty clusters keep their previous centroid
                if members > 0 {
                    normalize_l2(&mut sum);
                    *centroid = sum;
                }
            }
        }

        let similarity = x
            .par_iter()
            .map(|row| {
                centroids
                    .iter()
                    .map(|c| cosine_similarity(row, c).clamp(0.0, 1.0))
                    .collect()
            })
            .collect();
        Self {
            table: TopicTermTable::new(Arc::new(corpus.vocabulary.clone()), centroids),
            similarity,
        }
    }

    pub fn table(&self) -> &TopicTermTable {
        &self.table
    }
}

/// Farthest-first seeding
/// Starts from the first document of `order`, then repeatedly takes the document
/// least similar to every chosen seed. Missing seeds are zero vectors.
fn seed_centroids(x: &[Vec<f64>], order: &[usize], k: usize, dim: usize) -> Vec<Vec<f64>> {
    let mut chosen: Vec<usize> = Vec::with_capacity(k);
    if let Some(&first) = order.first() {
        chosen.push(first);
    }
    while chosen.len() < k {
        let closeness = |d: usize| {
            chosen
                .iter()
                .map(|&c| cosine_similarity(&x[d], &x[c]))
                .fold(f64::NEG_INFINITY, f64::max)
        };
        let pick = order
            .iter()
            .copied()
            .filter(|d| !chosen.contains(d))
            .min_by(|&a, &b| closeness(a).total_cmp(&closeness(b)));
        match pick {
            Some(d) => chosen.push(d),
            None => break,
        }
    }
    let mut centroids: Vec<Vec<f64>> = chosen.iter().map(|&d| x[d].clone()).collect();
    centroids.resize(k, vec![0.0; dim]);
    centroids
}

/// Index of the most similar centroid, first wins on ties
fn nearest(row: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_sim = f64::NEG_INFINITY;
    for (t, c) in centroids.iter().enumerate() {
        let sim = cosine_similarity(row, c);
        if sim > best_sim {
            best = t;
            best_sim = sim;
        }
    }
    best
}

impl TopicRunner for KMeansRunner {
    fn topic_count(&self) -> usize {
        self.table.topic_count()
    }

    fn topic_top_terms(&self, topic_id: usize, n: usize) -> Result<TopTerms, RunnerError> {
        self.table.top_terms(topic_id, n)
    }
}

impl DocumentTopics for KMeansRunner {
    fn document_count(&self) -> usize {
        self.similarity.len()
    }

    fn document_topic_distribution(
        &self,
        doc: DocumentId,
        min_probability: f64,
    ) -> Result<Vec<(usize, f64)>, RunnerError> {
        let row = self.similarity.get(doc.0).ok_or(RunnerError::UnknownDocument {
            document: doc.0,
            document_count: self.similarity.len(),
        })?;
        Ok(row
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, p)| *p >= min_probability)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clusters_follow_vocabulary_blocks() {
        let docs: Vec<Vec<&str>> = vec![
            vec!["rust", "cargo", "crate"],
            vec!["rust", "cargo", "borrow"],
            vec!["soup", "onion", "recipe"],
            vec!["soup", "onion", "garlic"],
        ];
        let corpus = EncodedCorpus::encode(&docs);
        let params = ModelParameters {
            algorithm: Algorithm::KMeans,
            topic_count: 2,
            iterations: 20,
            ..ModelParameters::default()
        };
        let r = KMeansRunner::train(&corpus, &params);
        assert_eq!(r.topic_count(), 2);
        assert_eq!(r.document_count(), 4);

        let assigned = |d: usize| {
            r.document_topic_distribution(DocumentId(d), 0.0)
                .unwrap()
                .into_iter()
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(t, _)| t)
                .unwrap()
        };
        assert_eq!(assigned(0), assigned(1));
        assert_eq!(assigned(2), assigned(3));
        assert_ne!(assigned(0), assigned(2));

        // similarities are not a probability distribution
        let dist = r.document_topic_distribution(DocumentId(0), 0.0).unwrap();
        assert!(dist.iter().all(|(_, p)| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn more_topics_than_documents() {
        let docs: Vec<Vec<&str>> = vec![vec!["alpha", "beta"]];
        let corpus = EncodedCorpus::encode(&docs);
        let params = ModelParameters {
            algorithm: Algorithm::KMeans,
            topic_count: 3,
            ..ModelParameters::default()
        };
        let r = KMeansRunner::train(&corpus, &params);
        assert_eq!(r.topic_count(), 3);
        assert_eq!(r.topic_top_terms(0, 5).unwrap().len(), 2);
        // unseeded clusters have no associated terms
        assert!(r.topic_top_terms(2, 5).unwrap().is_empty());
    }
}
