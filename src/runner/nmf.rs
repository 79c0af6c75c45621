use std::sync::Arc;

use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use crate::{
    corpus::{term::EncodedCorpus, tfidf::tfidf_matrix, DocumentId},
    error::RunnerError,
    model::{Algorithm, ModelParameters},
    runner::{
        capability::{
            CapabilitySet, CorrelationMatrix, DocumentTopics, RunnerVariant, TopTerms,
            TopicRunner,
        },
        topics::TopicTermTable,
    },
    utils::math::normalize_l1,
};

const EPS: f64 = 1e-9;

/// NMF runner
/// Factorizes the TF-IDF matrix X ≈ W·H with multiplicative updates.
#[derive(Debug, Clone)]
pub struct NmfRunner {
    /// H, topic x term
    table: TopicTermTable,
    /// W, document x topic
    w: Vec<Vec<f64>>,
}

impl RunnerVariant for NmfRunner {
    const KIND: Algorithm = Algorithm::Nmf;
    const CAPABILITIES: CapabilitySet = Algorithm::Nmf.capabilities();
}

impl NmfRunner {
    pub fn train(corpus: &EncodedCorpus, parameters: &ModelParameters) -> Self {
        let x = tfidf_matrix(corpus);
        let (d, v, k) = (x.len(), corpus.vocabulary.len(), parameters.topic_count);
        let mut rng = StdRng::seed_from_u64(parameters.seed);
        let mut w: Vec<Vec<f64>> = (0..d)
            .map(|_| (0..k).map(|_| rng.gen_range(0.01..1.0)).collect())
            .collect();
        let mut h: Vec<Vec<f64>> = (0..k)
            .map(|_| (0..v).map(|_| rng.gen_range(0.01..1.0)).collect())
            .collect();

        for _ in 0..parameters.iterations {
            // H <- H * (WᵀX) / (WᵀWH)
            let wtx: Vec<Vec<f64>> = (0..k)
                .into_par_iter()
                .map(|t| {
                    (0..v)
                        .map(|j| (0..d).map(|i| w[i][t] * x[i][j]).sum())
                        .collect()
                })
                .collect();
            let wtw = gram_cols(&w, k);
            for t in 0..k {
                for j in 0..v {
                    let denom: f64 = (0..k).map(|l| wtw[t][l] * h[l][j]).sum::<f64>() + EPS;
                    h[t][j] *= wtx[t][j] / denom;
                }
            }

            // W <- W * (XHᵀ) / (WHHᵀ)
            let hht = gram_rows(&h);
            w.par_iter_mut().zip(x.par_iter()).for_each(|(w_row, x_row)| {
                let updated: Vec<f64> = (0..k)
                    .map(|t| {
                        let xht: f64 = x_row.iter().zip(h[t].iter()).map(|(a, b)| a * b).sum();
                        let denom: f64 =
                            (0..k).map(|l| w_row[l] * hht[l][t]).sum::<f64>() + EPS;
                        w_row[t] * xht / denom
                    })
                    .collect();
                *w_row = updated;
            });
        }
        debug!(topics = k, documents = d, "nmf factorization finished");

        Self {
            table: TopicTermTable::new(Arc::new(corpus.vocabulary.clone()), h),
            w,
        }
    }

    pub fn table(&self) -> &TopicTermTable {
        &self.table
    }
}

/// WᵀW for a row-major D x K matrix
fn gram_cols(m: &[Vec<f64>], k: usize) -> Vec<Vec<f64>> {
    let mut g = vec![vec![0.0; k]; k];
    for row in m {
        for a in 0..k {
            for b in 0..k {
                g[a][b] += row[a] * row[b];
            }
        }
    }
    g
}

/// HHᵀ for a row-major K x V matrix
fn gram_rows(m: &[Vec<f64>]) -> Vec<Vec<f64>> {
    m.iter()
        .map(|a| {
            m.iter()
                .map(|b| a.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
                .collect()
        })
        .collect()
}

impl TopicRunner for NmfRunner {
    fn topic_count(&self) -> usize {
        self.table.topic_count()
    }

    fn topic_top_terms(&self, topic_id: usize, n: usize) -> Result<TopTerms, RunnerError> {
        self.table.top_terms(topic_id, n)
    }
}

impl DocumentTopics for NmfRunner {
    fn document_count(&self) -> usize {
        self.w.len()
    }

    /// W row scaled to sum 1; documents without weight report zeros
    fn document_topic_distribution(
        &self,
        doc: DocumentId,
        min_probability: f64,
    ) -> Result<Vec<(usize, f64)>, RunnerError> {
        let mut row = self
            .w
            .get(doc.0)
            .ok_or(RunnerError::UnknownDocument {
                document: doc.0,
                document_count: self.w.len(),
            })?
            .clone();
        normalize_l1(&mut row);
        Ok(row
            .into_iter()
            .enumerate()
            .filter(|(_, p)| *p >= min_probability)
            .collect())
    }
}

impl CorrelationMatrix for NmfRunner {
    fn correlation_matrix(&self, n_terms: usize) -> Vec<Vec<f64>> {
        self.table.correlation(n_terms)
    }
}
