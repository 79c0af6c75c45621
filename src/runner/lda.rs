use std::sync::Arc;

use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::debug;

use crate::{
    corpus::{term::EncodedCorpus, DocumentId},
    error::RunnerError,
    model::{Algorithm, ModelParameters},
    runner::{
        capability::{
            CapabilitySet, CorrelationMatrix, DocumentTopics, RunnerVariant, TopTerms,
            TopicCoherence, TopicRunner,
        },
        topics::TopicTermTable,
    },
};

/// Terms per topic used for coherence scoring
pub const COHERENCE_TOP_TERMS: usize = 10;

/// LDA runner
/// Trained by collapsed Gibbs sampling; keeps the encoded corpus for coherence scoring.
#[derive(Debug, Clone)]
pub struct LdaRunner {
    table: TopicTermTable,
    /// document x topic
    theta: Vec<Vec<f64>>,
    corpus: Arc<EncodedCorpus>,
    parameters: ModelParameters,
}

impl RunnerVariant for LdaRunner {
    const KIND: Algorithm = Algorithm::Lda;
    const CAPABILITIES: CapabilitySet = Algorithm::Lda.capabilities();
}

/// Result of one sampling run
struct GibbsEstimate {
    /// topic x term
    phi: Vec<Vec<f64>>,
    /// document x topic
    theta: Vec<Vec<f64>>,
}

impl LdaRunner {
    pub fn train(corpus: Arc<EncodedCorpus>, parameters: &ModelParameters) -> Self {
        let estimate = gibbs(&corpus, parameters.topic_count, parameters);
        debug!(
            topics = parameters.topic_count,
            documents = corpus.doc_num(),
            "lda sampling finished"
        );
        Self {
            table: TopicTermTable::new(Arc::new(corpus.vocabulary.clone()), estimate.phi),
            theta: estimate.theta,
            corpus,
            parameters: parameters.clone(),
        }
    }

    pub fn table(&self) -> &TopicTermTable {
        &self.table
    }
}

/// Collapsed Gibbs sampler
fn gibbs(corpus: &EncodedCorpus, k: usize, params: &ModelParameters) -> GibbsEstimate {
    let v = corpus.vocabulary.len();
    let mut rng = StdRng::seed_from_u64(params.seed);

    let mut ndk = vec![vec![0_u32; k]; corpus.doc_num()];
    let mut nkw = vec![vec![0_u32; v]; k];
    let mut nk = vec![0_u32; k];
    let mut z: Vec<Vec<usize>> = corpus
        .documents
        .iter()
        .enumerate()
        .map(|(d, doc)| {
            doc.iter()
                .map(|&w| {
                    let t = rng.gen_range(0..k);
                    ndk[d][t] += 1;
                    nkw[t][w] += 1;
                    nk[t] += 1;
                    t
                })
                .collect()
        })
        .collect();

    let v_beta = v as f64 * params.beta;
    let mut p = vec![0.0_f64; k];
    for _ in 0..params.iterations {
        for (d, doc) in corpus.documents.iter().enumerate() {
            for (i, &w) in doc.iter().enumerate() {
                let old = z[d][i];
                ndk[d][old] -= 1;
                nkw[old][w] -= 1;
                nk[old] -= 1;

                let mut total = 0.0;
                for t in 0..k {
                    total += (ndk[d][t] as f64 + params.alpha) * (nkw[t][w] as f64 + params.beta)
                        / (nk[t] as f64 + v_beta);
                    p[t] = total;
                }
                let u = rng.gen::<f64>() * total;
                let new = p.iter().position(|&c| u < c).unwrap_or(k - 1);

                z[d][i] = new;
                ndk[d][new] += 1;
                nkw[new][w] += 1;
                nk[new] += 1;
            }
        }
    }

    let phi = (0..k)
        .map(|t| {
            (0..v)
                .map(|w| (nkw[t][w] as f64 + params.beta) / (nk[t] as f64 + v_beta))
                .collect()
        })
        .collect();
    let k_alpha = k as f64 * params.alpha;
    let theta = corpus
        .documents
        .iter()
        .enumerate()
        .map(|(d, doc)| {
            (0..k)
                .map(|t| (ndk[d][t] as f64 + params.alpha) / (doc.len() as f64 + k_alpha))
                .collect()
        })
        .collect();
    GibbsEstimate { phi, theta }
}

/// UMass coherence averaged over topics
///
/// For each topic with ranked terms w_1..w_M:
/// Σ_{m=2..M} Σ_{l<m} ln((D(w_m, w_l) + 1) / D(w_l))
pub fn umass_coherence(corpus: &EncodedCorpus, top_ids: &[Vec<usize>]) -> f64 {
    if top_ids.is_empty() {
        return 0.0;
    }
    // posting lists of sorted document indices
    let mut postings: Vec<Vec<usize>> = vec![Vec::new(); corpus.vocabulary.len()];
    for (d, doc) in corpus.documents.iter().enumerate() {
        for &w in doc {
            if postings[w].last() != Some(&d) {
                postings[w].push(d);
            }
        }
    }
    let co_count = |a: usize, b: usize| -> usize {
        let (pa, pb) = (&postings[a], &postings[b]);
        let (mut i, mut j, mut n) = (0, 0, 0);
        while i < pa.len() && j < pb.len() {
            match pa[i].cmp(&pb[j]) {
                std::cmp::Ordering::Equal => {
                    n += 1;
                    i += 1;
                    j += 1;
                }
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
            }
        }
        n
    };

    let total: f64 = top_ids
        .iter()
        .map(|ids| {
            let mut score = 0.0;
            for m in 1..ids.len() {
                for l in 0..m {
                    let df = postings[ids[l]].len();
                    if df > 0 {
                        score += ((co_count(ids[m], ids[l]) as f64 + 1.0) / df as f64).ln();
                    }
                }
            }
            score
        })
        .sum();
    total / top_ids.len() as f64
}

impl TopicRunner for LdaRunner {
    fn topic_count(&self) -> usize {
        self.table.topic_count()
    }

    fn topic_top_terms(&self, topic_id: usize, n: usize) -> Result<TopTerms, RunnerError> {
        self.table.top_terms(topic_id, n)
    }
}

impl DocumentTopics for LdaRunner {
    fn document_count(&self) -> usize {
        self.theta.len()
    }

    fn document_topic_distribution(
        &self,
        doc: DocumentId,
        min_probability: f64,
    ) -> Result<Vec<(usize, f64)>, RunnerError> {
        let row = self.theta.get(doc.0).ok_or(RunnerError::UnknownDocument {
            document: doc.0,
            document_count: self.theta.len(),
        })?;
        Ok(row
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, p)| *p >= min_probability)
            .collect())
    }
}

impl CorrelationMatrix for LdaRunner {
    fn correlation_matrix(&self, n_terms: usize) -> Vec<Vec<f64>> {
        self.table.correlation(n_terms)
    }
}

impl TopicCoherence for LdaRunner {
    fn coherence(&self, candidate_topic_count: usize) -> Result<f64, RunnerError> {
        if candidate_topic_count == 0 {
            return Err(RunnerError::InvalidTopicCount {
                requested: candidate_topic_count,
            });
        }
        let top_ids = if candidate_topic_count == self.topic_count() {
            self.table.top_term_ids(COHERENCE_TOP_TERMS)
        } else {
            let estimate = gibbs(&self.corpus, candidate_topic_count, &self.parameters);
            TopicTermTable::new(Arc::clone(self.table.vocabulary()), estimate.phi)
                .top_term_ids(COHERENCE_TOP_TERMS)
        };
        Ok(umass_coherence(&self.corpus, &top_ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Arc<EncodedCorpus> {
        let docs: Vec<Vec<&str>> = vec![
            vec!["rust", "cargo", "crate", "rust", "borrow"],
            vec!["rust", "borrow", "lifetime", "cargo"],
            vec!["soup", "recipe", "onion", "soup"],
            vec!["recipe", "onion", "garlic", "soup"],
        ];
        Arc::new(EncodedCorpus::encode(&docs))
    }

    fn params(k: usize) -> ModelParameters {
        ModelParameters {
            topic_count: k,
            iterations: 50,
            ..ModelParameters::default()
        }
    }

    #[test]
    fn training_is_deterministic_for_a_seed() {
        let a = LdaRunner::train(corpus(), &params(2));
        let b = LdaRunner::train(corpus(), &params(2));
        assert_eq!(a.theta, b.theta);
        assert_eq!(a.all_topics_top_terms(3), b.all_topics_top_terms(3));
    }

    #[test]
    fn distributions_are_probabilities() {
        let r = LdaRunner::train(corpus(), &params(3));
        assert_eq!(r.topic_count(), 3);
        assert_eq!(r.document_count(), 4);
        let all = r.document_topic_distribution(DocumentId(0), 0.0).unwrap();
        assert_eq!(all.len(), 3);
        assert!((all.iter().map(|(_, p)| p).sum::<f64>() - 1.0).abs() < 1e-9);

        let filtered = r.document_topic_distribution(DocumentId(0), 0.5).unwrap();
        assert!(filtered.iter().all(|(_, p)| *p >= 0.5));
        assert!(matches!(
            r.document_topic_distribution(DocumentId(9), 0.0),
            Err(RunnerError::UnknownDocument { document: 9, document_count: 4 })
        ));
    }

    #[test]
    fn top_terms_cover_requested_range() {
        let r = LdaRunner::train(corpus(), &params(2));
        let all = r.all_topics_top_terms(4);
        assert_eq!(all.len(), 2);
        assert_eq!(all.iter().map(|t| t.topic_id).collect::<Vec<_>>(), vec![0, 1]);
        assert!(all.iter().all(|t| t.len() == 4));
        assert!(matches!(r.topic_top_terms(2, 4), Err(RunnerError::OutOfRange { .. })));
    }

    #[test]
    fn coherence_compares_candidates() {
        let r = LdaRunner::train(corpus(), &params(2));
        let c2 = r.coherence(2).unwrap();
        let c3 = r.coherence(3).unwrap();
        assert!(c2.is_finite() && c3.is_finite());
        // same candidate as the trained model reuses its table
        assert_eq!(c2, r.coherence(2).unwrap());
        assert_eq!(r.coherence(0), Err(RunnerError::InvalidTopicCount { requested: 0 }));
    }

    #[test]
    fn umass_prefers_cooccurring_terms() {
        let c = corpus();
        let rust = c.vocabulary.id("rust").unwrap();
        let cargo = c.vocabulary.id("cargo").unwrap();
        let soup = c.vocabulary.id("soup").unwrap();
        let together = umass_coherence(&c, &[vec![rust, cargo]]);
        let apart = umass_coherence(&c, &[vec![rust, soup]]);
        assert!(together > apart);
    }
}
