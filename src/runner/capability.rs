use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{corpus::DocumentId, error::RunnerError, model::Algorithm};

/// Optional operation sets a runner variant may implement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    DocumentTopics,
    CorrelationMatrix,
    TopicCoherence,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::DocumentTopics,
        Capability::CorrelationMatrix,
        Capability::TopicCoherence,
    ];

    #[inline]
    const fn bit(self) -> u8 {
        match self {
            Capability::DocumentTopics => 1,
            Capability::CorrelationMatrix => 1 << 1,
            Capability::TopicCoherence => 1 << 2,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::DocumentTopics => "document topics",
            Capability::CorrelationMatrix => "correlation matrix",
            Capability::TopicCoherence => "topic coherence",
        };
        f.write_str(name)
    }
}

/// Fixed-size set of [`Capability`] values
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build a set in const context
    pub const fn of(caps: &[Capability]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < caps.len() {
            bits |= caps[i].bit();
            i += 1;
        }
        Self(bits)
    }

    pub const fn with(self, cap: Capability) -> Self {
        Self(self.0 | cap.bit())
    }

    #[inline]
    pub const fn contains(self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    /// True when every capability of `required` is in `self`
    #[inline]
    pub const fn contains_all(self, required: CapabilitySet) -> bool {
        self.0 & required.0 == required.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Top terms of one topic
/// `terms[i]` has weight `scores[i]`, strongest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopTerms {
    pub topic_id: usize,
    pub terms: Vec<String>,
    pub scores: Vec<f64>,
}

impl TopTerms {
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Static description of a runner variant
pub trait RunnerVariant {
    const KIND: Algorithm;
    const CAPABILITIES: CapabilitySet;
}

/// Operations every runner provides
pub trait TopicRunner: Send + Sync {
    fn topic_count(&self) -> usize;

    /// Strongest `n` terms of `topic_id`
    /// May return fewer than `n` when the topic has fewer associated terms.
    fn topic_top_terms(&self, topic_id: usize, n: usize) -> Result<TopTerms, RunnerError>;

    /// [`TopicRunner::topic_top_terms`] for every topic, ascending topic id
    fn all_topics_top_terms(&self, n: usize) -> Vec<TopTerms> {
        (0..self.topic_count())
            .filter_map(|topic_id| self.topic_top_terms(topic_id, n).ok())
            .collect()
    }
}

/// Per-document topic distribution
pub trait DocumentTopics: TopicRunner {
    /// Number of documents the runner was trained on
    fn document_count(&self) -> usize;

    /// `(topic_id, probability)` pairs at or above `min_probability`, ascending topic id
    ///
    /// The probabilities are not guaranteed to sum to 1.
    fn document_topic_distribution(
        &self,
        doc: DocumentId,
        min_probability: f64,
    ) -> Result<Vec<(usize, f64)>, RunnerError>;
}

/// Pairwise topic similarity
pub trait CorrelationMatrix: TopicRunner {
    /// Symmetric `topic_count x topic_count` matrix with entries in `[0, 1]`
    /// and a diagonal of 1.0, computed over each topic's top `n_terms` terms
    /// (`0` uses every term).
    fn correlation_matrix(&self, n_terms: usize) -> Vec<Vec<f64>>;
}

/// Model selection score
pub trait TopicCoherence: TopicRunner {
    /// Coherence of a model with `candidate_topic_count` topics over the training corpus
    /// Higher is better. Only comparable across candidates for the same corpus.
    fn coherence(&self, candidate_topic_count: usize) -> Result<f64, RunnerError>;
}
