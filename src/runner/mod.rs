pub mod capability;
pub mod kmeans;
pub mod lda;
pub mod nmf;
pub mod topics;
pub mod training;

pub use capability::{
    Capability, CapabilitySet, CorrelationMatrix, DocumentTopics, RunnerVariant, TopTerms,
    TopicCoherence, TopicRunner,
};
pub use kmeans::KMeansRunner;
pub use lda::LdaRunner;
pub use nmf::NmfRunner;

use crate::{error::RunnerError, model::Algorithm};

/// Live handle to a trained topic model
///
/// Closed over the runner variants. Code holding a concrete variant only
/// sees the capability methods that variant implements; code holding an
/// `AnalysisRunner` asks [`AnalysisRunner::supports`] or goes through the
/// `as_*` / `require_*` accessors.
#[derive(Debug, Clone)]
pub enum AnalysisRunner {
    Lda(LdaRunner),
    Nmf(NmfRunner),
    KMeans(KMeansRunner),
}

impl AnalysisRunner {
    pub fn kind(&self) -> Algorithm {
        match self {
            AnalysisRunner::Lda(_) => LdaRunner::KIND,
            AnalysisRunner::Nmf(_) => NmfRunner::KIND,
            AnalysisRunner::KMeans(_) => KMeansRunner::KIND,
        }
    }

    pub fn capabilities(&self) -> CapabilitySet {
        match self {
            AnalysisRunner::Lda(_) => LdaRunner::CAPABILITIES,
            AnalysisRunner::Nmf(_) => NmfRunner::CAPABILITIES,
            AnalysisRunner::KMeans(_) => KMeansRunner::CAPABILITIES,
        }
    }

    #[inline]
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(capability)
    }

    /// True when every capability in `required` is supported
    #[inline]
    pub fn supports_all(&self, required: CapabilitySet) -> bool {
        self.capabilities().contains_all(required)
    }

    fn inner(&self) -> &dyn TopicRunner {
        match self {
            AnalysisRunner::Lda(r) => r,
            AnalysisRunner::Nmf(r) => r,
            AnalysisRunner::KMeans(r) => r,
        }
    }

    pub fn as_document_topics(&self) -> Option<&dyn DocumentTopics> {
        match self {
            AnalysisRunner::Lda(r) => Some(r),
            AnalysisRunner::Nmf(r) => Some(r),
            AnalysisRunner::KMeans(r) => Some(r),
        }
    }

    pub fn as_correlation_matrix(&self) -> Option<&dyn CorrelationMatrix> {
        match self {
            AnalysisRunner::Lda(r) => Some(r),
            AnalysisRunner::Nmf(r) => Some(r),
            AnalysisRunner::KMeans(_) => None,
        }
    }

    pub fn as_topic_coherence(&self) -> Option<&dyn TopicCoherence> {
        match self {
            AnalysisRunner::Lda(r) => Some(r),
            AnalysisRunner::Nmf(_) | AnalysisRunner::KMeans(_) => None,
        }
    }

    fn unsupported(&self, capability: Capability) -> RunnerError {
        RunnerError::UnsupportedCapability {
            runner: self.kind(),
            capability,
        }
    }

    pub fn require_document_topics(&self) -> Result<&dyn DocumentTopics, RunnerError> {
        self.as_document_topics()
            .ok_or_else(|| self.unsupported(Capability::DocumentTopics))
    }

    pub fn require_correlation_matrix(&self) -> Result<&dyn CorrelationMatrix, RunnerError> {
        self.as_correlation_matrix()
            .ok_or_else(|| self.unsupported(Capability::CorrelationMatrix))
    }

    pub fn require_topic_coherence(&self) -> Result<&dyn TopicCoherence, RunnerError> {
        self.as_topic_coherence()
            .ok_or_else(|| self.unsupported(Capability::TopicCoherence))
    }
}

impl TopicRunner for AnalysisRunner {
    fn topic_count(&self) -> usize {
        self.inner().topic_count()
    }

    fn topic_top_terms(&self, topic_id: usize, n: usize) -> Result<TopTerms, RunnerError> {
        self.inner().topic_top_terms(topic_id, n)
    }

    fn all_topics_top_terms(&self, n: usize) -> Vec<TopTerms> {
        self.inner().all_topics_top_terms(n)
    }
}

/// Uniform capability check over every runner variant
#[inline]
pub fn supports(runner: &AnalysisRunner, capability: Capability) -> bool {
    runner.supports(capability)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{corpus::term::EncodedCorpus, model::ModelParameters};
    use std::sync::Arc;

    fn runners() -> Vec<AnalysisRunner> {
        let docs: Vec<Vec<&str>> = vec![vec!["red", "green", "blue"], vec!["red", "blue"]];
        let corpus = Arc::new(EncodedCorpus::encode(&docs));
        let params = ModelParameters {
            topic_count: 2,
            iterations: 5,
            ..ModelParameters::default()
        };
        vec![
            AnalysisRunner::Lda(LdaRunner::train(Arc::clone(&corpus), &params)),
            AnalysisRunner::Nmf(NmfRunner::train(&corpus, &params)),
            AnalysisRunner::KMeans(KMeansRunner::train(&corpus, &params)),
        ]
    }

    #[test]
    fn declared_capabilities_match_accessors() {
        for runner in runners() {
            assert_eq!(runner.capabilities(), runner.kind().capabilities());
            assert_eq!(
                runner.supports(Capability::DocumentTopics),
                runner.as_document_topics().is_some()
            );
            assert_eq!(
                runner.supports(Capability::CorrelationMatrix),
                runner.as_correlation_matrix().is_some()
            );
            assert_eq!(
                runner.supports(Capability::TopicCoherence),
                runner.as_topic_coherence().is_some()
            );
        }
    }

    #[test]
    fn document_topics_only_runner_rejects_correlation() {
        let runner = runners().pop().unwrap();
        assert_eq!(runner.kind(), Algorithm::KMeans);
        assert!(supports(&runner, Capability::DocumentTopics));
        assert!(!supports(&runner, Capability::CorrelationMatrix));
        assert!(!supports(&runner, Capability::TopicCoherence));
        assert!(matches!(
            runner.require_correlation_matrix(),
            Err(RunnerError::UnsupportedCapability {
                runner: Algorithm::KMeans,
                capability: Capability::CorrelationMatrix
            })
        ));
    }

    #[test]
    fn base_operations_delegate() {
        for runner in runners() {
            assert_eq!(runner.topic_count(), 2);
            assert_eq!(runner.all_topics_top_terms(2).len(), 2);
            assert!(matches!(
                runner.topic_top_terms(2, 1),
                Err(RunnerError::OutOfRange { topic_id: 2, topic_count: 2 })
            ));
        }
    }
}
