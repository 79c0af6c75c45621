use std::sync::{Arc, OnceLock};

use tracing::info;

use crate::{
    corpus::{term::Vocabulary, DocumentId},
    runner::{AnalysisRunner, DocumentTopics},
};

/// Trained result of a configuration
#[derive(Debug)]
pub struct TopicModel {
    runner: AnalysisRunner,
    used_corpus_version_id: u64,
    dictionary: Arc<Vocabulary>,
    /// full distributions, filled on first use
    document_topics: OnceLock<Vec<Vec<(usize, f64)>>>,
}

impl TopicModel {
    pub fn new(runner: AnalysisRunner, used_corpus_version_id: u64, dictionary: Arc<Vocabulary>) -> Self {
        Self {
            runner,
            used_corpus_version_id,
            dictionary,
            document_topics: OnceLock::new(),
        }
    }

    pub fn runner(&self) -> &AnalysisRunner {
        &self.runner
    }

    /// Corpus version this model was trained on
    pub fn used_corpus_version_id(&self) -> u64 {
        self.used_corpus_version_id
    }

    pub fn dictionary(&self) -> &Arc<Vocabulary> {
        &self.dictionary
    }

    /// Every document's full distribution, or None when the runner lacks DocumentTopics
    pub fn document_topics(&self) -> Option<&[Vec<(usize, f64)>]> {
        let provider = self.runner.as_document_topics()?;
        let cached = self.document_topics.get_or_init(|| {
            (0..provider.document_count())
                .filter_map(|d| {
                    let distribution = provider.document_topic_distribution(DocumentId(d), 0.0);
                    debug_assert!(distribution.is_ok(), "document {d} within document_count");
                    distribution.ok()
                })
                .collect()
        });
        Some(cached.as_slice())
    }
}

/// Trained-result slot of a configuration
#[derive(Debug, Default)]
pub enum TopicModelSlot {
    #[default]
    Absent,
    Present(Box<TopicModel>),
}

impl TopicModelSlot {
    pub fn is_present(&self) -> bool {
        matches!(self, TopicModelSlot::Present(_))
    }

    pub fn model(&self) -> Option<&TopicModel> {
        match self {
            TopicModelSlot::Present(model) => Some(model),
            TopicModelSlot::Absent => None,
        }
    }

    pub fn runner(&self) -> Option<&AnalysisRunner> {
        self.model().map(TopicModel::runner)
    }

    /// Store a freshly trained model, replacing any previous one
    pub(crate) fn install(&mut self, model: TopicModel) {
        *self = TopicModelSlot::Present(Box::new(model));
    }

    /// Drop the model unconditionally; used when the owning configuration goes away
    pub(crate) fn clear(&mut self) {
        *self = TopicModelSlot::Absent;
    }

    /// Drop the model when it was trained on another corpus version
    /// Returns true when something was discarded. Idempotent.
    pub fn discard_if_stale(&mut self, live_version: u64) -> bool {
        let stale = matches!(
            self,
            TopicModelSlot::Present(model) if model.used_corpus_version_id != live_version
        );
        if stale {
            if let TopicModelSlot::Present(model) = self {
                info!(
                    trained_on = model.used_corpus_version_id,
                    live_version, "discarding topic model trained on a superseded corpus"
                );
            }
            *self = TopicModelSlot::Absent;
        }
        stale
    }
}
