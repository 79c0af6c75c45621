use std::sync::Arc;

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::{
    controller::RunnerChanged,
    corpus::DocumentId,
    error::{RunnerError, ViewError},
    event::EventChannel,
    model::TopicModel,
    runner::{AnalysisRunner, Capability, CapabilitySet, TopTerms, TopicRunner},
    visualization::{attach, CacheKey, CachedVisualization, VisualizationDefinition},
};

pub const TOPIC_TERMS: &str = "topic_terms";
pub const TOPIC_OVERVIEW: &str = "topic_overview";
pub const DOCUMENT_TOPICS: &str = "document_topics";
pub const TOPIC_CORRELATION: &str = "topic_correlation";
pub const COHERENCE_SWEEP: &str = "coherence_sweep";

/// Rendered artifact of a standard view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum View {
    TopicTerms(TopTerms),
    TopicOverview(Vec<TopTerms>),
    /// full distribution of every document
    DocumentTopics(Vec<Vec<(usize, f64)>>),
    /// documents ranked by their weight for one topic
    TopicDocuments(Vec<(DocumentId, f64)>),
    TopicCorrelation(Vec<Vec<f64>>),
    /// `(candidate topic count, coherence)` pairs
    CoherenceSweep(Vec<(usize, f64)>),
}

/// The standard view definitions and their rendering rules
#[derive(Debug)]
pub struct ViewCatalog {
    definitions: IndexMap<&'static str, Arc<VisualizationDefinition<View>>>,
    /// terms shown per topic
    top_terms: usize,
    /// terms per topic entering the correlation matrix
    correlation_terms: usize,
    /// candidate topic counts scored by the coherence sweep
    sweep: Vec<usize>,
}

impl ViewCatalog {
    pub fn standard() -> Self {
        let none = CapabilitySet::empty();
        let definitions = [
            (TOPIC_TERMS, none),
            (TOPIC_OVERVIEW, none),
            (DOCUMENT_TOPICS, none.with(Capability::DocumentTopics)),
            (TOPIC_CORRELATION, none.with(Capability::CorrelationMatrix)),
            (COHERENCE_SWEEP, none.with(Capability::TopicCoherence)),
        ]
        .into_iter()
        .map(|(name, required)| (name, Arc::new(VisualizationDefinition::new(name, required))))
        .collect();
        Self {
            definitions,
            top_terms: 10,
            correlation_terms: 20,
            sweep: vec![2, 4, 6, 8, 10],
        }
    }

    pub fn top_terms(&self) -> usize {
        self.top_terms
    }

    pub fn correlation_terms(&self) -> usize {
        self.correlation_terms
    }

    pub fn sweep(&self) -> &[usize] {
        &self.sweep
    }

    /// Terms shown per topic; clears every cached view
    pub fn set_top_terms(&mut self, n: usize) {
        self.top_terms = n;
        self.delete_caches();
    }

    /// Terms per topic entering the correlation matrix; clears every cached view
    pub fn set_correlation_terms(&mut self, n: usize) {
        self.correlation_terms = n;
        self.delete_caches();
    }

    /// Candidate topic counts for the coherence sweep; clears every cached view
    pub fn set_sweep(&mut self, candidates: Vec<usize>) {
        self.sweep = candidates;
        self.delete_caches();
    }

    pub fn delete_caches(&self) {
        for definition in self.definitions.values() {
            definition.cache().delete_cache();
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<VisualizationDefinition<View>>> {
        self.definitions.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.definitions.keys().copied()
    }

    /// Every definition, type erased
    pub fn erased(&self) -> Vec<Arc<dyn CachedVisualization>> {
        self.definitions
            .values()
            .map(|d| Arc::clone(d) as Arc<dyn CachedVisualization>)
            .collect()
    }

    /// Subscribe every definition's cache to runner changes
    pub fn attach_all(&self, channel: &EventChannel<RunnerChanged>) {
        for definition in self.erased() {
            attach(channel, &definition);
        }
    }

    /// Names of the views `runner` can serve, in catalog order
    pub fn offered(&self, runner: &AnalysisRunner) -> Vec<&'static str> {
        self.definitions
            .iter()
            .filter(|(_, d)| d.is_offered(runner))
            .map(|(name, _)| *name)
            .collect()
    }

    /// Serve view `name` for `key` from its cache
    ///
    /// `topic_terms` needs a topic key; `document_topics` serves every
    /// document for `None` and a ranking for a topic key. The other views
    /// are model wide and ignore `key`.
    pub fn render(&self, name: &str, model: &TopicModel, key: CacheKey) -> Result<Arc<View>, ViewError> {
        let definition = self.get(name).ok_or_else(|| ViewError::UnknownView {
            view: name.to_string(),
        })?;
        match name {
            TOPIC_TERMS => {
                let topic = key.ok_or_else(|| ViewError::MissingKey {
                    view: name.to_string(),
                })?;
                definition.render(model, key, |m| {
                    Ok(View::TopicTerms(m.runner().topic_top_terms(topic, self.top_terms)?))
                })
            }
            TOPIC_OVERVIEW => definition.render(model, None, |m| {
                Ok(View::TopicOverview(m.runner().all_topics_top_terms(self.top_terms)))
            }),
            DOCUMENT_TOPICS => definition.render(model, key, |m| match key {
                None => Ok(View::DocumentTopics(
                    m.document_topics().map(<[_]>::to_vec).unwrap_or_default(),
                )),
                Some(topic) => topic_documents(m, topic).map(View::TopicDocuments),
            }),
            TOPIC_CORRELATION => definition.render(model, None, |m| {
                let provider = m.runner().require_correlation_matrix()?;
                Ok(View::TopicCorrelation(
                    provider.correlation_matrix(self.correlation_terms),
                ))
            }),
            COHERENCE_SWEEP => definition.render(model, None, |m| {
                let provider = m.runner().require_topic_coherence()?;
                let scores = self
                    .sweep
                    .par_iter()
                    .map(|&k| provider.coherence(k).map(|score| (k, score)))
                    .collect::<Result<Vec<_>, RunnerError>>()?;
                debug!(candidates = scores.len(), "coherence sweep computed");
                Ok(View::CoherenceSweep(scores))
            }),
            _ => Err(ViewError::UnknownView {
                view: name.to_string(),
            }),
        }
    }
}

/// Documents sorted by descending weight for `topic`
fn topic_documents(model: &TopicModel, topic: usize) -> Result<Vec<(DocumentId, f64)>, ViewError> {
    let topic_count = model.runner().topic_count();
    if topic >= topic_count {
        return Err(RunnerError::OutOfRange {
            topic_id: topic,
            topic_count,
        }
        .into());
    }
    let distributions = model.document_topics().unwrap_or_default();
    let mut ranked: Vec<(DocumentId, f64)> = distributions
        .iter()
        .enumerate()
        .filter_map(|(d, dist)| {
            dist.iter()
                .find(|(t, _)| *t == topic)
                .map(|(_, p)| (DocumentId(d), *p))
        })
        .filter(|(_, p)| *p > 0.0)
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    Ok(ranked)
}
