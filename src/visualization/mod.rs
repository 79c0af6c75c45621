//! Lazily computed, per-definition cached views
//!
//! Every definition owns one [`ResultCache`] keyed by an optional topic index
//! (`None` for model-wide views). Caches are only ever cleared as a whole;
//! [`attach`] wires a definition to the runner change event so that happens
//! before any view of a new runner is served.

pub mod views;

pub use views::{View, ViewCatalog};

use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::trace;

use crate::{
    controller::RunnerChanged,
    error::ViewError,
    event::{EventChannel, Subscriber},
    model::TopicModel,
    runner::{AnalysisRunner, CapabilitySet},
};

/// Cache key: a topic index, or `None` for model-wide artifacts
pub type CacheKey = Option<usize>;

/// Keyed artifact cache
///
/// The lock is not held while an artifact is computed. When two callers race
/// on the same key, the first stored artifact wins and both receive it.
#[derive(Debug)]
pub struct ResultCache<A> {
    entries: Mutex<IndexMap<CacheKey, Arc<A>>>,
}

impl<A> ResultCache<A> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
        }
    }

    pub fn get(&self, key: CacheKey) -> Option<Arc<A>> {
        self.entries.lock().get(&key).cloned()
    }

    pub fn contains(&self, key: CacheKey) -> bool {
        self.entries.lock().contains_key(&key)
    }

    pub fn get_or_compute(&self, key: CacheKey, compute: impl FnOnce() -> A) -> Arc<A> {
        if let Some(hit) = self.get(key) {
            return hit;
        }
        let artifact = Arc::new(compute());
        Arc::clone(self.entries.lock().entry(key).or_insert(artifact))
    }

    /// [`ResultCache::get_or_compute`] for fallible computations; errors are not cached
    pub fn try_get_or_compute<E>(
        &self,
        key: CacheKey,
        compute: impl FnOnce() -> Result<A, E>,
    ) -> Result<Arc<A>, E> {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }
        let artifact = Arc::new(compute()?);
        Ok(Arc::clone(self.entries.lock().entry(key).or_insert(artifact)))
    }

    /// Drop every entry
    pub fn delete_cache(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<A> Default for ResultCache<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased view of a visualization definition, enough to offer and invalidate it
pub trait CachedVisualization: Send + Sync {
    fn name(&self) -> &str;

    /// Capabilities the active runner must have for this view to be offered
    fn required(&self) -> CapabilitySet;

    fn delete_cache(&self);

    fn cached_entries(&self) -> usize;

    #[inline]
    fn is_offered(&self, runner: &AnalysisRunner) -> bool {
        runner.supports_all(self.required())
    }
}

/// A named view with its capability requirements and its own cache
#[derive(Debug)]
pub struct VisualizationDefinition<A> {
    name: String,
    required: CapabilitySet,
    cache: ResultCache<A>,
}

impl<A: Send + Sync> VisualizationDefinition<A> {
    pub fn new(name: impl Into<String>, required: CapabilitySet) -> Self {
        Self {
            name: name.into(),
            required,
            cache: ResultCache::new(),
        }
    }

    pub fn cache(&self) -> &ResultCache<A> {
        &self.cache
    }

    /// Serve `key` from the cache, computing it against `model` on a miss
    /// Fails with [`ViewError::NotOffered`] when the runner lacks a required capability.
    pub fn render(
        &self,
        model: &TopicModel,
        key: CacheKey,
        compute: impl FnOnce(&TopicModel) -> Result<A, ViewError>,
    ) -> Result<Arc<A>, ViewError> {
        if !self.is_offered(model.runner()) {
            return Err(ViewError::NotOffered {
                view: self.name.clone(),
                runner: model.runner().kind(),
            });
        }
        self.cache.try_get_or_compute(key, || compute(model))
    }
}

impl<A: Send + Sync> CachedVisualization for VisualizationDefinition<A> {
    fn name(&self) -> &str {
        &self.name
    }

    fn required(&self) -> CapabilitySet {
        self.required
    }

    fn delete_cache(&self) {
        trace!(view = %self.name, entries = self.cache.len(), "visualization cache cleared");
        self.cache.delete_cache();
    }

    fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

/// Clear `definition`'s cache on every runner change
///
/// The subscription holds only a weak reference, so it turns into a no-op
/// once the definition is dropped.
pub fn attach(
    channel: &EventChannel<RunnerChanged>,
    definition: &Arc<dyn CachedVisualization>,
) -> Subscriber<RunnerChanged> {
    let weak: Weak<dyn CachedVisualization> = Arc::downgrade(definition);
    channel.subscribe_fn(move |_| {
        if let Some(definition) = weak.upgrade() {
            definition.delete_cache();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        controller::RunnerChangeReason,
        model::TopicModelSlot,
        runner::Capability,
    };
    use parking_lot::RwLock;

    #[test]
    fn compute_runs_once_per_key() {
        let cache: ResultCache<String> = ResultCache::new();
        let mut calls = 0;
        let first = cache.get_or_compute(Some(1), || {
            calls += 1;
            "one".to_string()
        });
        let second = cache.get_or_compute(Some(1), || {
            calls += 1;
            "other".to_string()
        });
        assert_eq!(calls, 1);
        assert!(Arc::ptr_eq(&first, &second));
        cache.get_or_compute(None, || "all".to_string());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn errors_are_not_cached() {
        let cache: ResultCache<u32> = ResultCache::new();
        let failed: Result<_, &str> = cache.try_get_or_compute(None, || Err("boom"));
        assert!(failed.is_err());
        assert!(!cache.contains(None));
        let ok: Result<_, &str> = cache.try_get_or_compute(None, || Ok(3));
        assert_eq!(*ok.unwrap(), 3);
    }

    #[test]
    fn delete_cache_is_idempotent() {
        let definition: VisualizationDefinition<u32> =
            VisualizationDefinition::new("v", CapabilitySet::empty());
        definition.cache().get_or_compute(Some(0), || 1);
        definition.delete_cache();
        assert_eq!(definition.cached_entries(), 0);
        definition.delete_cache();
        assert_eq!(definition.cached_entries(), 0);
        assert!(definition.cache().get(Some(0)).is_none());
    }

    #[test]
    fn attached_definition_clears_on_runner_change() {
        let channel = EventChannel::new();
        let definition: Arc<VisualizationDefinition<u32>> = Arc::new(VisualizationDefinition::new(
            "corr",
            CapabilitySet::empty().with(Capability::CorrelationMatrix),
        ));
        let erased: Arc<dyn CachedVisualization> = definition.clone();
        attach(&channel, &erased);
        definition.cache().get_or_compute(None, || 7);

        let event = RunnerChanged {
            config: "c".into(),
            reason: RunnerChangeReason::Switched,
            slot: Arc::new(RwLock::new(TopicModelSlot::Absent)),
        };
        channel.publish(&event);
        assert!(definition.cache().is_empty());

        drop(erased);
        drop(definition);
        // dangling subscription is harmless
        channel.publish(&event);
    }
}
