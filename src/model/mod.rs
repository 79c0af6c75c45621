pub mod config;
pub mod topic_model;

pub use config::{
    Algorithm, Configuration, Language, ModelParameters, Shared, StopwordSet, SynonymTable,
};
pub use topic_model::{TopicModel, TopicModelSlot};

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::{corpus::CorpusVersionTracker, event::EventChannel};

/// Name of the configuration every registry starts with
pub const DEFAULT_CONFIGURATION_NAME: &str = "Config 1";

/// Ordered, uniquely named configurations with exactly one selected
///
/// Never empty; the selected name always refers to an existing entry.
/// Every operation reports failure as `false` and then leaves state and
/// subscribers untouched.
#[derive(Debug)]
pub struct Registry {
    configurations: IndexMap<String, Configuration>,
    selected: String,
    language: Language,
    corpus_version: CorpusVersionTracker,
    list_changed: EventChannel<Vec<String>>,
    config_switched: EventChannel<Configuration>,
}

impl Registry {
    /// Registry holding a single default configuration, selected
    pub fn new(corpus_version: CorpusVersionTracker, language: Language) -> Self {
        let first = Configuration::new(DEFAULT_CONFIGURATION_NAME, language);
        let mut configurations = IndexMap::new();
        configurations.insert(first.name().to_string(), first);
        Self {
            configurations,
            selected: DEFAULT_CONFIGURATION_NAME.to_string(),
            language,
            corpus_version,
            list_changed: EventChannel::new(),
            config_switched: EventChannel::new(),
        }
    }

    /// Published with the full ordered name list after add/delete
    pub fn list_changed(&self) -> &EventChannel<Vec<String>> {
        &self.list_changed
    }

    /// Published with the newly selected configuration after every switch
    pub fn config_switched(&self) -> &EventChannel<Configuration> {
        &self.config_switched
    }

    /// Language used for the stopwords of new configurations
    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Add a fresh configuration and switch to it
    /// Fails when `name` is taken.
    pub fn add(&mut self, name: &str) -> bool {
        if self.configurations.contains_key(name) {
            debug!(name, "add rejected, name exists");
            return false;
        }
        let config = Configuration::new(name, self.language);
        self.insert(config)
    }

    /// Add an independent copy of `source` (without its trained result) and switch to it
    /// Fails when `source` is unknown or `name` is taken.
    pub fn duplicate(&mut self, source: &str, name: &str) -> bool {
        if self.configurations.contains_key(name) {
            return false;
        }
        let Some(copy) = self.configurations.get(source).map(|c| c.fork(name)) else {
            return false;
        };
        self.insert(copy)
    }

    fn insert(&mut self, config: Configuration) -> bool {
        let name = config.name().to_string();
        self.configurations.insert(name.clone(), config);
        info!(name = %name, "configuration added");
        self.list_changed.publish(&self.names());
        self.switch(&name)
    }

    /// Select `name`
    /// Discards every topic model trained on an older corpus first, so
    /// subscribers never observe a stale runner.
    pub fn switch(&mut self, name: &str) -> bool {
        let Some(config) = self.configurations.get(name).cloned() else {
            debug!(name, "switch rejected, unknown configuration");
            return false;
        };
        self.selected = name.to_string();
        let live = self.corpus_version.current();
        for entry in self.configurations.values() {
            entry.topic_model.write().discard_if_stale(live);
        }
        debug!(name, "configuration switched");
        self.config_switched.publish(&config);
        true
    }

    /// Remove `name`
    ///
    /// Fails when unknown or when it is the last configuration. Deleting the
    /// selected entry first switches to its predecessor, or to its successor
    /// when it is the first entry.
    pub fn delete(&mut self, name: &str) -> bool {
        let Some(index) = self.configurations.get_index_of(name) else {
            return false;
        };
        if self.configurations.len() == 1 {
            debug!(name, "delete rejected, last configuration");
            return false;
        }
        if self.selected == name {
            let fallback = if index == 0 { index + 1 } else { index - 1 };
            let fallback_name = match self.configurations.get_index(fallback) {
                Some((fallback_name, _)) => fallback_name.clone(),
                None => return false,
            };
            self.switch(&fallback_name);
        }
        if let Some(removed) = self.configurations.shift_remove(name) {
            removed.topic_model.write().clear();
        }
        info!(name, "configuration deleted");
        self.list_changed.publish(&self.names());
        true
    }

    /// Replace every configuration at once and select `selected`
    /// Fails without change when `configurations` is empty, has duplicate
    /// names, or does not contain `selected`.
    pub(crate) fn replace_all(&mut self, configurations: Vec<Configuration>, selected: &str) -> bool {
        let mut replacement = IndexMap::with_capacity(configurations.len());
        for config in configurations {
            if replacement.insert(config.name().to_string(), config).is_some() {
                return false;
            }
        }
        if !replacement.contains_key(selected) {
            return false;
        }
        for (_, old) in std::mem::replace(&mut self.configurations, replacement) {
            old.topic_model.write().clear();
        }
        self.list_changed.publish(&self.names());
        self.switch(selected)
    }

    pub fn selected_name(&self) -> &str {
        &self.selected
    }

    pub fn selected(&self) -> &Configuration {
        // invariant: selected always names an entry
        &self.configurations[self.selected.as_str()]
    }

    pub fn names(&self) -> Vec<String> {
        self.configurations.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Configuration> {
        self.configurations.get(name)
    }

    /// True when `config` is the registered configuration of that name
    pub fn contains(&self, config: &Configuration) -> bool {
        self.configurations
            .get(config.name())
            .map_or(false, |c| c.same_as(config))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Configuration> {
        self.configurations.values()
    }

    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        corpus::term::EncodedCorpus,
        runner::{AnalysisRunner, KMeansRunner},
    };
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn registry() -> Registry {
        Registry::new(CorpusVersionTracker::new(), Language::English)
    }

    fn kmeans_model(version: u64) -> TopicModel {
        let docs: Vec<Vec<&str>> = vec![vec!["aa", "bb"]];
        let corpus = EncodedCorpus::encode(&docs);
        let params = ModelParameters {
            topic_count: 1,
            ..ModelParameters::default()
        };
        TopicModel::new(
            AnalysisRunner::KMeans(KMeansRunner::train(&corpus, &params)),
            version,
            Arc::new(corpus.vocabulary.clone()),
        )
    }

    fn record_switches(r: &Registry) -> Arc<Mutex<Vec<String>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        r.config_switched()
            .subscribe_fn(move |c: &Configuration| sink.lock().push(c.name().to_string()));
        log
    }

    #[test]
    fn scenario_add_switch_delete() {
        let mut r = registry();
        assert_eq!(r.names(), vec!["Config 1"]);
        assert_eq!(r.selected_name(), "Config 1");

        assert!(r.add("Config 2"));
        assert_eq!(r.names(), vec!["Config 1", "Config 2"]);
        assert_eq!(r.selected_name(), "Config 2");

        assert!(!r.add("Config 2"));
        assert_eq!(r.names(), vec!["Config 1", "Config 2"]);

        assert!(r.switch("Config 1"));
        assert_eq!(r.selected_name(), "Config 1");

        assert!(r.delete("Config 1"));
        assert_eq!(r.selected_name(), "Config 2");
        assert_eq!(r.names(), vec!["Config 2"]);

        assert!(!r.delete("Config 2"));
        assert_eq!(r.names(), vec!["Config 2"]);
    }

    #[test]
    fn delete_falls_back_to_predecessor() {
        let mut r = registry();
        r.add("B");
        r.add("C");
        assert!(r.delete(DEFAULT_CONFIGURATION_NAME));
        // [B, C]
        r.add("A");
        // [B, C, A]; select C then delete it
        assert!(r.switch("C"));
        assert!(r.delete("C"));
        assert_eq!(r.selected_name(), "B");
    }

    #[test]
    fn delete_fallback_law() {
        let mut r = registry();
        r.add("A");
        r.add("B");
        r.add("C");
        assert!(r.delete(DEFAULT_CONFIGURATION_NAME));
        assert_eq!(r.names(), vec!["A", "B", "C"]);

        r.switch("B");
        let mut r2 = registry();
        for n in ["A", "B", "C"] {
            r2.add(n);
        }
        r2.delete(DEFAULT_CONFIGURATION_NAME);

        assert!(r.delete("B"));
        assert_eq!(r.selected_name(), "A");

        r2.switch("A");
        assert!(r2.delete("A"));
        assert_eq!(r2.selected_name(), "B");
    }

    #[test]
    fn deleting_unselected_keeps_selection() {
        let mut r = registry();
        r.add("A");
        r.add("B");
        let switches = record_switches(&r);
        assert!(r.delete("A"));
        assert_eq!(r.selected_name(), "B");
        assert!(switches.lock().is_empty());
    }

    #[test]
    fn failed_operations_publish_nothing() {
        let mut r = registry();
        let switches = record_switches(&r);
        let lists = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&lists);
        r.list_changed().subscribe_fn(move |_| *sink.lock() += 1);

        assert!(!r.add(DEFAULT_CONFIGURATION_NAME));
        assert!(!r.switch("missing"));
        assert!(!r.delete("missing"));
        assert!(!r.delete(DEFAULT_CONFIGURATION_NAME));
        assert!(!r.duplicate("missing", "copy"));
        assert!(switches.lock().is_empty());
        assert_eq!(*lists.lock(), 0);
    }

    #[test]
    fn add_publishes_list_then_switch() {
        let mut r = registry();
        let order = Arc::new(Mutex::new(Vec::new()));
        let o1 = Arc::clone(&order);
        r.list_changed()
            .subscribe_fn(move |names: &Vec<String>| o1.lock().push(format!("list {}", names.len())));
        let o2 = Arc::clone(&order);
        r.config_switched()
            .subscribe_fn(move |c: &Configuration| o2.lock().push(format!("switch {}", c.name())));

        r.add("X");
        assert_eq!(*order.lock(), vec!["list 2", "switch X"]);
    }

    #[test]
    fn delete_selected_switches_before_list_event() {
        let mut r = registry();
        r.add("X");
        let order = Arc::new(Mutex::new(Vec::new()));
        let o1 = Arc::clone(&order);
        r.list_changed()
            .subscribe_fn(move |names: &Vec<String>| o1.lock().push(names.join(",")));
        let o2 = Arc::clone(&order);
        r.config_switched()
            .subscribe_fn(move |c: &Configuration| o2.lock().push(format!("switch {}", c.name())));

        assert!(r.delete("X"));
        assert_eq!(*order.lock(), vec!["switch Config 1", "Config 1"]);
    }

    #[test]
    fn duplicate_copies_sub_state_independently() {
        let mut r = registry();
        r.selected().parameters.write().topic_count = 4;
        r.selected().synonyms.write().insert("cars", "car");
        assert!(r.duplicate(DEFAULT_CONFIGURATION_NAME, "Copy"));
        assert_eq!(r.selected_name(), "Copy");
        assert_eq!(r.selected().parameters.read().topic_count, 4);

        r.selected().parameters.write().topic_count = 9;
        assert_eq!(
            r.get(DEFAULT_CONFIGURATION_NAME).unwrap().parameters.read().topic_count,
            4
        );
        assert!(!r.duplicate(DEFAULT_CONFIGURATION_NAME, "Copy"));
    }

    #[test]
    fn switch_discards_stale_topic_model() {
        let tracker = CorpusVersionTracker::new();
        tracker.advance();
        let mut r = Registry::new(tracker.clone(), Language::English);

        let docs: Vec<Vec<&str>> = vec![vec!["aa", "bb"]];
        let corpus = EncodedCorpus::encode(&docs);
        let params = ModelParameters {
            topic_count: 1,
            ..ModelParameters::default()
        };
        let model = TopicModel::new(
            AnalysisRunner::KMeans(KMeansRunner::train(&corpus, &params)),
            1,
            Arc::new(corpus.vocabulary.clone()),
        );
        r.selected().topic_model.write().install(model);
        r.add("Other");

        // same version: survives the switch
        r.switch(DEFAULT_CONFIGURATION_NAME);
        assert!(r.selected().topic_model.read().is_present());

        tracker.advance();
        let observed = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&observed);
        r.config_switched().subscribe_fn(move |c: &Configuration| {
            *sink.lock() = Some(c.topic_model.read().is_present());
        });
        r.switch("Other");
        r.switch(DEFAULT_CONFIGURATION_NAME);
        assert_eq!(*observed.lock(), Some(false));
        assert!(!r.selected().topic_model.read().is_present());
    }

    #[test]
    fn switch_to_another_configuration_discards_every_stale_model() {
        let tracker = CorpusVersionTracker::new();
        tracker.advance();
        let mut r = Registry::new(tracker.clone(), Language::English);
        r.selected().topic_model.write().install(kmeans_model(1));
        r.add("B");
        r.add("C");
        r.get("C").unwrap().topic_model.write().install(kmeans_model(1));
        let first = r.get(DEFAULT_CONFIGURATION_NAME).unwrap().clone();

        tracker.advance();
        assert!(r.switch("B"));
        assert!(!first.topic_model.read().is_present());
        assert!(r.iter().all(|c| !c.topic_model.read().is_present()));
    }

    #[test]
    fn switch_keeps_models_of_the_live_corpus() {
        let tracker = CorpusVersionTracker::new();
        tracker.advance();
        let mut r = Registry::new(tracker.clone(), Language::English);
        r.selected().topic_model.write().install(kmeans_model(1));
        r.add("B");
        assert!(r.switch("B"));
        assert!(r.get(DEFAULT_CONFIGURATION_NAME).unwrap().topic_model.read().is_present());
    }

    #[test]
    fn deleted_configuration_loses_its_model() {
        let mut r = registry();
        let kept = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&kept);
        r.config_switched().subscribe_fn(move |c: &Configuration| {
            if c.name() == DEFAULT_CONFIGURATION_NAME {
                *sink.lock() = Some(c.clone());
            }
        });
        r.add("B");
        assert!(r.switch(DEFAULT_CONFIGURATION_NAME));
        r.selected().topic_model.write().install(kmeans_model(0));
        let handle = kept.lock().clone().unwrap();
        assert!(handle.topic_model.read().is_present());

        assert!(r.delete(DEFAULT_CONFIGURATION_NAME));
        assert!(!handle.topic_model.read().is_present());
        assert_eq!(r.selected_name(), "B");
    }

    #[test]
    fn add_delete_sequences_keep_invariants() {
        let mut r = registry();
        let names = ["A", "B", "C", "D"];
        for round in 0..20usize {
            let name = names[round % names.len()];
            if round % 3 == 0 {
                r.delete(name);
            } else {
                r.add(name);
            }
            assert!(!r.is_empty());
            assert!(r.get(r.selected_name()).is_some());
        }
    }

    #[test]
    fn replace_all_validates_before_mutating() {
        let mut r = registry();
        let a = Configuration::new("A", Language::English);
        let a2 = Configuration::new("A", Language::English);
        assert!(!r.replace_all(vec![a.clone(), a2], "A"));
        assert!(!r.replace_all(vec![a.clone()], "missing"));
        assert!(!r.replace_all(vec![], "A"));
        assert_eq!(r.names(), vec![DEFAULT_CONFIGURATION_NAME]);

        assert!(r.replace_all(vec![a, Configuration::new("B", Language::German)], "B"));
        assert_eq!(r.names(), vec!["A", "B"]);
        assert_eq!(r.selected_name(), "B");
        assert!(r.selected().stopwords.read().contains("und"));
    }
}
