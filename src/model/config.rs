use std::{fmt, sync::Arc};

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    model::topic_model::TopicModelSlot,
    runner::{Capability, CapabilitySet},
};

/// Sub-state shared between a [`Configuration`] and the controller bound to it
pub type Shared<T> = Arc<RwLock<T>>;

pub const MAX_TOPIC_COUNT: usize = 500;
pub const MAX_ITERATIONS: usize = 10_000;

/// Topic model backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Latent Dirichlet Allocation (collapsed Gibbs sampling)
    Lda,
    /// Non-negative matrix factorization of the TF-IDF matrix
    Nmf,
    /// Spherical k-means over TF-IDF vectors
    KMeans,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::Lda, Algorithm::Nmf, Algorithm::KMeans];

    /// Capabilities of the runner this algorithm produces
    pub const fn capabilities(self) -> CapabilitySet {
        match self {
            Algorithm::Lda => CapabilitySet::of(&[
                Capability::DocumentTopics,
                Capability::CorrelationMatrix,
                Capability::TopicCoherence,
            ]),
            Algorithm::Nmf => {
                CapabilitySet::of(&[Capability::DocumentTopics, Capability::CorrelationMatrix])
            }
            Algorithm::KMeans => CapabilitySet::of(&[Capability::DocumentTopics]),
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "lda" => Some(Algorithm::Lda),
            "nmf" => Some(Algorithm::Nmf),
            "kmeans" | "k-means" => Some(Algorithm::KMeans),
            _ => None,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Algorithm::Lda => "LDA",
            Algorithm::Nmf => "NMF",
            Algorithm::KMeans => "k-means",
        })
    }
}

/// Algorithm choice and hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    pub algorithm: Algorithm,
    pub topic_count: usize,
    pub iterations: usize,
    /// document-topic prior (LDA)
    pub alpha: f64,
    /// topic-term prior (LDA)
    pub beta: f64,
    pub seed: u64,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Lda,
            topic_count: 10,
            iterations: 100,
            alpha: 0.1,
            beta: 0.01,
            seed: 42,
        }
    }
}

impl ModelParameters {
    /// Human readable list of out-of-range values, empty when valid
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !(1..=MAX_TOPIC_COUNT).contains(&self.topic_count) {
            problems.push(format!(
                "topic_count {} is outside 1..={}",
                self.topic_count, MAX_TOPIC_COUNT
            ));
        }
        if !(1..=MAX_ITERATIONS).contains(&self.iterations) {
            problems.push(format!(
                "iterations {} is outside 1..={}",
                self.iterations, MAX_ITERATIONS
            ));
        }
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            problems.push(format!("alpha {} must be a positive number", self.alpha));
        }
        if !(self.beta.is_finite() && self.beta > 0.0) {
            problems.push(format!("beta {} must be a positive number", self.beta));
        }
        problems
    }
}

/// Document language, selects the default base stopword list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    German,
}

impl Language {
    pub fn default_stopwords(self) -> &'static [&'static str] {
        match self {
            Language::English => &[
                "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has",
                "have", "in", "is", "it", "its", "of", "on", "or", "that", "the", "this", "to",
                "was", "were", "will", "with",
            ],
            Language::German => &[
                "aber", "als", "am", "auch", "auf", "aus", "bei", "das", "dass", "dem", "den",
                "der", "des", "die", "ein", "eine", "einer", "es", "ist", "im", "in", "mit",
                "nicht", "oder", "sich", "sie", "und", "von", "wir", "zu",
            ],
        }
    }
}

/// Stopwords: a replaceable base list plus user additions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopwordSet {
    pub base: IndexSet<String>,
    pub extra: IndexSet<String>,
}

impl StopwordSet {
    pub fn for_language(language: Language) -> Self {
        Self {
            base: language.default_stopwords().iter().map(|w| w.to_string()).collect(),
            extra: IndexSet::new(),
        }
    }

    #[inline]
    pub fn contains(&self, word: &str) -> bool {
        self.base.contains(word) || self.extra.contains(word)
    }

    pub fn replace_base<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base = words.into_iter().map(Into::into).collect();
    }

    /// Returns false when the word was already an extra stopword
    pub fn add_extra(&mut self, word: &str) -> bool {
        self.extra.insert(word.to_string())
    }

    pub fn remove_extra(&mut self, word: &str) -> bool {
        self.extra.shift_remove(word)
    }

    pub fn len(&self) -> usize {
        self.base.union(&self.extra).count()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty() && self.extra.is_empty()
    }
}

/// Synonym table mapping a variant to its canonical term
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SynonymTable {
    #[serde(deserialize_with = "crate::utils::serde::unique_map")]
    entries: IndexMap<String, String>,
}

impl SynonymTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `variant` to `canonical`, returning the previous mapping
    pub fn insert(&mut self, variant: &str, canonical: &str) -> Option<String> {
        self.entries.insert(variant.to_string(), canonical.to_string())
    }

    pub fn remove(&mut self, variant: &str) -> Option<String> {
        self.entries.shift_remove(variant)
    }

    /// Canonical form of `term` (the term itself when unmapped)
    #[inline]
    pub fn canonical<'a>(&'a self, term: &'a str) -> &'a str {
        self.entries.get(term).map_or(term, String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Named bundle of independent sub-state
///
/// Cloning yields another handle to the same sub-state; use
/// [`Configuration::fork`] for an independent copy.
#[derive(Debug, Clone)]
pub struct Configuration {
    name: String,
    pub parameters: Shared<ModelParameters>,
    pub stopwords: Shared<StopwordSet>,
    pub synonyms: Shared<SynonymTable>,
    pub topic_model: Shared<TopicModelSlot>,
}

impl Configuration {
    /// Fresh configuration with default sub-state
    pub fn new(name: &str, language: Language) -> Self {
        Self::from_parts(
            name,
            ModelParameters::default(),
            StopwordSet::for_language(language),
            SynonymTable::new(),
        )
    }

    pub fn from_parts(
        name: &str,
        parameters: ModelParameters,
        stopwords: StopwordSet,
        synonyms: SynonymTable,
    ) -> Self {
        Self {
            name: name.to_string(),
            parameters: Arc::new(RwLock::new(parameters)),
            stopwords: Arc::new(RwLock::new(stopwords)),
            synonyms: Arc::new(RwLock::new(synonyms)),
            topic_model: Arc::new(RwLock::new(TopicModelSlot::Absent)),
        }
    }

    /// Independent copy of parameters, stopwords and synonyms under a new name
    /// The trained result is not copied.
    pub fn fork(&self, name: &str) -> Self {
        Self::from_parts(
            name,
            self.parameters.read().clone(),
            self.stopwords.read().clone(),
            self.synonyms.read().clone(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when both handles point at the same sub-state
    pub fn same_as(&self, other: &Configuration) -> bool {
        Arc::ptr_eq(&self.topic_model, &other.topic_model)
    }
}
