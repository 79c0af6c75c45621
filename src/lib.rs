/// This crate is a configuration-scoped state core for topic modeling.
pub mod controller;
pub mod corpus;
pub mod error;
pub mod event;
pub mod logging;
pub mod model;
pub mod runner;
pub mod settings;
pub mod utils;
pub mod visualization;
pub mod workspace;

/// Workspace
/// The top-level struct of this crate, holding everything a topic modeling
/// session needs.
///
/// Internally, it holds:
/// - The imported corpus and its version tracker
/// - The configuration registry
/// - The parameter, stopword, synonym and topic runner controllers
/// - The standard view catalog with its caches
///
/// Selecting, adding or deleting a configuration goes through the workspace;
/// every controller is re-pointed to the newly selected configuration before
/// any subscriber is notified.
///
/// Training runs in the background on the rayon pool and is committed with
/// `poll_training` or `wait_training`.
pub use workspace::Workspace;

/// Configuration Registry
/// Ordered, uniquely named configurations with exactly one selected.
///
/// The registry is never empty. Deleting the selected configuration falls
/// back to the one before it, or the one after it when it was first.
///
/// # Events
/// - `list_changed`: full ordered name list after add/delete
/// - `config_switched`: the newly selected configuration
pub use model::Registry;

/// Configuration
/// A named bundle of model parameters, stopwords, synonyms and at most one
/// trained topic model. Configurations never share sub-state.
pub use model::{Configuration, ModelParameters, Algorithm, Language, StopwordSet, SynonymTable};

/// Topic Model
/// A trained result stamped with the corpus version it was trained on.
/// `TopicModelSlot` is either `Absent` or `Present`; a model trained on a
/// superseded corpus is discarded before anyone can observe it.
pub use model::{TopicModel, TopicModelSlot};

/// Analysis Runner
/// Live handle to a trained topic model, closed over three variants:
/// - LDA: document topics, correlation matrix, topic coherence
/// - NMF: document topics, correlation matrix
/// - k-means: document topics
///
/// Use `supports` to ask for a capability, or the `as_*` / `require_*`
/// accessors to reach the optional operations.
pub use runner::{AnalysisRunner, Capability, CapabilitySet, TopicRunner, DocumentTopics, CorrelationMatrix, TopicCoherence, TopTerms, supports};

/// Corpus
/// Imported documents plus the monotonically increasing version tracker used
/// for staleness checks.
pub use corpus::{Corpus, CorpusVersionTracker, Document, DocumentId};

/// Event Channel
/// Synchronous publish/subscribe primitive. Subscribers run in subscription
/// order on the publishing thread, over a snapshot of the subscriber list.
pub use event::EventChannel;

/// Visualization
/// Lazily computed views cached per optional topic key. Every cache is
/// cleared whenever the active runner changes.
pub use visualization::{ResultCache, VisualizationDefinition, CachedVisualization, View, ViewCatalog};

/// Persisted Settings
/// JSON or CBOR documents describing every configuration. Loading validates
/// the whole document first and leaves the workspace untouched on rejection.
pub use settings::{Settings, SettingsFormat};

/// Error types
pub use error::{RunnerError, TrainError, ViewError, SettingsError};
