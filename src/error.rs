use crate::{model::Algorithm, runner::Capability};

/// Failures reported by analysis runner operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RunnerError {
    /// `topic_id` is outside `[0, topic_count)`
    #[error("topic {topic_id} is out of range, the runner has {topic_count} topics")]
    OutOfRange { topic_id: usize, topic_count: usize },

    /// Document handle does not belong to the corpus the runner was trained on
    #[error("document {document} is out of range, the runner was trained on {document_count} documents")]
    UnknownDocument { document: usize, document_count: usize },

    /// Optional operation requested on a runner variant that lacks it
    #[error("the {runner} runner does not support {capability}")]
    UnsupportedCapability {
        runner: Algorithm,
        capability: Capability,
    },

    #[error("candidate topic count {requested} is invalid, it must be at least 1")]
    InvalidTopicCount { requested: usize },
}

/// Failures of a training request
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrainError {
    /// A training run for this configuration has not completed yet
    #[error("configuration \"{config}\" already has a training run in flight")]
    AlreadyRunning { config: String },

    #[error("no configuration named \"{config}\"")]
    UnknownConfiguration { config: String },

    #[error("the corpus contains no documents, import documents before training")]
    EmptyCorpus,

    #[error("no terms left after stopword filtering")]
    EmptyVocabulary,

    #[error("invalid model parameters: {}", .0.join("; "))]
    InvalidParameters(Vec<String>),

    /// The background worker went away without reporting
    #[error("training worker disconnected before reporting a result")]
    WorkerDisconnected,
}

/// Failures while serving a visualization
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewError {
    #[error("the active configuration has no trained topic model")]
    NoRunner,

    #[error("no view named \"{view}\"")]
    UnknownView { view: String },

    /// The view is per topic and was asked for without one
    #[error("view \"{view}\" needs a topic index")]
    MissingKey { view: String },

    #[error("view \"{view}\" is not offered for the {runner} runner")]
    NotOffered { view: String, runner: Algorithm },

    #[error(transparent)]
    Runner(#[from] RunnerError),
}

/// Failures of settings persistence
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings could not be encoded: {0}")]
    Encode(String),

    /// The document was rejected; the workspace was left unchanged
    #[error("settings rejected: {}", .problems.join("; "))]
    Rejected { problems: Vec<String> },
}

impl SettingsError {
    /// Human readable problem list
    pub fn problems(&self) -> Vec<String> {
        match self {
            SettingsError::Rejected { problems } => problems.clone(),
            other => vec![other.to_string()],
        }
    }
}
