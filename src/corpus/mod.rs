pub mod preprocess;
pub mod term;
pub mod tfidf;

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::corpus::preprocess::Preprocessor;

/// Monotonically increasing corpus version
///
/// Cloning shares the counter. Advanced exactly once per completed import;
/// consumers only compare values for equality.
#[derive(Debug, Clone, Default)]
pub struct CorpusVersionTracker {
    version: Arc<AtomicU64>,
}

impl CorpusVersionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live version id
    #[inline]
    pub fn current(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Bump the version, returning the new value
    pub(crate) fn advance(&self) -> u64 {
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// Handle to a document of the current import
/// Index into the corpus document list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub usize);

/// Preprocessed source document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub sentences: Vec<String>,
    pub tokens: Vec<String>,
}

/// Read side of the corpus collaborator
pub trait CorpusProvider {
    fn current_version_id(&self) -> u64;
    fn documents(&self) -> &[Document];
}

/// Imported documents plus their version tracker
#[derive(Debug, Default)]
pub struct Corpus {
    documents: Vec<Document>,
    tracker: CorpusVersionTracker,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker shared with anything that needs staleness checks
    pub fn tracker(&self) -> CorpusVersionTracker {
        self.tracker.clone()
    }

    /// Replace all documents with a fresh import
    /// Each `(title, text)` is split into sentences and tokenized by `preprocessor`.
    /// Returns the new corpus version.
    pub fn import<I, S, T>(&mut self, documents: I, preprocessor: &dyn Preprocessor) -> u64
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: AsRef<str>,
    {
        self.documents = documents
            .into_iter()
            .map(|(title, text)| {
                let sentences = preprocessor.split_sentences(text.as_ref());
                let tokens = sentences
                    .iter()
                    .flat_map(|s| preprocessor.tokenize(s))
                    .collect();
                Document {
                    title: title.into(),
                    sentences,
                    tokens,
                }
            })
            .collect();
        let version = self.tracker.advance();
        info!(version, documents = self.documents.len(), "corpus imported");
        version
    }

    pub fn doc_num(&self) -> usize {
        self.documents.len()
    }

    pub fn get(&self, id: DocumentId) -> Option<&Document> {
        self.documents.get(id.0)
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl CorpusProvider for Corpus {
    fn current_version_id(&self) -> u64 {
        self.tracker.current()
    }

    fn documents(&self) -> &[Document] {
        &self.documents
    }
}
