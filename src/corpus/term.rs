use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Term dictionary of a training run
/// The index of a term is its id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    terms: IndexSet<String>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `term`, inserting it if unseen
    pub fn intern(&mut self, term: &str) -> usize {
        match self.terms.get_index_of(term) {
            Some(id) => id,
            None => self.terms.insert_full(term.to_string()).0,
        }
    }

    pub fn id(&self, term: &str) -> Option<usize> {
        self.terms.get_index_of(term)
    }

    pub fn term(&self, id: usize) -> Option<&str> {
        self.terms.get_index(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Documents encoded as term id sequences
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedCorpus {
    pub vocabulary: Vocabulary,
    pub documents: Vec<Vec<usize>>,
}

impl EncodedCorpus {
    /// Build the vocabulary in first-seen order and encode every document
    pub fn encode<T>(documents: &[Vec<T>]) -> Self
    where
        T: AsRef<str>,
    {
        let mut vocabulary = Vocabulary::new();
        let documents = documents
            .iter()
            .map(|doc| {
                doc.iter()
                    .map(|t| vocabulary.intern(t.as_ref()))
                    .collect()
            })
            .collect();
        Self {
            vocabulary,
            documents,
        }
    }

    pub fn doc_num(&self) -> usize {
        self.documents.len()
    }

    /// Number of documents containing each term id
    pub fn document_frequency(&self) -> Vec<u64> {
        let mut df = vec![0_u64; self.vocabulary.len()];
        let mut seen = vec![usize::MAX; self.vocabulary.len()];
        for (d, doc) in self.documents.iter().enumerate() {
            for &w in doc {
                if seen[w] != d {
                    seen[w] = d;
                    df[w] += 1;
                }
            }
        }
        df
    }
}
