use std::{sync::Arc, time::Instant};

use tracing::info;

use crate::{
    corpus::{term::EncodedCorpus, Document},
    error::TrainError,
    model::{Algorithm, ModelParameters, StopwordSet, SynonymTable, TopicModel},
    runner::{AnalysisRunner, KMeansRunner, LdaRunner, NmfRunner},
};

/// Owned snapshot of everything a training run needs
/// Built on the control thread, consumed on a worker.
#[derive(Debug, Clone)]
pub struct TrainingInput {
    /// filtered token lists, aligned with the corpus document order
    pub documents: Vec<Vec<String>>,
    pub parameters: ModelParameters,
    pub corpus_version: u64,
}

impl TrainingInput {
    /// Map synonyms to their canonical term, then drop stopwords
    pub fn assemble(
        documents: &[Document],
        stopwords: &StopwordSet,
        synonyms: &SynonymTable,
        parameters: ModelParameters,
        corpus_version: u64,
    ) -> Self {
        let documents = documents
            .iter()
            .map(|doc| {
                doc.tokens
                    .iter()
                    .map(|t| synonyms.canonical(t))
                    .filter(|t| !stopwords.contains(t))
                    .map(str::to_string)
                    .collect()
            })
            .collect();
        Self {
            documents,
            parameters,
            corpus_version,
        }
    }
}

/// Train the backend selected by `input.parameters.algorithm`
pub fn train(input: TrainingInput) -> Result<TopicModel, TrainError> {
    let problems = input.parameters.validate();
    if !problems.is_empty() {
        return Err(TrainError::InvalidParameters(problems));
    }
    if input.documents.is_empty() {
        return Err(TrainError::EmptyCorpus);
    }
    let corpus = Arc::new(EncodedCorpus::encode(&input.documents));
    if corpus.vocabulary.is_empty() {
        return Err(TrainError::EmptyVocabulary);
    }

    let started = Instant::now();
    let params = &input.parameters;
    let runner = match params.algorithm {
        Algorithm::Lda => AnalysisRunner::Lda(LdaRunner::train(Arc::clone(&corpus), params)),
        Algorithm::Nmf => AnalysisRunner::Nmf(NmfRunner::train(&corpus, params)),
        Algorithm::KMeans => AnalysisRunner::KMeans(KMeansRunner::train(&corpus, params)),
    };
    info!(
        algorithm = %params.algorithm,
        topics = params.topic_count,
        documents = corpus.doc_num(),
        vocabulary = corpus.vocabulary.len(),
        corpus_version = input.corpus_version,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "topic model trained"
    );
    Ok(TopicModel::new(
        runner,
        input.corpus_version,
        Arc::new(corpus.vocabulary.clone()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::Language, runner::TopicRunner};

    fn doc(tokens: &[&str]) -> Document {
        Document {
            title: String::new(),
            sentences: Vec::new(),
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn assemble_applies_synonyms_before_stopwords() {
        let mut stopwords = StopwordSet::for_language(Language::English);
        stopwords.add_extra("automobile");
        let mut synonyms = SynonymTable::new();
        synonyms.insert("cars", "car");
        synonyms.insert("vehicle", "automobile");

        let input = TrainingInput::assemble(
            &[doc(&["the", "cars", "vehicle", "road"]), doc(&["the"])],
            &stopwords,
            &synonyms,
            ModelParameters::default(),
            4,
        );
        assert_eq!(input.documents, vec![vec!["car", "road"], vec![]]);
        assert_eq!(input.corpus_version, 4);
    }

    #[test]
    fn train_rejects_empty_input() {
        let params = ModelParameters::default();
        let empty = TrainingInput {
            documents: vec![],
            parameters: params.clone(),
            corpus_version: 1,
        };
        assert_eq!(train(empty).unwrap_err(), TrainError::EmptyCorpus);

        let only_stopwords = TrainingInput {
            documents: vec![vec![]],
            parameters: params.clone(),
            corpus_version: 1,
        };
        assert_eq!(train(only_stopwords).unwrap_err(), TrainError::EmptyVocabulary);

        let invalid = TrainingInput {
            documents: vec![vec!["x".to_string()]],
            parameters: ModelParameters {
                topic_count: 0,
                ..params
            },
            corpus_version: 1,
        };
        assert!(matches!(train(invalid), Err(TrainError::InvalidParameters(p)) if p.len() == 1));
    }

    #[test]
    fn train_stamps_corpus_version() {
        for algorithm in Algorithm::ALL {
            let input = TrainingInput {
                documents: vec![
                    vec!["alpha".into(), "beta".into()],
                    vec!["gamma".into(), "delta".into()],
                ],
                parameters: ModelParameters {
                    algorithm,
                    topic_count: 2,
                    iterations: 10,
                    ..ModelParameters::default()
                },
                corpus_version: 7,
            };
            let model = train(input).unwrap();
            assert_eq!(model.used_corpus_version_id(), 7);
            assert_eq!(model.runner().kind(), algorithm);
            assert_eq!(model.runner().topic_count(), 2);
            assert_eq!(model.dictionary().len(), 4);
        }
    }
}
