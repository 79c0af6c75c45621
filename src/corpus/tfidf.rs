use rayon::prelude::*;

use crate::corpus::term::EncodedCorpus;

/// Dense TF-IDF weighting of an encoded corpus
///
/// tf  = count / document length
/// idf = ln((N + 1) / (df + 1)) + 1
///
/// Rows are documents, columns are term ids. Empty documents yield zero rows.
pub fn tfidf_matrix(corpus: &EncodedCorpus) -> Vec<Vec<f64>> {
    let idf = idf_vec(corpus);
    let vocab_len = corpus.vocabulary.len();
    corpus
        .documents
        .par_iter()
        .map(|doc| {
            let mut row = vec![0.0; vocab_len];
            if doc.is_empty() {
                return row;
            }
            for &w in doc {
                row[w] += 1.0;
            }
            let total = doc.len() as f64;
            row.iter_mut()
                .zip(idf.iter())
                .for_each(|(v, idf)| *v = *v / total * idf);
            row
        })
        .collect()
}

/// IDF per term id
pub fn idf_vec(corpus: &EncodedCorpus) -> Vec<f64> {
    let doc_num = corpus.doc_num() as f64;
    corpus
        .document_frequency()
        .into_iter()
        .map(|df| ((doc_num + 1.0) / (df as f64 + 1.0)).ln() + 1.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rare_terms_weigh_more() {
        let docs = vec![vec!["common", "rare"], vec!["common", "other"], vec![]];
        let enc = EncodedCorpus::encode(&docs);
        let m = tfidf_matrix(&enc);
        assert_eq!(m.len(), 3);
        let common = enc.vocabulary.id("common").unwrap();
        let rare = enc.vocabulary.id("rare").unwrap();
        assert!(m[0][rare] > m[0][common]);
        assert!(m[0].iter().all(|v| *v >= 0.0));
        assert!(m[2].iter().all(|v| *v == 0.0));
    }
}
