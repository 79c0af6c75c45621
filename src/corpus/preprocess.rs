/// Text preprocessing collaborator
///
/// Lemmatization and language specific rules live behind this trait;
/// the core only needs sentences and tokens.
pub trait Preprocessor: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
    fn split_sentences(&self, text: &str) -> Vec<String>;
}

/// Lowercasing tokenizer splitting on anything that is not alphanumeric
#[derive(Debug, Clone)]
pub struct SimplePreprocessor {
    /// tokens shorter than this (in chars) are dropped
    pub min_token_len: usize,
}

impl Default for SimplePreprocessor {
    fn default() -> Self {
        Self { min_token_len: 2 }
    }
}

impl Preprocessor for SimplePreprocessor {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() >= self.min_token_len)
            .map(str::to_lowercase)
            .collect()
    }

    fn split_sentences(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut buf = String::new();
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            buf.push(c);
            let boundary = matches!(c, '.' | '!' | '?' | '\n')
                && chars.peek().map_or(true, |n| n.is_whitespace());
            if boundary {
                let sentence = buf.trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                buf.clear();
            }
        }
        let rest = buf.trim();
        if !rest.is_empty() {
            sentences.push(rest.to_string());
        }
        sentences
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_lowercases_and_drops_short_tokens() {
        let p = SimplePreprocessor::default();
        assert_eq!(p.tokenize("A Quick, brown-Fox!"), vec!["quick", "brown", "fox"]);
        let p = SimplePreprocessor { min_token_len: 1 };
        assert_eq!(p.tokenize("a b"), vec!["a", "b"]);
    }

    #[test]
    fn split_sentences_keeps_decimal_points() {
        let p = SimplePreprocessor::default();
        assert_eq!(
            p.split_sentences("Pi is 3.14. Really? Yes!\nNew line"),
            vec!["Pi is 3.14.", "Really?", "Yes!", "New line"]
        );
        assert!(p.split_sentences("   ").is_empty());
    }
}
