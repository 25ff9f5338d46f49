use indexmap::IndexMap;

use crate::error::Error;

/// Mapping of token to occurrence count, in first-seen order
pub type TokenCounts = IndexMap<String, i64>;

/// Turns an input item into a [`TokenCounts`] mapping.
///
/// Implementations must be pure and must only produce positive counts. The
/// classifier checks the output with [`validate`] before touching the store.
pub trait Tokenizer: Send + Sync {
    type Item: ?Sized;

    fn tokenize(&self, item: &Self::Item) -> TokenCounts;
}

/// Checks that every count produced by a tokenizer is positive
pub fn validate(tokens: &TokenCounts) -> Result<(), Error> {
    match tokens.iter().find(|(_, count)| **count <= 0) {
        Some((token, count)) => Err(Error::TokenizerContract {
            token: token.clone(),
            count: *count,
        }),
        None => Ok(()),
    }
}

/// Lowercases text and splits it on anything that is not alphanumeric
#[derive(Debug, Default, Clone, Copy)]
pub struct WordTokenizer {
    min_length: usize,
}

impl WordTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop tokens shorter than `min_length` characters
    pub fn with_min_length(min_length: usize) -> Self {
        WordTokenizer { min_length }
    }
}

impl Tokenizer for WordTokenizer {
    type Item = str;

    fn tokenize(&self, item: &str) -> TokenCounts {
        let mut counts = TokenCounts::new();
        for word in item
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty() && word.chars().count() >= self.min_length)
        {
            *counts.entry(word.to_lowercase()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod test {
    use super::{validate, TokenCounts, Tokenizer, WordTokenizer};
    use crate::error::Error;

    #[test]
    fn counts_words() {
        let tokens = WordTokenizer::new().tokenize("Help me, help NIGERIA!");
        assert_eq!(tokens.get("help"), Some(&2));
        assert_eq!(tokens.get("me"), Some(&1));
        assert_eq!(tokens.get("nigeria"), Some(&1));
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens.keys().next().map(String::as_str), Some("help"));
    }

    #[test]
    fn min_length_filters_short_tokens() {
        let tokens = WordTokenizer::with_min_length(3).tokenize("a an the quick");
        assert_eq!(tokens.len(), 2);
        assert!(tokens.contains_key("the"));
        assert!(tokens.contains_key("quick"));
    }

    #[test]
    fn empty_input_has_no_tokens() {
        assert!(WordTokenizer::new().tokenize("  ,,  ").is_empty());
    }

    #[test]
    fn validate_rejects_non_positive_counts() {
        let mut tokens = TokenCounts::new();
        tokens.insert("good".into(), 1);
        assert!(validate(&tokens).is_ok());

        tokens.insert("bad".into(), -2);
        match validate(&tokens) {
            Err(Error::TokenizerContract { token, count }) => {
                assert_eq!(token, "bad");
                assert_eq!(count, -2);
            }
            other => panic!("unexpected result: {other:?}"),
        }

        tokens.insert("bad".into(), 0);
        assert!(validate(&tokens).is_err());
    }
}
