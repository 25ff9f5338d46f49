//! Read-only scoring shared by `scores` and `classify`.
//!
//! For every label with a positive tally the score of a query is
//! `sum(ln(count_or_correction / tally))` over the distinct query tokens,
//! where a missing or zero count is replaced by the correction constant.

use crate::error::Error;
use crate::keyspace::Keyspace;
use crate::namespace::Namespace;

struct LabelScore {
    label: String,
    score: f64,
    /// At least one query token has a positive count under this label
    matched: bool,
}

fn accumulate<'a, K, I>(
    keyspace: &K,
    namespace: &Namespace,
    tokens: I,
    correction: f64,
) -> Result<Vec<LabelScore>, Error>
where
    K: Keyspace + ?Sized,
    I: IntoIterator<Item = &'a String>,
{
    let tokens = tokens.into_iter().collect::<Vec<_>>();
    let mut results = vec![];

    for label in keyspace.members(&namespace.labels_key())? {
        let tally = keyspace
            .counter(&namespace.tally_key(&label))?
            .unwrap_or_default();
        if tally <= 0 {
            tracing::warn!(%namespace, %label, tally, "skipping label without a positive tally");
            continue;
        }

        let table_key = namespace.table_key(&label);
        let log_tally = (tally as f64).ln();
        let mut score = 0.0;
        let mut matched = false;
        for token in tokens.iter() {
            let count = match keyspace.field(&table_key, token)? {
                Some(count) if count > 0 => {
                    matched = true;
                    count as f64
                }
                _ => correction,
            };
            score += count.ln() - log_tally;
        }

        results.push(LabelScore {
            label,
            score,
            matched,
        });
    }

    Ok(results)
}

/// Score of every active label, ordered by label
pub fn scores<'a, K, I>(
    keyspace: &K,
    namespace: &Namespace,
    tokens: I,
    correction: f64,
) -> Result<Vec<(String, f64)>, Error>
where
    K: Keyspace + ?Sized,
    I: IntoIterator<Item = &'a String>,
{
    Ok(accumulate(keyspace, namespace, tokens, correction)?
        .into_iter()
        .map(|entry| (entry.label, entry.score))
        .collect())
}

/// Highest scoring label.
///
/// `None` when no active label holds any of the query tokens, even though
/// [`scores`] still ranks the labels on the correction constant alone.
/// Otherwise the argmax of [`scores`], with equal scores resolving to the
/// lexicographically smallest label.
pub fn classify<'a, K, I>(
    keyspace: &K,
    namespace: &Namespace,
    tokens: I,
    correction: f64,
) -> Result<Option<String>, Error>
where
    K: Keyspace + ?Sized,
    I: IntoIterator<Item = &'a String>,
{
    let results = accumulate(keyspace, namespace, tokens, correction)?;
    if !results.iter().any(|entry| entry.matched) {
        return Ok(None);
    }

    let mut best: Option<LabelScore> = None;
    for entry in results {
        let better = best
            .as_ref()
            .map_or(true, |current| entry.score > current.score);
        if better {
            best = Some(entry);
        }
    }
    Ok(best.map(|entry| entry.label))
}

#[cfg(test)]
mod test {
    use super::{classify, scores};
    use crate::keyspace::{Keyspace, MemoryKeyspace};
    use crate::namespace::Namespace;
    use crate::procedure::train;
    use crate::tokenizer::TokenCounts;

    const CORRECTION: f64 = 0.1;

    fn tokens(words: &[&str]) -> TokenCounts {
        let mut counts = TokenCounts::new();
        for word in words {
            *counts.entry(word.to_string()).or_insert(0) += 1;
        }
        counts
    }

    fn trained(pairs: &[(&str, &[&str])]) -> anyhow::Result<(MemoryKeyspace, Namespace)> {
        let namespace = Namespace::new("score:")?;
        let mut keyspace = MemoryKeyspace::new();
        for (label, words) in pairs {
            train(&mut keyspace, &namespace, label, &tokens(words))?;
        }
        Ok((keyspace, namespace))
    }

    #[test]
    fn spam_beats_ham() -> anyhow::Result<()> {
        let (keyspace, namespace) =
            trained(&[("ham", &["good", "message"]), ("spam", &["nigeria", "help"])])?;
        let query = tokens(&["nigeria", "help"]);

        let result = scores(&keyspace, &namespace, query.keys(), CORRECTION)?;
        assert_eq!(result.len(), 2);
        let (ham, spam) = (&result[0], &result[1]);
        assert_eq!(ham.0, "ham");
        assert_eq!(spam.0, "spam");
        assert!(spam.1 > ham.1);

        let expected_ham = 2.0 * (CORRECTION / 2.0).ln();
        let expected_spam = 2.0 * (1.0f64 / 2.0).ln();
        assert!((ham.1 - expected_ham).abs() < 1e-9);
        assert!((spam.1 - expected_spam).abs() < 1e-9);

        assert_eq!(
            classify(&keyspace, &namespace, query.keys(), CORRECTION)?,
            Some("spam".to_string())
        );
        Ok(())
    }

    #[test]
    fn no_labels_no_result() -> anyhow::Result<()> {
        let (keyspace, namespace) = trained(&[])?;
        let query = tokens(&["anything"]);
        assert!(scores(&keyspace, &namespace, query.keys(), CORRECTION)?.is_empty());
        assert_eq!(classify(&keyspace, &namespace, query.keys(), CORRECTION)?, None);
        Ok(())
    }

    #[test]
    fn no_shared_tokens_no_classification() -> anyhow::Result<()> {
        let (keyspace, namespace) = trained(&[("ham", &["good"]), ("spam", &["help"])])?;
        let query = tokens(&["unrelated"]);
        assert_eq!(scores(&keyspace, &namespace, query.keys(), CORRECTION)?.len(), 2);
        assert_eq!(classify(&keyspace, &namespace, query.keys(), CORRECTION)?, None);
        assert_eq!(
            classify(&keyspace, &namespace, TokenCounts::new().keys(), CORRECTION)?,
            None
        );
        Ok(())
    }

    #[test]
    fn ties_resolve_to_smallest_label() -> anyhow::Result<()> {
        let (keyspace, namespace) =
            trained(&[("zeta", &["shared"]), ("alpha", &["shared"]), ("mid", &["shared"])])?;
        let query = tokens(&["shared"]);
        assert_eq!(
            classify(&keyspace, &namespace, query.keys(), CORRECTION)?,
            Some("alpha".to_string())
        );
        Ok(())
    }

    #[test]
    fn more_evidence_does_not_lower_score() -> anyhow::Result<()> {
        let (mut keyspace, namespace) =
            trained(&[("ham", &["good", "day"]), ("spam", &["win", "good"])])?;
        let query = tokens(&["win"]);
        let before = scores(&keyspace, &namespace, query.keys(), CORRECTION)?;

        train(&mut keyspace, &namespace, "spam", &tokens(&["win", "win"]))?;
        let after = scores(&keyspace, &namespace, query.keys(), CORRECTION)?;

        assert_eq!(before[1].0, "spam");
        assert!(after[1].1 >= before[1].1);
        Ok(())
    }

    #[test]
    fn labels_without_positive_tally_are_skipped() -> anyhow::Result<()> {
        let (mut keyspace, namespace) = trained(&[("ham", &["good"])])?;
        for (label, tally) in [("drained", 0), ("negative", -3)] {
            keyspace.add_member(&namespace.labels_key(), label)?;
            keyspace.increment_field(&namespace.table_key(label), "good", 5)?;
            keyspace.set_counter(&namespace.tally_key(label), tally)?;
        }

        let query = tokens(&["good"]);
        let result = scores(&keyspace, &namespace, query.keys(), CORRECTION)?;
        assert_eq!(
            result.iter().map(|(label, _)| label.as_str()).collect::<Vec<_>>(),
            vec!["ham"]
        );
        assert_eq!(
            classify(&keyspace, &namespace, query.keys(), CORRECTION)?,
            Some("ham".to_string())
        );

        let unrelated = tokens(&["unrelated"]);
        assert_eq!(classify(&keyspace, &namespace, unrelated.keys(), CORRECTION)?, None);
        Ok(())
    }

    #[test]
    fn huge_tally_keeps_scores_finite() -> anyhow::Result<()> {
        let (mut keyspace, namespace) = trained(&[("ham", &["good"])])?;
        keyspace.increment_field(&namespace.table_key("ham"), "good", i64::MAX - 1)?;
        keyspace.set_counter(&namespace.tally_key("ham"), i64::MAX)?;

        let query = tokens(&["unseen", "other"]);
        let result = scores(&keyspace, &namespace, query.keys(), f64::MIN_POSITIVE)?;
        assert!(result[0].1.is_finite());
        assert!(result[0].1 < 0.0);
        Ok(())
    }

    #[test]
    fn zero_count_uses_correction() -> anyhow::Result<()> {
        let (mut keyspace, namespace) = trained(&[("ham", &["good", "good"])])?;
        keyspace.increment_field(&namespace.table_key("ham"), "zero", 0)?;
        let query = tokens(&["zero"]);
        let result = scores(&keyspace, &namespace, query.keys(), CORRECTION)?;
        assert!((result[0].1 - (CORRECTION / 2.0).ln()).abs() < 1e-9);
        assert_eq!(classify(&keyspace, &namespace, query.keys(), CORRECTION)?, None);
        Ok(())
    }
}
