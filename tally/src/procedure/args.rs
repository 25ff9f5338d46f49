//! Flat argument vector passed to every procedure.
//!
//! Layout: `[head, n, token_1 .. token_n, count_1 .. count_n]` where `head` is
//! the label for `train`/`untrain` and the correction constant for
//! `scores`/`classify`. `flush` takes an empty vector.

use crate::error::Error;
use crate::tokenizer::TokenCounts;

pub fn encode(head: &str, tokens: &TokenCounts) -> Vec<String> {
    let mut args = Vec::with_capacity(2 + tokens.len() * 2);
    args.push(head.to_string());
    args.push(tokens.len().to_string());
    args.extend(tokens.keys().cloned());
    args.extend(tokens.values().map(|count| count.to_string()));
    args
}

pub fn encode_label(label: &str, tokens: &TokenCounts) -> Vec<String> {
    encode(label, tokens)
}

pub fn encode_correction(correction: f64, tokens: &TokenCounts) -> Vec<String> {
    encode(&correction.to_string(), tokens)
}

/// Splits an argument vector into its head and token counts
pub fn decode(args: &[String]) -> Result<(&str, TokenCounts), Error> {
    let (head, rest) = args
        .split_first()
        .ok_or_else(|| invalid("argument vector is empty"))?;
    let (len, rest) = rest
        .split_first()
        .ok_or_else(|| invalid("token count is missing"))?;
    let len = len
        .parse::<usize>()
        .map_err(|_| invalid(format!("token count \"{len}\" is not a number")))?;

    if len.checked_mul(2) != Some(rest.len()) {
        return Err(invalid(format!(
            "expected {} tokens and counts, found {} values",
            len,
            rest.len()
        )));
    }

    let (tokens, counts) = rest.split_at(len);
    let mut map = TokenCounts::with_capacity(len);
    for (token, count) in tokens.iter().zip(counts) {
        let count = count
            .parse::<i64>()
            .map_err(|_| invalid(format!("count \"{count}\" for \"{token}\" is not a number")))?;
        if count <= 0 {
            return Err(invalid(format!("count for \"{token}\" must be positive")));
        }
        let total = map.entry(token.clone()).or_insert(0);
        *total = total
            .checked_add(count)
            .ok_or_else(|| invalid(format!("count for \"{token}\" overflows")))?;
    }

    Ok((head.as_str(), map))
}

pub fn decode_label(args: &[String]) -> Result<(String, TokenCounts), Error> {
    let (label, tokens) = decode(args)?;
    if label.is_empty() {
        return Err(invalid("label cannot be empty"));
    }
    Ok((label.to_string(), tokens))
}

pub fn decode_correction(args: &[String]) -> Result<(f64, TokenCounts), Error> {
    let (head, tokens) = decode(args)?;
    let correction = head
        .parse::<f64>()
        .map_err(|_| invalid(format!("correction \"{head}\" is not a number")))?;
    if !is_valid_correction(correction) {
        return Err(invalid("correction must be a positive normal number"));
    }
    Ok((correction, tokens))
}

/// Finite, positive and not subnormal
pub fn is_valid_correction(correction: f64) -> bool {
    correction.is_finite() && correction >= f64::MIN_POSITIVE
}

fn invalid<S: Into<String>>(reason: S) -> Error {
    Error::InvalidArguments(reason.into())
}
