//! Secret-leak heuristic for diff text.
//!
//! Two stacked signals: assignment-like patterns whose key resembles an API
//! credential (strong, cheap), and high-entropy token runs that catch opaque
//! secrets the patterns miss, e.g. base64 blobs with no recognizable key
//! name (weak, corroborating). The combining weights are tunable constants.

use once_cell::sync::Lazy;
use regex::Regex;

/// Weight per distinct pattern rule that matched.
const PATTERN_WEIGHT: f64 = 0.2;

/// Weight per high-entropy token run.
const ENTROPY_WEIGHT: f64 = 0.1;

/// Bits-per-character threshold above which a token counts as opaque.
const ENTROPY_THRESHOLD: f64 = 3.6;

/// Assignment-like constructs where the key resembles a credential name and
/// the value is a long alphanumeric run. Illustrative, not exhaustive.
static SECRET_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![Regex::new(r#"(?i)(api[-_]?key|secret|token)\s*[:=]\s*['"]?[A-Za-z0-9_\-]{16,}"#)
        .expect("secret pattern is valid")]
});

/// Maximal alphanumeric/hyphen/underscore runs long enough to be a token.
static TOKEN_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9_\-]{20,}").expect("token-run pattern is valid"));

/// Score free text for secret-leak risk. Total function: any input,
/// including the empty string, yields a score in [0.0, 1.0].
pub fn score_leak(text: &str) -> f64 {
    let hits = SECRET_PATTERNS.iter().filter(|rgx| rgx.is_match(text)).count();

    let high_entropy = TOKEN_RUN
        .find_iter(text)
        .filter(|m| shannon_entropy(m.as_str()) > ENTROPY_THRESHOLD)
        .count();

    (PATTERN_WEIGHT * hits as f64 + ENTROPY_WEIGHT * high_entropy as f64).clamp(0.0, 1.0)
}

/// Shannon entropy (base 2) of the character-frequency distribution.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }
    let mut counts = std::collections::HashMap::new();
    for c in s.chars() {
        *counts.entry(c).or_insert(0usize) += 1;
    }
    let len = s.chars().count() as f64;
    counts
        .values()
        .map(|&c| {
            let p = c as f64 / len;
            -p * p.log2()
        })
        .sum()
}
