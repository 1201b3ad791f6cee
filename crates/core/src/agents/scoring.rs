//! Relevance scoring strategies.
//!
//! Scoring is a pluggable strategy per agent. The router only ever sees
//! the final number, so a different strategy can be dropped in without
//! touching selection.

use dk_protocol::{AgentConfig, RequestContext};
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

/// Score given to an agent for its first keyword hit.
pub const FIRST_MATCH_SCORE: f64 = 0.6;

/// Bonus for every matched trigger.
pub const TRIGGER_WEIGHT: f64 = 0.1;

/// Bonus for every matched tag.
pub const TAG_WEIGHT: f64 = 0.05;

/// Clamp a raw score into `[0, 1]`. NaN becomes 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// A relevance strategy.
pub trait Scorer: Send + Sync {
    fn score(&self, message: &str, context: &RequestContext) -> f64;
}

/// Lowercase and split on anything that is not part of a word, then join
/// the tokens back with single spaces and pad both ends. Matching a
/// normalized keyword against a normalized message with this padding gives
/// whole-word and whole-phrase matches for free.
fn normalize(text: &str) -> String {
    let tokens: Vec<String> = text
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#' || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect();
    format!(" {} ", tokens.join(" "))
}

/// Trigger/tag keyword scorer.
///
/// No hits gives `base_score`. Otherwise the score is
/// `0.6 + 0.1 * trigger_hits + 0.05 * tag_hits`, clamped to 1.0.
/// Single-word keywords match whole words and multi-word keywords match as
/// phrases, both case-insensitively.
#[derive(Debug, Clone)]
pub struct KeywordScorer {
    triggers: Vec<String>,
    tags: Vec<String>,
    base_score: f64,
}

impl KeywordScorer {
    pub fn new<T, G>(triggers: T, tags: G, base_score: f64) -> Self
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        G: IntoIterator,
        G::Item: AsRef<str>,
    {
        Self {
            triggers: Self::prepare(triggers),
            tags: Self::prepare(tags),
            base_score,
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(config.triggers.iter(), config.tags.iter(), config.base_score)
    }

    fn prepare<I, S>(keywords: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        keywords
            .into_iter()
            .map(|k| normalize(k.as_ref()))
            .filter(|k| !k.trim().is_empty() && seen.insert(k.clone()))
            .collect()
    }

    /// Number of triggers and tags found in `message`.
    pub fn hits(&self, message: &str) -> (usize, usize) {
        let haystack = normalize(message);
        let count = |keywords: &[String]| keywords.iter().filter(|k| haystack.contains(k.as_str())).count();
        (count(&self.triggers), count(&self.tags))
    }
}

impl Scorer for KeywordScorer {
    fn score(&self, message: &str, _context: &RequestContext) -> f64 {
        let (trigger_hits, tag_hits) = self.hits(message);
        if trigger_hits == 0 && tag_hits == 0 {
            return clamp_score(self.base_score);
        }
        clamp_score(FIRST_MATCH_SCORE + TRIGGER_WEIGHT * trigger_hits as f64 + TAG_WEIGHT * tag_hits as f64)
    }
}

/// Weighted regex heuristics. The score is the sum of the weights of
/// every pattern that matches.
#[derive(Debug, Clone, Default)]
pub struct PatternScorer {
    patterns: Vec<(Regex, f64)>,
}

impl PatternScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a case-insensitive pattern.
    ///
    /// # Errors
    ///
    /// Returns the regex compile error for an invalid pattern.
    pub fn with_pattern(mut self, pattern: &str, weight: f64) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        self.patterns.push((regex, weight));
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Scorer for PatternScorer {
    fn score(&self, message: &str, _context: &RequestContext) -> f64 {
        let total: f64 = self
            .patterns
            .iter()
            .filter(|(regex, _)| regex.is_match(message))
            .map(|(_, weight)| weight)
            .sum();
        clamp_score(total)
    }
}

/// Sum of several scorers, clamped.
#[derive(Default)]
pub struct ScoreChain {
    scorers: Vec<Box<dyn Scorer>>,
}

impl ScoreChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, scorer: impl Scorer + 'static) -> Self {
        self.scorers.push(Box::new(scorer));
        self
    }
}

impl Scorer for ScoreChain {
    fn score(&self, message: &str, context: &RequestContext) -> f64 {
        clamp_score(self.scorers.iter().map(|s| s.score(message, context)).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RequestContext {
        RequestContext::default()
    }

    fn coding_scorer() -> KeywordScorer {
        KeywordScorer::new(["code", "python", "function", "write code"], ["programming"], 0.0)
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(f64::NAN), 0.0);
        assert_eq!(clamp_score(-0.5), 0.0);
        assert_eq!(clamp_score(1.7), 1.0);
        assert_eq!(clamp_score(0.42), 0.42);
    }

    #[test]
    fn test_no_hits_returns_base_score() {
        let scorer = KeywordScorer::new(Vec::<&str>::new(), Vec::<&str>::new(), 0.2);
        assert_eq!(scorer.score("zzzz", &ctx()), 0.2);
    }

    #[test]
    fn test_single_trigger_hit() {
        let score = coding_scorer().score("write a function to add two numbers", &ctx());
        assert!((score - 0.7).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn test_whole_word_matching() {
        // "decode" must not count as "code"
        assert_eq!(coding_scorer().hits("please decode this"), (0, 0));
        assert_eq!(coding_scorer().hits("CODE review"), (1, 0));
    }

    #[test]
    fn test_phrase_matching() {
        assert_eq!(coding_scorer().hits("can you write code for me"), (2, 0));
        assert_eq!(coding_scorer().hits("write some code"), (1, 0));
    }

    #[test]
    fn test_tags_add_smaller_bonus() {
        let score = coding_scorer().score("python programming", &ctx());
        assert!((score - 0.75).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn test_score_is_capped() {
        let scorer = KeywordScorer::new(["a", "b", "c", "d", "e", "f"], ["g"], 0.0);
        assert_eq!(scorer.score("a b c d e f g", &ctx()), 1.0);
    }

    #[test]
    fn test_symbols_in_keywords() {
        let scorer = KeywordScorer::new(["c++", "c#"], Vec::<&str>::new(), 0.0);
        assert_eq!(scorer.hits("port this to C++ please"), (1, 0));
        assert_eq!(scorer.hits("I like c"), (0, 0));
    }

    #[test]
    fn test_pattern_scorer_sums_weights() {
        let scorer = PatternScorer::new()
            .with_pattern(r"```", 0.3)
            .unwrap()
            .with_pattern(r"\bdef\s+\w+\(", 0.4)
            .unwrap();
        assert_eq!(scorer.len(), 2);
        let score = scorer.score("```python\ndef add(a, b):\n```", &ctx());
        assert!((score - 0.7).abs() < 1e-9);
        assert_eq!(scorer.score("hello", &ctx()), 0.0);
    }

    #[test]
    fn test_chain_clamps_sum() {
        let chain = ScoreChain::new()
            .with(KeywordScorer::new(["code"], Vec::<&str>::new(), 0.0))
            .with(PatternScorer::new().with_pattern("code", 0.9).unwrap());
        assert_eq!(chain.score("code", &ctx()), 1.0);
    }
}
