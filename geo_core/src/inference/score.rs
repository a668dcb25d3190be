//! Candidate scores for text-based category inference.

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Full credit for a name token that appears verbatim in the text.
pub const EXACT_TOKEN_SCORE: f64 = 1.0;

/// Partial credit when one token is a prefix of the other ("quartzite" / "quartz"
/// count, "chemically" / "mica" do not).
pub const PARTIAL_TOKEN_SCORE: f64 = 0.5;

/// Tokens shorter than this never earn partial credit.
pub const MIN_PARTIAL_LEN: usize = 4;

/// A lowercase word and its byte offset in the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextToken {
    pub word: String,
    pub position: usize,
}

/// Split text into lowercase alphanumeric words.
pub fn tokenize(text: &str) -> Vec<TextToken> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        match (c.is_alphanumeric(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                tokens.push(TextToken {
                    word: text[s..i].to_lowercase(),
                    position: s,
                });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push(TextToken {
            word: text[s..].to_lowercase(),
            position: s,
        });
    }
    tokens
}

/// Score a multi-word name against tokenized text.
///
/// Returns the mean per-token credit and the earliest position of any matched
/// token, or `None` when nothing matched.
pub fn score_name(name: &str, text: &[TextToken]) -> Option<(f64, usize)> {
    let name_tokens = tokenize(name);
    if name_tokens.is_empty() {
        return None;
    }

    let mut total = 0.0;
    let mut earliest: Option<usize> = None;
    for name_token in &name_tokens {
        if let Some((credit, position)) = best_match(&name_token.word, text) {
            total += credit;
            earliest = Some(earliest.map_or(position, |e| e.min(position)));
        }
    }

    earliest.map(|position| (total / name_tokens.len() as f64, position))
}

fn best_match(word: &str, text: &[TextToken]) -> Option<(f64, usize)> {
    if let Some(exact) = text.iter().find(|t| t.word == word) {
        return Some((EXACT_TOKEN_SCORE, exact.position));
    }
    if word.chars().count() < MIN_PARTIAL_LEN {
        return None;
    }
    text.iter()
        .find(|t| {
            t.word.chars().count() >= MIN_PARTIAL_LEN
                && (t.word.starts_with(word) || word.starts_with(t.word.as_str()))
        })
        .map(|t| (PARTIAL_TOKEN_SCORE, t.position))
}

/// A scored category candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Display name as stored in the knowledge base.
    pub name: String,
    pub score: f64,
    /// Byte offset of the first matched token in the description text.
    pub position: usize,
}

impl Candidate {
    /// Ranking order: higher score, then earlier position, then name.
    fn rank(&self, other: &Candidate) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then(self.position.cmp(&other.position))
            .then_with(|| self.name.to_lowercase().cmp(&other.name.to_lowercase()))
    }
}

/// Tracks the best candidate per category name.
#[derive(Debug, Clone, Default)]
pub struct CandidateScores {
    candidates: BTreeMap<String, Candidate>,
}

impl CandidateScores {
    /// Create a new empty score table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a candidate; only the better-ranked entry per name is kept.
    pub fn offer(&mut self, candidate: Candidate) {
        let key = candidate.name.to_lowercase();
        match self.candidates.get(&key) {
            Some(current) if current.rank(&candidate) != Ordering::Greater => {}
            _ => {
                self.candidates.insert(key, candidate);
            }
        }
    }

    /// Get the score of a name.
    pub fn get(&self, name: &str) -> Option<&Candidate> {
        self.candidates.get(&name.to_lowercase())
    }

    /// All candidates with a score of at least `threshold`, best first.
    pub fn ranked(&self, threshold: f64) -> Vec<&Candidate> {
        let mut ranked: Vec<_> = self
            .candidates
            .values()
            .filter(|c| c.score >= threshold)
            .collect();
        ranked.sort_by(|a, b| a.rank(b));
        ranked
    }

    /// The winning candidate above `threshold`.
    pub fn best(&self, threshold: f64) -> Option<&Candidate> {
        self.ranked(threshold).into_iter().next()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, score: f64, position: usize) -> Candidate {
        Candidate {
            name: name.to_string(),
            score,
            position,
        }
    }

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("Coarse, pink GRANITE (weathered)");
        let words: Vec<_> = tokens.iter().map(|t| t.word.as_str()).collect();
        assert_eq!(words, vec!["coarse", "pink", "granite", "weathered"]);
        assert_eq!(tokens[2].position, 13);
        assert!(tokenize(" ,;").is_empty());
    }

    #[test]
    fn test_score_exact_and_partial() {
        let text = tokenize("a quartzite ledge over black shale");

        assert_eq!(score_name("Shale", &text), Some((1.0, 29)));
        assert_eq!(score_name("Quartz", &text), Some((0.5, 2)));
        assert_eq!(score_name("Mica", &text), None);
    }

    #[test]
    fn test_score_multi_word_name() {
        let text = tokenize("rounded river gravel with rose quartz");
        let (score, position) = score_name("Rose Quartz", &text).unwrap();
        assert_eq!(score, 1.0);
        assert_eq!(position, 26);

        let (score, _) = score_name("Smoky Quartz", &text).unwrap();
        assert_eq!(score, 0.5);
    }

    #[test]
    fn test_short_tokens_need_exact_match() {
        let text = tokenize("tuffaceous layer");
        assert_eq!(score_name("Tuff", &text), Some((0.5, 0)));
        assert_eq!(score_name("Ash", &tokenize("ashes")), None);
    }

    #[test]
    fn test_inner_substring_earns_nothing() {
        assert_eq!(score_name("Mica", &tokenize("chemically weathered outcrop")), None);
        assert_eq!(score_name("Iron", &tokenize("quiet environment")), None);
        assert_eq!(score_name("Granite", &tokenize("granitic texture")), None);
        assert_eq!(score_name("Calcite", &tokenize("calcitic cement")), None);
    }

    #[test]
    fn test_ranking_order() {
        let mut scores = CandidateScores::new();
        scores.offer(candidate("Feldspar", 1.0, 20));
        scores.offer(candidate("Granite", 1.0, 7));
        scores.offer(candidate("Mica", 0.5, 0));

        let names: Vec<_> = scores.ranked(0.0).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Granite", "Feldspar", "Mica"]);
        assert_eq!(scores.best(0.75).unwrap().name, "Granite");
        assert!(scores.best(1.5).is_none());
    }

    #[test]
    fn test_alphabetical_tie_break() {
        let mut scores = CandidateScores::new();
        scores.offer(candidate("Obsidian", 1.0, 4));
        scores.offer(candidate("basalt", 1.0, 4));
        assert_eq!(scores.best(0.5).unwrap().name, "basalt");
    }

    #[test]
    fn test_offer_keeps_better_entry() {
        let mut scores = CandidateScores::new();
        scores.offer(candidate("Basalt", 0.8, 3));
        scores.offer(candidate("basalt", 1.0, 10));
        scores.offer(candidate("Basalt", 0.5, 0));

        assert_eq!(scores.len(), 1);
        let kept = scores.get("BASALT").unwrap();
        assert_eq!(kept.score, 1.0);
        assert_eq!(kept.position, 10);
    }
}
