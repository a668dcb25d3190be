//! Category Inference - best-guess rock/mineral for a field description.
//!
//! The decision runs in a fixed order:
//! 1. **Threshold**: Text candidates below `min_confidence` are discarded
//! 2. **Text score**: The best remaining candidate wins, ties broken by the
//!    earliest mention in the text and then alphabetically
//! 3. **Classifier override**: An image label known to the knowledge base
//!    replaces a disagreeing text guess only above `classifier_threshold`

mod score;

pub use score::*;

use serde::{Deserialize, Serialize};
use survey_model::Description;

use crate::{Classification, ImageClassifier, KnowledgeBase};

/// A keyword rule that points at a category without naming it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordHint {
    /// Knowledge base record the hint resolves to.
    pub category: String,

    /// Every keyword must appear as a whole word in the text.
    pub all_of: Vec<String>,

    #[serde(default = "default_hint_score")]
    pub score: f64,
}

fn default_hint_score() -> f64 {
    0.8
}

impl KeywordHint {
    pub fn new(category: impl Into<String>, all_of: &[&str]) -> Self {
        Self {
            category: category.into(),
            all_of: all_of.iter().map(|k| k.to_lowercase()).collect(),
            score: default_hint_score(),
        }
    }
}

/// Configuration for category inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Minimum text score for a guess.
    pub min_confidence: f64,

    /// A disagreeing classifier label wins only above this confidence.
    pub classifier_threshold: f64,

    pub hints: Vec<KeywordHint>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            classifier_threshold: 0.7,
            hints: vec![
                KeywordHint::new("Granite", &["coarse", "feldspar"]),
                KeywordHint::new("Basalt", &["fine", "volcanic"]),
                KeywordHint::new("Limestone", &["reacts", "acid"]),
            ],
        }
    }
}

/// Where an inferred category came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceSource {
    /// A record name matched the description text.
    Text,
    /// A keyword hint matched the description text.
    Hint,
    /// The image classifier overrode the text.
    Classifier,
    /// Text and classifier named the same record.
    Agreement,
}

/// An inferred category with its supporting evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inference {
    /// Record name as stored in the knowledge base.
    pub category: String,
    pub confidence: f64,
    pub source: InferenceSource,
}

/// Maps free-text descriptions onto knowledge base records.
#[derive(Debug, Clone, Default)]
pub struct CategoryInferencer {
    config: InferenceConfig,
}

impl CategoryInferencer {
    /// Create a new inferencer with the given configuration.
    pub fn new(config: InferenceConfig) -> Self {
        Self { config }
    }

    /// Create an inferencer with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(InferenceConfig::default())
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Best-guess category name for a description, or `None` below threshold.
    pub fn infer(&self, description: &Description, kb: &KnowledgeBase) -> Option<String> {
        self.infer_text(&description.text, kb).map(|i| i.category)
    }

    /// Score every record name (and every applicable hint) against the text.
    pub fn score_text(&self, text: &str, kb: &KnowledgeBase) -> CandidateScores {
        let tokens = tokenize(text);
        let mut scores = CandidateScores::new();
        if tokens.is_empty() {
            return scores;
        }

        for (_, record) in kb.records() {
            if let Some((score, position)) = score_name(&record.name, &tokens) {
                scores.offer(Candidate {
                    name: record.name.clone(),
                    score,
                    position,
                });
            }
        }

        for hint in &self.config.hints {
            let Some((_, record)) = kb.find(&hint.category) else {
                continue;
            };
            let positions: Option<Vec<usize>> = hint
                .all_of
                .iter()
                .map(|keyword| {
                    let keyword = keyword.to_lowercase();
                    tokens
                        .iter()
                        .find(|t| t.word == keyword)
                        .map(|t| t.position)
                })
                .collect();
            if let Some(position) = positions.and_then(|p| p.into_iter().min()) {
                scores.offer(Candidate {
                    name: record.name.clone(),
                    score: hint.score,
                    position,
                });
            }
        }

        scores
    }

    /// Text-only inference with evidence.
    pub fn infer_text(&self, text: &str, kb: &KnowledgeBase) -> Option<Inference> {
        let scores = self.score_text(text, kb);
        let best = scores.best(self.config.min_confidence)?;

        let from_name = score_name(&best.name, &tokenize(text))
            .is_some_and(|(score, _)| score >= best.score);
        Some(Inference {
            category: best.name.clone(),
            confidence: best.score.min(1.0),
            source: if from_name {
                InferenceSource::Text
            } else {
                InferenceSource::Hint
            },
        })
    }

    /// Combine the text guess with an image classifier label.
    pub fn infer_with_classification(
        &self,
        description: &Description,
        kb: &KnowledgeBase,
        classification: Option<&Classification>,
    ) -> Option<Inference> {
        let text_guess = self.infer_text(&description.text, kb);
        let Some(classification) = classification else {
            return text_guess;
        };

        let Some((_, record)) = kb.find(&classification.label) else {
            tracing::warn!(
                target: "geo::inference",
                label = %classification.label,
                "Ignoring classifier label unknown to the knowledge base"
            );
            return text_guess;
        };

        match text_guess {
            Some(guess) if guess.category.eq_ignore_ascii_case(&record.name) => Some(Inference {
                category: record.name.clone(),
                confidence: guess.confidence.max(classification.confidence),
                source: InferenceSource::Agreement,
            }),
            _ if classification.confidence > self.config.classifier_threshold => Some(Inference {
                category: record.name.clone(),
                confidence: classification.confidence,
                source: InferenceSource::Classifier,
            }),
            guess => guess,
        }
    }

    /// Classify an image and combine the label with the text guess.
    ///
    /// A classifier failure falls back to text-only inference.
    pub fn infer_with_classifier(
        &self,
        description: &Description,
        kb: &KnowledgeBase,
        image: &[u8],
        classifier: &dyn ImageClassifier,
    ) -> Option<Inference> {
        let classification = match classifier.classify(image) {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!(target: "geo::inference", error = %e, "Classifier failed, using text only");
                None
            }
        };
        self.infer_with_classification(description, kb, classification.as_ref())
    }
}
