//! Pluggable scoring features.
//!
//! Every feature contributes a fixed number of dense values that are dotted
//! with its slice of the shared weight vector. The callbacks correspond to the
//! points in decoding where information becomes available: once per new
//! vocabulary word, once per candidate phrase, once per hypothesis extension,
//! and once per complete sentence.

mod collector;
mod distortion;
mod language_model;
mod phrase_scores;
mod word_penalty;

pub use collector::{FeatureStore, ScoreCollector};
pub use distortion::Distortion;
pub use language_model::LanguageModelFeature;
pub use phrase_scores::PhraseScores;
pub use word_penalty::WordPenalty;

use crate::chart::TargetPhrase;
use crate::hypothesis::Hypothesis;
use crate::lm::LmState;
use crate::phrase_table::FieldConfig;
use crate::vocab::WordId;

#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    #[error("feature {feature}: {reason}")]
    Config { feature: String, reason: String },
}

/// A source span and its words.
#[derive(Debug, Clone, Copy)]
pub struct SourcePhrase<'a> {
    pub begin: usize,
    pub end: usize,
    pub words: &'a [WordId],
}

impl SourcePhrase<'_> {
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.begin
    }
}

/// A candidate translation of a source span. Only passed to scoring calls.
#[derive(Debug, Clone, Copy)]
pub struct PhrasePair<'a> {
    pub source_phrase: SourcePhrase<'a>,
    pub target_phrase: &'a TargetPhrase,
}

/// Shared descriptors handed to every feature at registration.
#[derive(Debug, Clone)]
pub struct FeatureInit {
    phrase_fields: FieldConfig,
    begin_sentence_state: LmState,
}

impl FeatureInit {
    pub fn new(phrase_fields: FieldConfig) -> Self {
        Self {
            phrase_fields,
            begin_sentence_state: LmState::default(),
        }
    }

    /// Schema of the phrase-table rows features will see.
    pub fn phrase_fields(&self) -> &FieldConfig {
        &self.phrase_fields
    }

    /// LM context the start hypothesis begins with.
    pub fn begin_sentence_state(&self) -> LmState {
        self.begin_sentence_state
    }

    pub fn set_begin_sentence_state(&mut self, state: LmState) {
        self.begin_sentence_state = state;
    }
}

pub trait Feature: Send + Sync {
    /// Key under which weights for this feature are loaded.
    fn name(&self) -> &str;

    /// One-time setup at registration. An error aborts decoder startup.
    fn init(&mut self, _feature_init: &mut FeatureInit) -> Result<(), FeatureError> {
        Ok(())
    }

    /// Called once for every word newly added to the vocabulary.
    fn new_word(&self, _string_rep: &str, _word: WordId) {}

    /// Hypothesis-independent score of a candidate phrase.
    fn score_phrase(&self, _phrase_pair: PhrasePair<'_>, _collector: &mut ScoreCollector<'_>) {}

    fn score_hypothesis_with_source_phrase(
        &self,
        _hypothesis: &Hypothesis,
        _source_phrase: SourcePhrase<'_>,
        _collector: &mut ScoreCollector<'_>,
    ) {
    }

    fn score_hypothesis_with_phrase_pair(
        &self,
        _hypothesis: &Hypothesis,
        _phrase_pair: PhrasePair<'_>,
        _collector: &mut ScoreCollector<'_>,
    ) {
    }

    /// Applied once when `hypothesis` completes the sentence.
    fn score_final_hypothesis(&self, _hypothesis: &Hypothesis, _collector: &mut ScoreCollector<'_>) {}

    /// Number of weighted dimensions this feature contributes.
    fn dense_feature_count(&self) -> usize;

    /// Human-readable name of local dimension `index`.
    fn feature_description(&self, index: usize) -> String;
}
