use std::sync::Arc;

use super::{Feature, FeatureError, FeatureInit, PhrasePair, ScoreCollector};
use crate::hypothesis::Hypothesis;
use crate::scorer::Scorer;
use crate::vocab::WordId;

const LM: usize = 0;
const PASSTHROUGH: usize = 1;

/// N-gram language model score of the target side, plus the fixed cost of
/// pass-through words.
pub struct LanguageModelFeature {
    scorer: Arc<Scorer>,
}

impl LanguageModelFeature {
    pub fn new(scorer: Arc<Scorer>) -> Self {
        Self { scorer }
    }
}

impl Feature for LanguageModelFeature {
    fn name(&self) -> &str {
        "lm"
    }

    fn init(&mut self, feature_init: &mut FeatureInit) -> Result<(), FeatureError> {
        feature_init.set_begin_sentence_state(self.scorer.begin_sentence_state());
        Ok(())
    }

    fn new_word(&self, string_rep: &str, word: WordId) {
        self.scorer.add_word(word, string_rep);
    }

    fn score_phrase(&self, phrase_pair: PhrasePair<'_>, collector: &mut ScoreCollector<'_>) {
        if phrase_pair.target_phrase.is_passthrough() {
            collector.add_dense(PASSTHROUGH, self.scorer.passthrough());
        }
    }

    fn score_hypothesis_with_phrase_pair(
        &self,
        hypothesis: &Hypothesis,
        phrase_pair: PhrasePair<'_>,
        collector: &mut ScoreCollector<'_>,
    ) {
        let target = phrase_pair.target_phrase;
        // </s> is charged by score_final_hypothesis.
        if target.is_end_of_sentence() {
            return;
        }
        let (score, state) = self.scorer.lm(target.words(), hypothesis.lm_state());
        collector.add_dense(LM, score);
        if let Some(new_hypothesis) = collector.new_hypothesis() {
            new_hypothesis.set_lm_state(state);
        }
    }

    fn score_final_hypothesis(&self, hypothesis: &Hypothesis, collector: &mut ScoreCollector<'_>) {
        collector.add_dense(LM, self.scorer.end_sentence(hypothesis.lm_state()));
    }

    fn dense_feature_count(&self) -> usize {
        2
    }

    fn feature_description(&self, index: usize) -> String {
        match index {
            LM => "lm log10 probability".to_string(),
            _ => "passthrough".to_string(),
        }
    }
}
