//! Adapter between decoder vocabulary ids and a language model.

use std::sync::{Arc, PoisonError, RwLock};

use crate::lm::{LanguageModel, LmState, WordIndex};
use crate::settings::settings;
use crate::vocab::{Vocab, WordId};

/// Maps vocabulary ids to LM ids and scores target words incrementally.
///
/// The id map grows as the decoder interns new words, so it sits behind a
/// lock; scoring only takes the read side.
pub struct Scorer {
    model: Arc<dyn LanguageModel>,
    vocab_mapping: RwLock<Vec<WordIndex>>,
    passthrough: f32,
}

impl Scorer {
    /// Map every word already in `vocab`.
    pub fn new(model: Arc<dyn LanguageModel>, vocab: &Vocab) -> Self {
        let vocab_mapping = vocab.iter().map(|(_, word)| model.index(word)).collect();
        Self {
            model,
            vocab_mapping: RwLock::new(vocab_mapping),
            passthrough: settings().scorer.passthrough_score,
        }
    }

    pub fn with_passthrough(mut self, score: f32) -> Self {
        self.passthrough = score;
        self
    }

    /// Record the LM id of a newly interned word.
    pub fn add_word(&self, id: WordId, word: &str) {
        let index = self.model.index(word);
        let mut mapping = self
            .vocab_mapping
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let slot = id as usize;
        if slot >= mapping.len() {
            mapping.resize(slot + 1, self.model.oov());
        }
        mapping[slot] = index;
    }

    /// LM id for `id`; words never mapped are out of vocabulary.
    pub fn convert(&self, id: WordId) -> WordIndex {
        self.vocab_mapping
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id as usize)
            .copied()
            .unwrap_or_else(|| self.model.oov())
    }

    /// Incremental log10 score of `words` after `state`, and the state that
    /// follows them.
    pub fn lm(&self, words: &[WordId], state: &LmState) -> (f32, LmState) {
        let mapping = self
            .vocab_mapping
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let oov = self.model.oov();
        let mut total = 0.0;
        let mut current = *state;
        for &word in words {
            let index = mapping.get(word as usize).copied().unwrap_or(oov);
            let (score, next) = self.model.score(&current, index);
            total += score;
            current = next;
        }
        (total, current)
    }

    /// Cost of ending the sentence after `state`.
    pub fn end_sentence(&self, state: &LmState) -> f32 {
        self.model.score(state, self.model.end_sentence()).0
    }

    pub fn begin_sentence_state(&self) -> LmState {
        self.model.begin_sentence_state()
    }

    /// Fixed score for a source word copied through untranslated.
    pub fn passthrough(&self) -> f32 {
        self.passthrough
    }

    pub fn model(&self) -> &dyn LanguageModel {
        self.model.as_ref()
    }
}
