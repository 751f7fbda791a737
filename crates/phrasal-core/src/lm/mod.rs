//! N-gram language model interface consumed by the scorer.

mod backoff;

pub use backoff::BackoffModel;

use std::io;

/// Word id in the language model's own vocabulary.
pub type WordIndex = u32;

/// Highest n-gram order an [`LmState`] can carry context for.
pub const MAX_ORDER: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum LmError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("order {0} exceeds the supported maximum of {MAX_ORDER}")]
    UnsupportedOrder(usize),
}

/// Left context of a partial sentence, copied by value between hypotheses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LmState {
    words: [WordIndex; MAX_ORDER - 1],
    length: u8,
}

impl LmState {
    /// Build a state from context words, oldest first. Keeps at most the
    /// newest `MAX_ORDER - 1` words.
    pub fn from_context(context: &[WordIndex]) -> Self {
        let keep = &context[context.len().saturating_sub(MAX_ORDER - 1)..];
        let mut state = Self::default();
        state.words[..keep.len()].copy_from_slice(keep);
        state.length = keep.len() as u8;
        state
    }

    /// Context words, oldest first.
    pub fn context(&self) -> &[WordIndex] {
        &self.words[..self.length as usize]
    }

    pub fn len(&self) -> usize {
        self.length as usize
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

pub trait LanguageModel: Send + Sync {
    fn order(&self) -> usize;

    /// Map a surface word to the model's id, or [`LanguageModel::oov`].
    fn index(&self, word: &str) -> WordIndex;

    /// Id used for words the model has never seen.
    fn oov(&self) -> WordIndex;

    /// Id of the sentence-end marker.
    fn end_sentence(&self) -> WordIndex;

    /// Context after the sentence-start marker.
    fn begin_sentence_state(&self) -> LmState;

    /// Log10 probability of `word` following `state`, and the extended state.
    fn score(&self, state: &LmState, word: WordIndex) -> (f32, LmState);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_keeps_newest_words() {
        let state = LmState::from_context(&[1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(state.context(), &[3, 4, 5, 6, 7]);
        assert_eq!(LmState::from_context(&[9]).context(), &[9]);
        assert!(LmState::from_context(&[]).is_empty());
    }

    #[test]
    fn equal_contexts_hash_equal() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(LmState::from_context(&[4, 5]));
        assert!(set.contains(&LmState::from_context(&[4, 5])));
        assert!(!set.contains(&LmState::from_context(&[5])));
    }
}
