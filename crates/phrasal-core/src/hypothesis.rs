//! Partial translations as shared, immutable backpointer chains.
//!
//! Many hypotheses extend the same predecessor, so predecessors are held by
//! `Arc` and never mutated after construction. Walking [`Hypothesis::previous`]
//! from any node reaches the start sentinel.

use std::sync::Arc;

use crate::chart::TargetPhrase;
use crate::feature::FeatureStore;
use crate::lm::LmState;

/// Mutable state of a hypothesis that is still being scored. Features write
/// into it through the score collector; it is frozen by
/// [`Hypothesis::extend`].
#[derive(Debug, Clone)]
pub struct PendingHypothesis {
    lm_state: LmState,
    features: FeatureStore,
}

impl PendingHypothesis {
    /// Start from `previous`'s LM state with zeroed feature values.
    pub fn new(previous: &Hypothesis, dense_feature_count: usize) -> Self {
        Self {
            lm_state: previous.lm_state,
            features: FeatureStore::new(dense_feature_count),
        }
    }

    pub fn lm_state(&self) -> &LmState {
        &self.lm_state
    }

    pub fn set_lm_state(&mut self, state: LmState) {
        self.lm_state = state;
    }

    pub fn features(&self) -> &FeatureStore {
        &self.features
    }

    pub fn features_mut(&mut self) -> &mut FeatureStore {
        &mut self.features
    }
}

#[derive(Debug)]
pub struct Hypothesis {
    /// Cumulative score from the start sentinel through this step.
    score: f32,
    /// Phrase produced at this step; `None` only for the start sentinel.
    target: Option<TargetPhrase>,
    /// Source position covered up to (exclusive) after this step.
    source_end: usize,
    lm_state: LmState,
    /// Dense feature values recorded while scoring this step.
    features: FeatureStore,
    previous: Option<Arc<Hypothesis>>,
}

impl Hypothesis {
    /// The sentence-start sentinel.
    pub fn start(lm_state: LmState) -> Arc<Self> {
        Arc::new(Self {
            score: 0.0,
            target: None,
            source_end: 0,
            lm_state,
            features: FeatureStore::default(),
            previous: None,
        })
    }

    pub fn extend(
        previous: &Arc<Hypothesis>,
        target: TargetPhrase,
        source_end: usize,
        score: f32,
        pending: PendingHypothesis,
    ) -> Arc<Self> {
        Arc::new(Self {
            score,
            target: Some(target),
            source_end,
            lm_state: pending.lm_state,
            features: pending.features,
            previous: Some(Arc::clone(previous)),
        })
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn target(&self) -> Option<&TargetPhrase> {
        self.target.as_ref()
    }

    pub fn previous(&self) -> Option<&Hypothesis> {
        self.previous.as_deref()
    }

    pub fn source_end(&self) -> usize {
        self.source_end
    }

    pub fn lm_state(&self) -> &LmState {
        &self.lm_state
    }

    pub fn step_features(&self) -> &FeatureStore {
        &self.features
    }

    pub fn is_start(&self) -> bool {
        self.previous.is_none()
    }

    /// Iterate from this hypothesis back to the start sentinel, inclusive.
    pub fn backpointers(&self) -> Backpointers<'_> {
        Backpointers { next: Some(self) }
    }

    /// The chain in left-to-right order, without the start sentinel.
    pub fn path(&self) -> Vec<&Hypothesis> {
        let mut path: Vec<&Hypothesis> = self.backpointers().filter(|h| !h.is_start()).collect();
        path.reverse();
        path
    }
}

pub struct Backpointers<'a> {
    next: Option<&'a Hypothesis>,
}

impl<'a> Iterator for Backpointers<'a> {
    type Item = &'a Hypothesis;

    fn next(&mut self) -> Option<&'a Hypothesis> {
        let current = self.next?;
        self.next = current.previous();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::word_phrase;

    #[test]
    fn start_sentinel() {
        let start = Hypothesis::start(LmState::default());
        assert!(start.is_start());
        assert!(start.target().is_none());
        assert_eq!(start.score(), 0.0);
        assert!(start.path().is_empty());
    }

    #[test]
    fn path_is_left_to_right() {
        let start = Hypothesis::start(LmState::default());
        let a = Hypothesis::extend(
            &start,
            word_phrase(10),
            1,
            -1.0,
            PendingHypothesis::new(&start, 0),
        );
        let b = Hypothesis::extend(&a, word_phrase(11), 2, -2.5, PendingHypothesis::new(&a, 0));

        let words: Vec<u32> = b
            .path()
            .iter()
            .map(|h| h.target().unwrap().words()[0])
            .collect();
        assert_eq!(words, vec![10, 11]);
        assert_eq!(b.backpointers().count(), 3);
        assert_eq!(b.previous().unwrap().source_end(), 1);
    }

    #[test]
    fn shared_prefix() {
        let start = Hypothesis::start(LmState::default());
        let a = Hypothesis::extend(
            &start,
            word_phrase(10),
            1,
            -1.0,
            PendingHypothesis::new(&start, 0),
        );
        let b = Hypothesis::extend(&a, word_phrase(11), 2, -2.0, PendingHypothesis::new(&a, 0));
        let c = Hypothesis::extend(&a, word_phrase(12), 2, -3.0, PendingHypothesis::new(&a, 0));

        assert!(std::ptr::eq(b.previous().unwrap(), c.previous().unwrap()));
        assert_eq!(Arc::strong_count(&a), 3);
    }

    #[test]
    fn pending_carries_lm_state() {
        let state = LmState::from_context(&[3, 4]);
        let start = Hypothesis::start(state);
        let mut pending = PendingHypothesis::new(&start, 2);
        assert_eq!(pending.lm_state(), &state);
        pending.set_lm_state(LmState::from_context(&[5]));
        pending.features_mut().add(1, 0.5);

        let next = Hypothesis::extend(&start, word_phrase(7), 1, -1.0, pending);
        assert_eq!(next.lm_state().context(), &[5]);
        assert_eq!(next.step_features().values(), &[0.0, 0.5]);
    }
}
