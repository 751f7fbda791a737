//! The weighted sum of all registered features.

use std::ops::Range;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::feature::{
    Feature, FeatureError, FeatureInit, FeatureStore, PhrasePair, ScoreCollector, SourcePhrase,
};
use crate::hypothesis::{Hypothesis, PendingHypothesis};
use crate::phrase_table::FieldConfig;
use crate::vocab::WordId;
use crate::weights::{Weights, WeightsError};

/// Weight given to every new dimension until weights are loaded.
const DEFAULT_WEIGHT: f32 = 1.0;

/// Ordered feature list and the flat weight vector they share.
///
/// Feature `i` owns dense dimensions `feature_offsets[i]..feature_offsets[i + 1]`;
/// the last offset is the total dense count. Offsets are fixed at
/// registration.
pub struct Objective {
    feature_init: FeatureInit,
    features: Vec<Box<dyn Feature>>,
    feature_offsets: Vec<usize>,
    weights: Vec<f32>,
}

impl Objective {
    pub fn new(phrase_fields: FieldConfig) -> Self {
        Self {
            feature_init: FeatureInit::new(phrase_fields),
            features: Vec::new(),
            feature_offsets: vec![0],
            weights: Vec::new(),
        }
    }

    /// Initialize `feature` and append its dimensions with default weight.
    pub fn add_feature(&mut self, mut feature: Box<dyn Feature>) -> Result<(), FeatureError> {
        feature.init(&mut self.feature_init)?;
        let count = feature.dense_feature_count();
        let end = self.dense_feature_count() + count;
        self.feature_offsets.push(end);
        self.weights.resize(end, DEFAULT_WEIGHT);
        debug!(feature = feature.name(), count, "registered feature");
        self.features.push(feature);
        Ok(())
    }

    /// Overwrite every feature's weights from `loaded`.
    ///
    /// Nothing is changed unless every registered feature has a weight vector
    /// of the right length.
    pub fn load_weights(&mut self, loaded: &Weights) -> Result<(), WeightsError> {
        let mut weights = self.weights.clone();
        for (i, feature) in self.features.iter().enumerate() {
            let values = loaded
                .get(feature.name())
                .ok_or_else(|| WeightsError::MissingFeature(feature.name().to_string()))?;
            let range = self.feature_range(i);
            if values.len() != range.len() {
                return Err(WeightsError::CountMismatch {
                    feature: feature.name().to_string(),
                    expected: range.len(),
                    found: values.len(),
                });
            }
            weights[range].copy_from_slice(values);
        }
        for name in loaded.names() {
            if self.feature_index(name).is_none() {
                warn!(feature = name, "weights given for unregistered feature");
            }
        }
        self.weights = weights;
        Ok(())
    }

    /// Overwrite one feature's slice of the weight vector.
    pub fn set_feature_weights(&mut self, name: &str, values: &[f32]) -> Result<(), WeightsError> {
        let i = self
            .feature_index(name)
            .ok_or_else(|| WeightsError::MissingFeature(name.to_string()))?;
        let range = self.feature_range(i);
        if values.len() != range.len() {
            return Err(WeightsError::CountMismatch {
                feature: name.to_string(),
                expected: range.len(),
                found: values.len(),
            });
        }
        self.weights[range].copy_from_slice(values);
        Ok(())
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Start-of-sentence hypothesis in the LM context registered at init.
    pub fn start_hypothesis(&self) -> Arc<Hypothesis> {
        Hypothesis::start(self.feature_init.begin_sentence_state())
    }

    /// A pending extension of `previous`, sized for this objective.
    pub fn pending_hypothesis(&self, previous: &Hypothesis) -> PendingHypothesis {
        PendingHypothesis::new(previous, self.dense_feature_count())
    }

    pub fn new_word(&self, string_rep: &str, word: WordId) {
        for feature in &self.features {
            feature.new_word(string_rep, word);
        }
    }

    pub fn score_phrase(&self, phrase_pair: PhrasePair<'_>, store: Option<&mut FeatureStore>) -> f32 {
        self.dispatch(None, store, |feature, collector| {
            feature.score_phrase(phrase_pair, collector)
        })
    }

    pub fn score_hypothesis_with_source_phrase(
        &self,
        hypothesis: &Hypothesis,
        source_phrase: SourcePhrase<'_>,
        new_hypothesis: &mut PendingHypothesis,
        store: Option<&mut FeatureStore>,
    ) -> f32 {
        self.dispatch(Some(new_hypothesis), store, |feature, collector| {
            feature.score_hypothesis_with_source_phrase(hypothesis, source_phrase, collector)
        })
    }

    pub fn score_hypothesis_with_phrase_pair(
        &self,
        hypothesis: &Hypothesis,
        phrase_pair: PhrasePair<'_>,
        new_hypothesis: &mut PendingHypothesis,
        store: Option<&mut FeatureStore>,
    ) -> f32 {
        self.dispatch(Some(new_hypothesis), store, |feature, collector| {
            feature.score_hypothesis_with_phrase_pair(hypothesis, phrase_pair, collector)
        })
    }

    pub fn score_final_hypothesis(
        &self,
        hypothesis: &Hypothesis,
        store: Option<&mut FeatureStore>,
    ) -> f32 {
        self.dispatch(None, store, |feature, collector| {
            feature.score_final_hypothesis(hypothesis, collector)
        })
    }

    fn dispatch<'a, F>(
        &'a self,
        new_hypothesis: Option<&'a mut PendingHypothesis>,
        store: Option<&'a mut FeatureStore>,
        mut call: F,
    ) -> f32
    where
        F: FnMut(&dyn Feature, &mut ScoreCollector<'a>),
    {
        let mut collector = ScoreCollector::new(&self.weights, new_hypothesis, store);
        for (i, feature) in self.features.iter().enumerate() {
            collector.set_dense_range(self.feature_offsets[i], self.feature_offsets[i + 1]);
            call(feature.as_ref(), &mut collector);
        }
        collector.score()
    }

    pub fn dense_feature_count(&self) -> usize {
        self.feature_offsets.last().copied().unwrap_or(0)
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Global dense dimensions owned by feature `i`.
    pub fn feature_range(&self, i: usize) -> Range<usize> {
        self.feature_offsets[i]..self.feature_offsets[i + 1]
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.name())
    }

    fn feature_index(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f.name() == name)
    }

    /// Describe global dense dimension `index` via its owning feature.
    ///
    /// # Panics
    ///
    /// Panics if `index >= dense_feature_count()`.
    pub fn feature_description(&self, index: usize) -> String {
        assert!(
            index < self.dense_feature_count(),
            "dense index {index} out of range"
        );
        let mut i = 0;
        while index >= self.feature_offsets[i + 1] {
            i += 1;
        }
        self.features[i].feature_description(index - self.feature_offsets[i])
    }

    /// Fold raw dense values into one weighted score per feature, in
    /// registration order.
    pub fn weighted_by_feature<'a>(&'a self, values: &[f32]) -> Vec<(&'a str, f32)> {
        self.features
            .iter()
            .enumerate()
            .map(|(i, feature)| {
                let score = self
                    .feature_range(i)
                    .map(|j| values.get(j).copied().unwrap_or(0.0) * self.weights[j])
                    .sum();
                (feature.name(), score)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::testutil::{word_phrase, MockFeature, MockLog};

    fn objective_with(counts: &[usize]) -> (Objective, Vec<MockLog>) {
        let mut objective = Objective::new(FieldConfig::with_scores(vec![]));
        let mut logs = Vec::new();
        for (k, &count) in counts.iter().enumerate() {
            let (feature, log) = MockFeature::new(&format!("mock{k}"), count);
            objective.add_feature(Box::new(feature)).unwrap();
            logs.push(log);
        }
        (objective, logs)
    }

    #[test]
    fn offsets_follow_registration() {
        let (objective, _) = objective_with(&[2, 0, 3]);
        assert_eq!(objective.dense_feature_count(), 5);
        assert_eq!(objective.feature_range(0), 0..2);
        assert_eq!(objective.feature_range(1), 2..2);
        assert_eq!(objective.feature_range(2), 2..5);
        assert_eq!(objective.weights(), &[1.0; 5]);
    }

    #[test]
    fn description_resolves_owner() {
        let (objective, _) = objective_with(&[2, 0, 3]);
        assert_eq!(objective.feature_description(0), "mock0 #0");
        assert_eq!(objective.feature_description(1), "mock0 #1");
        assert_eq!(objective.feature_description(2), "mock2 #0");
        assert_eq!(objective.feature_description(4), "mock2 #2");
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn description_past_end_panics() {
        let (objective, _) = objective_with(&[1]);
        objective.feature_description(1);
    }

    #[test]
    fn init_failure_aborts_registration() {
        let mut objective = Objective::new(FieldConfig::with_scores(vec![]));
        let err = objective
            .add_feature(Box::new(crate::feature::PhraseScores::new()))
            .unwrap_err();
        assert!(err.to_string().contains("no score fields"));
        assert_eq!(objective.feature_count(), 0);
        assert_eq!(objective.dense_feature_count(), 0);
    }

    #[test]
    fn load_weights_by_name() {
        let (mut objective, _) = objective_with(&[2, 1]);
        let mut weights = Weights::new();
        weights.insert("mock0", vec![0.5, 0.25]);
        weights.insert("mock1", vec![-2.0]);
        objective.load_weights(&weights).unwrap();
        assert_eq!(objective.weights(), &[0.5, 0.25, -2.0]);
    }

    #[test]
    fn load_weights_count_mismatch_leaves_weights() {
        let (mut objective, _) = objective_with(&[2, 1]);
        let mut weights = Weights::new();
        weights.insert("mock0", vec![0.5, 0.25]);
        weights.insert("mock1", vec![-2.0, 3.0]);
        let err = objective.load_weights(&weights).unwrap_err();
        assert!(matches!(
            err,
            WeightsError::CountMismatch {
                expected: 1,
                found: 2,
                ..
            }
        ));
        assert_eq!(objective.weights(), &[1.0; 3]);
    }

    #[test]
    fn load_weights_missing_feature() {
        let (mut objective, _) = objective_with(&[1, 1]);
        let mut weights = Weights::new();
        weights.insert("mock0", vec![0.5]);
        let err = objective.load_weights(&weights).unwrap_err();
        assert!(matches!(err, WeightsError::MissingFeature(ref name) if name == "mock1"));
    }

    #[test]
    fn score_phrase_dispatches_in_order() {
        let (mut objective, logs) = objective_with(&[1, 2]);
        objective.set_feature_weights("mock1", &[2.0, 3.0]).unwrap();
        let target = word_phrase(5);
        let words = [5];
        let pair = PhrasePair {
            source_phrase: SourcePhrase {
                begin: 0,
                end: 1,
                words: &words,
            },
            target_phrase: &target,
        };
        let mut store = FeatureStore::new(objective.dense_feature_count());
        // Each mock adds 1.0 to every one of its dimensions.
        let score = objective.score_phrase(pair, Some(&mut store));
        assert!((score - (1.0 + 2.0 + 3.0)).abs() < 1e-6);
        assert_eq!(store.values(), &[1.0, 1.0, 1.0]);
        assert_eq!(logs[0].phrase_calls(), 1);
        assert_eq!(logs[1].phrase_calls(), 1);

        let by_feature = objective.weighted_by_feature(store.values());
        assert_eq!(by_feature, vec![("mock0", 1.0), ("mock1", 5.0)]);
    }

    #[test]
    fn hypothesis_scoring_records_breakdown() {
        let (objective, _) = objective_with(&[1, 1]);
        let start = objective.start_hypothesis();
        let mut pending = objective.pending_hypothesis(&start);
        let words = [5];
        let source = SourcePhrase {
            begin: 0,
            end: 1,
            words: &words,
        };
        let score = objective.score_hypothesis_with_source_phrase(&start, source, &mut pending, None);
        assert!((score - 2.0).abs() < 1e-6);
        assert_eq!(pending.features().values(), &[1.0, 1.0]);
        let final_score = objective.score_final_hypothesis(&start, None);
        assert!((final_score - 2.0).abs() < 1e-6);
    }

    #[test]
    fn new_word_reaches_every_feature() {
        let (objective, logs) = objective_with(&[1, 1]);
        objective.new_word("haus", 7);
        for log in &logs {
            assert_eq!(log.words(), vec![("haus".to_string(), 7)]);
        }
    }

    proptest! {
        #[test]
        fn dense_count_is_sum(counts in prop::collection::vec(0usize..5, 0..8)) {
            let (objective, _) = objective_with(&counts);
            prop_assert_eq!(objective.dense_feature_count(), counts.iter().sum::<usize>());
            for (k, &count) in counts.iter().enumerate() {
                let range = objective.feature_range(k);
                prop_assert_eq!(range.len(), count);
                for global in range.clone() {
                    prop_assert_eq!(
                        objective.feature_description(global),
                        format!("mock{k} #{}", global - range.start)
                    );
                }
            }
        }

        #[test]
        fn set_weights_touches_one_slice(
            counts in prop::collection::vec(1usize..4, 1..6),
            pick in any::<prop::sample::Index>(),
        ) {
            let (mut objective, _) = objective_with(&counts);
            let k = pick.index(counts.len());
            let values: Vec<f32> = (0..counts[k]).map(|j| j as f32 + 0.5).collect();
            objective.set_feature_weights(&format!("mock{k}"), &values).unwrap();
            let range = objective.feature_range(k);
            for (j, &w) in objective.weights().iter().enumerate() {
                if range.contains(&j) {
                    prop_assert_eq!(w, values[j - range.start]);
                } else {
                    prop_assert_eq!(w, 1.0);
                }
            }
        }
    }
}
