use crate::hypothesis::PendingHypothesis;

/// Raw (unweighted) dense feature values, indexed globally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureStore {
    values: Vec<f32>,
}

impl FeatureStore {
    pub fn new(dense_feature_count: usize) -> Self {
        Self {
            values: vec![0.0; dense_feature_count],
        }
    }

    pub fn add(&mut self, index: usize, value: f32) {
        self.values[index] += value;
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }
}

/// Accumulates one scoring call across all features.
///
/// The objective points the collector at each feature's slice of the weight
/// vector before delegating, so features address their dimensions locally.
pub struct ScoreCollector<'a> {
    weights: &'a [f32],
    dense_offset: usize,
    dense_end: usize,
    score: f32,
    new_hypothesis: Option<&'a mut PendingHypothesis>,
    store: Option<&'a mut FeatureStore>,
}

impl<'a> ScoreCollector<'a> {
    pub(crate) fn new(
        weights: &'a [f32],
        new_hypothesis: Option<&'a mut PendingHypothesis>,
        store: Option<&'a mut FeatureStore>,
    ) -> Self {
        Self {
            weights,
            dense_offset: 0,
            dense_end: weights.len(),
            score: 0.0,
            new_hypothesis,
            store,
        }
    }

    pub(crate) fn set_dense_range(&mut self, offset: usize, end: usize) {
        self.dense_offset = offset;
        self.dense_end = end;
    }

    /// Add `value` to the current feature's local dimension `index`.
    pub fn add_dense(&mut self, index: usize, value: f32) {
        let global = self.dense_offset + index;
        assert!(
            global < self.dense_end,
            "dense index {index} outside the feature's {} dimensions",
            self.dense_end - self.dense_offset
        );
        self.score += self.weights[global] * value;
        if let Some(hypothesis) = self.new_hypothesis.as_deref_mut() {
            hypothesis.features_mut().add(global, value);
        }
        if let Some(store) = self.store.as_deref_mut() {
            store.add(global, value);
        }
    }

    /// The hypothesis being built, when the call scores an extension.
    pub fn new_hypothesis(&mut self) -> Option<&mut PendingHypothesis> {
        self.new_hypothesis.as_deref_mut()
    }

    /// Weighted sum of everything added so far.
    pub fn score(&self) -> f32 {
        self.score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_sum_and_store() {
        let weights = [0.5, 2.0, -1.0];
        let mut store = FeatureStore::new(3);
        let mut collector = ScoreCollector::new(&weights, None, Some(&mut store));
        collector.set_dense_range(1, 3);
        collector.add_dense(0, 3.0);
        collector.add_dense(1, 1.0);
        assert!((collector.score() - 5.0).abs() < 1e-6);
        drop(collector);
        assert_eq!(store.values(), &[0.0, 3.0, 1.0]);
    }

    #[test]
    #[should_panic(expected = "outside the feature")]
    fn index_past_feature_slice_panics() {
        let weights = [1.0, 1.0];
        let mut collector = ScoreCollector::new(&weights, None, None);
        collector.set_dense_range(0, 1);
        collector.add_dense(1, 1.0);
    }
}
