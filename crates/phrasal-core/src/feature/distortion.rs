use super::{Feature, ScoreCollector, SourcePhrase};
use crate::hypothesis::Hypothesis;

/// Linear distortion: minus the distance jumped in the source sentence.
#[derive(Debug, Default)]
pub struct Distortion;

impl Feature for Distortion {
    fn name(&self) -> &str {
        "distortion"
    }

    fn score_hypothesis_with_source_phrase(
        &self,
        hypothesis: &Hypothesis,
        source_phrase: SourcePhrase<'_>,
        collector: &mut ScoreCollector<'_>,
    ) {
        let jump = hypothesis.source_end().abs_diff(source_phrase.begin);
        collector.add_dense(0, -(jump as f32));
    }

    fn dense_feature_count(&self) -> usize {
        1
    }

    fn feature_description(&self, _index: usize) -> String {
        "distortion".to_string()
    }
}
