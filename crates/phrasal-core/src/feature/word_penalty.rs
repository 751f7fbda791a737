use super::{Feature, PhrasePair, ScoreCollector};

/// Charges one unit per target word produced.
#[derive(Debug, Default)]
pub struct WordPenalty;

impl Feature for WordPenalty {
    fn name(&self) -> &str {
        "word_penalty"
    }

    fn score_phrase(&self, phrase_pair: PhrasePair<'_>, collector: &mut ScoreCollector<'_>) {
        let target = phrase_pair.target_phrase;
        if target.is_end_of_sentence() {
            return;
        }
        collector.add_dense(0, -(target.words().len() as f32));
    }

    fn dense_feature_count(&self) -> usize {
        1
    }

    fn feature_description(&self, _index: usize) -> String {
        "word penalty".to_string()
    }
}
