use super::{Feature, FeatureError, FeatureInit, PhrasePair, ScoreCollector};

/// Copies the phrase table's dense score fields into the objective.
#[derive(Debug, Default)]
pub struct PhraseScores {
    names: Vec<String>,
}

impl PhraseScores {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Feature for PhraseScores {
    fn name(&self) -> &str {
        "phrase"
    }

    fn init(&mut self, feature_init: &mut FeatureInit) -> Result<(), FeatureError> {
        let names = &feature_init.phrase_fields().score_names;
        if names.is_empty() {
            return Err(FeatureError::Config {
                feature: self.name().to_string(),
                reason: "phrase table declares no score fields".to_string(),
            });
        }
        self.names = names.clone();
        Ok(())
    }

    fn score_phrase(&self, phrase_pair: PhrasePair<'_>, collector: &mut ScoreCollector<'_>) {
        let scores = phrase_pair.target_phrase.row().scores();
        for (i, &value) in scores.iter().take(self.names.len()).enumerate() {
            collector.add_dense(i, value);
        }
    }

    fn dense_feature_count(&self) -> usize {
        self.names.len()
    }

    fn feature_description(&self, index: usize) -> String {
        format!("phrase {}", self.names[index])
    }
}
