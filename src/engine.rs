//! A loaded decoder: phrase table, vocabulary, and the objective built over
//! the language model.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use phrasal_core::chart::{Chart, ChartError};
use phrasal_core::feature::{
    Distortion, FeatureError, LanguageModelFeature, PhraseScores, WordPenalty,
};
use phrasal_core::hypothesis::Hypothesis;
use phrasal_core::lm::{BackoffModel, LanguageModel, LmError};
use phrasal_core::objective::Objective;
use phrasal_core::output::{output, output_verbose, target_words, ScoreHistoryMap};
use phrasal_core::phrase_table::{MemoryTable, PhraseTable, PhraseTableError};
use phrasal_core::scorer::Scorer;
use phrasal_core::search::{translate, DecodeError};
use phrasal_core::settings::{self, SettingsError};
use phrasal_core::vocab::Vocab;
use phrasal_core::weights::{Weights, WeightsError};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("phrase table: {0}")]
    PhraseTable(#[from] PhraseTableError),

    #[error("language model: {0}")]
    Lm(#[from] LmError),

    #[error("weights: {0}")]
    Weights(#[from] WeightsError),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error("settings: {0}")]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Best translation of one sentence, in plain values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Translation {
    pub score: f32,
    pub words: Vec<String>,
}

pub struct Engine {
    vocab: Vocab,
    table: MemoryTable,
    objective: Objective,
}

impl Engine {
    /// Load a Moses phrase table, an ARPA model and, optionally, a TOML
    /// weight file. Without weights every dimension weighs 1.0.
    pub fn open(
        table_path: &Path,
        lm_path: &Path,
        weights_path: Option<&Path>,
    ) -> Result<Self, EngineError> {
        let mut vocab = Vocab::new();
        let table = MemoryTable::open(table_path, &mut vocab)?;
        let model = BackoffModel::open(lm_path)?;
        let weights = weights_path.map(Weights::open).transpose()?;
        Self::new(vocab, table, Arc::new(model), weights.as_ref())
    }

    /// Register the phrase, word-penalty, distortion and LM features, in that
    /// order.
    pub fn new(
        vocab: Vocab,
        table: MemoryTable,
        model: Arc<dyn LanguageModel>,
        weights: Option<&Weights>,
    ) -> Result<Self, EngineError> {
        let scorer = Scorer::new(model, &vocab);
        let mut objective = Objective::new(table.fields().clone());
        objective.add_feature(Box::new(PhraseScores::new()))?;
        objective.add_feature(Box::new(WordPenalty))?;
        objective.add_feature(Box::new(Distortion))?;
        objective.add_feature(Box::new(LanguageModelFeature::new(Arc::new(scorer))))?;
        if let Some(weights) = weights {
            objective.load_weights(weights)?;
        }
        info!(
            features = objective.feature_count(),
            dense = objective.dense_feature_count(),
            "engine ready"
        );
        Ok(Self {
            vocab,
            table,
            objective,
        })
    }

    pub fn chart(&mut self, sentence: &str) -> Result<Chart, EngineError> {
        Ok(Chart::new(
            &self.table,
            sentence,
            &mut self.vocab,
            &self.objective,
        )?)
    }

    /// Best complete hypothesis for `sentence`.
    pub fn decode(&mut self, sentence: &str) -> Result<Arc<Hypothesis>, EngineError> {
        Ok(translate(
            &self.table,
            &self.objective,
            &mut self.vocab,
            sentence,
        )?)
    }

    pub fn translate(&mut self, sentence: &str) -> Result<Translation, EngineError> {
        let best = self.decode(sentence)?;
        let words = target_words(&best)
            .into_iter()
            .map(|w| self.vocab.string(w).to_string())
            .collect();
        Ok(Translation {
            score: best.score(),
            words,
        })
    }

    /// Decode `sentence` and write its output line. With `history`, the
    /// per-step breakdown is written first.
    pub fn write_translation<W: Write>(
        &mut self,
        sentence: &str,
        history: Option<&mut ScoreHistoryMap>,
        out: &mut W,
    ) -> Result<(), EngineError> {
        let best = self.decode(sentence)?;
        if let Some(map) = history {
            output_verbose(&best, &self.vocab, &self.objective, map, out)?;
        }
        output(&best, &self.vocab, out)?;
        Ok(())
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    pub fn table(&self) -> &MemoryTable {
        &self.table
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }
}

/// Install a settings file before anything reads the settings.
pub fn load_settings(path: &Path) -> Result<(), EngineError> {
    let content = fs::read_to_string(path)?;
    settings::init_custom(content)?;
    info!(path = %path.display(), "loaded settings");
    Ok(())
}
