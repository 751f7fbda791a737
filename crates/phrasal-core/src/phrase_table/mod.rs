//! Phrase-table interface consumed by the chart.
//!
//! A table maps a source word sequence to an ordered list of [`Row`]s. What a
//! row carries besides its target words is described by the table's
//! [`FieldConfig`].

mod memory;

pub use memory::MemoryTable;

use std::io;
use std::sync::Arc;

use crate::vocab::WordId;

#[derive(Debug, thiserror::Error)]
pub enum PhraseTableError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

/// Schema of the rows a table produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldConfig {
    /// Whether rows expose a target-word accessor at all.
    pub target: bool,
    /// Names of the dense score fields, in row order.
    pub score_names: Vec<String>,
}

impl FieldConfig {
    pub fn with_scores(score_names: Vec<String>) -> Self {
        Self {
            target: true,
            score_names,
        }
    }
}

/// One candidate translation of a source phrase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    target: Vec<WordId>,
    scores: Vec<f32>,
}

impl Row {
    pub fn new(target: Vec<WordId>, scores: Vec<f32>) -> Self {
        Self { target, scores }
    }

    pub fn target(&self) -> &[WordId] {
        &self.target
    }

    pub fn scores(&self) -> &[f32] {
        &self.scores
    }
}

pub trait PhraseTable: Send + Sync {
    fn fields(&self) -> &FieldConfig;

    /// Longest source phrase stored in the table.
    fn max_source_phrase_length(&self) -> usize;

    /// Rows whose source side is exactly `source`, in table order.
    fn lookup(&self, source: &[WordId]) -> &[Arc<Row>];
}
