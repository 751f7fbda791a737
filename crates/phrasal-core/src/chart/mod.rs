//! Candidate target phrases for every source span of one sentence.
//!
//! Spans are stored in a banded table: all span lengths starting at the same
//! position sit next to each other, so `[begin, end)` lives at
//! `begin * max_source_phrase_length + (end - begin - 1)`.


use std::sync::Arc;

use tracing::{debug, debug_span, warn};

use crate::feature::{FeatureStore, PhrasePair, SourcePhrase};
use crate::hypergraph::{ArenaError, Edge, Graph, VertexId};
use crate::objective::Objective;
use crate::phrase_table::{PhraseTable, Row};
use crate::settings::{settings, MAX_SOURCE_PHRASE_LENGTH};
use crate::vocab::{Vocab, WordId, EOS};

/// Reserved target word of the end-of-sentence phrase.
pub const EOS_WORD: WordId = EOS;

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("phrase table has no target field")]
    MissingTargetField,

    #[error("max source phrase length {0} is above {max}", max = MAX_SOURCE_PHRASE_LENGTH)]
    PhraseLengthTooLong(usize),

    #[error("hypergraph sizing: {0}")]
    Graph(#[from] ArenaError),
}

/// Where a target phrase came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PhraseKind {
    #[default]
    Table,
    /// Source word copied through because the table had nothing for it.
    Passthrough,
    /// The reserved end-of-sentence marker.
    EndOfSentence,
}

/// A candidate target phrase: the row it wraps plus the per-feature values
/// its static score was computed from.
#[derive(Debug, Clone)]
pub struct TargetPhrase {
    row: Arc<Row>,
    kind: PhraseKind,
    features: Arc<[f32]>,
}

impl TargetPhrase {
    pub fn new(row: Arc<Row>, kind: PhraseKind) -> Self {
        Self {
            row,
            kind,
            features: Arc::from(Vec::new()),
        }
    }

    fn with_features(mut self, store: FeatureStore) -> Self {
        self.features = Arc::from(store.into_values());
        self
    }

    pub fn row(&self) -> &Row {
        &self.row
    }

    pub fn words(&self) -> &[WordId] {
        self.row.target()
    }

    pub fn kind(&self) -> PhraseKind {
        self.kind
    }

    pub fn is_passthrough(&self) -> bool {
        self.kind == PhraseKind::Passthrough
    }

    pub fn is_end_of_sentence(&self) -> bool {
        self.kind == PhraseKind::EndOfSentence
    }

    /// Whether the phrase contributes words to the output.
    pub fn valid(&self) -> bool {
        !self.is_end_of_sentence()
    }

    /// Raw dense feature values recorded by the phrase-scoring pass.
    pub fn features(&self) -> &[f32] {
        &self.features
    }
}

impl Default for TargetPhrase {
    fn default() -> Self {
        Self::new(Arc::default(), PhraseKind::default())
    }
}

/// Index of span `[begin, end)` in the banded table.
pub(crate) fn band_index(begin: usize, end: usize, max_source_phrase_length: usize) -> usize {
    begin * max_source_phrase_length + end - begin - 1
}

/// Rows found for one span before the graph is allocated.
struct SpanRows {
    begin: usize,
    end: usize,
    rows: Vec<Arc<Row>>,
    kind: PhraseKind,
}

pub struct Chart {
    graph: Graph<TargetPhrase>,
    sentence: Vec<WordId>,
    /// Backs the rows of pass-through phrases; the phrase table owns the rest.
    oov_pool: Vec<Arc<Row>>,
    entries: Vec<Option<VertexId>>,
    end_of_sentence: VertexId,
    max_source_phrase_length: usize,
}

impl Chart {
    /// Build with the configured `[chart] max_source_phrase_length`.
    pub fn new(
        table: &dyn PhraseTable,
        input: &str,
        vocab: &mut Vocab,
        objective: &Objective,
    ) -> Result<Self, ChartError> {
        Self::with_max_source_phrase_length(
            settings().chart.max_source_phrase_length,
            table,
            input,
            vocab,
            objective,
        )
    }

    /// Tokenize `input`, look up every span of at most
    /// `max_source_phrase_length` words, and score every candidate once.
    pub fn with_max_source_phrase_length(
        max_source_phrase_length: usize,
        table: &dyn PhraseTable,
        input: &str,
        vocab: &mut Vocab,
        objective: &Objective,
    ) -> Result<Self, ChartError> {
        assert!(max_source_phrase_length > 0);
        if max_source_phrase_length > MAX_SOURCE_PHRASE_LENGTH {
            return Err(ChartError::PhraseLengthTooLong(max_source_phrase_length));
        }
        if !table.fields().target {
            return Err(ChartError::MissingTargetField);
        }

        let sentence = read_sentence(input, vocab, objective);
        let _span = debug_span!("build_chart", sentence_length = sentence.len()).entered();

        let spans = collect_spans(table, &sentence, max_source_phrase_length);
        let passthrough_count = spans
            .iter()
            .filter(|s| s.kind == PhraseKind::Passthrough)
            .count();

        // The end-of-sentence sentinel takes one vertex and one edge.
        let vertex_count = spans.len() + 1;
        let edge_count =
            spans.iter().map(|s| s.rows.len()).sum::<usize>() + passthrough_count + 1;
        let mut graph = Graph::new();
        graph.set_counts(vertex_count, edge_count)?;

        let end_of_sentence = graph.new_vertex()?;
        let end = sentence.len();
        add_target_phrase_to_vertex(
            &mut graph,
            end_of_sentence,
            Arc::new(Row::new(vec![EOS_WORD], Vec::new())),
            PhraseKind::EndOfSentence,
            SourcePhrase {
                begin: end,
                end,
                words: &[],
            },
            objective,
        )?;
        graph.set_root(end_of_sentence);

        let score_count = table.fields().score_names.len();
        let mut entries = vec![None; sentence.len() * max_source_phrase_length];
        let mut oov_pool = Vec::with_capacity(passthrough_count);
        for span in spans {
            let vertex = graph.new_vertex()?;
            let source = SourcePhrase {
                begin: span.begin,
                end: span.end,
                words: &sentence[span.begin..span.end],
            };
            if span.kind == PhraseKind::Passthrough {
                add_passthrough(&mut graph, vertex, source, score_count, &mut oov_pool, objective)?;
            } else {
                for row in span.rows {
                    add_target_phrase_to_vertex(&mut graph, vertex, row, span.kind, source, objective)?;
                }
            }
            graph.sort_edges(vertex);
            entries[band_index(span.begin, span.end, max_source_phrase_length)] = Some(vertex);
        }

        debug!(
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            passthroughs = oov_pool.len(),
        );
        Ok(Chart {
            graph,
            sentence,
            oov_pool,
            entries,
            end_of_sentence,
            max_source_phrase_length,
        })
    }

    pub fn sentence_length(&self) -> usize {
        self.sentence.len()
    }

    pub fn sentence(&self) -> &[WordId] {
        &self.sentence
    }

    pub fn max_source_phrase_length(&self) -> usize {
        self.max_source_phrase_length
    }

    /// Candidates for `[begin, end)`, or `None` if the span has none.
    ///
    /// # Panics
    ///
    /// Panics unless `begin < end <= sentence_length()` and the span is no
    /// longer than `max_source_phrase_length()`.
    pub fn range(&self, begin: usize, end: usize) -> Option<VertexId> {
        assert!(end > begin, "empty span [{begin}, {end})");
        assert!(
            end - begin <= self.max_source_phrase_length,
            "span [{begin}, {end}) longer than {}",
            self.max_source_phrase_length
        );
        assert!(
            end <= self.sentence_length(),
            "span [{begin}, {end}) past sentence end {}",
            self.sentence_length()
        );
        self.entries[band_index(begin, end, self.max_source_phrase_length)]
    }

    /// Source phrase descriptor for `[begin, end)`.
    pub fn source_phrase(&self, begin: usize, end: usize) -> SourcePhrase<'_> {
        SourcePhrase {
            begin,
            end,
            words: &self.sentence[begin..end],
        }
    }

    /// Sentinel vertex whose single edge carries the end-of-sentence marker.
    pub fn end_of_sentence(&self) -> VertexId {
        self.end_of_sentence
    }

    pub fn graph(&self) -> &Graph<TargetPhrase> {
        &self.graph
    }

    /// Rows synthesized for words the phrase table could not translate.
    pub fn passthrough_rows(&self) -> &[Arc<Row>] {
        &self.oov_pool
    }
}

/// Score `row` as a candidate for `source` and attach it under `vertex`.
fn add_target_phrase_to_vertex(
    graph: &mut Graph<TargetPhrase>,
    vertex: VertexId,
    row: Arc<Row>,
    kind: PhraseKind,
    source_phrase: SourcePhrase<'_>,
    objective: &Objective,
) -> Result<(), ArenaError> {
    let phrase = TargetPhrase::new(row, kind);
    let mut store = FeatureStore::new(objective.dense_feature_count());
    let pair = PhrasePair {
        source_phrase,
        target_phrase: &phrase,
    };
    let score = objective.score_phrase(pair, Some(&mut store));
    graph.add_edge(vertex, Edge::new(phrase.with_features(store), score))?;
    Ok(())
}

/// Copy the single source word of `source_phrase` to the target side.
fn add_passthrough(
    graph: &mut Graph<TargetPhrase>,
    vertex: VertexId,
    source_phrase: SourcePhrase<'_>,
    score_count: usize,
    oov_pool: &mut Vec<Arc<Row>>,
    objective: &Objective,
) -> Result<(), ArenaError> {
    debug_assert_eq!(source_phrase.len(), 1);
    let row = Arc::new(Row::new(source_phrase.words.to_vec(), vec![0.0; score_count]));
    oov_pool.push(Arc::clone(&row));
    add_target_phrase_to_vertex(
        graph,
        vertex,
        row,
        PhraseKind::Passthrough,
        source_phrase,
        objective,
    )
}

/// Split `input` on whitespace, interning words. Every word new to `vocab` is
/// announced to the objective's features, once.
fn read_sentence(input: &str, vocab: &mut Vocab, objective: &Objective) -> Vec<WordId> {
    input
        .split_whitespace()
        .map(|word| {
            let known = vocab.len();
            let id = vocab.find_or_insert(word);
            if id as usize >= known {
                objective.new_word(word, id);
            }
            id
        })
        .collect()
}

/// Query the table for every coverable span. Single-word spans with no
/// usable rows get a pass-through entry. Spans longer than the table's
/// longest source phrase are never looked up.
fn collect_spans(
    table: &dyn PhraseTable,
    sentence: &[WordId],
    max_source_phrase_length: usize,
) -> Vec<SpanRows> {
    let longest = max_source_phrase_length.min(table.max_source_phrase_length().max(1));
    let mut spans = Vec::new();
    for begin in 0..sentence.len() {
        let last = sentence.len().min(begin + longest);
        for end in begin + 1..=last {
            let rows: Vec<Arc<Row>> = table
                .lookup(&sentence[begin..end])
                .iter()
                .filter(|row| {
                    if row.target().is_empty() {
                        warn!(begin, end, "skipping phrase-table row with empty target");
                        return false;
                    }
                    true
                })
                .cloned()
                .collect();
            if !rows.is_empty() {
                spans.push(SpanRows {
                    begin,
                    end,
                    rows,
                    kind: PhraseKind::Table,
                });
            } else if end == begin + 1 {
                spans.push(SpanRows {
                    begin,
                    end,
                    rows: Vec::new(),
                    kind: PhraseKind::Passthrough,
                });
            }
        }
    }
    spans
}
