//! Monotone stack decoding over a populated chart.
//!
//! Stack `i` holds hypotheses covering the first `i` source words. Within a
//! stack, hypotheses with the same LM state are recombined (only the best is
//! kept) and the rest is cut to the beam size before being extended.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, debug_span};

use crate::chart::{Chart, ChartError, TargetPhrase};
use crate::feature::{PhrasePair, SourcePhrase};
use crate::hypergraph::Edge;
use crate::hypothesis::Hypothesis;
use crate::lm::LmState;
use crate::objective::Objective;
use crate::phrase_table::PhraseTable;
use crate::settings::settings;
use crate::vocab::Vocab;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error("no hypothesis covers the whole sentence")]
    NoTranslation,
}

type Stack = HashMap<LmState, Arc<Hypothesis>>;

pub struct Decoder<'a> {
    objective: &'a Objective,
    beam_size: usize,
}

impl<'a> Decoder<'a> {
    /// Decoder with the configured `[search] beam_size`.
    pub fn new(objective: &'a Objective) -> Self {
        Self {
            objective,
            beam_size: settings().search.beam_size,
        }
    }

    pub fn with_beam_size(mut self, beam_size: usize) -> Self {
        self.beam_size = beam_size;
        self
    }

    /// Best complete hypothesis, ending with the end-of-sentence step.
    pub fn decode(&self, chart: &Chart) -> Result<Arc<Hypothesis>, DecodeError> {
        let length = chart.sentence_length();
        let _span = debug_span!("decode", sentence_length = length).entered();

        let mut stacks: Vec<Stack> = (0..=length).map(|_| Stack::new()).collect();
        let start = self.objective.start_hypothesis();
        stacks[0].insert(*start.lm_state(), start);

        for covered in 0..length {
            let beam = self.prune(std::mem::take(&mut stacks[covered]));
            let last = length.min(covered + chart.max_source_phrase_length());
            for hypothesis in &beam {
                for end in covered + 1..=last {
                    let Some(vertex) = chart.range(covered, end) else {
                        continue;
                    };
                    let source = chart.source_phrase(covered, end);
                    for edge in chart.graph().edges_of(vertex) {
                        let next = self.extend(hypothesis, source, edge);
                        recombine(&mut stacks[end], next);
                    }
                }
            }
        }

        let end_of_sentence = chart
            .graph()
            .best_edge(chart.end_of_sentence())
            .ok_or(DecodeError::NoTranslation)?;
        let best = self
            .prune(std::mem::take(&mut stacks[length]))
            .iter()
            .map(|hypothesis| self.finish(hypothesis, length, end_of_sentence))
            .max_by(|a, b| a.score().total_cmp(&b.score()))
            .ok_or(DecodeError::NoTranslation)?;
        debug!(score = best.score(), "best hypothesis");
        Ok(best)
    }

    /// Best `beam_size` hypotheses of `stack`, best first.
    fn prune(&self, stack: Stack) -> Vec<Arc<Hypothesis>> {
        let mut hypotheses: Vec<Arc<Hypothesis>> = stack.into_values().collect();
        hypotheses.sort_by(|a, b| b.score().total_cmp(&a.score()));
        hypotheses.truncate(self.beam_size);
        hypotheses
    }

    fn extend(
        &self,
        previous: &Arc<Hypothesis>,
        source_phrase: SourcePhrase<'_>,
        edge: &Edge<TargetPhrase>,
    ) -> Arc<Hypothesis> {
        let target_phrase = edge.payload();
        let mut pending = self.objective.pending_hypothesis(previous);
        let mut score = previous.score() + edge.score();
        score += self.objective.score_hypothesis_with_source_phrase(
            previous,
            source_phrase,
            &mut pending,
            None,
        );
        let pair = PhrasePair {
            source_phrase,
            target_phrase,
        };
        score += self
            .objective
            .score_hypothesis_with_phrase_pair(previous, pair, &mut pending, None);
        Hypothesis::extend(
            previous,
            target_phrase.clone(),
            source_phrase.end,
            score,
            pending,
        )
    }

    /// Append the end-of-sentence step and the final-hypothesis score.
    fn finish(
        &self,
        complete: &Arc<Hypothesis>,
        length: usize,
        end_of_sentence: &Edge<TargetPhrase>,
    ) -> Arc<Hypothesis> {
        let target_phrase = end_of_sentence.payload();
        let source_phrase = SourcePhrase {
            begin: length,
            end: length,
            words: &[],
        };
        let mut pending = self.objective.pending_hypothesis(complete);
        let mut score = complete.score() + end_of_sentence.score();
        score += self.objective.score_hypothesis_with_source_phrase(
            complete,
            source_phrase,
            &mut pending,
            None,
        );
        let pair = PhrasePair {
            source_phrase,
            target_phrase,
        };
        score += self
            .objective
            .score_hypothesis_with_phrase_pair(complete, pair, &mut pending, None);
        score += self
            .objective
            .score_final_hypothesis(complete, Some(pending.features_mut()));
        Hypothesis::extend(complete, target_phrase.clone(), length, score, pending)
    }
}

/// Keep `hypothesis` unless its stack already holds a better one with the
/// same LM state.
fn recombine(stack: &mut Stack, hypothesis: Arc<Hypothesis>) {
    let state = *hypothesis.lm_state();
    match stack.get(&state) {
        Some(existing) if existing.score() >= hypothesis.score() => {}
        _ => {
            stack.insert(state, hypothesis);
        }
    }
}

/// Build the chart for `input` and decode it.
pub fn translate(
    table: &dyn PhraseTable,
    objective: &Objective,
    vocab: &mut Vocab,
    input: &str,
) -> Result<Arc<Hypothesis>, DecodeError> {
    let chart = Chart::new(table, input, vocab, objective)?;
    Decoder::new(objective).decode(&chart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{output, target_words};
    use crate::testutil::{full_objective, test_table};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    fn decode(input: &str, beam_size: usize) -> (Arc<Hypothesis>, Vocab, Objective) {
        let mut vocab = Vocab::new();
        let table = test_table(&mut vocab);
        let objective = full_objective(&table, &vocab);
        let chart =
            Chart::with_max_source_phrase_length(7, &table, input, &mut vocab, &objective).unwrap();
        let best = Decoder::new(&objective)
            .with_beam_size(beam_size)
            .decode(&chart)
            .unwrap();
        (best, vocab, objective)
    }

    fn words(best: &Hypothesis, vocab: &Vocab) -> Vec<String> {
        target_words(best)
            .into_iter()
            .map(|w| vocab.string(w).to_string())
            .collect()
    }

    #[test]
    fn prefers_longer_phrase() {
        let (best, vocab, _) = decode("das haus", 10);
        assert_eq!(words(&best, &vocab), vec!["the", "house"]);
        // phrase -0.2, penalty -2, lm -0.7, </s> -0.2
        assert!(approx(best.score(), -3.1), "score {}", best.score());
        assert_eq!(best.path().len(), 2);
        assert!(best.target().unwrap().is_end_of_sentence());
    }

    #[test]
    fn unknown_word_is_copied() {
        let (best, vocab, _) = decode("das zebra", 10);
        assert_eq!(words(&best, &vocab), vec!["the", "zebra"]);
        assert!(approx(best.score(), -106.0), "score {}", best.score());
    }

    #[test]
    fn empty_sentence_scores_end_of_sentence() {
        let (best, vocab, _) = decode("", 10);
        assert!(words(&best, &vocab).is_empty());
        // backoff(<s>) + p(</s>)
        assert!(approx(best.score(), -1.5));
        let mut out = Vec::new();
        output(&best, &vocab, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "-1.5\n");
    }

    #[test]
    fn narrow_beam_still_translates() {
        let (best, vocab, _) = decode("das haus klein", 1);
        let words = words(&best, &vocab);
        assert_eq!(words.len(), 3);
        assert_eq!(words[2], "small");
        assert_eq!(best.previous().unwrap().source_end(), 3);
    }

    #[test]
    fn zero_beam_finds_nothing() {
        let mut vocab = Vocab::new();
        let table = test_table(&mut vocab);
        let objective = full_objective(&table, &vocab);
        let chart =
            Chart::with_max_source_phrase_length(7, &table, "das", &mut vocab, &objective).unwrap();
        let err = Decoder::new(&objective)
            .with_beam_size(0)
            .decode(&chart)
            .unwrap_err();
        assert!(matches!(err, DecodeError::NoTranslation));
    }

    #[test]
    fn step_scores_add_up() {
        let (best, _, objective) = decode("das haus klein", 10);
        let mut previous = 0.0;
        for step in best.path() {
            let phrase = step.target().unwrap().features();
            let extension = step.step_features().values();
            let weights = objective.weights();
            let recorded: f32 = (0..objective.dense_feature_count())
                .map(|i| {
                    let value = phrase.get(i).copied().unwrap_or(0.0) + extension[i];
                    value * weights[i]
                })
                .sum();
            assert!(approx(recorded, step.score() - previous));
            previous = step.score();
        }
    }

    #[test]
    fn recombination_keeps_best_per_state() {
        let mut stack = Stack::new();
        let start = Hypothesis::start(LmState::default());
        let (_, _, objective) = decode("", 1);
        let worse = Hypothesis::extend(
            &start,
            crate::testutil::word_phrase(3),
            1,
            -2.0,
            objective.pending_hypothesis(&start),
        );
        let better = Hypothesis::extend(
            &start,
            crate::testutil::word_phrase(4),
            1,
            -1.0,
            objective.pending_hypothesis(&start),
        );
        recombine(&mut stack, Arc::clone(&worse));
        recombine(&mut stack, Arc::clone(&better));
        recombine(&mut stack, worse);
        assert_eq!(stack.len(), 1);
        assert_eq!(stack[&LmState::default()].score(), -1.0);
    }

    #[test]
    fn translate_uses_settings() {
        let mut vocab = Vocab::new();
        let table = test_table(&mut vocab);
        let objective = full_objective(&table, &vocab);
        let best = translate(&table, &objective, &mut vocab, "das haus").unwrap();
        assert_eq!(words(&best, &vocab), vec!["the", "house"]);
    }
}
