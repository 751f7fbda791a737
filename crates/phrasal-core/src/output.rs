//! Turning a finished hypothesis chain back into text.

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::hypothesis::Hypothesis;
use crate::objective::Objective;
use crate::vocab::{Vocab, WordId};

/// Key under which the whole-step score delta is recorded.
pub const TOTAL: &str = "_total";

/// Per-step score deltas of one feature and their running sum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreHistory {
    pub scores: Vec<f32>,
    pub total: f32,
}

impl ScoreHistory {
    fn push(&mut self, delta: f32) {
        self.scores.push(delta);
        self.total += delta;
    }
}

/// Histories keyed by feature name, plus [`TOTAL`].
pub type ScoreHistoryMap = BTreeMap<String, ScoreHistory>;

/// Word-producing steps of the chain ending at `hypothesis`, left to right.
/// The start sentinel and the end-of-sentence step are left out.
pub fn output_steps(hypothesis: &Hypothesis) -> Vec<&Hypothesis> {
    let mut steps = hypothesis.path();
    steps.retain(|h| h.target().is_some_and(|t| t.valid()));
    steps
}

/// Target words of the translation ending at `hypothesis`.
pub fn target_words(hypothesis: &Hypothesis) -> Vec<WordId> {
    output_steps(hypothesis)
        .into_iter()
        .filter_map(Hypothesis::target)
        .flat_map(|t| t.words().iter().copied())
        .collect()
}

/// Write `<score> <word> <word> ...` and a newline.
pub fn output<W: Write>(hypothesis: &Hypothesis, vocab: &Vocab, out: &mut W) -> io::Result<()> {
    write!(out, "{}", hypothesis.score())?;
    for word in target_words(hypothesis) {
        write!(out, " {}", vocab.string(word))?;
    }
    writeln!(out)
}

/// Write each step's words followed by the running score breakdown.
///
/// `map` is cleared first and holds the complete histories afterwards. The
/// delta of a step is its cumulative score minus the previous step's; per
/// feature it is the weighted sum of the phrase and extension values recorded
/// for that step.
pub fn output_verbose<W: Write>(
    hypothesis: &Hypothesis,
    vocab: &Vocab,
    objective: &Objective,
    map: &mut ScoreHistoryMap,
    out: &mut W,
) -> io::Result<()> {
    map.clear();
    let mut previous_score = 0.0;
    for step in output_steps(hypothesis) {
        if let Some(target) = step.target() {
            for &word in target.words() {
                write!(out, "{} ", vocab.string(word))?;
            }
        }
        let delta = step.score() - previous_score;
        previous_score = step.score();
        map.entry(TOTAL.to_string()).or_default().push(delta);
        for (name, score) in objective.weighted_by_feature(&step_values(step)) {
            map.entry(name.to_string()).or_default().push(score);
        }
        writeln!(out)?;

        for (name, history) in map.iter() {
            writeln!(out, "{name}: {}", history.total)?;
            write!(out, "    [")?;
            for score in &history.scores {
                write!(out, "{score},")?;
            }
            writeln!(out, "]")?;
        }
    }
    Ok(())
}

/// Raw dense values of one step: the phrase's static values plus those
/// recorded while extending the previous hypothesis.
fn step_values(step: &Hypothesis) -> Vec<f32> {
    let extension = step.step_features().values();
    let phrase = step.target().map(|t| t.features()).unwrap_or(&[]);
    let mut values = vec![0.0; extension.len().max(phrase.len())];
    for (slot, value) in values.iter_mut().zip(extension) {
        *slot += value;
    }
    for (slot, value) in values.iter_mut().zip(phrase) {
        *slot += value;
    }
    values
}
