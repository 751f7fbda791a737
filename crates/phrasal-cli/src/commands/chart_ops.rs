use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use phrasal::{Engine, EngineError};
use phrasal_core::chart::PhraseKind;
use phrasal_core::vocab::{Vocab, WordId};

/// Display width of the target column in text output.
const TARGET_WIDTH: usize = 24;

#[derive(Debug, Serialize)]
pub struct ChartReport {
    pub sentence: Vec<String>,
    pub max_source_phrase_length: usize,
    pub spans: Vec<SpanReport>,
}

#[derive(Debug, Serialize)]
pub struct SpanReport {
    pub begin: usize,
    pub end: usize,
    pub source: String,
    pub candidates: Vec<CandidateReport>,
}

#[derive(Debug, Serialize)]
pub struct CandidateReport {
    pub target: String,
    pub kind: &'static str,
    pub score: f32,
}

fn kind_label(kind: PhraseKind) -> &'static str {
    match kind {
        PhraseKind::Table => "table",
        PhraseKind::Passthrough => "passthrough",
        PhraseKind::EndOfSentence => "end_of_sentence",
    }
}

fn join(vocab: &Vocab, words: &[WordId]) -> String {
    words
        .iter()
        .map(|&w| vocab.string(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Every populated span of `sentence`'s chart with its candidates, best
/// first.
pub fn chart_report(engine: &mut Engine, sentence: &str) -> Result<ChartReport, EngineError> {
    let chart = engine.chart(sentence)?;
    let vocab = engine.vocab();
    let length = chart.sentence_length();
    let max = chart.max_source_phrase_length();

    let mut spans = Vec::new();
    for begin in 0..length {
        for end in begin + 1..=length.min(begin + max) {
            let Some(vertex) = chart.range(begin, end) else {
                continue;
            };
            let candidates = chart
                .graph()
                .edges_of(vertex)
                .map(|edge| CandidateReport {
                    target: join(vocab, edge.payload().words()),
                    kind: kind_label(edge.payload().kind()),
                    score: edge.score(),
                })
                .collect();
            spans.push(SpanReport {
                begin,
                end,
                source: join(vocab, &chart.sentence()[begin..end]),
                candidates,
            });
        }
    }

    Ok(ChartReport {
        sentence: chart
            .sentence()
            .iter()
            .map(|&w| vocab.string(w).to_string())
            .collect(),
        max_source_phrase_length: max,
        spans,
    })
}

pub fn format_text(report: &ChartReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== Chart for \"{}\" ({} words, {} spans, max phrase length {}) ===\n",
        report.sentence.join(" "),
        report.sentence.len(),
        report.spans.len(),
        report.max_source_phrase_length,
    ));
    for span in &report.spans {
        out.push_str(&format!("  [{},{}] {}\n", span.begin, span.end, span.source));
        for candidate in &span.candidates {
            let width = UnicodeWidthStr::width(candidate.target.as_str());
            let padded = if width < TARGET_WIDTH {
                format!("{}{}", candidate.target, " ".repeat(TARGET_WIDTH - width))
            } else {
                candidate.target.clone()
            };
            let marker = if candidate.kind == "table" {
                String::new()
            } else {
                format!("  ({})", candidate.kind)
            };
            out.push_str(&format!(
                "    {} score={:<10.4}{}\n",
                padded, candidate.score, marker
            ));
        }
    }
    out
}

pub fn chart_cmd(table: &str, lm: &str, weights: Option<&str>, sentence: &str, json: bool) {
    let mut engine = super::open_engine(table, lm, weights);
    let report = die!(chart_report(&mut engine, sentence), "Error building chart: {}");
    if json {
        println!(
            "{}",
            die!(
                serde_json::to_string_pretty(&report),
                "Error serializing chart: {}"
            )
        );
    } else {
        print!("{}", format_text(&report));
    }
}
