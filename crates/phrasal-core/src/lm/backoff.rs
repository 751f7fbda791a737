//! Back-off n-gram model read from an ARPA file.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::info;

use super::{LanguageModel, LmError, LmState, WordIndex, MAX_ORDER};

/// Log10 probability assigned to `<unk>` when the ARPA file omits it.
const DEFAULT_UNK_PROB: f32 = -100.0;

#[derive(Debug, Clone, Copy)]
struct NgramEntry {
    prob: f32,
    backoff: f32,
}

/// Back-off model. N-grams are keyed by their word sequence, oldest first.
#[derive(Debug)]
pub struct BackoffModel {
    order: usize,
    vocab: HashMap<String, WordIndex>,
    ngrams: HashMap<Vec<WordIndex>, NgramEntry>,
    unk: WordIndex,
    bos: WordIndex,
    eos: WordIndex,
}

enum Section {
    Preamble,
    Data,
    Ngrams(usize),
    End,
}

impl BackoffModel {
    pub fn open(path: &Path) -> Result<Self, LmError> {
        let text = fs::read_to_string(path)?;
        let model = Self::parse_arpa(&text)?;
        info!(path = %path.display(), order = model.order, "loaded language model");
        Ok(model)
    }

    pub fn parse_arpa(text: &str) -> Result<Self, LmError> {
        let mut section = Section::Preamble;
        let mut order = 0;
        let mut vocab: HashMap<String, WordIndex> = HashMap::new();
        let mut ngrams = HashMap::new();

        for (i, raw) in text.lines().enumerate() {
            let line_no = i + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if line == "\\data\\" {
                section = Section::Data;
                continue;
            }
            if line == "\\end\\" {
                section = Section::End;
                continue;
            }
            if let Some(n) = line
                .strip_prefix('\\')
                .and_then(|s| s.strip_suffix("-grams:"))
            {
                let n: usize = n.parse().map_err(|_| LmError::Parse {
                    line: line_no,
                    reason: format!("bad section header {line:?}"),
                })?;
                if n == 0 || n > order {
                    return Err(LmError::Parse {
                        line: line_no,
                        reason: format!("{n}-grams not announced in \\data\\"),
                    });
                }
                section = Section::Ngrams(n);
                continue;
            }

            match section {
                Section::Preamble | Section::End => {}
                Section::Data => {
                    let n = line
                        .strip_prefix("ngram ")
                        .and_then(|s| s.split('=').next())
                        .and_then(|s| s.trim().parse::<usize>().ok())
                        .ok_or_else(|| LmError::Parse {
                            line: line_no,
                            reason: format!("expected `ngram N=count`, found {line:?}"),
                        })?;
                    order = order.max(n);
                    if order > MAX_ORDER {
                        return Err(LmError::UnsupportedOrder(order));
                    }
                }
                Section::Ngrams(n) => {
                    let mut parts = line.split_whitespace();
                    let prob = parts
                        .next()
                        .and_then(|p| p.parse::<f32>().ok())
                        .ok_or_else(|| LmError::Parse {
                            line: line_no,
                            reason: "missing log probability".to_string(),
                        })?;
                    let words: Vec<&str> = parts.by_ref().take(n).collect();
                    if words.len() != n {
                        return Err(LmError::Parse {
                            line: line_no,
                            reason: format!("expected {n} words"),
                        });
                    }
                    let backoff = match parts.next() {
                        Some(b) => b.parse::<f32>().map_err(|_| LmError::Parse {
                            line: line_no,
                            reason: format!("bad backoff {b:?}"),
                        })?,
                        None => 0.0,
                    };
                    let key = words
                        .iter()
                        .map(|w| {
                            let next = vocab.len() as WordIndex;
                            *vocab.entry((*w).to_string()).or_insert(next)
                        })
                        .collect::<Vec<_>>();
                    ngrams.insert(key, NgramEntry { prob, backoff });
                }
            }
        }

        if order == 0 {
            return Err(LmError::Parse {
                line: 0,
                reason: "missing \\data\\ section".to_string(),
            });
        }

        let mut intern = |w: &str| {
            let next = vocab.len() as WordIndex;
            *vocab.entry(w.to_string()).or_insert(next)
        };
        let unk = intern("<unk>");
        let bos = intern("<s>");
        let eos = intern("</s>");
        ngrams.entry(vec![unk]).or_insert(NgramEntry {
            prob: DEFAULT_UNK_PROB,
            backoff: 0.0,
        });

        Ok(Self {
            order,
            vocab,
            ngrams,
            unk,
            bos,
            eos,
        })
    }

    /// Trim `context` to its longest suffix the model can extend.
    fn minimize(&self, context: &[WordIndex]) -> LmState {
        let keep = self.order.saturating_sub(1);
        let mut start = context.len().saturating_sub(keep);
        while start < context.len() && !self.ngrams.contains_key(&context[start..]) {
            start += 1;
        }
        LmState::from_context(&context[start..])
    }
}

impl LanguageModel for BackoffModel {
    fn order(&self) -> usize {
        self.order
    }

    fn index(&self, word: &str) -> WordIndex {
        self.vocab.get(word).copied().unwrap_or(self.unk)
    }

    fn oov(&self) -> WordIndex {
        self.unk
    }

    fn end_sentence(&self) -> WordIndex {
        self.eos
    }

    fn begin_sentence_state(&self) -> LmState {
        LmState::from_context(&[self.bos])
    }

    fn score(&self, state: &LmState, word: WordIndex) -> (f32, LmState) {
        let context = state.context();
        let mut key: Vec<WordIndex> = Vec::with_capacity(context.len() + 1);

        // Longest n-gram ending in `word`, backing off through shorter contexts.
        let mut score = 0.0;
        let mut found = None;
        for start in 0..=context.len() {
            key.clear();
            key.extend_from_slice(&context[start..]);
            key.push(word);
            if let Some(entry) = self.ngrams.get(&key) {
                found = Some((start, entry.prob));
                break;
            }
        }
        let (matched_from, prob) = found.unwrap_or((context.len(), DEFAULT_UNK_PROB));
        score += prob;
        for start in 0..matched_from {
            if let Some(entry) = self.ngrams.get(&context[start..]) {
                score += entry.backoff;
            }
        }

        let mut extended = context.to_vec();
        extended.push(word);
        (score, self.minimize(&extended))
    }
}
