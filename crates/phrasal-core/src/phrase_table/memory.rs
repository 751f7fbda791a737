use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use super::{FieldConfig, PhraseTable, PhraseTableError, Row};
use crate::vocab::{Vocab, WordId};

const SEPARATOR: &str = "|||";

/// Phrase table held in memory, keyed by source word sequence.
#[derive(Debug, Default)]
pub struct MemoryTable {
    fields: FieldConfig,
    rows: HashMap<Vec<WordId>, Vec<Arc<Row>>>,
    max_source_phrase_length: usize,
}

impl MemoryTable {
    pub fn new(fields: FieldConfig) -> Self {
        Self {
            fields,
            rows: HashMap::new(),
            max_source_phrase_length: 0,
        }
    }

    /// Append a row for `source`. Rows keep insertion order per source.
    pub fn insert(&mut self, source: Vec<WordId>, row: Row) {
        self.max_source_phrase_length = self.max_source_phrase_length.max(source.len());
        self.rows.entry(source).or_default().push(Arc::new(row));
    }

    /// Number of rows across all source phrases.
    pub fn len(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Load a Moses-format text table from disk.
    pub fn open(path: &Path, vocab: &mut Vocab) -> Result<Self, PhraseTableError> {
        let text = fs::read_to_string(path)?;
        let table = Self::parse(&text, vocab)?;
        info!(path = %path.display(), rows = table.len(), "loaded phrase table");
        Ok(table)
    }

    /// Parse `source ||| target ||| s1 s2 ...` lines. Any further `|||`
    /// fields (alignments, counts) are ignored. Every line must carry the
    /// same number of scores as the first.
    pub fn parse(text: &str, vocab: &mut Vocab) -> Result<Self, PhraseTableError> {
        let mut table: Option<MemoryTable> = None;
        for (i, line) in text.lines().enumerate() {
            let line_no = i + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split(SEPARATOR).map(str::trim);
            let (Some(source), Some(target), Some(scores)) =
                (fields.next(), fields.next(), fields.next())
            else {
                return Err(PhraseTableError::Parse {
                    line: line_no,
                    reason: "expected `source ||| target ||| scores`".to_string(),
                });
            };
            if source.is_empty() {
                return Err(PhraseTableError::Parse {
                    line: line_no,
                    reason: "empty source phrase".to_string(),
                });
            }
            let scores = scores
                .split_whitespace()
                .map(|s| {
                    s.parse::<f32>().map_err(|e| PhraseTableError::Parse {
                        line: line_no,
                        reason: format!("bad score {s:?}: {e}"),
                    })
                })
                .collect::<Result<Vec<f32>, _>>()?;

            let table = table.get_or_insert_with(|| {
                let names = (0..scores.len()).map(|i| format!("score{i}")).collect();
                MemoryTable::new(FieldConfig::with_scores(names))
            });
            if scores.len() != table.fields.score_names.len() {
                return Err(PhraseTableError::Parse {
                    line: line_no,
                    reason: format!(
                        "expected {} scores, found {}",
                        table.fields.score_names.len(),
                        scores.len()
                    ),
                });
            }

            let source = source
                .split_whitespace()
                .map(|w| vocab.find_or_insert(w))
                .collect();
            let target = target
                .split_whitespace()
                .map(|w| vocab.find_or_insert(w))
                .collect();
            table.insert(source, Row::new(target, scores));
        }
        Ok(table.unwrap_or_else(|| MemoryTable::new(FieldConfig::with_scores(Vec::new()))))
    }
}

impl PhraseTable for MemoryTable {
    fn fields(&self) -> &FieldConfig {
        &self.fields
    }

    fn max_source_phrase_length(&self) -> usize {
        self.max_source_phrase_length
    }

    fn lookup(&self, source: &[WordId]) -> &[Arc<Row>] {
        self.rows.get(source).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const TABLE: &str = "\
das ||| the ||| -0.5 -0.7
das ||| that ||| -1.2 -1.0
das haus ||| the house ||| -0.3 -0.4 ||| 0-0 1-1
haus ||| house ||| -0.2 -0.1
";

    #[test]
    fn parse_basic() {
        let mut vocab = Vocab::new();
        let table = MemoryTable::parse(TABLE, &mut vocab).unwrap();

        assert_eq!(table.len(), 4);
        assert_eq!(table.max_source_phrase_length(), 2);
        assert_eq!(table.fields().score_names, vec!["score0", "score1"]);
        assert!(table.fields().target);

        let das = vocab.find("das").unwrap();
        let rows = table.lookup(&[das]);
        assert_eq!(rows.len(), 2);
        assert_eq!(vocab.string(rows[0].target()[0]), "the");
        assert_eq!(vocab.string(rows[1].target()[0]), "that");
        assert_eq!(rows[1].scores(), &[-1.2, -1.0]);

        let haus = vocab.find("haus").unwrap();
        let rows = table.lookup(&[das, haus]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].target().len(), 2);
    }

    #[test]
    fn lookup_missing_is_empty() {
        let mut vocab = Vocab::new();
        let table = MemoryTable::parse(TABLE, &mut vocab).unwrap();
        let unk = vocab.find_or_insert("katze");
        assert!(table.lookup(&[unk]).is_empty());
    }

    #[test]
    fn error_score_count_mismatch() {
        let mut vocab = Vocab::new();
        let err = MemoryTable::parse("a ||| b ||| -1 -2\nc ||| d ||| -1\n", &mut vocab).unwrap_err();
        assert!(matches!(err, PhraseTableError::Parse { line: 2, .. }));
    }

    #[test]
    fn error_missing_fields() {
        let mut vocab = Vocab::new();
        let err = MemoryTable::parse("a ||| b\n", &mut vocab).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn error_bad_score() {
        let mut vocab = Vocab::new();
        let err = MemoryTable::parse("a ||| b ||| x\n", &mut vocab).unwrap_err();
        assert!(err.to_string().contains("bad score"));
    }

    #[test]
    fn open_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TABLE.as_bytes()).unwrap();
        let mut vocab = Vocab::new();
        let table = MemoryTable::open(file.path(), &mut vocab).unwrap();
        assert_eq!(table.len(), 4);
    }
}
