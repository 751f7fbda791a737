#![cfg(test)]

use std::sync::{Arc, Mutex};

use crate::chart::{PhraseKind, TargetPhrase};
use crate::feature::{
    Distortion, Feature, LanguageModelFeature, PhrasePair, PhraseScores, ScoreCollector,
    SourcePhrase, WordPenalty,
};
use crate::hypothesis::Hypothesis;
use crate::lm::BackoffModel;
use crate::objective::Objective;
use crate::phrase_table::{MemoryTable, PhraseTable, Row};
use crate::scorer::Scorer;
use crate::vocab::{Vocab, WordId};

/// Bigram model over a handful of English words.
pub const TEST_ARPA: &str = "\
\\data\\
ngram 1=6
ngram 2=4

\\1-grams:
-2.0\t<unk>
-99\t<s>\t-0.5
-1.0\t</s>
-0.8\tthe\t-0.4
-1.0\thouse\t-0.2
-1.2\tsmall\t-0.3

\\2-grams:
-0.3\t<s> the
-0.4\tthe house
-0.2\thouse </s>
-0.6\tthe small

\\end\\
";

/// Shared phrase table for chart and search tests. Two score fields.
pub const TEST_TABLE: &str = "\
das ||| the ||| -0.1 -0.2
das ||| that ||| -1.5 -1.0
haus ||| house ||| -0.2 -0.3
das haus ||| the house ||| -0.1 -0.1
klein ||| small ||| -0.3 -0.3
";

pub fn test_table(vocab: &mut Vocab) -> MemoryTable {
    MemoryTable::parse(TEST_TABLE, vocab).unwrap()
}

/// One-word table phrase with no scores.
pub fn word_phrase(word: WordId) -> TargetPhrase {
    TargetPhrase::new(Arc::new(Row::new(vec![word], Vec::new())), PhraseKind::Table)
}

/// Objective with every concrete feature over [`TEST_ARPA`], all weights 1.
pub fn full_objective(table: &dyn PhraseTable, vocab: &Vocab) -> Objective {
    let model = BackoffModel::parse_arpa(TEST_ARPA).unwrap();
    let scorer = Scorer::new(Arc::new(model), vocab).with_passthrough(-100.0);
    let mut objective = Objective::new(table.fields().clone());
    objective.add_feature(Box::new(PhraseScores::new())).unwrap();
    objective.add_feature(Box::new(WordPenalty)).unwrap();
    objective.add_feature(Box::new(Distortion)).unwrap();
    objective
        .add_feature(Box::new(LanguageModelFeature::new(Arc::new(scorer))))
        .unwrap();
    objective
}

#[derive(Debug, Default)]
struct Recorded {
    phrase_calls: usize,
    words: Vec<(String, WordId)>,
    phrases: Vec<Vec<WordId>>,
}

/// Read side of a [`MockFeature`]'s call log.
#[derive(Debug, Clone)]
pub struct MockLog(Arc<Mutex<Recorded>>);

impl MockLog {
    pub fn phrase_calls(&self) -> usize {
        self.0.lock().unwrap().phrase_calls
    }

    pub fn words(&self) -> Vec<(String, WordId)> {
        self.0.lock().unwrap().words.clone()
    }

    /// Target words of every phrase passed to `score_phrase`, in call order.
    pub fn phrases(&self) -> Vec<Vec<WordId>> {
        self.0.lock().unwrap().phrases.clone()
    }
}

/// Records its calls and adds 1.0 to each of its dimensions in every
/// scoring callback.
pub struct MockFeature {
    name: String,
    count: usize,
    log: MockLog,
}

impl MockFeature {
    pub fn new(name: &str, count: usize) -> (Self, MockLog) {
        let log = MockLog(Arc::new(Mutex::new(Recorded::default())));
        let feature = Self {
            name: name.to_string(),
            count,
            log: log.clone(),
        };
        (feature, log)
    }

    fn add_ones(&self, collector: &mut ScoreCollector<'_>) {
        for i in 0..self.count {
            collector.add_dense(i, 1.0);
        }
    }
}

impl Feature for MockFeature {
    fn name(&self) -> &str {
        &self.name
    }

    fn new_word(&self, string_rep: &str, word: WordId) {
        self.log
            .0
            .lock()
            .unwrap()
            .words
            .push((string_rep.to_string(), word));
    }

    fn score_phrase(&self, phrase_pair: PhrasePair<'_>, collector: &mut ScoreCollector<'_>) {
        {
            let mut recorded = self.log.0.lock().unwrap();
            recorded.phrase_calls += 1;
            recorded
                .phrases
                .push(phrase_pair.target_phrase.words().to_vec());
        }
        self.add_ones(collector);
    }

    fn score_hypothesis_with_source_phrase(
        &self,
        _hypothesis: &Hypothesis,
        _source_phrase: SourcePhrase<'_>,
        collector: &mut ScoreCollector<'_>,
    ) {
        self.add_ones(collector);
    }

    fn score_hypothesis_with_phrase_pair(
        &self,
        _hypothesis: &Hypothesis,
        _phrase_pair: PhrasePair<'_>,
        collector: &mut ScoreCollector<'_>,
    ) {
        self.add_ones(collector);
    }

    fn score_final_hypothesis(&self, _hypothesis: &Hypothesis, collector: &mut ScoreCollector<'_>) {
        self.add_ones(collector);
    }

    fn dense_feature_count(&self) -> usize {
        self.count
    }

    fn feature_description(&self, index: usize) -> String {
        format!("{} #{index}", self.name)
    }
}
