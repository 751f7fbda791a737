//! Word interning shared by the phrase table, the chart and the features.

use std::collections::HashMap;

/// Global vocabulary id.
pub type WordId = u32;

/// Reserved id for unknown words.
pub const UNK: WordId = 0;
/// Reserved id for the sentence-start marker.
pub const BOS: WordId = 1;
/// Reserved id for the sentence-end marker.
pub const EOS: WordId = 2;

const RESERVED: [&str; 3] = ["<unk>", "<s>", "</s>"];

/// Mutable string interner. Ids are dense and assigned in insertion order.
#[derive(Debug, Clone)]
pub struct Vocab {
    ids: HashMap<Box<str>, WordId>,
    strings: Vec<Box<str>>,
}

impl Default for Vocab {
    fn default() -> Self {
        Self::new()
    }
}

impl Vocab {
    /// Create a vocabulary holding only the reserved markers.
    pub fn new() -> Self {
        let mut vocab = Self {
            ids: HashMap::new(),
            strings: Vec::new(),
        };
        for word in RESERVED {
            vocab.find_or_insert(word);
        }
        vocab
    }

    /// Return the id of `word`, interning it if it has not been seen.
    pub fn find_or_insert(&mut self, word: &str) -> WordId {
        if let Some(&id) = self.ids.get(word) {
            return id;
        }
        let id = self.strings.len() as WordId;
        let boxed: Box<str> = word.into();
        self.ids.insert(boxed.clone(), id);
        self.strings.push(boxed);
        id
    }

    pub fn find(&self, word: &str) -> Option<WordId> {
        self.ids.get(word).copied()
    }

    /// Look up the string for an id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this vocabulary.
    pub fn string(&self, id: WordId) -> &str {
        &self.strings[id as usize]
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Iterate `(id, string)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (WordId, &str)> {
        self.strings
            .iter()
            .enumerate()
            .map(|(i, s)| (i as WordId, s.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_markers() {
        let vocab = Vocab::new();
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.string(UNK), "<unk>");
        assert_eq!(vocab.string(BOS), "<s>");
        assert_eq!(vocab.string(EOS), "</s>");
    }

    #[test]
    fn find_or_insert_is_stable() {
        let mut vocab = Vocab::new();
        let a = vocab.find_or_insert("haus");
        let b = vocab.find_or_insert("das");
        assert_eq!(vocab.find_or_insert("haus"), a);
        assert_ne!(a, b);
        assert_eq!(vocab.find("das"), Some(b));
        assert_eq!(vocab.find("nope"), None);
        assert_eq!(vocab.len(), 5);
    }
}
