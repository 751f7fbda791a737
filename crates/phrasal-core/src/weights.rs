//! Feature weights keyed by feature name.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum WeightsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    Parse(String),

    #[error("no weights for feature {0}")]
    MissingFeature(String),

    #[error("feature {feature} expects {expected} weights, found {found}")]
    CountMismatch {
        feature: String,
        expected: usize,
        found: usize,
    },
}

/// Weight vectors by feature name, as read from a weight file.
///
/// The file is TOML with one array per feature:
///
/// ```toml
/// phrase = [0.2, 0.2, 0.2, 0.2]
/// lm = [0.5, 1.0]
/// word_penalty = [-0.3]
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Weights {
    by_name: HashMap<String, Vec<f32>>,
}

impl Weights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f32>) {
        self.by_name.insert(name.into(), values);
    }

    pub fn get(&self, name: &str) -> Option<&[f32]> {
        self.by_name.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn parse(text: &str) -> Result<Self, WeightsError> {
        let by_name: HashMap<String, Vec<f32>> =
            toml::from_str(text).map_err(|e| WeightsError::Parse(e.to_string()))?;
        Ok(Self { by_name })
    }

    pub fn open(path: &Path) -> Result<Self, WeightsError> {
        let text = fs::read_to_string(path)?;
        let weights = Self::parse(&text)?;
        info!(path = %path.display(), features = weights.by_name.len(), "loaded weights");
        Ok(weights)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parse_arrays() {
        let w = Weights::parse("lm = [0.5, 1]\nword_penalty = [-0.3]\n").unwrap();
        assert_eq!(w.get("lm"), Some(&[0.5, 1.0][..]));
        assert_eq!(w.get("word_penalty"), Some(&[-0.3][..]));
        assert_eq!(w.get("distortion"), None);
    }

    #[test]
    fn error_not_an_array() {
        let err = Weights::parse("lm = \"high\"\n").unwrap_err();
        assert!(matches!(err, WeightsError::Parse(_)));
    }

    #[test]
    fn open_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "distortion = [0.1]").unwrap();
        let w = Weights::open(file.path()).unwrap();
        assert_eq!(w.names().collect::<Vec<_>>(), vec!["distortion"]);
    }
}
