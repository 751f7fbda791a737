//! Chart, search and scorer limits shared by every sentence of a run.
//!
//! The built-in values come from `default_settings.toml`. A run may replace
//! them once, through [`init_custom`], as long as nothing has read them yet.

use std::sync::OnceLock;

use serde::Deserialize;

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

/// Upper bound for `[chart] max_source_phrase_length`. The banded span
/// table holds `sentence_length * max_source_phrase_length` slots.
pub const MAX_SOURCE_PHRASE_LENGTH: usize = 255;

static CUSTOM_TOML: OnceLock<String> = OnceLock::new();

/// Validate `toml_content` and install it in place of the defaults.
pub fn init_custom(toml_content: String) -> Result<(), SettingsError> {
    parse_settings_toml(&toml_content)?;
    CUSTOM_TOML
        .set(toml_content)
        .map_err(|_| SettingsError::AlreadyInitialized)
}

/// Settings of this run, parsed on first access.
pub fn settings() -> &'static Settings {
    static INSTANCE: OnceLock<Settings> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        let toml_str = CUSTOM_TOML
            .get()
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_SETTINGS_TOML);
        parse_settings_toml(toml_str).expect("settings TOML must be valid")
    })
}

/// Returns the embedded default settings TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_SETTINGS_TOML
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("settings already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub chart: ChartSettings,
    pub search: SearchSettings,
    pub scorer: ScorerSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartSettings {
    pub max_source_phrase_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    pub beam_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScorerSettings {
    pub passthrough_score: f32,
}

pub fn parse_settings_toml(toml_str: &str) -> Result<Settings, SettingsError> {
    let s: Settings = toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;
    validate(&s)?;
    Ok(s)
}

fn validate(s: &Settings) -> Result<(), SettingsError> {
    macro_rules! check_positive_usize {
        ($section:ident . $field:ident) => {
            if s.$section.$field == 0 {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        };
    }

    check_positive_usize!(chart.max_source_phrase_length);
    check_positive_usize!(search.beam_size);

    if s.chart.max_source_phrase_length > MAX_SOURCE_PHRASE_LENGTH {
        return Err(SettingsError::InvalidValue {
            field: "chart.max_source_phrase_length".to_string(),
            reason: format!("must be at most {MAX_SOURCE_PHRASE_LENGTH}"),
        });
    }

    let passthrough = s.scorer.passthrough_score;
    if !passthrough.is_finite() || passthrough > 0.0 {
        return Err(SettingsError::InvalidValue {
            field: "scorer.passthrough_score".to_string(),
            reason: "must be a finite log-score <= 0".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_default_toml() {
        let s = parse_settings_toml(DEFAULT_SETTINGS_TOML).unwrap();
        assert_eq!(s.chart.max_source_phrase_length, 7);
        assert_eq!(s.search.beam_size, 200);
        assert!((s.scorer.passthrough_score + 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn parse_valid_custom_toml() {
        let toml = r#"
[chart]
max_source_phrase_length = 3

[search]
beam_size = 10

[scorer]
passthrough_score = -20.0
"#;
        let s = parse_settings_toml(toml).unwrap();
        assert_eq!(s.chart.max_source_phrase_length, 3);
        assert_eq!(s.search.beam_size, 10);
    }

    #[test]
    fn error_zero_phrase_length() {
        let toml = r#"
[chart]
max_source_phrase_length = 0

[search]
beam_size = 10

[scorer]
passthrough_score = -20.0
"#;
        let err = parse_settings_toml(toml).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { .. }));
        assert!(err.to_string().contains("chart.max_source_phrase_length"));
    }

    #[test]
    fn error_phrase_length_too_long() {
        let toml = r#"
[chart]
max_source_phrase_length = 9223372036854775807

[search]
beam_size = 10

[scorer]
passthrough_score = -20.0
"#;
        let err = parse_settings_toml(toml).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { .. }));
        assert!(err.to_string().contains("must be at most 255"));
    }

    #[test]
    fn longest_phrase_length_accepted() {
        let toml = format!(
            "[chart]\nmax_source_phrase_length = {MAX_SOURCE_PHRASE_LENGTH}\n\n\
             [search]\nbeam_size = 10\n\n[scorer]\npassthrough_score = -20.0\n"
        );
        let s = parse_settings_toml(&toml).unwrap();
        assert_eq!(s.chart.max_source_phrase_length, MAX_SOURCE_PHRASE_LENGTH);
    }

    #[test]
    fn error_zero_beam() {
        let toml = r#"
[chart]
max_source_phrase_length = 5

[search]
beam_size = 0

[scorer]
passthrough_score = -20.0
"#;
        let err = parse_settings_toml(toml).unwrap_err();
        assert!(err.to_string().contains("search.beam_size"));
    }

    #[test]
    fn error_positive_passthrough() {
        let toml = r#"
[chart]
max_source_phrase_length = 5

[search]
beam_size = 10

[scorer]
passthrough_score = 3.5
"#;
        let err = parse_settings_toml(toml).unwrap_err();
        assert!(err.to_string().contains("scorer.passthrough_score"));
    }

    #[test]
    fn error_invalid_toml() {
        let err = parse_settings_toml("not valid toml {{{").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn error_missing_section() {
        let toml = r#"
[chart]
max_source_phrase_length = 5
"#;
        let err = parse_settings_toml(toml).unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }
}
