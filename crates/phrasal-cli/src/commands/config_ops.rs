use std::fs;

use phrasal_core::settings;

pub fn settings_export() {
    print!("{}", settings::default_toml());
}

pub fn settings_validate(file: &str) {
    let content = die!(fs::read_to_string(file), "Error reading {file}: {}");
    let s = die!(settings::parse_settings_toml(&content), "Error: {}");
    println!(
        "OK: chart.max_source_phrase_length={}, search.beam_size={}, scorer.passthrough_score={}",
        s.chart.max_source_phrase_length, s.search.beam_size, s.scorer.passthrough_score
    );
}
