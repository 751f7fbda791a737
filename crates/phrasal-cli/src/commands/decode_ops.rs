use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;

use phrasal::{Engine, EngineError};
use phrasal_core::output::ScoreHistoryMap;

/// How each decoded sentence is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// `<score> <word> ...`
    #[default]
    Plain,
    /// Per-step score breakdown, then the plain line.
    Verbose,
    /// One JSON object per line.
    Json,
}

/// Decode every line of `input`. Returns the number of sentences written.
pub fn decode_stream<R: BufRead, W: Write>(
    engine: &mut Engine,
    input: R,
    out: &mut W,
    mode: OutputMode,
) -> Result<usize, EngineError> {
    let mut history = ScoreHistoryMap::new();
    let mut count = 0;
    for line in input.lines() {
        let line = line?;
        match mode {
            OutputMode::Plain => engine.write_translation(&line, None, out)?,
            OutputMode::Verbose => engine.write_translation(&line, Some(&mut history), out)?,
            OutputMode::Json => {
                let translation = engine.translate(&line)?;
                serde_json::to_writer(&mut *out, &translation).map_err(io::Error::from)?;
                writeln!(out)?;
            }
        }
        count += 1;
    }
    out.flush()?;
    Ok(count)
}

pub fn decode_cmd(
    table: &str,
    lm: &str,
    weights: Option<&str>,
    config: Option<&str>,
    mode: OutputMode,
) {
    // Settings must be in place before the scorer reads them.
    if let Some(config) = config {
        die!(
            phrasal::load_settings(Path::new(config)),
            "Error loading settings: {}"
        );
    }
    let mut engine = super::open_engine(table, lm, weights);
    let stdin = io::stdin();
    let mut out = BufWriter::new(io::stdout().lock());
    die!(
        decode_stream(&mut engine, stdin.lock(), &mut out, mode),
        "Error decoding: {}"
    );
}
