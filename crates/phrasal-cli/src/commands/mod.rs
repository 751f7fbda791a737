macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            std::process::exit(1);
        })
    };
}

pub mod chart_ops;
pub mod config_ops;
pub mod decode_ops;
pub mod feature_ops;

use std::path::Path;

use phrasal::Engine;

/// Open an engine or exit with the loader's error.
fn open_engine(table: &str, lm: &str, weights: Option<&str>) -> Engine {
    die!(
        Engine::open(Path::new(table), Path::new(lm), weights.map(Path::new)),
        "Error loading models: {}"
    )
}
