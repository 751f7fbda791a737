//! Phrase-based translation decoder.
//!
//! [`engine::Engine`] loads a phrase table, a language model and weights, and
//! decodes sentences with the search core in `phrasal_core`.

pub mod engine;
pub mod trace_init;

pub use engine::{load_settings, Engine, EngineError, Translation};
