//! Search core of a phrase-based statistical translation decoder.
//!
//! A sentence is read into a [`chart::Chart`] of candidate target phrases per
//! source span, backed by an arena-allocated [`hypergraph::Graph`]. Partial
//! translations are [`hypothesis::Hypothesis`] backpointer chains, scored by
//! the weighted [`feature::Feature`]s registered with an
//! [`objective::Objective`].

pub mod chart;
pub mod feature;
pub mod hypergraph;
pub mod hypothesis;
pub mod lm;
pub mod objective;
pub mod output;
pub mod phrase_table;
pub mod scorer;
pub mod search;
pub mod settings;
pub(crate) mod testutil;
pub mod vocab;
pub mod weights;
