//! Pooled hypergraph: vertices hold alternative derivations (edges) of a span.
//!
//! Both pools are sized once per sentence and handed out by index, so
//! references stay valid for the lifetime of the [`Graph`].

mod arena;
mod graph;

pub use arena::FixedArena;
pub use graph::{Edge, EdgeId, Graph, Vertex, VertexId};

/// Errors from arena bookkeeping. Any of these means the caller mis-sized the
/// hypergraph for the sentence; decoding of that sentence must abort.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    #[error("arena already initialized with {capacity} slots")]
    AlreadyInitialized { capacity: usize },

    #[error("allocating past end of arena ({capacity} slots)")]
    Exhausted { capacity: usize },
}
