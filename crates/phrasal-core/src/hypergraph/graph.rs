use std::fmt;

use super::{ArenaError, FixedArena};

/// Stable handle to a vertex in a [`Graph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(u32);

/// Stable handle to an edge in a [`Graph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(u32);

impl VertexId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl EdgeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// All derivations of one span (or of a sentinel).
///
/// Incoming edges are kept in insertion order until
/// [`Graph::sort_edges`] orders them best-first.
#[derive(Debug, Clone, Default)]
pub struct Vertex {
    edges: Vec<EdgeId>,
}

impl Vertex {
    /// Every derivation of this vertex.
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    /// One representative derivation: the first edge, which is the best
    /// scoring one once the vertex has been sorted.
    pub fn best(&self) -> Option<EdgeId> {
        self.edges.first().copied()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// One derivation step: a payload plus the vertices it was built from.
#[derive(Debug, Clone, Default)]
pub struct Edge<P> {
    payload: P,
    tails: Vec<VertexId>,
    score: f32,
}

impl<P> Edge<P> {
    pub fn new(payload: P, score: f32) -> Self {
        Self {
            payload,
            tails: Vec::new(),
            score,
        }
    }

    pub fn with_tails(mut self, tails: Vec<VertexId>) -> Self {
        self.tails = tails;
        self
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn tails(&self) -> &[VertexId] {
        &self.tails
    }

    /// Static score cached when the edge was built.
    pub fn score(&self) -> f32 {
        self.score
    }
}

/// Allocation domain for one sentence's hypergraph.
pub struct Graph<P> {
    vertices: FixedArena<Vertex>,
    edges: FixedArena<Edge<P>>,
    root: Option<VertexId>,
}

impl<P> Default for Graph<P> {
    fn default() -> Self {
        Self {
            vertices: FixedArena::default(),
            edges: FixedArena::default(),
            root: None,
        }
    }
}

impl<P: Default> Graph<P> {
    /// Size both pools. Must be called once, before any allocation.
    pub fn set_counts(&mut self, vertices: usize, edges: usize) -> Result<(), ArenaError> {
        self.vertices.init(vertices)?;
        self.edges.init(edges)
    }
}

impl<P> Graph<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_vertex(&mut self) -> Result<VertexId, ArenaError> {
        self.vertices.alloc().map(|i| VertexId(i as u32))
    }

    /// Place `edge` in the edge pool without attaching it to a head vertex.
    pub fn new_edge(&mut self, edge: Edge<P>) -> Result<EdgeId, ArenaError> {
        let idx = self.edges.alloc()?;
        self.edges[idx] = edge;
        Ok(EdgeId(idx as u32))
    }

    /// Allocate `edge` and append it to `head`'s derivations.
    pub fn add_edge(&mut self, head: VertexId, edge: Edge<P>) -> Result<EdgeId, ArenaError> {
        let id = self.new_edge(edge)?;
        self.vertices[head.index()].edges.push(id);
        Ok(id)
    }

    /// Order `vertex`'s derivations by descending static score.
    pub fn sort_edges(&mut self, vertex: VertexId) {
        let mut edges = std::mem::take(&mut self.vertices[vertex.index()].edges);
        edges.sort_by(|a, b| {
            self.edges[b.index()]
                .score
                .total_cmp(&self.edges[a.index()].score)
        });
        self.vertices[vertex.index()].edges = edges;
    }

    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.index()]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge<P> {
        &self.edges[id.index()]
    }

    /// Best derivation of `vertex`, if it has any.
    pub fn best_edge(&self, vertex: VertexId) -> Option<&Edge<P>> {
        self.vertex(vertex).best().map(|e| self.edge(e))
    }

    /// Iterate `vertex`'s derivations in their current order.
    pub fn edges_of(&self, vertex: VertexId) -> impl Iterator<Item = &Edge<P>> {
        self.vertex(vertex).edges.iter().map(|&e| self.edge(e))
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.allocated()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.allocated()
    }

    pub fn vertex_capacity(&self) -> usize {
        self.vertices.capacity()
    }

    pub fn edge_capacity(&self) -> usize {
        self.edges.capacity()
    }

    pub fn set_root(&mut self, root: VertexId) {
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<VertexId> {
        self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_and_link() {
        let mut graph: Graph<&'static str> = Graph::new();
        graph.set_counts(2, 3).unwrap();
        let leaf = graph.new_vertex().unwrap();
        let head = graph.new_vertex().unwrap();
        graph.add_edge(leaf, Edge::new("a", -1.0)).unwrap();
        let e = graph
            .add_edge(head, Edge::new("b", -2.0).with_tails(vec![leaf]))
            .unwrap();

        assert_eq!(graph.vertex(head).len(), 1);
        assert_eq!(graph.edge(e).tails(), &[leaf]);
        assert_eq!(*graph.edge(e).payload(), "b");
        assert_eq!(graph.vertex_count(), 2);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.edge_capacity(), 3);
    }

    #[test]
    fn overflow_is_an_error() {
        let mut graph: Graph<u8> = Graph::new();
        graph.set_counts(1, 0).unwrap();
        let v = graph.new_vertex().unwrap();
        assert_eq!(
            graph.new_vertex(),
            Err(ArenaError::Exhausted { capacity: 1 })
        );
        assert_eq!(
            graph.add_edge(v, Edge::new(1, 0.0)),
            Err(ArenaError::Exhausted { capacity: 0 })
        );
    }

    #[test]
    fn set_counts_once() {
        let mut graph: Graph<u8> = Graph::new();
        graph.set_counts(1, 1).unwrap();
        assert!(graph.set_counts(2, 2).is_err());
    }

    #[test]
    fn sort_edges_best_first() {
        let mut graph: Graph<u8> = Graph::new();
        graph.set_counts(1, 3).unwrap();
        let v = graph.new_vertex().unwrap();
        graph.add_edge(v, Edge::new(0, -5.0)).unwrap();
        graph.add_edge(v, Edge::new(1, -1.0)).unwrap();
        graph.add_edge(v, Edge::new(2, -3.0)).unwrap();
        graph.sort_edges(v);

        let order: Vec<u8> = graph.edges_of(v).map(|e| *e.payload()).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert_eq!(*graph.best_edge(v).unwrap().payload(), 1);
    }

    #[test]
    fn root_designation() {
        let mut graph: Graph<u8> = Graph::new();
        graph.set_counts(1, 0).unwrap();
        assert_eq!(graph.root(), None);
        let v = graph.new_vertex().unwrap();
        graph.set_root(v);
        assert_eq!(graph.root(), Some(v));
    }
}
