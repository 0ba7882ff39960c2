//! A small generic directed graph with iterative depth-first traversal,
//! cycle detection, and topological sort.
//!
//! Traversal is iterative (an explicit work stack), not recursive: package
//! dependency graphs in a large repository can be deep enough that a
//! recursive walk risks overflowing the stack.

use ahash::AHashMap;
use std::hash::Hash;

/// Coloring used during depth-first search to detect back edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

#[derive(Clone)]
struct Node<V, VD, ED> {
    vertex: V,
    data: VD,
    out: Vec<(usize, ED)>,
}

/// A directed graph over vertices of type `V`, carrying vertex data `VD`
/// and edge data `ED`.
///
/// Vertices are identified by `V` (must be `Eq + Hash + Clone`); `add_edge`
/// implicitly inserts endpoints with their `Default` vertex data if absent.
#[derive(Clone)]
pub struct Digraph<V, VD = (), ED = ()> {
    index: AHashMap<V, usize>,
    nodes: Vec<Node<V, VD, ED>>,
}

impl<V, VD, ED> std::fmt::Debug for Digraph<V, VD, ED>
where
    V: std::fmt::Debug + Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Digraph")
            .field("vertices", &self.nodes.len())
            .finish()
    }
}

impl<V, VD, ED> Default for Digraph<V, VD, ED>
where
    V: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self {
            index: AHashMap::new(),
            nodes: Vec::new(),
        }
    }
}

/// A cycle found by [`Digraph::cycle`] or reported by [`Digraph::topological_sort`],
/// given as the sequence of vertices from the start of the cycle back to
/// the vertex that closes it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cycle detected: {0:?}")]
pub struct Cycle<V: std::fmt::Debug>(pub Vec<V>);

impl<V, VD, ED> Digraph<V, VD, ED>
where
    V: Eq + Hash + Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn index_of(&self, v: &V) -> Option<usize> {
        self.index.get(v).copied()
    }

    fn ensure_vertex(&mut self, v: V, data: VD) -> usize {
        if let Some(&idx) = self.index.get(&v) {
            return idx;
        }
        let idx = self.nodes.len();
        self.index.insert(v.clone(), idx);
        self.nodes.push(Node {
            vertex: v,
            data,
            out: Vec::new(),
        });
        idx
    }

    /// Insert a vertex with its data, overwriting existing data if present.
    pub fn add_vertex(&mut self, v: V, data: VD) {
        match self.index.get(&v) {
            Some(&idx) => self.nodes[idx].data = data,
            None => {
                self.ensure_vertex(v, data);
            }
        }
    }

    /// `true` iff `v` has been added to the graph (directly or as an edge
    /// endpoint).
    #[must_use]
    pub fn has_vertex(&self, v: &V) -> bool {
        self.index.contains_key(v)
    }

    /// `true` iff there is a direct edge `from -> to`.
    #[must_use]
    pub fn has_edge(&self, from: &V, to: &V) -> bool {
        let (Some(fi), Some(ti)) = (self.index_of(from), self.index_of(to)) else {
            return false;
        };
        self.nodes[fi].out.iter().any(|(j, _)| *j == ti)
    }

    /// Add a directed edge `from -> to`, inserting either endpoint with
    /// `VD::default()` vertex data if not already present.
    pub fn add_edge(&mut self, from: V, to: V, data: ED)
    where
        VD: Default,
    {
        let fi = self.ensure_vertex(from, VD::default());
        let ti = self.ensure_vertex(to, VD::default());
        self.nodes[fi].out.push((ti, data));
    }

    /// Add edges in both directions between `a` and `b`.
    pub fn add_biedge(&mut self, a: V, b: V, data: ED)
    where
        VD: Default,
        ED: Clone,
    {
        self.add_edge(a.clone(), b.clone(), data.clone());
        self.add_edge(b, a, data);
    }

    /// All vertices currently in the graph, in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = &V> {
        self.nodes.iter().map(|n| &n.vertex)
    }

    /// Vertex data for `v`, if present.
    #[must_use]
    pub fn vertex_data(&self, v: &V) -> Option<&VD> {
        self.index_of(v).map(|i| &self.nodes[i].data)
    }

    /// Outgoing edges `(to, data)` from `v`, in insertion order.
    pub fn adj(&self, v: &V) -> impl Iterator<Item = (&V, &ED)> {
        let out = self.index_of(v).map(|i| self.nodes[i].out.as_slice()).unwrap_or(&[]);
        out.iter().map(|(j, d)| (&self.nodes[*j].vertex, d))
    }

    /// All edges as `(from, to, data)` triples.
    pub fn edges(&self) -> impl Iterator<Item = (&V, &V, &ED)> {
        self.nodes.iter().flat_map(move |n| {
            n.out
                .iter()
                .map(move |(j, d)| (&n.vertex, &self.nodes[*j].vertex, d))
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterative depth-first search over every vertex (in insertion order,
    /// so the result is deterministic), returning vertices in discovery
    /// order along with their finish order.
    ///
    /// Mirrors the white/gray/black coloring of a textbook recursive DFS
    /// but as an explicit stack of `(vertex, child_cursor)` frames, so depth
    /// is bounded by heap, not by the call stack.
    fn dfs_full(&self) -> (Vec<usize>, Vec<usize>) {
        let n = self.nodes.len();
        let mut color = vec![Color::White; n];
        let mut discovery = Vec::with_capacity(n);
        let mut finish_order = Vec::with_capacity(n);

        for start in 0..n {
            if color[start] != Color::White {
                continue;
            }
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            color[start] = Color::Gray;
            discovery.push(start);
            while let Some(&mut (u, ref mut cursor)) = stack.last_mut() {
                if *cursor < self.nodes[u].out.len() {
                    let (v, _) = self.nodes[u].out[*cursor];
                    *cursor += 1;
                    if color[v] == Color::White {
                        color[v] = Color::Gray;
                        discovery.push(v);
                        stack.push((v, 0));
                    }
                } else {
                    color[u] = Color::Black;
                    finish_order.push(u);
                    stack.pop();
                }
            }
        }
        (discovery, finish_order)
    }

    /// Report the first cycle found by depth-first search, if any.
    ///
    /// On finding a back edge `u -> v` where `v` is gray (an ancestor on
    /// the current DFS path), reconstructs the cycle by walking the path
    /// from the search root back to `v`.
    pub fn cycle(&self) -> Option<Cycle<V>>
    where
        V: std::fmt::Debug,
    {
        let n = self.nodes.len();
        let mut color = vec![Color::White; n];

        for start in 0..n {
            if color[start] != Color::White {
                continue;
            }
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            color[start] = Color::Gray;
            while let Some(&mut (u, ref mut cursor)) = stack.last_mut() {
                if *cursor < self.nodes[u].out.len() {
                    let (v, _) = self.nodes[u].out[*cursor];
                    *cursor += 1;
                    match color[v] {
                        Color::White => {
                            color[v] = Color::Gray;
                            stack.push((v, 0));
                        }
                        Color::Gray => {
                            // Back edge u -> v: the path segment of `stack`
                            // from v's position to u, plus v again, is the
                            // cycle.
                            let path: Vec<usize> = stack.iter().map(|(x, _)| *x).collect();
                            let start_pos = path.iter().position(|&x| x == v).unwrap();
                            let mut cyc: Vec<V> = path[start_pos..]
                                .iter()
                                .map(|&i| self.nodes[i].vertex.clone())
                                .collect();
                            cyc.push(self.nodes[v].vertex.clone());
                            return Some(Cycle(cyc));
                        }
                        Color::Black => {}
                    }
                } else {
                    color[u] = Color::Black;
                    stack.pop();
                }
            }
        }
        None
    }

    /// `true` iff the graph has no directed cycle.
    #[must_use]
    pub fn cycle_free(&self) -> bool
    where
        V: std::fmt::Debug,
    {
        self.cycle().is_none()
    }

    /// Vertices in topological order (dependencies before dependents),
    /// i.e. DFS finish order reversed. Errors with the first [`Cycle`]
    /// found if the graph is not a DAG.
    pub fn topological_sort(&self) -> Result<Vec<V>, Cycle<V>>
    where
        V: std::fmt::Debug,
    {
        if let Some(c) = self.cycle() {
            return Err(c);
        }
        let (_, finish_order) = self.dfs_full();
        Ok(finish_order
            .into_iter()
            .rev()
            .map(|i| self.nodes[i].vertex.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn linear_graph() -> Digraph<&'static str, (), ()> {
        let mut g = Digraph::new();
        g.add_edge("a", "b", ());
        g.add_edge("b", "c", ());
        g.add_edge("a", "c", ());
        g
    }

    #[test]
    fn topo_sort_respects_edges() {
        let g = linear_graph();
        let order = g.topological_sort().unwrap();
        let pos = |x: &str| order.iter().position(|&v| v == x).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
        assert!(pos("a") < pos("c"));
    }

    #[test]
    fn detects_simple_cycle() {
        let mut g: Digraph<&str, (), ()> = Digraph::new();
        g.add_edge("a", "b", ());
        g.add_edge("b", "a", ());
        let cyc = g.cycle().expect("cycle expected");
        assert!(cyc.0.contains(&"a"));
        assert!(cyc.0.contains(&"b"));
        assert!(!g.cycle_free());
    }

    #[test]
    fn acyclic_graph_has_no_cycle() {
        let g = linear_graph();
        assert!(g.cycle_free());
        assert!(g.topological_sort().is_ok());
    }

    #[test]
    fn has_vertex_and_has_edge() {
        let g = linear_graph();
        assert!(g.has_vertex(&"a"));
        assert!(!g.has_vertex(&"z"));
        assert!(g.has_edge(&"a", &"b"));
        assert!(!g.has_edge(&"b", &"a"));
    }

    #[test]
    fn biedge_adds_both_directions() {
        let mut g: Digraph<&str, (), ()> = Digraph::new();
        g.add_biedge("x", "y", ());
        assert!(g.has_edge(&"x", &"y"));
        assert!(g.has_edge(&"y", &"x"));
        // A biedge is itself a 2-cycle.
        assert!(!g.cycle_free());
    }

    #[test]
    fn adj_reflects_insertion_order() {
        let mut g: Digraph<&str, (), i32> = Digraph::new();
        g.add_edge("a", "b", 1);
        g.add_edge("a", "c", 2);
        let out: Vec<_> = g.adj(&"a").collect();
        assert_eq!(out, vec![(&"b", &1), (&"c", &2)]);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let mut g: Digraph<&str, (), ()> = Digraph::new();
        g.add_edge("a", "a", ());
        assert!(!g.cycle_free());
    }

    #[test]
    fn deep_chain_does_not_overflow_the_stack() {
        let mut g: Digraph<u32, (), ()> = Digraph::new();
        for i in 0..200_000u32 {
            g.add_edge(i, i + 1, ());
        }
        assert!(g.cycle_free());
        let order = g.topological_sort().unwrap();
        assert_eq!(order.first(), Some(&0));
        assert_eq!(order.last(), Some(&200_000));
    }
}
