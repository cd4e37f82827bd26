use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableUnGraph;
use petgraph::visit::EdgeRef;
use thiserror::Error;

use crate::atom::Atom;
use crate::bond::Bond;
use crate::rings::RingSet;

/// Errors produced by structural mutation of a [`Molecule`] or a
/// [`Query`](crate::Query).
///
/// Malformed input is rejected at mutation time; derived computations (ring
/// perception) therefore have no error path of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GraphError {
    /// An atom id referenced a removed or nonexistent atom.
    #[error("atom {} does not exist", .0.index())]
    InvalidAtom(NodeIndex),
    /// A bond id referenced a removed or nonexistent bond.
    #[error("bond {} does not exist", .0.index())]
    InvalidBond(EdgeIndex),
    /// Both endpoints of a new bond were the same atom.
    #[error("self-loop bond on atom {}", .0.index())]
    SelfLoop(NodeIndex),
    /// A bond between the two atoms already exists.
    #[error("bond between atoms {} and {} already exists", .0.index(), .1.index())]
    DuplicateBond(NodeIndex, NodeIndex),
}

/// An attributed undirected molecular graph.
///
/// The molecule owns all of its [`Atom`]s and [`Bond`]s in an index-addressed
/// arena; neighbor and ownership relations are index lookups, never stored
/// pointers. Atom and bond indices are stable for the lifetime of the graph:
/// removal tombstones a slot, and the index is reused only by a later
/// insertion.
///
/// Structural invariants, enforced at mutation time:
///
/// - every bond's endpoints exist in this graph,
/// - no self-loops,
/// - at most one bond per unordered atom pair.
///
/// Every structural mutation increments a generation counter. Derived state
/// (the cached SSSR ring set) is tagged with the generation it was computed
/// at; a stale tag means "recompute required" and is never served as valid
/// data. Attribute edits through [`atom_mut`](Molecule::atom_mut) /
/// [`bond_mut`](Molecule::bond_mut) are not structural and leave derived
/// state alone.
///
/// Concurrency: a `Molecule` is `Send` but not `Sync` — one molecule per
/// task, exclusive writer.
#[derive(Clone, Default)]
pub struct Molecule {
    graph: StableUnGraph<Atom, Bond>,
    generation: u64,
    ring_cache: RefCell<Option<(u64, Arc<RingSet>)>>,
}

impl Molecule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an atom and returns its stable index.
    pub fn add_atom(&mut self, atom: Atom) -> NodeIndex {
        self.touch();
        self.graph.add_node(atom)
    }

    /// Adds a bond between `a` and `b`.
    ///
    /// Fails with [`GraphError::InvalidAtom`] when an endpoint does not
    /// exist, [`GraphError::SelfLoop`] when `a == b`, and
    /// [`GraphError::DuplicateBond`] when the pair is already bonded.
    pub fn add_bond(&mut self, a: NodeIndex, b: NodeIndex, bond: Bond) -> Result<EdgeIndex, GraphError> {
        if !self.graph.contains_node(a) {
            return Err(GraphError::InvalidAtom(a));
        }
        if !self.graph.contains_node(b) {
            return Err(GraphError::InvalidAtom(b));
        }
        if a == b {
            return Err(GraphError::SelfLoop(a));
        }
        if self.graph.find_edge(a, b).is_some() {
            return Err(GraphError::DuplicateBond(a, b));
        }
        self.touch();
        Ok(self.graph.add_edge(a, b, bond))
    }

    /// Removes an atom and all bonds incident to it, returning the record.
    pub fn remove_atom(&mut self, id: NodeIndex) -> Result<Atom, GraphError> {
        let atom = self
            .graph
            .remove_node(id)
            .ok_or(GraphError::InvalidAtom(id))?;
        self.touch();
        Ok(atom)
    }

    /// Removes a bond, returning the record.
    pub fn remove_bond(&mut self, id: EdgeIndex) -> Result<Bond, GraphError> {
        let bond = self
            .graph
            .remove_edge(id)
            .ok_or(GraphError::InvalidBond(id))?;
        self.touch();
        Ok(bond)
    }

    pub fn atom(&self, id: NodeIndex) -> Option<&Atom> {
        self.graph.node_weight(id)
    }

    /// Mutable access to an atom record. Attribute edits do not invalidate
    /// derived state; use the structural mutators for topology changes.
    pub fn atom_mut(&mut self, id: NodeIndex) -> Option<&mut Atom> {
        self.graph.node_weight_mut(id)
    }

    pub fn bond(&self, id: EdgeIndex) -> Option<&Bond> {
        self.graph.edge_weight(id)
    }

    pub fn bond_mut(&mut self, id: EdgeIndex) -> Option<&mut Bond> {
        self.graph.edge_weight_mut(id)
    }

    pub fn contains_atom(&self, id: NodeIndex) -> bool {
        self.graph.contains_node(id)
    }

    pub fn contains_bond(&self, id: EdgeIndex) -> bool {
        self.graph.edge_weight(id).is_some()
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn atoms(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn bonds(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edge_indices()
    }

    /// Neighbors of an atom as `(neighbor, bond)` index pairs, in a
    /// deterministic order for a given construction history.
    pub fn neighbors(&self, id: NodeIndex) -> impl Iterator<Item = (NodeIndex, EdgeIndex)> + '_ {
        self.graph.edges(id).map(move |e| {
            let nb = if e.source() == id { e.target() } else { e.source() };
            (nb, e.id())
        })
    }

    pub fn degree(&self, id: NodeIndex) -> usize {
        self.neighbors(id).count()
    }

    pub fn bond_between(&self, a: NodeIndex, b: NodeIndex) -> Option<EdgeIndex> {
        self.graph.find_edge(a, b)
    }

    pub fn bond_endpoints(&self, id: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.graph.edge_endpoints(id)
    }

    /// The structural generation of this molecule. Incremented by every
    /// mutation that adds or removes an atom or bond.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Connected components as sorted atom-index lists, in order of lowest
    /// member index.
    pub fn connected_components(&self) -> Vec<Vec<NodeIndex>> {
        let bound = self.node_bound();
        let mut visited = vec![false; bound];
        let mut components = Vec::new();
        for start in self.atoms() {
            if visited[start.index()] {
                continue;
            }
            let mut component = Vec::new();
            let mut queue = VecDeque::new();
            visited[start.index()] = true;
            queue.push_back(start);
            while let Some(current) = queue.pop_front() {
                component.push(current);
                for (nb, _) in self.neighbors(current) {
                    if !visited[nb.index()] {
                        visited[nb.index()] = true;
                        queue.push_back(nb);
                    }
                }
            }
            component.sort();
            components.push(component);
        }
        components
    }

    /// True when every atom is reachable from every other. The empty
    /// molecule counts as connected.
    pub fn is_connected(&self) -> bool {
        self.connected_components().len() <= 1
    }

    /// The SSSR ring set for the current graph state.
    ///
    /// Perception runs on demand and the result is cached per generation, so
    /// repeated queries on an unmutated molecule are cheap and any structural
    /// mutation forces a recompute on the next call — never stale data.
    pub fn rings(&self) -> Arc<RingSet> {
        {
            let cache = self.ring_cache.borrow();
            if let Some((generation, set)) = cache.as_ref() {
                if *generation == self.generation {
                    return Arc::clone(set);
                }
            }
        }
        let set = Arc::new(RingSet::perceive(self));
        *self.ring_cache.borrow_mut() = Some((self.generation, Arc::clone(&set)));
        set
    }

    /// Number of SSSR rings. Always forces perception when the cache is
    /// stale.
    pub fn ring_count(&self) -> usize {
        self.rings().len()
    }

    /// True when the atom belongs to at least one SSSR ring.
    pub fn is_ring_atom(&self, id: NodeIndex) -> bool {
        self.rings().is_ring_atom(id)
    }

    /// True when the bond belongs to at least one SSSR ring.
    pub fn is_ring_bond(&self, id: EdgeIndex) -> bool {
        self.rings().is_ring_bond(id)
    }

    /// One past the highest live atom index. Sizes dense scratch tables in
    /// the perception and matching code; tombstoned slots stay unused.
    pub(crate) fn node_bound(&self) -> usize {
        self.atoms().map(|n| n.index()).max().map_or(0, |m| m + 1)
    }

    pub(crate) fn edge_bound(&self) -> usize {
        self.bonds().map(|e| e.index()).max().map_or(0, |m| m + 1)
    }

    fn touch(&mut self) {
        self.generation += 1;
        *self.ring_cache.get_mut() = None;
    }
}

impl std::fmt::Debug for Molecule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Molecule")
            .field("atom_count", &self.atom_count())
            .field("bond_count", &self.bond_count())
            .field("generation", &self.generation)
            .finish()
    }
}
