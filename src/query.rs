use std::collections::{HashMap, VecDeque};

use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::molecule::{GraphError, Molecule};
use crate::rings::RingSet;

/// Match predicate carried by a query atom.
///
/// A closed set of tests rather than an open trait: the predicate vocabulary
/// is small and fixed, and the matcher evaluates it against target atoms
/// directly.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomPredicate {
    /// Wildcard — matches any atom.
    Any,
    /// Matches by atomic number.
    Element(u8),
    /// Matches by formal charge.
    Charge(i8),
    /// Matches by SSSR ring membership of the target atom.
    InRing(bool),
    /// Conjunction of sub-predicates.
    And(Vec<AtomPredicate>),
}

impl AtomPredicate {
    pub fn matches(&self, atom: &Atom, id: NodeIndex, rings: Option<&RingSet>) -> bool {
        match self {
            AtomPredicate::Any => true,
            AtomPredicate::Element(num) => atom.atomic_num == *num,
            AtomPredicate::Charge(charge) => atom.formal_charge == *charge,
            AtomPredicate::InRing(wanted) => rings
                .map(|r| r.is_ring_atom(id) == *wanted)
                .unwrap_or(false),
            AtomPredicate::And(preds) => preds.iter().all(|p| p.matches(atom, id, rings)),
        }
    }

    pub(crate) fn uses_ring_info(&self) -> bool {
        match self {
            AtomPredicate::InRing(_) => true,
            AtomPredicate::And(preds) => preds.iter().any(AtomPredicate::uses_ring_info),
            _ => false,
        }
    }

    /// Rough constraint strength, used by the matcher's
    /// most-constrained-first ordering heuristic.
    pub(crate) fn specificity(&self) -> u32 {
        match self {
            AtomPredicate::Any => 0,
            AtomPredicate::InRing(_) => 1,
            AtomPredicate::Charge(_) => 2,
            AtomPredicate::Element(_) => 2,
            AtomPredicate::And(preds) => preds.iter().map(AtomPredicate::specificity).sum(),
        }
    }
}

/// Match predicate carried by a query bond.
#[derive(Debug, Clone, PartialEq)]
pub enum BondPredicate {
    /// Wildcard — matches any bond.
    Any,
    /// Matches by bond order.
    Order(BondOrder),
    /// Matches by SSSR ring membership of the target bond.
    InRing(bool),
    /// Conjunction of sub-predicates.
    And(Vec<BondPredicate>),
}

impl BondPredicate {
    pub fn matches(&self, bond: &Bond, id: EdgeIndex, rings: Option<&RingSet>) -> bool {
        match self {
            BondPredicate::Any => true,
            BondPredicate::Order(order) => bond.order == *order,
            BondPredicate::InRing(wanted) => rings
                .map(|r| r.is_ring_bond(id) == *wanted)
                .unwrap_or(false),
            BondPredicate::And(preds) => preds.iter().all(|p| p.matches(bond, id, rings)),
        }
    }

    pub(crate) fn uses_ring_info(&self) -> bool {
        match self {
            BondPredicate::InRing(_) => true,
            BondPredicate::And(preds) => preds.iter().any(BondPredicate::uses_ring_info),
            _ => false,
        }
    }
}

/// A substructure pattern: a graph whose atoms and bonds carry match
/// predicates instead of fixed records.
///
/// Queries are build-once values — there is no removal API — so they sit on
/// a plain graph rather than the stable arena a [`Molecule`] uses.
#[derive(Debug, Clone, Default)]
pub struct Query {
    graph: UnGraph<AtomPredicate, BondPredicate>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives an exact pattern from a molecule: element and formal charge
    /// per atom, order per bond. Matching a molecule against its own derived
    /// query enumerates the graph's automorphisms.
    pub fn from_molecule(mol: &Molecule) -> Self {
        let mut query = Query::new();
        let mut index_map: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        for id in mol.atoms() {
            let atom = mol.atom(id).expect("iterated atom must exist");
            let pred = if atom.formal_charge != 0 {
                AtomPredicate::And(vec![
                    AtomPredicate::Element(atom.atomic_num),
                    AtomPredicate::Charge(atom.formal_charge),
                ])
            } else {
                AtomPredicate::Element(atom.atomic_num)
            };
            index_map.insert(id, query.add_atom(pred));
        }
        for edge in mol.bonds() {
            let (a, b) = mol.bond_endpoints(edge).expect("iterated bond must exist");
            let bond = mol.bond(edge).expect("iterated bond must exist");
            query
                .add_bond(index_map[&a], index_map[&b], BondPredicate::Order(bond.order))
                .expect("molecule invariants carry over to the derived query");
        }
        query
    }

    pub fn add_atom(&mut self, pred: AtomPredicate) -> NodeIndex {
        self.graph.add_node(pred)
    }

    /// Adds a bond predicate between two query atoms, with the same
    /// endpoint/self-loop/duplicate checking a [`Molecule`] performs.
    pub fn add_bond(
        &mut self,
        a: NodeIndex,
        b: NodeIndex,
        pred: BondPredicate,
    ) -> Result<EdgeIndex, GraphError> {
        if self.graph.node_weight(a).is_none() {
            return Err(GraphError::InvalidAtom(a));
        }
        if self.graph.node_weight(b).is_none() {
            return Err(GraphError::InvalidAtom(b));
        }
        if a == b {
            return Err(GraphError::SelfLoop(a));
        }
        if self.graph.find_edge(a, b).is_some() {
            return Err(GraphError::DuplicateBond(a, b));
        }
        Ok(self.graph.add_edge(a, b, pred))
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

    pub fn neighbors(&self, id: NodeIndex) -> impl Iterator<Item = (NodeIndex, EdgeIndex)> + '_ {
        self.graph.edges(id).map(move |e| {
            let nb = if e.source() == id { e.target() } else { e.source() };
            (nb, e.id())
        })
    }

    pub fn degree(&self, id: NodeIndex) -> usize {
        self.neighbors(id).count()
    }

    pub fn atom_predicate(&self, id: NodeIndex) -> &AtomPredicate {
        &self.graph[id]
    }

    pub fn bond_predicate(&self, id: EdgeIndex) -> &BondPredicate {
        &self.graph[id]
    }

    pub fn bond_between(&self, a: NodeIndex, b: NodeIndex) -> Option<EdgeIndex> {
        self.graph.find_edge(a, b)
    }

    /// True when every query atom is reachable from every other. The empty
    /// query counts as connected (it is rejected by the matcher anyway).
    pub fn is_connected(&self) -> bool {
        let n = self.graph.node_count();
        if n == 0 {
            return true;
        }
        let start = match self.graph.node_indices().next() {
            Some(id) => id,
            None => return true,
        };
        let mut visited = vec![false; n];
        visited[start.index()] = true;
        let mut reached = 1;
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            for (nb, _) in self.neighbors(current) {
                if !visited[nb.index()] {
                    visited[nb.index()] = true;
                    reached += 1;
                    queue.push_back(nb);
                }
            }
        }
        reached == n
    }

    /// True when any predicate needs the target's SSSR; the matcher then
    /// forces ring perception on the target before searching.
    pub fn uses_ring_info(&self) -> bool {
        self.graph
            .node_indices()
            .any(|id| self.graph[id].uses_ring_info())
            || self
                .graph
                .edge_indices()
                .any(|id| self.graph[id].uses_ring_info())
    }
}
