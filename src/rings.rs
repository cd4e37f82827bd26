use std::collections::VecDeque;

use petgraph::graph::{EdgeIndex, NodeIndex};
use tracing::debug;

use crate::molecule::Molecule;

/// An elementary cycle: an ordered cyclic atom sequence plus the bonds
/// connecting consecutive atoms (including the closure bond).
///
/// Rings are derived state — they are produced by perception and never
/// mutated independently of their molecule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    atoms: Vec<NodeIndex>,
    bonds: Vec<EdgeIndex>,
}

impl Ring {
    /// Ring size: the number of atoms (equal to the number of bonds).
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atoms(&self) -> &[NodeIndex] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[EdgeIndex] {
        &self.bonds
    }

    pub fn contains_atom(&self, id: NodeIndex) -> bool {
        self.atoms.contains(&id)
    }

    pub fn contains_bond(&self, id: EdgeIndex) -> bool {
        self.bonds.contains(&id)
    }

    /// True when the two rings share at least one bond.
    pub fn is_fused_to(&self, other: &Ring) -> bool {
        self.bonds.iter().any(|b| other.contains_bond(*b))
    }
}

/// The Smallest Set of Smallest Rings of one graph state.
///
/// Obtained through [`Molecule::rings`](crate::Molecule::rings), which caches
/// the set per structural generation.
#[derive(Debug, Clone)]
pub struct RingSet {
    rings: Vec<Ring>,
    atom_flags: Vec<bool>,
    bond_flags: Vec<bool>,
}

impl RingSet {
    /// Computes the SSSR for the molecule's current graph state.
    ///
    /// Pure function of the graph: it performs no I/O and cannot fail for a
    /// well-formed molecule. Recomputing without an intervening mutation
    /// yields an identical set (deterministic candidate ordering and
    /// tie-breaks).
    pub fn perceive(mol: &Molecule) -> Self {
        let expected = Self::expected_ring_count(mol);
        let node_bound = mol.node_bound();
        let edge_bound = mol.edge_bound();
        if expected == 0 {
            return Self {
                rings: Vec::new(),
                atom_flags: vec![false; node_bound],
                bond_flags: vec![false; edge_bound],
            };
        }

        let core = cyclic_core(mol, node_bound);

        let mut basis: Vec<Vec<u64>> = Vec::with_capacity(expected);
        let mut accepted: Vec<Vec<NodeIndex>> = Vec::with_capacity(expected);

        let candidates = bond_closure_candidates(mol, &core);
        select_independent(mol, edge_bound, &candidates, expected, &mut basis, &mut accepted);

        // Heavily fused cages can leave the basis short of full rank when
        // only one shortest path per bond is considered; vertex-rooted
        // candidates close the gap.
        if accepted.len() < expected {
            let extra = vertex_rooted_candidates(mol, &core, node_bound);
            select_independent(mol, edge_bound, &extra, expected, &mut basis, &mut accepted);
        }

        debug!(
            expected,
            found = accepted.len(),
            "ring perception complete"
        );

        accepted.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

        let rings: Vec<Ring> = accepted
            .iter()
            .map(|atoms| {
                let bonds = ring_bonds(mol, atoms);
                Ring {
                    atoms: atoms.clone(),
                    bonds,
                }
            })
            .collect();

        let mut atom_flags = vec![false; node_bound];
        let mut bond_flags = vec![false; edge_bound];
        for ring in &rings {
            for a in &ring.atoms {
                atom_flags[a.index()] = true;
            }
            for b in &ring.bonds {
                bond_flags[b.index()] = true;
            }
        }

        Self {
            rings,
            atom_flags,
            bond_flags,
        }
    }

    /// Cycle rank of the graph: `bonds − atoms + components`. Equals the
    /// number of rings perception will find.
    pub fn expected_ring_count(mol: &Molecule) -> usize {
        let v = mol.atom_count();
        let e = mol.bond_count();
        let c = mol.connected_components().len();
        (e + c).saturating_sub(v)
    }

    pub fn len(&self) -> usize {
        self.rings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ring> {
        self.rings.iter()
    }

    pub fn is_ring_atom(&self, id: NodeIndex) -> bool {
        self.atom_flags.get(id.index()).copied().unwrap_or(false)
    }

    pub fn is_ring_bond(&self, id: EdgeIndex) -> bool {
        self.bond_flags.get(id.index()).copied().unwrap_or(false)
    }

    /// Size of the smallest ring containing the atom, if any.
    pub fn smallest_ring_size(&self, id: NodeIndex) -> Option<usize> {
        self.rings
            .iter()
            .filter(|r| r.contains_atom(id))
            .map(Ring::len)
            .min()
    }

    /// Number of rings containing the atom.
    pub fn membership_count(&self, id: NodeIndex) -> usize {
        self.rings.iter().filter(|r| r.contains_atom(id)).count()
    }
}

/// Atoms that can participate in a cycle: iteratively strips atoms of degree
/// below two (terminal chains and, transitively, tree-like appendages).
fn cyclic_core(mol: &Molecule, node_bound: usize) -> Vec<bool> {
    let mut degree = vec![0usize; node_bound];
    let mut core = vec![false; node_bound];
    for a in mol.atoms() {
        degree[a.index()] = mol.degree(a);
        core[a.index()] = true;
    }

    let mut queue: VecDeque<NodeIndex> = mol.atoms().filter(|a| degree[a.index()] < 2).collect();
    while let Some(a) = queue.pop_front() {
        if !core[a.index()] {
            continue;
        }
        core[a.index()] = false;
        for (nb, _) in mol.neighbors(a) {
            if core[nb.index()] {
                degree[nb.index()] -= 1;
                if degree[nb.index()] < 2 {
                    queue.push_back(nb);
                }
            }
        }
    }
    core
}

/// Ring closure from each bond: for bond `(u, v)`, the shortest path from
/// `u` to `v` that avoids the bond itself, closed by the bond. Candidates
/// come out in ascending bond-index order and are stably sorted by size, so
/// equal-sized candidates keep the lowest-starting-bond order.
fn bond_closure_candidates(mol: &Molecule, core: &[bool]) -> Vec<Vec<NodeIndex>> {
    let mut candidates = Vec::new();
    for edge in mol.bonds() {
        let (u, v) = match mol.bond_endpoints(edge) {
            Some(pair) => pair,
            None => continue,
        };
        if !core[u.index()] || !core[v.index()] {
            continue;
        }
        if let Some(path) = shortest_path_avoiding(mol, core, u, v, edge) {
            candidates.push(path);
        }
    }
    candidates.sort_by_key(Vec::len);
    candidates
}

/// BFS shortest path between two core atoms that never traverses `skip`.
/// Returns `None` when `skip` is a bridge.
fn shortest_path_avoiding(
    mol: &Molecule,
    core: &[bool],
    from: NodeIndex,
    to: NodeIndex,
    skip: EdgeIndex,
) -> Option<Vec<NodeIndex>> {
    let mut pred: Vec<Option<NodeIndex>> = vec![None; core.len()];
    let mut visited = vec![false; core.len()];
    visited[from.index()] = true;
    let mut queue = VecDeque::new();
    queue.push_back(from);

    while let Some(current) = queue.pop_front() {
        for (nb, bond) in mol.neighbors(current) {
            if bond == skip || !core[nb.index()] || visited[nb.index()] {
                continue;
            }
            visited[nb.index()] = true;
            pred[nb.index()] = Some(current);
            if nb == to {
                let mut path = vec![to];
                let mut node = to;
                while let Some(p) = pred[node.index()] {
                    path.push(p);
                    node = p;
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(nb);
        }
    }
    None
}

/// Vertex-rooted candidate rings: for every core atom `w` and core bond
/// `(u, v)`, the shortest paths `w..u` and `w..v`, internally disjoint,
/// closed by the bond.
fn vertex_rooted_candidates(
    mol: &Molecule,
    core: &[bool],
    node_bound: usize,
) -> Vec<Vec<NodeIndex>> {
    let mut candidates = Vec::new();

    for w in mol.atoms() {
        if !core[w.index()] {
            continue;
        }
        let (dist, pred) = bfs_tree(mol, core, w, node_bound);

        for edge in mol.bonds() {
            let (u, v) = match mol.bond_endpoints(edge) {
                Some(pair) => pair,
                None => continue,
            };
            if !core[u.index()] || !core[v.index()] {
                continue;
            }
            let (du, dv) = (dist[u.index()], dist[v.index()]);
            if du == u32::MAX || dv == u32::MAX {
                continue;
            }
            if (du + dv + 1) < 3 {
                continue;
            }
            let path_u = tree_path(&pred, w, u);
            let path_v = tree_path(&pred, w, v);
            if path_u.is_empty() || path_v.is_empty() {
                continue;
            }
            if share_internal_node(&path_u, &path_v) {
                continue;
            }
            let mut ring = path_u;
            for &node in path_v[1..].iter().rev() {
                ring.push(node);
            }
            candidates.push(ring);
        }
    }

    candidates.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    candidates.dedup();
    candidates
}

fn bfs_tree(
    mol: &Molecule,
    core: &[bool],
    src: NodeIndex,
    node_bound: usize,
) -> (Vec<u32>, Vec<Option<NodeIndex>>) {
    let mut dist = vec![u32::MAX; node_bound];
    let mut pred: Vec<Option<NodeIndex>> = vec![None; node_bound];
    dist[src.index()] = 0;
    let mut queue = VecDeque::new();
    queue.push_back(src);
    while let Some(current) = queue.pop_front() {
        let d = dist[current.index()];
        for (nb, _) in mol.neighbors(current) {
            if core[nb.index()] && dist[nb.index()] == u32::MAX {
                dist[nb.index()] = d + 1;
                pred[nb.index()] = Some(current);
                queue.push_back(nb);
            }
        }
    }
    (dist, pred)
}

fn tree_path(pred: &[Option<NodeIndex>], src: NodeIndex, dst: NodeIndex) -> Vec<NodeIndex> {
    let mut path = vec![dst];
    let mut current = dst;
    while current != src {
        match pred[current.index()] {
            Some(p) => {
                path.push(p);
                current = p;
            }
            None => return Vec::new(),
        }
    }
    path.reverse();
    path
}

fn share_internal_node(path_u: &[NodeIndex], path_v: &[NodeIndex]) -> bool {
    if path_u.len() < 2 || path_v.len() < 2 {
        return false;
    }
    path_u[1..].iter().any(|n| path_v[1..].contains(n))
}

fn select_independent(
    mol: &Molecule,
    edge_bound: usize,
    candidates: &[Vec<NodeIndex>],
    expected: usize,
    basis: &mut Vec<Vec<u64>>,
    accepted: &mut Vec<Vec<NodeIndex>>,
) {
    for ring in candidates {
        if accepted.len() >= expected {
            break;
        }
        let bv = edge_bitvector(mol, edge_bound, ring);
        if bv.iter().all(|&w| w == 0) {
            continue;
        }
        if try_add_to_basis(basis, bv) {
            accepted.push(normalize_ring(ring));
        }
    }
}

fn edge_bitvector(mol: &Molecule, edge_bound: usize, ring: &[NodeIndex]) -> Vec<u64> {
    let words = edge_bound.div_ceil(64);
    let mut bv = vec![0u64; words];
    let len = ring.len();
    for i in 0..len {
        let a = ring[i];
        let b = ring[(i + 1) % len];
        if let Some(edge) = mol.bond_between(a, b) {
            let idx = edge.index();
            bv[idx / 64] |= 1u64 << (idx % 64);
        }
    }
    bv
}

// Gaussian elimination over GF(2): reduce the candidate against the basis;
// a nonzero remainder is independent and joins the basis.
fn try_add_to_basis(basis: &mut Vec<Vec<u64>>, candidate: Vec<u64>) -> bool {
    let mut v = candidate;
    for row in basis.iter() {
        if let Some(p) = leading_bit(row) {
            if v[p / 64] & (1u64 << (p % 64)) != 0 {
                xor_into(&mut v, row);
            }
        }
    }
    if v.iter().all(|&w| w == 0) {
        return false;
    }
    basis.push(v);
    true
}

fn leading_bit(bv: &[u64]) -> Option<usize> {
    for (i, &word) in bv.iter().enumerate() {
        if word != 0 {
            return Some(i * 64 + word.trailing_zeros() as usize);
        }
    }
    None
}

fn xor_into(a: &mut [u64], b: &[u64]) {
    for (aw, bw) in a.iter_mut().zip(b.iter()) {
        *aw ^= *bw;
    }
}

// Rotate the cycle so it starts at its minimum atom index and runs toward
// the smaller of its two neighbors. Makes ring identity independent of the
// discovery path.
fn normalize_ring(ring: &[NodeIndex]) -> Vec<NodeIndex> {
    if ring.is_empty() {
        return Vec::new();
    }
    let min_pos = ring
        .iter()
        .enumerate()
        .min_by_key(|&(_, idx)| idx)
        .map(|(i, _)| i)
        .unwrap();

    let len = ring.len();
    let mut normalized = Vec::with_capacity(len);
    for i in 0..len {
        normalized.push(ring[(min_pos + i) % len]);
    }

    if len > 2 && normalized[1] > normalized[len - 1] {
        normalized[1..].reverse();
    }

    normalized
}

fn ring_bonds(mol: &Molecule, atoms: &[NodeIndex]) -> Vec<EdgeIndex> {
    let len = atoms.len();
    (0..len)
        .map(|i| {
            mol.bond_between(atoms[i], atoms[(i + 1) % len])
                .expect("consecutive ring atoms must be bonded")
        })
        .collect()
}
