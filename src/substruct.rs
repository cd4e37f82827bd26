use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use petgraph::graph::NodeIndex;
use thiserror::Error;
use tracing::trace;

use crate::molecule::Molecule;
use crate::query::Query;
use crate::rings::RingSet;

/// Errors produced by substructure search.
///
/// "No match" is not an error — it is an empty result sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// The query graph is structurally unusable for the requested search.
    #[error("invalid query: {0}")]
    InvalidQuery(&'static str),
    /// The search was cancelled cooperatively, or its step budget ran out.
    #[error("substructure search cancelled")]
    Cancelled,
}

/// One embedding of a query graph in a target molecule: an injective mapping
/// from query atoms to target atoms, consistent with adjacency and every
/// predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pairs: Vec<(NodeIndex, NodeIndex)>,
}

impl Match {
    /// `(query atom, target atom)` pairs, ordered by query atom index.
    pub fn pairs(&self) -> &[(NodeIndex, NodeIndex)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The target atom a query atom was mapped to.
    pub fn target_of(&self, query_atom: NodeIndex) -> Option<NodeIndex> {
        self.pairs
            .iter()
            .find(|(q, _)| *q == query_atom)
            .map(|&(_, t)| t)
    }
}

/// Knobs for one substructure search.
///
/// Adversarial queries can blow up combinatorially, so long enumerations
/// should carry either `cancel` (a flag the caller flips from elsewhere) or
/// `max_steps`; both surface as [`MatchError::Cancelled`] and are checked at
/// every backtracking step.
#[derive(Debug, Clone)]
pub struct MatchOptions {
    /// Reject disconnected queries with [`MatchError::InvalidQuery`].
    /// Defaults to on; disable to match multi-fragment patterns.
    pub require_connected: bool,
    /// Step budget; `None` means unbounded.
    pub max_steps: Option<u64>,
    /// Cooperative cancellation flag.
    pub cancel: Option<Arc<AtomicBool>>,
    /// Symmetry-reduced counting: suppress embeddings whose target atom set
    /// has already been reported. Off by default — automorphic images of the
    /// same atoms are distinct matches.
    pub unique_atom_sets: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            require_connected: true,
            max_steps: None,
            cancel: None,
            unique_atom_sets: false,
        }
    }
}

/// True when at least one embedding of `query` exists in `target`.
///
/// Stops at the first match; the full embedding set is never materialized.
pub fn has_match(query: &Query, target: &Molecule) -> Result<bool, MatchError> {
    Ok(find_first(query, target)?.is_some())
}

/// The first embedding found, if any. Deterministic for identical inputs.
pub fn find_first(query: &Query, target: &Molecule) -> Result<Option<Match>, MatchError> {
    let mut iter = match_iter(query, target, MatchOptions::default())?;
    iter.next().transpose()
}

/// Every embedding of `query` in `target`.
///
/// Distinct embeddings that are automorphic images of each other are all
/// reported; set [`MatchOptions::unique_atom_sets`] via [`match_iter`] for
/// symmetry-reduced counting.
pub fn find_all(query: &Query, target: &Molecule) -> Result<Vec<Match>, MatchError> {
    match_iter(query, target, MatchOptions::default())?.collect()
}

/// Lazy embedding enumeration.
///
/// The returned iterator is finite, deterministic for identical inputs, and
/// not restartable once consumed. Validation happens here: an empty query —
/// or a disconnected one, unless
/// [`MatchOptions::require_connected`] is disabled — is
/// [`MatchError::InvalidQuery`].
pub fn match_iter<'a>(
    query: &'a Query,
    target: &'a Molecule,
    options: MatchOptions,
) -> Result<Matches<'a>, MatchError> {
    if query.atom_count() == 0 {
        return Err(MatchError::InvalidQuery("query graph is empty"));
    }
    if options.require_connected && !query.is_connected() {
        return Err(MatchError::InvalidQuery("query graph is disconnected"));
    }

    // Ring predicates read the target's SSSR; force perception once, up
    // front, so every feasibility check sees the same ring set.
    let ring_info = query.uses_ring_info().then(|| target.rings());

    let (order, anchors, pos) = assignment_order(query);
    let n = order.len();

    Ok(Matches {
        query,
        target,
        options,
        ring_info,
        order,
        anchors,
        pos,
        mapping: vec![None; n],
        used: HashSet::new(),
        frames: Vec::with_capacity(n),
        seen_sets: HashSet::new(),
        steps: 0,
        emitted: 0,
        done: false,
    })
}

/// Most-constrained-first, connected assignment order.
///
/// The seed is the query atom with the best `(degree, specificity)` score;
/// each following atom is drawn from the frontier adjacent to the ordered
/// prefix, again most-constrained-first, ties to the lowest index. Every
/// non-seed atom records an anchor: the ordered position of one mapped
/// neighbor, whose image restricts the candidate set during search.
fn assignment_order(query: &Query) -> (Vec<NodeIndex>, Vec<Option<usize>>, Vec<usize>) {
    let n = query.atom_count();
    let mut order = Vec::with_capacity(n);
    let mut anchors = Vec::with_capacity(n);
    let mut pos = vec![usize::MAX; n];
    let mut placed = vec![false; n];

    let score = |q: NodeIndex| (query.degree(q), query.atom_predicate(q).specificity());

    while order.len() < n {
        let frontier: Vec<NodeIndex> = query
            .atoms()
            .filter(|q| !placed[q.index()])
            .filter(|&q| query.neighbors(q).any(|(nb, _)| placed[nb.index()]))
            .collect();
        let pool: Vec<NodeIndex> = if frontier.is_empty() {
            query.atoms().filter(|q| !placed[q.index()]).collect()
        } else {
            frontier
        };
        let next = pool
            .into_iter()
            .max_by_key(|&q| (score(q), std::cmp::Reverse(q.index())))
            .expect("unplaced query atoms remain");

        let anchor = query
            .neighbors(next)
            .filter(|(nb, _)| placed[nb.index()])
            .map(|(nb, _)| pos[nb.index()])
            .min();

        pos[next.index()] = order.len();
        anchors.push(anchor);
        placed[next.index()] = true;
        order.push(next);
    }

    (order, anchors, pos)
}

struct Frame {
    cands: Vec<NodeIndex>,
    cursor: usize,
    chosen: Option<NodeIndex>,
}

/// Lazy iterator over embeddings, produced by [`match_iter`].
///
/// Yields `Ok(Match)` per embedding; a cancellation or budget stop yields a
/// single `Err(Cancelled)` and then ends.
pub struct Matches<'a> {
    query: &'a Query,
    target: &'a Molecule,
    options: MatchOptions,
    ring_info: Option<Arc<RingSet>>,
    order: Vec<NodeIndex>,
    anchors: Vec<Option<usize>>,
    pos: Vec<usize>,
    mapping: Vec<Option<NodeIndex>>,
    used: HashSet<NodeIndex>,
    frames: Vec<Frame>,
    seen_sets: HashSet<Vec<usize>>,
    steps: u64,
    emitted: u64,
    done: bool,
}

impl Matches<'_> {
    fn new_frame(&self, depth: usize) -> Frame {
        let cands = match self.anchors[depth] {
            Some(anchor_pos) => {
                let image = self.mapping[anchor_pos].expect("anchor is mapped before its dependents");
                let mut cands: Vec<NodeIndex> =
                    self.target.neighbors(image).map(|(nb, _)| nb).collect();
                cands.sort();
                cands
            }
            // component seed: no mapped neighbor to prune against
            None => self.target.atoms().collect(),
        };
        Frame {
            cands,
            cursor: 0,
            chosen: None,
        }
    }

    fn is_feasible(&self, depth: usize, candidate: NodeIndex) -> bool {
        if self.used.contains(&candidate) {
            return false;
        }
        let query_atom = self.order[depth];
        let atom = match self.target.atom(candidate) {
            Some(atom) => atom,
            None => return false,
        };
        let rings = self.ring_info.as_deref();
        if !self
            .query
            .atom_predicate(query_atom)
            .matches(atom, candidate, rings)
        {
            return false;
        }
        // every already-mapped query neighbor must be bonded to the
        // candidate in the target, with a compatible bond
        for (q_neighbor, q_bond) in self.query.neighbors(query_atom) {
            if let Some(image) = self.mapping[self.pos[q_neighbor.index()]] {
                let t_bond = match self.target.bond_between(candidate, image) {
                    Some(t_bond) => t_bond,
                    None => return false,
                };
                let bond = self
                    .target
                    .bond(t_bond)
                    .expect("bond between live atoms must exist");
                if !self
                    .query
                    .bond_predicate(q_bond)
                    .matches(bond, t_bond, rings)
                {
                    return false;
                }
            }
        }
        true
    }

    fn current_match(&self) -> Match {
        let mut pairs: Vec<(NodeIndex, NodeIndex)> = self
            .order
            .iter()
            .zip(self.mapping.iter())
            .map(|(&q, m)| (q, m.expect("mapping is complete when a match is emitted")))
            .collect();
        pairs.sort_by_key(|&(q, _)| q.index());
        Match { pairs }
    }

    fn cancelled(&self) -> bool {
        if let Some(flag) = &self.options.cancel {
            if flag.load(Ordering::Relaxed) {
                return true;
            }
        }
        matches!(self.options.max_steps, Some(limit) if self.steps >= limit)
    }
}

impl Iterator for Matches<'_> {
    type Item = Result<Match, MatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.frames.is_empty() {
            let frame = self.new_frame(0);
            self.frames.push(frame);
        }

        loop {
            if self.cancelled() {
                self.done = true;
                return Some(Err(MatchError::Cancelled));
            }
            self.steps += 1;

            let depth = self.frames.len() - 1;

            // release the choice made at this depth on the previous visit
            if let Some(prev) = self.frames[depth].chosen.take() {
                self.used.remove(&prev);
                self.mapping[depth] = None;
            }

            let mut advanced = false;
            while self.frames[depth].cursor < self.frames[depth].cands.len() {
                let candidate = self.frames[depth].cands[self.frames[depth].cursor];
                self.frames[depth].cursor += 1;
                if self.is_feasible(depth, candidate) {
                    self.mapping[depth] = Some(candidate);
                    self.used.insert(candidate);
                    self.frames[depth].chosen = Some(candidate);
                    advanced = true;
                    break;
                }
            }

            if !advanced {
                // dead end: backtrack to the previous choice point
                self.frames.pop();
                if self.frames.is_empty() {
                    self.done = true;
                    trace!(steps = self.steps, emitted = self.emitted, "search exhausted");
                    return None;
                }
                continue;
            }

            if self.frames.len() == self.order.len() {
                if self.options.unique_atom_sets {
                    let mut key: Vec<usize> = self
                        .mapping
                        .iter()
                        .map(|m| m.expect("mapping is complete").index())
                        .collect();
                    key.sort_unstable();
                    if !self.seen_sets.insert(key) {
                        continue;
                    }
                }
                self.emitted += 1;
                return Some(Ok(self.current_match()));
            }

            let frame = self.new_frame(self.frames.len());
            self.frames.push(frame);
        }
    }
}
