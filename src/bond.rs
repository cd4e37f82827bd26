/// Bond order classification.
///
/// `Aromatic` is a first-class order here rather than a flag pair: the
/// substructure matcher compares orders directly, and parsers that produce
/// Kekulé structures can simply never emit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
}

/// Default bond record for a molecular graph edge.
///
/// Ring membership of a bond is derived state, cached on the owning
/// [`Molecule`](crate::Molecule) — see
/// [`Molecule::is_ring_bond`](crate::Molecule::is_ring_bond).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Bond {
    pub order: BondOrder,
}

impl Bond {
    pub fn new(order: BondOrder) -> Self {
        Self { order }
    }
}
