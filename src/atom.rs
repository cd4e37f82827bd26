/// Default atom record for a molecular graph node.
///
/// `Atom` stores intrinsic atomic properties — the things you would read off
/// a structural formula. Derived properties (ring membership, match results)
/// live on the owning [`Molecule`](crate::Molecule), never on the atom.
///
/// # Examples
///
/// ```
/// use molgraph::Atom;
///
/// let carbon = Atom {
///     atomic_num: 6,
///     formal_charge: 0,
///     hydrogen_count: 3,
///     is_aromatic: false,
///     position: None,
/// };
/// assert_eq!(carbon.atomic_num, 6);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Atom {
    /// Atomic number (1 = H, 6 = C, 7 = N, …). Identifies the element.
    pub atomic_num: u8,
    /// Formal charge in elementary charge units (e.g. −1 for a carboxylate oxygen).
    pub formal_charge: i8,
    /// Number of implicit (suppressed) hydrogens on this atom.
    ///
    /// These are not graph nodes — they are implied by the atom's valence.
    pub hydrogen_count: u8,
    /// Whether this atom is part of an aromatic system.
    ///
    /// Set by an external aromaticity model; this crate only stores it.
    pub is_aromatic: bool,
    /// Optional 3-D position. Opaque to ring perception and substructure
    /// matching, which are coordinate-free; carried for collaborators that
    /// attach geometry.
    pub position: Option<[f64; 3]>,
}

impl Atom {
    /// Builds an atom of the given element with all other fields defaulted.
    pub fn from_atomic_num(atomic_num: u8) -> Self {
        Self {
            atomic_num,
            ..Self::default()
        }
    }
}
