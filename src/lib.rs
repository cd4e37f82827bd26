pub mod atom;
pub mod bond;
pub mod molecule;
pub mod query;
pub mod rings;
pub mod substruct;

pub use atom::Atom;
pub use bond::{Bond, BondOrder};
pub use molecule::{GraphError, Molecule};
pub use query::{AtomPredicate, BondPredicate, Query};
pub use rings::{Ring, RingSet};
pub use substruct::{
    find_all, find_first, has_match, match_iter, Match, MatchError, MatchOptions, Matches,
};
