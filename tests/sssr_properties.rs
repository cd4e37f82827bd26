use molgraph::{Atom, Bond, Molecule, Ring};
use petgraph::graph::NodeIndex;

fn carbon() -> Atom {
    Atom::from_atomic_num(6)
}

fn carbocycle(n: usize) -> Molecule {
    let mut mol = Molecule::new();
    let atoms: Vec<NodeIndex> = (0..n).map(|_| mol.add_atom(carbon())).collect();
    for i in 0..n {
        mol.add_bond(atoms[i], atoms[(i + 1) % n], Bond::default())
            .unwrap();
    }
    mol
}

/// Norbornane skeleton: a six-membered ring with a one-carbon bridge across
/// positions 0 and 3.
fn norbornane() -> Molecule {
    let mut mol = carbocycle(6);
    let atoms: Vec<NodeIndex> = mol.atoms().collect();
    let bridge = mol.add_atom(carbon());
    mol.add_bond(atoms[0], bridge, Bond::default()).unwrap();
    mol.add_bond(atoms[3], bridge, Bond::default()).unwrap();
    mol
}

/// Cubane skeleton: two squares joined corner to corner, 8 atoms, 12 bonds.
fn cubane() -> Molecule {
    let mut mol = Molecule::new();
    let v: Vec<NodeIndex> = (0..8).map(|_| mol.add_atom(carbon())).collect();
    for i in 0..4 {
        mol.add_bond(v[i], v[(i + 1) % 4], Bond::default()).unwrap();
        mol.add_bond(v[4 + i], v[4 + (i + 1) % 4], Bond::default())
            .unwrap();
        mol.add_bond(v[i], v[4 + i], Bond::default()).unwrap();
    }
    mol
}

/// A four-ring and a five-ring sharing a single spiro atom.
fn spiro() -> Molecule {
    let mut mol = Molecule::new();
    let hub = mol.add_atom(carbon());
    for arm in [3usize, 4] {
        let mut prev = hub;
        for _ in 0..arm {
            let next = mol.add_atom(carbon());
            mol.add_bond(prev, next, Bond::default()).unwrap();
            prev = next;
        }
        mol.add_bond(prev, hub, Bond::default()).unwrap();
    }
    mol
}

fn assert_closed_cycle(mol: &Molecule, ring: &Ring) {
    let atoms = ring.atoms();
    let bonds = ring.bonds();
    assert_eq!(atoms.len(), bonds.len());
    assert!(atoms.len() >= 3);
    for i in 0..atoms.len() {
        let a = atoms[i];
        let b = atoms[(i + 1) % atoms.len()];
        assert_eq!(
            mol.bond_between(a, b),
            Some(bonds[i]),
            "ring bonds must connect consecutive ring atoms"
        );
    }
    let mut unique = atoms.to_vec();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), atoms.len(), "ring atoms must be distinct");
}

#[test]
fn every_perceived_ring_is_a_closed_cycle() {
    for mol in [carbocycle(3), carbocycle(8), norbornane(), cubane(), spiro()] {
        for ring in mol.rings().iter() {
            assert_closed_cycle(&mol, ring);
        }
    }
}

#[test]
fn ring_flags_agree_with_ring_lists() {
    for mol in [carbocycle(5), norbornane(), spiro()] {
        let rings = mol.rings();
        for atom in mol.atoms() {
            let listed = rings.iter().any(|r| r.contains_atom(atom));
            assert_eq!(rings.is_ring_atom(atom), listed);
        }
        for bond in mol.bonds() {
            let listed = rings.iter().any(|r| r.contains_bond(bond));
            assert_eq!(rings.is_ring_bond(bond), listed);
        }
    }
}

#[test]
fn rings_are_reported_smallest_first() {
    for mol in [norbornane(), spiro(), cubane()] {
        let sizes: Vec<usize> = mol.rings().iter().map(Ring::len).collect();
        let mut sorted = sizes.clone();
        sorted.sort_unstable();
        assert_eq!(sizes, sorted);
    }
}

#[test]
fn norbornane_prefers_the_five_rings() {
    let sizes: Vec<usize> = norbornane().rings().iter().map(Ring::len).collect();
    assert_eq!(sizes, vec![5, 5]);
}

#[test]
fn cubane_basis_is_five_squares() {
    let mol = cubane();
    let rings = mol.rings();
    assert_eq!(rings.len(), 5);
    assert!(rings.iter().all(|r| r.len() == 4));
}

#[test]
fn spiro_rings_share_only_the_hub() {
    let mol = spiro();
    let rings = mol.rings();
    assert_eq!(rings.len(), 2);
    assert_eq!(rings.rings()[0].len(), 4);
    assert_eq!(rings.rings()[1].len(), 5);

    let hub = mol.atoms().find(|&a| mol.degree(a) == 4).unwrap();
    assert_eq!(rings.membership_count(hub), 2);
    assert!(!rings.rings()[0].is_fused_to(&rings.rings()[1]));
}

#[test]
fn perception_ignores_acyclic_appendages() {
    let mut mol = carbocycle(6);
    let anchor = mol.atoms().next().unwrap();
    let mut prev = anchor;
    for _ in 0..4 {
        let next = mol.add_atom(carbon());
        mol.add_bond(prev, next, Bond::default()).unwrap();
        prev = next;
    }

    let rings = mol.rings();
    assert_eq!(rings.len(), 1);
    assert_eq!(rings.rings()[0].len(), 6);
    assert!(!rings.is_ring_atom(prev));
}

#[test]
fn insertion_order_does_not_change_ring_sizes() {
    // same hexagon, bonds closed in a different order
    let mut a = Molecule::new();
    let av: Vec<NodeIndex> = (0..6).map(|_| a.add_atom(carbon())).collect();
    for i in 0..6 {
        a.add_bond(av[i], av[(i + 1) % 6], Bond::default()).unwrap();
    }

    let mut b = Molecule::new();
    let bv: Vec<NodeIndex> = (0..6).map(|_| b.add_atom(carbon())).collect();
    for i in (0..6).rev() {
        b.add_bond(bv[i], bv[(i + 1) % 6], Bond::default()).unwrap();
    }

    let sizes_a: Vec<usize> = a.rings().iter().map(Ring::len).collect();
    let sizes_b: Vec<usize> = b.rings().iter().map(Ring::len).collect();
    assert_eq!(sizes_a, sizes_b);
}
