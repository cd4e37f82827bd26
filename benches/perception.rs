use criterion::{black_box, criterion_group, criterion_main, Criterion};
use petgraph::graph::NodeIndex;

use molgraph::{find_all, has_match, Atom, Bond, Molecule, Query, RingSet};

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

fn acene(rings: usize) -> Molecule {
    let mut mol = Molecule::new();
    let mut shared = {
        let a = mol.add_atom(carbon());
        let b = mol.add_atom(carbon());
        mol.add_bond(a, b, Bond::default()).unwrap();
        (a, b)
    };
    for _ in 0..rings {
        let mut prev = shared.0;
        let mut fresh = Vec::with_capacity(4);
        for _ in 0..4 {
            let next = mol.add_atom(carbon());
            mol.add_bond(prev, next, Bond::default()).unwrap();
            fresh.push(next);
            prev = next;
        }
        mol.add_bond(prev, shared.1, Bond::default()).unwrap();
        shared = (fresh[1], fresh[2]);
    }
    mol
}

fn bench_sssr(c: &mut Criterion) {
    let naphthalene = acene(2);
    let pentacene = acene(5);
    let ribbon = acene(50);

    let mut group = c.benchmark_group("sssr");

    group.bench_function("naphthalene", |b| {
        b.iter(|| black_box(RingSet::perceive(black_box(&naphthalene))))
    });
    group.bench_function("pentacene", |b| {
        b.iter(|| black_box(RingSet::perceive(black_box(&pentacene))))
    });
    group.bench_function("ribbon_50", |b| {
        b.iter(|| black_box(RingSet::perceive(black_box(&ribbon))))
    });

    group.finish();
}

fn bench_substruct(c: &mut Criterion) {
    let hexagon = Query::from_molecule(&carbocycle(6));
    let pentacene = acene(5);
    let ribbon = acene(20);

    let mut group = c.benchmark_group("substruct");

    group.bench_function("hexagon_in_pentacene", |b| {
        b.iter(|| black_box(find_all(black_box(&hexagon), black_box(&pentacene)).unwrap()))
    });
    group.bench_function("hexagon_in_ribbon_20", |b| {
        b.iter(|| black_box(find_all(black_box(&hexagon), black_box(&ribbon)).unwrap()))
    });
    group.bench_function("first_match_only", |b| {
        b.iter(|| black_box(has_match(black_box(&hexagon), black_box(&ribbon)).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_sssr, bench_substruct);
criterion_main!(benches);
