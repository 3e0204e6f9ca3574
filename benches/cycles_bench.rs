use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use schema_cycles::catalog::{AuditFilter, DumpCatalog};
use schema_cycles::graph::{build_from_catalog, is_cyclic, simple_cycles, DagCandidateGraph};
use std::hint::black_box;

/// Ring of `n` tables where each table also references the next two,
/// giving a cycle count that grows quickly with `n`.
fn dense_ring(n: usize) -> Vec<(String, String)> {
    let mut edges = Vec::new();
    for i in 0..n {
        for step in 1..=2 {
            edges.push((format!("t{}", i), format!("t{}", (i + step) % n)));
        }
    }
    edges
}

/// Many independent two-table cycles hanging off a shared lookup table
fn many_pairs(pairs: usize) -> Vec<(String, String)> {
    let mut edges = Vec::new();
    for i in 0..pairs {
        let a = format!("parent_{}", i);
        let b = format!("child_{}", i);
        edges.push((a.clone(), b.clone()));
        edges.push((b.clone(), a.clone()));
        edges.push((b, "lookup".to_string()));
    }
    edges
}

fn generate_dump(tables: usize) -> Vec<u8> {
    let mut data = Vec::new();
    for i in 0..tables {
        let next = (i + 1) % tables;
        data.extend_from_slice(
            format!(
                "CREATE TABLE t{} (\n  id INT PRIMARY KEY,\n  name VARCHAR(255) DEFAULT 'a;b',\n  next_id INT,\n  FOREIGN KEY (next_id) REFERENCES t{}(id)\n);\n",
                i, next
            )
            .as_bytes(),
        );
        data.extend_from_slice(
            format!("INSERT INTO t{} VALUES (1, 'Name -- not a comment', NULL);\n", i).as_bytes(),
        );
    }
    data
}

fn to_dag(edges: &[(String, String)]) -> DagCandidateGraph {
    DagCandidateGraph::from_edges(edges.iter().map(|(a, b)| (a.as_str(), b.as_str())))
}

fn bench_simple_cycles(c: &mut Criterion) {
    let mut group = c.benchmark_group("simple_cycles");

    for n in [8, 12, 16] {
        let dag = to_dag(&dense_ring(n));
        group.bench_with_input(BenchmarkId::new("dense_ring", n), &dag, |b, dag| {
            b.iter(|| simple_cycles(black_box(dag)))
        });
    }

    for pairs in [100, 1_000] {
        let dag = to_dag(&many_pairs(pairs));
        group.bench_with_input(BenchmarkId::new("many_pairs", pairs), &dag, |b, dag| {
            b.iter(|| simple_cycles(black_box(dag)))
        });
    }

    group.finish();
}

fn bench_is_cyclic(c: &mut Criterion) {
    let dag = to_dag(&many_pairs(1_000));
    c.bench_function("is_cyclic/many_pairs_1000", |b| {
        b.iter(|| is_cyclic(black_box(&dag)))
    });
}

fn bench_dump_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("dump_pipeline");

    for tables in [100, 1_000] {
        let data = generate_dump(tables);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(tables), &data, |b, data| {
            b.iter(|| {
                let catalog =
                    DumpCatalog::from_reader(data.as_slice(), AuditFilter::default(), None)
                        .unwrap();
                let graphs = build_from_catalog(&catalog).unwrap();
                black_box(simple_cycles(&graphs.dag))
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_simple_cycles,
    bench_is_cyclic,
    bench_dump_pipeline
);
criterion_main!(benches);
