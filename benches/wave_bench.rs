use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use mesh_plic::algs::communicator::NoComm;
use mesh_plic::algs::wave::wall_distance;
use mesh_plic::mesh::build::box_mesh;
use mesh_plic::plic::Mplic;

fn bench_wall_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("wall_distance");

    for &n in &[8usize, 16usize] {
        let mesh = box_mesh(n, n, n, [1.0, 1.0, 1.0]).unwrap();
        group.bench_with_input(BenchmarkId::new("box", n), &n, |b, _| {
            b.iter(|| {
                let dist = wall_distance(&mesh, &NoComm, black_box(&[0]), -1.0).unwrap();
                black_box(dist)
            })
        });
    }
    group.finish();
}

fn bench_mplic(c: &mut Criterion) {
    let mut group = c.benchmark_group("mplic_interpolate");

    for &n in &[8usize, 16usize] {
        let mesh = box_mesh(n, n, n, [1.0, 1.0, 1.0]).unwrap();
        // Planar interface halfway up the box.
        let alpha: Vec<f64> = (0..mesh.n_cells())
            .map(|cell| {
                let z0 = mesh.cell_centre(cell)[2] - 0.5 / n as f64;
                ((0.5 - z0) * n as f64).clamp(0.0, 1.0)
            })
            .collect();
        let phi: Vec<f64> = (0..mesh.n_faces()).map(|f| mesh.face_area(f)[2]).collect();
        group.bench_with_input(BenchmarkId::new("box", n), &n, |b, _| {
            let mut mplic = Mplic::new();
            b.iter(|| {
                let out = mplic
                    .interpolate(&mesh, black_box(&alpha), black_box(&phi))
                    .unwrap();
                black_box(out.alphaf.len())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_wall_distance, bench_mplic);
criterion_main!(benches);
