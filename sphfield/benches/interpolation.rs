#![allow(clippy::needless_return)]

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use sphfield::{FieldInterpolator, InterpolationOptions, Kernel, KernelKind};
use sphfield::{NeighborList, NeighborListOptions, Normalization, SimulationBox};

use criterion::{Criterion, black_box, criterion_group, criterion_main};


fn interpolation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Interpolation (per query point)");
    group.noise_threshold(0.05);

    let n_points = 10_000;
    let mut rng = StdRng::seed_from_u64(0xdead_beef);
    let points = Array2::from_shape_fn((n_points, 2), |_| rng.random::<f64>());
    let values = Array2::from_shape_fn((n_points, 2), |_| rng.random::<f64>() - 0.5);
    let volumes = Array1::from_elem(n_points, 1.0 / n_points as f64);

    let domain = SimulationBox::square(1.0, true);
    let mut options = NeighborListOptions::new(0.05);
    options.self_pairs = true;
    let neighbors = NeighborList::periodic(&domain, points.view(), options).unwrap();

    for &kind in black_box(&KernelKind::ALL) {
        let kernel = Kernel::new(kind, 0.05, 2).unwrap();
        for normalization in [Normalization::Sum, Normalization::Shepard] {
            let interpolator = FieldInterpolator::new(kernel, InterpolationOptions { normalization });

            group.bench_function(&format!("{} kernel, {:?}", kind, normalization), |b| b.iter_custom(|repeat| {
                let start = std::time::Instant::now();
                for _ in 0..repeat {
                    let output = interpolator.interpolate(&neighbors, values.view(), volumes.view()).unwrap();
                    black_box(output);
                }
                start.elapsed() / n_points as u32
            }));
        }
    }
}

criterion_group!(all, interpolation);
criterion_main!(all);
