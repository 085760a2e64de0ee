use std::collections::BTreeSet;

use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use sphfield::{NeighborList, NeighborListOptions, SimulationBox};

fn random_points(domain: &SimulationBox, n_points: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let dimension = domain.dimension();
    return Array2::from_shape_fn((n_points, dimension), |(_, i)| {
        domain.lo()[i] + rng.random::<f64>() * domain.length(i)
    });
}

/// Find neighbors by brute force over an explicit tiling of the box, with one
/// replica on each side along periodic dimensions
fn tiled_neighbors(domain: &SimulationBox, points: &Array2<f64>, cutoff: f64) -> Vec<BTreeSet<(usize, [i32; 3])>> {
    let dimension = domain.dimension();

    let mut shifts = vec![[0; 3]];
    for i in 0..dimension {
        if !domain.is_periodic(i) {
            continue;
        }
        let mut new_shifts = Vec::new();
        for shift in &shifts {
            for offset in [-1, 1] {
                let mut shift = *shift;
                shift[i] = offset;
                new_shifts.push(shift);
            }
        }
        shifts.extend(new_shifts);
    }

    let mut neighbors = vec![BTreeSet::new(); points.nrows()];
    for i in 0..points.nrows() {
        for j in 0..points.nrows() {
            for shift in &shifts {
                if i == j && *shift == [0, 0, 0] {
                    continue;
                }

                let mut distance2 = 0.0;
                for k in 0..dimension {
                    let d = points[[j, k]] + shift[k] as f64 * domain.length(k) - points[[i, k]];
                    distance2 += d * d;
                }

                if distance2 < cutoff * cutoff {
                    neighbors[i].insert((j, *shift));
                }
            }
        }
    }
    return neighbors;
}

fn check_against_tiling(domain: &SimulationBox, n_points: usize, cutoff: f64) {
    let points = random_points(domain, n_points, 0x5eed);
    let neighbors = NeighborList::periodic(domain, points.view(), NeighborListOptions::new(cutoff)).unwrap();
    let expected = tiled_neighbors(domain, &points, cutoff);

    for i in 0..n_points {
        let actual = neighbors.pairs(i).iter()
            .map(|pair| (pair.second, pair.cell_shift))
            .collect::<BTreeSet<_>>();

        assert_eq!(neighbors.pairs(i).len(), expected[i].len(), "wrong neighbor count for point {}", i);
        assert_eq!(actual, expected[i], "wrong neighbors for point {}", i);
    }
}

#[test]
fn fully_periodic_2d() {
    let domain = SimulationBox::square(1.0, true);
    check_against_tiling(&domain, 500, 0.2);
}

#[test]
fn fully_periodic_3d() {
    let domain = SimulationBox::new(&[-1.0, 0.0, 2.0], &[1.0, 1.5, 3.0], &[true, true, true]).unwrap();
    check_against_tiling(&domain, 400, 0.45);
}

#[test]
fn partially_periodic_3d() {
    let domain = SimulationBox::new(&[0.0, 0.0, 0.0], &[1.0, 1.0, 1.0], &[true, false, true]).unwrap();
    check_against_tiling(&domain, 400, 0.3);

    let domain = SimulationBox::new(&[0.0, 0.0, 0.0], &[1.0, 1.0, 1.0], &[false, false, true]).unwrap();
    check_against_tiling(&domain, 400, 0.3);
}

#[test]
fn neighbor_symmetry() {
    let domain = SimulationBox::cubic(1.0, true);
    let points = random_points(&domain, 2000, 42);
    let neighbors = NeighborList::periodic(&domain, points.view(), NeighborListOptions::new(0.15)).unwrap();

    for pair in neighbors.iter() {
        let reverse = neighbors.pairs(pair.second).iter()
            .find(|other| other.second == pair.first)
            .expect("missing symmetric pair");

        assert!((reverse.distance - pair.distance).abs() < 1e-12);
        assert_eq!(
            reverse.cell_shift,
            [-pair.cell_shift[0], -pair.cell_shift[1], -pair.cell_shift[2]]
        );
    }
}

#[test]
fn wrap_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(7);
    let points = Array2::from_shape_fn((1000, 3), |_| 10.0 * (rng.random::<f64>() - 0.5));
    // include points exactly on the box boundaries
    let mut points = points;
    points[[0, 0]] = 1.0;
    points[[1, 1]] = -2.0;
    points[[2, 2]] = 3.0;
    points[[3, 0]] = -1e-17;

    for periodic in [[true, true, true], [true, false, true], [false, false, false]] {
        let domain = SimulationBox::new(&[-1.0, -2.0, 0.5], &[1.0, 2.0, 3.0], &periodic).unwrap();

        let wrapped = domain.incell(points.view()).unwrap();
        let twice = domain.incell(wrapped.view()).unwrap();
        assert_eq!(wrapped, twice);

        for (row, original) in wrapped.outer_iter().zip(points.outer_iter()) {
            for i in 0..3 {
                if periodic[i] {
                    assert!(row[i] >= domain.lo()[i] && row[i] < domain.hi()[i]);
                } else {
                    assert_eq!(row[i], original[i]);
                }
            }
        }
    }
}
