//! Reconstruction of continuous fields at query points from irregularly
//! spaced samples, using SPH kernels.
use log::warn;
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};
use rayon::prelude::*;

use crate::{Error, Kernel, NeighborList, SimulationBox};

/// How to normalize the kernel-weighted sums
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Plain SPH sum `Σ_j W(r_ij) y_j V_j`, suited for density-like
    /// (extensive) quantities.
    #[default]
    Sum,
    /// Shepard normalization `Σ_j W(r_ij) y_j V_j / Σ_j W(r_ij) V_j`, suited
    /// for intensive quantities such as velocities. This removes the
    /// truncation error close to free surfaces or sparse regions.
    Shepard,
}

/// Options for [`FieldInterpolator`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct InterpolationOptions {
    #[serde(default)]
    pub normalization: Normalization,
}

impl InterpolationOptions {
    /// Create options from their JSON representation
    pub fn from_json(json: &str) -> Result<InterpolationOptions, Error> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Interpolate fields defined on sample points at arbitrary query points,
/// using a kernel and a neighbor list between query points and samples.
///
/// The neighbor list maps each query point (`Pair::first`) to the samples
/// (`Pair::second`) within the kernel support. It can come from a self search
/// when the query points are the samples themselves. The neighbor list cutoff
/// should match the kernel smoothing length: samples further than the
/// smoothing length have no contribution, and samples missing from the list
/// are never considered.
///
/// Query points without any sample in the neighbor list get a NaN value,
/// which allows to mask them later.
#[derive(Debug, Clone, Copy)]
pub struct FieldInterpolator {
    kernel: Kernel,
    normalization: Normalization,
}

impl FieldInterpolator {
    pub fn new(kernel: Kernel, options: InterpolationOptions) -> FieldInterpolator {
        FieldInterpolator {
            kernel: kernel,
            normalization: options.normalization,
        }
    }

    /// Get the kernel used by this interpolator
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    fn check_neighbors(&self, neighbors: &NeighborList) -> Result<(), Error> {
        let h = self.kernel.smoothing_length();
        if neighbors.cutoff() < h * (1.0 - 1e-12) {
            // some samples within the kernel support would be ignored
            warn!(
                "the neighbor list cutoff ({}) is smaller than the kernel smoothing length ({})",
                neighbors.cutoff(), h
            );
        }

        let dimension = neighbors.query_positions().ncols();
        if dimension != self.kernel.dimension() {
            return Err(Error::ShapeMismatch(format!(
                "the neighbor list is for {}-dimensional points, but the kernel is {}-dimensional",
                dimension, self.kernel.dimension()
            )));
        }
        Ok(())
    }

    /// Interpolate a multi-component field at all query points of
    /// `neighbors`. `values` contains one row per sample, and `volumes` one
    /// volume per sample. The result contains one row per query point.
    #[time_graph::instrument(name = "FieldInterpolator::interpolate")]
    pub fn interpolate(
        &self,
        neighbors: &NeighborList,
        values: ArrayView2<f64>,
        volumes: ArrayView1<f64>,
    ) -> Result<Array2<f64>, Error> {
        self.check_neighbors(neighbors)?;
        check_samples(neighbors, values.nrows(), volumes.len())?;

        let mut output = Array2::from_elem((neighbors.n_query(), values.ncols()), f64::NAN);
        output.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(query, mut output)| {
                let pairs = neighbors.pairs(query);
                if pairs.is_empty() {
                    return;
                }

                output.fill(0.0);
                let mut weights = 0.0;
                for pair in pairs {
                    let weight = self.kernel.value(pair.distance) * volumes[pair.second];
                    weights += weight;
                    output.scaled_add(weight, &values.row(pair.second));
                }

                if self.normalization == Normalization::Shepard {
                    if weights == 0.0 {
                        output.fill(f64::NAN);
                    } else {
                        output /= weights;
                    }
                }
            });

        warn_missing(neighbors);
        return Ok(output);
    }

    /// Interpolate a scalar field, see [`FieldInterpolator::interpolate`]
    pub fn interpolate_scalar(
        &self,
        neighbors: &NeighborList,
        values: ArrayView1<f64>,
        volumes: ArrayView1<f64>,
    ) -> Result<Array1<f64>, Error> {
        let values = values.insert_axis(Axis(1));
        let output = self.interpolate(neighbors, values, volumes)?;
        return Ok(output.index_axis_move(Axis(1), 0));
    }

    /// Interpolate a tensor field (e.g. a stress tensor) with shape
    /// `n_samples x D x D`, applying the same weights to all components. The
    /// result has shape `n_query x D x D`.
    pub fn interpolate_tensors(
        &self,
        neighbors: &NeighborList,
        values: ArrayView3<f64>,
        volumes: ArrayView1<f64>,
    ) -> Result<Array3<f64>, Error> {
        let (n_samples, rows, columns) = values.dim();
        let flat = values.as_standard_layout();
        let flat = flat.view().into_shape_with_order((n_samples, rows * columns))?;

        let output = self.interpolate(neighbors, flat, volumes)?;
        let n_query = output.nrows();
        return Ok(output.into_shape_with_order((n_query, rows, columns))?);
    }

    /// Kernel sum `Σ_j W(r_ij)` at each query point, i.e. the number density
    /// of samples around the query point. This is NaN for query points without
    /// neighbors.
    pub fn number_density(&self, neighbors: &NeighborList) -> Result<Array1<f64>, Error> {
        let volumes = Array1::ones(neighbors.n_reference());
        let values = Array2::ones((neighbors.n_reference(), 1));
        let sum = FieldInterpolator {
            kernel: self.kernel,
            normalization: Normalization::Sum,
        };

        let output = sum.interpolate(neighbors, values.view(), volumes.view())?;
        return Ok(output.index_axis_move(Axis(1), 0));
    }
}

fn check_samples(neighbors: &NeighborList, n_values: usize, n_volumes: usize) -> Result<(), Error> {
    if n_values != neighbors.n_reference() {
        return Err(Error::ShapeMismatch(format!(
            "expected values for {} samples, got {}", neighbors.n_reference(), n_values
        )));
    }

    if n_volumes != neighbors.n_reference() {
        return Err(Error::ShapeMismatch(format!(
            "expected volumes for {} samples, got {}", neighbors.n_reference(), n_volumes
        )));
    }
    Ok(())
}

fn warn_missing(neighbors: &NeighborList) {
    let n_missing = (0..neighbors.n_query())
        .filter(|&query| neighbors.pairs(query).is_empty())
        .count();

    if n_missing != 0 {
        warn!(
            "{} query points out of {} have no sample within the kernel support, their value is NaN",
            n_missing, neighbors.n_query()
        );
    }
}

/// A regular grid of query points covering a simulation box
#[derive(Debug, Clone)]
pub struct RegularGrid {
    /// positions of the grid points, as a `N x D` array. The last dimension
    /// varies fastest.
    pub points: Array2<f64>,
    /// number of grid points along each dimension
    pub shape: Vec<usize>,
}

/// Create a grid of points at the center of cells of size close to `spacing`
/// covering `domain`. All points are strictly inside the box, and the grid is
/// compatible with periodic boundary conditions (the spacing between the last
/// and first point across a periodic boundary is the same as the spacing
/// inside the grid).
pub fn regular_grid(domain: &SimulationBox, spacing: f64) -> Result<RegularGrid, Error> {
    if !(spacing > 0.0 && spacing.is_finite()) {
        return Err(Error::InvalidParameter(format!(
            "grid spacing must be a positive number, got {}", spacing
        )));
    }

    let dimension = domain.dimension();
    let mut shape = Vec::with_capacity(dimension);
    let mut steps = Vec::with_capacity(dimension);
    for i in 0..dimension {
        let length = domain.length(i);
        let count = usize::max(f64::round(length / spacing) as usize, 1);
        shape.push(count);
        steps.push(length / count as f64);
    }

    let n_points = shape.iter().product::<usize>();
    let mut points = Array2::zeros((n_points, dimension));
    for (index, mut point) in points.outer_iter_mut().enumerate() {
        let mut remaining = index;
        for i in (0..dimension).rev() {
            let k = remaining % shape[i];
            remaining /= shape[i];
            point[i] = domain.lo()[i] + (k as f64 + 0.5) * steps[i];
        }
    }

    return Ok(RegularGrid {
        points: points,
        shape: shape,
    });
}
