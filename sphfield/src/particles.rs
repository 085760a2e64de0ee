//! Particle records and per-frame snapshots, as produced by an external dump
//! reader.
use std::collections::BTreeMap;

use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis};

use crate::{Error, SimulationBox, Vector3D};
use crate::{Kernel, NeighborList, NeighborListOptions};
use crate::interpolation::{FieldInterpolator, InterpolationOptions, Normalization};
use crate::forces::{LandshoffParameters, ViscousForces, landshoff_forces};

/// A single particle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// position of the particle. Only the first `D` components are used.
    pub position: Vector3D,
    /// velocity of the particle. Only the first `D` components are used.
    pub velocity: Vector3D,
    /// density of the particle
    pub density: f64,
    /// volume of the particle
    pub volume: f64,
    /// type label of the particle
    pub kind: i32,
}

/// A set of particles, stored as one array per property.
///
/// Properties not covered by [`Particle`] can be stored in the extra
/// side-table, as arrays with one row per particle.
#[derive(Debug, Clone)]
pub struct ParticleSet {
    positions: Array2<f64>,
    velocities: Array2<f64>,
    densities: Array1<f64>,
    volumes: Array1<f64>,
    kinds: Vec<i32>,
    extra: BTreeMap<String, Array2<f64>>,
}

impl ParticleSet {
    /// Create an empty particle set in `dimension` (2 or 3) dimensions
    pub fn new(dimension: usize) -> Result<ParticleSet, Error> {
        if dimension != 2 && dimension != 3 {
            return Err(Error::InvalidParameter(format!(
                "particles must be 2 or 3 dimensional, got {} dimensions", dimension
            )));
        }

        Ok(ParticleSet {
            positions: Array2::zeros((0, dimension)),
            velocities: Array2::zeros((0, dimension)),
            densities: Array1::zeros(0),
            volumes: Array1::zeros(0),
            kinds: Vec::new(),
            extra: BTreeMap::new(),
        })
    }

    /// Create a particle set containing all the given `particles`
    pub fn from_particles(dimension: usize, particles: &[Particle]) -> Result<ParticleSet, Error> {
        let mut set = ParticleSet::new(dimension)?;
        for particle in particles {
            set.push(particle)?;
        }
        return Ok(set);
    }

    /// Add a particle at the end of this set
    pub fn push(&mut self, particle: &Particle) -> Result<(), Error> {
        if !self.extra.is_empty() {
            return Err(Error::InvalidParameter(
                "can not add particles to a set with extra properties".into()
            ));
        }

        let dimension = self.dimension();
        for i in dimension..3 {
            if particle.position[i] != 0.0 || particle.velocity[i] != 0.0 {
                return Err(Error::ShapeMismatch(format!(
                    "particle has a non-zero component along dimension {} in a {}-dimensional set",
                    i, dimension
                )));
            }
        }

        let position = &particle.position.as_array()[..dimension];
        let velocity = &particle.velocity.as_array()[..dimension];
        self.positions.push_row(ArrayView1::from(position))?;
        self.velocities.push_row(ArrayView1::from(velocity))?;
        self.densities.append(Axis(0), ArrayView1::from(std::slice::from_ref(&particle.density)))?;
        self.volumes.append(Axis(0), ArrayView1::from(std::slice::from_ref(&particle.volume)))?;
        self.kinds.push(particle.kind);

        return Ok(());
    }

    /// Number of spatial dimensions
    pub fn dimension(&self) -> usize {
        self.positions.ncols()
    }

    /// Number of particles in this set
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Is this set empty?
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Get the particle at index `i`
    pub fn get(&self, i: usize) -> Option<Particle> {
        if i >= self.len() {
            return None;
        }

        Some(Particle {
            position: Vector3D::from_row(self.positions.row(i)),
            velocity: Vector3D::from_row(self.velocities.row(i)),
            density: self.densities[i],
            volume: self.volumes[i],
            kind: self.kinds[i],
        })
    }

    /// Positions of all particles, as a `N x D` array
    pub fn positions(&self) -> ArrayView2<'_, f64> {
        self.positions.view()
    }

    /// Velocities of all particles, as a `N x D` array
    pub fn velocities(&self) -> ArrayView2<'_, f64> {
        self.velocities.view()
    }

    /// Densities of all particles
    pub fn densities(&self) -> ArrayView1<'_, f64> {
        self.densities.view()
    }

    /// Volumes of all particles
    pub fn volumes(&self) -> ArrayView1<'_, f64> {
        self.volumes.view()
    }

    /// Type labels of all particles
    pub fn kinds(&self) -> &[i32] {
        &self.kinds
    }

    /// Store an additional per-particle property with the given `name`. The
    /// `values` must contain one row per particle.
    pub fn add_extra(&mut self, name: impl Into<String>, values: Array2<f64>) -> Result<(), Error> {
        let name = name.into();
        if values.nrows() != self.len() {
            return Err(Error::ShapeMismatch(format!(
                "extra property '{}' has {} rows, but there are {} particles",
                name, values.nrows(), self.len()
            )));
        }
        self.extra.insert(name, values);
        Ok(())
    }

    /// Get the additional property with the given `name`, if it exists
    pub fn extra(&self, name: &str) -> Option<ArrayView2<'_, f64>> {
        self.extra.get(name).map(|values| values.view())
    }

    /// Get the names of all additional properties
    pub fn extra_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.extra.keys().map(|name| name.as_str())
    }
}

/// Particles of a single simulation frame inside a simulation box.
///
/// The snapshot keeps the periodic neighbor list of the particles (including
/// self pairs), and re-uses it as long as the same cutoff is requested.
#[derive(Debug, Clone)]
pub struct Snapshot {
    domain: SimulationBox,
    particles: ParticleSet,
    neighbors: Option<NeighborList>,
}

impl Snapshot {
    /// Create a new snapshot. All particles must be inside the box.
    pub fn new(domain: SimulationBox, particles: ParticleSet) -> Result<Snapshot, Error> {
        domain.check_inside(particles.positions())?;
        Ok(Snapshot {
            domain: domain,
            particles: particles,
            neighbors: None,
        })
    }

    /// Create a new snapshot, wrapping all particles inside the box along
    /// periodic dimensions first.
    pub fn wrapped(domain: SimulationBox, mut particles: ParticleSet) -> Result<Snapshot, Error> {
        particles.positions = domain.incell(particles.positions())?;
        return Snapshot::new(domain, particles);
    }

    /// Get the simulation box of this snapshot
    pub fn domain(&self) -> &SimulationBox {
        &self.domain
    }

    /// Get the particles of this snapshot
    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    fn compute_neighbors(&mut self, cutoff: f64) -> Result<(), Error> {
        // re-use the existing neighbor list if possible
        if let Some(ref neighbors) = self.neighbors {
            if neighbors.cutoff() == cutoff {
                return Ok(());
            }
        }

        let mut options = NeighborListOptions::new(cutoff);
        options.self_pairs = true;
        self.neighbors = Some(NeighborList::periodic(&self.domain, self.particles.positions(), options)?);
        Ok(())
    }

    /// Get the periodic neighbor list of the particles for the given
    /// `cutoff`, including self pairs.
    pub fn neighbors(&mut self, cutoff: f64) -> Result<&NeighborList, Error> {
        self.compute_neighbors(cutoff)?;
        return self.cached_neighbors();
    }

    /// SPH estimate of the density of each particle, `ρ_i = Σ_j ρ_j V_j
    /// W(r_ij)`, including the particle's own contribution.
    pub fn density(&mut self, kernel: &Kernel) -> Result<Array1<f64>, Error> {
        self.compute_neighbors(kernel.smoothing_length())?;
        let neighbors = self.cached_neighbors()?;

        let interpolator = FieldInterpolator::new(*kernel, InterpolationOptions::default());
        return interpolator.interpolate_scalar(neighbors, self.particles.densities(), self.particles.volumes());
    }

    fn cached_neighbors(&self) -> Result<&NeighborList, Error> {
        self.neighbors.as_ref().ok_or_else(|| Error::Internal(
            "neighbor list is not initialized".into()
        ))
    }

    /// Interpolate the velocity field at the `queries` points (which must be
    /// inside the box), using Shepard normalization. Query points without
    /// particles within the kernel support get NaN velocities.
    pub fn velocity_field(&self, queries: ArrayView2<f64>, kernel: &Kernel) -> Result<Array2<f64>, Error> {
        let options = NeighborListOptions::new(kernel.smoothing_length());
        let neighbors = NeighborList::periodic_cross(&self.domain, queries, self.particles.positions(), options)?;

        let options = InterpolationOptions { normalization: Normalization::Shepard };
        let interpolator = FieldInterpolator::new(*kernel, options);
        return interpolator.interpolate(&neighbors, self.particles.velocities(), self.particles.volumes());
    }

    /// Compute the Landshoff viscous forces and virial stress of all
    /// particles
    pub fn viscous_forces(&mut self, kernel: &Kernel, parameters: &LandshoffParameters) -> Result<ViscousForces, Error> {
        self.compute_neighbors(kernel.smoothing_length())?;
        let neighbors = self.cached_neighbors()?;

        return landshoff_forces(
            neighbors,
            kernel,
            self.particles.velocities(),
            self.particles.volumes(),
            parameters,
        );
    }

    /// Interpolate the viscous virial stress of the particles at the
    /// `queries` points (which must be inside the box), using Shepard
    /// normalization. The result has shape `n_queries x D x D`.
    pub fn stress_field(
        &mut self,
        queries: ArrayView2<f64>,
        kernel: &Kernel,
        parameters: &LandshoffParameters,
    ) -> Result<Array3<f64>, Error> {
        let viscous = self.viscous_forces(kernel, parameters)?;

        let options = NeighborListOptions::new(kernel.smoothing_length());
        let neighbors = NeighborList::periodic_cross(&self.domain, queries, self.particles.positions(), options)?;

        let options = InterpolationOptions { normalization: Normalization::Shepard };
        let interpolator = FieldInterpolator::new(*kernel, options);
        return interpolator.interpolate_tensors(&neighbors, viscous.stress.view(), self.particles.volumes());
    }
}
