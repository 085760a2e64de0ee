use ndarray::{Array2, Array3, ArrayView1, ArrayView2};
use rayon::prelude::*;

use crate::{Error, Kernel, NeighborList, Vector3D};

fn default_epsilon() -> f64 {
    0.01
}

/// Parameters of the Landshoff artificial viscosity
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LandshoffParameters {
    /// speed of sound `c0` in the fluid
    pub sound_speed: f64,
    /// reference density `ρ` of the fluid
    pub density: f64,
    /// linear viscosity coefficient `q1`
    pub q1: f64,
    /// smoothing length `h` of the SPH kernel
    pub smoothing_length: f64,
    /// regularization of the viscous term for close particles, the
    /// denominator is `r^2 + ε h^2`
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// only apply the viscous force to particles approaching each other
    #[serde(default)]
    pub repulsion_only: bool,
}

impl LandshoffParameters {
    pub fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("sound_speed", self.sound_speed),
            ("density", self.density),
            ("smoothing_length", self.smoothing_length),
            ("epsilon", self.epsilon),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(Error::InvalidParameter(format!(
                    "expected positive {} for Landshoff viscosity, got {}", name, value
                )));
            }
        }

        if !(self.q1 >= 0.0 && self.q1.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "expected positive q1 for Landshoff viscosity, got {}", self.q1
            )));
        }

        return Ok(());
    }

    /// Create parameters from their JSON representation
    pub fn from_json(json: &str) -> Result<LandshoffParameters, Error> {
        let parameters: LandshoffParameters = serde_json::from_str(json)?;
        parameters.validate()?;
        return Ok(parameters);
    }

    /// Viscous pressure term `Π` for a pair with separation `r` and
    /// `v_ij · r_ij = velocity_dot_vector`
    fn pi(&self, velocity_dot_vector: f64, r: f64) -> f64 {
        let h = self.smoothing_length;
        -self.q1 * self.sound_speed * h * self.density * velocity_dot_vector
            / (r * r + self.epsilon * h * h)
    }
}

/// Result of [`landshoff_forces`]
#[derive(Debug, Clone)]
pub struct ViscousForces {
    /// net viscous force on each particle, as a `N x D` array
    pub forces: Array2<f64>,
    /// virial stress of each particle, as a `N x D x D` array
    pub stress: Array3<f64>,
}

/// Compute the Landshoff viscous forces between particles, and the
/// corresponding virial stress.
///
/// `neighbors` must be a self neighbor list over the particle positions
/// (self pairs are ignored), `velocities` contains the velocity of each
/// particle and `volumes` their volume. For each pair `i-j` with `r_ij = x_i -
/// x_j` and `v_ij = v_i - v_j`, the force on particle `i` is
///
/// `F_ij = - V_i V_j Π_ij W'(r) r_ij / r` with `Π_ij = - q1 c0 h ρ (v_ij · r_ij) / (r^2 + ε h^2)`
///
/// and the virial stress of particle `i` accumulates `r_ij ⊗ F_ij / V_i`.
/// When `repulsion_only` is set, only approaching pairs (`v_ij · r_ij < 0`)
/// contribute.
#[time_graph::instrument(name = "landshoff_forces")]
pub fn landshoff_forces(
    neighbors: &NeighborList,
    kernel: &Kernel,
    velocities: ArrayView2<f64>,
    volumes: ArrayView1<f64>,
    parameters: &LandshoffParameters,
) -> Result<ViscousForces, Error> {
    parameters.validate()?;

    if !neighbors.is_self_search() {
        return Err(Error::InvalidParameter(
            "Landshoff viscosity requires a self neighbor list".into()
        ));
    }

    let n_particles = neighbors.n_query();
    let dimension = neighbors.query_positions().ncols();
    if velocities.dim() != (n_particles, dimension) {
        return Err(Error::ShapeMismatch(format!(
            "expected velocities with shape ({}, {}), got {:?}",
            n_particles, dimension, velocities.shape()
        )));
    }

    if volumes.len() != n_particles {
        return Err(Error::ShapeMismatch(format!(
            "expected {} volumes, got {}", n_particles, volumes.len()
        )));
    }

    if kernel.dimension() != dimension {
        return Err(Error::ShapeMismatch(format!(
            "the kernel is {}-dimensional, but the particles are {}-dimensional",
            kernel.dimension(), dimension
        )));
    }

    let h = parameters.smoothing_length;
    if (kernel.smoothing_length() - h).abs() > 1e-12 * h {
        return Err(Error::InvalidParameter(format!(
            "the kernel smoothing length ({}) does not match the Landshoff viscosity smoothing length ({})",
            kernel.smoothing_length(), h
        )));
    }

    let per_particle = (0..n_particles).into_par_iter().map(|i| {
        let mut force = Vector3D::zero();
        let mut stress = [[0.0; 3]; 3];

        let velocity_i = Vector3D::from_row(velocities.row(i));
        for pair in neighbors.pairs(i) {
            let r = pair.distance;
            if r == 0.0 {
                continue;
            }

            let j = pair.second;
            let r_ij = -pair.vector;
            let v_ij = velocity_i - Vector3D::from_row(velocities.row(j));

            let velocity_dot_vector = v_ij * r_ij;
            if parameters.repulsion_only && velocity_dot_vector >= 0.0 {
                continue;
            }

            let pi = parameters.pi(velocity_dot_vector, r);
            let f_ij = (-volumes[i] * volumes[j] * pi * kernel.derivative(r) / r) * r_ij;
            force += f_ij;

            let virial = r_ij.tensor_product(&f_ij);
            for a in 0..3 {
                for b in 0..3 {
                    stress[a][b] += virial[a][b] / volumes[i];
                }
            }
        }

        (force, stress)
    }).collect::<Vec<_>>();

    let mut forces = Array2::zeros((n_particles, dimension));
    let mut stress = Array3::zeros((n_particles, dimension, dimension));
    for (i, (force, virial)) in per_particle.into_iter().enumerate() {
        for a in 0..dimension {
            forces[[i, a]] = force[a];
            for b in 0..dimension {
                stress[[i, a, b]] = virial[a][b];
            }
        }
    }

    return Ok(ViscousForces {
        forces: forces,
        stress: stress,
    });
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::array;

    use crate::{KernelKind, NeighborListOptions};
    use super::*;

    fn parameters() -> LandshoffParameters {
        LandshoffParameters {
            sound_speed: 10.0,
            density: 1000.0,
            q1: 1.0,
            smoothing_length: 1.0,
            epsilon: 0.01,
            repulsion_only: false,
        }
    }

    fn setup() -> (NeighborList, Kernel) {
        let positions = array![[0.0, 0.0], [0.5, 0.0], [5.0, 5.0]];
        let mut options = NeighborListOptions::new(1.0);
        options.self_pairs = true;
        let neighbors = NeighborList::new(positions.view(), options).unwrap();
        let kernel = Kernel::new(KernelKind::Lucy, 1.0, 2).unwrap();
        return (neighbors, kernel);
    }

    #[test]
    fn approaching_pair() {
        let (neighbors, kernel) = setup();
        let velocities = array![[1.0, 0.0], [-1.0, 0.0], [3.0, 3.0]];
        let volumes = array![0.1, 0.2, 0.3];
        let parameters = parameters();

        let result = landshoff_forces(&neighbors, &kernel, velocities.view(), volumes.view(), &parameters).unwrap();

        // v_ij . r_ij = (2, 0) . (-0.5, 0) = -1
        let pi = -1.0 * 10.0 * 1.0 * 1000.0 * -1.0 / (0.25 + 0.01);
        let expected = -0.1 * 0.2 * pi * kernel.derivative(0.5) / 0.5 * -0.5;
        assert_relative_eq!(result.forces[[0, 0]], expected, max_relative = 1e-12);
        assert_eq!(result.forces[[0, 1]], 0.0);

        // the viscous force is repulsive and conserves momentum
        assert!(result.forces[[0, 0]] < 0.0);
        assert_relative_eq!(result.forces[[1, 0]], -result.forces[[0, 0]], max_relative = 1e-12);
        assert_eq!(result.forces.row(2), array![0.0, 0.0]);

        assert_eq!(result.stress.dim(), (3, 2, 2));
        assert_relative_eq!(result.stress[[0, 0, 0]], -0.5 * expected / 0.1, max_relative = 1e-12);
        assert_relative_eq!(result.stress[[1, 0, 0]], -0.5 * expected / 0.2, max_relative = 1e-12);
        assert_eq!(result.stress[[0, 0, 1]], 0.0);
        assert_eq!(result.stress[[0, 1, 1]], 0.0);
        assert!(result.stress[[0, 0, 0]] > 0.0);
    }

    #[test]
    fn repulsion_only() {
        let (neighbors, kernel) = setup();
        // particles moving away from each other
        let velocities = array![[-1.0, 0.0], [1.0, 0.0], [0.0, 0.0]];
        let volumes = array![0.1, 0.2, 0.3];

        let mut parameters = parameters();
        let result = landshoff_forces(&neighbors, &kernel, velocities.view(), volumes.view(), &parameters).unwrap();
        // the force now slows down the separation
        assert!(result.forces[[0, 0]] > 0.0);

        parameters.repulsion_only = true;
        let result = landshoff_forces(&neighbors, &kernel, velocities.view(), volumes.view(), &parameters).unwrap();
        assert!(result.forces.iter().all(|&f| f == 0.0));
        assert!(result.stress.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn invalid_inputs() {
        let (neighbors, kernel) = setup();
        let volumes = array![0.1, 0.2, 0.3];

        let velocities = array![[1.0, 0.0], [-1.0, 0.0]];
        let error = landshoff_forces(&neighbors, &kernel, velocities.view(), volumes.view(), &parameters()).unwrap_err();
        assert!(matches!(error, Error::ShapeMismatch(_)));

        let velocities = Array2::zeros((3, 2));
        let mut parameters = parameters();
        parameters.density = -1.0;
        let error = landshoff_forces(&neighbors, &kernel, velocities.view(), volumes.view(), &parameters).unwrap_err();
        assert_eq!(error.to_string(), "invalid parameter: expected positive density for Landshoff viscosity, got -1");

        let mut parameters = self::parameters();
        parameters.smoothing_length = 0.5;
        let error = landshoff_forces(&neighbors, &kernel, velocities.view(), volumes.view(), &parameters).unwrap_err();
        assert_eq!(
            error.to_string(),
            "invalid parameter: the kernel smoothing length (1) does not match the Landshoff viscosity smoothing length (0.5)"
        );

        let parameters = LandshoffParameters::from_json(r#"{
            "sound_speed": 1.0, "density": 2.0, "q1": 0.5, "smoothing_length": 0.1
        }"#).unwrap();
        assert_eq!(parameters.epsilon, 0.01);
        assert!(!parameters.repulsion_only);
    }
}
