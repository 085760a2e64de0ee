use ndarray::{Array2, ArrayView2};

use crate::{Error, NeighborList, NeighborListOptions, SimulationBox, Vector3D};

fn default_poisson_ratio() -> f64 {
    0.5
}

/// Parameters of the Hertz elastic contact between two sets of spheres
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct HertzParameters {
    /// radius of the spheres in the first set
    pub radius_a: f64,
    /// radius of the spheres in the second set
    pub radius_b: f64,
    /// Young's modulus of the spheres in the first set
    pub modulus_a: f64,
    /// Young's modulus of the spheres in the second set
    pub modulus_b: f64,
    /// Poisson's ratio, the same for both sets
    #[serde(default = "default_poisson_ratio")]
    pub poisson_ratio: f64,
}

impl HertzParameters {
    pub fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("radius_a", self.radius_a),
            ("radius_b", self.radius_b),
            ("modulus_a", self.modulus_a),
            ("modulus_b", self.modulus_b),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(Error::InvalidParameter(format!(
                    "expected positive {} for Hertz contact, got {}", name, value
                )));
            }
        }

        if !(self.poisson_ratio > -1.0 && self.poisson_ratio <= 0.5) {
            return Err(Error::InvalidParameter(format!(
                "expected Poisson's ratio between -1 and 0.5 for Hertz contact, got {}",
                self.poisson_ratio
            )));
        }

        return Ok(());
    }

    /// Create parameters from their JSON representation
    pub fn from_json(json: &str) -> Result<HertzParameters, Error> {
        let parameters: HertzParameters = serde_json::from_str(json)?;
        parameters.validate()?;
        return Ok(parameters);
    }

    /// Effective modulus `E*`, with `1/E* = (1 - ν²)/E_a + (1 - ν²)/E_b`
    pub fn effective_modulus(&self) -> f64 {
        let factor = 1.0 - self.poisson_ratio * self.poisson_ratio;
        1.0 / (factor / self.modulus_a + factor / self.modulus_b)
    }

    /// Effective radius `R = R_a R_b / (R_a + R_b)`
    pub fn effective_radius(&self) -> f64 {
        self.radius_a * self.radius_b / (self.radius_a + self.radius_b)
    }

    /// Distance between centers below which two spheres are in contact
    pub fn contact_distance(&self) -> f64 {
        self.radius_a + self.radius_b
    }

    /// Magnitude of the Hertz force for a given `overlap`:
    /// `F = 4/3 E* sqrt(R) overlap^3/2`
    pub fn force(&self, overlap: f64) -> f64 {
        if overlap <= 0.0 {
            return 0.0;
        }
        4.0 / 3.0 * self.effective_modulus() * f64::sqrt(self.effective_radius()) * overlap.powf(1.5)
    }
}

/// A single contact between two spheres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// index of the sphere in the first set
    pub first: usize,
    /// index of the sphere in the second set
    pub second: usize,
    /// overlap between the spheres, `R_a + R_b - distance`
    pub overlap: f64,
    /// magnitude of the repulsive force
    pub magnitude: f64,
    /// unit vector pointing from the center of the second sphere to the
    /// center of the first one, i.e. the direction of the force acting on the
    /// first sphere. This is zero if both centers are at the same position.
    pub direction: Vector3D,
}

/// Result of [`hertz_contacts`]
#[derive(Debug, Clone)]
pub struct HertzForces {
    /// all the contacts, sorted by first then second index
    pub contacts: Vec<Contact>,
    /// net force acting on each sphere of the first set, as a `N_a x D` array
    pub forces_a: Array2<f64>,
    /// net force acting on each sphere of the second set, as a `N_b x D` array
    pub forces_b: Array2<f64>,
}

/// Compute the Hertz contact forces between the spheres centered on `a` and
/// the spheres centered on `b`.
///
/// If `domain` is given, contacts across the periodic boundaries of the box
/// are also detected, and all centers must be inside the box.
#[time_graph::instrument(name = "hertz_contacts")]
pub fn hertz_contacts(
    domain: Option<&SimulationBox>,
    a: ArrayView2<f64>,
    b: ArrayView2<f64>,
    parameters: &HertzParameters,
) -> Result<HertzForces, Error> {
    parameters.validate()?;

    let options = NeighborListOptions::new(parameters.contact_distance());
    let neighbors = match domain {
        Some(domain) => NeighborList::periodic_cross(domain, a, b, options)?,
        None => NeighborList::cross(a, b, options)?,
    };

    let dimension = a.ncols();
    let mut forces_a = Array2::zeros((a.nrows(), dimension));
    let mut forces_b = Array2::zeros((b.nrows(), dimension));

    let mut contacts = Vec::new();
    for pair in neighbors.iter() {
        let overlap = parameters.contact_distance() - pair.distance;
        let magnitude = parameters.force(overlap);

        let direction = if pair.distance > 0.0 {
            -pair.vector / pair.distance
        } else {
            Vector3D::zero()
        };

        let force = magnitude * direction;
        for i in 0..dimension {
            forces_a[[pair.first, i]] += force[i];
            forces_b[[pair.second, i]] -= force[i];
        }

        contacts.push(Contact {
            first: pair.first,
            second: pair.second,
            overlap: overlap,
            magnitude: magnitude,
            direction: direction,
        });
    }

    return Ok(HertzForces {
        contacts: contacts,
        forces_a: forces_a,
        forces_b: forces_b,
    });
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::array;

    use super::*;

    fn parameters() -> HertzParameters {
        HertzParameters {
            radius_a: 1.0,
            radius_b: 1.0,
            modulus_a: 1.0,
            modulus_b: 1.0,
            poisson_ratio: 0.5,
        }
    }

    #[test]
    fn effective_values() {
        let parameters = parameters();
        assert_relative_eq!(parameters.effective_modulus(), 2.0 / 3.0, max_relative = 1e-15);
        assert_relative_eq!(parameters.effective_radius(), 0.5);
        assert_eq!(parameters.force(-0.1), 0.0);
        assert_relative_eq!(
            parameters.force(0.1),
            4.0 / 3.0 * 2.0 / 3.0 * f64::sqrt(0.5) * f64::powf(0.1, 1.5),
            max_relative = 1e-12
        );
    }

    #[test]
    fn direct_contact() {
        let a = array![[0.0, 0.0], [10.0, 0.0]];
        let b = array![[1.9, 0.0], [0.0, 5.0]];

        let result = hertz_contacts(None, a.view(), b.view(), &parameters()).unwrap();
        assert_eq!(result.contacts.len(), 1);

        let contact = result.contacts[0];
        assert_eq!((contact.first, contact.second), (0, 0));
        assert_relative_eq!(contact.overlap, 0.1, epsilon = 1e-12);
        assert_relative_eq!(contact.magnitude, parameters().force(contact.overlap));
        assert_relative_eq!(contact.direction, Vector3D::new(-1.0, 0.0, 0.0), epsilon = 1e-12);

        assert_relative_eq!(result.forces_a[[0, 0]], -contact.magnitude, epsilon = 1e-12);
        assert_relative_eq!(result.forces_b[[0, 0]], contact.magnitude, epsilon = 1e-12);
        assert_eq!(result.forces_a.row(1), array![0.0, 0.0]);
        assert_eq!(result.forces_b.row(1), array![0.0, 0.0]);
    }

    #[test]
    fn separated_rows() {
        let parameters = HertzParameters {
            radius_a: 0.5,
            radius_b: 0.5,
            modulus_a: 1.0,
            modulus_b: 1.0,
            poisson_ratio: 0.5,
        };

        // two rows of spheres, each sphere overlapping with the one facing it
        let a = Array2::from_shape_fn((80, 2), |(i, j)| if j == 0 { 2.0 * i as f64 } else { 0.0 });
        let b = Array2::from_shape_fn((80, 2), |(i, j)| if j == 0 { 2.0 * i as f64 } else { 0.8 });

        let result = hertz_contacts(None, a.view(), b.view(), &parameters).unwrap();
        assert_eq!(result.contacts.len(), 80);
        for (i, contact) in result.contacts.iter().enumerate() {
            assert_eq!((contact.first, contact.second), (i, i));
            assert_relative_eq!(contact.overlap, 0.2, epsilon = 1e-12);
            assert_relative_eq!(contact.direction, Vector3D::new(0.0, -1.0, 0.0), epsilon = 1e-12);
        }
    }

    #[test]
    fn across_periodic_boundary() {
        let domain = SimulationBox::new(&[0.0, 0.0], &[10.0, 10.0], &[true, false]).unwrap();
        let a = array![[0.5, 5.0]];
        let b = array![[9.0, 5.0]];

        let without_wrap = hertz_contacts(None, a.view(), b.view(), &parameters()).unwrap();
        assert!(without_wrap.contacts.is_empty());

        let result = hertz_contacts(Some(&domain), a.view(), b.view(), &parameters()).unwrap();
        assert_eq!(result.contacts.len(), 1);

        let contact = result.contacts[0];
        assert_relative_eq!(contact.overlap, 0.5, epsilon = 1e-12);
        // b is on the left of a through the boundary, pushing a to the right
        assert_relative_eq!(contact.direction, Vector3D::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert!(result.forces_a[[0, 0]] > 0.0);
        assert_relative_eq!(result.forces_a[[0, 0]], -result.forces_b[[0, 0]]);
    }

    #[test]
    fn invalid_parameters() {
        let mut parameters = parameters();
        parameters.radius_b = 0.0;
        assert!(parameters.validate().is_err());

        let parameters = HertzParameters::from_json(r#"{
            "radius_a": 1.0, "radius_b": 2.0, "modulus_a": 3.0, "modulus_b": 4.0
        }"#).unwrap();
        assert_eq!(parameters.poisson_ratio, 0.5);

        let error = HertzParameters::from_json(r#"{
            "radius_a": 1.0, "radius_b": 2.0, "modulus_a": 3.0, "modulus_b": 4.0,
            "poisson_ratio": 0.7
        }"#).unwrap_err();
        assert!(matches!(error, Error::InvalidParameter(_)));
    }
}
