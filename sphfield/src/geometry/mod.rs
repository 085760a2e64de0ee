//! The `SimulationBox` type represents the axis-aligned domain of a particle
//! snapshot, with periodic boundary conditions along some of its dimensions.
use ndarray::{Array2, ArrayView2};

use crate::{Error, Vector3D};

mod images;
pub use self::images::{Images, ImageKind, ImageCutoff, Side};

mod reunify;
pub use self::reunify::{Reunification, MAX_REUNIFY_PASSES};

/// An axis-aligned simulation box in 2 or 3 dimensions.
///
/// Each dimension has a lower bound `lo`, an upper bound `hi` and a flag
/// indicating if periodic boundary conditions apply along this dimension. The
/// box is only a description of the domain, periodicity is never inferred
/// from the data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationBox {
    lo: [f64; 3],
    hi: [f64; 3],
    periodic: [bool; 3],
    dimension: usize,
}

impl SimulationBox {
    /// Create a new box with the given bounds and periodicity. All three
    /// slices must have the same length, either 2 or 3.
    pub fn new(lo: &[f64], hi: &[f64], periodic: &[bool]) -> Result<SimulationBox, Error> {
        let dimension = lo.len();
        if dimension != 2 && dimension != 3 {
            return Err(Error::InvalidParameter(format!(
                "simulation box must be 2 or 3 dimensional, got {} dimensions", dimension
            )));
        }

        if hi.len() != dimension || periodic.len() != dimension {
            return Err(Error::ShapeMismatch(format!(
                "box bounds and periodicity must have the same size, got lo={}, hi={} and periodic={}",
                lo.len(), hi.len(), periodic.len()
            )));
        }

        let mut domain = SimulationBox {
            lo: [0.0; 3],
            hi: [0.0; 3],
            periodic: [false; 3],
            dimension: dimension,
        };

        for i in 0..dimension {
            if !(lo[i].is_finite() && hi[i].is_finite()) || hi[i] <= lo[i] {
                return Err(Error::InvalidParameter(format!(
                    "invalid box bounds along dimension {}: [{}, {}]", i, lo[i], hi[i]
                )));
            }
            domain.lo[i] = lo[i];
            domain.hi[i] = hi[i];
            domain.periodic[i] = periodic[i];
        }

        return Ok(domain);
    }

    /// Create a 2D box `[0, length] x [0, length]`
    pub fn square(length: f64, periodic: bool) -> SimulationBox {
        assert!(length > 0.0, "Box lengths must be positive");
        SimulationBox {
            lo: [0.0; 3],
            hi: [length, length, 0.0],
            periodic: [periodic, periodic, false],
            dimension: 2,
        }
    }

    /// Create a 3D box `[0, length]^3`
    pub fn cubic(length: f64, periodic: bool) -> SimulationBox {
        assert!(length > 0.0, "Box lengths must be positive");
        SimulationBox {
            lo: [0.0; 3],
            hi: [length; 3],
            periodic: [periodic; 3],
            dimension: 3,
        }
    }

    /// Get the number of dimensions of this box (2 or 3)
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Get the lower bounds of the box
    pub fn lo(&self) -> &[f64] {
        &self.lo[..self.dimension]
    }

    /// Get the upper bounds of the box
    pub fn hi(&self) -> &[f64] {
        &self.hi[..self.dimension]
    }

    /// Get the periodicity flags of the box
    pub fn periodic(&self) -> &[bool] {
        &self.periodic[..self.dimension]
    }

    /// Is the box periodic along the given `dimension`?
    pub fn is_periodic(&self, dimension: usize) -> bool {
        self.periodic[dimension]
    }

    /// Is the box periodic along all of its dimensions?
    pub fn all_periodic(&self) -> bool {
        self.periodic().iter().all(|&p| p)
    }

    /// Get the length of the box along the given `dimension`
    pub fn length(&self, dimension: usize) -> f64 {
        self.hi[dimension] - self.lo[dimension]
    }

    /// Get the length of the box along all dimensions, as a `Vector3D` with a
    /// zero third component for 2D boxes.
    pub fn lengths(&self) -> Vector3D {
        let mut lengths = Vector3D::zero();
        for i in 0..self.dimension {
            lengths[i] = self.length(i);
        }
        return lengths;
    }

    /// Get the lengths of the box along periodic dimensions, and zero along
    /// non-periodic ones. This is the displacement applied by a unit cell
    /// shift.
    pub(crate) fn periodic_lengths(&self) -> [f64; 3] {
        let mut lengths = [0.0; 3];
        for i in 0..self.dimension {
            if self.periodic[i] {
                lengths[i] = self.length(i);
            }
        }
        return lengths;
    }

    /// Get the volume (area in 2D) of the box
    pub fn volume(&self) -> f64 {
        (0..self.dimension).map(|i| self.length(i)).product()
    }

    /// Check if the given point is inside the box bounds (inclusive) on every
    /// dimension
    pub fn contains(&self, point: &[f64]) -> bool {
        point.iter().enumerate().all(|(i, &x)| x >= self.lo[i] && x <= self.hi[i])
    }

    /// Check that `points` is a `N x D` array matching the box dimension
    pub(crate) fn check_dimension(&self, points: &ArrayView2<f64>, name: &str) -> Result<(), Error> {
        if points.ncols() != self.dimension {
            return Err(Error::ShapeMismatch(format!(
                "{} must have {} columns to match the box dimension, got {}",
                name, self.dimension, points.ncols()
            )));
        }
        Ok(())
    }

    /// Check that all `points` are inside the box bounds (inclusive) on
    /// every dimension, periodic or not.
    pub fn check_inside(&self, points: ArrayView2<f64>) -> Result<(), Error> {
        self.check_dimension(&points, "points")?;
        for (point, row) in points.outer_iter().enumerate() {
            for (dimension, &value) in row.iter().enumerate() {
                if !(value >= self.lo[dimension] && value <= self.hi[dimension]) {
                    return Err(Error::OutsideBox { point, dimension, value });
                }
            }
        }
        Ok(())
    }
}

/// Geometric operations using periodic boundary conditions
impl SimulationBox {
    /// Wrap a single point inside the box along periodic dimensions. Points
    /// already inside `[lo, hi)` are left untouched, which makes this function
    /// idempotent.
    pub fn wrap_point(&self, point: &mut [f64]) {
        debug_assert_eq!(point.len(), self.dimension);
        for (i, x) in point.iter_mut().enumerate() {
            if !self.periodic[i] {
                continue;
            }

            let (lo, hi) = (self.lo[i], self.hi[i]);
            if *x >= lo && *x < hi {
                continue;
            }

            let mut wrapped = lo + f64::rem_euclid(*x - lo, hi - lo);
            if wrapped >= hi {
                // rounding can push values just below `lo` onto `hi`
                wrapped = lo;
            }
            *x = wrapped;
        }
    }

    /// Map all `points` into the primary cell along periodic dimensions. For
    /// every periodic dimension `i`, the result is `((x - lo) mod L) + lo`;
    /// non-periodic dimensions pass through unchanged.
    pub fn incell(&self, points: ArrayView2<f64>) -> Result<Array2<f64>, Error> {
        self.check_dimension(&points, "points")?;

        let mut wrapped = points.to_owned();
        for mut row in wrapped.outer_iter_mut() {
            let mut point = [0.0; 3];
            for (p, &x) in point.iter_mut().zip(row.iter()) {
                *p = x;
            }
            self.wrap_point(&mut point[..self.dimension]);
            for (x, &p) in row.iter_mut().zip(point.iter()) {
                *x = p;
            }
        }

        return Ok(wrapped);
    }

    /// Find the minimal image of a separation `vector` along periodic
    /// dimensions. For a periodic box of side length `L`, this produces
    /// components in `[-L/2, L/2]`.
    pub fn vector_image(&self, vector: &mut Vector3D) {
        for i in 0..self.dimension {
            if self.periodic[i] {
                let length = self.length(i);
                vector[i] -= f64::round(vector[i] / length) * length;
            }
        }
    }

    /// Periodic boundary conditions squared distance between the point `u` and
    /// the point `v`
    pub fn distance2(&self, u: Vector3D, v: Vector3D) -> f64 {
        let mut d = v - u;
        self.vector_image(&mut d);
        return d.norm2();
    }

    /// Periodic boundary conditions distance between the point `u` and the
    /// point `v`
    pub fn distance(&self, u: Vector3D, v: Vector3D) -> f64 {
        return f64::sqrt(self.distance2(u, v));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    #[should_panic(expected = "Box lengths must be positive")]
    fn negative_square() {
        let _ = SimulationBox::square(-4.0, true);
    }

    #[test]
    fn invalid_boxes() {
        let error = SimulationBox::new(&[0.0], &[1.0], &[true]).unwrap_err();
        assert_eq!(error.to_string(), "invalid parameter: simulation box must be 2 or 3 dimensional, got 1 dimensions");

        let error = SimulationBox::new(&[0.0, 0.0], &[1.0, 1.0, 1.0], &[true, true]).unwrap_err();
        assert!(matches!(error, Error::ShapeMismatch(_)));

        let error = SimulationBox::new(&[0.0, 2.0], &[1.0, 1.0], &[true, true]).unwrap_err();
        assert_eq!(error.to_string(), "invalid parameter: invalid box bounds along dimension 1: [2, 1]");
    }

    #[test]
    fn properties() {
        let domain = SimulationBox::new(&[-1.0, 0.0, 2.0], &[1.0, 3.0, 7.0], &[true, false, true]).unwrap();
        assert_eq!(domain.dimension(), 3);
        assert_eq!(domain.lo(), &[-1.0, 0.0, 2.0]);
        assert_eq!(domain.hi(), &[1.0, 3.0, 7.0]);
        assert_eq!(domain.periodic(), &[true, false, true]);
        assert!(!domain.all_periodic());
        assert_eq!(domain.lengths(), Vector3D::new(2.0, 3.0, 5.0));
        assert_eq!(domain.periodic_lengths(), [2.0, 0.0, 5.0]);
        assert_eq!(domain.volume(), 30.0);

        assert!(domain.contains(&[1.0, 0.0, 2.0]));
        assert!(!domain.contains(&[1.5, 0.0, 2.0]));

        let square = SimulationBox::square(2.0, true);
        assert_eq!(square.dimension(), 2);
        assert!(square.all_periodic());
        assert_eq!(square.volume(), 4.0);
    }

    #[test]
    fn incell() {
        let domain = SimulationBox::new(&[-1.0, 0.0], &[1.0, 3.0], &[true, false]).unwrap();
        let points = array![
            [0.5, 0.5],
            [1.5, 4.0],
            [-3.5, -1.0],
            [1.0, 2.0],
        ];

        let wrapped = domain.incell(points.view()).unwrap();
        assert_eq!(wrapped, array![
            [0.5, 0.5],
            [-0.5, 4.0],
            [0.5, -1.0],
            [-1.0, 2.0],
        ]);

        // wrapping is idempotent
        assert_eq!(domain.incell(wrapped.view()).unwrap(), wrapped);

        let error = domain.incell(array![[0.0, 0.0, 0.0]].view()).unwrap_err();
        assert!(matches!(error, Error::ShapeMismatch(_)));
    }

    #[test]
    fn incell_rounding() {
        let domain = SimulationBox::square(1.0, true);
        let points = array![[-1e-17, 0.3], [-1.0, 1.0]];

        let wrapped = domain.incell(points.view()).unwrap();
        for &x in &wrapped {
            assert!((0.0..1.0).contains(&x));
        }
        assert_eq!(domain.incell(wrapped.view()).unwrap(), wrapped);
    }

    #[test]
    fn check_inside() {
        let domain = SimulationBox::cubic(2.0, false);
        assert!(domain.check_inside(array![[0.0, 1.0, 2.0]].view()).is_ok());

        let error = domain.check_inside(array![[0.0, 1.0, 2.0], [0.0, 2.5, 1.0]].view()).unwrap_err();
        match error {
            Error::OutsideBox { point, dimension, value } => {
                assert_eq!(point, 1);
                assert_eq!(dimension, 1);
                assert_eq!(value, 2.5);
            }
            _ => panic!("unexpected error {}", error),
        }
    }

    #[test]
    fn vector_image() {
        let domain = SimulationBox::new(&[0.0, 0.0, 0.0], &[10.0, 4.0, 5.0], &[true, true, false]).unwrap();
        let mut v = Vector3D::new(9.0, -3.0, 6.0);
        domain.vector_image(&mut v);
        assert_eq!(v, Vector3D::new(-1.0, 1.0, 6.0));

        let u = Vector3D::new(0.5, 0.5, 0.0);
        let w = Vector3D::new(9.5, 3.5, 0.0);
        assert_eq!(domain.distance(u, w), f64::sqrt(2.0));
    }
}
