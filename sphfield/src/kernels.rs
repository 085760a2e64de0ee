//! Normalized, compact-support radial kernels used for SPH interpolation.
//!
//! All kernels are defined in terms of `q = r / h` where `h` is the smoothing
//! length, which is also the support radius of the kernel: `W(r) = 0` for all
//! `r >= h`. Kernels are normalized so that their volume integral over the
//! support is 1 in the corresponding dimension.
use std::f64::consts::PI;

use ndarray::{Array1, ArrayView1};
use num_traits::{AsPrimitive, Float};

use crate::{Error, Vector3D};

/// `exp(-9)`, used to shift the gaussian kernel to zero at `r = h`
const EXP_MINUS_9: f64 = 1.2340980408667956e-4;
/// `erf(3)`
const ERF_3: f64 = 0.9999779095030014;

/// Dimensionality of space, used to normalize the kernels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Two,
    Three,
}

impl Dimension {
    /// Get the `Dimension` corresponding to a number of spatial dimensions.
    /// Only 2 and 3 are supported.
    pub fn new(value: usize) -> Result<Dimension, Error> {
        match value {
            2 => Ok(Dimension::Two),
            3 => Ok(Dimension::Three),
            _ => Err(Error::InvalidParameter(format!(
                "kernels are only defined in 2 or 3 dimensions, got {}", value
            ))),
        }
    }

    /// Number of spatial dimensions
    pub fn value(self) -> usize {
        match self {
            Dimension::Two => 2,
            Dimension::Three => 3,
        }
    }
}

/// Kind of SPH kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum KernelKind {
    /// Lucy quartic kernel, `W(q) = α (1 + 3q) (1 - q)^3`
    Lucy,
    /// Müller et al. poly6 kernel, `W(r) = α (h^2 - r^2)^3`
    Poly6,
    /// Monaghan cubic spline, with the two pieces joining at `q = 1/2`
    CubicSpline,
    /// Müller et al. spiky kernel, `W(r) = α (h - r)^3`
    Spiky,
    /// Gaussian with standard deviation `h / 3`, shifted to be zero at
    /// `r = h`: `W(q) = α (exp(-9 q^2) - exp(-9))`
    Gaussian,
}

impl KernelKind {
    /// All the available kernel kinds
    pub const ALL: [KernelKind; 5] = [
        KernelKind::Lucy,
        KernelKind::Poly6,
        KernelKind::CubicSpline,
        KernelKind::Spiky,
        KernelKind::Gaussian,
    ];

    /// Name of this kernel, as used in JSON parameters
    pub fn name(self) -> &'static str {
        match self {
            KernelKind::Lucy => "lucy",
            KernelKind::Poly6 => "poly6",
            KernelKind::CubicSpline => "cubic_spline",
            KernelKind::Spiky => "spiky",
            KernelKind::Gaussian => "gaussian",
        }
    }
}

impl std::fmt::Display for KernelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for KernelKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<KernelKind, Error> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "lucy" => Ok(KernelKind::Lucy),
            "poly6" => Ok(KernelKind::Poly6),
            "cubic_spline" | "cubic" => Ok(KernelKind::CubicSpline),
            "spiky" => Ok(KernelKind::Spiky),
            "gaussian" => Ok(KernelKind::Gaussian),
            _ => Err(Error::InvalidParameter(format!(
                "unknown kernel '{}', expected one of lucy, poly6, cubic_spline, spiky or gaussian", name
            ))),
        }
    }
}

/// A SPH kernel with a given smoothing length and dimension
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kernel {
    kind: KernelKind,
    smoothing_length: f64,
    dimension: Dimension,
    /// normalization factor `α`, including the powers of `h`
    alpha: f64,
}

impl Kernel {
    /// Create a new kernel of the given `kind`, with support radius
    /// `smoothing_length` in `dimension` (2 or 3) dimensions.
    pub fn new(kind: KernelKind, smoothing_length: f64, dimension: usize) -> Result<Kernel, Error> {
        if !(smoothing_length > 0.0 && smoothing_length.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "expected positive smoothing length for {} kernel, got {}", kind, smoothing_length
            )));
        }
        let dimension = Dimension::new(dimension)?;

        let h = smoothing_length;
        let alpha = match (kind, dimension) {
            (KernelKind::Lucy, Dimension::Two) => 5.0 / (PI * h * h),
            (KernelKind::Lucy, Dimension::Three) => 105.0 / (16.0 * PI * h.powi(3)),
            (KernelKind::Poly6, Dimension::Two) => 4.0 / (PI * h.powi(8)),
            (KernelKind::Poly6, Dimension::Three) => 315.0 / (64.0 * PI * h.powi(9)),
            (KernelKind::CubicSpline, Dimension::Two) => 40.0 / (7.0 * PI * h * h),
            (KernelKind::CubicSpline, Dimension::Three) => 8.0 / (PI * h.powi(3)),
            (KernelKind::Spiky, Dimension::Two) => 10.0 / (PI * h.powi(5)),
            (KernelKind::Spiky, Dimension::Three) => 15.0 / (PI * h.powi(6)),
            (KernelKind::Gaussian, Dimension::Two) => {
                1.0 / (PI * h * h * ((1.0 - EXP_MINUS_9) / 9.0 - EXP_MINUS_9))
            }
            (KernelKind::Gaussian, Dimension::Three) => {
                let integral = PI.powf(1.5) * ERF_3 / 27.0
                    - 2.0 * PI * EXP_MINUS_9 / 9.0
                    - 4.0 * PI * EXP_MINUS_9 / 3.0;
                1.0 / (h.powi(3) * integral)
            }
        };

        return Ok(Kernel {
            kind: kind,
            smoothing_length: smoothing_length,
            dimension: dimension,
            alpha: alpha,
        });
    }

    /// Get the kind of this kernel
    pub fn kind(&self) -> KernelKind {
        self.kind
    }

    /// Get the smoothing length (support radius) of this kernel
    pub fn smoothing_length(&self) -> f64 {
        self.smoothing_length
    }

    /// Get the number of spatial dimensions this kernel is normalized for
    pub fn dimension(&self) -> usize {
        self.dimension.value()
    }

    /// Evaluate the kernel at distance `r`
    #[inline]
    pub fn value(&self, r: f64) -> f64 {
        let h = self.smoothing_length;
        if r >= h {
            return 0.0;
        }
        let q = r / h;

        match self.kind {
            KernelKind::Lucy => self.alpha * (1.0 + 3.0 * q) * (1.0 - q).powi(3),
            KernelKind::Poly6 => self.alpha * (h * h - r * r).powi(3),
            KernelKind::CubicSpline => {
                if q <= 0.5 {
                    self.alpha * (6.0 * (q * q * q - q * q) + 1.0)
                } else {
                    self.alpha * 2.0 * (1.0 - q).powi(3)
                }
            }
            KernelKind::Spiky => self.alpha * (h - r).powi(3),
            KernelKind::Gaussian => self.alpha * (f64::exp(-9.0 * q * q) - EXP_MINUS_9),
        }
    }

    /// Evaluate the radial derivative `dW/dr` of the kernel at distance `r`
    #[inline]
    pub fn derivative(&self, r: f64) -> f64 {
        let h = self.smoothing_length;
        if r >= h {
            return 0.0;
        }
        let q = r / h;

        match self.kind {
            KernelKind::Lucy => -12.0 * self.alpha * q * (1.0 - q).powi(2) / h,
            KernelKind::Poly6 => -6.0 * self.alpha * r * (h * h - r * r).powi(2),
            KernelKind::CubicSpline => {
                if q <= 0.5 {
                    self.alpha * 6.0 * (3.0 * q * q - 2.0 * q) / h
                } else {
                    -6.0 * self.alpha * (1.0 - q).powi(2) / h
                }
            }
            KernelKind::Spiky => -3.0 * self.alpha * (h - r).powi(2),
            KernelKind::Gaussian => -18.0 * self.alpha * r / (h * h) * f64::exp(-9.0 * q * q),
        }
    }

    /// Gradient of the kernel with respect to the `vector` between two points.
    /// The gradient is zero for a zero-length vector.
    #[inline]
    pub fn gradient(&self, vector: Vector3D) -> Vector3D {
        let r = vector.norm();
        if r == 0.0 {
            return Vector3D::zero();
        }
        return self.derivative(r) / r * vector;
    }

    /// Evaluate the kernel for all the `distances`, in single or double
    /// precision
    pub fn values<T>(&self, distances: ArrayView1<T>) -> Array1<T>
        where T: Float + AsPrimitive<f64>, f64: AsPrimitive<T>
    {
        distances.mapv(|r| self.value(r.as_()).as_())
    }

    /// Evaluate the kernel radial derivative for all the `distances`, in
    /// single or double precision
    pub fn derivatives<T>(&self, distances: ArrayView1<T>) -> Array1<T>
        where T: Float + AsPrimitive<f64>, f64: AsPrimitive<T>
    {
        distances.mapv(|r| self.derivative(r.as_()).as_())
    }
}

/// Parameters defining a [`Kernel`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct KernelParameters {
    /// kind of kernel
    pub kind: KernelKind,
    /// smoothing length of the kernel, which is also the support radius and
    /// should match the neighbor list cutoff
    pub smoothing_length: f64,
    /// number of spatial dimensions (2 or 3)
    pub dimension: usize,
}

impl KernelParameters {
    pub fn validate(&self) -> Result<(), Error> {
        self.build().map(|_| ())
    }

    /// Create parameters from their JSON representation
    pub fn from_json(json: &str) -> Result<KernelParameters, Error> {
        let parameters: KernelParameters = serde_json::from_str(json)?;
        parameters.validate()?;
        return Ok(parameters);
    }

    /// Create the corresponding kernel
    pub fn build(&self) -> Result<Kernel, Error> {
        Kernel::new(self.kind, self.smoothing_length, self.dimension)
    }
}

#[cfg(test)]
mod tests {
    use approx::{assert_relative_eq, assert_ulps_eq};
    use ndarray::array;

    use super::*;

    /// Integrate the kernel over its support with the midpoint rule
    fn integrate(kernel: &Kernel) -> f64 {
        let n_steps = 20_000;
        let h = kernel.smoothing_length();
        let dr = h / n_steps as f64;

        let mut integral = 0.0;
        for step in 0..n_steps {
            let r = (step as f64 + 0.5) * dr;
            let shell = match kernel.dimension() {
                2 => 2.0 * PI * r,
                3 => 4.0 * PI * r * r,
                _ => unreachable!(),
            };
            integral += kernel.value(r) * shell * dr;
        }
        return integral;
    }

    #[test]
    fn normalization() {
        for &kind in &KernelKind::ALL {
            for dimension in [2, 3] {
                for h in [0.05, 1.0, 3.7] {
                    let kernel = Kernel::new(kind, h, dimension).unwrap();
                    assert_relative_eq!(integrate(&kernel), 1.0, epsilon = 1e-6);
                }
            }
        }
    }

    #[test]
    fn support() {
        for &kind in &KernelKind::ALL {
            for dimension in [2, 3] {
                let kernel = Kernel::new(kind, 0.8, dimension).unwrap();
                assert_eq!(kernel.value(0.8), 0.0);
                assert_eq!(kernel.value(0.80001), 0.0);
                assert_eq!(kernel.value(12.0), 0.0);
                assert_eq!(kernel.derivative(0.8), 0.0);
                assert_eq!(kernel.derivative(5.0), 0.0);

                for i in 0..800 {
                    let r = i as f64 * 1e-3;
                    let value = kernel.value(r);
                    assert!(value.is_finite() && value > 0.0, "{} kernel is {} at r={}", kind, value, r);
                    assert!(kernel.derivative(r).is_finite());
                }
            }
        }
    }

    #[test]
    fn finite_differences() {
        let delta = 1e-6;
        for &kind in &KernelKind::ALL {
            for dimension in [2, 3] {
                let kernel = Kernel::new(kind, 1.3, dimension).unwrap();
                for &r in &[0.1, 0.3, 0.64, 0.7, 1.0, 1.25] {
                    let finite = (kernel.value(r + delta) - kernel.value(r - delta)) / (2.0 * delta);
                    assert_relative_eq!(kernel.derivative(r), finite, epsilon = 1e-6, max_relative = 1e-5);
                }
            }
        }
    }

    #[test]
    fn gradient() {
        let kernel = Kernel::new(KernelKind::Lucy, 1.0, 3).unwrap();
        assert_eq!(kernel.gradient(Vector3D::zero()), Vector3D::zero());

        let gradient = kernel.gradient(Vector3D::new(0.0, 0.0, -0.5));
        assert_ulps_eq!(gradient[0], 0.0);
        assert_ulps_eq!(gradient[2], -kernel.derivative(0.5));
    }

    #[test]
    fn vectorized() {
        let kernel = Kernel::new(KernelKind::CubicSpline, 2.0, 2).unwrap();

        let distances = array![0.0, 0.5, 1.5, 2.0, 3.0];
        let values = kernel.values(distances.view());
        for (&r, &value) in distances.iter().zip(values.iter()) {
            assert_eq!(value, kernel.value(r));
        }

        let distances = array![0.0f32, 0.5, 1.5, 2.0, 3.0];
        let values = kernel.values(distances.view());
        assert_relative_eq!(values[1], kernel.value(0.5) as f32);
        assert_eq!(values[3], 0.0);
        assert_eq!(values[4], 0.0);

        let derivatives = kernel.derivatives(distances.view());
        assert_eq!(derivatives[0], 0.0);
        assert_relative_eq!(derivatives[2], kernel.derivative(1.5) as f32);
    }

    #[test]
    fn invalid_kernels() {
        let error = Kernel::new(KernelKind::Lucy, 1.0, 4).unwrap_err();
        assert_eq!(error.to_string(), "invalid parameter: kernels are only defined in 2 or 3 dimensions, got 4");

        let error = Kernel::new(KernelKind::Spiky, 0.0, 3).unwrap_err();
        assert_eq!(error.to_string(), "invalid parameter: expected positive smoothing length for spiky kernel, got 0");

        assert!(Kernel::new(KernelKind::Spiky, f64::NAN, 3).is_err());
    }

    #[test]
    fn names() {
        for &kind in &KernelKind::ALL {
            assert_eq!(kind.name().parse::<KernelKind>().unwrap(), kind);
        }

        assert_eq!("Cubic-Spline".parse::<KernelKind>().unwrap(), KernelKind::CubicSpline);
        assert!("lucyder".parse::<KernelKind>().is_err());
    }

    #[test]
    fn parameters() {
        let parameters = KernelParameters::from_json(r#"{
            "kind": "gaussian",
            "smoothing_length": 0.1,
            "dimension": 3
        }"#).unwrap();

        let kernel = parameters.build().unwrap();
        assert_eq!(kernel.kind(), KernelKind::Gaussian);
        assert_eq!(kernel.dimension(), 3);
        assert_eq!(kernel.smoothing_length(), 0.1);

        let error = KernelParameters::from_json(r#"{"kind": "lucy", "smoothing_length": 0.1, "dimension": 1}"#).unwrap_err();
        assert!(matches!(error, Error::InvalidParameter(_)));

        let error = KernelParameters::from_json(r#"{"kind": "wendland", "smoothing_length": 0.1, "dimension": 2}"#).unwrap_err();
        assert!(matches!(error, Error::Json(_)));
    }
}
