use std::ops::{Add, AddAssign, Sub, SubAssign, Mul, Div, Neg, Index, IndexMut};

/// A 3-dimensional vector. Two-dimensional data is stored with a zero third
/// component, which leaves norms and dot products unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Vector3D([f64; 3]);

impl Vector3D {
    /// Create a new `Vector3D` with components `x`, `y`, `z`
    pub const fn new(x: f64, y: f64, z: f64) -> Vector3D {
        Vector3D([x, y, z])
    }

    /// Create a new `Vector3D` with all components set to zero
    pub const fn zero() -> Vector3D {
        Vector3D([0.0, 0.0, 0.0])
    }

    /// Create a vector from the first 2 or 3 values in `slice`, padding the
    /// missing components with zeros.
    pub fn from_slice(slice: &[f64]) -> Vector3D {
        debug_assert!(slice.len() <= 3);
        let mut vector = Vector3D::zero();
        for (component, &value) in vector.0.iter_mut().zip(slice) {
            *component = value;
        }
        return vector;
    }

    /// Create a vector from a row of a `N x D` point array, with `D` equal to
    /// 2 or 3.
    pub fn from_row(row: ndarray::ArrayView1<f64>) -> Vector3D {
        debug_assert!(row.len() <= 3);
        let mut vector = Vector3D::zero();
        for (component, &value) in vector.0.iter_mut().zip(row.iter()) {
            *component = value;
        }
        return vector;
    }

    /// Squared euclidean norm of the vector
    pub fn norm2(&self) -> f64 {
        self * self
    }

    /// Euclidean norm of the vector
    pub fn norm(&self) -> f64 {
        f64::sqrt(self.norm2())
    }

    /// Get a normalized version of this vector
    pub fn normalized(&self) -> Vector3D {
        self / self.norm()
    }

    /// Tensor product `self ⊗ other`, as a row-major 3x3 matrix
    pub fn tensor_product(&self, other: &Vector3D) -> [[f64; 3]; 3] {
        let mut result = [[0.0; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                result[i][j] = self[i] * other[j];
            }
        }
        return result;
    }

    /// Get the components of this vector as an array
    pub fn as_array(&self) -> &[f64; 3] {
        &self.0
    }
}

impl From<[f64; 3]> for Vector3D {
    fn from(array: [f64; 3]) -> Vector3D {
        Vector3D(array)
    }
}

impl From<Vector3D> for [f64; 3] {
    fn from(vector: Vector3D) -> [f64; 3] {
        vector.0
    }
}

impl Index<usize> for Vector3D {
    type Output = f64;
    #[inline]
    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl IndexMut<usize> for Vector3D {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.0[index]
    }
}

impl Add for Vector3D {
    type Output = Vector3D;
    #[inline]
    fn add(self, other: Vector3D) -> Vector3D {
        Vector3D::new(self[0] + other[0], self[1] + other[1], self[2] + other[2])
    }
}

impl AddAssign for Vector3D {
    #[inline]
    fn add_assign(&mut self, other: Vector3D) {
        *self = *self + other;
    }
}

impl Sub for Vector3D {
    type Output = Vector3D;
    #[inline]
    fn sub(self, other: Vector3D) -> Vector3D {
        Vector3D::new(self[0] - other[0], self[1] - other[1], self[2] - other[2])
    }
}

impl SubAssign for Vector3D {
    #[inline]
    fn sub_assign(&mut self, other: Vector3D) {
        *self = *self - other;
    }
}

impl Neg for Vector3D {
    type Output = Vector3D;
    #[inline]
    fn neg(self) -> Vector3D {
        Vector3D::new(-self[0], -self[1], -self[2])
    }
}

/// Dot product
impl Mul<Vector3D> for Vector3D {
    type Output = f64;
    #[inline]
    fn mul(self, other: Vector3D) -> f64 {
        self[0] * other[0] + self[1] * other[1] + self[2] * other[2]
    }
}

impl<'a, 'b> Mul<&'a Vector3D> for &'b Vector3D {
    type Output = f64;
    #[inline]
    fn mul(self, other: &'a Vector3D) -> f64 {
        *self * *other
    }
}

impl Mul<f64> for Vector3D {
    type Output = Vector3D;
    #[inline]
    fn mul(self, scalar: f64) -> Vector3D {
        Vector3D::new(self[0] * scalar, self[1] * scalar, self[2] * scalar)
    }
}

impl Mul<Vector3D> for f64 {
    type Output = Vector3D;
    #[inline]
    fn mul(self, vector: Vector3D) -> Vector3D {
        vector * self
    }
}

impl Div<f64> for Vector3D {
    type Output = Vector3D;
    #[inline]
    fn div(self, scalar: f64) -> Vector3D {
        Vector3D::new(self[0] / scalar, self[1] / scalar, self[2] / scalar)
    }
}

impl<'a> Div<f64> for &'a Vector3D {
    type Output = Vector3D;
    #[inline]
    fn div(self, scalar: f64) -> Vector3D {
        *self / scalar
    }
}

impl approx::AbsDiffEq for Vector3D {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Vector3D, epsilon: f64) -> bool {
        f64::abs_diff_eq(&self[0], &other[0], epsilon) &&
        f64::abs_diff_eq(&self[1], &other[1], epsilon) &&
        f64::abs_diff_eq(&self[2], &other[2], epsilon)
    }
}

impl approx::RelativeEq for Vector3D {
    fn default_max_relative() -> f64 {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Vector3D, epsilon: f64, max_relative: f64) -> bool {
        f64::relative_eq(&self[0], &other[0], epsilon, max_relative) &&
        f64::relative_eq(&self[1], &other[1], epsilon, max_relative) &&
        f64::relative_eq(&self[2], &other[2], epsilon, max_relative)
    }
}
