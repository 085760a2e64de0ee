#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// Got an invalid parameter value in a function
    InvalidParameter(String),
    /// The shape of some array does not match what the function expects
    ShapeMismatch(String),
    /// A point lies outside of the simulation box, but the operation requires
    /// all points to be inside (see `SimulationBox::incell`)
    OutsideBox {
        /// index of the offending point
        point: usize,
        /// dimension along which the point is outside of the box
        dimension: usize,
        /// coordinate of the point along this dimension
        value: f64,
    },
    /// Error while serializing/deserializing data
    Json(serde_json::Error),
    /// Some internal invariant was broken
    Internal(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidParameter(e) => write!(f, "invalid parameter: {}", e),
            Error::ShapeMismatch(e) => write!(f, "shape mismatch: {}", e),
            Error::OutsideBox { point, dimension, value } => write!(f,
                "point {} is outside of the box along dimension {} (coordinate is {}), \
                wrap the points inside the box first", point, dimension, value
            ),
            Error::Json(e) => write!(f, "json error: {}", e),
            Error::Internal(e) => write!(f, "internal error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidParameter(_) |
            Error::ShapeMismatch(_) |
            Error::OutsideBox { .. } |
            Error::Internal(_) => None,
            Error::Json(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::Json(error)
    }
}

impl From<ndarray::ShapeError> for Error {
    fn from(error: ndarray::ShapeError) -> Error {
        Error::ShapeMismatch(error.to_string())
    }
}
