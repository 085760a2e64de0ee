//! Small fixed-size vector used to store separations between points.

mod vectors;
pub use self::vectors::Vector3D;
