//! Pairwise force laws built on top of neighbor lists and kernels.

mod hertz;
pub use self::hertz::{HertzParameters, HertzForces, Contact, hertz_contacts};

mod landshoff;
pub use self::landshoff::{LandshoffParameters, ViscousForces, landshoff_forces};
