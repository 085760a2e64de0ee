#![warn(clippy::all, clippy::pedantic)]

// disable some style lints
#![allow(clippy::needless_return, clippy::must_use_candidate, clippy::comparison_chain)]
#![allow(clippy::redundant_field_names, clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unreadable_literal, clippy::option_if_let_else, clippy::range_plus_one)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::module_name_repetitions)]

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap, clippy::cast_lossless, clippy::cast_sign_loss)]
#![allow(clippy::many_single_char_names, clippy::similar_names)]

// Tests lints
#![cfg_attr(test, allow(clippy::float_cmp))]

//! Spatial indexing and kernel interpolation for particle simulation
//! snapshots (SPH / molecular dynamics) under periodic boundary conditions.
//!
//! The main entry points are [`SimulationBox`] (wrapping, ghost images and
//! reunification of split objects), [`NeighborList`] (cutoff-radius neighbor
//! search), [`Kernel`] (SPH kernels), [`FieldInterpolator`] (field
//! reconstruction) and the force laws in [`forces`].

pub mod types;
pub use types::*;

mod errors;
pub use self::errors::Error;

pub mod geometry;
pub use self::geometry::SimulationBox;

pub mod neighbors;
pub use self::neighbors::{NeighborList, NeighborListOptions, Pair};

pub mod kernels;
pub use self::kernels::{Kernel, KernelKind, KernelParameters};

pub mod interpolation;
pub use self::interpolation::{FieldInterpolator, InterpolationOptions, Normalization};

pub mod forces;

pub mod particles;
pub use self::particles::{Particle, ParticleSet, Snapshot};
