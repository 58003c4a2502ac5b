//! Implements the base structures for the constitutive integrator

mod constants;
mod parameters;
pub use crate::base::constants::*;
pub use crate::base::parameters::*;
