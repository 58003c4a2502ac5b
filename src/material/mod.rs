//! Implements thermomechanical material models

mod criteria;
mod fischer_burmeister;
mod lagrange;
mod local_state;
mod rotation;
mod sma_unified;
mod thermo_elastic;
mod thermo_mech;
mod two_phase_elasticity;
pub use crate::material::criteria::*;
pub use crate::material::fischer_burmeister::*;
pub use crate::material::lagrange::*;
pub use crate::material::local_state::*;
pub use crate::material::rotation::*;
pub use crate::material::sma_unified::*;
pub use crate::material::thermo_elastic::*;
pub use crate::material::thermo_mech::*;
pub use crate::material::two_phase_elasticity::*;
