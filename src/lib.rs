//! Smasim - thermomechanical constitutive-model integrator
//!
//! This crate integrates a material's constitutive law over a single time
//! increment at one material (integration) point: given the strain and
//! temperature state at the start and end of an increment, it produces the
//! updated stress, the updated internal variables, and the consistent tangent
//! operators required by an enclosing structural solver.
//!
//! The integration pattern (elastic prediction, active-set Newton iteration,
//! tangent condensation) is shared by a family of models; it is instantiated
//! here for a stress-induced martensite/austenite phase transformation model
//! ([crate::material::SmaUnified]) and for a simple thermoelastic solid
//! ([crate::material::ThermoElastic]).
//!
//! Each material point is integrated independently; the engine keeps no
//! shared mutable state, so calls may be distributed across parallel workers
//! with no locking.

/// Defines a type alias for the error type as a static string
pub type StrError = &'static str;

pub mod base;
pub mod material;
