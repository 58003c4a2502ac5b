use super::{LocalState, SmaUnified, ThermoElastic};
use crate::base::ParamThermoMech;
use crate::StrError;
use russell_lab::Matrix;
use russell_tensor::{Mandel, Tensor2, Tensor4};

/// Holds the prescribed strain/temperature change of one increment
pub struct Increment {
    /// Holds the total strain increment Δε
    pub delta_strain: Tensor2,

    /// Holds the temperature increment ΔT
    pub delta_temperature: f64,

    /// Holds the increment duration Δt
    pub delta_time: f64,

    /// Holds the rotation increment applied to tensor-valued internal
    /// variables at the start of the call (objectivity for large rotations)
    pub rotation: Matrix,
}

impl Increment {
    /// Allocates a new instance with zero increments and identity rotation
    pub fn new() -> Self {
        let mut rotation = Matrix::new(3, 3);
        for i in 0..3 {
            rotation.set(i, i, 1.0);
        }
        Increment {
            delta_strain: Tensor2::new(Mandel::Symmetric),
            delta_temperature: 0.0,
            delta_time: 0.0,
            rotation,
        }
    }
}

/// Holds the per-increment outputs for the enclosing (global) solver
pub struct IncrementOutput {
    /// Holds the consistent tangent operator dσ/dε
    pub dsde: Tensor4,

    /// Holds the tangent operator dσ/dT
    pub dsdt: Tensor2,

    /// Holds the heat generation term r
    pub r: f64,

    /// Holds the sensitivity of r with respect to the strain rate
    pub drde: Tensor2,

    /// Holds the sensitivity of r with respect to the temperature rate
    pub drdt: f64,

    /// Holds the suggested time-step scaling factor
    ///
    /// A value below 1 signals "redo this increment with a smaller step".
    pub tnew_dt: f64,
}

impl IncrementOutput {
    /// Allocates a new instance
    pub fn new() -> Self {
        IncrementOutput {
            dsde: Tensor4::new(Mandel::Symmetric),
            dsdt: Tensor2::new(Mandel::Symmetric),
            r: 0.0,
            drde: Tensor2::new(Mandel::Symmetric),
            drdt: 0.0,
            tnew_dt: 1.0,
        }
    }
}

/// Specifies the essential functions for thermomechanical models
pub trait ThermoMechTrait: Send {
    /// Indicates that the stiffness matrix is symmetric
    fn symmetric_stiffness(&self) -> bool;

    /// Returns the number of internal values
    fn n_internal_values(&self) -> usize;

    /// Initializes the internal values (one-time calibration)
    ///
    /// Derives the calibrated constants from the material parameters and the
    /// temperature currently stored in `state`, and resets the history
    /// variables. Must be called exactly once, before the first increment.
    fn initialize_internal_values(&self, state: &mut LocalState) -> Result<(), StrError>;

    /// Updates the stress and internal variables over one increment
    ///
    /// On success, `state` is advanced (stress, strain, temperature, internal
    /// values, work accumulators) and `output.tnew_dt` is 1. Upon local
    /// non-convergence, `state` is left untouched and `output.tnew_dt` is set
    /// below 1 so the caller can sub-increment and retry.
    fn update_stress(
        &mut self,
        state: &mut LocalState,
        increment: &Increment,
        output: &mut IncrementOutput,
    ) -> Result<(), StrError>;
}

/// Holds the actual thermomechanical model implementation
pub struct ThermoMech {
    /// Holds the actual model implementation
    pub actual: Box<dyn ThermoMechTrait>,
}

impl ThermoMech {
    /// Allocates a new instance
    pub fn new(param: &ParamThermoMech) -> Result<Self, StrError> {
        let actual: Box<dyn ThermoMechTrait> = match param {
            // Isotropic thermoelastic model
            ParamThermoMech::ThermoElastic { young, poisson, alpha } => {
                Box::new(ThermoElastic::new(*young, *poisson, *alpha)?)
            }

            // Unified martensite/austenite transformation model
            ParamThermoMech::SmaUnified(p) => Box::new(SmaUnified::new(p)?),
        };
        Ok(ThermoMech { actual })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
