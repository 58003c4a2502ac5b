use super::{
    bulk_shear, isotropic_rigidity, spherical_tensor, LocalState, ThermoMechTrait,
};
use super::{Increment, IncrementOutput};
use crate::StrError;
use russell_lab::vec_inner;
use russell_tensor::{t4_ddot_t2, Mandel, Tensor2, Tensor4};

/// Implements an isotropic thermoelastic model
///
/// ```text
/// Δσ = D : (Δε - α ΔT I)
/// ```
///
/// The model is linear, so the update needs no iteration and the consistent
/// tangent equals the elastic stiffness.
pub struct ThermoElastic {
    /// Bulk modulus
    kk: f64,

    /// Constant stiffness tensor
    dd: Tensor4,

    /// Coefficient of thermal expansion (isotropic)
    alpha: f64,
}

impl ThermoElastic {
    /// Allocates a new instance
    pub fn new(young: f64, poisson: f64, alpha: f64) -> Result<Self, StrError> {
        if young <= 0.0 {
            return Err("Young's modulus must be positive");
        }
        if poisson <= -1.0 || poisson >= 0.5 {
            return Err("Poisson's ratio must be in (-1, 0.5)");
        }
        let (kk, gg) = bulk_shear(young, poisson);
        let mut dd = Tensor4::new(Mandel::Symmetric);
        isotropic_rigidity(&mut dd, kk, gg);
        Ok(ThermoElastic { kk, dd, alpha })
    }
}

impl ThermoMechTrait for ThermoElastic {
    fn symmetric_stiffness(&self) -> bool {
        true
    }

    fn n_internal_values(&self) -> usize {
        0
    }

    fn initialize_internal_values(&self, _state: &mut LocalState) -> Result<(), StrError> {
        Ok(())
    }

    fn update_stress(
        &mut self,
        state: &mut LocalState,
        increment: &Increment,
        output: &mut IncrementOutput,
    ) -> Result<(), StrError> {
        // mechanical strain increment: Δε - α ΔT I
        let mut deps_mech = Tensor2::new(Mandel::Symmetric);
        deps_mech.set_tensor(1.0, &increment.delta_strain);
        let dim = deps_mech.dim();
        let a = self.alpha * increment.delta_temperature;
        let mut alpha_i = Tensor2::new(Mandel::Symmetric);
        spherical_tensor(&mut alpha_i, a);
        for i in 0..dim {
            deps_mech.vector_mut()[i] -= alpha_i.vector()[i];
        }

        // Δσ = D : (Δε - α ΔT I)
        let mut dsig = Tensor2::new(Mandel::Symmetric);
        t4_ddot_t2(&mut dsig, 1.0, &self.dd, &deps_mech);

        // mechanical work (trapezoidal): ΔW = (σ + Δσ/2) : Δε
        let mut sigma_mid = Tensor2::new(Mandel::Symmetric);
        for i in 0..dim {
            sigma_mid.vector_mut()[i] = state.stress.vector()[i] + 0.5 * dsig.vector()[i];
        }
        let dw = vec_inner(sigma_mid.vector(), increment.delta_strain.vector());
        state.wm += dw;
        state.wm_r += dw;

        // advance the state
        for i in 0..dim {
            state.stress.vector_mut()[i] += dsig.vector()[i];
            state.strain.vector_mut()[i] += increment.delta_strain.vector()[i];
        }
        state.temperature += increment.delta_temperature;

        // tangents: dσ/dε = D and dσ/dT = -3 K α I
        output.dsde.set_tensor(1.0, &self.dd);
        spherical_tensor(&mut output.dsdt, -3.0 * self.kk * self.alpha);
        output.r = 0.0;
        spherical_tensor(&mut output.drde, 0.0);
        output.drdt = 0.0;
        output.tnew_dt = 1.0;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
