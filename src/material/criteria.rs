use crate::base::TINY;
use russell_lab::vec_inner;
use russell_tensor::{Tensor2, IDENTITY2};

/// Computes the von Mises equivalent stress
pub fn mises_stress(sigma: &Tensor2) -> f64 {
    sigma.invariant_sigma_d()
}

/// Computes the von Mises equivalent strain: `εvm = √(2/3) ‖dev(ε)‖`
pub fn mises_strain(eps: &Tensor2) -> f64 {
    eps.invariant_eps_d()
}

/// Computes the second invariant of the stress deviator: `J2 = ½ s : s`
pub fn invariant_jj2(sigma: &Tensor2) -> f64 {
    let mut s = Tensor2::new(sigma.mandel());
    sigma.deviator(&mut s);
    0.5 * vec_inner(s.vector(), s.vector())
}

/// Computes the third invariant of the stress deviator: `J3 = det(s)`
pub fn invariant_jj3(sigma: &Tensor2) -> f64 {
    let mut s = Tensor2::new(sigma.mandel());
    sigma.deviator(&mut s);
    let m = s.as_matrix();
    m.get(0, 0) * (m.get(1, 1) * m.get(2, 2) - m.get(1, 2) * m.get(2, 1))
        - m.get(0, 1) * (m.get(1, 0) * m.get(2, 2) - m.get(1, 2) * m.get(2, 0))
        + m.get(0, 2) * (m.get(1, 0) * m.get(2, 1) - m.get(1, 1) * m.get(2, 0))
}

/// Computes the Prager equivalent stress
///
/// ```text
/// P(σ) = σvm (1 + b J3 / J2^(3/2))^(1/n)
/// ```
///
/// Returns zero at (nearly) deviatoric-free stress states. With `b = 0` the
/// criterion reduces to von Mises.
pub fn prager_stress(sigma: &Tensor2, b: f64, n: f64) -> f64 {
    let jj2 = invariant_jj2(sigma);
    if jj2 < TINY {
        return 0.0;
    }
    let jj3 = invariant_jj3(sigma);
    let sigma_vm = f64::sqrt(3.0 * jj2);
    sigma_vm * f64::powf(1.0 + b * jj3 * f64::powf(jj2, -1.5), 1.0 / n)
}

/// Computes the derivative of the Prager equivalent stress w.r.t. the stress tensor
///
/// Writes the result into `d1` (same Mandel basis as `sigma`). At (nearly)
/// deviatoric-free stress states the derivative is set to zero.
pub fn deriv1_prager_stress(d1: &mut Tensor2, sigma: &Tensor2, b: f64, n: f64) {
    let dim = d1.dim();
    let jj2 = invariant_jj2(sigma);
    if jj2 < TINY {
        for i in 0..dim {
            d1.vector_mut()[i] = 0.0;
        }
        return;
    }
    let jj3 = invariant_jj3(sigma);
    let sigma_vm = f64::sqrt(3.0 * jj2);
    let aa = 1.0 + b * jj3 * f64::powf(jj2, -1.5);

    // s·s (symmetric since s is)
    let mut s = Tensor2::new(sigma.mandel());
    sigma.deviator(&mut s);
    let sm = s.as_matrix();
    let mut ss = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            for k in 0..3 {
                ss[i][j] += sm.get(i, k) * sm.get(k, j);
            }
        }
    }
    let ss_t2 = match Tensor2::from_matrix(&ss, sigma.mandel()) {
        Ok(t) => t,
        Err(_) => {
            for i in 0..dim {
                d1.vector_mut()[i] = 0.0;
            }
            return;
        }
    };

    // dJ3/dσ = s·s - (2/3) J2 I  and  dJ2/dσ = s
    // dP/dσ = A^(1/n) (3/(2σvm)) s + σvm (1/n) A^(1/n-1) b [J2^(-3/2) dJ3/dσ - (3/2) J3 J2^(-5/2) s]
    let c_vm = f64::powf(aa, 1.0 / n) * 1.5 / sigma_vm;
    let c_b = sigma_vm * (1.0 / n) * f64::powf(aa, 1.0 / n - 1.0) * b;
    let j2_m32 = f64::powf(jj2, -1.5);
    let j2_m52 = f64::powf(jj2, -2.5);
    for i in 0..dim {
        let djj3 = ss_t2.vector()[i] - (2.0 / 3.0) * jj2 * IDENTITY2[i];
        d1.vector_mut()[i] = c_vm * s.vector()[i]
            + c_b * (j2_m32 * djj3 - 1.5 * jj3 * j2_m52 * s.vector()[i]);
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
