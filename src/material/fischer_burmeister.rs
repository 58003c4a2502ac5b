use crate::base::TINY;
use crate::StrError;

/// Performs one Newton step on the Fischer-Burmeister complementarity system
///
/// The two mechanisms (forward and reverse transformation) each carry a
/// transformation function `Φ_i`, a threshold `Y_i > 0`, and a cumulated
/// multiplier increment `Δs_i`. The Karush-Kuhn-Tucker conditions
///
/// ```text
/// Φ_i ≤ 0,  Δs_i ≥ 0,  Φ_i Δs_i = 0
/// ```
///
/// are recast as the root problem `FB_i = 0` with
///
/// ```text
/// FB_i = √(Φ_i² + (Y_i Δs_i)²) + Φ_i - Y_i Δs_i
/// ```
///
/// which is zero iff the KKT conditions hold. `bb[i][j] = ∂Φ_i/∂Δs_j` is the
/// coupling matrix assembled by the caller. The routine solves the 2×2
/// linearized system, updates `ds_total` in place, writes the per-step
/// corrections into `ds`, and returns the Euclidean norm of FB evaluated at
/// the incoming point (the convergence error of the previous iterate).
pub fn fischer_burmeister_step(
    phi: &[f64; 2],
    y_crit: &[f64; 2],
    bb: &[[f64; 2]; 2],
    ds_total: &mut [f64; 2],
    ds: &mut [f64; 2],
) -> Result<f64, StrError> {
    // residual
    let mut fb = [0.0; 2];
    for i in 0..2 {
        let yd = y_crit[i] * ds_total[i];
        fb[i] = f64::sqrt(phi[i] * phi[i] + yd * yd) + phi[i] - yd;
    }

    // Jacobian: dFB_i/dΔs_j = (Φ_i B_ij + Y_i² Δs_i δ_ij)/ρ_i + B_ij - Y_i δ_ij
    // with ρ_i the square root above; at the non-smooth origin (ρ_i ≈ 0) only
    // the smooth part remains
    let mut jac = [[0.0; 2]; 2];
    for i in 0..2 {
        let yd = y_crit[i] * ds_total[i];
        let rho = f64::sqrt(phi[i] * phi[i] + yd * yd);
        for j in 0..2 {
            let delta = if i == j { 1.0 } else { 0.0 };
            if rho > TINY {
                jac[i][j] = (phi[i] * bb[i][j] + y_crit[i] * y_crit[i] * ds_total[i] * delta) / rho
                    + bb[i][j]
                    - y_crit[i] * delta;
            } else {
                jac[i][j] = bb[i][j] - y_crit[i] * delta;
            }
        }
    }

    // solve jac · ds = -fb
    let det = jac[0][0] * jac[1][1] - jac[0][1] * jac[1][0];
    if f64::abs(det) < TINY {
        return Err("singular local complementarity system");
    }
    ds[0] = (-fb[0] * jac[1][1] + fb[1] * jac[0][1]) / det;
    ds[1] = (-fb[1] * jac[0][0] + fb[0] * jac[1][0]) / det;
    ds_total[0] += ds[0];
    ds_total[1] += ds[1];

    Ok(f64::sqrt(fb[0] * fb[0] + fb[1] * fb[1]))
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
