use russell_tensor::{Tensor2, Tensor4, IDENTITY2, P_SYMDEV};

/// Defines an alias to IDENTITY2
const I: &[f64; 9] = &IDENTITY2;

/// Defines an alias to P_SYMDEV
const PSD: &[[f64; 9]; 9] = &P_SYMDEV;

/// Computes the bulk and shear moduli (K, G) from Young's modulus and Poisson's ratio
pub fn bulk_shear(young: f64, poisson: f64) -> (f64, f64) {
    let kk = young / (3.0 * (1.0 - 2.0 * poisson));
    let gg = young / (2.0 * (1.0 + poisson));
    (kk, gg)
}

/// Computes the effective moduli of a two-phase mixture (harmonic mean)
///
/// ```text
/// K_eff = K_A K_M / (ξ K_A + (1-ξ) K_M)
/// G_eff = G_A G_M / (ξ G_A + (1-ξ) G_M)
/// ```
///
/// The harmonic mean preserves positivity: the effective moduli are positive
/// (and the stiffness SPD) whenever both phase moduli are positive and
/// ξ ∈ [0, 1].
pub fn effective_bulk_shear(kk_a: f64, gg_a: f64, kk_m: f64, gg_m: f64, xi: f64) -> (f64, f64) {
    let kk = (kk_a * kk_m) / (xi * kk_a + (1.0 - xi) * kk_m);
    let gg = (gg_a * gg_m) / (xi * gg_a + (1.0 - xi) * gg_m);
    (kk, gg)
}

/// Assembles the isotropic rigidity (stiffness) tensor from (K, G)
///
/// ```text
/// D = K I ⊗ I + 2 G Psymdev
/// ```
pub fn isotropic_rigidity(dd: &mut Tensor4, kk: f64, gg: f64) {
    let dim = dd.mandel().dim();
    let mat = dd.matrix_mut();
    for i in 0..dim {
        for j in 0..dim {
            mat.set(i, j, kk * I[i] * I[j] + 2.0 * gg * PSD[i][j]);
        }
    }
}

/// Assembles the isotropic compliance tensor from (K, G)
///
/// ```text
/// C = I ⊗ I / (9 K) + Psymdev / (2 G)
/// ```
pub fn isotropic_compliance(cc: &mut Tensor4, kk: f64, gg: f64) {
    let dim = cc.mandel().dim();
    let mat = cc.matrix_mut();
    for i in 0..dim {
        for j in 0..dim {
            mat.set(i, j, I[i] * I[j] / (9.0 * kk) + PSD[i][j] / (2.0 * gg));
        }
    }
}

/// Sets an isotropic (spherical) tensor: T = a I
pub fn spherical_tensor(tt: &mut Tensor2, a: f64) {
    let dim = tt.dim();
    let vec = tt.vector_mut();
    for i in 0..dim {
        vec[i] = a * I[i];
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{bulk_shear, effective_bulk_shear, isotropic_compliance, isotropic_rigidity, spherical_tensor};
    use russell_lab::{approx_eq, mat_vec_mul, Vector};
    use russell_tensor::{Mandel, Tensor2, Tensor4};

    #[test]
    fn bulk_shear_works() {
        let (kk, gg) = bulk_shear(1500.0, 0.25);
        approx_eq(kk, 1000.0, 1e-13);
        approx_eq(gg, 600.0, 1e-13);
    }

    #[test]
    fn effective_bulk_shear_recovers_the_phases() {
        let (kk_a, gg_a) = bulk_shear(55000.0, 0.33);
        let (kk_m, gg_m) = bulk_shear(46000.0, 0.33);

        // ξ = 0 recovers austenite; ξ = 1 recovers martensite
        let (kk, gg) = effective_bulk_shear(kk_a, gg_a, kk_m, gg_m, 0.0);
        approx_eq(kk, kk_a, 1e-11);
        approx_eq(gg, gg_a, 1e-11);
        let (kk, gg) = effective_bulk_shear(kk_a, gg_a, kk_m, gg_m, 1.0);
        approx_eq(kk, kk_m, 1e-11);
        approx_eq(gg, gg_m, 1e-11);

        // intermediate values stay positive and between the phases
        for i in 1..10 {
            let xi = (i as f64) / 10.0;
            let (kk, gg) = effective_bulk_shear(kk_a, gg_a, kk_m, gg_m, xi);
            assert!(kk > kk_m && kk < kk_a);
            assert!(gg > gg_m && gg < gg_a);
        }
    }

    #[test]
    fn rigidity_and_compliance_are_inverse_pairs() {
        let (kk, gg) = (1000.0, 600.0);
        let mut dd = Tensor4::new(Mandel::Symmetric);
        let mut cc = Tensor4::new(Mandel::Symmetric);
        isotropic_rigidity(&mut dd, kk, gg);
        isotropic_compliance(&mut cc, kk, gg);

        // (C D) : ε = ε for an arbitrary strain-like vector
        let eps = Vector::from(&[0.001, -0.002, 0.0005, 0.003, -0.001, 0.002]);
        let mut sig = Vector::new(6);
        let mut back = Vector::new(6);
        mat_vec_mul(&mut sig, 1.0, dd.matrix(), &eps).unwrap();
        mat_vec_mul(&mut back, 1.0, cc.matrix(), &sig).unwrap();
        for i in 0..6 {
            approx_eq(back[i], eps[i], 1e-14);
        }
    }

    #[test]
    fn rigidity_matches_hooke_in_uniaxial_strain() {
        // σ = D : ε with ε = (e,0,0,...) gives σ00 = (K + 4G/3) e
        let (kk, gg) = (1000.0, 600.0);
        let mut dd = Tensor4::new(Mandel::Symmetric);
        isotropic_rigidity(&mut dd, kk, gg);
        let eps = Vector::from(&[0.001, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let mut sig = Vector::new(6);
        mat_vec_mul(&mut sig, 1.0, dd.matrix(), &eps).unwrap();
        approx_eq(sig[0], (kk + 4.0 * gg / 3.0) * 0.001, 1e-12);
        approx_eq(sig[1], (kk - 2.0 * gg / 3.0) * 0.001, 1e-12);
        approx_eq(sig[3], 0.0, 1e-15);
    }

    #[test]
    fn spherical_tensor_works() {
        let mut tt = Tensor2::new(Mandel::Symmetric);
        spherical_tensor(&mut tt, 2.5);
        assert_eq!(tt.vector()[0], 2.5);
        assert_eq!(tt.vector()[1], 2.5);
        assert_eq!(tt.vector()[2], 2.5);
        assert_eq!(tt.vector()[3], 0.0);
    }
}
