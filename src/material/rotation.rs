use crate::StrError;
use russell_lab::Matrix;
use russell_tensor::Tensor2;

/// Rotates a symmetric second-order tensor: `T ← R T Rᵀ`
///
/// `rot` must be a 3×3 rotation (proper orthogonal) matrix. The product is
/// explicitly symmetrized to absorb floating-point asymmetry before mapping
/// back to the Mandel basis.
pub fn rotate_tensor(rot: &Matrix, tt: &mut Tensor2) -> Result<(), StrError> {
    let (nrow, ncol) = rot.dims();
    if nrow != 3 || ncol != 3 {
        return Err("rotation matrix must be 3x3");
    }
    let m = tt.as_matrix();

    // a = R T
    let mut a = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            for k in 0..3 {
                a[i][j] += rot.get(i, k) * m.get(k, j);
            }
        }
    }

    // b = a Rᵀ, symmetrized
    let mut b = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            for k in 0..3 {
                b[i][j] += a[i][k] * rot.get(j, k);
            }
        }
    }
    let sym = [
        [b[0][0], 0.5 * (b[0][1] + b[1][0]), 0.5 * (b[0][2] + b[2][0])],
        [0.5 * (b[0][1] + b[1][0]), b[1][1], 0.5 * (b[1][2] + b[2][1])],
        [0.5 * (b[0][2] + b[2][0]), 0.5 * (b[1][2] + b[2][1]), b[2][2]],
    ];

    let rotated = Tensor2::from_matrix(&sym, tt.mandel()).map_err(|_| "cannot rotate tensor")?;
    tt.set_tensor(1.0, &rotated);
    Ok(())
}

/// Returns true if `rot` deviates from the identity by more than machine-level noise
pub fn is_rotated(rot: &Matrix) -> bool {
    for i in 0..3 {
        for j in 0..3 {
            let delta = if i == j { 1.0 } else { 0.0 };
            if f64::abs(rot.get(i, j) - delta) > 10.0 * f64::EPSILON {
                return true;
            }
        }
    }
    false
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{is_rotated, rotate_tensor};
    use russell_lab::{approx_eq, Matrix};
    use russell_tensor::{Mandel, Tensor2};

    fn rotation_z(theta: f64) -> Matrix {
        let (s, c) = theta.sin_cos();
        Matrix::from(&[[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]])
    }

    #[test]
    fn identity_rotation_leaves_the_tensor_alone() {
        let rot = Matrix::from(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
        assert!(!is_rotated(&rot));
        let mut tt = Tensor2::from_matrix(
            &[[1.0, 2.0, 0.0], [2.0, 3.0, 0.0], [0.0, 0.0, 4.0]],
            Mandel::Symmetric,
        )
        .unwrap();
        let before: Vec<f64> = tt.vector().as_data().clone();
        rotate_tensor(&rot, &mut tt).unwrap();
        for i in 0..6 {
            approx_eq(tt.vector()[i], before[i], 1e-15);
        }
    }

    #[test]
    fn quarter_turn_swaps_the_normal_components() {
        // rotating uniaxial stress along x by 90° about z moves it to y
        let rot = rotation_z(std::f64::consts::FRAC_PI_2);
        assert!(is_rotated(&rot));
        let mut tt = Tensor2::from_matrix(
            &[[100.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]],
            Mandel::Symmetric,
        )
        .unwrap();
        rotate_tensor(&rot, &mut tt).unwrap();
        let m = tt.as_matrix();
        approx_eq(m.get(0, 0), 0.0, 1e-12);
        approx_eq(m.get(1, 1), 100.0, 1e-12);
        approx_eq(m.get(0, 1), 0.0, 1e-12);
    }

    #[test]
    fn rotation_preserves_the_invariants() {
        let rot = rotation_z(0.7);
        let mut tt = Tensor2::from_matrix(
            &[[120.0, 30.0, 0.0], [30.0, -40.0, 10.0], [0.0, 10.0, 60.0]],
            Mandel::Symmetric,
        )
        .unwrap();
        let (sm, sd) = (tt.invariant_sigma_m(), tt.invariant_sigma_d());
        rotate_tensor(&rot, &mut tt).unwrap();
        approx_eq(tt.invariant_sigma_m(), sm, 1e-12);
        approx_eq(tt.invariant_sigma_d(), sd, 1e-11);
    }

    #[test]
    fn wrong_matrix_shape_is_rejected() {
        let rot = Matrix::new(2, 2);
        let mut tt = Tensor2::new(Mandel::Symmetric);
        assert_eq!(rotate_tensor(&rot, &mut tt).err(), Some("rotation matrix must be 3x3"));
    }
}
