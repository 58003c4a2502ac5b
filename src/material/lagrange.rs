/// Power-law barrier keeping a scalar above zero
///
/// Returns zero for `x ≥ c`, grows as `p0 (1/x - 1/c)^n` for `alpha < x < c`,
/// and continues linearly (value and slope matched at `x = alpha`) below
/// `alpha` so the function stays finite when the Newton iterations overshoot.
pub fn lagrange_pow_0(x: f64, c: f64, p0: f64, n: f64, alpha: f64) -> f64 {
    if x >= c {
        0.0
    } else if x > alpha {
        p0 * f64::powf(1.0 / x - 1.0 / c, n)
    } else {
        let value = p0 * f64::powf(1.0 / alpha - 1.0 / c, n);
        let slope = -n * p0 * f64::powf(1.0 / alpha - 1.0 / c, n - 1.0) / (alpha * alpha);
        value + slope * (x - alpha)
    }
}

/// Derivative of [lagrange_pow_0] with respect to x
pub fn dlagrange_pow_0(x: f64, c: f64, p0: f64, n: f64, alpha: f64) -> f64 {
    if x >= c {
        0.0
    } else if x > alpha {
        -n * p0 * f64::powf(1.0 / x - 1.0 / c, n - 1.0) / (x * x)
    } else {
        -n * p0 * f64::powf(1.0 / alpha - 1.0 / c, n - 1.0) / (alpha * alpha)
    }
}

/// Power-law barrier keeping a scalar below one (mirror of [lagrange_pow_0])
pub fn lagrange_pow_1(x: f64, c: f64, p0: f64, n: f64, alpha: f64) -> f64 {
    lagrange_pow_0(1.0 - x, c, p0, n, alpha)
}

/// Derivative of [lagrange_pow_1] with respect to x
pub fn dlagrange_pow_1(x: f64, c: f64, p0: f64, n: f64, alpha: f64) -> f64 {
    -dlagrange_pow_0(1.0 - x, c, p0, n, alpha)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
