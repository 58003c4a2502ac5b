/// Defines the maximum number of iterations of the local Newton solver
pub const MAX_ITERATIONS: usize = 100;

/// Defines the tolerance on the residual norm of the local Newton solver
pub const TOL_CONVERGENCE: f64 = 1e-9;

/// Defines a numerical floor below which quantities are regarded as zero
pub const TINY: f64 = 1e-12;

/// Defines the initial (and minimum) martensite volume fraction
///
/// The volume fraction starts slightly inside (0, 1) so that the barrier
/// terms remain finite on the very first increment.
pub const XI_INITIAL: f64 = 1e-5;

/// Defines the time-step scaling factor suggested upon non-convergence
pub const STEP_REDUCTION: f64 = 0.2;
