use crate::StrError;
use russell_lab::Vector;
use russell_tensor::{Mandel, Tensor2};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// Holds the local state of one material (integration) point
///
/// This data is owned by the caller and persists for the life of the
/// simulation. The engine reads the previous converged state and either
/// overwrites it in place (on a converged increment) or leaves every field
/// untouched so that the caller can retry with a smaller increment.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LocalState {
    /// Holds the stress tensor σ
    pub stress: Tensor2,

    /// Holds the total strain tensor ε at the beginning of the increment
    pub strain: Tensor2,

    /// Holds the temperature at the beginning of the increment
    pub temperature: f64,

    /// Holds the internal values Z (model-specific, positionally defined)
    pub internal_values: Vector,

    /// Holds the accumulated total mechanical work
    pub wm: f64,

    /// Holds the accumulated recoverable (elastic) mechanical work
    pub wm_r: f64,

    /// Holds the accumulated irrecoverable mechanical work
    pub wm_ir: f64,

    /// Holds the accumulated dissipated mechanical work
    pub wm_d: f64,

    /// Holds the accumulated total thermal work
    pub wt: f64,

    /// Holds the accumulated reversible thermal work (entropy part)
    pub wt_r: f64,

    /// Holds the accumulated irreversible thermal work
    pub wt_ir: f64,
}

impl LocalState {
    /// Allocates a new instance with zeroed stress, strain, and accumulators
    pub fn new(n_internal_values: usize) -> Self {
        LocalState {
            stress: Tensor2::new(Mandel::Symmetric),
            strain: Tensor2::new(Mandel::Symmetric),
            temperature: 0.0,
            internal_values: Vector::new(n_internal_values),
            wm: 0.0,
            wm_r: 0.0,
            wm_ir: 0.0,
            wm_d: 0.0,
            wt: 0.0,
            wt_r: 0.0,
            wt_ir: 0.0,
        }
    }

    /// Copies another state into this one
    pub fn set_state(&mut self, other: &LocalState) {
        self.stress.set_tensor(1.0, &other.stress);
        self.strain.set_tensor(1.0, &other.strain);
        self.temperature = other.temperature;
        self.internal_values.set_vector(other.internal_values.as_data());
        self.wm = other.wm;
        self.wm_r = other.wm_r;
        self.wm_ir = other.wm_ir;
        self.wm_d = other.wm_d;
        self.wt = other.wt;
        self.wt_r = other.wt_r;
        self.wt_ir = other.wt_ir;
    }

    /// Reads a JSON file containing the state data
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn read_json<P>(full_path: &P) -> Result<Self, StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        let input = File::open(path).map_err(|_| "cannot open file")?;
        let buffered = BufReader::new(input);
        let state = serde_json::from_reader(buffered).map_err(|_| "cannot parse JSON file")?;
        Ok(state)
    }

    /// Writes a JSON file with the state data
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn write_json<P>(&self, full_path: &P) -> Result<(), StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        if let Some(p) = path.parent() {
            fs::create_dir_all(p).map_err(|_| "cannot create directory")?;
        }
        let mut file = File::create(&path).map_err(|_| "cannot create file")?;
        serde_json::to_writer(&mut file, &self).map_err(|_| "cannot write file")?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
