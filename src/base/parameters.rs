use crate::StrError;
use russell_lab::Vector;
use serde::{Deserialize, Serialize};

/// Holds the number of entries of the positional SMA parameter vector
pub const N_PARAM_SMA: usize = 31;

/// Holds the parameters of the unified SMA transformation model
///
/// The fields map one-to-one onto the positional parameter vector of the
/// external contract (see [ParamSma::from_slice]):
///
/// ```text
///  0  rho            density
///  1  c_pa           specific heat capacity of austenite
///  2  c_pm           specific heat capacity of martensite
///  3  flag_t         0: smoothed transformation-temperature averages
///                    1: direct transformation temperatures
///  4  young_a        Young's modulus of austenite
///  5  young_m        Young's modulus of martensite
///  6  poisson_a      Poisson's ratio of austenite
///  7  poisson_m      Poisson's ratio of martensite
///  8  alpha_a        CTE of austenite (isotropic)
///  9  alpha_m        CTE of martensite (isotropic)
/// 10  h_min          minimum transformation strain magnitude
/// 11  h_max          maximum (saturated) transformation strain magnitude
/// 12  k1             exponent of the saturation law
/// 13  sigma_crit     critical stress of the saturation law
/// 14  c_a            slope of the martensite -> austenite limit
/// 15  c_m            slope of the austenite -> martensite limit
/// 16  ms0            martensite start temperature at zero stress
/// 17  mf0            martensite finish temperature at zero stress
/// 18  as0            austenite start temperature at zero stress
/// 19  af0            austenite finish temperature at zero stress
/// 20  n1             martensite start smooth-hardening exponent
/// 21  n2             martensite finish smooth-hardening exponent
/// 22  n3             austenite start smooth-hardening exponent
/// 23  n4             austenite finish smooth-hardening exponent
/// 24  sigma_caliber  stress at which c_a and c_m are identified
/// 25  prager_b       tension/compression asymmetry parameter
/// 26  prager_n       tension/compression asymmetry exponent
/// 27  c_lambda       barrier function onset point
/// 28  p0_lambda      barrier function magnitude
/// 29  n_lambda       barrier function power-law exponent
/// 30  alpha_lambda   barrier function linearization point
/// ```
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct ParamSma {
    pub rho: f64,
    pub c_pa: f64,
    pub c_pm: f64,
    pub flag_t: i32,
    pub young_a: f64,
    pub young_m: f64,
    pub poisson_a: f64,
    pub poisson_m: f64,
    pub alpha_a: f64,
    pub alpha_m: f64,
    pub h_min: f64,
    pub h_max: f64,
    pub k1: f64,
    pub sigma_crit: f64,
    pub c_a: f64,
    pub c_m: f64,
    pub ms0: f64,
    pub mf0: f64,
    pub as0: f64,
    pub af0: f64,
    pub n1: f64,
    pub n2: f64,
    pub n3: f64,
    pub n4: f64,
    pub sigma_caliber: f64,
    pub prager_b: f64,
    pub prager_n: f64,
    pub c_lambda: f64,
    pub p0_lambda: f64,
    pub n_lambda: f64,
    pub alpha_lambda: f64,
}

impl ParamSma {
    /// Reads the parameters from the positional vector of the external contract
    pub fn from_slice(props: &[f64]) -> Result<Self, StrError> {
        if props.len() != N_PARAM_SMA {
            return Err("the SMA parameter vector must have 31 entries");
        }
        Ok(ParamSma {
            rho: props[0],
            c_pa: props[1],
            c_pm: props[2],
            flag_t: props[3] as i32,
            young_a: props[4],
            young_m: props[5],
            poisson_a: props[6],
            poisson_m: props[7],
            alpha_a: props[8],
            alpha_m: props[9],
            h_min: props[10],
            h_max: props[11],
            k1: props[12],
            sigma_crit: props[13],
            c_a: props[14],
            c_m: props[15],
            ms0: props[16],
            mf0: props[17],
            as0: props[18],
            af0: props[19],
            n1: props[20],
            n2: props[21],
            n3: props[22],
            n4: props[23],
            sigma_caliber: props[24],
            prager_b: props[25],
            prager_n: props[26],
            c_lambda: props[27],
            p0_lambda: props[28],
            n_lambda: props[29],
            alpha_lambda: props[30],
        })
    }

    /// Returns the positional vector of the external contract
    pub fn as_vector(&self) -> Vector {
        Vector::from(&[
            self.rho,
            self.c_pa,
            self.c_pm,
            self.flag_t as f64,
            self.young_a,
            self.young_m,
            self.poisson_a,
            self.poisson_m,
            self.alpha_a,
            self.alpha_m,
            self.h_min,
            self.h_max,
            self.k1,
            self.sigma_crit,
            self.c_a,
            self.c_m,
            self.ms0,
            self.mf0,
            self.as0,
            self.af0,
            self.n1,
            self.n2,
            self.n3,
            self.n4,
            self.sigma_caliber,
            self.prager_b,
            self.prager_n,
            self.c_lambda,
            self.p0_lambda,
            self.n_lambda,
            self.alpha_lambda,
        ])
    }

    /// Returns a sample parameter set for a superelastic NiTi alloy
    ///
    /// Units: MPa, K, and consistent derived units.
    pub fn sample_niti() -> Self {
        ParamSma {
            rho: 6500.0,
            c_pa: 440.0,
            c_pm: 440.0,
            flag_t: 0,
            young_a: 55000.0,
            young_m: 46000.0,
            poisson_a: 0.33,
            poisson_m: 0.33,
            alpha_a: 2.2e-5,
            alpha_m: 2.2e-5,
            h_min: 0.0,
            h_max: 0.047,
            k1: 0.0045,
            sigma_crit: 0.0,
            c_a: 7.4,
            c_m: 7.4,
            ms0: 245.0,
            mf0: 230.0,
            as0: 270.0,
            af0: 280.0,
            n1: 0.17,
            n2: 0.27,
            n3: 0.25,
            n4: 0.35,
            sigma_caliber: 200.0,
            prager_b: 0.0,
            prager_n: 1.0,
            c_lambda: 0.05,
            p0_lambda: 0.1,
            n_lambda: 2.0,
            alpha_lambda: 1e-8,
        }
    }
}

/// Holds the parameters selecting the thermomechanical model family
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub enum ParamThermoMech {
    /// Isotropic thermoelastic solid
    ThermoElastic {
        /// Young's modulus
        young: f64,

        /// Poisson's coefficient
        poisson: f64,

        /// Coefficient of thermal expansion (isotropic)
        alpha: f64,
    },

    /// Unified martensite/austenite transformation model
    SmaUnified(ParamSma),
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
