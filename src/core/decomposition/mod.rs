//! Polarimetric decompositions and the tile operator that applies them

pub mod freeman_durden;
pub mod h_alpha;
pub mod pauli;
pub mod processor;
pub mod sinclair;
pub mod span;
pub mod yamaguchi;

pub use freeman_durden::freeman_durden;
pub use h_alpha::{classify, h_alpha, HAlpha, HAlphaPartition};
pub use pauli::pauli;
pub use processor::DecompositionProcessor;
pub use sinclair::{sinclair, sinclair_dual};
pub use span::{compute_span, tile_span, SpanCell, SpanStatistic};
pub use yamaguchi::yamaguchi;

use crate::core::estimator::TargetMatrix;
use crate::types::{MatrixKind, PolError, PolResult, EPS};
use serde::{Deserialize, Serialize};

/// Red/green/blue colour-composite powers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbPowers {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// Two-band composite for dual-pol data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualPowers {
    pub r: f64,
    pub b: f64,
}

/// Model-based scattering powers, all non-negative
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatteringPowers {
    pub surface: f64,
    pub double_bounce: f64,
    pub volume: f64,
    pub helix: f64,
}

/// Available decomposition algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decomposition {
    Pauli,
    Sinclair,
    FreemanDurden,
    Yamaguchi,
    CloudePottier,
}

impl std::str::FromStr for Decomposition {
    type Err = PolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match key.as_str() {
            "pauli" => Ok(Decomposition::Pauli),
            "sinclair" => Ok(Decomposition::Sinclair),
            "freemandurden" | "freeman" => Ok(Decomposition::FreemanDurden),
            "yamaguchi" => Ok(Decomposition::Yamaguchi),
            "cloudepottier" | "halpha" => Ok(Decomposition::CloudePottier),
            _ => Err(PolError::InvalidParameter(format!(
                "{} is an invalid decomposition name",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Decomposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Decomposition::Pauli => "Pauli",
            Decomposition::Sinclair => "Sinclair",
            Decomposition::FreemanDurden => "Freeman-Durden",
            Decomposition::Yamaguchi => "Yamaguchi",
            Decomposition::CloudePottier => "Cloude-Pottier",
        };
        write!(f, "{}", name)
    }
}

impl Decomposition {
    /// Matrix the algorithm consumes for a given source kind
    pub fn required_matrix(&self, source: MatrixKind) -> PolResult<TargetMatrix> {
        match self {
            Decomposition::Pauli | Decomposition::FreemanDurden | Decomposition::Yamaguchi => {
                if source.is_quad_pol() {
                    Ok(TargetMatrix::C3)
                } else {
                    Err(PolError::UnsupportedMatrix(format!(
                        "{} decomposition requires a quad-pol product, got {}",
                        self, source
                    )))
                }
            }
            Decomposition::Sinclair => {
                if source.is_quad_pol() {
                    Ok(TargetMatrix::C3)
                } else {
                    Ok(TargetMatrix::C2)
                }
            }
            Decomposition::CloudePottier => {
                if source.is_dual_pol() {
                    Ok(TargetMatrix::C2)
                } else {
                    Err(PolError::UnsupportedMatrix(format!(
                        "{} classification expects a dual-pol or compact-pol product, got {}",
                        self, source
                    )))
                }
            }
        }
    }

    /// Output band names for a source of the given dimension
    pub fn band_names(&self, dual_pol: bool) -> Vec<&'static str> {
        match self {
            Decomposition::Pauli => vec!["Pauli_r", "Pauli_g", "Pauli_b"],
            Decomposition::Sinclair if dual_pol => vec!["Sinclair_r", "Sinclair_b"],
            Decomposition::Sinclair => vec!["Sinclair_r", "Sinclair_g", "Sinclair_b"],
            Decomposition::FreemanDurden => {
                vec!["Freeman_dbl_r", "Freeman_vol_g", "Freeman_surf_b"]
            }
            Decomposition::Yamaguchi => vec![
                "Yamaguchi_dbl_r",
                "Yamaguchi_vol_g",
                "Yamaguchi_surf_b",
                "Yamaguchi_hlx",
            ],
            Decomposition::CloudePottier => vec!["H_alpha_class"],
        }
    }

    /// Whether output is normalized by the span statistic when normalization is on
    pub fn uses_span(&self) -> bool {
        matches!(
            self,
            Decomposition::FreemanDurden | Decomposition::Yamaguchi
        )
    }
}

/// Decomposition settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompositionParams {
    pub algorithm: Decomposition,
    /// Averaging window size (odd)
    pub window_size: usize,
    /// Scale model powers into the span range before dB conversion
    pub normalize: bool,
    pub partition: HAlphaPartition,
    /// Value written where the source pixel is no-data
    pub output_no_data: f32,
}

impl Default for DecompositionParams {
    fn default() -> Self {
        Self {
            algorithm: Decomposition::Pauli,
            window_size: 5,
            normalize: true,
            partition: HAlphaPartition::Cloude,
            output_no_data: 0.0,
        }
    }
}

/// `10·log10` with the ε floor, optionally after linear scaling into the span range.
///
/// A degenerate span range leaves the power unscaled.
pub fn scale_db(power: f64, span: Option<&SpanStatistic>) -> f64 {
    let v = match span {
        Some(s) if s.max - s.min > EPS => ((power - s.min) / (s.max - s.min)).clamp(0.0, 1.0),
        _ => power,
    };
    10.0 * v.max(EPS).log10()
}
