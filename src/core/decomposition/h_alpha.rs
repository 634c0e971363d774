use crate::core::matrix::Matrix2;
use crate::types::EPS;
use serde::{Deserialize, Serialize};

/// Entropy, anisotropy and mean alpha angle (degrees) of a 2×2 coherency
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HAlpha {
    pub entropy: f64,
    pub anisotropy: f64,
    pub alpha: f64,
}

impl HAlpha {
    pub fn is_finite(&self) -> bool {
        self.entropy.is_finite() && self.anisotropy.is_finite() && self.alpha.is_finite()
    }
}

/// Partition of the (H, α) plane into classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HAlphaPartition {
    /// Cloude-Pottier zones, upper-inclusive boundaries, numbered from high entropy down
    #[default]
    Cloude,
    /// Lee's variant, lower-inclusive boundaries, numbered from low-entropy surface up
    Lee,
}

impl std::str::FromStr for HAlphaPartition {
    type Err = crate::types::PolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cloude" | "cloude-pottier" | "default" => Ok(HAlphaPartition::Cloude),
            "lee" => Ok(HAlphaPartition::Lee),
            other => Err(crate::types::PolError::InvalidParameter(format!(
                "unknown H-Alpha plane definition: {}",
                other
            ))),
        }
    }
}

/// Closed-form eigen-decomposition of a Hermitian 2×2, eigenvalues descending.
///
/// Returns `(lambda, |v_i[0]|)`.
fn eigen_2x2(c2: &Matrix2) -> ([f64; 2], [f64; 2]) {
    let a = c2.re[0][0];
    let d = c2.re[1][1];
    let b_sq = c2.re[0][1] * c2.re[0][1] + c2.im[0][1] * c2.im[0][1];

    let half_sum = 0.5 * (a + d);
    let root = (0.25 * (a - d) * (a - d) + b_sq).sqrt();
    let lambda = [half_sum + root, half_sum - root];

    if b_sq.sqrt() <= EPS {
        return if a >= d {
            (lambda, [1.0, 0.0])
        } else {
            (lambda, [0.0, 1.0])
        };
    }

    // eigenvector (b, λ − a), first component magnitude |b| / ‖v‖
    let mut first = [0.0; 2];
    for (i, l) in lambda.iter().enumerate() {
        let second = l - a;
        first[i] = (b_sq / (b_sq + second * second)).sqrt();
    }
    (lambda, first)
}

/// Cloude-Pottier parameters of an averaged dual-pol C2.
///
/// Entropy uses log base 2, the count of eigenvalues of a 2x2 matrix, so it spans [0, 1].
pub fn h_alpha(c2: &Matrix2) -> HAlpha {
    let (lambda, first) = eigen_2x2(c2);
    let lambda = [lambda[0].max(0.0), lambda[1].max(0.0)];
    let total = lambda[0] + lambda[1];

    let mut entropy = 0.0;
    let mut alpha = 0.0;
    for i in 0..2 {
        let p = lambda[i] / total;
        if p > 0.0 {
            entropy -= p * p.log2();
        } else if !p.is_finite() {
            entropy = f64::NAN;
        }
        alpha += p * first[i].clamp(0.0, 1.0).acos().to_degrees();
    }
    let anisotropy = (lambda[0] - lambda[1]) / total;

    HAlpha {
        entropy,
        anisotropy,
        alpha,
    }
}

/// Zone of the (H, α) plane, 1..=8; 0 for the non-feasible zone and non-finite input
pub fn classify(params: &HAlpha, partition: HAlphaPartition) -> u8 {
    if !params.is_finite() {
        return 0;
    }
    let (h, a) = (params.entropy, params.alpha);
    match partition {
        HAlphaPartition::Cloude => {
            if h > 0.9 {
                if a > 55.0 {
                    1
                } else if a > 40.0 {
                    2
                } else {
                    0
                }
            } else if h > 0.5 {
                if a > 50.0 {
                    3
                } else if a > 40.0 {
                    4
                } else {
                    5
                }
            } else if a > 47.5 {
                6
            } else if a > 42.5 {
                7
            } else {
                8
            }
        }
        HAlphaPartition::Lee => {
            if h < 0.5 {
                if a < 42.5 {
                    1
                } else if a < 47.5 {
                    2
                } else {
                    3
                }
            } else if h < 0.9 {
                if a < 40.0 {
                    4
                } else if a < 50.0 {
                    5
                } else {
                    6
                }
            } else if a < 40.0 {
                0
            } else if a < 55.0 {
                7
            } else {
                8
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_single_mechanism() {
        let params = h_alpha(&Matrix2::from_diagonal([25.0, 0.0]));
        assert_abs_diff_eq!(params.entropy, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(params.anisotropy, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(params.alpha, 0.0, epsilon = 1e-9);
        assert_eq!(classify(&params, HAlphaPartition::Cloude), 8);
        assert_eq!(classify(&params, HAlphaPartition::Lee), 1);
    }

    #[test]
    fn test_fully_random() {
        let params = h_alpha(&Matrix2::from_diagonal([1.0, 1.0]));
        assert_abs_diff_eq!(params.entropy, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(params.anisotropy, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(params.alpha, 45.0, epsilon = 1e-9);
        assert_eq!(classify(&params, HAlphaPartition::Cloude), 2);
        assert_eq!(classify(&params, HAlphaPartition::Lee), 7);
    }

    #[test]
    fn test_off_diagonal_eigenvectors() {
        let mut c2 = Matrix2::from_diagonal([2.0, 2.0]);
        c2.re[0][1] = 1.0;
        c2.re[1][0] = 1.0;
        let params = h_alpha(&c2);
        // eigenvalues 3 and 1, both eigenvectors at 45 degrees
        let p0: f64 = 0.75;
        let p1: f64 = 0.25;
        assert_abs_diff_eq!(
            params.entropy,
            -(p0 * p0.log2() + p1 * p1.log2()),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(params.anisotropy, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(params.alpha, 45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_matrix_is_no_data() {
        let params = h_alpha(&Matrix2::zeros());
        assert!(!params.is_finite());
        assert_eq!(classify(&params, HAlphaPartition::Cloude), 0);
        assert_eq!(classify(&params, HAlphaPartition::Lee), 0);
    }
}
