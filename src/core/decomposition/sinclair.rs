use super::{DualPowers, RgbPowers};
use crate::core::matrix::{Matrix2, Matrix3};

/// Sinclair colour composite: `|VV|²`, `|HV+VH|²/4`, `|HH|²`
pub fn sinclair(c3: &Matrix3) -> RgbPowers {
    RgbPowers {
        r: c3.re[2][2],
        g: 0.5 * c3.re[1][1],
        b: c3.re[0][0],
    }
}

/// Two-channel composite for dual-pol and compact-pol data
pub fn sinclair_dual(c2: &Matrix2) -> DualPowers {
    DualPowers {
        r: c2.re[1][1],
        b: c2.re[0][0],
    }
}
