use super::RgbPowers;
use crate::core::matrix::Matrix3;

/// Pauli powers from the averaged C3: `|HH−VV|²/2`, `|HV+VH|²/2`, `|HH+VV|²/2`
pub fn pauli(c3: &Matrix3) -> RgbPowers {
    RgbPowers {
        r: 0.5 * (c3.re[0][0] - 2.0 * c3.re[0][2] + c3.re[2][2]),
        g: c3.re[1][1],
        b: 0.5 * (c3.re[0][0] + 2.0 * c3.re[0][2] + c3.re[2][2]),
    }
}
