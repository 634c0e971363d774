use super::ScatteringPowers;
use crate::core::matrix::Matrix3;
use crate::types::EPS;

/// Three-component Freeman-Durden model fit on the averaged C3.
///
/// The volume term comes from `C22`; its contribution is removed from `C11`, `C13` and
/// `C33` and the remainder is split between surface and double-bounce scattering,
/// fixing `β = 1` when `Re C13 < 0` and `α = −1` otherwise.
pub fn freeman_durden(c3: &Matrix3) -> ScatteringPowers {
    let fv = 4.0 * c3.re[1][1];
    let c11 = c3.re[0][0] - fv * 3.0 / 8.0;
    let mut c13_re = c3.re[0][2] - fv / 8.0;
    let mut c13_im = c3.im[0][2];
    let c33 = c3.re[2][2] - fv * 3.0 / 8.0;
    let a1 = c11 * c33;

    let (fs, fd, alpha_sq, beta_sq) = if c11 <= EPS || c33 <= EPS {
        (0.0, 0.0, 0.0, 0.0)
    } else {
        // keep |C13|² within the Cauchy-Schwarz bound C11·C33
        let a2 = c13_re * c13_re + c13_im * c13_im;
        if a1 < a2 {
            let scale = (a1 / a2).sqrt();
            c13_re *= scale;
            c13_im *= scale;
        }
        let c13_sq = c13_re * c13_re + c13_im * c13_im;

        if c13_re < 0.0 {
            // surface dominant: beta = 1
            let fs = ((a1 - c13_sq) / (c11 + c33 - 2.0 * c13_re)).abs();
            let fd = (c33 - fs).abs();
            let alpha_re = (c13_re - fs) / fd;
            let alpha_im = c13_im / fd;
            (fs, fd, alpha_re * alpha_re + alpha_im * alpha_im, 1.0)
        } else {
            // double-bounce dominant: alpha = -1
            let fd = ((a1 - c13_sq) / (c11 + c33 + 2.0 * c13_re)).abs();
            let fs = (c33 - fd).abs();
            let beta_re = (c13_re + fd) / fs;
            let beta_im = c13_im / fs;
            (fs, fd, 1.0, beta_re * beta_re + beta_im * beta_im)
        }
    };

    let ps = fs * (1.0 + beta_sq);
    let pd = fd * (1.0 + alpha_sq);

    ScatteringPowers {
        surface: finite_non_negative(ps),
        double_bounce: finite_non_negative(pd),
        volume: finite_non_negative(fv),
        helix: 0.0,
    }
}

pub(super) fn finite_non_negative(v: f64) -> f64 {
    if v.is_finite() {
        v.max(0.0)
    } else {
        0.0
    }
}
