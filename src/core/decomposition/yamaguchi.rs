use super::freeman_durden::{finite_non_negative, freeman_durden};
use super::ScatteringPowers;
use crate::core::matrix::{c3_to_t3, Matrix3};

/// Four-component Yamaguchi decomposition with helix term.
///
/// Falls back to Freeman-Durden (helix forced to zero) when the volume estimate is
/// not positive.
pub fn yamaguchi(c3: &Matrix3) -> ScatteringPowers {
    let t3 = c3_to_t3(c3);
    let span = t3.trace();
    let pc = 2.0 * t3.im[1][2].abs();
    let ratio = 10.0 * (c3.re[2][2] / c3.re[0][0]).log10();

    let (k1, k2, k3) = if ratio <= -2.0 {
        (1.0 / 6.0, 7.0 / 30.0, 4.0 / 15.0)
    } else if ratio > 2.0 {
        (-1.0 / 6.0, 7.0 / 30.0, 4.0 / 15.0)
    } else {
        (0.0, 1.0 / 4.0, 1.0 / 4.0)
    };

    let pv = (t3.re[2][2] - 0.5 * pc) / k3;
    if pv <= 0.0 || !pv.is_finite() {
        return freeman_durden(c3);
    }

    let (ps, pd, pv) = if pv + pc < span {
        let s = t3.re[0][0] - 0.5 * pv;
        let d = t3.re[1][1] - k2 * pv - 0.5 * pc;
        let c_re = t3.re[0][1] - k1 * pv;
        let c_im = t3.im[0][1];
        let c_sq = c_re * c_re + c_im * c_im;

        let c0 = c3.re[0][2] - 0.5 * c3.re[1][1] + 0.5 * pc;
        let (ps, pd) = if c0 < 0.0 {
            (s - c_sq / d, d + c_sq / d)
        } else {
            (s + c_sq / s, d - c_sq / s)
        };

        if !ps.is_finite() || !pd.is_finite() {
            (0.0, 0.0, span - pc)
        } else if ps > 0.0 && pd < 0.0 {
            (span - pv - pc, 0.0, pv)
        } else if ps < 0.0 && pd > 0.0 {
            (0.0, span - pv - pc, pv)
        } else if ps < 0.0 && pd < 0.0 {
            (0.0, 0.0, span - pc)
        } else {
            (ps, pd, pv)
        }
    } else {
        (0.0, 0.0, span - pc)
    };

    ScatteringPowers {
        surface: finite_non_negative(ps),
        double_bounce: finite_non_negative(pd),
        volume: finite_non_negative(pv),
        helix: finite_non_negative(pc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Reflection-symmetric C3 with a real HH-VV correlation
    fn c3(c11: f64, c22: f64, c33: f64, c13: f64) -> Matrix3 {
        let mut c3 = Matrix3::from_diagonal([c11, c22, c33]);
        c3.re[0][2] = c13;
        c3.re[2][0] = c13;
        c3
    }

    fn assert_powers(y: ScatteringPowers, surface: f64, double_bounce: f64, volume: f64) {
        assert_relative_eq!(y.surface, surface, epsilon = 1e-12);
        assert_relative_eq!(y.double_bounce, double_bounce, epsilon = 1e-12);
        assert_relative_eq!(y.volume, volume, epsilon = 1e-12);
        assert_eq!(y.helix, 0.0);
    }

    #[test]
    fn test_double_bounce_dominant_correlation() {
        // T11 = T22 = 2.25, T33 = 0.5, Re T12 = 0.25, C0 = -0.25
        assert_powers(yamaguchi(&c3(2.5, 0.5, 2.0, 0.0)), 17.0 / 14.0, 25.0 / 14.0, 2.0);
    }

    #[test]
    fn test_surface_dominant_correlation() {
        // C0 = 0.25 selects the surface branch
        assert_powers(yamaguchi(&c3(2.5, 0.5, 2.0, 0.5)), 25.0 / 14.0, 17.0 / 14.0, 2.0);
    }

    #[test]
    fn test_negative_double_bounce_goes_to_surface() {
        // raw Pd is negative, the remaining power moves to Ps
        assert_powers(yamaguchi(&c3(2.5, 0.5, 2.0, 2.0)), 3.0, 0.0, 2.0);
    }

    #[test]
    fn test_negative_surface_goes_to_double_bounce() {
        assert_powers(yamaguchi(&c3(2.5, 0.5, 2.0, -2.0)), 0.0, 3.0, 2.0);
    }

    #[test]
    fn test_asymmetric_volume_model() {
        // C33 / C11 above +2 dB: k1 = -1/6, k2 = 7/30, k3 = 4/15
        let y = yamaguchi(&c3(1.0, 0.4, 2.0, 0.0));
        let c_sq = 0.0625;
        assert_powers(y, 0.75 - c_sq / 1.15, 1.15 + c_sq / 1.15, 1.5);
    }

    #[test]
    fn test_powers_sum_to_span() {
        for (c11, c22, c33, c13) in [
            (2.5, 0.5, 2.0, 0.0),
            (2.5, 0.5, 2.0, 0.5),
            (2.5, 0.5, 2.0, 2.0),
            (2.5, 0.5, 2.0, -2.0),
            (1.0, 0.4, 2.0, 0.0),
            (3.0, 0.2, 0.5, 0.3),
        ] {
            let y = yamaguchi(&c3(c11, c22, c33, c13));
            assert_relative_eq!(
                y.surface + y.double_bounce + y.volume + y.helix,
                c11 + c22 + c33,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_fallback_matches_freeman_durden() {
        // no cross-pol power: T33 = 0 gives Pv = 0
        let mut c3 = Matrix3::from_diagonal([2.0, 0.0, 1.0]);
        c3.re[0][2] = 0.6;
        c3.re[2][0] = 0.6;
        let y = yamaguchi(&c3);
        let fd = freeman_durden(&c3);
        assert_eq!(y.helix, 0.0);
        assert_eq!(y, fd);
    }

    #[test]
    fn test_volume_dominated_keeps_span() {
        let c3 = Matrix3::from_diagonal([1.0, 1.0, 1.0]);
        let y = yamaguchi(&c3);
        assert!(y.surface >= 0.0 && y.double_bounce >= 0.0 && y.volume > 0.0);
        assert_relative_eq!(
            y.surface + y.double_bounce + y.volume + y.helix,
            3.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_helix_term() {
        let mut c3 = Matrix3::from_diagonal([1.0, 0.5, 1.0]);
        c3.im[0][1] = 0.1;
        c3.im[1][0] = -0.1;
        c3.im[1][2] = 0.1;
        c3.im[2][1] = -0.1;
        let y = yamaguchi(&c3);
        let t3 = c3_to_t3(&c3);
        assert_relative_eq!(y.helix, 2.0 * t3.im[1][2].abs(), epsilon = 1e-12);
        assert!(y.surface >= 0.0 && y.double_bounce >= 0.0 && y.volume >= 0.0);
    }

    #[test]
    fn test_all_zero_is_zero() {
        let y = yamaguchi(&Matrix3::zeros());
        assert_eq!(y.surface + y.double_bounce + y.volume + y.helix, 0.0);
    }
}
