use num_complex::Complex64;
use num_traits::Zero;
use std::f64::consts::FRAC_1_SQRT_2;

/// Fixed-size complex matrix stored as separate real and imaginary parts.
///
/// Covariance and coherency matrices built by this crate are Hermitian
/// (`M[i][j] == conj(M[j][i])` with a real diagonal); correlation matrices
/// between two acquisitions are not.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplexMatrix<const N: usize> {
    pub re: [[f64; N]; N],
    pub im: [[f64; N]; N],
}

pub type Matrix2 = ComplexMatrix<2>;
pub type Matrix3 = ComplexMatrix<3>;
pub type Matrix4 = ComplexMatrix<4>;

impl<const N: usize> Default for ComplexMatrix<N> {
    fn default() -> Self {
        Self::zeros()
    }
}

impl<const N: usize> ComplexMatrix<N> {
    pub fn zeros() -> Self {
        Self {
            re: [[0.0; N]; N],
            im: [[0.0; N]; N],
        }
    }

    /// Real diagonal matrix
    pub fn from_diagonal(diag: [f64; N]) -> Self {
        let mut m = Self::zeros();
        for (i, &d) in diag.iter().enumerate() {
            m.re[i][i] = d;
        }
        m
    }

    pub fn get(&self, i: usize, j: usize) -> Complex64 {
        Complex64::new(self.re[i][j], self.im[i][j])
    }

    pub fn set(&mut self, i: usize, j: usize, value: Complex64) {
        self.re[i][j] = value.re;
        self.im[i][j] = value.im;
    }

    /// Element-wise `self += other`
    pub fn plus_equals(&mut self, other: &Self) {
        for i in 0..N {
            for j in 0..N {
                self.re[i][j] += other.re[i][j];
                self.im[i][j] += other.im[i][j];
            }
        }
    }

    /// Element-wise `self *= scale`
    pub fn times_equals(&mut self, scale: f64) {
        for i in 0..N {
            for j in 0..N {
                self.re[i][j] *= scale;
                self.im[i][j] *= scale;
            }
        }
    }

    /// Sum of the real diagonal (span for covariance/coherency matrices)
    pub fn trace(&self) -> f64 {
        (0..N).map(|i| self.re[i][i]).sum()
    }

    /// Rebuild the lower triangle from the upper one and zero the diagonal imaginary parts
    pub fn symmetrize_hermitian(&mut self) {
        for i in 0..N {
            self.im[i][i] = 0.0;
            for j in (i + 1)..N {
                self.re[j][i] = self.re[i][j];
                self.im[j][i] = -self.im[i][j];
            }
        }
    }

    /// Exact (bitwise on values) Hermitian check
    pub fn is_hermitian(&self) -> bool {
        for i in 0..N {
            if self.im[i][i] != 0.0 {
                return false;
            }
            for j in (i + 1)..N {
                if self.re[j][i] != self.re[i][j] || self.im[j][i] != -self.im[i][j] {
                    return false;
                }
            }
        }
        true
    }

    pub fn is_finite(&self) -> bool {
        self.re.iter().flatten().all(|v| v.is_finite())
            && self.im.iter().flatten().all(|v| v.is_finite())
    }
}

/// Hermitian outer product `k · kᴴ` of a scattering vector
pub fn covariance_from_vector<const N: usize>(k: &[Complex64; N]) -> ComplexMatrix<N> {
    let mut c = ComplexMatrix::zeros();
    for i in 0..N {
        c.re[i][i] = k[i].norm_sqr();
        for j in (i + 1)..N {
            let v = k[i] * k[j].conj();
            c.re[i][j] = v.re;
            c.im[i][j] = v.im;
        }
    }
    c.symmetrize_hermitian();
    c
}

/// Cross product `k1 · k2ᴴ` of two scattering vectors from distinct acquisitions
pub fn correlation_from_vectors<const N: usize>(
    k1: &[Complex64; N],
    k2: &[Complex64; N],
) -> ComplexMatrix<N> {
    let mut c = ComplexMatrix::zeros();
    for i in 0..N {
        for j in 0..N {
            c.set(i, j, k1[i] * k2[j].conj());
        }
    }
    c
}

/// `A · M · Aᴴ` for an `M×N` transform `A`, result made exactly Hermitian
pub fn congruence<const N: usize, const M: usize>(
    a: &[[Complex64; N]; M],
    m: &ComplexMatrix<N>,
) -> ComplexMatrix<M> {
    // A · M
    let mut am = [[Complex64::zero(); N]; M];
    for p in 0..M {
        for j in 0..N {
            let mut acc = Complex64::zero();
            for i in 0..N {
                acc += a[p][i] * m.get(i, j);
            }
            am[p][j] = acc;
        }
    }

    let mut out = ComplexMatrix::<M>::zeros();
    for p in 0..M {
        for q in p..M {
            let mut acc = Complex64::zero();
            for j in 0..N {
                acc += am[p][j] * a[q][j].conj();
            }
            out.set(p, q, acc);
        }
    }
    out.symmetrize_hermitian();
    out
}

fn adjoint<const N: usize, const M: usize>(a: &[[Complex64; N]; M]) -> [[Complex64; M]; N] {
    let mut out = [[Complex64::zero(); M]; N];
    for p in 0..M {
        for q in 0..N {
            out[q][p] = a[p][q].conj();
        }
    }
    out
}

fn real(v: f64) -> Complex64 {
    Complex64::new(v, 0.0)
}

/// Lexicographic-to-Pauli transform for 3-element target vectors
fn pauli_transform_3() -> [[Complex64; 3]; 3] {
    let s = FRAC_1_SQRT_2;
    [
        [real(s), real(0.0), real(s)],
        [real(s), real(0.0), real(-s)],
        [real(0.0), real(1.0), real(0.0)],
    ]
}

/// Lexicographic-to-Pauli transform for 4-element target vectors
fn pauli_transform_4() -> [[Complex64; 4]; 4] {
    let s = FRAC_1_SQRT_2;
    let z = real(0.0);
    [
        [real(s), z, z, real(s)],
        [real(s), z, z, real(-s)],
        [z, real(s), real(s), z],
        [z, Complex64::new(0.0, s), Complex64::new(0.0, -s), z],
    ]
}

pub fn c3_to_t3(c3: &Matrix3) -> Matrix3 {
    congruence(&pauli_transform_3(), c3)
}

pub fn t3_to_c3(t3: &Matrix3) -> Matrix3 {
    congruence(&adjoint(&pauli_transform_3()), t3)
}

pub fn c4_to_t4(c4: &Matrix4) -> Matrix4 {
    congruence(&pauli_transform_4(), c4)
}

pub fn t4_to_c4(t4: &Matrix4) -> Matrix4 {
    congruence(&adjoint(&pauli_transform_4()), t4)
}

/// Reciprocal reduction of C4 (HH, HV, VH, VV) to C3 (HH, (HV+VH)/√2, VV)
pub fn c4_to_c3(c4: &Matrix4) -> Matrix3 {
    let s = FRAC_1_SQRT_2;
    let z = real(0.0);
    let a = [
        [real(1.0), z, z, z],
        [z, real(s), real(s), z],
        [z, z, z, real(1.0)],
    ];
    congruence(&a, c4)
}

/// T3 is the upper-left block of T4
pub fn t4_to_t3(t4: &Matrix4) -> Matrix3 {
    let mut t3 = Matrix3::zeros();
    for i in 0..3 {
        for j in 0..3 {
            t3.re[i][j] = t4.re[i][j];
            t3.im[i][j] = t4.im[i][j];
        }
    }
    t3
}

/// Complex 2×2 scattering matrix of one pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterMatrix {
    pub hh: Complex64,
    pub hv: Complex64,
    pub vh: Complex64,
    pub vv: Complex64,
}

impl ScatterMatrix {
    /// `[HH, (HV+VH)/√2, VV]`
    pub fn lexicographic3(&self) -> [Complex64; 3] {
        [self.hh, (self.hv + self.vh) * FRAC_1_SQRT_2, self.vv]
    }

    /// `[HH, HV, VH, VV]`
    pub fn lexicographic4(&self) -> [Complex64; 4] {
        [self.hh, self.hv, self.vh, self.vv]
    }

    /// `[HH+VV, HH−VV, HV+VH] / √2`
    pub fn pauli3(&self) -> [Complex64; 3] {
        [
            (self.hh + self.vv) * FRAC_1_SQRT_2,
            (self.hh - self.vv) * FRAC_1_SQRT_2,
            (self.hv + self.vh) * FRAC_1_SQRT_2,
        ]
    }

    /// `[HH+VV, HH−VV, HV+VH, i(HV−VH)] / √2`
    pub fn pauli4(&self) -> [Complex64; 4] {
        let i = Complex64::new(0.0, 1.0);
        [
            (self.hh + self.vv) * FRAC_1_SQRT_2,
            (self.hh - self.vv) * FRAC_1_SQRT_2,
            (self.hv + self.vh) * FRAC_1_SQRT_2,
            i * (self.hv - self.vh) * FRAC_1_SQRT_2,
        ]
    }
}
