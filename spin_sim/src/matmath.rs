use ndarray::Array2;
use num_complex::Complex64;

use crate::error::{Error, Result};

pub use ndarray::linalg::kron;

/** Returns the identity operator of the given dimension */
pub fn identity(dim: usize) -> Array2<Complex64> {
    Array2::eye(dim)
}

/** Returns the adjoint (conjugate transpose) of a square operator */
pub fn dagger(m: &Array2<Complex64>) -> Array2<Complex64> {
    m.t().mapv(|e| e.conj())
}

/** Returns the trace of a square operator */
pub fn trace(m: &Array2<Complex64>) -> Complex64 {
    (0..m.nrows()).map(|i| m[[i, i]]).sum()
}

/** Largest element-wise magnitude difference between two operators */
pub fn max_abs_diff(a: &Array2<Complex64>, b: &Array2<Complex64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .fold(0.0f64, |max, (x, y)| max.max((x - y).norm()))
}

// Padé(13,13) coefficients from Higham, "The Scaling and Squaring Method for
// the Matrix Exponential Revisited" (2005). Scaling threshold theta_13 from
// table 10.2.
const THETA_13: f64 = 5.371920351148152;

const PADE_13: [f64; 14] = [
    64764752532480000.0,
    32382376266240000.0,
    7771770303897600.0,
    1187353796428800.0,
    129060195264000.0,
    10559470521600.0,
    670442572800.0,
    33522128640.0,
    1323241920.0,
    40840800.0,
    960960.0,
    16380.0,
    182.0,
    1.0,
];

/// Matrix exponential by scaling-and-squaring with a Padé(13) approximant.
/// The Hilbert spaces here are small (2^spins square), so no effort is made
/// to pick lower-order approximants for small norms.
pub fn expm(a: &Array2<Complex64>) -> Result<Array2<Complex64>> {
    let dim = a.nrows();
    if dim != a.ncols() {
        return Err(Error::InvalidArgument(format!(
            "cannot exponentiate a {}x{} matrix",
            a.nrows(),
            a.ncols()
        )));
    }
    if dim == 0 {
        return Err(Error::InvalidDimension(
            "cannot exponentiate an empty matrix".to_string(),
        ));
    }

    // scale A down until its 1-norm is inside the Padé(13) accuracy bound
    let norm = one_norm(a);
    if !norm.is_finite() {
        return Err(Error::NumericInstability(
            "matrix norm is not finite".to_string(),
        ));
    }
    let squarings = if norm > THETA_13 {
        (norm / THETA_13).log2().ceil() as u32
    } else {
        0
    };
    if squarings > 60 {
        return Err(Error::NumericInstability(format!(
            "matrix norm {} is too large to exponentiate",
            norm
        )));
    }
    let scaled = a * Complex64::new(1.0 / (1u64 << squarings) as f64, 0.0);

    let mut result = pade13(&scaled)?;
    for _ in 0..squarings {
        result = result.dot(&result);
    }

    if result.iter().any(|e| !e.re.is_finite() || !e.im.is_finite()) {
        return Err(Error::NumericInstability(
            "matrix exponential produced non-finite entries".to_string(),
        ));
    }
    Ok(result)
}

fn pade13(a: &Array2<Complex64>) -> Result<Array2<Complex64>> {
    let b = PADE_13.map(|coeff| Complex64::new(coeff, 0.0));
    let eye = identity(a.nrows());

    let a2 = a.dot(a);
    let a4 = a2.dot(&a2);
    let a6 = a2.dot(&a4);

    // odd part: U = A (A6 (b13 A6 + b11 A4 + b9 A2) + b7 A6 + b5 A4 + b3 A2 + b1 I)
    let u_inner = &a6 * b[13] + &a4 * b[11] + &a2 * b[9];
    let u = a.dot(&(u_inner.dot(&a6) + &a6 * b[7] + &a4 * b[5] + &a2 * b[3] + &eye * b[1]));

    // even part: V = A6 (b12 A6 + b10 A4 + b8 A2) + b6 A6 + b4 A4 + b2 A2 + b0 I
    let v_inner = &a6 * b[12] + &a4 * b[10] + &a2 * b[8];
    let v = v_inner.dot(&a6) + &a6 * b[6] + &a4 * b[4] + &a2 * b[2] + &eye * b[0];

    // exp(A) ~ (V - U)^-1 (V + U)
    solve(&v - &u, &v + &u)
}

// Gaussian elimination with partial pivoting. A near-zero pivot means the
// Padé denominator is singular, which only happens for a malformed input.
fn solve(mut a: Array2<Complex64>, mut b: Array2<Complex64>) -> Result<Array2<Complex64>> {
    let dim = a.nrows();
    for col in 0..dim {
        let mut pivot_row = col;
        let mut pivot_mag = a[[col, col]].norm();
        for row in col + 1..dim {
            if a[[row, col]].norm() > pivot_mag {
                pivot_mag = a[[row, col]].norm();
                pivot_row = row;
            }
        }
        if pivot_mag < 1e-14 {
            return Err(Error::NumericInstability(
                "singular denominator in matrix exponential".to_string(),
            ));
        }
        if pivot_row != col {
            for j in 0..dim {
                a.swap([col, j], [pivot_row, j]);
                b.swap([col, j], [pivot_row, j]);
            }
        }
        let pivot = a[[col, col]];
        for row in col + 1..dim {
            let factor = a[[row, col]] / pivot;
            for j in col..dim {
                let v = a[[col, j]];
                a[[row, j]] -= factor * v;
            }
            for j in 0..dim {
                let v = b[[col, j]];
                b[[row, j]] -= factor * v;
            }
        }
    }

    let mut x = Array2::<Complex64>::zeros((dim, dim));
    for col in (0..dim).rev() {
        for j in 0..dim {
            let mut sum = b[[col, j]];
            for k in col + 1..dim {
                sum -= a[[col, k]] * x[[k, j]];
            }
            x[[col, j]] = sum / a[[col, col]];
        }
    }
    Ok(x)
}

fn one_norm(a: &Array2<Complex64>) -> f64 {
    let mut max_col = 0.0f64;
    for col in a.columns() {
        let sum: f64 = col.iter().map(|e| e.norm()).sum();
        max_col = max_col.max(sum);
    }
    max_col
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expm_of_zero_is_identity() {
        let zero = Array2::<Complex64>::zeros((4, 4));
        let result = expm(&zero).unwrap();
        assert!(max_abs_diff(&result, &identity(4)) < 1e-14);
    }

    #[test]
    fn expm_of_diagonal_exponentiates_the_diagonal() {
        let mut a = Array2::<Complex64>::zeros((2, 2));
        a[[0, 0]] = Complex64::new(1.0, 0.0);
        a[[1, 1]] = Complex64::new(-2.0, 0.5);
        let result = expm(&a).unwrap();
        assert!((result[[0, 0]] - Complex64::new(1.0, 0.0).exp()).norm() < 1e-12);
        assert!((result[[1, 1]] - Complex64::new(-2.0, 0.5).exp()).norm() < 1e-12);
        assert!(result[[0, 1]].norm() < 1e-14);
        assert!(result[[1, 0]].norm() < 1e-14);
    }

    #[test]
    fn expm_of_anti_hermitian_is_unitary() {
        // exp(-iH) for hermitian H
        let mut h = Array2::<Complex64>::zeros((4, 4));
        h[[0, 1]] = Complex64::new(0.3, 0.7);
        h[[1, 0]] = Complex64::new(0.3, -0.7);
        h[[2, 2]] = Complex64::new(1.2, 0.0);
        h[[2, 3]] = Complex64::new(0.0, 0.4);
        h[[3, 2]] = Complex64::new(0.0, -0.4);
        let u = expm(&(&h * Complex64::new(0.0, -1.0))).unwrap();
        let product = u.dot(&dagger(&u));
        assert!(max_abs_diff(&product, &identity(4)) < 1e-12);
    }

    #[test]
    fn expm_with_large_norm_scales_and_squares() {
        let mut a = Array2::<Complex64>::zeros((2, 2));
        a[[0, 0]] = Complex64::new(20.0, 0.0);
        a[[1, 1]] = Complex64::new(-20.0, 0.0);
        let result = expm(&a).unwrap();
        let big = 20.0f64.exp();
        assert!((result[[0, 0]].re - big).abs() / big < 1e-10);
        assert!((result[[1, 1]].re - (-20.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn expm_rejects_non_square_input() {
        let a = Array2::<Complex64>::zeros((2, 3));
        assert!(matches!(expm(&a), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn expm_matches_single_spin_rotation() {
        // exp(-i theta/2 sigma_x) has the closed form
        // [[cos(t/2), -i sin(t/2)], [-i sin(t/2), cos(t/2)]]
        let theta = std::f64::consts::FRAC_PI_2;
        let mut gen = Array2::<Complex64>::zeros((2, 2));
        gen[[0, 1]] = Complex64::new(0.0, -theta / 2.0);
        gen[[1, 0]] = Complex64::new(0.0, -theta / 2.0);
        let u = expm(&gen).unwrap();
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        assert!((u[[0, 0]] - Complex64::new(c, 0.0)).norm() < 1e-12);
        assert!((u[[0, 1]] - Complex64::new(0.0, -s)).norm() < 1e-12);
        assert!((u[[1, 0]] - Complex64::new(0.0, -s)).norm() < 1e-12);
        assert!((u[[1, 1]] - Complex64::new(c, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn trace_sums_the_diagonal() {
        let mut a = Array2::<Complex64>::zeros((3, 3));
        a[[0, 0]] = Complex64::new(1.0, 1.0);
        a[[1, 1]] = Complex64::new(2.0, -0.5);
        a[[2, 2]] = Complex64::new(-3.0, 0.0);
        a[[0, 2]] = Complex64::new(9.0, 9.0);
        assert_eq!(trace(&a), Complex64::new(0.0, 0.5));
    }

    #[test]
    fn kron_builds_the_product_space() {
        let a = identity(2);
        let mut b = Array2::<Complex64>::zeros((2, 2));
        b[[0, 1]] = Complex64::new(1.0, 0.0);
        b[[1, 0]] = Complex64::new(1.0, 0.0);
        let k = kron(&a, &b);
        assert_eq!(k.nrows(), 4);
        assert_eq!(k[[0, 1]], Complex64::new(1.0, 0.0));
        assert_eq!(k[[2, 3]], Complex64::new(1.0, 0.0));
        assert_eq!(k[[0, 3]], Complex64::new(0.0, 0.0));
    }
}
