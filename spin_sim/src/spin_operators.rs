use ndarray::{array, Array2};
use num_complex::Complex64;
use std::f64::consts::PI;

use crate::error::{Error, Result};
use crate::matmath::{expm, identity, kron};
use crate::spin::SpinSystem;

// Operators live in the fixed product basis |m1 m2 .. mN>, alpha (m = +1/2)
// before beta per spin, spin 0 on the most significant position. The
// Hamiltonian is built in angular-frequency units so propagators are
// exp(-i H t) with t in seconds.

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

fn ix_single() -> Array2<Complex64> {
    array![[c(0.0, 0.0), c(0.5, 0.0)], [c(0.5, 0.0), c(0.0, 0.0)]]
}

fn iy_single() -> Array2<Complex64> {
    array![[c(0.0, 0.0), c(0.0, -0.5)], [c(0.0, 0.5), c(0.0, 0.0)]]
}

fn iz_single() -> Array2<Complex64> {
    array![[c(0.5, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(-0.5, 0.0)]]
}

fn lowering_single() -> Array2<Complex64> {
    // I- = Ix - i Iy
    array![[c(0.0, 0.0), c(0.0, 0.0)], [c(1.0, 0.0), c(0.0, 0.0)]]
}

/** Embeds a single-spin operator at position k of an n-spin product space */
fn embedded(n_spins: usize, k: usize, op: &Array2<Complex64>) -> Array2<Complex64> {
    let mut m = identity(1);
    for i in 0..n_spins {
        m = if i == k {
            kron(&m, op)
        } else {
            kron(&m, &identity(2))
        };
    }
    m
}

fn check_spins(sys: &SpinSystem) -> Result<()> {
    if sys.n_spins() == 0 {
        return Err(Error::InvalidDimension(
            "spin system has no spins".to_string(),
        ));
    }
    Ok(())
}

fn total(sys: &SpinSystem, op: &Array2<Complex64>) -> Array2<Complex64> {
    let n = sys.n_spins();
    let mut sum = Array2::<Complex64>::zeros((sys.dim(), sys.dim()));
    for k in 0..n {
        sum = sum + &embedded(n, k, op);
    }
    sum
}

pub fn fx(sys: &SpinSystem) -> Result<Array2<Complex64>> {
    check_spins(sys)?;
    Ok(total(sys, &ix_single()))
}

pub fn fy(sys: &SpinSystem) -> Result<Array2<Complex64>> {
    check_spins(sys)?;
    Ok(total(sys, &iy_single()))
}

pub fn fz(sys: &SpinSystem) -> Result<Array2<Complex64>> {
    check_spins(sys)?;
    Ok(total(sys, &iz_single()))
}

/// Isotropic static Hamiltonian: chemical-shift offsets plus scalar
/// couplings, H = sum_i 2pi v_i Iz(i) + sum_i<j 2pi J_ij I(i).I(j), rad/s.
pub fn hamiltonian(sys: &SpinSystem) -> Result<Array2<Complex64>> {
    check_spins(sys)?;
    let n = sys.n_spins();
    let dim = sys.dim();
    let two_pi = 2.0 * PI;

    let mut h = Array2::<Complex64>::zeros((dim, dim));
    for k in 0..n {
        h = h + &(embedded(n, k, &iz_single()) * c(two_pi * sys.shifts_hz[k], 0.0));
    }
    for i in 0..n {
        for j in i + 1..n {
            let j_hz = sys.coupling_hz(i, j);
            if j_hz == 0.0 {
                continue;
            }
            let dot = embedded(n, i, &ix_single()).dot(&embedded(n, j, &ix_single()))
                + embedded(n, i, &iy_single()).dot(&embedded(n, j, &iy_single()))
                + embedded(n, i, &iz_single()).dot(&embedded(n, j, &iz_single()));
            h = h + &(dot * c(two_pi * j_hz, 0.0));
        }
    }
    Ok(h)
}

/// Thermal-equilibrium density operator in the high-temperature limit: net
/// longitudinal polarization, diagonal in the product basis.
pub fn sigma_eq(sys: &SpinSystem) -> Result<Array2<Complex64>> {
    fz(sys)
}

/// Detection operator for quadrature acquisition, the total transverse
/// lowering operator F- = sum_i (Ix(i) - i Iy(i)).
pub fn detection(sys: &SpinSystem) -> Result<Array2<Complex64>> {
    check_spins(sys)?;
    Ok(total(sys, &lowering_single()))
}

/// Unitary for an ideal RF pulse of the given flip angle about an axis in
/// the transverse plane. Phase 0 is x, phase 90 is y. Both arguments are in
/// degrees.
pub fn rotation(sys: &SpinSystem, angle_deg: f64, phase_deg: f64) -> Result<Array2<Complex64>> {
    check_spins(sys)?;
    if !angle_deg.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "pulse angle must be finite, got {}",
            angle_deg
        )));
    }
    if !phase_deg.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "pulse phase must be finite, got {}",
            phase_deg
        )));
    }
    let theta = angle_deg.to_radians();
    let phi = phase_deg.to_radians();
    let axis = fx(sys)? * c(phi.cos(), 0.0) + fy(sys)? * c(phi.sin(), 0.0);
    expm(&(axis * c(0.0, -theta)))
}
