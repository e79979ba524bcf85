use ndarray::Array2;
use num_complex::Complex64;
use std::f64::consts::PI;

use crate::error::{Error, Result};
use crate::matmath::{dagger, expm, trace};
use crate::spin::SpinSystem;
use crate::spin_operators::rotation;

/// Unitary free-precession propagator exp(-i H t) for a Hamiltonian in
/// angular-frequency units. A zero duration yields the identity.
pub fn propagator(h: &Array2<Complex64>, duration: f64) -> Result<Array2<Complex64>> {
    if !duration.is_finite() || duration < 0.0 {
        return Err(Error::InvalidArgument(format!(
            "propagator duration must be finite and non-negative, got {}",
            duration
        )));
    }
    expm(&(h * Complex64::new(0.0, -duration)))
}

/// Evolves a density operator through a unitary: U rho U-adjoint. Every
/// state change in the simulation goes through here.
pub fn apply(u: &Array2<Complex64>, rho: &Array2<Complex64>) -> Array2<Complex64> {
    u.dot(rho).dot(&dagger(u))
}

/// trace(rho O), the observable value against the current state
pub fn expectation(rho: &Array2<Complex64>, op: &Array2<Complex64>) -> Complex64 {
    trace(&rho.dot(op))
}

/// Plays an amplitude-modulated RF waveform as a train of piecewise-constant
/// rotations: for each sample, rotate by sample * calibration * 180/pi
/// degrees about the fixed phase axis, then free-evolve for one dwell. The
/// rotate-then-evolve order is what makes this a first-order discretization
/// of the continuous pulse. An empty waveform returns the state unchanged.
pub fn shaped_pulse(
    sys: &SpinSystem,
    rho: &Array2<Complex64>,
    h: &Array2<Complex64>,
    waveform: &[f32],
    dwell: f64,
    calibration: f64,
    phase_deg: f64,
) -> Result<Array2<Complex64>> {
    if waveform.is_empty() {
        return Ok(rho.clone());
    }
    if !dwell.is_finite() || dwell <= 0.0 {
        return Err(Error::InvalidArgument(format!(
            "waveform dwell must be finite and positive, got {}",
            dwell
        )));
    }
    if !calibration.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "calibration factor must be finite, got {}",
            calibration
        )));
    }

    // the dwell propagator is constant across the train
    let u_dwell = propagator(h, dwell)?;
    let mut sigma = rho.clone();
    for (i, sample) in waveform.iter().enumerate() {
        let angle = *sample as f64 * calibration * 180.0 / PI;
        let u_rot = rotation(sys, angle, phase_deg)
            .map_err(|e| e.context(&format!("waveform sample {}", i)))?;
        sigma = apply(&u_rot, &sigma);
        sigma = apply(&u_dwell, &sigma);
    }
    Ok(sigma)
}

/// Synthesizes the detected FID: starting from the terminal density
/// operator, record trace(rho detect) then evolve by one acquisition dwell,
/// n_samples times. Sample 0 is taken before any acquisition-window
/// evolution.
pub fn fid(
    rho: &Array2<Complex64>,
    detect: &Array2<Complex64>,
    h: &Array2<Complex64>,
    dwell: f64,
    n_samples: usize,
) -> Result<Vec<Complex64>> {
    if !dwell.is_finite() || dwell <= 0.0 {
        return Err(Error::InvalidArgument(format!(
            "acquisition dwell must be finite and positive, got {}",
            dwell
        )));
    }
    if n_samples == 0 {
        return Ok(Vec::new());
    }
    // one propagator reused for every dwell step
    let u_dwell = propagator(h, dwell)?;
    let mut sigma = rho.clone();
    let mut data = Vec::<Complex64>::with_capacity(n_samples);
    for _ in 0..n_samples {
        data.push(expectation(&sigma, detect));
        sigma = apply(&u_dwell, &sigma);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matmath::{identity, max_abs_diff};
    use crate::spin_operators::{detection, hamiltonian, sigma_eq};

    fn test_system() -> SpinSystem {
        SpinSystem::two_spin(63.0, -45.0, 7.35).unwrap()
    }

    fn excited_state(sys: &SpinSystem) -> Array2<Complex64> {
        let u = rotation(sys, 90.0, 90.0).unwrap();
        apply(&u, &sigma_eq(sys).unwrap())
    }

    #[test]
    fn zero_duration_propagator_is_the_identity() {
        let sys = test_system();
        let h = hamiltonian(&sys).unwrap();
        let u = propagator(&h, 0.0).unwrap();
        assert!(max_abs_diff(&u, &identity(4)) < 1e-14);
    }

    #[test]
    fn propagator_is_unitary() {
        let sys = test_system();
        let h = hamiltonian(&sys).unwrap();
        let u = propagator(&h, 0.0123).unwrap();
        assert!(max_abs_diff(&u.dot(&dagger(&u)), &identity(4)) < 1e-12);
    }

    #[test]
    fn negative_durations_are_rejected() {
        let sys = test_system();
        let h = hamiltonian(&sys).unwrap();
        assert!(matches!(
            propagator(&h, -1e-6),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            propagator(&h, f64::NAN),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn apply_preserves_trace_and_hermiticity() {
        let sys = test_system();
        let h = hamiltonian(&sys).unwrap();
        let rho = excited_state(&sys);
        let u = propagator(&h, 0.004).unwrap();
        let evolved = apply(&u, &rho);
        assert!((trace(&evolved) - trace(&rho)).norm() < 1e-12);
        assert!(max_abs_diff(&evolved, &dagger(&evolved)) < 1e-12);
    }

    #[test]
    fn apply_with_the_identity_is_a_no_op() {
        let sys = test_system();
        let rho = excited_state(&sys);
        let same = apply(&identity(4), &rho);
        assert!(max_abs_diff(&same, &rho) < 1e-15);
    }

    #[test]
    fn zero_waveform_matches_pure_free_evolution() {
        let sys = test_system();
        let h = hamiltonian(&sys).unwrap();
        let rho = excited_state(&sys);
        let dwell = 32e-6;

        let pulsed = shaped_pulse(&sys, &rho, &h, &[0.0; 5], dwell, 1.0, 0.0).unwrap();

        let u = propagator(&h, dwell).unwrap();
        let mut free = rho.clone();
        for _ in 0..5 {
            free = apply(&u, &free);
        }
        assert!(max_abs_diff(&pulsed, &free) < 1e-12);
    }

    #[test]
    fn empty_waveform_is_a_no_op() {
        let sys = test_system();
        let h = hamiltonian(&sys).unwrap();
        let rho = excited_state(&sys);
        let same = shaped_pulse(&sys, &rho, &h, &[], 32e-6, 1.0, 0.0).unwrap();
        assert!(max_abs_diff(&same, &rho) < 1e-15);
    }

    #[test]
    fn shaped_pulse_rejects_bad_dwell() {
        let sys = test_system();
        let h = hamiltonian(&sys).unwrap();
        let rho = excited_state(&sys);
        assert!(matches!(
            shaped_pulse(&sys, &rho, &h, &[0.1], 0.0, 1.0, 0.0),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn shaped_pulse_diagnostic_names_the_sample() {
        let sys = test_system();
        let h = hamiltonian(&sys).unwrap();
        let rho = excited_state(&sys);
        let err = shaped_pulse(&sys, &rho, &h, &[0.0, f32::NAN], 32e-6, 1.0, 0.0).unwrap_err();
        assert!(err.to_string().contains("waveform sample 1"));
    }

    #[test]
    fn fid_with_no_samples_is_empty() {
        let sys = test_system();
        let h = hamiltonian(&sys).unwrap();
        let rho = excited_state(&sys);
        let detect = detection(&sys).unwrap();
        assert!(fid(&rho, &detect, &h, 2e-4, 0).unwrap().is_empty());
    }

    #[test]
    fn single_sample_fid_is_the_initial_expectation() {
        let sys = test_system();
        let h = hamiltonian(&sys).unwrap();
        let rho = excited_state(&sys);
        let detect = detection(&sys).unwrap();
        let data = fid(&rho, &detect, &h, 2e-4, 1).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0], expectation(&rho, &detect));
    }

    #[test]
    fn excited_state_produces_signal() {
        let sys = test_system();
        let h = hamiltonian(&sys).unwrap();
        let rho = excited_state(&sys);
        let detect = detection(&sys).unwrap();
        let data = fid(&rho, &detect, &h, 2e-4, 16).unwrap();
        assert_eq!(data.len(), 16);
        // a 90-degree pulse tips the polarization into the transverse plane
        assert!(data[0].norm() > 0.1);
    }

    #[test]
    fn fid_is_deterministic() {
        let sys = test_system();
        let h = hamiltonian(&sys).unwrap();
        let rho = excited_state(&sys);
        let detect = detection(&sys).unwrap();
        let first = fid(&rho, &detect, &h, 2e-4, 64).unwrap();
        let second = fid(&rho, &detect, &h, 2e-4, 64).unwrap();
        assert_eq!(first, second);
    }
}
