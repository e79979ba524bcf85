use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use spin_sim::error::{Error, Result};
use spin_sim::evolve::{apply, fid, propagator, shaped_pulse};
use spin_sim::spin::SpinSystem;
use spin_sim::spin_operators::{detection, hamiltonian, rotation, sigma_eq};

/// Experiment configuration for the edited spin-echo sequence. Times are in
/// seconds, angles in degrees, frequencies in Hz.
#[derive(Clone, Serialize, Deserialize)]
pub struct MegaPressParams {
    pub name: String,
    /// echo time, excitation to the start of acquisition
    pub echo_time: f64,
    /// excitation to the first refocusing pulse
    pub t_12: f64,
    /// time per editing-waveform sample
    pub rf_dwell: f64,
    /// time per acquisition sample
    pub acq_dwell: f64,
    pub samples: usize,
    /// scales raw waveform amplitude to rotation rate
    pub calibration_factor: f64,
    /// transverse axis of the editing pulses
    pub editing_phase: f64,
    pub obs_freq_offset: f64,
}

impl Default for MegaPressParams {
    fn default() -> Self {
        MegaPressParams {
            name: "mega_press".to_string(),
            echo_time: 0.068,
            t_12: 0.006,
            rf_dwell: 32E-6,
            acq_dwell: 2E-4,
            samples: 2048,
            calibration_factor: 1.0,
            editing_phase: 0.0,
            obs_freq_offset: 0.0,
        }
    }
}

impl MegaPressParams {
    pub fn load(params_file: &Path) -> Result<Self> {
        let mut f = File::open(params_file)
            .map_err(|e| Error::Config(format!("cannot open params {:?}: {}", params_file, e)))?;
        let mut json_str = String::new();
        f.read_to_string(&mut json_str)?;
        let params: MegaPressParams = serde_json::from_str(&json_str)?;
        params.validate()?;
        Ok(params)
    }

    pub fn write_default(params_file: &Path) -> Result<()> {
        let params = Self::default();
        let json_str = serde_json::to_string_pretty(&params)?;
        let mut f = File::create(params_file)?;
        f.write_all(json_str.as_bytes())?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("echo_time", self.echo_time),
            ("t_12", self.t_12),
            ("rf_dwell", self.rf_dwell),
            ("acq_dwell", self.acq_dwell),
        ];
        for (label, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!(
                    "{} must be finite and non-negative, got {}",
                    label, value
                )));
            }
        }
        for (label, value) in [
            ("calibration_factor", self.calibration_factor),
            ("editing_phase", self.editing_phase),
            ("obs_freq_offset", self.obs_freq_offset),
        ] {
            if !value.is_finite() {
                return Err(Error::Config(format!(
                    "{} must be finite, got {}",
                    label, value
                )));
            }
        }
        Ok(())
    }
}

/// Free-precession intervals of the edited echo, derived so the two editing
/// pulses are centered within their halves of the echo time. Every term is a
/// closed-form combination of the echo time, the excitation-to-refocusing
/// interval, and the editing-pulse duration.
#[derive(Debug, Clone, Copy)]
pub struct EchoTiming {
    pub t_12: f64,
    pub t_2g1: f64,
    pub t_g13: f64,
    pub t_3g2: f64,
    pub t_g2r: f64,
    pub t_pulse: f64,
}

impl EchoTiming {
    pub fn derive(echo_time: f64, t_12: f64, t_pulse: f64) -> Result<EchoTiming> {
        let half_te = echo_time / 2.0;
        let t_2g1 = (t_12 + half_te) / 2.0 - t_12 - t_pulse / 2.0;
        let t_g13 = half_te - t_2g1 - t_pulse;
        let t_3g2 = (half_te - t_12) / 2.0 - t_pulse / 2.0;
        let t_g2r = (half_te - t_12) - t_3g2 - t_pulse;

        let timing = EchoTiming {
            t_12,
            t_2g1,
            t_g13,
            t_3g2,
            t_g2r,
            t_pulse,
        };
        for (label, interval) in [
            ("t_2g1", t_2g1),
            ("t_g13", t_g13),
            ("t_3g2", t_3g2),
            ("t_g2r", t_g2r),
        ] {
            if !interval.is_finite() || interval < 0.0 {
                return Err(Error::InvalidArgument(format!(
                    "derived interval {} is {} s; the editing pulse does not fit the echo",
                    label, interval
                )));
            }
        }
        Ok(timing)
    }

    /// Total time from excitation to the start of acquisition. Equal to the
    /// echo time by construction, which the integration tests assert.
    pub fn total(&self) -> f64 {
        self.t_12 + self.t_2g1 + self.t_pulse + self.t_g13 + self.t_3g2 + self.t_pulse + self.t_g2r
    }
}

pub struct MegaPress {
    params: MegaPressParams,
}

impl MegaPress {
    pub fn new(params: MegaPressParams) -> Result<MegaPress> {
        params.validate()?;
        Ok(MegaPress { params })
    }

    pub fn params(&self) -> &MegaPressParams {
        &self.params
    }

    pub fn timing(&self, n_rf_samples: usize) -> Result<EchoTiming> {
        EchoTiming::derive(
            self.params.echo_time,
            self.params.t_12,
            n_rf_samples as f64 * self.params.rf_dwell,
        )
    }

    /// Runs the fixed pulse train from thermal equilibrium to detection and
    /// synthesizes the FID:
    /// 90y - t_12 - 180y - t_2g1 - edit - t_g13 - 180y - t_3g2 - edit -
    /// t_g2r - acquire. Both editing pulses play the same waveform at the
    /// same calibration.
    pub fn run(&self, sys: &SpinSystem, waveform: &[f32]) -> Result<Vec<Complex64>> {
        let p = &self.params;
        let timing = self.timing(waveform.len())?;

        let h = hamiltonian(sys)?;
        let detect = detection(sys)?;

        let u_12 = propagator(&h, timing.t_12).map_err(|e| e.context("interval t_12"))?;
        let u_2g1 = propagator(&h, timing.t_2g1).map_err(|e| e.context("interval t_2g1"))?;
        let u_g13 = propagator(&h, timing.t_g13).map_err(|e| e.context("interval t_g13"))?;
        let u_3g2 = propagator(&h, timing.t_3g2).map_err(|e| e.context("interval t_3g2"))?;
        let u_g2r = propagator(&h, timing.t_g2r).map_err(|e| e.context("interval t_g2r"))?;

        let excite = rotation(sys, 90.0, 90.0).map_err(|e| e.context("excitation pulse"))?;
        let refocus = rotation(sys, 180.0, 90.0).map_err(|e| e.context("refocusing pulse"))?;

        let mut sigma = apply(&excite, &sigma_eq(sys)?);
        sigma = apply(&u_12, &sigma);
        sigma = apply(&refocus, &sigma);
        sigma = apply(&u_2g1, &sigma);
        sigma = shaped_pulse(
            sys,
            &sigma,
            &h,
            waveform,
            p.rf_dwell,
            p.calibration_factor,
            p.editing_phase,
        )
        .map_err(|e| e.context("editing pulse 1"))?;
        sigma = apply(&u_g13, &sigma);
        sigma = apply(&refocus, &sigma);
        sigma = apply(&u_3g2, &sigma);
        sigma = shaped_pulse(
            sys,
            &sigma,
            &h,
            waveform,
            p.rf_dwell,
            p.calibration_factor,
            p.editing_phase,
        )
        .map_err(|e| e.context("editing pulse 2"))?;
        sigma = apply(&u_g2r, &sigma);

        fid(&sigma, &detect, &h, p.acq_dwell, p.samples).map_err(|e| e.context("acquisition"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_are_valid() {
        MegaPressParams::default().validate().unwrap();
    }

    #[test]
    fn negative_echo_time_is_rejected() {
        let mut params = MegaPressParams::default();
        params.echo_time = -0.01;
        assert!(matches!(params.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn non_finite_calibration_is_rejected() {
        let mut params = MegaPressParams::default();
        params.calibration_factor = f64::NAN;
        assert!(matches!(params.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn oversized_editing_pulse_is_rejected() {
        // a pulse longer than the half-echo leaves a negative interval
        let err = EchoTiming::derive(0.068, 0.006, 0.05).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn params_json_round_trip() {
        let params_file = std::env::temp_dir().join("seq_lib_test_params.json");
        MegaPressParams::write_default(&params_file).unwrap();
        let params = MegaPressParams::load(&params_file).unwrap();
        assert_eq!(params.name, "mega_press");
        assert_eq!(params.echo_time, 0.068);
        assert_eq!(params.samples, 2048);
        std::fs::remove_file(&params_file).unwrap();
    }
}
