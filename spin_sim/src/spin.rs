use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{Error, Result};

/// A coupled spin-1/2 system: one chemical-shift offset per spin (Hz from
/// the carrier) and a symmetric scalar-coupling matrix (Hz) with a zero
/// diagonal. Immutable after load; off-resonance acquisition is modeled by
/// building a shifted copy with [`SpinSystem::shifted`].
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct SpinSystem {
    pub shifts_hz: Vec<f64>,
    pub couplings_hz: Vec<Vec<f64>>,
}

impl SpinSystem {
    pub fn new(shifts_hz: Vec<f64>, couplings_hz: Vec<Vec<f64>>) -> Result<SpinSystem> {
        let sys = SpinSystem {
            shifts_hz,
            couplings_hz,
        };
        sys.validate()?;
        Ok(sys)
    }

    /// Two spins with a single coupling, the smallest system that shows
    /// J-evolution.
    pub fn two_spin(shift_a_hz: f64, shift_b_hz: f64, j_hz: f64) -> Result<SpinSystem> {
        SpinSystem::new(
            vec![shift_a_hz, shift_b_hz],
            vec![vec![0.0, j_hz], vec![j_hz, 0.0]],
        )
    }

    pub fn n_spins(&self) -> usize {
        self.shifts_hz.len()
    }

    /// Hilbert-space dimension, 2^n for spin-1/2 nuclei
    pub fn dim(&self) -> usize {
        1 << self.n_spins()
    }

    pub fn coupling_hz(&self, i: usize, j: usize) -> f64 {
        self.couplings_hz[i][j]
    }

    /// Returns a copy with every spin frequency shifted uniformly, the pure
    /// counterpart of an in-place carrier-offset adjustment.
    pub fn shifted(&self, offset_hz: f64) -> Result<SpinSystem> {
        if !offset_hz.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "frequency offset must be finite, got {}",
                offset_hz
            )));
        }
        let mut sys = self.clone();
        sys.shifts_hz.iter_mut().for_each(|shift| *shift += offset_hz);
        Ok(sys)
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.shifts_hz.len();
        if self.couplings_hz.len() != n {
            return Err(Error::Config(format!(
                "coupling matrix has {} rows for {} spins",
                self.couplings_hz.len(),
                n
            )));
        }
        for shift in &self.shifts_hz {
            if !shift.is_finite() {
                return Err(Error::Config(format!("non-finite chemical shift {}", shift)));
            }
        }
        for (i, row) in self.couplings_hz.iter().enumerate() {
            if row.len() != n {
                return Err(Error::Config(format!(
                    "coupling row {} has {} entries for {} spins",
                    i,
                    row.len(),
                    n
                )));
            }
            if row[i] != 0.0 {
                return Err(Error::Config(format!(
                    "coupling matrix diagonal must be zero, got {} at spin {}",
                    row[i], i
                )));
            }
            for (j, coupling) in row.iter().enumerate() {
                if !coupling.is_finite() {
                    return Err(Error::Config(format!(
                        "non-finite coupling between spins {} and {}",
                        i, j
                    )));
                }
                if *coupling != self.couplings_hz[j][i] {
                    return Err(Error::Config(format!(
                        "coupling matrix is not symmetric at spins {} and {}",
                        i, j
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn load(sys_file: &Path) -> Result<SpinSystem> {
        let mut f = File::open(sys_file)
            .map_err(|e| Error::Config(format!("cannot open spin system {:?}: {}", sys_file, e)))?;
        let mut json_str = String::new();
        f.read_to_string(&mut json_str)?;
        let sys: SpinSystem = serde_json::from_str(&json_str)?;
        sys.validate()?;
        Ok(sys)
    }

    pub fn write_default(sys_file: &Path) -> Result<()> {
        let sys = SpinSystem::default();
        let json_str = serde_json::to_string_pretty(&sys)?;
        let mut f = File::create(sys_file)?;
        f.write_all(json_str.as_bytes())?;
        Ok(())
    }
}

impl Default for SpinSystem {
    /// GABA-like pair for the edited experiment: two coupled protons either
    /// side of the carrier
    fn default() -> Self {
        SpinSystem {
            shifts_hz: vec![71.5, -71.5],
            couplings_hz: vec![vec![0.0, 7.35], vec![7.35, 0.0]],
        }
    }
}

impl fmt::Display for SpinSystem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{} spins (dimension {})", self.n_spins(), self.dim())?;
        for (i, shift) in self.shifts_hz.iter().enumerate() {
            writeln!(f, "spin {}: {} Hz", i, shift)?;
        }
        for i in 0..self.n_spins() {
            for j in i + 1..self.n_spins() {
                if self.couplings_hz[i][j] != 0.0 {
                    writeln!(f, "J({},{}) = {} Hz", i, j, self.couplings_hz[i][j])?;
                }
            }
        }
        Ok(())
    }
}
