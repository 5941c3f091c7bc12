//! Lorentzian broadening of discrete vibrational lines

use std::f64::consts::FRAC_1_PI;

use serde::{Deserialize, Serialize};

use crate::{Grid, Spectrum, SpectrumError};

/// A single absorption line
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// eigenfrequency in cm⁻¹
    pub freq: f64,
    pub intensity: f64,
}

impl Line {
    pub fn new(freq: f64, intensity: f64) -> Self {
        Self { freq, intensity }
    }
}

/// Cauchy line shape with full width at half maximum `gamma`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineShape {
    gamma: f64,
}

impl LineShape {
    pub fn new(gamma: f64) -> Result<Self, SpectrumError> {
        if gamma.is_finite() && gamma > 0.0 {
            Ok(Self { gamma })
        } else {
            Err(SpectrumError::BadWidth(gamma))
        }
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// the normalized kernel at frequency `f` for a line centered at `f0`. it
    /// integrates to one over the real line
    pub fn kernel(&self, f: f64, f0: f64) -> f64 {
        let hw = 0.5 * self.gamma;
        FRAC_1_PI * hw / ((f - f0).powi(2) + hw * hw)
    }

    /// the height of a line of `intensity` at its center, 2I/(πγ)
    pub fn peak_height(&self, intensity: f64) -> f64 {
        intensity * self.kernel(0.0, 0.0)
    }

    /// the summed contributions of every line at each of `freqs`. lines are
    /// accumulated in the order given
    pub fn broaden(&self, lines: &[Line], freqs: &[f64]) -> Vec<f64> {
        let mut total = vec![0.0; freqs.len()];
        for line in lines {
            for (t, &f) in total.iter_mut().zip(freqs) {
                *t += line.intensity * self.kernel(f, line.freq);
            }
        }
        total
    }

    /// broaden `lines` on `grid` into a [Spectrum] labeled `label` that keeps
    /// the line frequencies as its eigenfrequencies. no lines gives a flat
    /// zero spectrum
    pub fn synthesize(
        &self,
        label: impl Into<String>,
        lines: &[Line],
        grid: &Grid,
    ) -> Spectrum {
        let freqs = grid.values();
        let intensities = self.broaden(lines, &freqs);
        Spectrum::on_grid(label.into(), freqs, intensities)
            .with_eigenfrequencies(lines.iter().map(|l| l.freq).collect())
    }
}
