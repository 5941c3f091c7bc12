//! Putting spectra from different sources on a common intensity scale

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::Spectrum;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// divide by the area under the curve
    #[default]
    Area,

    /// subtract the minimum intensity, then divide by the area
    Baseline,

    /// leave intensities alone
    None,
}

impl Display for Normalization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Normalization::Area => write!(f, "area"),
            Normalization::Baseline => write!(f, "baseline"),
            Normalization::None => write!(f, "none"),
        }
    }
}

/// The outcome of normalizing one spectrum
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Normalized {
    /// the intensities were shifted down by `baseline` and divided by `area`
    Scaled { baseline: f64, area: f64 },

    /// the area was zero or not finite, so the spectrum was left exactly as it
    /// was
    Degenerate,

    /// [Normalization::None] was requested
    Unchanged,
}

impl Normalized {
    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::Degenerate)
    }
}

impl Spectrum {
    /// rescale the intensities of `self` according to `kind`. a spectrum whose
    /// (baseline-subtracted) area is zero cannot be area-normalized; it is
    /// returned untouched as [Normalized::Degenerate] instead of filling it
    /// with NaN
    pub fn normalize(&mut self, kind: Normalization) -> Normalized {
        let baseline = match kind {
            Normalization::None => return Normalized::Unchanged,
            Normalization::Area => 0.0,
            Normalization::Baseline => self
                .intensities()
                .iter()
                .copied()
                .fold(f64::INFINITY, f64::min),
        };
        let shifted: Vec<f64> =
            self.intensities().iter().map(|y| y - baseline).collect();
        let area = crate::spectrum::trapezoid(self.freqs(), &shifted);
        if !area.is_normal() {
            log::warn!(
                "{} spectrum has area {area}, leaving it unnormalized",
                self.label()
            );
            return Normalized::Degenerate;
        }
        for (y, s) in self.intensities_mut().iter_mut().zip(shifted) {
            *y = s / area;
        }
        Normalized::Scaled { baseline, area }
    }
}

/// normalize each of `spectra` in place, returning the outcome for each
pub fn normalize_all(
    spectra: &mut [Spectrum],
    kind: Normalization,
) -> Vec<Normalized> {
    spectra.iter_mut().map(|s| s.normalize(kind)).collect()
}
