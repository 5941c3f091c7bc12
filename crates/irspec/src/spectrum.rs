use std::{error::Error, fmt::Display};

use serde::{Deserialize, Serialize};

use crate::Grid;

#[derive(Clone, Debug, PartialEq)]
pub enum SpectrumError {
    Empty,
    LengthMismatch { freqs: usize, intensities: usize },
    /// the frequency at this index is not greater than the one before it
    NotIncreasing(usize),
    /// the frequency or intensity at this index is NaN or infinite
    NonFinite(usize),
    BadWidth(f64),
}

impl Display for SpectrumError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpectrumError::Empty => write!(f, "spectrum has no points"),
            SpectrumError::LengthMismatch { freqs, intensities } => write!(
                f,
                "{freqs} frequencies but {intensities} intensities"
            ),
            SpectrumError::NotIncreasing(i) => {
                write!(f, "frequencies not increasing at index {i}")
            }
            SpectrumError::NonFinite(i) => {
                write!(f, "non-finite value at index {i}")
            }
            SpectrumError::BadWidth(g) => {
                write!(f, "line width must be positive, got {g}")
            }
        }
    }
}

impl Error for SpectrumError {}

/// A sampled spectrum: intensities on an ascending frequency axis, labeled with
/// the method that produced it. Synthesized spectra also carry the
/// eigenfrequencies they were built from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    label: String,
    freqs: Vec<f64>,
    intensities: Vec<f64>,
    eigenfrequencies: Option<Vec<f64>>,
}

impl Spectrum {
    pub fn new(
        label: impl Into<String>,
        freqs: Vec<f64>,
        intensities: Vec<f64>,
    ) -> Result<Self, SpectrumError> {
        if freqs.len() != intensities.len() {
            return Err(SpectrumError::LengthMismatch {
                freqs: freqs.len(),
                intensities: intensities.len(),
            });
        }
        if freqs.is_empty() {
            return Err(SpectrumError::Empty);
        }
        if let Some(i) = freqs
            .iter()
            .zip(&intensities)
            .position(|(f, y)| !(f.is_finite() && y.is_finite()))
        {
            return Err(SpectrumError::NonFinite(i));
        }
        if let Some(i) = freqs.windows(2).position(|w| w[1] <= w[0]) {
            return Err(SpectrumError::NotIncreasing(i + 1));
        }
        Ok(Self {
            label: label.into(),
            freqs,
            intensities,
            eigenfrequencies: None,
        })
    }

    /// skip the checks in [Spectrum::new] for values taken from a [Grid],
    /// which are already ascending and non-empty
    pub(crate) fn on_grid(
        label: String,
        freqs: Vec<f64>,
        intensities: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(freqs.len(), intensities.len());
        Self {
            label,
            freqs,
            intensities,
            eigenfrequencies: None,
        }
    }

    pub fn with_eigenfrequencies(mut self, eigenfrequencies: Vec<f64>) -> Self {
        self.eigenfrequencies = Some(eigenfrequencies);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn freqs(&self) -> &[f64] {
        &self.freqs
    }

    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }

    pub(crate) fn intensities_mut(&mut self) -> &mut [f64] {
        &mut self.intensities
    }

    pub fn eigenfrequencies(&self) -> Option<&[f64]> {
        self.eigenfrequencies.as_deref()
    }

    pub fn len(&self) -> usize {
        self.freqs.len()
    }

    /// spectra always contain at least one point
    pub fn is_empty(&self) -> bool {
        false
    }

    /// the area under the curve by the trapezoidal rule
    pub fn area(&self) -> f64 {
        trapezoid(&self.freqs, &self.intensities)
    }

    /// the frequency and value of the largest intensity. the first one wins on
    /// ties
    pub fn peak(&self) -> (f64, f64) {
        let mut best = 0;
        for (i, v) in self.intensities.iter().enumerate() {
            if *v > self.intensities[best] {
                best = i;
            }
        }
        (self.freqs[best], self.intensities[best])
    }

    /// whether `self` and `other` are sampled on the same frequencies
    pub fn same_grid(&self, other: &Self) -> bool {
        self.freqs.len() == other.freqs.len()
            && self
                .freqs
                .iter()
                .zip(&other.freqs)
                .all(|(a, b)| (a - b).abs() <= 1e-9 * a.abs().max(1.0))
    }

    /// linearly interpolate onto `grid`. points outside the frequency range of
    /// `self` are zero. eigenfrequencies are kept
    pub fn resample(&self, grid: &Grid) -> Self {
        let freqs = grid.values();
        let mut intensities = Vec::with_capacity(freqs.len());
        // both axes are ascending, so walk them together
        let mut j = 0;
        let n = self.freqs.len();
        for &f in &freqs {
            if f < self.freqs[0] || f > self.freqs[n - 1] {
                intensities.push(0.0);
                continue;
            }
            while j + 1 < n && self.freqs[j + 1] < f {
                j += 1;
            }
            if j + 1 == n {
                intensities.push(self.intensities[n - 1]);
                continue;
            }
            let (x0, x1) = (self.freqs[j], self.freqs[j + 1]);
            let (y0, y1) = (self.intensities[j], self.intensities[j + 1]);
            let t = (f - x0) / (x1 - x0);
            intensities.push(y0 + t * (y1 - y0));
        }
        Self {
            eigenfrequencies: self.eigenfrequencies.clone(),
            ..Self::on_grid(self.label.clone(), freqs, intensities)
        }
    }
}

/// trapezoidal integral of `y` over `x`
pub fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(x, y)| 0.5 * (x[1] - x[0]) * (y[0] + y[1]))
        .sum()
}
