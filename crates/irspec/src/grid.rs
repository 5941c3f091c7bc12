//! Evenly spaced frequency grids

use std::{error::Error, fmt::Display};

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq)]
pub enum GridError {
    /// `stop` is not greater than `start`, or either is not finite
    BadRange { start: f64, stop: f64 },
    BadStep(f64),
    TooFewPoints(usize),
}

impl Display for GridError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridError::BadRange { start, stop } => {
                write!(f, "invalid frequency range {start} to {stop}")
            }
            GridError::BadStep(s) => write!(f, "invalid step size {s}"),
            GridError::TooFewPoints(n) => {
                write!(f, "a grid needs at least 2 points, got {n}")
            }
        }
    }
}

impl Error for GridError {}

/// `points` evenly spaced frequencies from `start` to `stop`, both included
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    start: f64,
    stop: f64,
    points: usize,
}

impl Grid {
    /// exactly `points` values from `start` to `stop` inclusive
    pub fn with_points(
        start: f64,
        stop: f64,
        points: usize,
    ) -> Result<Self, GridError> {
        if !(start.is_finite() && stop.is_finite() && stop > start) {
            return Err(GridError::BadRange { start, stop });
        }
        if points < 2 {
            return Err(GridError::TooFewPoints(points));
        }
        Ok(Self {
            start,
            stop,
            points,
        })
    }

    /// `floor((stop - start) / step) + 1` values from `start` to `stop`
    /// inclusive. the spacing is exactly `step` when the range is a whole
    /// number of steps and slightly wider otherwise
    pub fn with_step(
        start: f64,
        stop: f64,
        step: f64,
    ) -> Result<Self, GridError> {
        if !(step.is_finite() && step > 0.0) {
            return Err(GridError::BadStep(step));
        }
        if !(start.is_finite() && stop.is_finite() && stop > start) {
            return Err(GridError::BadRange { start, stop });
        }
        // the small offset keeps ranges like 0..4000 by 4 from losing their
        // last point to rounding
        let intervals = ((stop - start) / step + 1e-9).floor() as usize;
        Self::with_points(start, stop, intervals + 1)
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn stop(&self) -> f64 {
        self.stop
    }

    pub fn step(&self) -> f64 {
        (self.stop - self.start) / (self.points - 1) as f64
    }

    pub fn len(&self) -> usize {
        self.points
    }

    /// grids always contain at least two points
    pub fn is_empty(&self) -> bool {
        false
    }

    /// the grid values. the last one is exactly `stop`
    pub fn values(&self) -> Vec<f64> {
        let step = self.step();
        let last = self.points - 1;
        (0..self.points)
            .map(|i| {
                if i == last {
                    self.stop
                } else {
                    self.start + i as f64 * step
                }
            })
            .collect()
    }
}

impl Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} points from {} to {} cm-1 (step {})",
            self.points,
            self.start,
            self.stop,
            self.step()
        )
    }
}
