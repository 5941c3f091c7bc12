use serde::{Deserialize, Serialize};

use crate::{Atom, Vec3};

/// A vibrational normal mode: its eigenfrequency in cm⁻¹, one displacement
/// vector per atom, and the IR intensity once it has been computed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalMode {
    freq: f64,
    eigenvector: Vec<Vec3>,
    intensity: Option<f64>,
}

impl NormalMode {
    pub fn new(freq: f64, eigenvector: Vec<Vec3>) -> Self {
        Self {
            freq,
            eigenvector,
            intensity: None,
        }
    }

    pub fn freq(&self) -> f64 {
        self.freq
    }

    pub fn eigenvector(&self) -> &[Vec3] {
        &self.eigenvector
    }

    /// the IR intensity, or `None` before the owning
    /// [Molecule](crate::Molecule) has computed it
    pub fn intensity(&self) -> Option<f64> {
        self.intensity
    }

    /// multiply the eigenfrequency by `factor`, as used for empirical
    /// frequency scaling of a method
    pub fn scale(&mut self, factor: f64) {
        self.freq *= factor;
    }

    /// the effective dipole derivative of the mode: the sum over atoms, in
    /// ascending atom order, of the elementwise product of each atom's
    /// charge ratio with its displacement
    pub fn dipole_derivative(&self, atoms: &[Atom]) -> Vec3 {
        let mut mu = Vec3::zeros();
        for (atom, disp) in atoms.iter().zip(&self.eigenvector) {
            mu += atom.charge_ratio().component_mul(disp);
        }
        mu
    }

    /// set the intensity to the squared norm of the dipole derivative. the
    /// intensity is only ever computed once; later calls return the stored
    /// value
    pub(crate) fn compute_intensity(&mut self, atoms: &[Atom]) -> f64 {
        if let Some(i) = self.intensity {
            return i;
        }
        let i = self.dipole_derivative(atoms).norm_squared();
        self.intensity = Some(i);
        i
    }
}
