use serde::{Deserialize, Serialize};

use crate::{Vec3, molecule::ModelError};

/// The per-atom quantities entering the IR intensity of a normal mode
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// square root of the atomic mass
    sqrt_mass: f64,

    /// charge divided by `sqrt_mass`, one component per Cartesian axis
    charge_ratio: Vec3,
}

impl Atom {
    /// build an [Atom] from its mass and per-axis charge. returns `None` if
    /// `mass` is not a finite, strictly positive number
    pub fn new(mass: f64, charge: Vec3) -> Option<Self> {
        if !(mass.is_finite() && mass > 0.0) {
            return None;
        }
        let sqrt_mass = mass.sqrt();
        Some(Self {
            sqrt_mass,
            charge_ratio: charge / sqrt_mass,
        })
    }

    /// like [Atom::new] but with the same scalar charge on every axis
    pub fn with_scalar_charge(mass: f64, charge: f64) -> Option<Self> {
        Self::new(mass, Vec3::repeat(charge))
    }

    pub fn sqrt_mass(&self) -> f64 {
        self.sqrt_mass
    }

    pub fn charge_ratio(&self) -> &Vec3 {
        &self.charge_ratio
    }
}

/// Combine raw atomic masses with per-axis charges. When the charges come from
/// a dipole-derivative file they may cover fewer atoms than the topology; the
/// mass list is truncated to the length of `charges` in that case. More
/// charges than masses is an error, as is any non-positive mass.
pub fn extract_atoms(
    masses: &[f64],
    charges: &[Vec3],
) -> Result<Vec<Atom>, ModelError> {
    if charges.len() > masses.len() {
        return Err(ModelError::ChargeCount {
            masses: masses.len(),
            charges: charges.len(),
        });
    }
    if charges.len() < masses.len() {
        log::debug!(
            "truncating {} masses to match {} charges",
            masses.len(),
            charges.len()
        );
    }
    masses
        .iter()
        .zip(charges)
        .enumerate()
        .map(|(atom, (&mass, &charge))| {
            Atom::new(mass, charge)
                .ok_or(ModelError::NonPositiveMass { atom, mass })
        })
        .collect()
}
