use std::{error::Error, fmt::Display};

use serde::{Deserialize, Serialize};

use crate::{Atom, Line, NormalMode};

#[derive(Clone, Debug, PartialEq)]
pub enum ModelError {
    /// a molecule needs at least one atom
    NoAtoms,

    /// the number of normal modes does not match the atom count
    ModeCount { want: usize, got: usize },

    /// the atom count and linearity leave no vibrational modes
    NoModes { natoms: usize, linear: bool },

    /// a mode's eigenvector does not have one displacement per atom
    EigenvectorLength { mode: usize, want: usize, got: usize },

    NonPositiveMass { atom: usize, mass: f64 },

    /// more charges than atomic masses were supplied
    ChargeCount { masses: usize, charges: usize },
}

impl Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::NoAtoms => write!(f, "molecule has no atoms"),
            ModelError::ModeCount { want, got } => {
                write!(f, "expected {want} normal modes, found {got}")
            }
            ModelError::NoModes { natoms, linear } => write!(
                f,
                "a {} molecule with {natoms} atoms has no vibrational modes",
                if *linear { "linear" } else { "nonlinear" }
            ),
            ModelError::EigenvectorLength { mode, want, got } => write!(
                f,
                "eigenvector of mode {mode} has {got} displacements, \
                 expected {want}"
            ),
            ModelError::NonPositiveMass { atom, mass } => {
                write!(f, "atom {atom} has non-positive mass {mass}")
            }
            ModelError::ChargeCount { masses, charges } => write!(
                f,
                "{charges} atomic charges given for only {masses} masses"
            ),
        }
    }
}

impl Error for ModelError {}

/// A molecule assembled for one analysis: its atoms and vibrational normal
/// modes with their IR intensities computed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Molecule {
    linear: bool,
    degenerate: usize,

    /// the number of atoms in the molecule, which may exceed `atoms.len()`
    /// when only the leading atoms carry charges
    natoms: usize,
    atoms: Vec<Atom>,
    modes: Vec<NormalMode>,
}

impl Molecule {
    /// the number of vibrational modes of a molecule with `natoms` atoms:
    /// 3N - 5 if it is linear and 3N - 6 otherwise
    pub fn vibrations(natoms: usize, linear: bool) -> usize {
        let rigid = if linear { 5 } else { 6 };
        (3 * natoms).saturating_sub(rigid)
    }

    /// see [Molecule::with_degenerate]. no modes are assumed to be missing
    pub fn new(
        linear: bool,
        atoms: Vec<Atom>,
        modes: Vec<NormalMode>,
    ) -> Result<Self, ModelError> {
        Self::with_degenerate(linear, 0, atoms, modes)
    }

    /// construct a [Molecule] and compute the intensity of each of its modes.
    /// `degenerate` is the number of modes left out of `modes` because they
    /// duplicate a degenerate partner, so exactly
    /// `vibrations(atoms.len(), linear) - degenerate` modes are accepted
    pub fn with_degenerate(
        linear: bool,
        degenerate: usize,
        atoms: Vec<Atom>,
        modes: Vec<NormalMode>,
    ) -> Result<Self, ModelError> {
        let natoms = atoms.len();
        Self::with_atom_count(linear, degenerate, natoms, atoms, modes)
    }

    /// like [Molecule::with_degenerate] for a molecule of `natoms` atoms of
    /// which only the leading `atoms.len()` enter the intensities. the mode
    /// count follows `natoms`, but each eigenvector must already be cut down
    /// to one displacement per entry of `atoms`
    pub fn with_atom_count(
        linear: bool,
        degenerate: usize,
        natoms: usize,
        atoms: Vec<Atom>,
        mut modes: Vec<NormalMode>,
    ) -> Result<Self, ModelError> {
        if atoms.is_empty() {
            return Err(ModelError::NoAtoms);
        }
        if atoms.len() > natoms {
            return Err(ModelError::ChargeCount {
                masses: natoms,
                charges: atoms.len(),
            });
        }
        let want = Self::vibrations(natoms, linear).saturating_sub(degenerate);
        if want == 0 {
            return Err(ModelError::NoModes { natoms, linear });
        }
        if modes.len() != want {
            return Err(ModelError::ModeCount {
                want,
                got: modes.len(),
            });
        }
        for (i, mode) in modes.iter().enumerate() {
            let got = mode.eigenvector().len();
            if got != atoms.len() {
                return Err(ModelError::EigenvectorLength {
                    mode: i,
                    want: atoms.len(),
                    got,
                });
            }
        }
        for mode in &mut modes {
            mode.compute_intensity(&atoms);
        }
        Ok(Self {
            linear,
            degenerate,
            natoms,
            atoms,
            modes,
        })
    }

    pub fn linear(&self) -> bool {
        self.linear
    }

    pub fn degenerate(&self) -> usize {
        self.degenerate
    }

    pub fn natoms(&self) -> usize {
        self.natoms
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn modes(&self) -> &[NormalMode] {
        &self.modes
    }

    /// consume the molecule, keeping only the (frequency, intensity) pair of
    /// each mode
    pub fn into_lines(self) -> Vec<Line> {
        self.modes
            .into_iter()
            .map(|m| Line {
                freq: m.freq(),
                intensity: m.intensity().unwrap_or_default(),
            })
            .collect()
    }
}
