//! Spectra from a GROMACS normal-mode analysis. Each molecule directory holds
//! the `nmeig` outputs (`eigenfreq.xvg` and `eigenvec.trr`, or its text dump
//! in `eigenvec.txt`), the topology `topol.top`, and optionally per-axis
//! charges in `mu.txt`.

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use irspec::{
    Grid, LineShape, Molecule, NormalMode, Spectrum, Vec3, extract_atoms,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{
    SourceError, SpectrumSource, parse_finite, read_file, subdirectories,
};
use crate::gmx::{Gmx, ProcessError};

#[cfg(test)]
mod tests;

pub const EIGENFREQ: &str = "eigenfreq.xvg";
pub const EIGENVEC_TXT: &str = "eigenvec.txt";
pub const EIGENVEC_TRR: &str = "eigenvec.trr";
pub const TOPOLOGY: &str = "topol.top";
pub const MU: &str = "mu.txt";

/// the minimum number of fields in a `[ atoms ]` record: nr, type, resnr,
/// residue, atom, cgnr, charge, mass
const ATOM_FIELDS: usize = 8;

static XLINE: OnceLock<Regex> = OnceLock::new();

/// Settings for running the normal-mode analysis before reading its output
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NmSettings {
    /// directory containing `cg.mdp` and `nm.mdp`
    pub mdp_dir: PathBuf,

    /// the symmetry number passed to `gmx nmeig -sigma`
    pub sigma: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Gromacs {
    name: String,
    dir: PathBuf,

    /// the molecules that are linear. every other one is treated as
    /// nonlinear
    linear: BTreeSet<String>,
    degenerate: usize,
    scale: f64,
    gmx: Option<Gmx>,
    nm: Option<NmSettings>,
}

impl Gromacs {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            linear: BTreeSet::new(),
            degenerate: 0,
            scale: 1.0,
            gmx: None,
            nm: None,
        }
    }

    /// mark `molecules` as linear
    pub fn linear<I, S>(mut self, molecules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.linear.extend(molecules.into_iter().map(Into::into));
        self
    }

    pub fn is_linear(&self, molecule: &str) -> bool {
        self.linear.contains(molecule)
    }

    pub fn degenerate(mut self, degenerate: usize) -> Self {
        self.degenerate = degenerate;
        self
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// the executable used to dump `eigenvec.trr` and to run the analysis
    pub fn gmx(mut self, gmx: Option<Gmx>) -> Self {
        self.gmx = gmx;
        self
    }

    pub fn normal_modes(mut self, nm: NmSettings) -> Self {
        self.nm = Some(nm);
        self
    }

    fn require_gmx(&self) -> Result<&Gmx, SourceError> {
        self.gmx
            .as_ref()
            .ok_or(SourceError::Process(ProcessError::NotInstalled))
    }

    /// the second column of each data line of an `eigenfreq.xvg` file. data
    /// lines are the ones indented with whitespace
    pub fn parse_eigenfrequencies(
        contents: &str,
        path: &Path,
    ) -> Result<Vec<f64>, SourceError> {
        let mut ret = Vec::new();
        for (i, line) in contents.lines().enumerate() {
            if !line.starts_with(char::is_whitespace) || line.trim().is_empty()
            {
                continue;
            }
            let Some(word) = line.split_whitespace().nth(1) else {
                return Err(SourceError::parse(
                    path,
                    i + 1,
                    "expected index and frequency",
                ));
            };
            let freq = parse_finite(word).ok_or_else(|| {
                SourceError::parse(
                    path,
                    i + 1,
                    format!("bad frequency `{word}`"),
                )
            })?;
            ret.push(freq);
        }
        if ret.is_empty() {
            return Err(SourceError::Missing {
                path: path.to_owned(),
                what: "eigenfrequencies",
            });
        }
        Ok(ret)
    }

    /// the eigenvectors in the text output of `gmx dump` on a trajectory
    /// written by `nmeig`. each frame's `x[i]={x, y, z}` lines form one
    /// eigenvector; the first frame holds the reference structure and is
    /// skipped
    pub fn parse_eigenvectors(
        contents: &str,
        path: &Path,
    ) -> Result<Vec<Vec<Vec3>>, SourceError> {
        let xline = XLINE.get_or_init(|| {
            Regex::new(r"^\s+x\[\s*\d+\]=\{([^,}]+),([^,}]+),([^,}]+)\}")
                .unwrap()
        });
        let mut blocks = Vec::new();
        let mut block = Vec::new();
        for (i, line) in contents.lines().enumerate() {
            let Some(caps) = xline.captures(line) else {
                if !block.is_empty() {
                    blocks.push(std::mem::take(&mut block));
                }
                continue;
            };
            let mut v = Vec3::zeros();
            for k in 0..3 {
                let s = caps[k + 1].trim();
                v[k] = parse_finite(s).ok_or_else(|| {
                    SourceError::parse(
                        path,
                        i + 1,
                        format!("bad coordinate `{s}`"),
                    )
                })?;
            }
            block.push(v);
        }
        if !block.is_empty() {
            blocks.push(block);
        }
        if blocks.len() < 2 {
            return Err(SourceError::Missing {
                path: path.to_owned(),
                what: "eigenvectors",
            });
        }
        blocks.remove(0);
        Ok(blocks)
    }

    /// the charges and masses of the `[ atoms ]` records of a topology, in
    /// that order
    pub fn parse_topology(
        contents: &str,
        path: &Path,
    ) -> Result<(Vec<f64>, Vec<f64>), SourceError> {
        let mut charges = Vec::new();
        let mut masses = Vec::new();
        let mut in_atoms = false;
        for (i, line) in contents.lines().enumerate() {
            let line = match line.split_once(';') {
                Some((data, _)) => data,
                None => line,
            }
            .trim();
            if line.is_empty() {
                continue;
            }
            if let Some(section) = line.strip_prefix('[') {
                in_atoms = section.trim_end_matches(']').trim() == "atoms";
                continue;
            }
            if !in_atoms {
                continue;
            }
            let words: Vec<_> = line.split_whitespace().collect();
            if words.len() < ATOM_FIELDS {
                return Err(SourceError::parse(
                    path,
                    i + 1,
                    format!(
                        "atom record has {} fields, expected at least \
                         {ATOM_FIELDS}",
                        words.len()
                    ),
                ));
            }
            let num = |k: usize| {
                parse_finite(words[k]).ok_or_else(|| {
                    SourceError::parse(
                        path,
                        i + 1,
                        format!("bad number `{}` in field {}", words[k], k + 1),
                    )
                })
            };
            charges.push(num(6)?);
            masses.push(num(7)?);
        }
        if masses.is_empty() {
            return Err(SourceError::Missing {
                path: path.to_owned(),
                what: "[ atoms ] records",
            });
        }
        Ok((charges, masses))
    }

    /// per-axis charges: whitespace-separated floats, three per atom
    pub fn parse_mu(
        contents: &str,
        path: &Path,
    ) -> Result<Vec<Vec3>, SourceError> {
        let vals = contents
            .split_whitespace()
            .map(|w| {
                parse_finite(w).ok_or_else(|| SourceError::Inconsistent {
                    path: path.to_owned(),
                    msg: format!("`{w}` is not a number"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if vals.is_empty() || vals.len() % 3 != 0 {
            return Err(SourceError::Inconsistent {
                path: path.to_owned(),
                msg: format!(
                    "{} values do not make 3 per atom",
                    vals.len()
                ),
            });
        }
        Ok(vals.chunks_exact(3).map(Vec3::from_column_slice).collect())
    }

    /// the text dump of the eigenvectors of `dir`, preferring an existing
    /// `eigenvec.txt` over running `gmx dump` on `eigenvec.trr`
    fn eigenvectors(&self, dir: &Path) -> Result<Vec<Vec<Vec3>>, SourceError> {
        let txt = dir.join(EIGENVEC_TXT);
        if txt.exists() {
            return Self::parse_eigenvectors(&read_file(&txt)?, &txt);
        }
        let trr = dir.join(EIGENVEC_TRR);
        if !trr.exists() {
            return Err(SourceError::FileNotFound(trr));
        }
        log::debug!("dumping {}", trr.display());
        let dump = self.require_gmx()?.dump(&trr)?;
        Self::parse_eigenvectors(&dump, &trr)
    }

    /// load the model of `molecule`: its atoms and vibrational modes with
    /// their intensities. frequencies are multiplied by the scale factor
    pub fn molecule(&self, molecule: &str) -> Result<Molecule, SourceError> {
        let dir = self.dir.join(molecule);
        let freq_path = dir.join(EIGENFREQ);
        let freqs =
            Self::parse_eigenfrequencies(&read_file(&freq_path)?, &freq_path)?;
        let vectors = self.eigenvectors(&dir)?;
        if freqs.len() != vectors.len() {
            return Err(SourceError::Inconsistent {
                path: dir,
                msg: format!(
                    "{} eigenfrequencies but {} eigenvectors",
                    freqs.len(),
                    vectors.len()
                ),
            });
        }

        let top = dir.join(TOPOLOGY);
        let (charges, masses) = Self::parse_topology(&read_file(&top)?, &top)?;
        let mu = dir.join(MU);
        let charges = if mu.exists() {
            log::debug!("taking per-axis charges from {}", mu.display());
            Self::parse_mu(&read_file(&mu)?, &mu)?
        } else {
            charges.into_iter().map(Vec3::repeat).collect()
        };
        let atoms = extract_atoms(&masses, &charges)
            .map_err(|e| SourceError::Model(top.clone(), e))?;

        // nmeig reports the rigid-body modes too when asked for all of them.
        // both counts follow the topology, which the eigenvectors cover in
        // full even when fewer atoms carry charges
        let linear = self.is_linear(molecule);
        let natoms = masses.len();
        let mut skip = 0;
        let total = 3 * natoms;
        if freqs.len() == total {
            skip = total - Molecule::vibrations(natoms, linear);
            log::trace!("dropping {skip} rigid-body modes of {molecule}");
        }
        let modes = freqs
            .into_iter()
            .zip(vectors)
            .skip(skip)
            .map(|(f, mut v)| {
                if v.len() == natoms {
                    v.truncate(atoms.len());
                }
                NormalMode::new(f * self.scale, v)
            })
            .collect();
        Molecule::with_atom_count(
            linear,
            self.degenerate,
            natoms,
            atoms,
            modes,
        )
        .map_err(|e| SourceError::Model(dir, e))
    }
}

impl SpectrumSource for Gromacs {
    fn name(&self) -> &str {
        &self.name
    }

    fn dir(&self) -> &Path {
        &self.dir
    }

    fn molecules(&self) -> Result<BTreeSet<String>, SourceError> {
        subdirectories(&self.dir)
    }

    fn produce(
        &self,
        molecule: &str,
        grid: &Grid,
        shape: &LineShape,
    ) -> Result<Spectrum, SourceError> {
        if let Some(nm) = &self.nm {
            let dir = self.dir.join(molecule);
            log::info!("running normal-mode analysis in {}", dir.display());
            self.require_gmx()?
                .normal_modes(&dir, &nm.mdp_dir, nm.sigma)?;
        }
        let lines = self.molecule(molecule)?.into_lines();
        Ok(shape.synthesize(&self.name, &lines, grid))
    }

    fn scaling_factor(&self) -> f64 {
        self.scale
    }

    fn needs_gmx(&self) -> bool {
        self.nm.is_some()
    }
}
