use std::{
    collections::BTreeSet,
    error::Error,
    fmt::Display,
    fs::read_to_string,
    path::{Path, PathBuf},
};

use irspec::{Grid, LineShape, ModelError, Spectrum, SpectrumError};

use crate::gmx::ProcessError;

pub mod experimental;
pub mod gromacs;
pub mod qmlog;

#[derive(Debug, PartialEq)]
pub enum SourceError {
    FileNotFound(PathBuf),
    ReadFile(PathBuf, std::io::ErrorKind),
    Parse {
        path: PathBuf,
        line: usize,
        msg: String,
    },
    /// the file was read but lacks a required record
    Missing {
        path: PathBuf,
        what: &'static str,
    },
    /// the input files disagree with each other
    Inconsistent {
        path: PathBuf,
        msg: String,
    },
    Model(PathBuf, ModelError),
    Spectrum(PathBuf, SpectrumError),
    Process(ProcessError),
}

impl SourceError {
    pub(crate) fn parse(
        path: &Path,
        line: usize,
        msg: impl Into<String>,
    ) -> Self {
        Self::Parse {
            path: path.to_owned(),
            line,
            msg: msg.into(),
        }
    }

    pub fn is_file_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound(..))
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::FileNotFound(p) => {
                write!(f, "{} does not exist", p.display())
            }
            SourceError::ReadFile(p, kind) => {
                write!(f, "failed to read {} with `{kind}`", p.display())
            }
            SourceError::Parse { path, line, msg } => {
                write!(f, "{}:{line}: {msg}", path.display())
            }
            SourceError::Missing { path, what } => {
                write!(f, "no {what} found in {}", path.display())
            }
            SourceError::Inconsistent { path, msg } => {
                write!(f, "{}: {msg}", path.display())
            }
            SourceError::Model(p, e) => write!(f, "{}: {e}", p.display()),
            SourceError::Spectrum(p, e) => write!(f, "{}: {e}", p.display()),
            SourceError::Process(e) => write!(f, "{e}"),
        }
    }
}

impl Error for SourceError {}

impl From<ProcessError> for SourceError {
    fn from(value: ProcessError) -> Self {
        Self::Process(value)
    }
}

/// A method that can produce the IR spectrum of a molecule. Adding a new kind
/// of input means adding an implementation of this trait
pub trait SpectrumSource {
    /// the name of the method. produced spectra carry it as their label
    fn name(&self) -> &str;

    /// the directory holding this source's per-molecule data
    fn dir(&self) -> &Path;

    /// the names of the molecules this source has data for
    fn molecules(&self) -> Result<BTreeSet<String>, SourceError>;

    /// produce the spectrum of `molecule` on `grid`, broadening discrete
    /// lines with `shape`
    fn produce(
        &self,
        molecule: &str,
        grid: &Grid,
        shape: &LineShape,
    ) -> Result<Spectrum, SourceError>;

    /// the empirical factor applied to computed eigenfrequencies
    fn scaling_factor(&self) -> f64 {
        1.0
    }

    /// whether [SpectrumSource::produce] runs the gmx executable
    fn needs_gmx(&self) -> bool {
        false
    }
}

/// parse `s` as a finite float. `nan` and `inf` are rejected like any other
/// word that is not a number
pub(crate) fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// read `path` to a string, distinguishing a missing file from other errors
pub(crate) fn read_file(path: &Path) -> Result<String, SourceError> {
    if !path.exists() {
        return Err(SourceError::FileNotFound(path.to_owned()));
    }
    log::debug!("reading {}", path.display());
    read_to_string(path)
        .map_err(|e| SourceError::ReadFile(path.to_owned(), e.kind()))
}

/// the sorted names of the entries of `dir` accepted by `keep`, which maps an
/// entry's path to the molecule name it provides
pub(crate) fn list_dir(
    dir: &Path,
    keep: impl Fn(&Path) -> Option<String>,
) -> Result<BTreeSet<String>, SourceError> {
    if !dir.is_dir() {
        return Err(SourceError::FileNotFound(dir.to_owned()));
    }
    let entries = std::fs::read_dir(dir)
        .map_err(|e| SourceError::ReadFile(dir.to_owned(), e.kind()))?;
    let mut ret = BTreeSet::new();
    for entry in entries {
        let entry = entry
            .map_err(|e| SourceError::ReadFile(dir.to_owned(), e.kind()))?;
        if let Some(name) = keep(&entry.path()) {
            ret.insert(name);
        }
    }
    Ok(ret)
}

/// the names of the subdirectories of `dir`
pub(crate) fn subdirectories(
    dir: &Path,
) -> Result<BTreeSet<String>, SourceError> {
    list_dir(dir, |p| {
        if p.is_dir() {
            p.file_name().map(|s| s.to_string_lossy().into_owned())
        } else {
            None
        }
    })
}
