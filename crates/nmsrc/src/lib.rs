//! Producers of IR spectra: quantum chemistry log files, GROMACS normal-mode
//! analyses, and digitized experimental spectra, all behind the
//! [SpectrumSource] trait.

pub mod gmx;
pub mod source;

pub use gmx::{Gmx, ProcessError};
pub use source::{
    SourceError, SpectrumSource, experimental::Experimental,
    gromacs::{Gromacs, NmSettings},
    qmlog::QmLog,
};
