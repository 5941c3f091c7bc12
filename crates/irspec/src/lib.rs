//! Infrared spectra from normal modes: the molecular data model, Lorentzian
//! line-shape synthesis, area normalization, and rank-based cross-comparison
//! of spectra computed with different methods.

pub use atom::{Atom, extract_atoms};
pub use compare::{CompareError, CrossComparator, Measure, Similarity};
pub use grid::{Grid, GridError};
pub use lineshape::{Line, LineShape};
pub use mode::NormalMode;
pub use molecule::{ModelError, Molecule};
pub use normalize::{Normalization, Normalized};
pub use spectrum::{Spectrum, SpectrumError};
pub use stats::{
    Direction, MethodSummary, RankSummary, ReverseRecord, StatisticsRecord,
};

mod atom;
mod mode;
mod molecule;

pub mod compare;
pub mod grid;
pub mod lineshape;
pub mod normalize;
pub mod spectrum;
pub mod stats;


pub type Vec3 = nalgebra::Vector3<f64>;
type Dvec = nalgebra::DVector<f64>;
type Dmat<T> = nalgebra::DMatrix<T>;
