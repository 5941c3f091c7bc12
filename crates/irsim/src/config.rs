//! Configuration settings for an irsim run

use std::{
    collections::HashSet,
    fmt::{Debug, Display},
    fs::read_to_string,
    path::{Path, PathBuf},
};

use anyhow::{Context, bail};
use irspec::{Grid, LineShape, Normalization};
use nmsrc::{
    Experimental, Gmx, Gromacs, NmSettings, QmLog, SpectrumSource,
};
use serde::{Deserialize, Serialize};


fn one() -> f64 {
    1.0
}

fn default_sigma() -> usize {
    1
}

/// Where the spectra of one method come from. Selected by the `kind` key
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
#[serde(tag = "kind", rename_all = "kebab-case", deny_unknown_fields)]
pub enum SourceConfig {
    /// harmonic frequencies and intensities from
    /// `<dir>/<molecule>/*<method>.log` or the gzipped equivalent
    QmLog {
        name: String,
        dir: PathBuf,
        method: String,
        #[serde(default = "one")]
        scale: f64,
    },

    /// a GROMACS normal-mode analysis in `<dir>/<molecule>/`
    Gromacs {
        name: String,
        dir: PathBuf,
        /// the molecules that are linear
        #[serde(default)]
        linear: Vec<String>,
        #[serde(default)]
        degenerate: usize,
        #[serde(default = "one")]
        scale: f64,

        /// run the minimization and normal-mode analysis before reading its
        /// output
        #[serde(default)]
        run_nm: bool,

        /// the directory holding `cg.mdp` and `nm.mdp`. required with `run_nm`
        mdp_dir: Option<PathBuf>,

        #[serde(default = "default_sigma")]
        sigma: usize,
    },

    /// measured spectra in `<dir>/<molecule>.jdx`
    Experimental { name: String, dir: PathBuf },
}

impl SourceConfig {
    pub fn name(&self) -> &str {
        match self {
            SourceConfig::QmLog { name, .. }
            | SourceConfig::Gromacs { name, .. }
            | SourceConfig::Experimental { name, .. } => name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SourceConfig::QmLog { .. } => "qm-log",
            SourceConfig::Gromacs { .. } => "gromacs",
            SourceConfig::Experimental { .. } => "experimental",
        }
    }

    /// construct the [SpectrumSource] described by `self`. `gmx` is handed to
    /// GROMACS sources
    pub fn build(&self, gmx: Option<&Gmx>) -> Box<dyn SpectrumSource> {
        match self.clone() {
            SourceConfig::QmLog {
                name,
                dir,
                method,
                scale,
            } => Box::new(QmLog::new(name, dir, method).scale(scale)),
            SourceConfig::Gromacs {
                name,
                dir,
                linear,
                degenerate,
                scale,
                run_nm,
                mdp_dir,
                sigma,
            } => {
                let mut g = Gromacs::new(name, dir)
                    .linear(linear)
                    .degenerate(degenerate)
                    .scale(scale)
                    .gmx(gmx.cloned());
                if run_nm && let Some(mdp_dir) = mdp_dir {
                    g = g.normal_modes(NmSettings { mdp_dir, sigma });
                }
                Box::new(g)
            }
            SourceConfig::Experimental { name, dir } => {
                Box::new(Experimental::new(name, dir))
            }
        }
    }
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    /// The directory to write statistics, data, and images into. It must
    /// already exist.
    output: PathBuf,

    /// The lowest frequency of the analysis grid in cm⁻¹. Defaults to 0.
    start: Option<f64>,

    /// The highest frequency of the analysis grid in cm⁻¹. Defaults to 4000.
    stop: Option<f64>,

    /// The spacing of the analysis grid in cm⁻¹. Defaults to 4 unless `points`
    /// is given instead.
    step: Option<f64>,

    /// The number of grid points, including both ends. Mutually exclusive with
    /// `step`.
    points: Option<usize>,

    /// The full width at half maximum of the Lorentzian line shape in cm⁻¹.
    /// Defaults to 24.
    gamma: Option<f64>,

    /// How to put spectra on a common intensity scale: "area", "baseline", or
    /// "none". Defaults to "area".
    normalize: Option<Normalization>,

    /// Render an SVG plot of the spectra of each molecule. Defaults to true.
    plot: Option<bool>,

    /// Molecules whose names contain any of these strings are skipped.
    /// Defaults to the halogens bromine, chlorine, and iodine.
    exclude: Option<Vec<String>>,

    /// Abort the whole run at the first molecule that fails. Defaults to
    /// false, which skips failed molecules and reports them at the end.
    strict: Option<bool>,

    /// The source every candidate is compared against.
    reference: SourceConfig,

    /// The methods being evaluated.
    #[serde(default)]
    candidates: Vec<SourceConfig>,
}

/// Construct a full `Config` using [Config::load] on a TOML file or use
/// [Config::new] and the Builder pattern
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
#[serde(from = "RawConfig")]
pub struct Config {
    pub output: PathBuf,

    pub start: f64,

    pub stop: f64,

    /// grid spacing. ignored if `points` is set
    pub step: f64,

    pub points: Option<usize>,

    pub gamma: f64,

    pub normalize: Normalization,

    pub plot: bool,

    pub exclude: Vec<String>,

    pub strict: bool,

    pub reference: SourceConfig,

    pub candidates: Vec<SourceConfig>,

    /// both `step` and `points` were given. reported by [Config::validate]
    #[serde(skip)]
    spacing_conflict: bool,
}

impl From<RawConfig> for Config {
    fn from(rc: RawConfig) -> Self {
        Self {
            output: rc.output,
            start: rc.start.unwrap_or(Self::START),
            stop: rc.stop.unwrap_or(Self::STOP),
            spacing_conflict: rc.step.is_some() && rc.points.is_some(),
            step: rc.step.unwrap_or(Self::STEP),
            points: rc.points,
            gamma: rc.gamma.unwrap_or(Self::GAMMA),
            normalize: rc.normalize.unwrap_or_default(),
            plot: rc.plot.unwrap_or(true),
            exclude: rc.exclude.unwrap_or_else(Self::default_exclude),
            strict: rc.strict.unwrap_or(false),
            reference: rc.reference,
            candidates: rc.candidates,
        }
    }
}

impl Config {
    pub const START: f64 = 0.0;
    pub const STOP: f64 = 4000.0;
    pub const STEP: f64 = 4.0;
    pub const GAMMA: f64 = 24.0;

    fn default_exclude() -> Vec<String> {
        ["brom", "chlor", "iod"].map(String::from).into()
    }

    /// Construct a [Config] with default values for `start` (0 cm⁻¹), `stop`
    /// (4000 cm⁻¹), `step` (4 cm⁻¹), `gamma` (24 cm⁻¹), `normalize` (area),
    /// `plot` (true), `exclude` (halogens), and `strict` (false)
    pub fn new(
        output: impl Into<PathBuf>,
        reference: SourceConfig,
        candidates: Vec<SourceConfig>,
    ) -> Self {
        Self {
            output: output.into(),
            start: Self::START,
            stop: Self::STOP,
            step: Self::STEP,
            points: None,
            gamma: Self::GAMMA,
            normalize: Normalization::default(),
            plot: true,
            exclude: Self::default_exclude(),
            strict: false,
            reference,
            candidates,
            spacing_conflict: false,
        }
    }

    pub fn range(mut self, start: f64, stop: f64) -> Self {
        self.start = start;
        self.stop = stop;
        self
    }

    pub fn step(mut self, step: f64) -> Self {
        self.step = step;
        self.points = None;
        self
    }

    pub fn points(mut self, points: usize) -> Self {
        self.points = Some(points);
        self
    }

    pub fn gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn normalize(mut self, normalize: Normalization) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn plot(mut self, plot: bool) -> Self {
        self.plot = plot;
        self
    }

    pub fn exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// load a [Config] from the TOML file specified by `filename` and
    /// [Config::validate] it
    pub fn load<P>(filename: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path> + Debug,
    {
        let contents = read_to_string(&filename).with_context(|| {
            format!("failed to load config file {filename:?}")
        })?;
        let ret: Self = toml::from_str(&contents).with_context(|| {
            format!("failed to deserialize config file {filename:?}")
        })?;
        ret.validate()?;
        Ok(ret)
    }

    /// the analysis grid
    pub fn grid(&self) -> anyhow::Result<Grid> {
        let grid = match self.points {
            Some(n) => Grid::with_points(self.start, self.stop, n),
            None => Grid::with_step(self.start, self.stop, self.step),
        };
        grid.context("invalid frequency grid")
    }

    pub fn line_shape(&self) -> anyhow::Result<LineShape> {
        LineShape::new(self.gamma).context("invalid line width")
    }

    /// every source, reference first
    pub fn sources(&self) -> impl Iterator<Item = &SourceConfig> {
        std::iter::once(&self.reference).chain(&self.candidates)
    }

    /// whether any source has to run gmx for every molecule
    pub fn needs_gmx(&self) -> bool {
        self.sources().any(|s| {
            matches!(s, SourceConfig::Gromacs { run_nm: true, .. })
        })
    }

    /// check the settings in `self` for consistency. this does not touch the
    /// file system
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.spacing_conflict {
            bail!("only one of step and points may be given");
        }
        self.grid()?;
        self.line_shape()?;
        if self.candidates.is_empty() {
            bail!("at least one candidate source is required");
        }
        let mut names = HashSet::new();
        for source in self.sources() {
            let name = source.name();
            if name.is_empty() {
                bail!("{} source with an empty name", source.kind());
            }
            if !names.insert(name) {
                bail!("source name {name} is used more than once");
            }
            match source {
                SourceConfig::QmLog { scale, .. }
                | SourceConfig::Gromacs { scale, .. }
                    if !(scale.is_finite() && *scale > 0.0) =>
                {
                    bail!("{name}: scale must be positive, got {scale}")
                }
                SourceConfig::Gromacs {
                    run_nm: true,
                    mdp_dir: None,
                    ..
                } => bail!("{name}: run_nm requires mdp_dir"),
                _ => {}
            }
        }
        Ok(())
    }
}

impl Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Config {
            output,
            start,
            stop,
            step,
            points,
            gamma,
            normalize,
            plot,
            exclude,
            strict,
            reference,
            candidates,
            spacing_conflict: _,
        } = self;
        let spacing = match points {
            Some(n) => format!("points = {n}"),
            None => format!("step = {step}"),
        };
        write!(
            f,
            "
Configuration Options:
output = {}
start = {start}
stop = {stop}
{spacing}
gamma = {gamma}
normalize = {normalize}
plot = {plot}
exclude = [{}]
strict = {strict}
reference = {} ({})
",
            output.display(),
            exclude.join(", "),
            reference.name(),
            reference.kind(),
        )?;
        for c in candidates {
            writeln!(f, "candidate = {} ({})", c.name(), c.kind())?;
        }
        Ok(())
    }
}
