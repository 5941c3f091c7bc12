//! Discovering molecules and running every one of them through synthesis,
//! normalization, output, and comparison

use std::{
    collections::BTreeSet,
    fs::OpenOptions,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, bail};
use irspec::{
    CrossComparator, Grid, LineShape, Spectrum, normalize::normalize_all,
};
use log::{debug, error, info, warn};
use nmsrc::{Gmx, SourceError, SpectrumSource};

use crate::{
    Config, Failure, Report,
    plot::Plot,
    report::{REVERSE, SUMMARY, statistics_file},
    write_atomic,
};

/// the name of the file marking an output directory as in use
pub const LOCK: &str = ".irsim.lock";

/// Exclusive use of an output directory by one run. The lock file is created
/// when the lock is taken and removed when it is dropped
#[derive(Debug)]
pub struct OutputLock {
    path: PathBuf,
}

impl OutputLock {
    /// take the lock on `dir`, failing if another run already holds it
    pub fn acquire(dir: &Path) -> anyhow::Result<Self> {
        let path = dir.join(LOCK);
        let mut f = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => bail!(
                "{} is in use by another run. remove {} if that run is no \
                 longer active",
                dir.display(),
                path.display()
            ),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to create {}", path.display())
                });
            }
        };
        writeln!(f, "{}", std::process::id())?;
        debug!("locked {}", dir.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for OutputLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("failed to remove {} with {e}", self.path.display());
        }
    }
}

/// the molecules every one of `sources` has data for, in sorted order,
/// without the ones whose names contain any of the `exclude` patterns
pub fn discover(
    sources: &[&dyn SpectrumSource],
    exclude: &[String],
) -> Result<Vec<String>, SourceError> {
    let mut common: Option<BTreeSet<String>> = None;
    for source in sources {
        let found = source.molecules()?;
        debug!(
            "found {} molecules for {} in {}",
            found.len(),
            source.name(),
            source.dir().display()
        );
        common = Some(match common {
            Some(c) => c.intersection(&found).cloned().collect(),
            None => found,
        });
    }
    let mut ret = Vec::new();
    for mol in common.unwrap_or_default() {
        if let Some(pat) = exclude.iter().find(|p| mol.contains(p.as_str())) {
            info!("excluding {mol}, which matches {pat}");
            continue;
        }
        ret.push(mol);
    }
    Ok(ret)
}

pub struct Pipeline {
    config: Config,
    grid: Grid,
    shape: LineShape,
    reference: Box<dyn SpectrumSource>,
    candidates: Vec<Box<dyn SpectrumSource>>,
}

impl Pipeline {
    /// validate `config` and construct its sources. gmx is looked up on the
    /// `PATH` and is only required when a source has to run the normal-mode
    /// analysis
    pub fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;
        let gmx = if config.needs_gmx() {
            Some(Gmx::locate()?)
        } else {
            Gmx::locate().ok()
        };
        let grid = config.grid()?;
        let shape = config.line_shape()?;
        let reference = config.reference.build(gmx.as_ref());
        let candidates = config
            .candidates
            .iter()
            .map(|c| c.build(gmx.as_ref()))
            .collect();
        Ok(Self {
            config,
            grid,
            shape,
            reference,
            candidates,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    fn sources(&self) -> Vec<&dyn SpectrumSource> {
        std::iter::once(&self.reference)
            .chain(&self.candidates)
            .map(|s| s.as_ref())
            .collect()
    }

    /// the molecules to process
    pub fn molecules(&self) -> anyhow::Result<Vec<String>> {
        discover(&self.sources(), &self.config.exclude)
            .context("failed to discover molecules")
    }

    /// every file a run over `molecules` writes
    pub fn outputs(&self, molecules: &[String]) -> Vec<PathBuf> {
        let out = &self.config.output;
        let mut ret: Vec<PathBuf> = self
            .candidates
            .iter()
            .map(|c| out.join(statistics_file(c.name())))
            .collect();
        ret.push(out.join(REVERSE));
        ret.push(out.join(SUMMARY));
        for mol in molecules {
            ret.push(out.join(format!("{mol}.csv")));
            if self.config.plot {
                ret.push(out.join(format!("{mol}.svg")));
            }
        }
        ret
    }

    /// produce and normalize the spectra of `molecule`, reference first
    pub fn spectra(
        &self,
        molecule: &str,
    ) -> Result<Vec<Spectrum>, SourceError> {
        let mut ret = Vec::with_capacity(1 + self.candidates.len());
        for source in self.sources() {
            ret.push(source.produce(molecule, &self.grid, &self.shape)?);
        }
        let results = normalize_all(&mut ret, self.config.normalize);
        let degenerate = results.iter().filter(|r| r.is_degenerate()).count();
        if degenerate > 0 {
            warn!("{degenerate} spectra of {molecule} could not be normalized");
        }
        Ok(ret)
    }

    fn write_molecule(
        &self,
        molecule: &str,
        spectra: &[Spectrum],
    ) -> anyhow::Result<()> {
        let out = &self.config.output;
        let path = out.join(format!("{molecule}.csv"));
        write_data(&path, spectra)
            .with_context(|| format!("failed to write {}", path.display()))?;
        if self.config.plot {
            let path = out.join(format!("{molecule}.svg"));
            let svg = Plot::new(molecule, spectra).to_svg();
            write_atomic(&path, svg.as_bytes()).with_context(|| {
                format!("failed to write {}", path.display())
            })?;
            info!("SVG file saved at {}", path.display());
        }
        Ok(())
    }

    /// process every molecule and write the per-molecule outputs and the
    /// [Report] accumulated over them, which is also returned. nothing is
    /// written if an output already exists and `overwrite` is false, or if
    /// another run holds the [OutputLock] on the output directory
    pub fn run(&self, overwrite: bool) -> anyhow::Result<Report> {
        let out = &self.config.output;
        if !out.is_dir() {
            bail!("the output directory {} does not exist", out.display());
        }
        let _lock = OutputLock::acquire(out)?;
        let molecules = self.molecules()?;
        if molecules.is_empty() {
            warn!("no molecules are shared by every source");
        }
        if !overwrite
            && let Some(p) =
                self.outputs(&molecules).into_iter().find(|p| p.exists())
        {
            bail!(
                "{} already exists. overwrite with --overwrite",
                p.display()
            );
        }

        let methods = self
            .candidates
            .iter()
            .map(|c| c.name().to_owned())
            .collect();
        let mut comparator = CrossComparator::new(methods);
        let mut failed = Vec::new();
        for mol in &molecules {
            info!("processing {mol}");
            let mut spectra = match self.spectra(mol) {
                Ok(s) => s,
                Err(e) if self.config.strict => {
                    return Err(e).with_context(|| format!("failed on {mol}"));
                }
                Err(e) => {
                    error!("skipping {mol}: {e}");
                    failed.push(Failure::new(mol, &e));
                    continue;
                }
            };
            self.write_molecule(mol, &spectra)?;
            let reference = spectra.remove(0);
            comparator.push(mol.as_str(), reference, spectra)?;
        }
        let scaling = self
            .candidates
            .iter()
            .map(|c| c.scaling_factor())
            .collect();
        let report = Report::new(comparator, scaling, failed);
        report.write(out)?;
        Ok(report)
    }
}

/// write `spectra`, which share one grid, as a CSV table with a frequency
/// column and one intensity column per spectrum
pub fn write_data(path: &Path, spectra: &[Spectrum]) -> anyhow::Result<()> {
    let Some(first) = spectra.first() else {
        bail!("no spectra to write");
    };
    let mut wtr = csv::Writer::from_path(path)?;
    let mut header = vec!["frequency"];
    header.extend(spectra.iter().map(|s| s.label()));
    wtr.write_record(&header)?;
    for (i, f) in first.freqs().iter().enumerate() {
        let mut row = vec![f.to_string()];
        for s in spectra {
            let y = s.intensities().get(i).copied().unwrap_or_default();
            row.push(y.to_string());
        }
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}
