//! Spectra from the harmonic frequency analysis of a quantum chemistry log,
//! such as a Gaussian G4 calculation, optionally gzip-compressed

use std::{
    collections::BTreeSet,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use flate2::read::GzDecoder;
use irspec::{Grid, Line, LineShape, Spectrum};
use regex::Regex;

use super::{
    SourceError, SpectrumSource, parse_finite, read_file, subdirectories,
};

#[cfg(test)]
mod tests;

static NUMBER: OnceLock<Regex> = OnceLock::new();

#[derive(Clone, Debug, PartialEq)]
pub struct QmLog {
    name: String,
    dir: PathBuf,
    method: String,
    scale: f64,
}

impl QmLog {
    /// a source named `name` reading `<dir>/<molecule>/*<method>.log[.gz]`
    pub fn new(
        name: impl Into<String>,
        dir: impl Into<PathBuf>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            method: method.into(),
            scale: 1.0,
        }
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// the log file for `molecule`. when several match, the first in sorted
    /// order wins
    pub fn find_log(&self, molecule: &str) -> Result<PathBuf, SourceError> {
        let dir = self.dir.join(molecule);
        let plain = format!("{}.log", self.method);
        let gz = format!("{}.log.gz", self.method);
        let logs = super::list_dir(&dir, |p| {
            let name = p.file_name()?.to_str()?;
            (p.is_file() && (name.ends_with(&plain) || name.ends_with(&gz)))
                .then(|| name.to_owned())
        })?;
        let mut logs = logs.into_iter();
        let Some(log) = logs.next() else {
            let pattern = format!("*{plain}[.gz]");
            return Err(SourceError::FileNotFound(dir.join(pattern)));
        };
        if let Some(other) = logs.next() {
            log::warn!(
                "ignoring {other} in favor of {log} in {}",
                dir.display()
            );
        }
        Ok(dir.join(log))
    }

    /// read `path`, decompressing it if its name ends in `.gz`
    pub fn read_log(path: &Path) -> Result<String, SourceError> {
        if path.extension().is_none_or(|e| e != "gz") {
            return read_file(path);
        }
        let f = File::open(path)
            .map_err(|e| SourceError::ReadFile(path.to_owned(), e.kind()))?;
        log::debug!("decompressing {}", path.display());
        let mut ret = String::new();
        GzDecoder::new(f)
            .read_to_string(&mut ret)
            .map_err(|e| SourceError::ReadFile(path.to_owned(), e.kind()))?;
        Ok(ret)
    }

    /// collect the lines from every `Frequencies` and `IR Inten` record in
    /// `contents`. `path` is only used for errors
    pub fn parse_log(
        contents: &str,
        path: &Path,
    ) -> Result<Vec<Line>, SourceError> {
        let number = NUMBER
            .get_or_init(|| Regex::new(r"[-+]?\d*\.\d+|\d+").unwrap());
        let numbers = |i: usize, line: &str| {
            number
                .find_iter(line)
                .map(|m| {
                    parse_finite(m.as_str()).ok_or_else(|| {
                        SourceError::parse(
                            path,
                            i + 1,
                            format!("bad number `{}`", m.as_str()),
                        )
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        };
        let mut freqs = Vec::new();
        let mut intensities = Vec::new();
        for (i, line) in contents.lines().enumerate() {
            if line.contains("Frequencies") {
                freqs.extend(numbers(i, line)?);
            } else if line.contains("IR Inten") {
                intensities.extend(numbers(i, line)?);
            }
        }
        if freqs.is_empty() || intensities.is_empty() {
            return Err(SourceError::Missing {
                path: path.to_owned(),
                what: "frequencies and IR intensities",
            });
        }
        if freqs.len() != intensities.len() {
            return Err(SourceError::Inconsistent {
                path: path.to_owned(),
                msg: format!(
                    "{} frequencies but {} IR intensities",
                    freqs.len(),
                    intensities.len()
                ),
            });
        }
        Ok(freqs
            .into_iter()
            .zip(intensities)
            .map(|(f, i)| Line::new(f, i))
            .collect())
    }
}

impl SpectrumSource for QmLog {
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
        let path = self.find_log(molecule)?;
        log::info!("reading log file at {}", path.display());
        let contents = Self::read_log(&path)?;
        let mut lines = Self::parse_log(&contents, &path)?;
        for line in &mut lines {
            line.freq *= self.scale;
        }
        Ok(shape.synthesize(&self.name, &lines, grid))
    }

    fn scaling_factor(&self) -> f64 {
        self.scale
    }
}
