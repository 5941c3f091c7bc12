//! Measured reference spectra stored one file per molecule as
//! `<molecule>.jdx`, a JCAMP-DX subset: `##LABEL=value` header records and an
//! `(X++(Y..Y))` table after `##XYDATA=`

use std::{
    collections::{BTreeSet, HashMap},
    path::{Path, PathBuf},
};

use irspec::{Grid, LineShape, Spectrum};

use super::{SourceError, SpectrumSource, parse_finite, read_file};


/// the smallest transmittance converted to absorbance
const MIN_TRANSMITTANCE: f64 = 1e-6;

#[derive(Clone, Debug, PartialEq)]
pub struct Experimental {
    name: String,
    dir: PathBuf,
}

/// the labeled data records of a JCAMP-DX file
struct Header(HashMap<String, String>);

impl Header {
    /// JCAMP labels ignore case, spaces, hyphens, slashes and underscores
    fn key(label: &str) -> String {
        label
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '/' | '_'))
            .map(|c| c.to_ascii_uppercase())
            .collect()
    }

    fn get(&self, label: &str) -> Option<&str> {
        self.0.get(label).map(String::as_str)
    }

    fn float(
        &self,
        label: &str,
        path: &Path,
    ) -> Result<Option<f64>, SourceError> {
        let Some(v) = self.get(label) else {
            return Ok(None);
        };
        let f = parse_finite(v).ok_or_else(|| SourceError::Inconsistent {
            path: path.to_owned(),
            msg: format!("##{label}={v} is not a number"),
        })?;
        Ok(Some(f))
    }
}

impl Experimental {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
        }
    }

    pub fn path(&self, molecule: &str) -> PathBuf {
        self.dir.join(format!("{molecule}.jdx"))
    }

    /// parse the contents of the JCAMP-DX file at `path` into a spectrum
    /// labeled `label` on the file's own frequency axis, in ascending order and
    /// in absorbance units
    pub fn parse_jdx(
        contents: &str,
        path: &Path,
        label: &str,
    ) -> Result<Spectrum, SourceError> {
        let mut header = HashMap::new();
        let mut ys = Vec::new();
        let mut in_data = false;
        for (i, line) in contents.lines().enumerate() {
            let line = match line.find("$$") {
                Some(c) => &line[..c],
                None => line,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(record) = line.strip_prefix("##") {
                let Some((k, v)) = record.split_once('=') else {
                    return Err(SourceError::parse(
                        path,
                        i + 1,
                        "expected ##LABEL=value",
                    ));
                };
                let key = Header::key(k);
                in_data = key == "XYDATA";
                header.insert(key, v.trim().to_owned());
                continue;
            }
            if !in_data {
                continue;
            }
            // the leading abscissa is implied by FIRSTX and DELTAX
            for word in line.split_whitespace().skip(1) {
                let y = parse_finite(word).ok_or_else(|| {
                    SourceError::parse(
                        path,
                        i + 1,
                        format!("unsupported ordinate `{word}`"),
                    )
                })?;
                ys.push(y);
            }
        }
        let header = Header(header);
        if header.get("XYDATA").is_none() || ys.is_empty() {
            return Err(SourceError::Missing {
                path: path.to_owned(),
                what: "##XYDATA table",
            });
        }

        let (first, last) = match (
            header.float("FIRSTX", path)?,
            header.float("LASTX", path)?,
        ) {
            (Some(f), Some(l)) => (f, l),
            _ => {
                let (Some(min), Some(max)) = (
                    header.float("MINX", path)?,
                    header.float("MAXX", path)?,
                ) else {
                    return Err(SourceError::Missing {
                        path: path.to_owned(),
                        what: "##FIRSTX/##LASTX or ##MINX/##MAXX",
                    });
                };
                let descending = header
                    .float("DELTAX", path)?
                    .is_some_and(|d| d < 0.0);
                if descending { (max, min) } else { (min, max) }
            }
        };
        let npoints = match header.float("NPOINTS", path)? {
            Some(n) => n as usize,
            None => match header.float("DELTAX", path)? {
                Some(d) if d != 0.0 => {
                    ((last - first) / d).round() as usize + 1
                }
                _ => ys.len(),
            },
        };
        if npoints < 2 {
            return Err(SourceError::Inconsistent {
                path: path.to_owned(),
                msg: format!("{npoints} points cannot span {first}..{last}"),
            });
        }
        if ys.len() < npoints {
            return Err(SourceError::Inconsistent {
                path: path.to_owned(),
                msg: format!(
                    "expected {npoints} ordinates, found {}",
                    ys.len()
                ),
            });
        }
        if ys.len() > npoints {
            log::warn!(
                "{}: ignoring {} ordinates past NPOINTS={npoints}",
                path.display(),
                ys.len() - npoints
            );
            ys.truncate(npoints);
        }

        let yfactor = header.float("YFACTOR", path)?.unwrap_or(1.0);
        for y in &mut ys {
            *y *= yfactor;
        }
        if header
            .get("YUNITS")
            .is_some_and(|u| u.to_ascii_uppercase().contains("TRANSMITTANCE"))
        {
            let max = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let percent = if max > 1.5 { 100.0 } else { 1.0 };
            for y in &mut ys {
                *y = -(*y / percent).max(MIN_TRANSMITTANCE).log10();
            }
        }

        let dx = (last - first) / (npoints - 1) as f64;
        let mut xs: Vec<f64> =
            (0..npoints).map(|i| first + i as f64 * dx).collect();
        xs[npoints - 1] = last;
        if dx < 0.0 {
            xs.reverse();
            ys.reverse();
        }
        Spectrum::new(label, xs, ys)
            .map_err(|e| SourceError::Spectrum(path.to_owned(), e))
    }
}

impl SpectrumSource for Experimental {
    fn name(&self) -> &str {
        &self.name
    }

    fn dir(&self) -> &Path {
        &self.dir
    }

    fn molecules(&self) -> Result<BTreeSet<String>, SourceError> {
        super::list_dir(&self.dir, |p| {
            if p.is_file() && p.extension().is_some_and(|e| e == "jdx") {
                p.file_stem().map(|s| s.to_string_lossy().into_owned())
            } else {
                None
            }
        })
    }

    /// read the measured spectrum and interpolate it onto `grid`. measured
    /// data is already broadened, so `shape` is unused
    fn produce(
        &self,
        molecule: &str,
        grid: &Grid,
        _shape: &LineShape,
    ) -> Result<Spectrum, SourceError> {
        let path = self.path(molecule);
        let contents = read_file(&path)?;
        let spectrum = Self::parse_jdx(&contents, &path, &self.name)?;
        Ok(spectrum.resample(grid))
    }
}
