//! Similarity measures between spectra and rank-based matching of candidate
//! spectra against the reference spectra of every molecule.
//!
//! For a fixed method and measure, the similarity matrix has one row per
//! candidate spectrum and one column per reference spectrum, both in molecule
//! order. Ranks use standard competitive ranking: the rank of a pair is one
//! plus the number of comparable pairs in the same row (forward) or column
//! (reverse) with a strictly greater similarity, so ties share the best rank.
//! Incomparable pairs never outrank anything, and an incomparable own pair
//! leaves the molecule unranked.

use std::{error::Error, fmt::Display};

use serde::{Deserialize, Serialize};

use crate::{
    Direction, Dmat, Dvec, MethodSummary, RankSummary, ReverseRecord,
    Spectrum, StatisticsRecord,
};

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    /// the overlap ⟨r, c⟩ / ⟨r, r⟩ of a candidate with a reference
    Score,
    Pearson,
    Spearman,
    Cosine,
}

impl Measure {
    pub const ALL: [Measure; 4] = [
        Measure::Score,
        Measure::Pearson,
        Measure::Spearman,
        Measure::Cosine,
    ];

    /// the similarity of `candidate` to `reference`. only [Measure::Score] is
    /// asymmetric
    pub fn compare(self, reference: &[f64], candidate: &[f64]) -> Similarity {
        match self {
            Measure::Score => overlap(reference, candidate),
            Measure::Pearson => pearson(reference, candidate),
            Measure::Spearman => spearman(reference, candidate),
            Measure::Cosine => cosine(reference, candidate),
        }
    }

    /// like [Measure::compare] but on whole spectra, which must share a
    /// frequency grid to be comparable
    pub fn between(
        self,
        reference: &Spectrum,
        candidate: &Spectrum,
    ) -> Similarity {
        if !reference.same_grid(candidate) {
            log::debug!(
                "{} and {} spectra are on different grids",
                reference.label(),
                candidate.label()
            );
            return Similarity::Incomparable;
        }
        self.compare(reference.intensities(), candidate.intensities())
    }
}

impl Display for Measure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Measure::Score => write!(f, "score"),
            Measure::Pearson => write!(f, "pearson"),
            Measure::Spearman => write!(f, "spearman"),
            Measure::Cosine => write!(f, "cosine"),
        }
    }
}

/// The result of comparing two intensity vectors
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Similarity {
    Value(f64),

    /// the vectors differ in length, or the measure is undefined for them
    /// (zero norm or zero variance). this is not the same as uncorrelated
    Incomparable,
}

impl Similarity {
    /// the similarity, or the 0.0 sentinel for [Similarity::Incomparable]
    pub fn value(self) -> f64 {
        self.get().unwrap_or(0.0)
    }

    pub fn get(self) -> Option<f64> {
        match self {
            Similarity::Value(v) => Some(v),
            Similarity::Incomparable => None,
        }
    }

    pub fn is_incomparable(&self) -> bool {
        matches!(self, Self::Incomparable)
    }
}

impl From<f64> for Similarity {
    /// NaN and infinite values cannot be ranked, so they are incomparable
    fn from(value: f64) -> Self {
        if value.is_finite() {
            Self::Value(value)
        } else {
            Self::Incomparable
        }
    }
}

/// norms below this fraction of the input's norm count as zero
const TOL: f64 = 1e-12;

fn vectors(a: &[f64], b: &[f64]) -> Option<(Dvec, Dvec)> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    Some((Dvec::from(a.to_vec()), Dvec::from(b.to_vec())))
}

fn centered(v: &Dvec) -> Option<Dvec> {
    let c = v.add_scalar(-v.mean());
    if c.norm() <= TOL * v.norm() {
        None
    } else {
        Some(c)
    }
}

fn cosine_of(a: &Dvec, b: &Dvec) -> Similarity {
    let (na, nb) = (a.norm(), b.norm());
    if na == 0.0 || nb == 0.0 {
        return Similarity::Incomparable;
    }
    Similarity::from(a.dot(b) / (na * nb))
}

pub fn cosine(a: &[f64], b: &[f64]) -> Similarity {
    match vectors(a, b) {
        Some((a, b)) => cosine_of(&a, &b),
        None => Similarity::Incomparable,
    }
}

/// Pearson's linear correlation coefficient
pub fn pearson(a: &[f64], b: &[f64]) -> Similarity {
    let Some((a, b)) = vectors(a, b) else {
        return Similarity::Incomparable;
    };
    match (centered(&a), centered(&b)) {
        (Some(a), Some(b)) => cosine_of(&a, &b),
        _ => Similarity::Incomparable,
    }
}

/// Spearman's rank correlation: Pearson's correlation of the fractional ranks
pub fn spearman(a: &[f64], b: &[f64]) -> Similarity {
    if a.len() != b.len() {
        return Similarity::Incomparable;
    }
    pearson(&fractional_ranks(a), &fractional_ranks(b))
}

/// ⟨reference, candidate⟩ / ⟨reference, reference⟩
pub fn overlap(reference: &[f64], candidate: &[f64]) -> Similarity {
    let Some((r, c)) = vectors(reference, candidate) else {
        return Similarity::Incomparable;
    };
    let rr = r.dot(&r);
    if rr == 0.0 {
        return Similarity::Incomparable;
    }
    Similarity::from(r.dot(&c) / rr)
}

/// 1-based ranks of `v` in ascending order, with tied values sharing the mean
/// of the ranks they span
pub fn fractional_ranks(v: &[f64]) -> Vec<f64> {
    let mut idx: Vec<usize> = (0..v.len()).collect();
    idx.sort_by(|&a, &b| v[a].total_cmp(&v[b]));
    let mut ranks = vec![0.0; v.len()];
    let mut i = 0;
    while i < idx.len() {
        let mut j = i;
        while j + 1 < idx.len() && v[idx[j + 1]] == v[idx[i]] {
            j += 1;
        }
        let r = (i + j) as f64 / 2.0 + 1.0;
        for k in i..=j {
            ranks[idx[k]] = r;
        }
        i = j + 1;
    }
    ranks
}

/// the competitive rank of `own` among `all`, which should include `own`
/// itself. `None` if `own` is incomparable
pub fn competitive_rank<'a>(
    own: Similarity,
    all: impl IntoIterator<Item = &'a Similarity>,
) -> Option<usize> {
    let own = own.get()?;
    let better = all
        .into_iter()
        .filter_map(|s| s.get())
        .filter(|&s| s > own)
        .count();
    Some(1 + better)
}

/// the index of the largest comparable similarity, the first one on ties
fn best<'a>(all: impl IntoIterator<Item = &'a Similarity>) -> Option<usize> {
    let mut ret: Option<(usize, f64)> = None;
    for (i, s) in all.into_iter().enumerate() {
        if let Some(v) = s.get()
            && ret.is_none_or(|(_, b)| v > b)
        {
            ret = Some((i, v));
        }
    }
    ret.map(|(i, _)| i)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompareError {
    UnknownMethod(String),
    MissingMethod { molecule: String, method: String },
    DuplicateMolecule(String),
}

impl Display for CompareError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareError::UnknownMethod(m) => write!(f, "unknown method {m}"),
            CompareError::MissingMethod { molecule, method } => {
                write!(f, "no {method} spectrum for {molecule}")
            }
            CompareError::DuplicateMolecule(m) => {
                write!(f, "{m} was already added")
            }
        }
    }
}

impl Error for CompareError {}

/// Collects the normalized reference spectrum and one candidate spectrum per
/// method for each molecule, then ranks them against each other
#[derive(Clone, Debug, Default)]
pub struct CrossComparator {
    methods: Vec<String>,
    molecules: Vec<String>,
    references: Vec<Spectrum>,

    /// `candidates[i][k]` is molecule `i` computed with `methods[k]`
    candidates: Vec<Vec<Spectrum>>,
}

impl CrossComparator {
    pub fn new(methods: Vec<String>) -> Self {
        Self {
            methods,
            ..Default::default()
        }
    }

    /// add the spectra for `molecule`. `candidates` must contain a spectrum
    /// labeled with each method name; extras are ignored
    pub fn push(
        &mut self,
        molecule: impl Into<String>,
        reference: Spectrum,
        mut candidates: Vec<Spectrum>,
    ) -> Result<(), CompareError> {
        let molecule = molecule.into();
        if self.molecules.contains(&molecule) {
            return Err(CompareError::DuplicateMolecule(molecule));
        }
        let mut row = Vec::with_capacity(self.methods.len());
        for method in &self.methods {
            let Some(pos) = candidates.iter().position(|s| s.label() == method)
            else {
                return Err(CompareError::MissingMethod {
                    molecule,
                    method: method.clone(),
                });
            };
            row.push(candidates.swap_remove(pos));
        }
        self.molecules.push(molecule);
        self.references.push(reference);
        self.candidates.push(row);
        Ok(())
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    pub fn molecules(&self) -> &[String] {
        &self.molecules
    }

    pub fn len(&self) -> usize {
        self.molecules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty()
    }

    fn method_index(&self, method: &str) -> Result<usize, CompareError> {
        self.methods
            .iter()
            .position(|m| m == method)
            .ok_or_else(|| CompareError::UnknownMethod(method.to_owned()))
    }

    /// the similarity of every `method` candidate (rows) to every reference
    /// (columns)
    pub fn matrix(
        &self,
        method: &str,
        measure: Measure,
    ) -> Result<Dmat<Similarity>, CompareError> {
        let k = self.method_index(method)?;
        let n = self.len();
        Ok(Dmat::from_fn(n, n, |i, j| {
            measure.between(&self.references[j], &self.candidates[i][k])
        }))
    }

    /// for each molecule, the rank of its own reference among all references
    /// as matches for its `method` candidate
    pub fn forward_ranks(
        &self,
        method: &str,
        measure: Measure,
    ) -> Result<Vec<Option<usize>>, CompareError> {
        let m = self.matrix(method, measure)?;
        Ok(forward(&m))
    }

    /// for each molecule, the rank of its own `method` candidate among the
    /// `method` candidates of all molecules as matches for its reference
    pub fn reverse_ranks(
        &self,
        method: &str,
        measure: Measure,
    ) -> Result<Vec<Option<usize>>, CompareError> {
        let m = self.matrix(method, measure)?;
        Ok(reverse(&m))
    }

    /// one [StatisticsRecord] per molecule for `method`, the forward
    /// direction. `best_match` is the closest reference by Pearson correlation
    pub fn records(
        &self,
        method: &str,
        scaling_factor: f64,
    ) -> Result<Vec<StatisticsRecord>, CompareError> {
        let mats = self.matrices(method)?;
        let ranks: Vec<_> = mats.iter().map(forward).collect();
        let pearson = &mats[1];
        let ret = (0..self.len())
            .map(|i| StatisticsRecord {
                molecule: self.molecules[i].clone(),
                score: mats[0][(i, i)].get(),
                pearson: mats[1][(i, i)].get(),
                spearman: mats[2][(i, i)].get(),
                cosine: mats[3][(i, i)].get(),
                score_rank: ranks[0][i],
                pearson_rank: ranks[1][i],
                spearman_rank: ranks[2][i],
                cosine_rank: ranks[3][i],
                best_match: best(pearson.row(i).iter())
                    .map(|j| self.molecules[j].clone()),
                scaling_factor,
            })
            .collect();
        Ok(ret)
    }

    /// one [ReverseRecord] per molecule for `method`. `closest` is the
    /// molecule whose candidate best matches the reference by Pearson
    /// correlation
    pub fn reverse_records(
        &self,
        method: &str,
    ) -> Result<Vec<ReverseRecord>, CompareError> {
        let mats = self.matrices(method)?;
        let ranks: Vec<_> = mats.iter().map(reverse).collect();
        let pearson = &mats[1];
        let ret = (0..self.len())
            .map(|j| ReverseRecord {
                molecule: self.molecules[j].clone(),
                method: method.to_owned(),
                score_rank: ranks[0][j],
                pearson_rank: ranks[1][j],
                spearman_rank: ranks[2][j],
                cosine_rank: ranks[3][j],
                closest: best(pearson.column(j).iter())
                    .map(|i| self.molecules[i].clone()),
            })
            .collect();
        Ok(ret)
    }

    /// rank statistics for every method, measure, and direction
    pub fn summaries(&self) -> Vec<MethodSummary> {
        let mut ret = Vec::new();
        for method in &self.methods {
            let Ok(mats) = self.matrices(method) else {
                continue;
            };
            for (measure, m) in Measure::ALL.into_iter().zip(&mats) {
                for (direction, ranks) in [
                    (Direction::Forward, forward(m)),
                    (Direction::Reverse, reverse(m)),
                ] {
                    ret.push(MethodSummary {
                        method: method.clone(),
                        measure,
                        direction,
                        ranks: RankSummary::new(&ranks),
                    });
                }
            }
        }
        ret
    }

    /// the similarity matrices for `method` in the order of [Measure::ALL]
    fn matrices(
        &self,
        method: &str,
    ) -> Result<Vec<Dmat<Similarity>>, CompareError> {
        Measure::ALL
            .into_iter()
            .map(|measure| self.matrix(method, measure))
            .collect()
    }
}

fn forward(m: &Dmat<Similarity>) -> Vec<Option<usize>> {
    (0..m.nrows())
        .map(|i| competitive_rank(m[(i, i)], m.row(i).iter()))
        .collect()
}

fn reverse(m: &Dmat<Similarity>) -> Vec<Option<usize>> {
    (0..m.ncols())
        .map(|j| competitive_rank(m[(j, j)], m.column(j).iter()))
        .collect()
}
