//! The statistics accumulated over a run and their output files

use std::{fmt::Display, path::Path};

use anyhow::Context;
use irspec::{
    CrossComparator, MethodSummary, ReverseRecord, StatisticsRecord,
};
use log::warn;
use serde::Serialize;

use crate::write_atomic;

pub const REVERSE: &str = "reverse_statistics.csv";
pub const SUMMARY: &str = "summary.json";

/// the name of the forward statistics file for `method`
pub fn statistics_file(method: &str) -> String {
    format!("{method}_statistics.csv")
}

/// A molecule that could not be processed
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Failure {
    pub molecule: String,
    pub error: String,
}

impl Failure {
    pub fn new(molecule: &str, error: &impl Display) -> Self {
        Self {
            molecule: molecule.to_owned(),
            error: error.to_string(),
        }
    }
}

#[derive(Serialize)]
struct Summary<'a> {
    molecules: &'a [String],
    failed: &'a [Failure],
    methods: &'a [MethodSummary],
}

#[derive(Debug)]
pub struct Report {
    comparator: CrossComparator,

    /// the scaling factor of each method, in method order
    scaling: Vec<f64>,

    failed: Vec<Failure>,

    summaries: Vec<MethodSummary>,
}

impl Report {
    pub fn new(
        comparator: CrossComparator,
        scaling: Vec<f64>,
        failed: Vec<Failure>,
    ) -> Self {
        let summaries = comparator.summaries();
        Self {
            comparator,
            scaling,
            failed,
            summaries,
        }
    }

    pub fn comparator(&self) -> &CrossComparator {
        &self.comparator
    }

    pub fn failed(&self) -> &[Failure] {
        &self.failed
    }

    pub fn summaries(&self) -> &[MethodSummary] {
        &self.summaries
    }

    /// write the statistics of every method, the reverse statistics, and the
    /// JSON summary into `dir`
    pub fn write(&self, dir: &Path) -> anyhow::Result<()> {
        let mut reverse: Vec<ReverseRecord> = Vec::new();
        for (method, &scale) in
            self.comparator.methods().iter().zip(&self.scaling)
        {
            let records = self.comparator.records(method, scale)?;
            for r in records.iter().filter(|r| r.pearson.is_none()) {
                warn!(
                    "{} spectrum of {} is incomparable with its reference",
                    method, r.molecule
                );
            }
            let path = dir.join(statistics_file(method));
            write_csv(&path, &StatisticsRecord::HEADER, &records)?;
            reverse.extend(self.comparator.reverse_records(method)?);
        }
        write_csv(&dir.join(REVERSE), &ReverseRecord::HEADER, &reverse)?;

        let summary = Summary {
            molecules: self.comparator.molecules(),
            failed: &self.failed,
            methods: &self.summaries,
        };
        let path = dir.join(SUMMARY);
        let json = serde_json::to_string_pretty(&summary)?;
        write_atomic(&path, json.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

/// write `records` under `header`. the header is written even when there are
/// no records
pub(crate) fn write_csv<T: Serialize>(
    path: &Path,
    header: &[&str],
    records: &[T],
) -> anyhow::Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    wtr.write_record(header)?;
    for r in records {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Rank statistics over {} molecules:",
            self.comparator.len()
        )?;
        writeln!(
            f,
            "{:<12}{:>10}{:>9}{:>11}{:>8}{:>8}",
            "method", "measure", "dir", "matched", "mean", "median"
        )?;
        for s in &self.summaries {
            writeln!(f, "{s}")?;
        }
        if !self.failed.is_empty() {
            writeln!(f, "\nFailed molecules:")?;
            for Failure { molecule, error } in &self.failed {
                writeln!(f, "{molecule}: {error}")?;
            }
        }
        Ok(())
    }
}
