//! Output records of a cross-comparison

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::Measure;

/// One row of a method's statistics: how its spectrum of `molecule` compares
/// with the reference spectra. Similarities are `None` where the pair was
/// incomparable; ranks are `None` where the molecule could not be ranked.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatisticsRecord {
    pub molecule: String,
    pub score: Option<f64>,
    pub pearson: Option<f64>,
    pub spearman: Option<f64>,
    pub cosine: Option<f64>,
    pub score_rank: Option<usize>,
    pub pearson_rank: Option<usize>,
    pub spearman_rank: Option<usize>,
    pub cosine_rank: Option<usize>,
    pub best_match: Option<String>,
    pub scaling_factor: f64,
}

impl StatisticsRecord {
    /// the field names in serialization order
    pub const HEADER: [&str; 11] = [
        "molecule",
        "score",
        "pearson",
        "spearman",
        "cosine",
        "score_rank",
        "pearson_rank",
        "spearman_rank",
        "cosine_rank",
        "best_match",
        "scaling_factor",
    ];
}

/// The inverse query: how well `molecule`'s reference picks out its own
/// `method` candidate among the candidates of every molecule
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReverseRecord {
    pub molecule: String,
    pub method: String,
    pub score_rank: Option<usize>,
    pub pearson_rank: Option<usize>,
    pub spearman_rank: Option<usize>,
    pub cosine_rank: Option<usize>,
    pub closest: Option<String>,
}

impl ReverseRecord {
    pub const HEADER: [&str; 7] = [
        "molecule",
        "method",
        "score_rank",
        "pearson_rank",
        "spearman_rank",
        "cosine_rank",
        "closest",
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// method → reference
    Forward,
    /// reference → method
    Reverse,
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Reverse => write!(f, "reverse"),
        }
    }
}

/// Aggregate rank statistics over a set of molecules
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankSummary {
    /// molecules whose own partner ranked first
    pub matched: usize,

    /// molecules with a rank
    pub ranked: usize,

    pub total: usize,

    pub mean_rank: Option<f64>,

    /// the middle rank, or the mean of the two middle ranks
    pub median_rank: Option<f64>,
}

impl RankSummary {
    pub fn new(ranks: &[Option<usize>]) -> Self {
        let mut rs: Vec<usize> = ranks.iter().flatten().copied().collect();
        rs.sort_unstable();
        let n = rs.len();
        let mean_rank = if n == 0 {
            None
        } else {
            Some(rs.iter().sum::<usize>() as f64 / n as f64)
        };
        let median_rank = match n {
            0 => None,
            n if n % 2 == 1 => Some(rs[n / 2] as f64),
            n => Some((rs[n / 2 - 1] + rs[n / 2]) as f64 / 2.0),
        };
        Self {
            matched: rs.iter().filter(|&&r| r == 1).count(),
            ranked: n,
            total: ranks.len(),
            mean_rank,
            median_rank,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MethodSummary {
    pub method: String,
    pub measure: Measure,
    pub direction: Direction,
    #[serde(flatten)]
    pub ranks: RankSummary,
}

impl Display for MethodSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fmt = |v: Option<f64>| match v {
            Some(v) => format!("{v:8.2}"),
            None => format!("{:>8}", "-"),
        };
        write!(
            f,
            "{:<12}{:>10}{:>9}{:>5}/{:<5}{}{}",
            self.method,
            self.measure.to_string(),
            self.direction.to_string(),
            self.ranks.matched,
            self.ranks.total,
            fmt(self.ranks.mean_rank),
            fmt(self.ranks.median_rank),
        )
    }
}
