use approx::assert_abs_diff_eq;
use test_case::test_case;

use super::{grid, lorentz};
use crate::compare::{
    competitive_rank, cosine, fractional_ranks, overlap, pearson, spearman,
};
use crate::*;

#[test_case(Measure::Score)]
#[test_case(Measure::Pearson)]
#[test_case(Measure::Spearman)]
#[test_case(Measure::Cosine)]
fn self_similarity(measure: Measure) {
    let mut s = lorentz("x", &[(1000.0, 7.0), (2500.0, 3.0)], &grid());
    s.normalize(Normalization::Area);
    let got = measure.between(&s, &s).get().unwrap();
    assert_abs_diff_eq!(got, 1.0, epsilon = 1e-12);
}

#[test]
fn incomparable() {
    let a = [1.0, 2.0, 3.0];
    let b = [1.0, 2.0];
    for measure in Measure::ALL {
        let got = measure.compare(&a, &b);
        assert!(got.is_incomparable());
        assert_eq!(got.value(), 0.0);
    }
    // zero variance
    assert!(pearson(&[2.0; 3], &a).is_incomparable());
    assert!(spearman(&a, &[0.0; 3]).is_incomparable());
    // zero norm
    assert!(cosine(&[0.0; 3], &a).is_incomparable());
    assert!(overlap(&[0.0; 3], &a).is_incomparable());

    let coarse = Grid::with_step(0.0, 4000.0, 8.0).unwrap();
    let got = Measure::Pearson.between(
        &lorentz("a", &[(1000.0, 1.0)], &grid()),
        &lorentz("b", &[(1000.0, 1.0)], &coarse),
    );
    assert_eq!(got, Similarity::Incomparable);
}

#[test]
fn non_finite() {
    let a = [1.0, 2.0, 3.0];
    assert!(pearson(&[1.0, f64::NAN, 3.0], &a).is_incomparable());
    assert!(cosine(&a, &[f64::INFINITY, 0.0, 1.0]).is_incomparable());
    assert!(overlap(&a, &[f64::NAN; 3]).is_incomparable());
    assert_eq!(Similarity::from(f64::NAN), Similarity::Incomparable);
    assert_eq!(Similarity::from(0.5), Similarity::Value(0.5));
}

/// a candidate with a NaN intensity that otherwise looks like another
/// molecule must not count as a match for its own
#[test]
fn nan_candidate_is_unranked() {
    let g = grid();
    let mut cmp = CrossComparator::new(vec!["m".to_owned()]);
    for (mol, peak) in [("a", 1000.0), ("b", 2000.0), ("c", 3000.0)] {
        let reference = lorentz("ref", &[(peak, 1.0)], &g);
        let mut candidate = if mol == "a" {
            lorentz("m", &[(3000.0, 1.0)], &g)
        } else {
            lorentz("m", &[(peak, 1.0)], &g)
        };
        if mol == "a" {
            candidate.intensities_mut()[10] = f64::NAN;
        }
        cmp.push(mol, reference, vec![candidate]).unwrap();
    }
    let got = cmp.forward_ranks("m", Measure::Pearson).unwrap();
    assert_eq!(got, [None, Some(1), Some(1)]);
    let records = cmp.records("m", 1.0).unwrap();
    assert_eq!(records[0].pearson, None);
    assert_eq!(records[0].best_match, None);
}

#[test]
fn measures() {
    let a = [1.0, 2.0, 3.0, 4.0];
    assert_abs_diff_eq!(
        pearson(&a, &[2.0, 4.0, 6.0, 8.0]).value(),
        1.0,
        epsilon = 1e-12
    );
    assert_abs_diff_eq!(
        pearson(&a, &[4.0, 3.0, 2.0, 1.0]).value(),
        -1.0,
        epsilon = 1e-12
    );
    // monotonic but not linear
    assert_abs_diff_eq!(
        spearman(&a, &[1.0, 8.0, 27.0, 64.0]).value(),
        1.0,
        epsilon = 1e-12
    );
    assert!(pearson(&a, &[1.0, 8.0, 27.0, 64.0]).value() < 1.0 - 1e-3);
    assert_abs_diff_eq!(
        cosine(&[1.0, 0.0], &[0.0, 1.0]).value(),
        0.0,
        epsilon = 1e-15
    );
    assert_eq!(overlap(&a, &[2.0, 4.0, 6.0, 8.0]), Similarity::Value(2.0));
    assert_eq!(overlap(&[2.0, 4.0, 6.0, 8.0], &a), Similarity::Value(0.5));
}

#[test]
fn ranks() {
    assert_eq!(
        fractional_ranks(&[10.0, 20.0, 20.0, 5.0]),
        vec![2.0, 3.5, 3.5, 1.0]
    );
    use Similarity::*;
    let all = [Value(0.9), Value(0.5), Value(0.5), Incomparable, Value(0.1)];
    assert_eq!(competitive_rank(all[1], &all), Some(2));
    assert_eq!(competitive_rank(all[2], &all), Some(2));
    assert_eq!(competitive_rank(all[0], &all), Some(1));
    assert_eq!(competitive_rank(all[4], &all), Some(4));
    assert_eq!(competitive_rank(all[3], &all), None);
}

/// three molecules with lines far apart and candidates identical to their own
/// references
fn disjoint(methods: &[&str]) -> CrossComparator {
    let g = grid();
    let mut cc =
        CrossComparator::new(methods.iter().map(|s| s.to_string()).collect());
    for (name, freq) in [("a", 500.0), ("b", 1500.0), ("c", 3000.0)] {
        let mut reference = lorentz("G4", &[(freq, 1.0)], &g);
        reference.normalize(Normalization::Area);
        let candidates = methods
            .iter()
            .map(|m| {
                let mut s = lorentz(m, &[(freq, 2.0)], &g);
                s.normalize(Normalization::Area);
                s
            })
            .collect();
        cc.push(name, reference, candidates).unwrap();
    }
    cc
}

#[test]
fn rank_matching() {
    let cc = disjoint(&["GAFF", "CGenFF"]);
    for method in ["GAFF", "CGenFF"] {
        for measure in [Measure::Pearson, Measure::Spearman] {
            let fwd = cc.forward_ranks(method, measure).unwrap();
            assert_eq!(fwd, vec![Some(1); 3], "{method} {measure}");
            let rev = cc.reverse_ranks(method, measure).unwrap();
            assert_eq!(rev, vec![Some(1); 3], "{method} {measure}");
        }
    }
    let summaries = cc.summaries();
    assert_eq!(summaries.len(), 2 * Measure::ALL.len() * 2);
    for s in summaries.iter().filter(|s| s.measure != Measure::Score) {
        assert_eq!(s.ranks.matched, 3);
        assert_eq!(s.ranks.mean_rank, Some(1.0));
        assert_eq!(s.ranks.median_rank, Some(1.0));
    }

    let records = cc.records("GAFF", 0.96).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[1].molecule, "b");
    assert_eq!(records[1].pearson_rank, Some(1));
    assert_eq!(records[1].best_match.as_deref(), Some("b"));
    assert_eq!(records[1].scaling_factor, 0.96);
    assert_abs_diff_eq!(records[1].pearson.unwrap(), 1.0, epsilon = 1e-12);
    let rev = cc.reverse_records("CGenFF").unwrap();
    assert_eq!(rev[2].closest.as_deref(), Some("c"));
    assert_eq!(rev[2].method, "CGenFF");
}

#[test]
fn ties() {
    let g = grid();
    let mut cc = CrossComparator::new(vec!["GAFF".into()]);
    for name in ["a", "b"] {
        let reference = lorentz("G4", &[(1000.0, 1.0)], &g);
        let candidate = lorentz("GAFF", &[(1000.0, 1.0)], &g);
        cc.push(name, reference, vec![candidate]).unwrap();
    }
    // identical references tie, and both share the best rank
    let got = cc.forward_ranks("GAFF", Measure::Pearson).unwrap();
    assert_eq!(got, vec![Some(1), Some(1)]);
    let records = cc.records("GAFF", 1.0).unwrap();
    assert_eq!(records[0].best_match.as_deref(), Some("a"));
    assert_eq!(records[1].best_match.as_deref(), Some("a"));
}

#[test]
fn unranked() {
    let g = grid();
    let coarse = Grid::with_step(0.0, 4000.0, 8.0).unwrap();
    let mut cc = CrossComparator::new(vec!["GAFF".into()]);
    cc.push(
        "a",
        lorentz("G4", &[(1000.0, 1.0)], &g),
        vec![lorentz("GAFF", &[(1000.0, 1.0)], &coarse)],
    )
    .unwrap();
    cc.push(
        "b",
        lorentz("G4", &[(2000.0, 1.0)], &g),
        vec![lorentz("GAFF", &[(2000.0, 1.0)], &g)],
    )
    .unwrap();
    let got = cc.forward_ranks("GAFF", Measure::Cosine).unwrap();
    assert_eq!(got, vec![None, Some(1)]);
    let records = cc.records("GAFF", 1.0).unwrap();
    assert_eq!(records[0].cosine, None);
    assert_eq!(records[0].best_match, None);
}

#[test]
fn push_errors() {
    let g = grid();
    let mut cc = CrossComparator::new(vec!["GAFF".into(), "OPLS".into()]);
    let err = cc
        .push(
            "a",
            lorentz("G4", &[], &g),
            vec![lorentz("GAFF", &[], &g)],
        )
        .unwrap_err();
    assert_eq!(
        err,
        CompareError::MissingMethod {
            molecule: "a".into(),
            method: "OPLS".into()
        }
    );
    let both = || vec![lorentz("OPLS", &[], &g), lorentz("GAFF", &[], &g)];
    cc.push("a", lorentz("G4", &[], &g), both()).unwrap();
    assert_eq!(
        cc.push("a", lorentz("G4", &[], &g), both()),
        Err(CompareError::DuplicateMolecule("a".into()))
    );
    assert_eq!(cc.len(), 1);
    assert_eq!(
        cc.forward_ranks("MMFF", Measure::Pearson),
        Err(CompareError::UnknownMethod("MMFF".into()))
    );
}

#[test]
fn rank_summary() {
    let got =
        RankSummary::new(&[Some(1), Some(3), None, Some(2), Some(1)]);
    assert_eq!(
        got,
        RankSummary {
            matched: 2,
            ranked: 4,
            total: 5,
            mean_rank: Some(1.75),
            median_rank: Some(1.5),
        }
    );
    let empty = RankSummary::new(&[None]);
    assert_eq!(empty.mean_rank, None);
    assert_eq!(empty.median_rank, None);
}
