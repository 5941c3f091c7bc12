use std::{fs, io::Write};

use flate2::{Compression, write::GzEncoder};
use irspec::{Grid, Line, LineShape};
use tempfile::TempDir;

use super::*;

#[test]
fn parse_log() {
    let path = Path::new("testfiles/g4/co2/co2-g4.log");
    let contents = fs::read_to_string(path).unwrap();
    let got = QmLog::parse_log(&contents, path).unwrap();
    assert_eq!(
        got,
        vec![
            Line::new(667.3412, 31.2077),
            Line::new(667.3412, 31.2077),
            Line::new(1372.4175, 0.0),
            Line::new(2396.5050, 548.9150),
        ]
    );
}

#[test]
fn no_frequencies() {
    let path = Path::new("testfiles/g4/empty/empty-g4.log");
    let contents = fs::read_to_string(path).unwrap();
    let got = QmLog::parse_log(&contents, path);
    assert_eq!(
        got,
        Err(SourceError::Missing {
            path: path.to_owned(),
            what: "frequencies and IR intensities"
        })
    );
}

#[test]
fn mismatched_counts() {
    let contents = " Frequencies --   100.0   200.0\n IR Inten    --   1.0\n";
    let got = QmLog::parse_log(contents, Path::new("x.log"));
    assert!(
        matches!(got, Err(SourceError::Inconsistent { .. })),
        "{got:?}"
    );
}

#[test]
fn find_log() {
    let qm = QmLog::new("G4", "testfiles/g4", "g4");
    assert_eq!(
        qm.find_log("co").unwrap(),
        Path::new("testfiles/g4/co/co-g4.log")
    );
    let got = qm.find_log("nonexistent");
    assert!(got.unwrap_err().is_file_not_found());

    let other = QmLog::new("B3LYP", "testfiles/g4", "b3lyp");
    let err = other.find_log("co").unwrap_err();
    assert_eq!(
        err.to_string(),
        "testfiles/g4/co/*b3lyp.log[.gz] does not exist"
    );
}

#[test]
fn molecules() {
    let qm = QmLog::new("G4", "testfiles/g4", "g4");
    let got: Vec<_> = qm.molecules().unwrap().into_iter().collect();
    assert_eq!(got, ["co", "co2", "empty"]);
}

#[test]
fn gzipped() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("co");
    fs::create_dir(&dir).unwrap();
    let plain = fs::read("testfiles/g4/co/co-g4.log").unwrap();
    let mut enc = GzEncoder::new(
        fs::File::create(dir.join("co-g4.log.gz")).unwrap(),
        Compression::default(),
    );
    enc.write_all(&plain).unwrap();
    enc.finish().unwrap();

    let qm = QmLog::new("G4", tmp.path(), "g4");
    let path = qm.find_log("co").unwrap();
    assert_eq!(path, dir.join("co-g4.log.gz"));
    let got = QmLog::read_log(&path).unwrap();
    assert_eq!(got.as_bytes(), plain.as_slice());
}

#[test]
fn produce() {
    let qm = QmLog::new("G4", "testfiles/g4", "g4").scale(0.5);
    let grid = Grid::with_step(0.0, 4000.0, 4.0).unwrap();
    let shape = LineShape::new(24.0).unwrap();
    let got = qm.produce("co", &grid, &shape).unwrap();
    assert_eq!(got.label(), "G4");
    assert_eq!(got.eigenfrequencies(), Some(&[1103.62365][..]));
    assert_eq!(qm.scaling_factor(), 0.5);
    let (freq, _) = got.peak();
    assert_eq!(freq, 1104.0);

    assert!(matches!(
        qm.produce("empty", &grid, &shape),
        Err(SourceError::Missing { .. })
    ));
}
