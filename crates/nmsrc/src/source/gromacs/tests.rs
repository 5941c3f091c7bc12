use std::{fs, os::unix::fs::PermissionsExt};

use approx::assert_abs_diff_eq;
use irspec::{Grid, LineShape};
use tempfile::TempDir;

use super::*;

const CO: &str = "testfiles/gaff/co";

/// copy the CO inputs into a scratch directory laid out as `<tmp>/co`
fn scratch() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("co");
    fs::create_dir(&dir).unwrap();
    for f in [EIGENFREQ, EIGENVEC_TXT, TOPOLOGY] {
        fs::copy(Path::new(CO).join(f), dir.join(f)).unwrap();
    }
    (tmp, dir)
}

fn fake_gmx(dir: &Path, body: &str) -> Gmx {
    let path = dir.join("gmx");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    Gmx::new(path)
}

/// the intensity of the CO stretch in the test files
fn co_intensity() -> f64 {
    let mu = 0.75593 * 0.1 / 12.011_f64.sqrt()
        + -0.65465 * -0.1 / 15.999_f64.sqrt();
    mu * mu
}

#[test]
fn eigenfrequencies() {
    let path = Path::new(CO).join(EIGENFREQ);
    let got = Gromacs::parse_eigenfrequencies(
        &fs::read_to_string(&path).unwrap(),
        &path,
    )
    .unwrap();
    assert_eq!(
        got,
        vec![0.000731, 0.001284, 0.002117, 3.517420, 3.517420, 2143.281]
    );

    let got = Gromacs::parse_eigenfrequencies("# header\n@TYPE xy\n", &path);
    assert!(matches!(got, Err(SourceError::Missing { .. })));

    let got = Gromacs::parse_eigenfrequencies("    1    x\n", &path);
    assert!(matches!(got, Err(SourceError::Parse { line: 1, .. })));
}

#[test]
fn eigenvectors() {
    let path = Path::new(CO).join(EIGENVEC_TXT);
    let got = Gromacs::parse_eigenvectors(
        &fs::read_to_string(&path).unwrap(),
        &path,
    )
    .unwrap();
    assert_eq!(got.len(), 6);
    assert!(got.iter().all(|v| v.len() == 2));
    assert_eq!(got[0][0], Vec3::new(1.0, 0.0, 0.0));
    assert_eq!(got[5][0], Vec3::new(0.0, 0.0, 0.75593));
    assert_eq!(got[5][1], Vec3::new(0.0, 0.0, -0.65465));

    // only the reference frame
    let got = Gromacs::parse_eigenvectors(
        "frame 0:\n   x (1x3):\n      x[    0]={ 1.0, 2.0, 3.0}\n",
        &path,
    );
    assert!(matches!(got, Err(SourceError::Missing { .. })));
}

#[test]
fn topology() {
    let path = Path::new(CO).join(TOPOLOGY);
    let got =
        Gromacs::parse_topology(&fs::read_to_string(&path).unwrap(), &path)
            .unwrap();
    assert_eq!(got, (vec![0.1, -0.1], vec![12.011, 15.999]));

    let short = "[ atoms ]\n  1  c1  1  MOL  C1  1  0.1\n";
    let got = Gromacs::parse_topology(short, &path);
    assert!(matches!(got, Err(SourceError::Parse { line: 2, .. })), "{got:?}");

    let got = Gromacs::parse_topology("[ bonds ]\n 1 2 1 0.1 100\n", &path);
    assert_eq!(
        got,
        Err(SourceError::Missing {
            path: path.clone(),
            what: "[ atoms ] records"
        })
    );
}

#[test]
fn mu() {
    let path = Path::new("mu.txt");
    let got = Gromacs::parse_mu("0.1 0.2 0.3\n-0.1 -0.2 -0.3\n", path).unwrap();
    assert_eq!(
        got,
        vec![Vec3::new(0.1, 0.2, 0.3), Vec3::new(-0.1, -0.2, -0.3)]
    );
    assert!(matches!(
        Gromacs::parse_mu("0.1 0.2", path),
        Err(SourceError::Inconsistent { .. })
    ));
    assert!(matches!(
        Gromacs::parse_mu("0.1 nan 0.3", path),
        Err(SourceError::Inconsistent { .. })
    ));
}

#[test]
fn molecule() {
    let src = Gromacs::new("GAFF", "testfiles/gaff").linear(["co"]);
    let got = src.molecule("co").unwrap();
    assert_eq!(got.atoms().len(), 2);
    // the five rigid-body modes are dropped
    assert_eq!(got.modes().len(), 1);
    let mode = &got.modes()[0];
    assert_eq!(mode.freq(), 2143.281);
    assert_abs_diff_eq!(
        mode.intensity().unwrap(),
        co_intensity(),
        epsilon = 1e-15
    );

    // a diatomic left off the linear list has no vibrations
    let src = Gromacs::new("GAFF", "testfiles/gaff").linear(["hf"]);
    assert!(!src.is_linear("co"));
    assert_eq!(
        src.molecule("co"),
        Err(SourceError::Model(
            "testfiles/gaff/co".into(),
            irspec::ModelError::NoModes {
                natoms: 2,
                linear: false
            }
        ))
    );

    let src = Gromacs::new("GAFF", "testfiles/gaff")
        .linear(["co"])
        .degenerate(1);
    assert!(matches!(
        src.molecule("co"),
        Err(SourceError::Model(_, irspec::ModelError::NoModes { .. }))
    ));
}

/// write a nonlinear three-atom molecule with all nine modes reported into
/// `<tmp>/h2o`. every eigenvector displaces the atoms along z by 0.1, 0.2,
/// and 0.3
fn triatomic(tmp: &Path) -> PathBuf {
    let dir = tmp.join("h2o");
    fs::create_dir(&dir).unwrap();
    let mut freqs = String::from("@TYPE xy\n");
    for i in 0..9 {
        let f = if i < 6 { 0.001 * i as f64 } else { 1000.0 * i as f64 };
        freqs.push_str(&format!("    {}    {f}\n", i + 1));
    }
    fs::write(dir.join(EIGENFREQ), freqs).unwrap();

    // the reference structure and one frame per mode
    let mut vecs = String::new();
    for frame in 0..10 {
        vecs.push_str(&format!("eigenvec.trr frame {frame}:\n   x (3x3):\n"));
        for atom in 0..3 {
            let z = 0.1 * (atom + 1) as f64;
            vecs.push_str(&format!("      x[{atom:5}]={{ 0.0, 0.0, {z}}}\n"));
        }
    }
    fs::write(dir.join(EIGENVEC_TXT), vecs).unwrap();

    fs::write(
        dir.join(TOPOLOGY),
        "[ atoms ]
     1   os   1   MOL   O1   1   -0.4   15.999
     2   ho   1   MOL   H1   2    0.2    1.008
     3   ho   1   MOL   H2   3    0.2    1.008
",
    )
    .unwrap();
    dir
}

#[test]
fn mu_covers_fewer_atoms() {
    let tmp = TempDir::new().unwrap();
    let dir = triatomic(tmp.path());
    let src = Gromacs::new("GAFF", tmp.path());
    let got = src.molecule("h2o").unwrap();
    assert_eq!(got.atoms().len(), 3);
    assert_eq!(got.modes().len(), 3);

    // only the oxygen and the first hydrogen carry charges
    fs::write(dir.join(MU), "0.0 0.0 -0.4\n0.0 0.0 0.2\n").unwrap();
    let got = src.molecule("h2o").unwrap();
    assert_eq!(got.natoms(), 3);
    assert_eq!(got.atoms().len(), 2);
    let freqs: Vec<_> = got.modes().iter().map(|m| m.freq()).collect();
    assert_eq!(freqs, [6000.0, 7000.0, 8000.0]);
    let mu = 0.1 * -0.4 / 15.999_f64.sqrt() + 0.2 * 0.2 / 1.008_f64.sqrt();
    for mode in got.modes() {
        assert_eq!(mode.eigenvector().len(), 2);
        assert_abs_diff_eq!(
            mode.intensity().unwrap(),
            mu * mu,
            epsilon = 1e-15
        );
    }

    // a linear reading of the same files keeps a rigid-body mode
    let got = src.linear(["h2o"]).molecule("h2o").unwrap();
    assert_eq!(got.modes().len(), 4);
    assert_eq!(got.modes()[0].freq(), 0.005);
}

#[test]
fn mu_overrides_charges() {
    let (tmp, dir) = scratch();
    fs::write(dir.join(MU), "0.0 0.0 0.2\n0.0 0.0 -0.2\n").unwrap();
    let src = Gromacs::new("GAFF", tmp.path()).linear(["co"]);
    let got = src.molecule("co").unwrap();
    let mu = 0.75593 * 0.2 / 12.011_f64.sqrt()
        + -0.65465 * -0.2 / 15.999_f64.sqrt();
    assert_abs_diff_eq!(
        got.modes()[0].intensity().unwrap(),
        mu * mu,
        epsilon = 1e-15
    );
}

#[test]
fn produce() {
    let src = Gromacs::new("GAFF", "testfiles/gaff").linear(["co"]).scale(0.5);
    let grid = Grid::with_step(0.0, 4000.0, 1.0).unwrap();
    let shape = LineShape::new(24.0).unwrap();
    let got = src.produce("co", &grid, &shape).unwrap();
    assert_eq!(got.label(), "GAFF");
    assert_eq!(got.eigenfrequencies(), Some(&[1071.6405][..]));
    let (freq, height) = got.peak();
    assert_eq!(freq, 1072.0);
    assert_abs_diff_eq!(
        height,
        shape.peak_height(co_intensity()),
        epsilon = 1e-3 * shape.peak_height(co_intensity())
    );
}

#[test]
fn dump_trr() {
    let (tmp, dir) = scratch();
    let txt = dir.join(EIGENVEC_TXT);
    let saved = tmp.path().join("dump.txt");
    fs::rename(&txt, &saved).unwrap();
    fs::write(dir.join(EIGENVEC_TRR), "").unwrap();

    // no gmx to dump it with
    let src = Gromacs::new("GAFF", tmp.path()).linear(["co"]);
    assert_eq!(
        src.molecule("co"),
        Err(SourceError::Process(ProcessError::NotInstalled))
    );

    let gmx = fake_gmx(tmp.path(), &format!("cat {}", saved.display()));
    let src = src.gmx(Some(gmx));
    let got = src.molecule("co").unwrap();
    assert_eq!(got.modes().len(), 1);
    // nothing is left behind
    assert!(!txt.exists());
}

#[test]
fn missing_files() {
    let (tmp, dir) = scratch();
    fs::remove_file(dir.join(EIGENVEC_TXT)).unwrap();
    let src = Gromacs::new("GAFF", tmp.path()).linear(["co"]);
    assert_eq!(
        src.molecule("co"),
        Err(SourceError::FileNotFound(dir.join(EIGENVEC_TRR)))
    );
    assert!(src.molecule("h2o").unwrap_err().is_file_not_found());
}

#[test]
fn run_normal_modes() {
    let (tmp, dir) = scratch();
    let saved = tmp.path().join("saved");
    fs::create_dir(&saved).unwrap();
    for f in [EIGENFREQ, EIGENVEC_TXT] {
        fs::rename(dir.join(f), saved.join(f)).unwrap();
    }
    // every step writes its expected output; nmeig restores the saved files
    let gmx = fake_gmx(
        tmp.path(),
        &format!(
            r#"case "$1" in
grompp) while [ "$1" != "-o" ]; do shift; done; touch "$2" ;;
mdrun) while [ $# -gt 1 ]; do
    case "$1" in -c|-mtx) touch "$2" ;; esac; shift; done ;;
nmeig) cp {0}/{1} {0}/{2} . ; touch {3} ;;
esac"#,
            saved.display(),
            EIGENFREQ,
            EIGENVEC_TXT,
            EIGENVEC_TRR,
        ),
    );
    let src = Gromacs::new("GAFF", tmp.path())
        .linear(["co"])
        .gmx(Some(gmx))
        .normal_modes(NmSettings {
            mdp_dir: tmp.path().to_owned(),
            sigma: 1,
        });
    assert!(src.needs_gmx());
    let grid = Grid::with_step(0.0, 4000.0, 4.0).unwrap();
    let shape = LineShape::new(24.0).unwrap();
    let got = src.produce("co", &grid, &shape).unwrap();
    assert_eq!(got.eigenfrequencies(), Some(&[2143.281][..]));
    assert!(dir.join("nm.mtx").exists());
}
