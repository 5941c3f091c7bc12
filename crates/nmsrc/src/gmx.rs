//! Scoped calls to the GROMACS `gmx` executable. Every call waits for the
//! process, checks its exit status, and optionally checks that the file it
//! should have written exists.

use std::{
    error::Error,
    ffi::OsStr,
    fmt::Display,
    path::{Path, PathBuf},
    process::Command,
};

#[derive(Debug, PartialEq, Eq)]
pub enum ProcessError {
    /// none of the gmx executables is on the `PATH`
    NotInstalled,
    Spawn {
        cmd: String,
        kind: std::io::ErrorKind,
    },
    Failed {
        cmd: String,
        status: Option<i32>,
        stderr: String,
    },
    /// the process succeeded without writing its expected output
    OutputMissing(PathBuf),
}

impl Display for ProcessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessError::NotInstalled => write!(
                f,
                "GROMACS is not installed: none of {} found on PATH",
                Gmx::NAMES.join(", ")
            ),
            ProcessError::Spawn { cmd, kind } => {
                write!(f, "failed to start `{cmd}` with `{kind}`")
            }
            ProcessError::Failed {
                cmd,
                status,
                stderr,
            } => {
                match status {
                    Some(s) => write!(f, "`{cmd}` exited with status {s}")?,
                    None => write!(f, "`{cmd}` was killed by a signal")?,
                }
                if !stderr.is_empty() {
                    write!(f, ": {}", stderr.trim_end())?;
                }
                Ok(())
            }
            ProcessError::OutputMissing(p) => {
                write!(f, "expected output {} was not written", p.display())
            }
        }
    }
}

impl Error for ProcessError {}

#[derive(Clone, Debug, PartialEq)]
pub struct Gmx {
    exe: PathBuf,
}

impl Gmx {
    /// executable names in order of preference
    pub const NAMES: [&str; 4] = ["gmx_mpi_d", "gmx_mpi", "gmx_d", "gmx"];

    pub fn new(exe: impl Into<PathBuf>) -> Self {
        Self { exe: exe.into() }
    }

    /// search the `PATH` environment variable for gmx
    pub fn locate() -> Result<Self, ProcessError> {
        let path =
            std::env::var_os("PATH").ok_or(ProcessError::NotInstalled)?;
        Self::locate_in(&path)
    }

    /// search the directories in the `PATH`-style list `path` for each of
    /// [Gmx::NAMES] in turn
    pub fn locate_in(path: &OsStr) -> Result<Self, ProcessError> {
        for name in Self::NAMES {
            for dir in std::env::split_paths(path) {
                let exe = dir.join(name);
                if is_executable(&exe) {
                    log::info!("using {}", exe.display());
                    return Ok(Self::new(exe));
                }
            }
        }
        Err(ProcessError::NotInstalled)
    }

    pub fn exe(&self) -> &Path {
        &self.exe
    }

    /// run gmx with `args` in `dir` and return its standard output
    pub fn run<S: AsRef<OsStr>>(
        &self,
        dir: &Path,
        args: &[S],
    ) -> Result<String, ProcessError> {
        let cmd = {
            let mut s = self.exe.display().to_string();
            for a in args {
                s.push(' ');
                s.push_str(&a.as_ref().to_string_lossy());
            }
            s
        };
        log::debug!("running `{cmd}` in {}", dir.display());
        let output = Command::new(&self.exe)
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| ProcessError::Spawn {
                cmd: cmd.clone(),
                kind: e.kind(),
            })?;
        if !output.status.success() {
            return Err(ProcessError::Failed {
                cmd,
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// like [Gmx::run], but also fail if `dir/output` does not exist
    /// afterward
    pub fn run_expecting<S: AsRef<OsStr>>(
        &self,
        dir: &Path,
        args: &[S],
        output: &str,
    ) -> Result<String, ProcessError> {
        let stdout = self.run(dir, args)?;
        let out = dir.join(output);
        if !out.exists() {
            return Err(ProcessError::OutputMissing(out));
        }
        Ok(stdout)
    }

    /// the text dump of the trajectory file `trr`
    pub fn dump(&self, trr: &Path) -> Result<String, ProcessError> {
        let dir = trr.parent().unwrap_or_else(|| Path::new("."));
        let file = trr.file_name().unwrap_or(trr.as_os_str());
        let args =
            [OsStr::new("dump"), OsStr::new("-f"), file, "-quiet".as_ref()];
        self.run(dir, &args)
    }

    /// run a normal-mode analysis in `dir`, which must contain `conf.gro`
    /// and `topol.top`: a conjugate-gradient minimization with `cg.mdp`, the
    /// Hessian with `nm.mdp`, and its diagonalization. both parameter files
    /// are taken from `mdp_dir`. leaves `eigenfreq.xvg` and `eigenvec.trr`
    /// in `dir`
    pub fn normal_modes(
        &self,
        dir: &Path,
        mdp_dir: &Path,
        sigma: usize,
    ) -> Result<(), ProcessError> {
        let mdp = |name: &str| mdp_dir.join(name).display().to_string();
        let sigma = sigma.to_string();
        let cg = mdp("cg.mdp");
        let nm = mdp("nm.mdp");
        let steps: [(&[&str], &str); 5] = [
            (
                &[
                    "grompp", "-f", &cg, "-o", "cg.tpr", "-v", "-maxwarn", "1",
                    "-c", "conf.gro",
                ],
                "cg.tpr",
            ),
            (
                &["mdrun", "-s", "cg.tpr", "-c", "after_cg.g96", "-v"],
                "after_cg.g96",
            ),
            (
                &[
                    "grompp", "-c", "after_cg.g96", "-f", &nm, "-o", "nm.tpr",
                    "-v",
                ],
                "nm.tpr",
            ),
            (&["mdrun", "-s", "nm.tpr", "-v", "-mtx", "nm.mtx"], "nm.mtx"),
            (
                &[
                    "nmeig", "-last", "1000", "-s", "nm.tpr", "-f", "nm.mtx",
                    "-sigma", &sigma,
                ],
                "eigenfreq.xvg",
            ),
        ];
        for (args, output) in steps {
            self.run_expecting(dir, args, output)?;
        }
        let trr = dir.join("eigenvec.trr");
        if !trr.exists() {
            return Err(ProcessError::OutputMissing(trr));
        }
        Ok(())
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use std::{fs, os::unix::fs::PermissionsExt};

    use tempfile::TempDir;

    use super::*;

    /// write an executable shell script called `name` into `dir`
    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn locate() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        script(a.path(), "gmx", "true");
        script(b.path(), "gmx_mpi", "true");
        // not executable, so skipped
        fs::write(a.path().join("gmx_mpi_d"), "").unwrap();
        let path = std::env::join_paths([a.path(), b.path()]).unwrap();
        let got = Gmx::locate_in(&path).unwrap();
        assert_eq!(got.exe(), b.path().join("gmx_mpi"));
    }

    #[test]
    fn not_installed() {
        let a = TempDir::new().unwrap();
        let got = Gmx::locate_in(a.path().as_os_str());
        assert_eq!(got, Err(ProcessError::NotInstalled));
    }

    #[test]
    fn run() {
        let dir = TempDir::new().unwrap();
        let exe = script(dir.path(), "gmx", r#"echo "$@""#);
        let gmx = Gmx::new(exe);
        let got = gmx.run(dir.path(), &["dump", "-f", "x.trr"]).unwrap();
        assert_eq!(got, "dump -f x.trr\n");
    }

    #[test]
    fn failed() {
        let dir = TempDir::new().unwrap();
        let exe = script(dir.path(), "gmx", "echo oops >&2; exit 3");
        let gmx = Gmx::new(exe);
        let Err(ProcessError::Failed { status, stderr, .. }) =
            gmx.run(dir.path(), &["mdrun"])
        else {
            panic!("expected a failure");
        };
        assert_eq!(status, Some(3));
        assert_eq!(stderr, "oops\n");
    }

    #[test]
    fn output_missing() {
        let dir = TempDir::new().unwrap();
        let exe = script(dir.path(), "gmx", "true");
        let gmx = Gmx::new(exe);
        let got = gmx.run_expecting(dir.path(), &["grompp"], "cg.tpr");
        assert_eq!(
            got,
            Err(ProcessError::OutputMissing(dir.path().join("cg.tpr")))
        );
        // the analysis stops at the first missing file
        let got = gmx.normal_modes(dir.path(), dir.path(), 1);
        assert_eq!(
            got,
            Err(ProcessError::OutputMissing(dir.path().join("cg.tpr")))
        );
    }

    #[test]
    fn normal_modes() {
        let dir = TempDir::new().unwrap();
        // write whatever file follows -o, -c, -mtx, or nmeig's outputs
        let exe = script(
            dir.path(),
            "gmx",
            r#"case "$1" in
grompp) while [ "$1" != "-o" ]; do shift; done; touch "$2" ;;
mdrun) while [ $# -gt 1 ]; do
    case "$1" in -c|-mtx) touch "$2" ;; esac; shift; done ;;
nmeig) touch eigenfreq.xvg eigenvec.trr ;;
esac"#,
        );
        let gmx = Gmx::new(exe);
        gmx.normal_modes(dir.path(), dir.path(), 3).unwrap();
        for f in
            ["cg.tpr", "after_cg.g96", "nm.tpr", "nm.mtx", "eigenvec.trr"]
        {
            assert!(dir.path().join(f).exists(), "{f} missing");
        }
    }
}
