//! Batch synthesis of infrared spectra for a set of molecules from several
//! methods, scored against a reference method

pub mod config;
pub mod pipeline;
pub mod plot;
pub mod report;


pub use config::Config;
pub use pipeline::{OutputLock, Pipeline, discover};
pub use report::{Failure, Report};

/// print the formatted message to stderr and exit with status 1
#[macro_export]
macro_rules! die {
    ($($t:tt)*) => {{
        eprintln!($($t)*);
        std::process::exit(1)
    }};
}

/// write `contents` to `path` by way of a temporary file next to it, so a
/// failed write never leaves a partial file at `path`
pub fn write_atomic(
    path: &std::path::Path,
    contents: &[u8],
) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)
}
