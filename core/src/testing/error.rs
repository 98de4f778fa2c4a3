use std::{io, path::PathBuf, process::ExitStatus};

pub type Result<T> = ::std::result::Result<T, Error>;

/// Failures that stop a whole test run. Per-testcase problems never end up
/// here, they become a [`Verdict`](super::Verdict).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Cannot find source file '{0}'")]
    MissingSource(PathBuf),

    #[error("Cannot find samples dir '{0}'")]
    MissingSamples(PathBuf),

    #[error("Compile error ({status})")]
    Compilation { status: ExitStatus, stderr: String },

    #[error("Failed to spawn compiler '{compiler}'")]
    SpawnCompiler {
        compiler: String,

        #[source]
        source: io::Error,
    },

    #[error("Failed to spawn '{0}'")]
    SpawnProgram(PathBuf, #[source] io::Error),

    #[error("Cannot create temporary build dir")]
    BuildDir(#[source] io::Error),

    #[error("{0} ({1})")]
    Io(&'static str, PathBuf, #[source] io::Error),

    #[error(transparent)]
    Fs(#[from] fsutil::Error),
}

impl Error {
    /// Compiler diagnostics, if this is a compile error.
    pub fn compiler_stderr(&self) -> Option<&str> {
        match self {
            Error::Compilation { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}
