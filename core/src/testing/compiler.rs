use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use tempfile::TempDir;
use tokio::process::Command;

use super::error::{Error, Result};

/// Temporary directory holding the artifact of one test run.
/// Removed when dropped, whether the run succeeded or not.
#[derive(Debug)]
pub struct BuildDir {
    dir: TempDir,
}

impl BuildDir {
    const PREFIX: &str = "cjudge-build-";

    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(Self::PREFIX)
            .tempdir()
            .map_err(Error::BuildDir)?;
        log::debug!("Created build dir {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn artifact_path(&self, stem: &str) -> PathBuf {
        self.dir
            .path()
            .join(format!("{}{}", stem, std::env::consts::EXE_SUFFIX))
    }
}

/// External compiler invoked as `<program> [flags..] -o <artifact> <source>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiler {
    program: String,
    flags: Vec<String>,
}

impl Compiler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            flags: Vec::new(),
        }
    }

    pub fn flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags = flags.into_iter().map(Into::into).collect();
        self
    }

    fn command_line(&self, source: &Path, artifact: &Path) -> String {
        let mut words = vec![self.program.clone()];
        words.extend(self.flags.iter().cloned());
        words.push("-o".to_owned());
        words.push(artifact.to_string_lossy().into_owned());
        words.push(source.to_string_lossy().into_owned());
        words.join(" ")
    }

    /// Compiles `source` into `artifact` and returns the artifact path.
    /// The compiler is not invoked at all when `source` does not exist.
    pub async fn compile(&self, source: &Path, artifact: &Path) -> Result<PathBuf> {
        if !source.is_file() {
            return Err(Error::MissingSource(source.to_owned()));
        }

        log::info!("{}", self.command_line(source, artifact));

        let output = Command::new(&self.program)
            .args(&self.flags)
            .arg("-o")
            .arg(artifact)
            .arg(source)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::SpawnCompiler {
                compiler: self.program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(Error::Compilation {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(artifact.to_owned())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::fixture::fake_compiler;
    use std::fs;

    #[test]
    fn build_dir_is_removed_on_drop() {
        let dir = BuildDir::new().unwrap();
        let path = dir.path().to_owned();
        assert!(path.is_dir());
        assert!(dir.artifact_path("main").starts_with(&path));
        drop(dir);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn missing_source_does_not_invoke_compiler() {
        let tmp = tempfile::tempdir().unwrap();
        let cc = Compiler::new("/nonexistent/compiler");
        let res = cc
            .compile(&tmp.path().join("main.cpp"), &tmp.path().join("main"))
            .await;
        assert!(matches!(res, Err(Error::MissingSource(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn compile_ok() {
        let tmp = tempfile::tempdir().unwrap();
        let cc = fake_compiler(tmp.path());
        let src = tmp.path().join("main.sh");
        fs::write(&src, "#!/bin/sh\necho hi\n").unwrap();

        let build = BuildDir::new().unwrap();
        let artifact = Compiler::new(cc.to_string_lossy())
            .flags(["-O2"])
            .compile(&src, &build.artifact_path("main"))
            .await
            .unwrap();
        assert!(artifact.is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn compile_error_carries_diagnostics() {
        let tmp = tempfile::tempdir().unwrap();
        let cc = fake_compiler(tmp.path());
        let src = tmp.path().join("main.sh");
        fs::write(&src, "syntax error\n").unwrap();

        let err = Compiler::new(cc.to_string_lossy())
            .compile(&src, &tmp.path().join("main"))
            .await
            .unwrap_err();
        let stderr = err.compiler_stderr().unwrap();
        assert!(stderr.contains("error: expected ';'"));
    }

    #[tokio::test]
    async fn unknown_compiler_is_spawn_error() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("main.cpp");
        fs::write(&src, "int main(){}").unwrap();

        let res = Compiler::new("cjudge-no-such-compiler")
            .compile(&src, &tmp.path().join("main"))
            .await;
        assert!(matches!(res, Err(Error::SpawnCompiler { .. })));
    }
}
