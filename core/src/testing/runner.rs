use std::{
    io,
    path::PathBuf,
    process::Stdio,
    time::Duration,
};

use tokio::{io::AsyncReadExt as _, process::Command};

use super::diff::{self, split_lines};
use super::error::{Error, Result};
use super::{result::*, testcase::*};

/// Runs a compiled program against one testcase at a time.
#[derive(Debug, Clone)]
pub struct TestRunner {
    program: PathBuf,
    execution_time_limit: Duration,
}

impl TestRunner {
    pub const DEFAULT_EXEC_TIME_LIMIT: Duration = Duration::from_secs(3);
    const DRAIN_TIMEOUT: Duration = Duration::from_millis(200);

    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            execution_time_limit: Self::DEFAULT_EXEC_TIME_LIMIT,
        }
    }

    pub fn execution_time_limit(mut self, limit: Duration) -> Self {
        self.execution_time_limit = limit;
        self
    }

    /// Runs the program in a fresh process with the testcase input as stdin.
    ///
    /// Exceeding the time limit always gives `TLE`, a nonzero exit gives
    /// `RTE`. Otherwise the output is aligned against the expected output
    /// (`AC`/`WA`), or reported as `NI` when there is none.
    ///
    /// The limit bounds the exit of the program itself. Pipes still held
    /// open by a process it left behind are drained only briefly.
    pub async fn run<'t, T>(&self, testcase: &'t T) -> Result<ExecutionOutcome>
    where
        T: AsyncTestcase<'t>,
    {
        let (mut input_reader, expected_reader) = tokio::try_join!(
            testcase.new_input_reader(),
            testcase.new_expected_reader()
        )?;
        let expected = match expected_reader {
            Some(mut r) => {
                let mut buf = Vec::new();
                r.read_to_end(&mut buf)
                    .await
                    .map_err(|e| self.io_error("Failed to read expected output", e))?;
                Some(String::from_utf8_lossy(&buf).into_owned())
            }
            None => None,
        };

        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        log::debug!("Running testcase {}", testcase.name());
        let mut proc = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::SpawnProgram(self.program.clone(), e))?;
        let mut stdin = proc
            .stdin
            .take()
            .ok_or_else(|| self.io_error("Failed to open stdin", io::ErrorKind::BrokenPipe.into()))?;
        let mut stdout = proc
            .stdout
            .take()
            .ok_or_else(|| self.io_error("Failed to open stdout", io::ErrorKind::BrokenPipe.into()))?;
        let mut stderr = proc
            .stderr
            .take()
            .ok_or_else(|| self.io_error("Failed to open stderr", io::ErrorKind::BrokenPipe.into()))?;

        let start_at = tokio::time::Instant::now();
        let (status, io_res, execution_time) = {
            let fut_stdin = async move {
                let res = tokio::io::copy(&mut input_reader, &mut stdin).await;
                drop(stdin); // closing the pipe is what lets the program see EOF
                match res {
                    // the program exited without consuming all of its input
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(0),
                    res => res,
                }
            };
            let fut_stdout = tokio::io::copy(&mut stdout, &mut stdout_buf);
            let fut_stderr = tokio::io::copy(&mut stderr, &mut stderr_buf);
            let fut_io = async { tokio::try_join!(fut_stdin, fut_stdout, fut_stderr).map(|_| ()) };
            tokio::pin!(fut_io);

            let deadline = tokio::time::sleep(self.execution_time_limit);
            tokio::pin!(deadline);

            // Only the program's own exit is bounded by the time limit.
            let mut io_res = None;
            let status = loop {
                tokio::select! {
                    res = &mut fut_io, if io_res.is_none() => io_res = Some(res),
                    status = proc.wait() => break Some(status),
                    _ = &mut deadline => break None,
                }
            };
            let execution_time = start_at.elapsed();

            // a background process it started may still hold the pipes open
            if matches!(status, Some(Ok(_))) && io_res.is_none() {
                match tokio::time::timeout(Self::DRAIN_TIMEOUT, &mut fut_io).await {
                    Ok(res) => io_res = Some(res),
                    Err(_) => log::warn!(
                        "Gave up waiting for remaining output of testcase {}",
                        testcase.name()
                    ),
                }
            }
            (status, io_res, execution_time)
        };

        let exit_status = match status {
            None => {
                proc.kill()
                    .await
                    .unwrap_or_else(|e| log::warn!("Failed to kill TLE process: {:#}", e));
                None
            }
            Some(Err(e)) => return Err(self.io_error("Failed to wait for subprocess", e)),
            Some(Ok(exit_status)) => {
                if let Some(Err(e)) = io_res {
                    return Err(self.io_error("Failed to communicate with subprocess", e));
                }
                Some(exit_status)
            }
        };

        let captured_lines: Vec<String> = split_lines(&String::from_utf8_lossy(&stdout_buf))
            .into_iter()
            .map(String::from)
            .collect();

        let (verdict, alignment) = match (exit_status, &expected) {
            (None, _) => (Verdict::TLE, None),
            (Some(status), _) if !status.success() => (Verdict::RTE, None),
            (Some(_), None) => (Verdict::NI, None),
            (Some(_), Some(expected)) => {
                let script = diff::align(&split_lines(expected), &captured_lines);
                let verdict = if script.is_exact_match() {
                    Verdict::AC
                } else {
                    Verdict::WA
                };
                (verdict, Some(script))
            }
        };

        log::debug!(
            "Testcase {}: {} [{}ms]",
            testcase.name(),
            verdict,
            execution_time.as_millis()
        );

        Ok(ExecutionOutcome {
            verdict,
            execution_time,
            exit_status,
            stdout: stdout_buf,
            stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
            captured_lines,
            alignment,
        })
    }

    fn io_error(&self, msg: &'static str, e: io::Error) -> Error {
        Error::Io(msg, self.program.clone(), e)
    }
}
