//! Manual, unscored run of a program: its output is relayed live and the
//! operator's lines are forwarded to its stdin.

use std::{
    io,
    path::PathBuf,
    process::{ExitStatus, Stdio},
    sync::Arc,
    time::Duration,
};

use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt as _, AsyncRead, AsyncWriteExt as _, BufReader},
    process::{ChildStdin, Command},
    task::JoinHandle,
};

use crate::testing::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Where relayed lines go. Called from several tasks at once.
pub trait LineSink: Send + Sync + 'static {
    fn line(&self, kind: StreamKind, line: &str);
}

#[derive(Debug, Clone, Copy)]
pub struct SessionEnd {
    pub status: ExitStatus,
    /// The input forwarder was still waiting for an operator line when the
    /// program exited.
    pub input_pending: bool,
}

#[derive(Debug, Clone)]
pub struct InteractiveSession {
    program: PathBuf,
    poll_interval: Duration,
}

impl InteractiveSession {
    const POLL_INTERVAL: Duration = Duration::from_millis(100);
    const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            poll_interval: Self::POLL_INTERVAL,
        }
    }

    /// Runs until the program exits. There is no time limit.
    pub async fn run<I>(&self, operator_input: I, sink: Arc<dyn LineSink>) -> Result<SessionEnd>
    where
        I: AsyncBufRead + Unpin + Send + 'static,
    {
        let mut proc = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::SpawnProgram(self.program.clone(), e))?;
        log::info!("Started interactive session: {}", self.program.display());

        let broken = |what: &'static str| {
            Error::Io(what, self.program.clone(), io::ErrorKind::BrokenPipe.into())
        };
        let stdin = proc.stdin.take().ok_or_else(|| broken("Failed to open stdin"))?;
        let stdout = proc.stdout.take().ok_or_else(|| broken("Failed to open stdout"))?;
        let stderr = proc.stderr.take().ok_or_else(|| broken("Failed to open stderr"))?;

        let relays = [
            spawn_relay(stdout, StreamKind::Stdout, sink.clone()),
            spawn_relay(stderr, StreamKind::Stderr, sink),
        ];
        let forwarder = spawn_forwarder(operator_input, stdin);

        let status = loop {
            let polled = proc
                .try_wait()
                .map_err(|e| Error::Io("Failed to poll process", self.program.clone(), e))?;
            if let Some(status) = polled {
                break status;
            }
            tokio::time::sleep(self.poll_interval).await;
        };
        log::info!("Interactive program exited: {}", status);

        for relay in relays {
            // a leftover grandchild may keep the pipe open
            if tokio::time::timeout(Self::DRAIN_TIMEOUT, relay).await.is_err() {
                log::warn!("Gave up waiting for remaining output");
            }
        }

        let input_pending = !forwarder.is_finished();
        forwarder.abort();

        Ok(SessionEnd {
            status,
            input_pending,
        })
    }
}

fn spawn_relay<R>(stream: R, kind: StreamKind, sink: Arc<dyn LineSink>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => sink.line(kind, &line),
                Ok(None) => break,
                Err(e) => {
                    log::warn!("Failed to read {}: {:#}", kind, e);
                    break;
                }
            }
        }
    })
}

fn spawn_forwarder<I>(operator_input: I, mut stdin: ChildStdin) -> JoinHandle<()>
where
    I: AsyncBufRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = operator_input.lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break, // operator closed input; drop stdin so the program sees EOF
                Err(e) => {
                    log::warn!("Failed to read operator input: {:#}", e);
                    break;
                }
            };
            if let Err(e) = send_line(&mut stdin, &line).await {
                log::debug!("Program stdin closed: {:#}", e);
                break;
            }
        }
    })
}

async fn send_line(stdin: &mut ChildStdin, line: &str) -> io::Result<()> {
    stdin.write_all(line.as_bytes()).await?;
    stdin.write_all(b"\n").await?;
    stdin.flush().await
}
