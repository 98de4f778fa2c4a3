pub mod error {
    #[allow(unused_imports)]
    pub(crate) use anyhow::{anyhow, bail, ensure, Context as _};
    pub use anyhow::{Error, Result};
}

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use error::*;
use tokio::io::BufReader;

use crate::config::{OutputMode, TestConfig};
use crate::interactive::{InteractiveSession, LineSink, SessionEnd};
use crate::report::TestReporter;
use crate::style::{self, ConsoleReporter, ConsoleSink};
use crate::testing::{
    self, AsyncTestcase as _, BuildDir, Compiler, ExecutionOutcome, FsTestcase, Summary,
    TestRunner,
};

/// Every discovered testcase paired with its outcome, in discovery order.
#[derive(Debug)]
pub struct TestRunReport {
    pub results: Vec<(FsTestcase, ExecutionOutcome)>,
    pub summary: Summary,
}

/// One compile-then-judge run over a problem directory.
#[derive(Debug, Clone)]
pub struct TestRun<'c> {
    cfg: &'c TestConfig,
    time_limit: Duration,
}

impl<'c> TestRun<'c> {
    pub fn new(cfg: &'c TestConfig) -> Self {
        Self {
            cfg,
            time_limit: TestRunner::DEFAULT_EXEC_TIME_LIMIT,
        }
    }

    pub fn time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    pub fn locate_source(&self, problem_dir: &Path) -> testing::Result<PathBuf> {
        match fsutil::find_unique_file(problem_dir, &self.cfg.source) {
            Ok(path) => Ok(path),
            Err(fsutil::Error::NoEntryMatchedGlob(pattern, dir)) => {
                Err(testing::Error::MissingSource(dir.join(pattern.as_str())))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn samples_dir(&self, problem_dir: &Path) -> PathBuf {
        problem_dir.join(&self.cfg.samples_dir)
    }

    fn compiler(&self) -> Compiler {
        Compiler::new(&self.cfg.compiler).flags(&self.cfg.compiler_flags)
    }

    async fn build(
        &self,
        source: &Path,
        build_dir: &BuildDir,
        reporter: &mut impl TestReporter,
    ) -> testing::Result<PathBuf> {
        reporter.compile_started(source);
        let res = self
            .compiler()
            .compile(source, &build_dir.artifact_path("main"))
            .await;
        reporter.compile_finished(res.is_ok());
        res
    }

    /// Discovers the samples, compiles once and runs every testcase in order.
    ///
    /// Missing or unreadable files and compile errors abort before any
    /// testcase runs.
    /// Everything that goes wrong inside a testcase becomes its verdict.
    pub async fn run(
        &self,
        problem_dir: impl AsRef<Path>,
        mut reporter: impl TestReporter,
    ) -> testing::Result<TestRunReport> {
        let problem_dir = problem_dir.as_ref();
        let testcases = FsTestcase::enumerate(self.samples_dir(problem_dir))?;
        for t in &testcases {
            t.ensure_readable()?;
        }
        let source = self.locate_source(problem_dir)?;

        let build_dir = BuildDir::new()?;
        let artifact = self.build(&source, &build_dir, &mut reporter).await?;

        let runner = TestRunner::new(artifact).execution_time_limit(self.time_limit);
        let mut results = Vec::with_capacity(testcases.len());
        let mut summary = Summary::default();

        for t in testcases {
            reporter.case_started(&t);
            let outcome = runner.run(&t).await?;
            if self.cfg.create_result_files {
                let path = t.result_path();
                fsutil::write(&path, &outcome.stdout)
                    .unwrap_or_else(|e| log::warn!("Failed to save result of {}: {}", t.name(), e));
            }
            summary.add(outcome.verdict);
            reporter.case_finished(&t, &outcome);
            results.push((t, outcome));
        }

        reporter.finished(&summary);
        Ok(TestRunReport { results, summary })
    }

    /// Compiles the source and runs it interactively until it exits.
    pub async fn run_interactive<I>(
        &self,
        problem_dir: impl AsRef<Path>,
        operator_input: I,
        sink: Arc<dyn LineSink>,
        mut reporter: impl TestReporter,
    ) -> testing::Result<SessionEnd>
    where
        I: tokio::io::AsyncBufRead + Unpin + Send + 'static,
    {
        let source = self.locate_source(problem_dir.as_ref())?;
        let build_dir = BuildDir::new()?;
        let artifact = self.build(&source, &build_dir, &mut reporter).await?;

        InteractiveSession::new(artifact)
            .run(operator_input, sink)
            .await
    }
}

fn explain_harness_error(e: testing::Error) -> Error {
    if let Some(stderr) = e.compiler_stderr() {
        eprint!("{}", stderr);
    }
    let context = match &e {
        testing::Error::MissingSource(_) | testing::Error::MissingSamples(_) => {
            Some("Problem folder is not valid: it needs a source file and a samples folder")
        }
        testing::Error::Compilation { .. } => Some("Couldn't compile your program"),
        _ => None,
    };
    match context {
        Some(msg) => Error::new(e).context(msg),
        None => Error::new(e),
    }
}

pub async fn do_test(
    problem_dir: impl AsRef<Path>,
    cfg: &TestConfig,
    output: OutputMode,
) -> Result<Summary> {
    let problem_dir = problem_dir.as_ref();
    ensure!(
        problem_dir.exists(),
        "The selected path doesn't exist: {}",
        problem_dir.to_string_lossy()
    );

    let mut reporter = ConsoleReporter::new(output);
    let report = TestRun::new(cfg)
        .run(problem_dir, &mut reporter)
        .await
        .map_err(explain_harness_error)?;
    Ok(report.summary)
}

pub async fn do_interactive(problem_dir: impl AsRef<Path>, cfg: &TestConfig) -> Result<ExitStatus> {
    let problem_dir = problem_dir.as_ref();
    ensure!(
        problem_dir.exists(),
        "The selected path doesn't exist: {}",
        problem_dir.to_string_lossy()
    );

    let reporter = ConsoleReporter::new(cfg.output);
    let operator_input = BufReader::new(tokio::io::stdin());

    println!("{}", "Running your interactive program:".bold());
    style::print_rule();
    let end = TestRun::new(cfg)
        .run_interactive(problem_dir, operator_input, Arc::new(ConsoleSink), reporter)
        .await
        .map_err(explain_harness_error)?;
    style::print_rule();

    println!("{}", format!("Program exited {}", end.status).bold());
    if end.input_pending {
        println!("(Press Enter)");
    }
    Ok(end.status)
}

#[cfg(all(test, unix))]
mod test {
    use super::*;
    use crate::testing::{fixture::fake_compiler, Verdict};
    use std::fs;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl TestReporter for Recorder {
        fn compile_started(&mut self, _source: &Path) {
            self.events.push("compile".into());
        }

        fn compile_finished(&mut self, success: bool) {
            self.events.push(format!("compiled {}", success));
        }

        fn case_started(&mut self, t: &FsTestcase) {
            self.events.push(format!("start {}", t.name()));
        }

        fn case_finished(&mut self, t: &FsTestcase, outcome: &ExecutionOutcome) {
            self.events.push(format!("finish {} {}", t.name(), outcome.verdict));
        }

        fn finished(&mut self, summary: &Summary) {
            self.events.push(format!("summary {}", summary.total()));
        }
    }

    fn config(dir: &Path) -> TestConfig {
        TestConfig {
            compiler: fake_compiler(dir).to_string_lossy().into_owned(),
            ..TestConfig::default()
        }
    }

    fn problem(dir: &Path, source: &str, samples: &[(&str, &str)]) -> PathBuf {
        let problem = dir.join("problem");
        fs::create_dir_all(problem.join("samples")).unwrap();
        fs::write(problem.join("main.sh"), format!("#!/bin/sh\n{}\n", source)).unwrap();
        for (name, contents) in samples {
            fs::write(problem.join("samples").join(name), contents).unwrap();
        }
        problem
    }

    #[tokio::test]
    async fn events_follow_discovery_order() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let problem = problem(
            tmp.path(),
            "read x; echo $((x * 2))",
            &[
                ("10.in", "5\n"),
                ("10.out", "10\n"),
                ("2.in", "1\n"),
                ("2.out", "3\n"),
                ("1.in", "7\n"),
            ],
        );

        let mut rec = Recorder::default();
        let report = TestRun::new(&cfg).run(&problem, &mut rec).await.unwrap();

        assert_eq!(
            rec.events,
            vec![
                "compile",
                "compiled true",
                "start 2",
                "finish 2 WA",
                "start 10",
                "finish 10 AC",
                "start 1",
                "finish 1 NI",
                "summary 3",
            ]
        );
        assert_eq!(
            report.summary,
            Summary {
                accepted: 1,
                failed: 1,
                not_inspected: 1
            }
        );
    }

    #[tokio::test]
    async fn result_files_are_written_when_enabled() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let problem = problem(tmp.path(), "echo out", &[("a.in", ""), ("a.out", "out\n")]);

        TestRun::new(&cfg).run(&problem, crate::report::NullReporter).await.unwrap();
        let saved = fs::read_to_string(problem.join("samples").join("a.res")).unwrap();
        assert_eq!(saved, "out\n");
    }

    #[tokio::test]
    async fn result_files_are_not_written_when_disabled() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = TestConfig {
            create_result_files: false,
            ..config(tmp.path())
        };
        let problem = problem(tmp.path(), "echo out", &[("a.in", "")]);

        let report = TestRun::new(&cfg).run(&problem, crate::report::NullReporter).await.unwrap();
        assert_eq!(report.results[0].1.verdict, Verdict::NI);
        assert!(!problem.join("samples").join("a.res").exists());
    }

    #[tokio::test]
    async fn compile_error_runs_no_testcase() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let problem = problem(tmp.path(), "syntax error", &[("1.in", ""), ("1.out", "")]);

        let mut rec = Recorder::default();
        let err = TestRun::new(&cfg).run(&problem, &mut rec).await.unwrap_err();

        assert!(!err.compiler_stderr().unwrap().is_empty());
        assert_eq!(rec.events, vec!["compile", "compiled false"]);
    }

    #[tokio::test]
    async fn missing_samples_dir_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let problem = problem(tmp.path(), "true", &[]);
        fs::remove_dir(problem.join("samples")).unwrap();

        let err = TestRun::new(&cfg)
            .run(&problem, crate::report::NullReporter)
            .await
            .unwrap_err();
        assert!(matches!(err, testing::Error::MissingSamples(_)));
    }

    #[tokio::test]
    async fn missing_source_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let problem = problem(tmp.path(), "true", &[("1.in", "")]);
        fs::remove_file(problem.join("main.sh")).unwrap();

        let mut rec = Recorder::default();
        let err = TestRun::new(&cfg).run(&problem, &mut rec).await.unwrap_err();
        assert!(matches!(err, testing::Error::MissingSource(_)));
        assert!(rec.events.is_empty());
    }

    #[tokio::test]
    async fn unreadable_sample_aborts_before_any_testcase() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let problem = problem(tmp.path(), "cat", &[("1.in", "x\n"), ("1.out", "x\n")]);
        std::os::unix::fs::symlink("/nonexistent/x", problem.join("samples").join("2.in")).unwrap();

        let mut rec = Recorder::default();
        let err = TestRun::new(&cfg).run(&problem, &mut rec).await.unwrap_err();

        match &err {
            testing::Error::Io(_, path, _) => assert!(path.ends_with("2.in")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(rec.events.is_empty());
        assert!(!problem.join("samples").join("1.res").exists());
    }

    #[tokio::test]
    async fn a_crash_does_not_affect_later_testcases() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config(tmp.path());
        let problem = problem(
            tmp.path(),
            r#"read x; if [ "$x" = crash ]; then exit 1; fi; if [ "$x" = hang ]; then sleep 2; fi; echo ok"#,
            &[
                ("1.in", "crash\n"),
                ("1.out", "ok\n"),
                ("2.in", "hang\n"),
                ("2.out", "ok\n"),
                ("3.in", "fine\n"),
                ("3.out", "ok\n"),
            ],
        );

        let report = TestRun::new(&cfg)
            .time_limit(Duration::from_millis(300))
            .run(&problem, crate::report::NullReporter)
            .await
            .unwrap();
        let verdicts: Vec<_> = report.results.iter().map(|(_, o)| o.verdict).collect();
        assert_eq!(verdicts, vec![Verdict::RTE, Verdict::TLE, Verdict::AC]);
        assert_eq!(report.summary.failed, 2);
    }
}
