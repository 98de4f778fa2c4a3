use std::path::Path;

use crate::testing::{ExecutionOutcome, FsTestcase, Summary};

/// Receives the progress of a test run. Implementations only render; they
/// never influence the run itself.
pub trait TestReporter {
    fn compile_started(&mut self, _source: &Path) {}
    fn compile_finished(&mut self, _success: bool) {}
    fn case_started(&mut self, _testcase: &FsTestcase) {}
    fn case_finished(&mut self, _testcase: &FsTestcase, _outcome: &ExecutionOutcome) {}
    fn finished(&mut self, _summary: &Summary) {}
}

/// Reporter that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl TestReporter for NullReporter {}

impl<R: TestReporter + ?Sized> TestReporter for &mut R {
    fn compile_started(&mut self, source: &Path) {
        (**self).compile_started(source)
    }

    fn compile_finished(&mut self, success: bool) {
        (**self).compile_finished(success)
    }

    fn case_started(&mut self, testcase: &FsTestcase) {
        (**self).case_started(testcase)
    }

    fn case_finished(&mut self, testcase: &FsTestcase, outcome: &ExecutionOutcome) {
        (**self).case_finished(testcase, outcome)
    }

    fn finished(&mut self, summary: &Summary) {
        (**self).finished(summary)
    }
}
