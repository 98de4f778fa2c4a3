use std::{borrow::Cow, process::ExitStatus, time::Duration};

use super::diff::EditScript;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum Verdict {
    /// Output matched the expected output exactly.
    AC,
    WA,
    TLE,
    /// Exited with nonzero status or was killed by a signal.
    RTE,
    /// Ran fine but there was no expected output to compare with.
    NI,
}

impl Verdict {
    pub fn is_failure(self) -> bool {
        matches!(self, Verdict::WA | Verdict::TLE | Verdict::RTE)
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub verdict: Verdict,
    pub execution_time: Duration,
    /// `None` when the process was killed on timeout.
    pub exit_status: Option<ExitStatus>,
    /// Raw stdout, possibly partial on TLE.
    pub stdout: Vec<u8>,
    pub stderr: String,
    pub captured_lines: Vec<String>,
    /// Present only for `AC` and `WA`, i.e. when an expected output existed
    /// and the program exited cleanly in time.
    pub alignment: Option<EditScript>,
}

impl ExecutionOutcome {
    /// The alignment if there is one, otherwise the captured lines as-is.
    pub fn edit_script(&self) -> Cow<'_, EditScript> {
        match &self.alignment {
            Some(script) => Cow::Borrowed(script),
            None => Cow::Owned(EditScript::as_is(&self.captured_lines)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub accepted: usize,
    /// `WA` + `TLE` + `RTE`
    pub failed: usize,
    pub not_inspected: usize,
}

impl Summary {
    pub fn add(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::AC => self.accepted += 1,
            Verdict::NI => self.not_inspected += 1,
            Verdict::WA | Verdict::TLE | Verdict::RTE => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.accepted + self.failed + self.not_inspected
    }

    pub fn has_failure(&self) -> bool {
        self.failed > 0
    }
}

impl FromIterator<Verdict> for Summary {
    fn from_iter<I: IntoIterator<Item = Verdict>>(iter: I) -> Self {
        iter.into_iter().fold(Self::default(), |mut s, v| {
            s.add(v);
            s
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn summary_counts() {
        use Verdict::*;
        let s: Summary = [AC, WA, TLE, RTE, NI, AC].into_iter().collect();
        assert_eq!(
            s,
            Summary {
                accepted: 2,
                failed: 3,
                not_inspected: 1
            }
        );
        assert_eq!(s.total(), 6);
        assert!(s.has_failure());
    }

    #[test]
    fn only_wa_tle_rte_are_failures() {
        let failures: Vec<_> = Verdict::iter().filter(|v| v.is_failure()).collect();
        assert_eq!(failures, vec![Verdict::WA, Verdict::TLE, Verdict::RTE]);
    }

    #[test]
    fn edit_script_falls_back_to_captured_lines() {
        let outcome = ExecutionOutcome {
            verdict: Verdict::NI,
            execution_time: Duration::ZERO,
            exit_status: None,
            stdout: b"1\n2\n".to_vec(),
            stderr: String::new(),
            captured_lines: vec!["1".into(), "2".into()],
            alignment: None,
        };
        let script = outcome.edit_script();
        assert_eq!(script.len(), 2);
        assert!(script.is_exact_match());
    }
}
