use std::{path::Path, time::Duration};

use colored::{Color, ColoredString, Colorize};
use crossterm::terminal;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::OutputMode;
use crate::interactive::{LineSink, StreamKind};
use crate::report::TestReporter;
use crate::testing::{
    AsyncTestcase as _, Edit, EditOp, ExecutionOutcome, FsTestcase, Summary, Verdict,
};

pub fn is_truecolor_supported() -> bool {
    let Ok(v) = std::env::var("COLORTERM") else {
        return false
    };
    matches!(v.as_str(), "truecolor" | "24bit")
}

pub trait ColorTheme {
    fn color(&self) -> Color;
}

impl ColorTheme for Verdict {
    fn color(&self) -> Color {
        use Verdict::*;
        if !self::is_truecolor_supported() {
            return match self {
                AC => Color::Green,
                WA => Color::Yellow,
                TLE => Color::Red,
                RTE => Color::Magenta,
                NI => Color::Blue,
            };
        }

        match self {
            AC => Color::TrueColor {
                r: 30,
                g: 180,
                b: 40,
            },
            WA => Color::TrueColor {
                r: 210,
                g: 138,
                b: 4,
            },
            TLE => Color::TrueColor {
                r: 220,
                g: 42,
                b: 42,
            },
            RTE => Color::TrueColor {
                r: 171,
                g: 40,
                b: 200,
            },
            NI => Color::TrueColor {
                r: 40,
                g: 120,
                b: 210,
            },
        }
    }
}

impl ColorTheme for EditOp {
    fn color(&self) -> Color {
        match self {
            EditOp::Keep => Color::White,
            EditOp::Insert => Color::BrightGreen,
            EditOp::Delete => Color::BrightRed,
        }
    }
}

pub fn verdict_badge(verdict: Verdict) -> ColoredString {
    let fg = if is_truecolor_supported() {
        Color::TrueColor {
            r: 255,
            g: 255,
            b: 255,
        }
    } else {
        Color::BrightBlack
    };
    format!(" {:<3} ", verdict)
        .on_color(verdict.color())
        .bold()
        .color(fg)
}

/// `+`/`-`/` ` prefixed line. Spaces are drawn as a dimmed `·` so trailing
/// and doubled spaces stay visible.
pub fn render_edit(edit: &Edit) -> String {
    let paint = |s: &str| -> String {
        match edit.op {
            EditOp::Keep => s.normal().to_string(),
            op => s.color(op.color()).bold().to_string(),
        }
    };
    let dot = "·".dimmed().to_string();
    let body = edit
        .line
        .split(' ')
        .map(paint)
        .collect::<Vec<_>>()
        .join(&dot);
    format!("{}{}", paint(&format!("{} ", edit.op.sign())), body)
}

fn terminal_cols() -> usize {
    terminal::size().map(|(cols, _)| cols as usize).unwrap_or(40)
}

pub fn print_rule() {
    const THIN_LINE: &str = "─";
    println!("{}", THIN_LINE.repeat(terminal_cols()).bright_black());
}

/// Renders a test run on the terminal: a spinner per step, then the
/// verdict and, depending on [`OutputMode`], the diff.
pub struct ConsoleReporter {
    output: OutputMode,
    spinner: Option<ProgressBar>,
}

impl ConsoleReporter {
    const TICK: Duration = Duration::from_millis(50);

    pub fn new(output: OutputMode) -> Self {
        Self {
            output,
            spinner: None,
        }
    }

    fn start_spinner(&mut self, msg: String) {
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let bar = ProgressBar::new_spinner()
            .with_style(style)
            .with_message(msg);
        bar.enable_steady_tick(Self::TICK);
        self.spinner = Some(bar);
    }

    fn stop_spinner(&mut self) {
        if let Some(bar) = self.spinner.take() {
            bar.finish_and_clear();
        }
    }

    fn shows_script(&self, verdict: Verdict) -> bool {
        match (self.output, verdict) {
            (OutputMode::Minimal, _) => false,
            (_, Verdict::WA) => true,
            (OutputMode::Full, Verdict::AC | Verdict::NI) => true,
            _ => false,
        }
    }

    fn print_detail(&self, outcome: &ExecutionOutcome) {
        let verdict = outcome.verdict;
        if self.shows_script(verdict) {
            for edit in outcome.edit_script().iter() {
                println!("{}", render_edit(edit));
            }
        }
        let note = match (self.output, verdict) {
            (OutputMode::Minimal, _) => return,
            (_, Verdict::TLE) => "Your program ran out of time".to_owned(),
            (_, Verdict::RTE) => match outcome.exit_status.and_then(|s| s.code()) {
                Some(code) => format!("Your program crashed (exit code {})", code),
                None => "Your program was killed by a signal".to_owned(),
            },
            (_, Verdict::WA) => "Your output is incorrect".to_owned(),
            (OutputMode::Full, Verdict::AC) => "Your output is correct".to_owned(),
            (OutputMode::Full, Verdict::NI) => "This is your program output".to_owned(),
            _ => return,
        };
        println!("  {} {}", note, verdict_badge(verdict));
        if verdict == Verdict::RTE && !outcome.stderr.is_empty() {
            print!("{}", outcome.stderr.bright_black());
        }
    }
}

impl TestReporter for ConsoleReporter {
    fn compile_started(&mut self, source: &Path) {
        self.start_spinner(format!("Compiling {} ...", source.display()));
    }

    fn compile_finished(&mut self, success: bool) {
        self.stop_spinner();
        if !success {
            println!("{}", "Couldn't compile your program".bright_red().bold());
        }
    }

    fn case_started(&mut self, testcase: &FsTestcase) {
        self.start_spinner(format!("Testcase {} ...", testcase.name()));
    }

    fn case_finished(&mut self, testcase: &FsTestcase, outcome: &ExecutionOutcome) {
        self.stop_spinner();
        println!(
            "{} {} {}",
            format!("Testcase {} ...", testcase.name()).cyan().bold(),
            verdict_badge(outcome.verdict),
            format!("[{}ms]", outcome.execution_time.as_millis()).bright_black(),
        );
        self.print_detail(outcome);
        if self.output != OutputMode::Minimal {
            print_rule();
        }
    }

    fn finished(&mut self, summary: &Summary) {
        self.stop_spinner();
        print_test_result_summary(summary);
    }
}

pub fn print_test_result_summary(summary: &Summary) {
    let bar = "-".repeat(5);
    print!("{} ", bar);

    if summary.total() == 0 {
        print!("{}", "No test ran".bold());
    } else if !summary.has_failure() && summary.not_inspected == 0 {
        let msg = format!("All {} tests passed ✨", summary.total());
        print!("{}", msg.green());
    } else {
        let parts: Vec<String> = [
            (summary.accepted, "PASSED", Verdict::AC),
            (summary.failed, "FAILED", Verdict::WA),
            (summary.not_inspected, "RAN", Verdict::NI),
        ]
        .into_iter()
        .filter(|(count, _, _)| *count > 0)
        .map(|(count, label, verdict)| {
            format!("{} {}", count, label)
                .color(verdict.color())
                .bold()
                .to_string()
        })
        .collect();
        print!("{}", parts.join(", "));
    }

    println!(" {}", bar);
}

/// Prints relayed lines of an interactive session as they arrive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl LineSink for ConsoleSink {
    fn line(&self, kind: StreamKind, line: &str) {
        match kind {
            StreamKind::Stdout => {
                let color = if is_truecolor_supported() {
                    Color::TrueColor {
                        r: 153,
                        g: 114,
                        b: 204,
                    }
                } else {
                    Color::Magenta
                };
                println!("{}", line.color(color).bold());
            }
            StreamKind::Stderr => eprintln!("{}", line.bright_black()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn render_edit_marks_spaces() {
        colored::control::set_override(false);
        let line = render_edit(&Edit::new(EditOp::Delete, "1 2 "));
        assert_eq!(line, "- 1·2·");
        let line = render_edit(&Edit::new(EditOp::Keep, "ok"));
        assert_eq!(line, "  ok");
    }

    #[test]
    fn script_visibility_per_output_mode() {
        let minimal = ConsoleReporter::new(OutputMode::Minimal);
        let error = ConsoleReporter::new(OutputMode::Error);
        let full = ConsoleReporter::new(OutputMode::Full);

        assert!(!minimal.shows_script(Verdict::WA));
        assert!(error.shows_script(Verdict::WA));
        assert!(!error.shows_script(Verdict::AC));
        assert!(!error.shows_script(Verdict::NI));
        assert!(full.shows_script(Verdict::AC));
        assert!(full.shows_script(Verdict::NI));
        assert!(!full.shows_script(Verdict::TLE));
    }
}
