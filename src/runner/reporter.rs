use colored::Colorize;

use crate::runner::types::{HookFailure, RunSummary, SuiteReport, TestOutcome, TestResult};

pub struct TestReporter {
    verbose: bool,
}

impl TestReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// 单个测试结果的一行（失败时附带错误）
    pub fn format_result(&self, result: &TestResult) -> String {
        let endpoint = result
            .endpoint
            .as_ref()
            .map(|e| format!(" {}", e.cyan()))
            .unwrap_or_default();

        let mut line = match &result.outcome {
            TestOutcome::Skipped(reason) => format!(
                " {} [{}] {}{} {}",
                "⊘".dimmed(),
                result.test_number,
                result.name,
                endpoint,
                format!("(skipped: {})", reason).dimmed()
            ),
            outcome => {
                let symbol = if *outcome == TestOutcome::Passed {
                    "✓".green()
                } else {
                    "✗".red()
                };
                let status = result
                    .status
                    .map(|s| format!(" -> {}", s))
                    .unwrap_or_default();
                format!(
                    " {} [{}] {}{}{} ({}ms)",
                    symbol,
                    result.test_number,
                    result.name,
                    endpoint,
                    status,
                    result.duration.as_millis()
                )
            }
        };

        if result.slow {
            line.push_str(&format!(" {}", "[slow]".yellow()));
        }
        if self.verbose && !result.tags.is_empty() {
            line.push_str(&format!(" {}", format!("#{}", result.tags.join(" #")).dimmed()));
        }
        if let Some(error) = result.error() {
            line.push_str(&format!("\n   {}: {}", "Error".red().bold(), error));
        }
        line
    }

    /// 打印单个测试结果
    pub fn print_result(&self, result: &TestResult) {
        println!("{}", self.format_result(result));
    }

    pub fn format_hook_failure(&self, failure: &HookFailure) -> String {
        let scope = failure
            .test
            .as_ref()
            .map(|t| format!(" (during {})", t))
            .unwrap_or_default();
        format!(
            " {} {} hook '{}'{}: {}",
            "!".red().bold(),
            failure.phase,
            failure.hook,
            scope,
            failure.message
        )
    }

    /// 打印套件开始
    pub fn print_header(&self, suite: &str, total: usize) {
        println!("\nRunning {} tests from {}...\n", total, suite.bold());
    }

    /// 打印整个套件报告
    pub fn print_report(&self, report: &SuiteReport) {
        self.print_header(&report.suite, report.results.len());
        for result in &report.results {
            self.print_result(result);
        }
        if !report.hook_failures.is_empty() {
            println!();
            for failure in &report.hook_failures {
                println!("{}", self.format_hook_failure(failure));
            }
        }
    }

    /// 打印测试摘要
    pub fn print_summary(&self, summary: &RunSummary) {
        println!("\n{}", "━".repeat(50));
        println!("{}", "Summary".bold());
        println!("{}", "━".repeat(50));

        if summary.skipped > 0 {
            println!(
                "  {}: {} passed, {} failed, {} skipped, {} total",
                "Tests".bold(),
                summary.passed.to_string().green(),
                summary.failed.to_string().red(),
                summary.skipped.to_string().dimmed(),
                summary.total
            );
        } else if summary.failed == 0 {
            println!(
                "  {}: {} passed, {} total",
                "Tests".bold(),
                summary.passed.to_string().green(),
                summary.total
            );
        } else {
            println!(
                "  {}: {} passed, {} failed, {} total",
                "Tests".bold(),
                summary.passed.to_string().green(),
                summary.failed.to_string().red(),
                summary.total
            );
        }

        if summary.hook_failures > 0 {
            println!(
                "  {}: {} failed",
                "Hooks".bold(),
                summary.hook_failures.to_string().red()
            );
        }

        println!(
            "  {}: {} suites, {:.3}s",
            "Duration".bold(),
            summary.suites,
            summary.total_duration.as_secs_f64()
        );
        println!();
    }
}

impl Default for TestReporter {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::HookPhase;

    #[test]
    fn test_format_failed_result() {
        colored::control::set_override(false);
        let reporter = TestReporter::default();
        let mut result = TestResult::new(2, "get_user".to_string(), Some("GET /users/{id}".to_string()));
        result.status = Some(404);
        result.fail("断言失败 status: 期望 200, 实际 404");

        let line = reporter.format_result(&result);
        assert!(line.contains("✗ [2] get_user GET /users/{id} -> 404"));
        assert!(line.contains("Error: 断言失败 status"));
    }

    #[test]
    fn test_format_skipped_result() {
        colored::control::set_override(false);
        let reporter = TestReporter::new(true);
        let result = TestResult::new(1, "legacy".to_string(), None).skipped("skip");

        let line = reporter.format_result(&result);
        assert!(line.contains("⊘ [1] legacy"));
        assert!(line.contains("(skipped: skip)"));
    }

    #[test]
    fn test_format_hook_failure() {
        colored::control::set_override(false);
        let reporter = TestReporter::default();
        let failure = HookFailure {
            hook: "login".to_string(),
            phase: HookPhase::BeforeEach,
            test: Some("get_user".to_string()),
            message: "boom".to_string(),
        };

        assert_eq!(
            reporter.format_hook_failure(&failure),
            " ! beforeEach hook 'login' (during get_user): boom"
        );
    }
}
