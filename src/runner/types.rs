use std::time::Duration;

use chrono::{DateTime, Local};

use crate::registry::HookPhase;

/// 单个测试的结果
#[derive(Debug, Clone, PartialEq)]
pub enum TestOutcome {
    Passed,
    Failed(String),
    Skipped(String),
}

/// 单个测试的执行结果
#[derive(Debug, Clone)]
pub struct TestResult {
    /// 测试序号（从 1 开始）
    pub test_number: usize,

    /// 显示名
    pub name: String,

    /// API 测试的方法与路径模板
    pub endpoint: Option<String>,

    /// 响应状态码（如果有自动请求）
    pub status: Option<u16>,

    /// 执行耗时
    pub duration: Duration,

    pub outcome: TestOutcome,

    /// 标记为 slow
    pub slow: bool,

    pub tags: Vec<String>,
}

impl TestResult {
    pub fn new(test_number: usize, name: String, endpoint: Option<String>) -> Self {
        Self {
            test_number,
            name,
            endpoint,
            status: None,
            duration: Duration::ZERO,
            outcome: TestOutcome::Passed,
            slow: false,
            tags: Vec::new(),
        }
    }

    pub fn skipped(mut self, reason: impl Into<String>) -> Self {
        self.outcome = TestOutcome::Skipped(reason.into());
        self
    }

    /// 只记录第一次失败
    pub fn fail(&mut self, message: impl Into<String>) {
        if !self.is_failed() {
            self.outcome = TestOutcome::Failed(message.into());
        }
    }

    pub fn is_passed(&self) -> bool {
        self.outcome == TestOutcome::Passed
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, TestOutcome::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, TestOutcome::Skipped(_))
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            TestOutcome::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// 钩子失败记录
#[derive(Debug, Clone, PartialEq)]
pub struct HookFailure {
    pub hook: String,
    pub phase: HookPhase,
    /// 每个测试的钩子失败时所属的测试
    pub test: Option<String>,
    pub message: String,
}

/// 一个套件的运行报告
#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub suite: String,
    pub started_at: DateTime<Local>,
    pub duration: Duration,
    pub results: Vec<TestResult>,
    pub hook_failures: Vec<HookFailure>,
}

impl SuiteReport {
    pub fn new(suite: String) -> Self {
        Self {
            suite,
            started_at: Local::now(),
            duration: Duration::ZERO,
            results: Vec::new(),
            hook_failures: Vec::new(),
        }
    }

    pub fn result(&self, name: &str) -> Option<&TestResult> {
        self.results.iter().find(|r| r.name == name)
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| !r.is_failed()) && self.hook_failures.is_empty()
    }
}

/// 运行摘要
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub suites: usize,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub hook_failures: usize,
    pub total_duration: Duration,
}

impl RunSummary {
    pub fn from_reports(reports: &[SuiteReport]) -> Self {
        let results = || reports.iter().flat_map(|r| &r.results);

        Self {
            suites: reports.len(),
            total: results().count(),
            passed: results().filter(|r| r.is_passed()).count(),
            failed: results().filter(|r| r.is_failed()).count(),
            skipped: results().filter(|r| r.is_skipped()).count(),
            hook_failures: reports.iter().map(|r| r.hook_failures.len()).sum(),
            total_duration: reports.iter().map(|r| r.duration).sum(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.hook_failures == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcomes: Vec<TestOutcome>) -> SuiteReport {
        let mut report = SuiteReport::new("Users".to_string());
        for (index, outcome) in outcomes.into_iter().enumerate() {
            let mut result = TestResult::new(index + 1, format!("t{}", index + 1), None);
            result.outcome = outcome;
            result.duration = Duration::from_millis(100);
            report.results.push(result);
        }
        report.duration = Duration::from_millis(300);
        report
    }

    #[test]
    fn test_summary_counts() {
        let reports = vec![report(vec![
            TestOutcome::Passed,
            TestOutcome::Failed("boom".to_string()),
            TestOutcome::Skipped("skip".to_string()),
        ])];

        let summary = RunSummary::from_reports(&reports);
        assert_eq!(summary.suites, 1);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.total_duration, Duration::from_millis(300));
        assert!(!summary.is_success());
    }

    #[test]
    fn test_first_failure_is_kept() {
        let mut result = TestResult::new(1, "t".to_string(), None);
        result.fail("first");
        result.fail("second");
        assert_eq!(result.error(), Some("first"));
    }

    #[test]
    fn test_hook_failure_fails_report() {
        let mut report = report(vec![TestOutcome::Passed]);
        assert!(report.all_passed());
        report.hook_failures.push(HookFailure {
            hook: "setup".to_string(),
            phase: HookPhase::BeforeAll,
            test: None,
            message: "boom".to_string(),
        });
        assert!(!report.all_passed());
    }
}
