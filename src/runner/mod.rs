pub mod executor;
pub mod reporter;
pub mod types;

pub use executor::SuiteRunner;
pub use reporter::TestReporter;
pub use types::{HookFailure, RunSummary, SuiteReport, TestOutcome, TestResult};
