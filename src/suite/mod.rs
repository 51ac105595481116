/// 套件编排 - 收集声明、生成执行计划、驱动钩子和测试
mod definition;
mod orchestrator;
mod plan;

pub use definition::{
    DeclaredMember, Declarations, MemberBody, Suite, SuiteHandle, TestContext, TestInfo,
};
pub use orchestrator::{OrchestratorSettings, SuiteOrchestrator, SuiteRun, SuiteState};
pub use plan::{ExecutionPlan, PlannedHook, PlannedTest, RunFilter, Schedule};
