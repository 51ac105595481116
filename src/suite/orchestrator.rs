use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::Mutex;

use crate::config::DectestConfig;
use crate::engine;
use crate::http::Transport;
use crate::registry::{
    ExecutionModifiers, HookPhase, InstanceMode, MetadataRegistry, RecordKind, SuiteType,
};
use crate::resolver::{ConflictPolicy, MemberRef, SpecResolver};
use crate::runner::{HookFailure, SuiteReport, TestResult};

use super::definition::{
    DeclaredMember, Declarations, MemberBody, Suite, SuiteHandle, TestContext, TestInfo,
};
use super::plan::{ExecutionPlan, PlannedHook, PlannedTest, RunFilter, Schedule};

/// 套件生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteState {
    /// 注解写入注册表
    Collecting,
    /// 每个成员已解析并分桶
    Resolved,
    /// 实例提供者就绪，实例在第一次需要时才创建
    Instantiated,
    /// 正在执行钩子和测试
    Executing,
    /// afterAll 钩子已执行
    TornDown,
}

/// 编排器设置
#[derive(Debug, Clone, Copy, Default)]
pub struct OrchestratorSettings {
    pub conflict_policy: ConflictPolicy,
    /// 套件记录未指定实例模式时使用
    pub instance_mode: InstanceMode,
}

impl From<&DectestConfig> for OrchestratorSettings {
    fn from(config: &DectestConfig) -> Self {
        Self {
            conflict_policy: config.conflict_policy,
            instance_mode: config.instance_mode,
        }
    }
}

/// 套件编排器：解析成员、生成执行计划并驱动执行
pub struct SuiteOrchestrator<'r, S: Suite> {
    registry: &'r MetadataRegistry,
    settings: OrchestratorSettings,
    state: SuiteState,
    members: Vec<DeclaredMember<S>>,
    plan: Option<ExecutionPlan>,
    /// 套件级实例：共享模式下给所有成员用，否则只给 all 钩子用
    instance: Option<SuiteHandle<S>>,
    instances_created: usize,
}

impl<'r, S: Suite> SuiteOrchestrator<'r, S> {
    /// 收集阶段：调用 `S::declare`
    pub fn collect(registry: &'r MetadataRegistry) -> Self {
        Self::collect_with(registry, OrchestratorSettings::default())
    }

    pub fn collect_with(registry: &'r MetadataRegistry, settings: OrchestratorSettings) -> Self {
        let mut declarations = Declarations::new(registry);
        S::declare(&mut declarations);
        let members = declarations.into_members();

        tracing::debug!(
            suite = SuiteType::of::<S>().short_name(),
            members = members.len(),
            "collected suite declarations"
        );

        Self {
            registry,
            settings,
            state: SuiteState::Collecting,
            members,
            plan: None,
            instance: None,
            instances_created: 0,
        }
    }

    pub fn state(&self) -> SuiteState {
        self.state
    }

    pub fn plan(&self) -> Option<&ExecutionPlan> {
        self.plan.as_ref()
    }

    /// 已创建的套件实例数量
    pub fn instances_created(&self) -> usize {
        self.instances_created
    }

    /// 解析阶段：封存套件，逐个成员解析并生成执行计划
    ///
    /// 重复调用返回第一次的计划。
    pub fn resolve(&mut self) -> &ExecutionPlan {
        if self.plan.is_none() {
            self.plan = Some(self.build_plan());
            self.state = SuiteState::Resolved;
        }
        match &self.plan {
            Some(plan) => plan,
            None => unreachable!("plan was just built"),
        }
    }

    fn build_plan(&self) -> ExecutionPlan {
        let owner = SuiteType::of::<S>();
        self.registry.seal(owner);

        let resolver = SpecResolver::new(self.registry).with_policy(self.settings.conflict_policy);

        let (suite_record, suite_error) = match resolver.resolve_suite(owner) {
            Ok(record) => (record, None),
            Err(e) => {
                tracing::warn!(suite = owner.short_name(), "suite record failed to resolve: {}", e);
                (None, Some(e))
            }
        };

        let suite_name = suite_record
            .as_ref()
            .map(|r| r.display_name().to_string())
            .unwrap_or_else(|| owner.short_name().to_string());
        let instance_mode = suite_record
            .as_ref()
            .and_then(|r| r.options.instance_mode)
            .unwrap_or(self.settings.instance_mode);
        let suite_modifiers = suite_record
            .map(|r| r.options.modifiers)
            .unwrap_or_default();

        let mut plan = ExecutionPlan::new(owner, suite_name, instance_mode);

        for member in &self.members {
            let member_ref = MemberRef::new(owner, member.name.clone());
            match resolver.resolve(&member_ref) {
                Ok(None) => {
                    tracing::debug!(member = %member.name, "declared member has no annotations, not scheduled");
                }
                Ok(Some(record)) => match record.kind() {
                    RecordKind::Hook(phase) => plan.push_hook(PlannedHook {
                        name: member.name.clone(),
                        phase,
                    }),
                    RecordKind::Test | RecordKind::Suite => {
                        let api = if record.is_api_eligible() {
                            record.options.api.clone()
                        } else {
                            if record.options.api.is_some() {
                                tracing::debug!(member = %member.name, "API spec incomplete, running as plain test");
                            }
                            None
                        };
                        plan.tests.push(PlannedTest {
                            name: member.name.clone(),
                            display_name: record.display_name().to_string(),
                            modifiers: inherit_modifiers(&suite_modifiers, &record.options.modifiers),
                            api,
                            error: suite_error.clone(),
                        });
                    }
                },
                Err(e) => plan.tests.push(PlannedTest {
                    name: member.name.clone(),
                    display_name: member.name.clone(),
                    modifiers: suite_modifiers.clone(),
                    api: None,
                    error: Some(e),
                }),
            }
        }

        tracing::info!(
            suite = %plan.suite_name,
            tests = plan.tests.len(),
            hooks = plan.hook_count(),
            mode = ?plan.instance_mode,
            "suite resolved"
        );

        plan
    }

    fn body(&self, name: &str) -> Option<MemberBody<S>> {
        self.members
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.body.clone())
    }

    fn create_instance(&mut self) -> SuiteHandle<S> {
        self.instances_created += 1;
        tracing::debug!(suite = SuiteType::of::<S>().short_name(), "creating suite instance");
        Arc::new(Mutex::new(S::create()))
    }

    /// 套件级实例，第一次需要时创建
    fn suite_instance(&mut self) -> SuiteHandle<S> {
        if let Some(instance) = &self.instance {
            return instance.clone();
        }
        let instance = self.create_instance();
        self.instance = Some(instance.clone());
        instance
    }

    fn test_instance(&mut self, mode: InstanceMode) -> SuiteHandle<S> {
        match mode {
            InstanceMode::Shared => self.suite_instance(),
            InstanceMode::PerTest => self.create_instance(),
        }
    }

    async fn invoke(
        &self,
        name: &str,
        handle: SuiteHandle<S>,
        cx: TestContext,
    ) -> Result<(), String> {
        let Some(body) = self.body(name) else {
            return Err(format!("member '{}' has no body", name));
        };

        match AssertUnwindSafe(body(handle, cx)).catch_unwind().await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(format!("{:#}", e)),
            Err(payload) => Err(panic_message(payload)),
        }
    }

    async fn run_all_hook(
        &mut self,
        plan: &ExecutionPlan,
        hook: &PlannedHook,
        transport: &Arc<dyn Transport>,
        report: &mut SuiteReport,
    ) {
        let handle = self.suite_instance();
        let info = TestInfo {
            suite: plan.suite_name.clone(),
            name: hook.name.clone(),
            modifiers: ExecutionModifiers::default(),
        };
        let cx = TestContext::new(info, transport.clone());

        if let Err(message) = self.invoke(&hook.name, handle, cx).await {
            tracing::warn!(suite = %plan.suite_name, hook = %hook.name, "{} hook failed: {}", hook.phase, message);
            report.hook_failures.push(HookFailure {
                hook: hook.name.clone(),
                phase: hook.phase,
                test: None,
                message,
            });
        }
    }

    /// 单个测试的一次迭代：beforeEach → 自动请求 → 测试体 → afterEach
    async fn run_test(
        &mut self,
        plan: &ExecutionPlan,
        test: &PlannedTest,
        transport: &Arc<dyn Transport>,
        result: &mut TestResult,
        report: &mut SuiteReport,
    ) {
        if let Some(error) = &test.error {
            result.fail(error.to_string());
            return;
        }

        let handle = self.test_instance(plan.instance_mode);
        let info = TestInfo {
            suite: plan.suite_name.clone(),
            name: test.display_name.clone(),
            modifiers: test.modifiers.clone(),
        };

        for hook in &plan.before_each {
            let cx = TestContext::new(info.clone(), transport.clone());
            if let Err(message) = self.invoke(&hook.name, handle.clone(), cx).await {
                result.fail(format!("{} hook '{}' failed: {}", hook.phase, hook.name, message));
                report.hook_failures.push(HookFailure {
                    hook: hook.name.clone(),
                    phase: HookPhase::BeforeEach,
                    test: Some(test.display_name.clone()),
                    message,
                });
                return;
            }
        }

        let mut cx = TestContext::new(info.clone(), transport.clone());
        if let Some(api) = &test.api {
            match engine::execute(api, transport.as_ref()).await {
                Ok(response) => {
                    result.status = Some(response.status());
                    cx.response = Some(response);
                }
                Err(e) => result.fail(e.to_string()),
            }
        }

        if !result.is_failed()
            && let Err(message) = self.invoke(&test.name, handle.clone(), cx).await
        {
            result.fail(message);
        }

        for hook in &plan.after_each {
            let cx = TestContext::new(info.clone(), transport.clone());
            if let Err(message) = self.invoke(&hook.name, handle.clone(), cx).await {
                result.fail(format!("{} hook '{}' failed: {}", hook.phase, hook.name, message));
                report.hook_failures.push(HookFailure {
                    hook: hook.name.clone(),
                    phase: HookPhase::AfterEach,
                    test: Some(test.display_name.clone()),
                    message,
                });
            }
        }
    }

    /// 执行整个套件
    ///
    /// 单个测试或钩子的失败只记录在报告里，不会中断后续测试。
    pub async fn run(&mut self, transport: Arc<dyn Transport>, filter: &RunFilter) -> SuiteReport {
        let plan = self.resolve().clone();
        let started = Instant::now();
        let mut report = SuiteReport::new(plan.suite_name.clone());
        let only_mode = filter.only.unwrap_or_else(|| plan.has_only());

        self.state = SuiteState::Instantiated;
        self.instance = None;

        self.state = SuiteState::Executing;
        for hook in &plan.before_all {
            self.run_all_hook(&plan, hook, &transport, &mut report).await;
        }

        for (index, test) in plan.tests.iter().enumerate() {
            let mut result = TestResult::new(
                index + 1,
                test.display_name.clone(),
                test.api.as_ref().map(|api| {
                    format!(
                        "{} {}",
                        api.method.as_deref().unwrap_or_default(),
                        api.path.as_deref().unwrap_or_default()
                    )
                }),
            );
            result.slow = test.modifiers.slow;
            result.tags = test.modifiers.tags.clone();

            if let Schedule::Skip(reason) = test.schedule(filter, only_mode) {
                tracing::debug!(test = %test.display_name, reason = %reason, "skipping test");
                report.results.push(result.skipped(reason));
                continue;
            }

            let start = Instant::now();
            self.run_test(&plan, test, &transport, &mut result, &mut report)
                .await;
            result.duration = start.elapsed();

            match result.error() {
                Some(error) => tracing::info!(test = %test.display_name, "failed: {}", error),
                None => tracing::info!(test = %test.display_name, "passed"),
            }
            report.results.push(result);
        }

        for hook in &plan.after_all {
            self.run_all_hook(&plan, hook, &transport, &mut report).await;
        }

        self.instance = None;
        self.state = SuiteState::TornDown;
        report.duration = started.elapsed();
        report
    }
}

/// 类型擦除后的套件，供 [`crate::runner::SuiteRunner`] 统一驱动
pub trait SuiteRun: Send {
    fn resolve_plan(&mut self) -> &ExecutionPlan;

    fn run_boxed<'a>(
        &'a mut self,
        transport: Arc<dyn Transport>,
        filter: &'a RunFilter,
    ) -> BoxFuture<'a, SuiteReport>;
}

impl<'r, S: Suite> SuiteRun for SuiteOrchestrator<'r, S> {
    fn resolve_plan(&mut self) -> &ExecutionPlan {
        self.resolve()
    }

    fn run_boxed<'a>(
        &'a mut self,
        transport: Arc<dyn Transport>,
        filter: &'a RunFilter,
    ) -> BoxFuture<'a, SuiteReport> {
        Box::pin(self.run(transport, filter))
    }
}

/// 套件修饰符并入测试：布尔取或，标签取并集（套件在前），名字用测试自己的
fn inherit_modifiers(suite: &ExecutionModifiers, test: &ExecutionModifiers) -> ExecutionModifiers {
    let mut tags = suite.tags.clone();
    for tag in &test.tags {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }

    ExecutionModifiers {
        only: suite.only || test.only,
        skip: suite.skip || test.skip,
        slow: suite.slow || test.slow,
        tags,
        name: test.name.clone(),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}
