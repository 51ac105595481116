use crate::api_spec::ApiSpec;
use crate::error::ConfigurationError;
use crate::registry::{ExecutionModifiers, HookPhase, InstanceMode, SuiteType};

/// 运行过滤条件
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    /// 只运行带有任一标签的测试；为空表示不过滤
    pub tags: Vec<String>,
    /// 只运行名字包含该子串的测试
    pub name_contains: Option<String>,
    /// 是否处于 only 模式；None 时由套件自己判断
    pub only: Option<bool>,
}

impl RunFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn with_name(mut self, pattern: &str) -> Self {
        self.name_contains = Some(pattern.to_string());
        self
    }
}

/// 测试的调度决定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    Run,
    /// 跳过，附带原因
    Skip(String),
}

/// 执行计划中的一个测试
#[derive(Debug, Clone)]
pub struct PlannedTest {
    /// 声明的成员名
    pub name: String,
    /// 显示名（`name` 修饰符优先）
    pub display_name: String,
    /// 套件修饰符合并后的结果
    pub modifiers: ExecutionModifiers,
    /// 完整的 API 规格；普通测试为 None
    pub api: Option<ApiSpec>,
    /// 解析失败时的错误，执行时该测试直接失败
    pub error: Option<ConfigurationError>,
}

impl PlannedTest {
    pub fn is_api_eligible(&self) -> bool {
        self.api.is_some()
    }

    /// 根据修饰符和过滤条件决定是否运行
    pub fn schedule(&self, filter: &RunFilter, only_mode: bool) -> Schedule {
        if self.modifiers.skip {
            return Schedule::Skip("skip".to_string());
        }
        if only_mode && !self.modifiers.only {
            return Schedule::Skip("not marked only".to_string());
        }
        if !filter.tags.is_empty() && !filter.tags.iter().any(|t| self.modifiers.has_tag(t)) {
            return Schedule::Skip("filtered by tag".to_string());
        }
        if let Some(pattern) = &filter.name_contains
            && !self.display_name.contains(pattern.as_str())
            && !self.name.contains(pattern.as_str())
        {
            return Schedule::Skip("filtered by name".to_string());
        }
        Schedule::Run
    }
}

/// 计划中的钩子
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedHook {
    pub name: String,
    pub phase: HookPhase,
}

/// 一个套件的执行计划
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub owner: SuiteType,
    pub suite_name: String,
    pub instance_mode: InstanceMode,
    pub before_all: Vec<PlannedHook>,
    pub before_each: Vec<PlannedHook>,
    pub after_each: Vec<PlannedHook>,
    pub after_all: Vec<PlannedHook>,
    pub tests: Vec<PlannedTest>,
}

impl ExecutionPlan {
    pub fn new(owner: SuiteType, suite_name: String, instance_mode: InstanceMode) -> Self {
        Self {
            owner,
            suite_name,
            instance_mode,
            before_all: Vec::new(),
            before_each: Vec::new(),
            after_each: Vec::new(),
            after_all: Vec::new(),
            tests: Vec::new(),
        }
    }

    /// 按阶段归入对应的钩子列表
    pub fn push_hook(&mut self, hook: PlannedHook) {
        match hook.phase {
            HookPhase::BeforeAll => self.before_all.push(hook),
            HookPhase::BeforeEach => self.before_each.push(hook),
            HookPhase::AfterEach => self.after_each.push(hook),
            HookPhase::AfterAll => self.after_all.push(hook),
        }
    }

    pub fn has_only(&self) -> bool {
        self.tests.iter().any(|t| t.modifiers.only)
    }

    pub fn hook_count(&self) -> usize {
        self.before_all.len() + self.before_each.len() + self.after_each.len() + self.after_all.len()
    }
}
