use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api_spec::ApiSpec;

/// 钩子阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPhase {
    /// 整个套件开始前执行一次
    BeforeAll,
    /// 每个测试前执行
    BeforeEach,
    /// 每个测试后执行
    AfterEach,
    /// 整个套件结束后执行一次
    AfterAll,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HookPhase::BeforeAll => "beforeAll",
            HookPhase::BeforeEach => "beforeEach",
            HookPhase::AfterEach => "afterEach",
            HookPhase::AfterAll => "afterAll",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Suite,
    Test,
    Hook(HookPhase),
}

/// 套件实例的共享方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceMode {
    /// 每个测试（连同它的 each 钩子）使用新实例
    #[default]
    PerTest,
    /// 整个套件只创建一个实例，所有钩子和测试共享
    Shared,
}

/// 执行修饰符
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionModifiers {
    #[serde(default)]
    pub only: bool,
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub slow: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ExecutionModifiers {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// 记录的选项，随注解不断累积
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecificationOptions {
    #[serde(default)]
    pub modifiers: ExecutionModifiers,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_mode: Option<InstanceMode>,

    /// 未识别的选项原样保留
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SpecificationOptions {
    /// 取出（必要时创建）API 规格片段
    pub fn api_mut(&mut self) -> &mut ApiSpec {
        self.api.get_or_insert_with(ApiSpec::default)
    }
}

/// 注册表中的一条记录
///
/// `kind` 在创建时确定，之后不可修改。
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRecord {
    kind: RecordKind,
    pub name: String,
    pub options: SpecificationOptions,
}

impl MetadataRecord {
    pub fn new(kind: RecordKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            options: SpecificationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SpecificationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn is_hook(&self) -> bool {
        matches!(self.kind, RecordKind::Hook(_))
    }

    /// 合并后的 API 规格是否完整（method 与 path 都存在）
    pub fn is_api_eligible(&self) -> bool {
        self.options
            .api
            .as_ref()
            .is_some_and(|api| api.is_complete())
    }

    /// 显示名：优先使用 `name` 修饰符
    pub fn display_name(&self) -> &str {
        self.options.modifiers.name.as_deref().unwrap_or(&self.name)
    }
}
