use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::annotate::{self, Annotation};
use crate::http::{ApiResponse, Transport};
use crate::registry::{ExecutionModifiers, MetadataRegistry};

/// 套件实例句柄；共享模式下所有钩子和测试拿到的是同一个实例
pub type SuiteHandle<S> = Arc<Mutex<S>>;

/// 钩子或测试体
pub type MemberBody<S> =
    Arc<dyn Fn(SuiteHandle<S>, TestContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// 一个测试套件
///
/// `declare` 在收集阶段调用一次：登记成员的执行体，并通过返回的
/// [`Annotation`] 把规格片段写入注册表。
pub trait Suite: Sized + Send + 'static {
    /// 创建套件实例
    fn create() -> Self;

    /// 声明成员
    fn declare(declarations: &mut Declarations<'_, Self>);
}

/// 当前测试的信息
#[derive(Debug, Clone, Default)]
pub struct TestInfo {
    pub suite: String,
    pub name: String,
    pub modifiers: ExecutionModifiers,
}

/// 注入给钩子和测试体的上下文
#[derive(Clone)]
pub struct TestContext {
    pub info: TestInfo,
    /// API 测试自动请求得到的响应；普通测试和钩子为 None
    pub response: Option<ApiResponse>,
    pub transport: Arc<dyn Transport>,
}

impl TestContext {
    pub fn new(info: TestInfo, transport: Arc<dyn Transport>) -> Self {
        Self {
            info,
            response: None,
            transport,
        }
    }

    pub fn response(&self) -> Option<&ApiResponse> {
        self.response.as_ref()
    }

    /// 取出响应；没有自动请求时返回错误
    pub fn expect_response(&self) -> anyhow::Result<&ApiResponse> {
        self.response
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("test '{}' has no API response", self.info.name))
    }

    /// 响应体 JSON
    pub fn json(&self) -> anyhow::Result<Value> {
        Ok(self.expect_response()?.json()?)
    }
}

/// 已声明的成员
pub struct DeclaredMember<S> {
    pub name: String,
    pub body: MemberBody<S>,
}

/// 收集阶段的声明表
pub struct Declarations<'r, S> {
    registry: &'r MetadataRegistry,
    members: Vec<DeclaredMember<S>>,
}

impl<'r, S: Suite> Declarations<'r, S> {
    pub fn new(registry: &'r MetadataRegistry) -> Self {
        Self {
            registry,
            members: Vec::new(),
        }
    }

    pub fn registry(&self) -> &'r MetadataRegistry {
        self.registry
    }

    /// 登记一个成员的执行体，返回该成员槽上的注解句柄
    ///
    /// 同名成员再次登记时替换执行体，保留原声明位置。
    pub fn member<F, Fut>(&mut self, name: &str, body: F) -> Annotation<'r>
    where
        F: Fn(SuiteHandle<S>, TestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let body: MemberBody<S> = Arc::new(
            move |suite: SuiteHandle<S>, cx: TestContext| -> BoxFuture<'static, anyhow::Result<()>> {
                Box::pin(body(suite, cx))
            },
        );
        match self.members.iter_mut().find(|m| m.name == name) {
            Some(existing) => existing.body = body,
            None => self.members.push(DeclaredMember {
                name: name.to_string(),
                body,
            }),
        }
        annotate::member::<S>(self.registry, name)
    }

    pub fn test<F, Fut>(&mut self, name: &str, body: F) -> Annotation<'r>
    where
        F: Fn(SuiteHandle<S>, TestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.member(name, body).test()
    }

    pub fn before_all<F, Fut>(&mut self, name: &str, body: F) -> Annotation<'r>
    where
        F: Fn(SuiteHandle<S>, TestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.member(name, body).before_all()
    }

    pub fn before_each<F, Fut>(&mut self, name: &str, body: F) -> Annotation<'r>
    where
        F: Fn(SuiteHandle<S>, TestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.member(name, body).before_each()
    }

    pub fn after_each<F, Fut>(&mut self, name: &str, body: F) -> Annotation<'r>
    where
        F: Fn(SuiteHandle<S>, TestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.member(name, body).after_each()
    }

    pub fn after_all<F, Fut>(&mut self, name: &str, body: F) -> Annotation<'r>
    where
        F: Fn(SuiteHandle<S>, TestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.member(name, body).after_all()
    }

    /// 套件级注解
    pub fn suite(&self) -> Annotation<'r> {
        annotate::suite::<S>(self.registry)
    }

    pub fn members(&self) -> &[DeclaredMember<S>] {
        &self.members
    }

    pub(crate) fn into_members(self) -> Vec<DeclaredMember<S>> {
        self.members
    }
}
