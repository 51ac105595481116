//! 注解语法糖
//!
//! 每个方法只做一次注册表写入：取出 token 下已有的记录（没有就新建），
//! 改写自己负责的那一片，再整体存回。跨 token 的合并交给解析器。

use serde_json::Value;

use crate::api_spec::{Assertion, RequestBody, upsert};
use crate::registry::{
    HookPhase, IdentityToken, InstanceMode, MetadataRecord, MetadataRegistry, RecordKind,
    SpecificationOptions,
};

/// 针对某个 token 的注解句柄
pub struct Annotation<'r> {
    registry: &'r MetadataRegistry,
    token: IdentityToken,
}

/// 标注套件成员（稳定的成员槽 token）
pub fn member<'r, S: 'static>(registry: &'r MetadataRegistry, name: &str) -> Annotation<'r> {
    Annotation::on(registry, IdentityToken::slot::<S>(name))
}

/// 标注某个具体的函数引用
pub fn function<'r>(registry: &'r MetadataRegistry, name: &str, id: u64) -> Annotation<'r> {
    Annotation::on(registry, IdentityToken::function(name, id))
}

/// 标注裸属性名
pub fn key<'r>(registry: &'r MetadataRegistry, name: &str) -> Annotation<'r> {
    Annotation::on(registry, IdentityToken::key(name))
}

/// 标注套件本身
pub fn suite<'r, S: 'static>(registry: &'r MetadataRegistry) -> Annotation<'r> {
    Annotation::on(registry, IdentityToken::suite::<S>())
}

impl<'r> Annotation<'r> {
    pub fn on(registry: &'r MetadataRegistry, token: IdentityToken) -> Self {
        Self { registry, token }
    }

    pub fn token(&self) -> &IdentityToken {
        &self.token
    }

    fn default_kind(&self) -> RecordKind {
        match self.token {
            IdentityToken::Suite(_) => RecordKind::Suite,
            _ => RecordKind::Test,
        }
    }

    fn default_name(&self) -> String {
        match &self.token {
            IdentityToken::Suite(owner) => owner.short_name().to_string(),
            token => token.member_name().unwrap_or_default().to_string(),
        }
    }

    /// 写入一片选项
    fn apply(self, write: impl FnOnce(&mut SpecificationOptions)) -> Self {
        let mut record = self
            .registry
            .get(&self.token)
            .unwrap_or_else(|| MetadataRecord::new(self.default_kind(), self.default_name()));
        write(&mut record.options);
        self.registry.store(self.token.clone(), record);
        self
    }

    /// 声明记录种类
    ///
    /// 记录的种类创建后不变；种类不同时以新种类新建记录并带上已有选项。
    fn declare(self, kind: RecordKind, name: Option<&str>) -> Self {
        let existing = self.registry.get(&self.token);
        let record = match existing {
            Some(record) if record.kind() == kind && name.is_none() => return self,
            Some(record) => {
                if record.kind() != kind {
                    tracing::debug!(token = %self.token, "re-declaring record as {:?}", kind);
                }
                let name = name.map(str::to_string).unwrap_or(record.name);
                MetadataRecord::new(kind, name).with_options(record.options)
            }
            None => {
                let name = name.map(str::to_string).unwrap_or_else(|| self.default_name());
                MetadataRecord::new(kind, name)
            }
        };
        self.registry.store(self.token.clone(), record);
        self
    }

    pub fn test(self) -> Self {
        self.declare(RecordKind::Test, None)
    }

    pub fn hook(self, phase: HookPhase) -> Self {
        self.declare(RecordKind::Hook(phase), None)
    }

    pub fn before_all(self) -> Self {
        self.hook(HookPhase::BeforeAll)
    }

    pub fn before_each(self) -> Self {
        self.hook(HookPhase::BeforeEach)
    }

    pub fn after_each(self) -> Self {
        self.hook(HookPhase::AfterEach)
    }

    pub fn after_all(self) -> Self {
        self.hook(HookPhase::AfterAll)
    }

    /// 套件描述名
    pub fn describe(self, name: &str) -> Self {
        self.declare(RecordKind::Suite, Some(name))
    }

    pub fn only(self) -> Self {
        self.apply(|o| o.modifiers.only = true)
    }

    pub fn skip(self) -> Self {
        self.apply(|o| o.modifiers.skip = true)
    }

    pub fn slow(self) -> Self {
        self.apply(|o| o.modifiers.slow = true)
    }

    pub fn tag(self, tag: &str) -> Self {
        self.apply(|o| {
            if !o.modifiers.has_tag(tag) {
                o.modifiers.tags.push(tag.to_string());
            }
        })
    }

    pub fn named(self, name: &str) -> Self {
        self.apply(|o| o.modifiers.name = Some(name.to_string()))
    }

    pub fn instance_mode(self, mode: InstanceMode) -> Self {
        self.apply(|o| o.instance_mode = Some(mode))
    }

    pub fn shared_instance(self) -> Self {
        self.instance_mode(InstanceMode::Shared)
    }

    pub fn endpoint(self, method: &str, path: &str) -> Self {
        self.apply(|o| {
            let api = o.api_mut();
            api.method = Some(method.to_string());
            api.path = Some(path.to_string());
        })
    }

    pub fn get(self, path: &str) -> Self {
        self.endpoint("GET", path)
    }

    pub fn post(self, path: &str) -> Self {
        self.endpoint("POST", path)
    }

    pub fn put(self, path: &str) -> Self {
        self.endpoint("PUT", path)
    }

    pub fn delete(self, path: &str) -> Self {
        self.endpoint("DELETE", path)
    }

    pub fn patch(self, path: &str) -> Self {
        self.endpoint("PATCH", path)
    }

    pub fn head(self, path: &str) -> Self {
        self.endpoint("HEAD", path)
    }

    pub fn path_param(self, key: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.apply(|o| {
            o.api_mut().path_params.insert(key.to_string(), value);
        })
    }

    pub fn query(self, key: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.apply(|o| {
            o.api_mut().query_params.insert(key.to_string(), value);
        })
    }

    pub fn header(self, name: &str, value: &str) -> Self {
        self.apply(|o| upsert(&mut o.api_mut().headers, name.to_string(), value.to_string()))
    }

    pub fn body(self, body: impl Into<RequestBody>) -> Self {
        let body = body.into();
        self.apply(|o| o.api_mut().body = Some(body))
    }

    pub fn expect_status(self, status: u16) -> Self {
        self.apply(|o| {
            o.api_mut().expectations.get_or_insert_with(Default::default).status = Some(status);
        })
    }

    pub fn expect_body(self, path: &str, assertion: Assertion) -> Self {
        self.apply(|o| {
            let expectations = o.api_mut().expectations.get_or_insert_with(Default::default);
            upsert(&mut expectations.body, path.to_string(), assertion);
        })
    }

    /// 结构期望只被记录，执行时不做校验
    pub fn expect_schema(self, schema: Value) -> Self {
        self.apply(|o| {
            o.api_mut().expectations.get_or_insert_with(Default::default).schema = Some(schema);
        })
    }
}
