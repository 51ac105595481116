use crate::error::ConfigurationError;
use crate::registry::{IdentityToken, MetadataRecord, MetadataRegistry, RecordKind, SuiteType};

use super::ConflictPolicy;
use super::merge::FragmentMerger;

/// 待解析的成员：声明类型加成员名
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub owner: SuiteType,
    pub name: String,
}

impl MemberRef {
    pub fn new(owner: SuiteType, name: impl Into<String>) -> Self {
        Self {
            owner,
            name: name.into(),
        }
    }

    pub fn of<S: 'static>(name: impl Into<String>) -> Self {
        Self::new(SuiteType::of::<S>(), name)
    }

    /// 判断某个 token 是否描述该成员
    ///
    /// 属性名相等、函数名相等或成员槽相等都算匹配；
    /// 带声明类型的 token 还要求类型一致。
    pub fn matches(&self, token: &IdentityToken) -> bool {
        match token {
            IdentityToken::Key(key) => *key == self.name,
            IdentityToken::Function { name, .. } => *name == self.name,
            IdentityToken::Slot { owner, member } | IdentityToken::Merged { owner, member } => {
                *owner == self.owner && *member == self.name
            }
            IdentityToken::Suite(_) => false,
        }
    }
}

/// 规格解析器
///
/// 只读：不写注册表，对同一注册表状态重复调用结果相同。
pub struct SpecResolver<'r> {
    registry: &'r MetadataRegistry,
    policy: ConflictPolicy,
}

impl<'r> SpecResolver<'r> {
    pub fn new(registry: &'r MetadataRegistry) -> Self {
        Self {
            registry,
            policy: ConflictPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// 把所有描述该成员的片段合并成一条有效记录
    ///
    /// 没有任何片段匹配时返回 `Ok(None)`。
    pub fn resolve(&self, member: &MemberRef) -> Result<Option<MetadataRecord>, ConfigurationError> {
        let fragments: Vec<MetadataRecord> = self
            .registry
            .get_all()
            .into_iter()
            .filter(|(token, record)| {
                member.matches(token) && record.kind() != RecordKind::Suite
            })
            .map(|(_, record)| record)
            .collect();

        if fragments.is_empty() {
            return Ok(None);
        }

        let mut merger = FragmentMerger::new(&member.name, self.policy);
        let kind = resolve_kind(&fragments, &mut merger);

        let mut merged = MetadataRecord::new(kind, member.name.clone());
        for fragment in &fragments {
            merger.merge_options(&mut merged.options, &fragment.options);
        }
        merger.finish()?;

        tracing::debug!(
            member = %member.name,
            fragments = fragments.len(),
            api = merged.is_api_eligible(),
            "resolved member"
        );

        Ok(Some(merged))
    }

    /// 解析套件自身的记录
    pub fn resolve_suite(&self, owner: SuiteType) -> Result<Option<MetadataRecord>, ConfigurationError> {
        let fragments: Vec<MetadataRecord> = self
            .registry
            .get_all()
            .into_iter()
            .filter(|(token, _)| *token == IdentityToken::Suite(owner))
            .map(|(_, record)| record)
            .collect();

        let Some(first) = fragments.first() else {
            return Ok(None);
        };

        let name = owner.short_name();
        let mut merger = FragmentMerger::new(name, self.policy);
        let mut merged = MetadataRecord::new(RecordKind::Suite, first.name.clone());
        for fragment in &fragments {
            merger.merge_options(&mut merged.options, &fragment.options);
        }
        merger.finish()?;

        Ok(Some(merged))
    }
}

/// 合并后的种类：任一片段是钩子则为钩子（最后出现的阶段生效），否则是测试
fn resolve_kind(fragments: &[MetadataRecord], merger: &mut FragmentMerger<'_>) -> RecordKind {
    let mut kind = RecordKind::Test;
    for fragment in fragments {
        if let RecordKind::Hook(phase) = fragment.kind() {
            if matches!(kind, RecordKind::Hook(current) if current != phase) {
                merger.conflict("kind");
            }
            kind = RecordKind::Hook(phase);
        }
    }
    kind
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_spec::ApiSpec;
    use crate::registry::HookPhase;

    struct UsersApi;
    struct OrdersApi;

    fn test_record(name: &str, api: ApiSpec) -> MetadataRecord {
        let mut record = MetadataRecord::new(RecordKind::Test, name);
        record.options.api = Some(api);
        record
    }

    #[test]
    fn test_no_record() {
        let registry = MetadataRegistry::new();
        let resolver = SpecResolver::new(&registry);
        assert_eq!(resolver.resolve(&MemberRef::of::<UsersApi>("missing")).unwrap(), None);
    }

    #[test]
    fn test_merge_across_tokens() {
        let registry = MetadataRegistry::new();
        registry.store(
            IdentityToken::function("get_user", 1),
            test_record("get_user", ApiSpec::new("GET", "/users/{id}")),
        );
        registry.store(
            IdentityToken::slot::<UsersApi>("get_user"),
            test_record("get_user", ApiSpec::default().with_path_param("id", 1)),
        );
        registry.store(
            IdentityToken::key("get_user"),
            test_record("get_user", ApiSpec::default().expect_status(200)),
        );

        let resolved = SpecResolver::new(&registry)
            .resolve(&MemberRef::of::<UsersApi>("get_user"))
            .unwrap()
            .unwrap();

        assert!(resolved.is_api_eligible());
        let api = resolved.options.api.unwrap();
        assert_eq!(api.path.as_deref(), Some("/users/{id}"));
        assert_eq!(api.path_params.len(), 1);
        assert_eq!(api.expectations.unwrap().status, Some(200));
    }

    #[test]
    fn test_slot_of_other_suite_is_ignored() {
        let registry = MetadataRegistry::new();
        registry.store(
            IdentityToken::slot::<OrdersApi>("list"),
            test_record("list", ApiSpec::new("GET", "/orders")),
        );
        registry.store(
            IdentityToken::slot::<UsersApi>("list"),
            test_record("list", ApiSpec::new("GET", "/users")),
        );

        let resolved = SpecResolver::new(&registry)
            .resolve(&MemberRef::of::<UsersApi>("list"))
            .unwrap()
            .unwrap();
        assert_eq!(resolved.options.api.unwrap().path.as_deref(), Some("/users"));
    }

    #[test]
    fn test_later_fragment_wins() {
        let registry = MetadataRegistry::new();
        registry.store(
            IdentityToken::function("get_user", 1),
            test_record("get_user", ApiSpec::default().expect_status(200)),
        );
        registry.store(
            IdentityToken::function("get_user", 2),
            test_record("get_user", ApiSpec::default().expect_status(404)),
        );

        let member = MemberRef::of::<UsersApi>("get_user");
        let resolver = SpecResolver::new(&registry);
        let first = resolver.resolve(&member).unwrap().unwrap();
        let again = resolver.resolve(&member).unwrap().unwrap();

        assert_eq!(first.options.api.as_ref().unwrap().expectations.as_ref().unwrap().status, Some(404));
        assert_eq!(first, again);
    }

    #[test]
    fn test_fail_fast_policy() {
        let registry = MetadataRegistry::new();
        registry.store(
            IdentityToken::function("get_user", 1),
            test_record("get_user", ApiSpec::default().expect_status(200)),
        );
        registry.store(
            IdentityToken::key("get_user"),
            test_record("get_user", ApiSpec::default().expect_status(404)),
        );

        let result = SpecResolver::new(&registry)
            .with_policy(ConflictPolicy::FailFast)
            .resolve(&MemberRef::of::<UsersApi>("get_user"));

        assert_eq!(
            result,
            Err(ConfigurationError::ConflictingFragments {
                member: "get_user".to_string(),
                field: "expectations.status".to_string(),
            })
        );
    }

    #[test]
    fn test_hook_kind_wins_over_test() {
        let registry = MetadataRegistry::new();
        registry.store(
            IdentityToken::key("login"),
            test_record("login", ApiSpec::new("POST", "/login")),
        );
        registry.store(
            IdentityToken::slot::<UsersApi>("login"),
            MetadataRecord::new(RecordKind::Hook(HookPhase::BeforeEach), "login"),
        );

        let resolved = SpecResolver::new(&registry)
            .resolve(&MemberRef::of::<UsersApi>("login"))
            .unwrap()
            .unwrap();
        assert_eq!(resolved.kind(), RecordKind::Hook(HookPhase::BeforeEach));
        assert!(resolved.is_api_eligible());
    }

    #[test]
    fn test_suite_records_are_separate() {
        let registry = MetadataRegistry::new();
        let mut suite = MetadataRecord::new(RecordKind::Suite, "Users API");
        suite.options.modifiers.tags.push("users".to_string());
        registry.store(IdentityToken::suite::<UsersApi>(), suite);

        let resolver = SpecResolver::new(&registry);
        let resolved = resolver.resolve_suite(SuiteType::of::<UsersApi>()).unwrap().unwrap();
        assert_eq!(resolved.name, "Users API");
        assert_eq!(resolved.options.modifiers.tags, vec!["users"]);
        assert_eq!(resolver.resolve_suite(SuiteType::of::<OrdersApi>()).unwrap(), None);
    }
}
