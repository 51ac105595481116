use std::fmt::Debug;

use serde_json::{Map, Value};

use crate::api_spec::{ApiSpec, Expectations, upsert};
use crate::error::ConfigurationError;
use crate::registry::{ExecutionModifiers, SpecificationOptions};

use super::ConflictPolicy;

/// 字段级合并器
///
/// 按注册表插入顺序依次合入片段：后来的片段覆盖同名字段，
/// 后来片段缺失的字段保留之前的值。布尔修饰符取逻辑或，标签取并集。
pub(crate) struct FragmentMerger<'a> {
    member: &'a str,
    policy: ConflictPolicy,
    conflicts: Vec<String>,
}

impl<'a> FragmentMerger<'a> {
    pub fn new(member: &'a str, policy: ConflictPolicy) -> Self {
        Self {
            member,
            policy,
            conflicts: Vec::new(),
        }
    }

    /// 记录一次字段冲突（两个片段对同一字段给出不同的值）
    pub fn conflict(&mut self, field: impl Into<String>) {
        let field = field.into();
        tracing::debug!(
            member = self.member,
            field = %field,
            "conflicting fragments, later registration wins"
        );
        self.conflicts.push(field);
    }

    /// 合并结束：fail-fast 策略下有冲突即报错
    pub fn finish(self) -> Result<(), ConfigurationError> {
        match (self.policy, self.conflicts.first()) {
            (ConflictPolicy::FailFast, Some(field)) => {
                Err(ConfigurationError::ConflictingFragments {
                    member: self.member.to_string(),
                    field: field.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    fn scalar<T: PartialEq + Clone + Debug>(
        &mut self,
        field: &str,
        target: &mut Option<T>,
        later: &Option<T>,
    ) {
        if let Some(value) = later {
            if target.as_ref().is_some_and(|current| current != value) {
                self.conflict(field);
            }
            *target = Some(value.clone());
        }
    }

    fn map(&mut self, field: &str, target: &mut Map<String, Value>, later: &Map<String, Value>) {
        for (key, value) in later {
            if target.get(key).is_some_and(|current| current != value) {
                self.conflict(format!("{}.{}", field, key));
            }
            target.insert(key.clone(), value.clone());
        }
    }

    fn entries<V: PartialEq + Clone>(
        &mut self,
        field: &str,
        target: &mut Vec<(String, V)>,
        later: &[(String, V)],
    ) {
        for (key, value) in later {
            if target.iter().any(|(k, v)| k == key && v != value) {
                self.conflict(format!("{}.{}", field, key));
            }
            upsert(target, key.clone(), value.clone());
        }
    }

    pub fn merge_options(&mut self, target: &mut SpecificationOptions, later: &SpecificationOptions) {
        self.merge_modifiers(&mut target.modifiers, &later.modifiers);

        if let Some(api) = &later.api {
            self.merge_api(target.api_mut(), api);
        }

        self.scalar("instance_mode", &mut target.instance_mode, &later.instance_mode);

        for (key, value) in &later.extra {
            if target.extra.get(key).is_some_and(|current| current != value) {
                self.conflict(key.clone());
            }
            target.extra.insert(key.clone(), value.clone());
        }
    }

    pub fn merge_modifiers(&mut self, target: &mut ExecutionModifiers, later: &ExecutionModifiers) {
        target.only |= later.only;
        target.skip |= later.skip;
        target.slow |= later.slow;

        for tag in &later.tags {
            if !target.has_tag(tag) {
                target.tags.push(tag.clone());
            }
        }

        self.scalar("name", &mut target.name, &later.name);
    }

    pub fn merge_api(&mut self, target: &mut ApiSpec, later: &ApiSpec) {
        self.scalar("method", &mut target.method, &later.method);
        self.scalar("path", &mut target.path, &later.path);
        self.map("path_params", &mut target.path_params, &later.path_params);
        self.map("query_params", &mut target.query_params, &later.query_params);
        self.entries("headers", &mut target.headers, &later.headers);
        self.scalar("body", &mut target.body, &later.body);

        if let Some(expectations) = &later.expectations {
            let current = target.expectations.get_or_insert_with(Expectations::default);
            self.merge_expectations(current, expectations);
        }
    }

    fn merge_expectations(&mut self, target: &mut Expectations, later: &Expectations) {
        self.scalar("expectations.status", &mut target.status, &later.status);
        self.entries("expectations.body", &mut target.body, &later.body);
        self.scalar("expectations.schema", &mut target.schema, &later.schema);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_spec::Assertion;
    use serde_json::json;

    #[test]
    fn test_later_status_wins() {
        let mut target = ApiSpec::default().expect_status(200);
        let later = ApiSpec::default().expect_status(404);

        let mut merger = FragmentMerger::new("get_user", ConflictPolicy::LastWins);
        merger.merge_api(&mut target, &later);
        assert!(merger.finish().is_ok());

        assert_eq!(target.expectations.unwrap().status, Some(404));
    }

    #[test]
    fn test_absent_fields_are_kept() {
        let mut target = ApiSpec::new("GET", "/users/{id}")
            .with_path_param("id", 1)
            .expect_status(200);
        let later = ApiSpec::default()
            .with_header("Accept", "application/json")
            .expect_body("id", Assertion::defined());

        let mut merger = FragmentMerger::new("get_user", ConflictPolicy::FailFast);
        merger.merge_api(&mut target, &later);
        assert!(merger.finish().is_ok());

        assert_eq!(target.method.as_deref(), Some("GET"));
        assert_eq!(target.path_params.get("id"), Some(&json!(1)));
        assert_eq!(target.headers.len(), 1);
        let expectations = target.expectations.unwrap();
        assert_eq!(expectations.status, Some(200));
        assert_eq!(expectations.body.len(), 1);
    }

    #[test]
    fn test_fail_fast_reports_first_conflict() {
        let mut target = ApiSpec::new("GET", "/a");
        let later = ApiSpec::new("POST", "/a");

        let mut merger = FragmentMerger::new("create", ConflictPolicy::FailFast);
        merger.merge_api(&mut target, &later);

        assert_eq!(
            merger.finish(),
            Err(ConfigurationError::ConflictingFragments {
                member: "create".to_string(),
                field: "method".to_string(),
            })
        );
    }

    #[test]
    fn test_equal_values_do_not_conflict() {
        let mut target = ApiSpec::new("GET", "/a").with_query("page", 1);
        let later = ApiSpec::new("GET", "/a").with_query("page", 1);

        let mut merger = FragmentMerger::new("list", ConflictPolicy::FailFast);
        merger.merge_api(&mut target, &later);
        assert!(merger.finish().is_ok());
    }

    #[test]
    fn test_modifiers_or_and_union() {
        let mut target = ExecutionModifiers {
            only: true,
            tags: vec!["users".to_string()],
            ..Default::default()
        };
        let later = ExecutionModifiers {
            slow: true,
            tags: vec!["smoke".to_string(), "users".to_string()],
            ..Default::default()
        };

        let mut merger = FragmentMerger::new("get_user", ConflictPolicy::LastWins);
        merger.merge_modifiers(&mut target, &later);

        assert!(target.only);
        assert!(target.slow);
        assert!(!target.skip);
        assert_eq!(target.tags, vec!["users", "smoke"]);
    }
}
