use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigurationError;

/// 请求头列表，保持声明顺序
pub type Headers = Vec<(String, String)>;

/// 请求体
///
/// 字符串原样发送（编码由调用方负责），结构化数据序列化为 JSON。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestBody {
    Text(String),
    Json(Value),
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => RequestBody::Text(s),
            other => RequestBody::Json(other),
        }
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

/// 断言种类（固定集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertionKind {
    Defined,
    Equals,
    Contains,
}

impl AssertionKind {
    /// 从字符串解析断言种类，集合之外的种类是配置错误
    pub fn parse(s: &str) -> Result<Self, ConfigurationError> {
        match s.to_ascii_lowercase().as_str() {
            "defined" => Ok(Self::Defined),
            "equals" => Ok(Self::Equals),
            "contains" => Ok(Self::Contains),
            _ => Err(ConfigurationError::UnsupportedAssertion(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Defined => "Defined",
            Self::Equals => "Equals",
            Self::Contains => "Contains",
        }
    }
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 响应体断言
///
/// `kind` 以字符串保存：片段可能来自外部数据，未知种类要等到求值时才报错。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Assertion {
    pub fn defined() -> Self {
        Self {
            kind: AssertionKind::Defined.as_str().to_string(),
            value: None,
        }
    }

    pub fn equals(value: impl Into<Value>) -> Self {
        Self {
            kind: AssertionKind::Equals.as_str().to_string(),
            value: Some(value.into()),
        }
    }

    pub fn contains(value: impl Into<Value>) -> Self {
        Self {
            kind: AssertionKind::Contains.as_str().to_string(),
            value: Some(value.into()),
        }
    }

    /// 任意种类，用于承载外部输入
    pub fn raw(kind: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            kind: kind.into(),
            value,
        }
    }

    pub fn parsed_kind(&self) -> Result<AssertionKind, ConfigurationError> {
        AssertionKind::parse(&self.kind)
    }
}

/// 响应期望
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Expectations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// 点号路径 -> 断言，保持声明顺序
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<(String, Assertion)>,

    /// 结构校验预留位：会被接受并合并，但执行时不做任何校验
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl Expectations {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.body.is_empty() && self.schema.is_none()
    }
}

/// API 测试规格
///
/// 每个字段都是可选的：单个注解只写入自己的那一片，
/// 由解析器合并成完整规格。`method` 与 `path` 都存在时才算完整。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub path_params: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub query_params: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Headers,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expectations: Option<Expectations>,
}

impl ApiSpec {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: Some(method.into()),
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// method 与 path 是否都已填充
    pub fn is_complete(&self) -> bool {
        self.method.is_some() && self.path.is_some()
    }

    /// 列出缺失的必需字段
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.method.is_none() {
            missing.push("method");
        }
        if self.path.is_none() {
            missing.push("path");
        }
        missing
    }

    pub fn with_path_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.path_params.insert(key.to_string(), value.into());
        self
    }

    pub fn with_query(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.query_params.insert(key.to_string(), value.into());
        self
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        upsert(&mut self.headers, key.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn expect_status(mut self, status: u16) -> Self {
        self.expectations.get_or_insert_with(Default::default).status = Some(status);
        self
    }

    pub fn expect_body(mut self, path: &str, assertion: Assertion) -> Self {
        let expectations = self.expectations.get_or_insert_with(Default::default);
        upsert(&mut expectations.body, path.to_string(), assertion);
        self
    }

    pub fn expect_schema(mut self, schema: Value) -> Self {
        self.expectations.get_or_insert_with(Default::default).schema = Some(schema);
        self
    }
}

/// 有序键值列表的插入或替换：同名键原位替换，新键追加到末尾
pub(crate) fn upsert<V>(entries: &mut Vec<(String, V)>, key: String, value: V) {
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some(entry) => entry.1 = value,
        None => entries.push((key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assertion_kind_parse() {
        assert_eq!(AssertionKind::parse("Defined"), Ok(AssertionKind::Defined));
        assert_eq!(AssertionKind::parse("equals"), Ok(AssertionKind::Equals));
        assert_eq!(AssertionKind::parse("CONTAINS"), Ok(AssertionKind::Contains));
        assert_eq!(
            AssertionKind::parse("Matches"),
            Err(ConfigurationError::UnsupportedAssertion("Matches".to_string()))
        );
    }

    #[test]
    fn test_spec_completeness() {
        let mut spec = ApiSpec::default();
        assert!(!spec.is_complete());
        assert_eq!(spec.missing_fields(), vec!["method", "path"]);

        spec.method = Some("GET".to_string());
        assert_eq!(spec.missing_fields(), vec!["path"]);

        spec.path = Some("/users".to_string());
        assert!(spec.is_complete());
    }

    #[test]
    fn test_body_from_value() {
        assert_eq!(
            RequestBody::from(json!("raw")),
            RequestBody::Text("raw".to_string())
        );
        assert_eq!(
            RequestBody::from(json!({"a": 1})),
            RequestBody::Json(json!({"a": 1}))
        );
    }

    #[test]
    fn test_spec_deserialize_fragment() {
        let spec: ApiSpec = serde_json::from_value(json!({
            "path": "/users/{id}",
            "path_params": {"id": 1},
            "expectations": {"status": 200, "body": [["id", {"kind": "Equals", "value": 1}]]}
        }))
        .unwrap();

        assert_eq!(spec.method, None);
        assert_eq!(spec.path.as_deref(), Some("/users/{id}"));
        let expectations = spec.expectations.unwrap();
        assert_eq!(expectations.status, Some(200));
        assert_eq!(expectations.body[0].1, Assertion::equals(1));
    }

    #[test]
    fn test_upsert_keeps_position() {
        let mut entries = vec![("a".to_string(), 1), ("b".to_string(), 2)];
        upsert(&mut entries, "a".to_string(), 3);
        upsert(&mut entries, "c".to_string(), 4);
        assert_eq!(
            entries,
            vec![
                ("a".to_string(), 3),
                ("b".to_string(), 2),
                ("c".to_string(), 4)
            ]
        );
    }
}
