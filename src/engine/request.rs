use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::api_spec::{ApiSpec, AssertionKind, Headers, RequestBody};
use crate::error::ConfigurationError;
use crate::http::{Method, RequestOptions};

/// 组装完成、可以直接交给传输层的请求
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    /// 路径替换并追加查询串后的 URL
    pub url: String,
    pub options: RequestOptions,
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER_REGEX.get_or_init(|| {
        Regex::new(r"\{([^{}]+)\}").expect("placeholder pattern is valid")
    })
}

/// 参数值转成字符串：字符串不加引号，其余按 JSON 文本
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 把路径模板中所有 `{key}` 替换为参数值
///
/// 花括号内除花括号外的任意字符都可作为键。同一个占位符出现多次时
/// 全部替换；没有对应参数的占位符原样保留。
pub fn substitute_path(path: &str, params: &Map<String, Value>) -> String {
    placeholder_regex()
        .replace_all(path, |caps: &Captures| match params.get(&caps[1]) {
            Some(value) => stringify(value),
            None => caps[0].to_string(),
        })
        .to_string()
}

/// 列出路径中剩余的占位符名
pub fn unmatched_placeholders(path: &str) -> Vec<String> {
    placeholder_regex()
        .captures_iter(path)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// 构建查询串（不含 `?`）
///
/// 数组值按元素顺序重复同一个键；空参数返回空串。
pub fn build_query(params: &Map<String, Value>) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        match value {
            Value::Array(items) => {
                for item in items {
                    serializer.append_pair(key, &stringify(item));
                }
            }
            other => {
                serializer.append_pair(key, &stringify(other));
            }
        }
    }
    serializer.finish()
}

/// 大小写不敏感地判断是否已设置 Content-Type
pub fn has_content_type(headers: &Headers) -> bool {
    headers
        .iter()
        .any(|(name, _)| name.eq_ignore_ascii_case("content-type"))
}

/// 组装请求体
///
/// 字符串原样发送；结构化数据序列化为 JSON，并在调用方没有设置
/// Content-Type 时补上 `application/json`。
pub fn assemble_body(
    body: Option<&RequestBody>,
    headers: &mut Headers,
) -> Result<Option<String>, ConfigurationError> {
    match body {
        None => Ok(None),
        Some(RequestBody::Text(text)) => Ok(Some(text.clone())),
        Some(RequestBody::Json(value)) => {
            let json = serde_json::to_string(value)
                .map_err(|e| ConfigurationError::BodySerialization(e.to_string()))?;
            if !has_content_type(headers) {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
            }
            Ok(Some(json))
        }
    }
}

/// 检查所有断言种类都在支持的集合内
fn validate_assertions(spec: &ApiSpec) -> Result<(), ConfigurationError> {
    if let Some(expectations) = &spec.expectations {
        for (_, assertion) in &expectations.body {
            AssertionKind::parse(&assertion.kind)?;
        }
    }
    Ok(())
}

/// 把完整的规格组装成请求
///
/// 任何配置错误都在发出请求之前返回。
pub fn prepare(spec: &ApiSpec) -> Result<PreparedRequest, ConfigurationError> {
    let (Some(method), Some(path)) = (spec.method.as_deref(), spec.path.as_deref()) else {
        return Err(ConfigurationError::IncompleteSpec {
            missing: spec.missing_fields().join(", "),
        });
    };

    let method = Method::parse(method)?;
    validate_assertions(spec)?;

    let mut url = substitute_path(path, &spec.path_params);
    let unmatched = unmatched_placeholders(&url);
    if !unmatched.is_empty() {
        tracing::warn!(path = %path, placeholders = ?unmatched, "path placeholders left unsubstituted");
    }

    let query = build_query(&spec.query_params);
    if !query.is_empty() {
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&query);
    }

    let mut headers = spec.headers.clone();
    let data = assemble_body(spec.body.as_ref(), &mut headers)?;

    Ok(PreparedRequest {
        method,
        url,
        options: RequestOptions { headers, data },
    })
}
