use serde_json::{Number, Value};

use crate::api_spec::{Assertion, AssertionKind, Expectations};
use crate::error::{AssertionFailure, ConfigurationError, DectestError};
use crate::http::ApiResponse;

use super::extractor::{describe, extract_path};
use super::request::stringify;

/// 对响应求值所有期望
///
/// 先检查状态码，再按声明顺序检查响应体断言，遇到第一个失败即返回。
pub fn evaluate_expectations(
    expectations: &Expectations,
    response: &ApiResponse,
) -> Result<(), DectestError> {
    if let Some(expected) = expectations.status
        && response.status() != expected
    {
        return Err(AssertionFailure::new(
            "status",
            expected.to_string(),
            response.status().to_string(),
        )
        .into());
    }

    if !expectations.body.is_empty() {
        // 非 JSON 响应体视为 undefined
        let parsed = response.json().ok();
        for (path, assertion) in &expectations.body {
            let actual = extract_path(parsed.as_ref(), path);
            evaluate_assertion(path, assertion, actual)?;
        }
    }

    if expectations.schema.is_some() {
        tracing::debug!("schema expectation recorded but not enforced");
    }

    Ok(())
}

/// 求值单个断言
pub fn evaluate_assertion(
    path: &str,
    assertion: &Assertion,
    actual: Option<&Value>,
) -> Result<(), DectestError> {
    let kind = assertion.parsed_kind()?;
    let subject = format!("body.{}", path);

    let passed = match kind {
        AssertionKind::Defined => actual.is_some(),
        AssertionKind::Equals => {
            let expected = expected_value(assertion)?;
            actual.is_some_and(|value| values_equal(value, expected))
        }
        AssertionKind::Contains => {
            let expected = expected_value(assertion)?;
            actual.is_some_and(|value| contains(value, expected))
        }
    };

    if passed {
        return Ok(());
    }

    let expected = match kind {
        AssertionKind::Defined => "defined".to_string(),
        AssertionKind::Equals => describe(assertion.value.as_ref()),
        AssertionKind::Contains => format!("包含 {}", describe(assertion.value.as_ref())),
    };
    Err(AssertionFailure::new(subject, expected, describe(actual)).into())
}

fn expected_value(assertion: &Assertion) -> Result<&Value, ConfigurationError> {
    assertion.value.as_ref().ok_or_else(|| ConfigurationError::IncompleteSpec {
        missing: format!("value for {} assertion", assertion.kind),
    })
}

/// 深度相等；数字按数值比较，1 与 1.0 相等
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => left == right,
    }
}

/// 两边都是整数时精确比较，只有出现浮点数才按 f64 比较
fn numbers_equal(a: &Number, b: &Number) -> bool {
    if a.is_f64() || b.is_f64() {
        return match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        };
    }
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x == y,
        // 超出 i64 的只能是 u64，负数与之不等
        _ => a.as_u64().is_some() && a.as_u64() == b.as_u64(),
    }
}

/// 字符串看子串，数组看元素，对象看键
fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::String(s) => s.contains(&stringify(needle)),
        Value::Array(items) => items.iter().any(|item| values_equal(item, needle)),
        Value::Object(map) => needle.as_str().is_some_and(|key| map.contains_key(key)),
        _ => false,
    }
}
