use serde_json::Value;

/// 按点号路径从 JSON 中取值
///
/// 每一段依次做对象取键或数组取下标；任何中间值缺失或为 null 时
/// 直接返回 `None`（即 undefined），从不报错。空路径返回根本身。
pub fn extract_path<'v>(root: Option<&'v Value>, path: &str) -> Option<&'v Value> {
    let mut current = root?;
    if path.is_empty() {
        return Some(current);
    }

    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// 描述值，用于失败信息
pub fn describe(value: Option<&Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "undefined".to_string(),
    }
}
