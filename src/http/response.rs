use std::time::Duration;

use reqwest::header::HeaderMap as Headers;
use serde_json::Value;

use crate::error::TransportError;
use crate::http::types::Status;

/// 传输层返回的响应
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: Status,
    pub headers: Headers,
    pub body: String,
    pub duration: Duration,
}

impl ApiResponse {
    pub fn new(
        status: u16,
        headers: Headers,
        body: String,
        duration: Duration,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            status: Status::new(status)?,
            headers,
            body,
            duration,
        })
    }

    /// 构造 JSON 响应，主要给桩传输使用
    pub fn from_json(status: u16, body: &Value) -> Result<Self, TransportError> {
        let mut headers = Headers::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        Self::new(status, headers, body.to_string(), Duration::ZERO)
    }

    /// 构造空响应体的响应
    pub fn empty(status: u16) -> Result<Self, TransportError> {
        Self::new(status, Headers::new(), String::new(), Duration::ZERO)
    }

    pub fn status(&self) -> u16 {
        self.status.code()
    }

    /// 把响应体解析为 JSON
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_response() {
        let response = ApiResponse::from_json(200, &json!({"id": 1})).unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.json().unwrap(), json!({"id": 1}));
        assert_eq!(response.header("content-type"), Some("application/json"));
    }

    #[test]
    fn test_empty_body_is_not_json() {
        let response = ApiResponse::empty(204).unwrap();
        assert!(response.json().is_err());
        assert_eq!(response.text(), "");
    }

    #[test]
    fn test_invalid_status() {
        assert!(ApiResponse::empty(42).is_err());
    }
}
