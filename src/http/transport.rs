use async_trait::async_trait;

use crate::api_spec::Headers;
use crate::error::TransportError;
use crate::http::response::ApiResponse;
use crate::http::types::Method;

/// 传给传输层的请求选项
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub headers: Headers,
    /// 已经编码好的请求体
    pub data: Option<String>,
}

impl RequestOptions {
    /// 大小写不敏感地查找请求头
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// HTTP 传输层
///
/// 每个动词一个方法；实现者只需提供 `send`，动词方法默认转发给它。
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse, TransportError>;

    async fn get(&self, url: &str, options: RequestOptions) -> Result<ApiResponse, TransportError> {
        self.send(Method::Get, url, options).await
    }

    async fn post(&self, url: &str, options: RequestOptions) -> Result<ApiResponse, TransportError> {
        self.send(Method::Post, url, options).await
    }

    async fn put(&self, url: &str, options: RequestOptions) -> Result<ApiResponse, TransportError> {
        self.send(Method::Put, url, options).await
    }

    async fn delete(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse, TransportError> {
        self.send(Method::Delete, url, options).await
    }

    async fn patch(&self, url: &str, options: RequestOptions) -> Result<ApiResponse, TransportError> {
        self.send(Method::Patch, url, options).await
    }

    async fn head(&self, url: &str, options: RequestOptions) -> Result<ApiResponse, TransportError> {
        self.send(Method::Head, url, options).await
    }
}
