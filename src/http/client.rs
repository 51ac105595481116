use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::api_spec::Headers;
use crate::config::DectestConfig;
use crate::error::TransportError;
use crate::http::response::ApiResponse;
use crate::http::transport::{RequestOptions, Transport};
use crate::http::types::{Method, normalize_base_url};

/// 基于 reqwest 的传输层实现
#[derive(Clone)]
pub struct HttpTransport {
    inner: reqwest::Client,
    base_url: Option<url::Url>,
    default_headers: Headers,
}

impl HttpTransport {
    /// 默认超时时间
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        Ok(Self {
            inner: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: None,
            default_headers: Headers::new(),
        })
    }

    /// 按配置文件构建：超时、base URL、默认请求头
    pub fn from_config(config: &DectestConfig) -> Result<Self, TransportError> {
        let mut transport = Self::with_timeout(Duration::from_secs(config.timeout_secs))?;
        if let Some(base_url) = &config.base_url {
            transport = transport.with_base_url(base_url)?;
        }
        for (name, value) in &config.headers {
            transport = transport.with_default_header(name, value);
        }
        Ok(transport)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, TransportError> {
        self.base_url = Some(normalize_base_url(base_url)?);
        Ok(self)
    }

    pub fn with_default_header(mut self, name: &str, value: &str) -> Self {
        self.default_headers.push((name.to_string(), value.to_string()));
        self
    }

    /// 相对路径拼接到 base URL 之后；绝对 URL 原样使用
    pub fn full_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        match &self.base_url {
            Some(base) => {
                let base = base.as_str().trim_end_matches('/');
                if url.starts_with('/') {
                    format!("{}{}", base, url)
                } else {
                    format!("{}/{}", base, url)
                }
            }
            None => url.to_string(),
        }
    }

    /// 默认请求头只在请求自身没有同名头时生效
    fn build_headers(&self, options: &RequestOptions) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();

        let defaults = self
            .default_headers
            .iter()
            .filter(|(name, _)| options.header(name).is_none());

        for (name, value) in defaults.chain(options.headers.iter()) {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| TransportError::InvalidHeader(name.clone()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| TransportError::InvalidHeader(name.clone()))?;
            headers.append(header_name, header_value);
        }

        Ok(headers)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse, TransportError> {
        let full_url = self.full_url(url);
        let headers = self.build_headers(&options)?;

        let mut req = self
            .inner
            .request(method.to_reqwest(), &full_url)
            .headers(headers);
        if let Some(data) = options.data {
            req = req.body(data);
        }

        tracing::debug!(method = %method, url = %full_url, "sending request");

        let start = Instant::now();
        let response = req.send().await.map_err(|source| TransportError::Request {
            url: full_url.clone(),
            source,
        })?;
        let duration = start.elapsed();

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|source| TransportError::Request {
                url: full_url.clone(),
                source,
            })?;

        ApiResponse::new(status, headers, body, duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_url_with_base() {
        let transport = HttpTransport::new()
            .unwrap()
            .with_base_url("localhost:3000/api")
            .unwrap();
        assert_eq!(
            transport.full_url("/users/1?x=1"),
            "http://localhost:3000/api/users/1?x=1"
        );
        assert_eq!(transport.full_url("users"), "http://localhost:3000/api/users");
        assert_eq!(
            transport.full_url("https://other.example.com/a"),
            "https://other.example.com/a"
        );
    }

    #[test]
    fn test_full_url_without_base() {
        let transport = HttpTransport::new().unwrap();
        assert_eq!(transport.full_url("/users"), "/users");
    }

    #[test]
    fn test_default_headers_yield_to_request_headers() {
        let transport = HttpTransport::new()
            .unwrap()
            .with_default_header("Authorization", "Bearer default")
            .with_default_header("X-Client", "dectest");
        let options = RequestOptions {
            headers: vec![("authorization".to_string(), "Bearer mine".to_string())],
            data: None,
        };

        let headers = transport.build_headers(&options).unwrap();
        assert_eq!(headers.get_all("authorization").iter().count(), 1);
        assert_eq!(headers.get("authorization").unwrap(), "Bearer mine");
        assert_eq!(headers.get("x-client").unwrap(), "dectest");
    }

    #[test]
    fn test_invalid_header_name() {
        let transport = HttpTransport::new().unwrap();
        let options = RequestOptions {
            headers: vec![("bad header".to_string(), "v".to_string())],
            data: None,
        };
        assert!(matches!(
            transport.build_headers(&options),
            Err(TransportError::InvalidHeader(_))
        ));
    }
}
