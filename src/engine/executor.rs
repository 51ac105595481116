use crate::api_spec::ApiSpec;
use crate::error::{DectestError, Result};
use crate::http::{ApiResponse, Method, Transport};

use super::evaluator::evaluate_expectations;
use super::request::{PreparedRequest, prepare};

/// 执行一个 API 规格：组装请求、发送、求值期望
///
/// 配置错误（不支持的方法、不支持的断言种类、不完整的规格）
/// 在调用传输层之前返回。
pub async fn execute(spec: &ApiSpec, transport: &dyn Transport) -> Result<ApiResponse> {
    let prepared = prepare(spec)?;
    let response = dispatch(&prepared, transport).await?;

    if let Some(expectations) = &spec.expectations {
        evaluate_expectations(expectations, &response)?;
    }

    Ok(response)
}

/// 按方法路由到传输层对应的动词
pub async fn dispatch(prepared: &PreparedRequest, transport: &dyn Transport) -> Result<ApiResponse> {
    let url = prepared.url.as_str();
    let options = prepared.options.clone();

    tracing::debug!(method = %prepared.method, url = %url, "dispatching request");

    let result = match prepared.method {
        Method::Get => transport.get(url, options).await,
        Method::Post => transport.post(url, options).await,
        Method::Put => transport.put(url, options).await,
        Method::Delete => transport.delete(url, options).await,
        Method::Patch => transport.patch(url, options).await,
        Method::Head => transport.head(url, options).await,
    };

    result.map_err(|e| DectestError::transport(format!("{} {}", prepared.method, url), e))
}
