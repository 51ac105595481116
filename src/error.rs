use thiserror::Error;

/// 配置错误：规格本身有问题，只影响当前测试
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("不支持的 HTTP 方法: {0}")]
    UnsupportedMethod(String),

    #[error("不支持的断言类型: {0}")]
    UnsupportedAssertion(String),

    #[error("API 规格不完整: 缺少 {missing}")]
    IncompleteSpec { missing: String },

    #[error("成员 '{member}' 的片段在字段 '{field}' 上冲突")]
    ConflictingFragments { member: String, field: String },

    #[error("无效的请求头 '{name}'")]
    InvalidHeader { name: String },

    #[error("请求体序列化失败: {0}")]
    BodySerialization(String),
}

/// 传输层错误
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),

    /// 请求已发出但失败，带上实际请求的完整 URL
    #[error("请求 {url} 失败: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("无效的 URL: {0}")]
    InvalidUrl(String),

    #[error("无效的请求头: {0}")]
    InvalidHeader(String),

    #[error("{0}")]
    Other(String),
}

/// 断言失败：携带期望值与实际值
#[derive(Error, Debug, Clone, PartialEq)]
#[error("断言失败 {subject}: 期望 {expected}, 实际 {actual}")]
pub struct AssertionFailure {
    /// 断言对象，如 `status` 或 `body.user.id`
    pub subject: String,
    pub expected: String,
    pub actual: String,
}

impl AssertionFailure {
    pub fn new(
        subject: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum DectestError {
    #[error("配置错误: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("传输错误 ({url}): {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("{0}")]
    Assertion(#[from] AssertionFailure),

    #[error("配置文件错误: {0}")]
    Config(String),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON 解析错误: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML 解析错误: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

impl DectestError {
    pub fn transport(url: impl Into<String>, source: TransportError) -> Self {
        DectestError::Transport {
            url: url.into(),
            source,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, DectestError::Configuration(_))
    }

    pub fn is_assertion(&self) -> bool {
        matches!(self, DectestError::Assertion(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, DectestError::Transport { .. })
    }
}

impl From<anyhow::Error> for DectestError {
    fn from(err: anyhow::Error) -> Self {
        DectestError::Other(err.to_string())
    }
}

/// Result type for dectest crate
pub type Result<T> = std::result::Result<T, DectestError>;
