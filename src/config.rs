use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::Deserialize;

use crate::error::{DectestError, Result};
use crate::registry::InstanceMode;
use crate::resolver::ConflictPolicy;

/// 运行配置（dectest.toml）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DectestConfig {
    /// 相对请求路径的前缀
    pub base_url: Option<String>,

    /// HttpTransport 的超时时间（秒）
    pub timeout_secs: u64,

    /// 套件未显式声明时使用的实例模式
    pub instance_mode: InstanceMode,

    /// 片段字段冲突的处理方式
    pub conflict_policy: ConflictPolicy,

    /// 每个请求默认携带的请求头
    pub headers: BTreeMap<String, String>,

    /// 按环境覆盖
    pub environments: HashMap<String, Environment>,
}

impl Default for DectestConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
            instance_mode: InstanceMode::default(),
            conflict_policy: ConflictPolicy::default(),
            headers: BTreeMap::new(),
            environments: HashMap::new(),
        }
    }
}

/// 环境配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Environment {
    pub base_url: Option<String>,
    pub headers: BTreeMap<String, String>,
}

impl DectestConfig {
    /// 应用某个环境的覆盖项，并解析 ${VAR}
    pub fn for_environment(&self, name: Option<&str>) -> Result<Self> {
        let mut config = self.clone();

        if let Some(name) = name {
            let env = self
                .environments
                .get(name)
                .ok_or_else(|| DectestError::Config(format!("Unknown environment: {}", name)))?;
            if env.base_url.is_some() {
                config.base_url = env.base_url.clone();
            }
            config
                .headers
                .extend(env.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        config.base_url = config.base_url.map(|url| resolve_env_vars(&url));
        for value in config.headers.values_mut() {
            *value = resolve_env_vars(value);
        }

        Ok(config)
    }

    pub fn environment_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.environments.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }
}

/// 解析并替换系统环境变量 ${VAR}，未找到的保持原样
pub fn resolve_env_vars(text: &str) -> String {
    static ENV_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = ENV_REGEX.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is valid")
    });

    re.replace_all(text, |caps: &Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    })
    .to_string()
}

/// 配置文件加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 配置文件名
    const CONFIG_FILE: &'static str = "dectest.toml";

    /// 从指定路径加载配置文件
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<DectestConfig> {
        let content = fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&content)?)
    }

    /// 查找并加载配置文件
    /// 查找顺序：
    /// 1. 当前目录及父目录
    /// 2. 用户配置目录 ~/.config/dectest/
    pub fn find_and_load() -> Option<DectestConfig> {
        Self::try_load_from_current_dir().or_else(Self::try_load_from_user_dir)
    }

    /// 找不到配置文件时使用默认配置
    pub fn load_or_default(env_name: Option<&str>) -> Result<DectestConfig> {
        Self::find_and_load()
            .unwrap_or_default()
            .for_environment(env_name)
    }

    fn try_load_from_current_dir() -> Option<DectestConfig> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            let config_path = current.join(Self::CONFIG_FILE);
            if config_path.exists() {
                return Self::load_logged(&config_path);
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    fn try_load_from_user_dir() -> Option<DectestConfig> {
        let home = dirs::home_dir()?;
        let config_path = home.join(".config").join("dectest").join(Self::CONFIG_FILE);

        if config_path.exists() {
            Self::load_logged(&config_path)
        } else {
            None
        }
    }

    fn load_logged(path: &Path) -> Option<DectestConfig> {
        match Self::load_from_path(path) {
            Ok(config) => {
                tracing::debug!("loaded config from {}", path.display());
                Some(config)
            }
            Err(e) => {
                tracing::warn!("ignoring config {}: {}", path.display(), e);
                None
            }
        }
    }
}
