use crate::auth::Credentials;
use crate::error::{DavError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 流式读写缓冲区下限
pub const MIN_BUFFER_SIZE: usize = 1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 传输层读超时（毫秒），0 表示不限时
    #[serde(default = "ServerConfig::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ServerConfig {
    fn default_timeout_ms() -> u64 {
        30_000
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        timeout_from_millis(self.timeout_ms)
    }
}

/// 毫秒数转为读超时，0 视为不限时
pub fn timeout_from_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub root_path: PathBuf,
    /// PUT/GET 流式传输的分块大小
    #[serde(default = "StorageConfig::default_buffer_size")]
    pub buffer_size: usize,
}

impl StorageConfig {
    fn default_buffer_size() -> usize {
        8 * 1024
    }

    pub fn effective_buffer_size(&self) -> usize {
        self.buffer_size.max(MIN_BUFFER_SIZE)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("./storage"),
            buffer_size: Self::default_buffer_size(),
        }
    }
}

/// 认证配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
    /// 允许匿名访问时跳过 Basic 认证
    #[serde(default)]
    pub allow_anonymous: bool,
    #[serde(default = "AuthConfig::default_realm")]
    pub realm: String,
}

impl AuthConfig {
    fn default_realm() -> String {
        "WebDAV".to_string()
    }

    /// 服务启动时冻结的凭据快照
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
            allow_anonymous: self.allow_anonymous,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin".to_string(),
            allow_anonymous: false,
            realm: Self::default_realm(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DavError::Config(format!("无法读取配置文件: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| DavError::Config(format!("配置文件解析失败: {}", e)))?;
        Ok(config)
    }

    pub fn load() -> Self {
        let path = std::env::var("NAS_DAV_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        let mut config = Self::from_file(&path).unwrap_or_default();
        config.apply_env_overrides();
        config
    }

    /// 应用环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("DAV_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("DAV_PORT")
            && let Ok(v) = port.parse::<u16>()
        {
            self.server.port = v;
        }
        if let Ok(timeout) = std::env::var("DAV_TIMEOUT_MS")
            && let Ok(v) = timeout.parse::<u64>()
        {
            self.server.timeout_ms = v;
        }

        if let Ok(root) = std::env::var("DAV_ROOT") {
            self.storage.root_path = PathBuf::from(root);
        }
        if let Ok(size) = std::env::var("DAV_BUFFER_SIZE")
            && let Ok(v) = size.parse::<usize>()
        {
            self.storage.buffer_size = v;
        }

        if let Ok(user) = std::env::var("DAV_USERNAME") {
            self.auth.username = user;
        }
        if let Ok(pass) = std::env::var("DAV_PASSWORD") {
            self.auth.password = pass;
        }
        if let Ok(anon) = std::env::var("DAV_ALLOW_ANONYMOUS") {
            self.auth.allow_anonymous = anon.to_lowercase() == "true" || anon == "1";
        }
        if let Ok(realm) = std::env::var("DAV_REALM") {
            self.auth.realm = realm;
        }
    }
}
