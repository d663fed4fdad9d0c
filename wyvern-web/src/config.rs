//! 框架配置
//!
//! 所有配置集中在 [`WebProperties`]，支持默认值与环境变量覆盖

use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Web 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebProperties {
    /// 服务器监听地址
    pub host: String,

    /// 服务器监听端口
    pub port: u16,

    /// 是否为生产环境（控制错误页详情展示）
    pub production: bool,

    /// 是否启用 CORS
    pub enable_cors: bool,

    /// 是否启用请求日志
    pub enable_request_logging: bool,

    /// JSON 请求体大小上限（字节）
    pub json_limit: usize,

    /// 模板 glob 模式
    pub template_pattern: String,

    /// 是否启用模板热加载
    pub template_hot_reload: bool,

    /// 会话 Cookie 名称
    pub session_cookie: String,

    /// 会话存活时间（秒）
    pub session_ttl_secs: u64,

    /// 文件存储根目录
    pub storage_root: String,

    /// 文件缓存目录
    pub cache_dir: String,

    /// 上传文件大小上限（字节）
    pub max_file_size: usize,

    /// multipart 字段数量上限
    pub max_fields: usize,
}

impl Default for WebProperties {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            production: false,
            enable_cors: false,
            enable_request_logging: true,
            json_limit: 2 * 1024 * 1024,
            template_pattern: "templates/**/*".to_string(),
            template_hot_reload: false,
            session_cookie: "wyvern_session".to_string(),
            session_ttl_secs: 24 * 60 * 60,
            storage_root: "storage".to_string(),
            cache_dir: "cache".to_string(),
            max_file_size: 10 * 1024 * 1024,
            max_fields: 100,
        }
    }
}

fn env_string(key: &str, value: &mut String) {
    if let Ok(v) = std::env::var(key) {
        *value = v;
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, value: &mut T) {
    if let Ok(v) = std::env::var(key) {
        if let Ok(parsed) = v.parse() {
            *value = parsed;
        }
    }
}

impl WebProperties {
    /// 从环境变量加载配置（未设置的项保持默认值）
    pub fn from_env() -> Self {
        let mut props = Self::default();
        env_string(ENV_HOST, &mut props.host);
        env_parse(ENV_PORT, &mut props.port);
        if let Ok(profile) = std::env::var(ENV_PROFILE) {
            props.production = profile.eq_ignore_ascii_case("production");
        }
        env_parse(ENV_ENABLE_CORS, &mut props.enable_cors);
        env_parse(ENV_ENABLE_REQUEST_LOGGING, &mut props.enable_request_logging);
        env_parse(ENV_JSON_LIMIT, &mut props.json_limit);
        env_string(ENV_TEMPLATE_PATTERN, &mut props.template_pattern);
        env_parse(ENV_TEMPLATE_HOT_RELOAD, &mut props.template_hot_reload);
        env_string(ENV_SESSION_COOKIE, &mut props.session_cookie);
        env_parse(ENV_SESSION_TTL, &mut props.session_ttl_secs);
        env_string(ENV_STORAGE_ROOT, &mut props.storage_root);
        env_string(ENV_CACHE_DIR, &mut props.cache_dir);
        env_parse(ENV_MAX_FILE_SIZE, &mut props.max_file_size);
        env_parse(ENV_MAX_FIELDS, &mut props.max_fields);
        props
    }

    /// 获取服务器地址
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
