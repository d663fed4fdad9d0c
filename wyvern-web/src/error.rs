//! 框架错误类型
//!
//! 分为两层：
//!
//! 1. **`ConfigError`** - 启动期配置错误（缺少基础路径、非法路由模式等），致命，中止启动
//! 2. **`WebError`** - 请求处理期错误，可携带显式 HTTP 状态码，分发器统一捕获

use axum::http::StatusCode;
use thiserror::Error;

/// 请求处理期错误
///
/// 任何错误都可以通过 [`WebError::with_status`] 携带显式状态码；
/// 没有显式状态码的错误在分发器中默认按 400 处理。
#[derive(Error, Debug)]
pub enum WebError {
    /// 携带显式 HTTP 状态码的应用错误
    #[error("{message}")]
    Status { status: u16, message: String },

    /// JSON 请求体解析错误
    #[error("json parse error: {0}")]
    JsonParse(String),

    /// 表单/multipart 解析错误
    #[error("form parse error: {0}")]
    FormParse(String),

    /// 模板渲染错误
    #[error("template error: {0}")]
    Template(String),

    /// IO 错误
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// 其他内部错误
    #[error("{0}")]
    Internal(String),
}

impl WebError {
    /// 构造一个携带显式状态码的错误
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(404, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::with_status(401, message)
    }

    /// 错误携带的显式状态码（如果有）
    ///
    /// 分发器在没有显式状态码时默认使用 400。
    pub fn explicit_status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => StatusCode::from_u16(*status).ok(),
            _ => None,
        }
    }
}

/// 启动期配置错误，致命
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("controller `{controller}` does not declare a base path")]
    MissingBasePath { controller: &'static str },

    #[error("middleware `{middleware}` does not declare a mount path")]
    MissingMountPath { middleware: &'static str },

    #[error("invalid route pattern `{pattern}`: {cause}")]
    InvalidPattern { pattern: String, cause: String },

    #[error("route `{route}` has no handler")]
    MissingHandler { route: String },

    #[error("invalid body schema on route `{route}`: {cause}")]
    InvalidSchema { route: String, cause: String },

    #[error("template engine: {0}")]
    Template(String),

    #[error("logging: {0}")]
    Logging(String),

    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
}
