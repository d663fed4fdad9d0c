//! # Wyvern Web
//!
//! 控制器驱动的 Rust Web 框架，基于 Axum 构建
//!
//! ## 核心特性
//!
//! - **声明式路由** - 每个控制器通过链式 `RouteBuilder` 声明自己的路由元数据
//! - **编译时注册** - 使用 `inventory` 收集控制器/中间件，无需运行时目录扫描
//! - **统一分发管线** - 校验器链、请求体校验、响应归一化、终端错误处理
//! - **响应抽象** - Render / Redirect / File / Xml / Unauthorized / Skip
//! - **模板集成** - 基于 Tera，支持 flash 消息与请求上下文合并

pub mod api;
pub mod app;
pub mod config;
pub mod constants;
pub mod context;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod error_controller;
pub mod files;
pub mod interceptor;
pub mod logging;
pub mod mail;
pub mod middleware;
pub mod multipart;
pub mod response;
pub mod routing;
pub mod server;
pub mod session;
pub mod template;
pub mod urls;
pub mod validate;
pub mod verifier;

// 供 register_*! 宏在下游 crate 中展开使用
pub use async_trait;
pub use inventory;

pub mod prelude {
    //! 预导入模块

    pub use crate::api::{ApiResponseWrapper, DefaultApiResponseWrapper};
    pub use crate::app::{Application, ApplicationBuilder};
    pub use crate::config::WebProperties;
    pub use crate::context::{Ctx, Principal, RequestContext};
    pub use crate::controller::{Controller, ControllerRegistration};
    pub use crate::dispatch::{Dispatcher, RouteTable};
    pub use crate::error::{ConfigError, WebError};
    pub use crate::error_controller::{DefaultErrorController, ErrorController};
    pub use crate::files::{FileStore, LocalFileStore};
    pub use crate::interceptor::ResponseInterceptor;
    pub use crate::logging::LoggingConfig;
    pub use crate::mail::MailClient;
    pub use crate::middleware::{Middleware, MiddlewareDescriptor, MiddlewareOutcome};
    pub use crate::response::{FileOptions, Payload, WebResponse};
    pub use crate::routing::{
        ControllerDescriptor, HttpVerb, RouteArgs, RouteBuilder, RouteDescriptor, RouteMeta,
    };
    pub use crate::server::WebServer;
    pub use crate::session::{FlashMessage, Session};
    pub use crate::validate::ValidatedBody;
    pub use crate::verifier::{auth_user, min_level, not_auth_user, Verifier};
    pub use crate::{register_controller, register_middleware, register_response_interceptor};

    pub use async_trait::async_trait;
    pub use axum;
    pub use axum::http::StatusCode;
    pub use serde_json::{json, Value};
}
