//! 应用中间件
//!
//! 两层中间件：
//!
//! 1. **应用中间件**（[`Middleware`]）- 挂载在路径前缀上，在路由匹配前执行，
//!    可以向上下文写入数据、直接产生响应短路请求
//! 2. **HTTP 层中间件** - 请求日志与请求 ID，基于 `axum::middleware::from_fn`

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tracing::info;
use uuid::Uuid;

use crate::app::Application;
use crate::context::Ctx;
use crate::dispatch::RouteTable;
use crate::error::{ConfigError, WebError};
use crate::response::WebResponse;

/// 中间件声明
#[derive(Debug, Clone)]
pub struct MiddlewareDescriptor {
    /// 挂载路径前缀，`/` 表示全部请求
    pub mount_path: String,
}

impl MiddlewareDescriptor {
    pub fn new(mount_path: impl Into<String>) -> Self {
        Self {
            mount_path: mount_path.into(),
        }
    }
}

/// 中间件执行结果
#[derive(Debug)]
pub enum MiddlewareOutcome {
    /// 继续处理请求
    Continue,
    /// 直接响应，短路后续中间件与路由
    Respond(WebResponse),
}

/// 应用中间件
#[async_trait]
pub trait Middleware: Send + Sync + Sized + 'static {
    fn new(app: Arc<Application>) -> Self;

    fn descriptor() -> MiddlewareDescriptor;

    async fn handle(&self, ctx: &Ctx) -> Result<MiddlewareOutcome, WebError>;
}

type MiddlewareFuture = Pin<Box<dyn Future<Output = Result<MiddlewareOutcome, WebError>> + Send>>;

/// 挂载完成的中间件，按注册顺序执行
pub struct MountedMiddleware {
    pub type_name: &'static str,
    pub mount_path: String,
    run: Arc<dyn Fn(Ctx) -> MiddlewareFuture + Send + Sync>,
}

impl MountedMiddleware {
    pub fn mount<M: Middleware>(app: &Arc<Application>) -> Result<Self, ConfigError> {
        let descriptor = M::descriptor();
        if descriptor.mount_path.is_empty() {
            return Err(ConfigError::MissingMountPath {
                middleware: std::any::type_name::<M>(),
            });
        }
        let instance = Arc::new(M::new(app.clone()));
        Ok(Self {
            type_name: std::any::type_name::<M>(),
            mount_path: descriptor.mount_path,
            run: Arc::new(move |ctx| {
                let instance = instance.clone();
                Box::pin(async move { instance.handle(&ctx).await })
            }),
        })
    }

    /// 挂载路径是否覆盖给定请求路径
    pub fn covers(&self, path: &str) -> bool {
        if self.mount_path == "/" {
            return true;
        }
        let prefix = self.mount_path.trim_end_matches('/');
        path == prefix || path.starts_with(&format!("{}/", prefix))
    }

    pub async fn handle(&self, ctx: Ctx) -> Result<MiddlewareOutcome, WebError> {
        (self.run)(ctx).await
    }
}

/// 编译时中间件注册项
pub struct MiddlewareRegistration {
    pub type_name: &'static str,
    pub mount: fn(&Arc<Application>, &mut RouteTable) -> Result<(), ConfigError>,
}

inventory::collect!(MiddlewareRegistration);

/// 注册一个应用中间件
#[macro_export]
macro_rules! register_middleware {
    ($ty:ty) => {
        $crate::inventory::submit! {
            $crate::middleware::MiddlewareRegistration {
                type_name: stringify!($ty),
                mount: |app, table| table.mount_middleware::<$ty>(app),
            }
        }
    };
}

// ==================== HTTP 层中间件 ====================

/// 请求 ID：缺失时生成，写回响应头
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if let Ok(value) = HeaderValue::from_str(&id) {
        request.headers_mut().insert("x-request-id", value.clone());
        let mut response = next.run(request).await;
        response.headers_mut().insert("x-request-id", value);
        response
    } else {
        next.run(request).await
    }
}

/// 请求日志：方法、路径、状态码与耗时
pub async fn request_logging(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    info!(
        "{} {} -> {} ({:?})",
        method,
        path,
        response.status().as_u16(),
        start.elapsed()
    );
    response
}
