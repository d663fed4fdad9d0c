//! 请求分发
//!
//! 框架不使用路由树，而是把全部路由编译为有序候选列表，
//! 请求按注册顺序逐条尝试：方法与模式匹配、校验器通过才算命中，
//! 校验器不通过或处理器返回 `Skip` 时继续尝试下一条。
//! 整条管线收敛在 [`Dispatcher::dispatch`]，错误统一在末端转为响应。

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::to_bytes;
use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::Value;
use tokio::sync::OnceCell;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};

use crate::app::Application;
use crate::context::{Ctx, RequestContext};
use crate::controller::{Controller, ControllerRegistration};
use crate::error::{ConfigError, WebError};
use crate::interceptor::{self, ResponseInterceptor};
use crate::middleware::{self, MiddlewareOutcome, MiddlewareRegistration, MountedMiddleware};
use crate::multipart::parse_form;
use crate::response::{Payload, WebResponse};
use crate::routing::{join_paths, PathPattern, RouteArgs, RouteMeta};
use crate::validate::BodyDescriptor;
use crate::verifier::Verifier;

type ErasedHandler =
    Arc<dyn Fn(RouteArgs, Ctx) -> crate::routing::HandlerFuture + Send + Sync>;

/// 编译完成的单条路由
struct CompiledRoute {
    meta: Arc<RouteMeta>,
    pattern: PathPattern,
    body: Option<BodyDescriptor>,
    verifiers: Vec<Verifier>,
    handler: ErasedHandler,
}

/// 路由表：挂载期收集全部路由与中间件
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
    middlewares: Vec<MountedMiddleware>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 挂载一个控制器的全部路由
    pub fn mount<C: Controller>(&mut self, app: &Arc<Application>) -> Result<(), ConfigError> {
        let descriptor = C::descriptor();
        if descriptor.base_path.is_empty() {
            return Err(ConfigError::MissingBasePath {
                controller: std::any::type_name::<C>(),
            });
        }

        let controller = Arc::new(C::new(app.clone()));
        // 每个控制器一个 OnceCell：post_construct 在首次命中时执行一次，
        // 并发请求只有一个执行者；失败不缓存，后续请求重试
        let once: Arc<OnceCell<()>> = Arc::new(OnceCell::new());

        for builder in descriptor.routes {
            if let Some(disabled) = &builder.disabled_when {
                if disabled(&app.properties) {
                    debug!(
                        "Route {} {} disabled by predicate",
                        builder.verb, builder.path
                    );
                    continue;
                }
            }

            let full_pattern = join_paths(&descriptor.base_path, &builder.path);
            let method = builder.method.ok_or_else(|| ConfigError::MissingHandler {
                route: full_pattern.clone(),
            })?;
            let pattern = PathPattern::compile(&full_pattern)?;
            let body = match &builder.body {
                Some((argument, schema)) => Some(BodyDescriptor::new(
                    &full_pattern,
                    argument,
                    schema.clone(),
                )?),
                None => None,
            };
            if let Some(name) = &builder.name {
                app.names.insert(name, builder.verb, &full_pattern);
            }

            let meta = Arc::new(RouteMeta {
                verb: builder.verb,
                pattern: full_pattern.clone(),
                name: builder.name,
                api: builder.api,
                multipart: builder.multipart,
                controller: std::any::type_name::<C>(),
            });

            let controller = controller.clone();
            let once = once.clone();
            let handler: ErasedHandler = Arc::new(move |args, ctx| {
                let controller = controller.clone();
                let once = once.clone();
                let method = method.clone();
                Box::pin(async move {
                    once.get_or_try_init(|| async {
                        controller.post_construct().await
                    })
                    .await?;
                    method(controller, args, ctx).await
                })
            });

            info!(
                "Mounted {} {} ({})",
                meta.verb,
                meta.pattern,
                std::any::type_name::<C>()
            );
            self.routes.push(CompiledRoute {
                meta,
                pattern,
                body,
                verifiers: builder.verifiers,
                handler,
            });
        }
        Ok(())
    }

    /// 挂载一个应用中间件
    pub fn mount_middleware<M: middleware::Middleware>(
        &mut self,
        app: &Arc<Application>,
    ) -> Result<(), ConfigError> {
        let mounted = MountedMiddleware::mount::<M>(app)?;
        info!(
            "Mounted middleware {} at {}",
            mounted.type_name, mounted.mount_path
        );
        self.middlewares.push(mounted);
        Ok(())
    }
}

/// 请求分发器
pub struct Dispatcher {
    app: Arc<Application>,
    routes: Vec<CompiledRoute>,
    middlewares: Vec<MountedMiddleware>,
    interceptors: Vec<Box<dyn ResponseInterceptor>>,
}

impl Dispatcher {
    /// 从编译时注册项构建分发器
    pub fn build(app: Arc<Application>) -> Result<Self, ConfigError> {
        let mut table = RouteTable::new();
        for registration in inventory::iter::<ControllerRegistration> {
            info!("Registering controller {}", registration.type_name);
            (registration.mount)(&app, &mut table)?;
        }
        for registration in inventory::iter::<MiddlewareRegistration> {
            info!("Registering middleware {}", registration.type_name);
            (registration.mount)(&app, &mut table)?;
        }
        let interceptors = interceptor::build_from_inventory();
        Ok(Self::with_parts(app, table, interceptors))
    }

    /// 从显式路由表构建分发器，绕过编译时注册
    pub fn with_table(app: Arc<Application>, table: RouteTable) -> Self {
        Self::with_parts(app, table, Vec::new())
    }

    fn with_parts(
        app: Arc<Application>,
        table: RouteTable,
        interceptors: Vec<Box<dyn ResponseInterceptor>>,
    ) -> Self {
        Self {
            app,
            routes: table.routes,
            middlewares: table.middlewares,
            interceptors,
        }
    }

    pub fn add_interceptor(&mut self, interceptor: Box<dyn ResponseInterceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// 分发一个请求
    pub async fn dispatch(&self, request: Request) -> Response {
        let (parts, body) = request.into_parts();

        let limit = self
            .app
            .properties
            .json_limit
            .max(self.app.properties.max_file_size + 64 * 1024);
        let bytes = match to_bytes(body, limit).await {
            Ok(bytes) => bytes,
            Err(_) => {
                return (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large").into_response();
            }
        };

        let path = parts.uri.path().to_string();
        let mut query = HashMap::new();
        if let Some(raw) = parts.uri.query() {
            for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
                query.insert(key.into_owned(), value.into_owned());
            }
        }

        let (session, set_cookie) = self.app.sessions.acquire(&parts.headers);
        let ctx: Ctx = Arc::new(RequestContext::new(
            parts.method.clone(),
            path,
            query,
            parts.headers.clone(),
            session,
        ));
        // 会话中的登录态恢复到请求上下文
        if let Some(principal) = ctx.session.principal() {
            ctx.set_principal(principal);
        }

        let mut response = self.run_pipeline(bytes, &ctx).await;
        if let Some(cookie) = set_cookie {
            response.headers_mut().append(header::SET_COOKIE, cookie);
        }
        response
    }

    async fn run_pipeline(&self, bytes: bytes::Bytes, ctx: &Ctx) -> Response {
        for mounted in self.middlewares.iter().filter(|m| m.covers(&ctx.path)) {
            match mounted.handle(ctx.clone()).await {
                Ok(MiddlewareOutcome::Continue) => {}
                Ok(MiddlewareOutcome::Respond(response)) => {
                    return self.write(response, ctx, false).await;
                }
                Err(e) => {
                    return self
                        .handle_failure(ctx, ctx.path.starts_with("/api"), e)
                        .await;
                }
            }
        }

        let content_type = ctx.header("content-type").unwrap_or("").to_string();

        for route in &self.routes {
            if !route.meta.verb.matches(&ctx.method) {
                continue;
            }
            let Some(params) = route.pattern.extract(&ctx.path) else {
                continue;
            };
            ctx.set_route(route.meta.clone());

            let mut passed = true;
            for verifier in &route.verifiers {
                if !verifier.check(ctx.as_ref()).await {
                    passed = false;
                    break;
                }
            }
            if !passed {
                debug!(
                    "Verifier rejected {} {} on {}",
                    ctx.method, ctx.path, route.meta.pattern
                );
                continue;
            }

            if route.meta.multipart && ctx.form().is_none() {
                match parse_form(&content_type, bytes.clone(), &self.app.properties).await {
                    Ok(form) => ctx.set_form(form),
                    Err(e) => return self.handle_failure(ctx, route.meta.api, e).await,
                }
            }

            let body = route.body.as_ref().map(|descriptor| {
                let value = if bytes.is_empty() {
                    Value::Null
                } else {
                    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                        warn!("Malformed JSON body on {}: {}", route.meta.pattern, e);
                        Value::Null
                    })
                };
                descriptor.validate(value)
            });

            let args = RouteArgs { params, body };
            match (route.handler)(args, ctx.clone()).await {
                Ok(Payload::Response(WebResponse::Skip)) => continue,
                Ok(Payload::Response(response)) if route.meta.api => {
                    return self.write(response, ctx, false).await;
                }
                Ok(payload) if route.meta.api => {
                    let envelope = self.app.api_wrapper.on_success(&payload);
                    return (StatusCode::OK, Json(envelope)).into_response();
                }
                Ok(Payload::Response(response)) => {
                    return self.write(response, ctx, true).await;
                }
                Ok(Payload::Data(value)) => {
                    return (StatusCode::OK, Json(value)).into_response();
                }
                Ok(Payload::Flag(flag)) => {
                    return (StatusCode::OK, Json(Value::Bool(flag))).into_response();
                }
                Err(e) => return self.handle_failure(ctx, route.meta.api, e).await,
            }
        }

        self.not_found(ctx).await
    }

    /// 页面响应在写出前依次经过拦截器
    async fn write(&self, mut response: WebResponse, ctx: &Ctx, intercept: bool) -> Response {
        if intercept {
            for interceptor in &self.interceptors {
                if let Err(e) = interceptor.intercept(&mut response, ctx.as_ref()) {
                    error!("Response interceptor '{}' failed: {}", interceptor.name(), e);
                }
            }
        }
        match response.perform(&self.app, ctx.as_ref()).await {
            Ok(response) => response,
            Err(e) => {
                error!("Failed to write response for {} {}: {}", ctx.method, ctx.path, e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }

    async fn handle_failure(&self, ctx: &Ctx, api: bool, e: WebError) -> Response {
        let status = e.explicit_status().unwrap_or(StatusCode::BAD_REQUEST);
        error!("Request {} {} failed: {}", ctx.method, ctx.path, e);
        if api {
            return (status, Json(self.app.api_wrapper.on_error(&e))).into_response();
        }
        match self.app.error_controller.on_error(ctx.as_ref(), &e).await {
            Ok(response) => self.write(response, ctx, false).await,
            Err(inner) => {
                error!("Error controller failed: {}", inner);
                (status, e.to_string()).into_response()
            }
        }
    }

    async fn not_found(&self, ctx: &Ctx) -> Response {
        warn!("No route matched {} {}", ctx.method, ctx.path);
        if ctx.path.starts_with("/api") {
            let e = WebError::not_found("not found");
            return (
                StatusCode::NOT_FOUND,
                Json(self.app.api_wrapper.on_error(&e)),
            )
                .into_response();
        }
        match self.app.error_controller.on_not_found(ctx.as_ref()).await {
            Ok(response) => self.write(response, ctx, false).await,
            Err(e) => {
                error!("Error controller failed on 404: {}", e);
                (StatusCode::NOT_FOUND, "Not Found").into_response()
            }
        }
    }

    /// 构建最终的 axum Router
    pub fn into_router(self) -> Router {
        let enable_cors = self.app.properties.enable_cors;
        let enable_request_logging = self.app.properties.enable_request_logging;

        let dispatcher = Arc::new(self);
        let handler = move |request: Request| {
            let dispatcher = dispatcher.clone();
            async move { dispatcher.dispatch(request).await }
        };

        let mut router = Router::new().fallback(handler.clone());
        if enable_cors {
            // CORS 只挂在 API 路径上
            router = router.route(
                "/api/*rest",
                axum::routing::any(handler).layer(CorsLayer::permissive()),
            );
        }

        router = router.layer(CompressionLayer::new());
        if enable_request_logging {
            router = router.layer(axum::middleware::from_fn(middleware::request_logging));
        }
        router.layer(axum::middleware::from_fn(middleware::request_id))
    }
}
