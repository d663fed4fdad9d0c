//! 错误控制器
//!
//! 页面路由的终端错误处理：404 与处理器错误都交给 [`ErrorController`]
//! 产生一个可渲染的响应。应用可替换默认实现以定制错误页。

use async_trait::async_trait;
use serde_json::json;

use crate::context::RequestContext;
use crate::error::WebError;
use crate::response::WebResponse;

/// 错误控制器
#[async_trait]
pub trait ErrorController: Send + Sync {
    /// 没有任何路由接住请求
    async fn on_not_found(&self, ctx: &RequestContext) -> Result<WebResponse, WebError>;

    /// 处理器或管线返回错误
    async fn on_error(
        &self,
        ctx: &RequestContext,
        error: &WebError,
    ) -> Result<WebResponse, WebError>;
}

/// 默认错误控制器：渲染 `404.html` / `error.html`
pub struct DefaultErrorController {
    /// 生产环境隐藏错误详情
    pub production: bool,
}

impl DefaultErrorController {
    pub fn new(production: bool) -> Self {
        Self { production }
    }
}

#[async_trait]
impl ErrorController for DefaultErrorController {
    async fn on_not_found(&self, ctx: &RequestContext) -> Result<WebResponse, WebError> {
        Ok(WebResponse::render("404")
            .with("path", json!(ctx.path))
            .with_status(404))
    }

    async fn on_error(
        &self,
        _ctx: &RequestContext,
        error: &WebError,
    ) -> Result<WebResponse, WebError> {
        let message = if self.production {
            "An unexpected error occurred".to_string()
        } else {
            error.to_string()
        };
        let status = error
            .explicit_status()
            .map(|s| s.as_u16())
            .unwrap_or(400);
        Ok(WebResponse::render("error")
            .with("error", json!(message))
            .with_status(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use axum::http::{HeaderMap, Method};
    use std::collections::HashMap;

    fn context() -> RequestContext {
        RequestContext::new(
            Method::GET,
            "/missing".to_string(),
            HashMap::new(),
            HeaderMap::new(),
            Session::fresh(),
        )
    }

    #[tokio::test]
    async fn not_found_renders_404_template() {
        let controller = DefaultErrorController::new(false);
        let response = controller.on_not_found(&context()).await.unwrap();
        match response {
            WebResponse::Render {
                template, status, ..
            } => {
                assert_eq!(template, "404");
                assert_eq!(status, Some(404));
            }
            _ => panic!("expected render"),
        }
    }

    #[tokio::test]
    async fn production_hides_error_details() {
        let controller = DefaultErrorController::new(true);
        let error = WebError::Internal("secret stack".into());
        let response = controller.on_error(&context(), &error).await.unwrap();
        match response {
            WebResponse::Render { context, .. } => {
                let text = context.get("error").and_then(|v| v.as_str()).unwrap();
                assert!(!text.contains("secret"));
            }
            _ => panic!("expected render"),
        }
    }
}
