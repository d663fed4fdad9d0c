//! 示例中间件与拦截器

use std::sync::Arc;

use wyvern_web::prelude::*;

/// 给所有页面注入版权年份
pub struct SiteChrome;

#[async_trait]
impl Middleware for SiteChrome {
    fn new(_app: Arc<Application>) -> Self {
        SiteChrome
    }

    fn descriptor() -> MiddlewareDescriptor {
        MiddlewareDescriptor::new("/")
    }

    async fn handle(&self, ctx: &Ctx) -> Result<MiddlewareOutcome, WebError> {
        ctx.put("site_name", json!("Wyvern Demo"));
        Ok(MiddlewareOutcome::Continue)
    }
}

/// 所有渲染响应都带上当前请求路径
#[derive(Default)]
pub struct CurrentPath;

impl ResponseInterceptor for CurrentPath {
    fn name(&self) -> &'static str {
        "current-path"
    }

    fn intercept(
        &self,
        response: &mut WebResponse,
        ctx: &RequestContext,
    ) -> Result<(), WebError> {
        if let WebResponse::Render { context, .. } = response {
            context
                .entry("current_path".to_string())
                .or_insert_with(|| json!(ctx.path));
        }
        Ok(())
    }
}

register_middleware!(SiteChrome);
register_response_interceptor!(CurrentPath);
