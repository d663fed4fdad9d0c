//! 响应拦截器
//!
//! 页面路由的 [`WebResponse`] 在写出前依次经过已注册的拦截器，
//! 典型用途是向所有渲染上下文注入公共数据。
//! 拦截器出错不会使请求失败，仅记录错误并跳过该拦截器。

use crate::context::RequestContext;
use crate::error::WebError;
use crate::response::WebResponse;

/// 响应拦截器
pub trait ResponseInterceptor: Send + Sync {
    fn name(&self) -> &'static str;

    /// 在响应写出前修改响应
    fn intercept(
        &self,
        response: &mut WebResponse,
        ctx: &RequestContext,
    ) -> Result<(), WebError>;
}

/// 编译时拦截器注册项
pub struct InterceptorRegistration {
    pub construct: fn() -> Box<dyn ResponseInterceptor>,
}

inventory::collect!(InterceptorRegistration);

/// 注册一个响应拦截器（类型需实现 `Default`）
#[macro_export]
macro_rules! register_response_interceptor {
    ($ty:ty) => {
        $crate::inventory::submit! {
            $crate::interceptor::InterceptorRegistration {
                construct: || Box::new(<$ty as Default>::default()),
            }
        }
    };
}

/// 收集全部已注册的拦截器
pub fn build_from_inventory() -> Vec<Box<dyn ResponseInterceptor>> {
    let mut interceptors = Vec::new();
    for registration in inventory::iter::<InterceptorRegistration> {
        let interceptor = (registration.construct)();
        tracing::info!("Registered response interceptor: {}", interceptor.name());
        interceptors.push(interceptor);
    }
    interceptors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Brand;

    impl ResponseInterceptor for Brand {
        fn name(&self) -> &'static str {
            "brand"
        }

        fn intercept(
            &self,
            response: &mut WebResponse,
            _ctx: &RequestContext,
        ) -> Result<(), WebError> {
            if let WebResponse::Render { context, .. } = response {
                context.insert("brand".to_string(), json!("wyvern"));
            }
            Ok(())
        }
    }

    #[test]
    fn interceptor_mutates_render_context() {
        use crate::session::Session;
        use axum::http::{HeaderMap, Method};
        use std::collections::HashMap;

        let ctx = RequestContext::new(
            Method::GET,
            "/".to_string(),
            HashMap::new(),
            HeaderMap::new(),
            Session::fresh(),
        );
        let mut response = WebResponse::render("index");
        Brand.intercept(&mut response, &ctx).unwrap();
        match response {
            WebResponse::Render { context, .. } => {
                assert_eq!(context.get("brand"), Some(&json!("wyvern")));
            }
            _ => panic!("expected render"),
        }
    }
}
