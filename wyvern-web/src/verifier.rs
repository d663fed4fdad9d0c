//! 路由校验器
//!
//! 路由声明的前置条件链。任何一个校验器返回 `false`，
//! 该候选路由即被放弃，匹配继续落入下一条路由。
//! 异步校验器出错按「不通过」处理，并记录警告。

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::warn;

use crate::context::RequestContext;
use crate::error::WebError;

type AsyncVerifierFn = Arc<
    dyn Fn(&RequestContext) -> Pin<Box<dyn Future<Output = Result<bool, WebError>> + Send>>
        + Send
        + Sync,
>;

/// 单个校验器
#[derive(Clone)]
pub enum Verifier {
    Sync(Arc<dyn Fn(&RequestContext) -> bool + Send + Sync>),
    Async(AsyncVerifierFn),
}

impl Verifier {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&RequestContext) -> bool + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    pub fn asynchronous<F, Fut>(f: F) -> Self
    where
        F: Fn(&RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, WebError>> + Send + 'static,
    {
        Self::Async(Arc::new(move |ctx| Box::pin(f(ctx))))
    }

    /// 执行校验器，错误一律按不通过处理
    pub async fn check(&self, ctx: &RequestContext) -> bool {
        match self {
            Self::Sync(f) => f(ctx),
            Self::Async(f) => match f(ctx).await {
                Ok(passed) => passed,
                Err(e) => {
                    warn!("Verifier failed on {} {}: {}", ctx.method, ctx.path, e);
                    false
                }
            },
        }
    }
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("Verifier::Sync"),
            Self::Async(_) => f.write_str("Verifier::Async"),
        }
    }
}

// ==================== 标准校验器 ====================

/// 要求已登录
pub fn auth_user(ctx: &RequestContext) -> bool {
    ctx.is_authenticated()
}

/// 要求未登录（登录/注册页使用）
pub fn not_auth_user(ctx: &RequestContext) -> bool {
    !ctx.is_authenticated()
}

/// 要求登录用户权限级别不低于 `level`
pub fn min_level(level: i64) -> impl Fn(&RequestContext) -> bool + Send + Sync + 'static {
    move |ctx| ctx.principal().map(|p| p.level >= level).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Principal;
    use crate::session::Session;
    use axum::http::{HeaderMap, Method};
    use std::collections::HashMap;

    fn context() -> RequestContext {
        RequestContext::new(
            Method::GET,
            "/".to_string(),
            HashMap::new(),
            HeaderMap::new(),
            Session::fresh(),
        )
    }

    fn login(ctx: &RequestContext, level: i64) {
        ctx.set_principal(Principal {
            id: "u1".into(),
            name: "alice".into(),
            level,
        });
    }

    #[tokio::test]
    async fn auth_verifiers_follow_principal() {
        let ctx = context();
        assert!(!auth_user(&ctx));
        assert!(not_auth_user(&ctx));
        login(&ctx, 1);
        assert!(auth_user(&ctx));
        assert!(!not_auth_user(&ctx));
    }

    #[tokio::test]
    async fn min_level_compares_inclusive() {
        let ctx = context();
        login(&ctx, 3);
        assert!(min_level(3)(&ctx));
        assert!(!min_level(4)(&ctx));
    }

    #[tokio::test]
    async fn async_verifier_error_counts_as_failure() {
        let verifier = Verifier::asynchronous(|_| async {
            Err::<bool, _>(WebError::Internal("backend down".into()))
        });
        assert!(!verifier.check(&context()).await);
    }
}
