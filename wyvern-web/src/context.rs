//! 请求上下文
//!
//! 每个请求构造一个 [`RequestContext`]，贯穿中间件、校验器与处理器。
//! 以 `Arc` 共享，内部可变字段使用 `Mutex` 保护。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::http::{HeaderMap, Method};
use serde_json::{Map, Value};

use crate::multipart::FormPayload;
use crate::routing::RouteMeta;
use crate::session::Session;

/// 请求上下文的共享句柄
pub type Ctx = Arc<RequestContext>;

/// 当前登录用户
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Principal {
    pub id: String,
    pub name: String,
    /// 权限级别，数值越大权限越高
    pub level: i64,
}

/// 请求上下文
#[derive(Debug)]
pub struct RequestContext {
    /// 请求方法
    pub method: Method,

    /// 请求路径（不含查询串）
    pub path: String,

    /// 查询参数
    pub query: HashMap<String, String>,

    /// 请求头
    pub headers: HeaderMap,

    /// 会话
    pub session: Session,

    /// 命中的路由元数据，匹配成功后由分发器填入
    route: Mutex<Option<Arc<RouteMeta>>>,

    /// 当前登录用户
    principal: Mutex<Option<Principal>>,

    /// 渲染袋：中间件/拦截器塞入的模板上下文键值
    bag: Mutex<Map<String, Value>>,

    /// multipart 表单载荷
    form: Mutex<Option<FormPayload>>,
}

fn recover<'a, T>(mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl RequestContext {
    pub fn new(
        method: Method,
        path: String,
        query: HashMap<String, String>,
        headers: HeaderMap,
        session: Session,
    ) -> Self {
        Self {
            method,
            path,
            query,
            headers,
            session,
            route: Mutex::new(None),
            principal: Mutex::new(None),
            bag: Mutex::new(Map::new()),
            form: Mutex::new(None),
        }
    }

    // ==================== 路由 ====================

    pub fn set_route(&self, meta: Arc<RouteMeta>) {
        *recover(&self.route) = Some(meta);
    }

    pub fn route(&self) -> Option<Arc<RouteMeta>> {
        recover(&self.route).clone()
    }

    // ==================== 用户 ====================

    pub fn set_principal(&self, principal: Principal) {
        *recover(&self.principal) = Some(principal);
    }

    pub fn clear_principal(&self) {
        *recover(&self.principal) = None;
    }

    pub fn principal(&self) -> Option<Principal> {
        recover(&self.principal).clone()
    }

    /// 是否已登录
    pub fn is_authenticated(&self) -> bool {
        recover(&self.principal).is_some()
    }

    // ==================== 渲染袋 ====================

    /// 向渲染袋写入一个键值，渲染时合并进模板上下文
    pub fn put(&self, key: impl Into<String>, value: Value) {
        recover(&self.bag).insert(key.into(), value);
    }

    pub fn bag(&self) -> Map<String, Value> {
        recover(&self.bag).clone()
    }

    // ==================== 表单 ====================

    pub fn set_form(&self, form: FormPayload) {
        *recover(&self.form) = Some(form);
    }

    pub fn form(&self) -> Option<FormPayload> {
        recover(&self.form).clone()
    }

    // ==================== 便捷访问 ====================

    /// 查询参数
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(|s| s.as_str())
    }

    /// 请求头（非法 UTF-8 视为缺失）
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> RequestContext {
        RequestContext::new(
            Method::GET,
            "/posts/1".to_string(),
            HashMap::new(),
            HeaderMap::new(),
            Session::fresh(),
        )
    }

    #[test]
    fn bag_accumulates_values() {
        let ctx = context();
        ctx.put("title", json!("hello"));
        ctx.put("count", json!(3));
        let bag = ctx.bag();
        assert_eq!(bag.get("title"), Some(&json!("hello")));
        assert_eq!(bag.get("count"), Some(&json!(3)));
    }

    #[test]
    fn principal_round_trip() {
        let ctx = context();
        assert!(!ctx.is_authenticated());
        ctx.set_principal(Principal {
            id: "u1".into(),
            name: "alice".into(),
            level: 5,
        });
        assert!(ctx.is_authenticated());
        assert_eq!(ctx.principal().map(|p| p.level), Some(5));
        ctx.clear_principal();
        assert!(!ctx.is_authenticated());
    }
}
