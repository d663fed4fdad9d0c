//! 会话与 flash 消息
//!
//! 内存会话存储，Cookie 仅携带会话 ID。flash 消息写入会话，
//! 在下一次页面渲染时取出并清空。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::context::Principal;

/// 一条 flash 消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashMessage {
    /// 消息类别，如 "success" / "error" / "info"
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Default)]
struct SessionData {
    values: HashMap<String, Value>,
    flash: Vec<FlashMessage>,
    principal: Option<Principal>,
}

/// 单个会话的句柄
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    data: Arc<Mutex<SessionData>>,
}

fn recover<'a, T>(mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl Session {
    /// 创建一个未绑定存储的新会话（测试与默认上下文使用）
    pub fn fresh() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            data: Arc::new(Mutex::new(SessionData::default())),
        }
    }

    // ==================== 键值 ====================

    pub fn put(&self, key: impl Into<String>, value: Value) {
        recover(&self.data).values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        recover(&self.data).values.get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        recover(&self.data).values.remove(key)
    }

    // ==================== flash ====================

    /// 追加一条 flash 消息
    pub fn flash(&self, kind: impl Into<String>, text: impl Into<String>) {
        recover(&self.data).flash.push(FlashMessage {
            kind: kind.into(),
            text: text.into(),
        });
    }

    /// 取出并清空全部 flash 消息
    pub fn take_flash(&self) -> Vec<FlashMessage> {
        std::mem::take(&mut recover(&self.data).flash)
    }

    // ==================== 用户 ====================

    pub fn set_principal(&self, principal: Principal) {
        recover(&self.data).principal = Some(principal);
    }

    pub fn clear_principal(&self) {
        recover(&self.data).principal = None;
    }

    pub fn principal(&self) -> Option<Principal> {
        recover(&self.data).principal.clone()
    }
}

struct StoredSession {
    session: Session,
    expires_at: Instant,
}

/// 内存会话存储
pub struct SessionStore {
    cookie_name: String,
    ttl: Duration,
    sessions: Mutex<HashMap<String, StoredSession>>,
}

impl SessionStore {
    pub fn new(cookie_name: impl Into<String>, ttl: Duration) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// 从请求头解析会话
    ///
    /// 返回会话以及（新建会话时）需要写回的 `Set-Cookie` 值。
    /// 已过期的会话被丢弃并重新创建。
    pub fn acquire(&self, headers: &HeaderMap) -> (Session, Option<HeaderValue>) {
        let now = Instant::now();
        let mut sessions = recover(&self.sessions);
        sessions.retain(|_, stored| stored.expires_at > now);

        if let Some(id) = self.cookie_value(headers) {
            if let Some(stored) = sessions.get_mut(&id) {
                stored.expires_at = now + self.ttl;
                return (stored.session.clone(), None);
            }
        }

        let session = Session::fresh();
        debug!("Created session {}", session.id);
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            self.cookie_name, session.id
        );
        sessions.insert(
            session.id.clone(),
            StoredSession {
                session: session.clone(),
                expires_at: now + self.ttl,
            },
        );
        let header = HeaderValue::from_str(&cookie).ok();
        (session, header)
    }

    fn cookie_value(&self, headers: &HeaderMap) -> Option<String> {
        let raw = headers.get(COOKIE)?.to_str().ok()?;
        for pair in raw.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            if parts.next() == Some(self.cookie_name.as_str()) {
                return parts.next().map(|v| v.to_string());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flash_is_consumed_once() {
        let session = Session::fresh();
        session.flash("success", "saved");
        session.flash("error", "oops");

        let first = session.take_flash();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].kind, "success");

        assert!(session.take_flash().is_empty());
    }

    #[test]
    fn store_reuses_session_by_cookie() {
        let store = SessionStore::new("sid", Duration::from_secs(60));
        let (session, cookie) = store.acquire(&HeaderMap::new());
        let cookie = cookie.unwrap();
        assert!(cookie.to_str().unwrap().starts_with("sid="));

        session.put("k", json!(1));

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(&format!("sid={}", session.id)).unwrap());
        let (again, none) = store.acquire(&headers);
        assert!(none.is_none());
        assert_eq!(again.get("k"), Some(json!(1)));
    }

    #[test]
    fn unknown_cookie_gets_fresh_session() {
        let store = SessionStore::new("sid", Duration::from_secs(60));
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("sid=missing"));
        let (_, cookie) = store.acquire(&headers);
        assert!(cookie.is_some());
    }
}
