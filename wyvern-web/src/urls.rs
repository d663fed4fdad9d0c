//! 反向 URL 生成
//!
//! 按路由名称查找已注册的路径模式，并用参数替换其中的占位符。
//! 名称表在启动挂载期填充，模板引擎通过共享句柄读取，
//! 因此内部使用 `Mutex` 保护。

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;
use tracing::warn;

use crate::routing::HttpVerb;

/// 一条已命名路由的反向查找记录
#[derive(Debug, Clone)]
pub struct NamedRoute {
    pub verb: HttpVerb,
    /// 完整路径模式（控制器基础路径 + 路由路径）
    pub pattern: String,
}

/// 路由名称表
///
/// 允许重名：后注册的覆盖先注册的，但记录警告。
#[derive(Debug, Default)]
pub struct RouteNameTable {
    routes: Mutex<HashMap<String, NamedRoute>>,
}

impl RouteNameTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, HashMap<String, NamedRoute>> {
        self.routes.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 注册一条命名路由
    pub fn insert(&self, name: &str, verb: HttpVerb, pattern: &str) {
        let previous = self.guard().insert(
            name.to_string(),
            NamedRoute {
                verb,
                pattern: pattern.to_string(),
            },
        );
        if let Some(previous) = previous {
            warn!(
                "Duplicate route name '{}': '{}' replaces '{}'",
                name, pattern, previous.pattern
            );
        }
    }

    pub fn get(&self, name: &str) -> Option<NamedRoute> {
        self.guard().get(name).cloned()
    }

    /// 按名称生成 URL
    ///
    /// 未知名称返回 `#`，避免模板渲染因死链接而失败。
    pub fn reverse(&self, name: &str, parameters: &Value) -> String {
        match self.get(name) {
            Some(route) => apply_parameters(&route.pattern, parameters),
            None => {
                warn!("Unknown route name '{}'", name);
                "#".to_string()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }
}

/// 查找 `:key` 占位符，返回其起止范围（含正则约束段）
///
/// `:id` 不能命中 `:idx` 的前缀，因此要求占位符后是非标识符字符。
fn find_placeholder(url: &str, key: &str) -> Option<(usize, usize)> {
    let needle = format!(":{}", key);
    let bytes = url.as_bytes();
    let mut from = 0;
    while let Some(rel) = url[from..].find(&needle) {
        let pos = from + rel;
        let mut end = pos + needle.len();
        let boundary = bytes
            .get(end)
            .map_or(true, |b| !(b.is_ascii_alphanumeric() || *b == b'_'));
        if !boundary {
            from = end;
            continue;
        }
        // 占位符可能带正则约束，如 :id([0-9]+)
        if bytes.get(end) == Some(&b'(') {
            let mut depth = 0usize;
            for (i, b) in url[end..].bytes().enumerate() {
                match b {
                    b'(' => depth += 1,
                    b')' => {
                        depth -= 1;
                        if depth == 0 {
                            end += i + 1;
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
        return Some((pos, end));
    }
    None
}

/// 将参数应用到路径模式
///
/// 每个键 `k` 替换模式中第一个 `:k` 占位符（包括其后的正则约束段）；
/// 没有对应占位符的键追加为查询串。
pub fn apply_parameters(pattern: &str, parameters: &Value) -> String {
    let mut url = pattern.to_string();
    let mut leftover = Vec::new();
    if let Value::Object(map) = parameters {
        for (key, value) in map {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            match find_placeholder(&url, key) {
                Some((start, end)) => url.replace_range(start..end, &rendered),
                None => leftover.push((key.clone(), rendered)),
            }
        }
    }
    if !leftover.is_empty() {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(leftover)
            .finish();
        url.push('?');
        url.push_str(&query);
    }
    url
}
