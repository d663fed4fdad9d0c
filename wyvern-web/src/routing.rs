//! 路由元数据
//!
//! 控制器通过链式 [`RouteBuilder`] 声明路由，启动时统一编译为正则并挂载。
//!
//! 路径模式支持两种占位符：
//!
//! - `:name` 匹配一个路径段（`[^/]+`）
//! - `:name(regex)` 按自定义正则匹配，如 `:id([0-9]+)`
//!
//! 占位符按出现顺序抽取为位置参数传给处理器。

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use regex::Regex;

use crate::config::WebProperties;
use crate::context::Ctx;
use crate::error::{ConfigError, WebError};
use crate::response::Payload;
use crate::validate::ValidatedBody;
use crate::verifier::Verifier;

/// HTTP 方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }

    pub fn matches(&self, method: &axum::http::Method) -> bool {
        method.as_str() == self.as_str()
    }
}

impl std::fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 处理器返回的装箱 Future
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Payload, WebError>> + Send>>;

/// 绑定到具体控制器类型的处理方法
pub type BoxedMethod<C> = Arc<dyn Fn(Arc<C>, RouteArgs, Ctx) -> HandlerFuture + Send + Sync>;

/// 传给处理器的路由参数
#[derive(Debug, Clone, Default)]
pub struct RouteArgs {
    /// 按占位符声明顺序抽取的路径参数
    pub params: Vec<String>,
    /// 校验后的请求体（路由声明了 schema 时存在）
    pub body: Option<ValidatedBody>,
}

impl RouteArgs {
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(|s| s.as_str())
    }

    pub fn body(&self) -> Option<&ValidatedBody> {
        self.body.as_ref()
    }
}

/// 匹配成功后挂到请求上下文上的路由元数据
#[derive(Debug, Clone)]
pub struct RouteMeta {
    pub verb: HttpVerb,
    /// 完整路径模式（基础路径 + 路由路径）
    pub pattern: String,
    /// 路由名称，供反向 URL 生成
    pub name: Option<String>,
    /// 是否为 API 路由（JSON 信封响应）
    pub api: bool,
    /// 是否接收 multipart 表单
    pub multipart: bool,
    pub controller: &'static str,
}

// ==================== 路径模式 ====================

/// 抽取模式中占位符的名称，按出现顺序
pub fn argument_names(pattern: &str) -> Vec<String> {
    let mut names = Vec::new();
    let bytes = pattern.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b':' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len()
                && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
            {
                end += 1;
            }
            if end > start {
                names.push(pattern[start..end].to_string());
            }
            i = end;
        } else {
            i += 1;
        }
    }
    names
}

/// 编译后的路径模式
#[derive(Debug, Clone)]
pub struct PathPattern {
    regex: Regex,
    arity: usize,
}

impl PathPattern {
    /// 将路径模式编译为锚定正则
    ///
    /// 尾部斜杠可选：`/posts` 同时匹配 `/posts/`。
    pub fn compile(pattern: &str) -> Result<Self, ConfigError> {
        let mut source = String::from("^");
        let mut arity = 0usize;
        let bytes = pattern.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b':' {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len()
                    && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
                {
                    end += 1;
                }
                if end == start {
                    return Err(ConfigError::InvalidPattern {
                        pattern: pattern.to_string(),
                        cause: "empty placeholder name".to_string(),
                    });
                }
                let mut constraint = "[^/]+".to_string();
                let mut next = end;
                if end < bytes.len() && bytes[end] == b'(' {
                    let mut depth = 0usize;
                    let mut close = None;
                    for (offset, b) in pattern[end..].bytes().enumerate() {
                        match b {
                            b'(' => depth += 1,
                            b')' => {
                                depth -= 1;
                                if depth == 0 {
                                    close = Some(end + offset);
                                    break;
                                }
                            }
                            _ => {}
                        }
                    }
                    let close = close.ok_or_else(|| ConfigError::InvalidPattern {
                        pattern: pattern.to_string(),
                        cause: "unbalanced parentheses in constraint".to_string(),
                    })?;
                    constraint = pattern[end + 1..close].to_string();
                    next = close + 1;
                }
                source.push_str(&format!("(?P<p{}>{})", arity, constraint));
                arity += 1;
                i = next;
            } else {
                let start = i;
                while i < bytes.len() && bytes[i] != b':' {
                    i += 1;
                }
                source.push_str(&regex::escape(&pattern[start..i]));
            }
        }
        source.push_str("/?$");

        let regex = Regex::new(&source).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            cause: e.to_string(),
        })?;
        Ok(Self { regex, arity })
    }

    /// 匹配路径并按声明顺序抽取参数
    pub fn extract(&self, path: &str) -> Option<Vec<String>> {
        let captures = self.regex.captures(path)?;
        let mut params = Vec::with_capacity(self.arity);
        for index in 0..self.arity {
            let value = captures
                .name(&format!("p{}", index))
                .map(|m| m.as_str().to_string())?;
            params.push(value);
        }
        Some(params)
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

/// 拼接基础路径与路由路径，折叠重复斜杠
pub fn join_paths(base: &str, path: &str) -> String {
    let combined = format!("/{}/{}", base.trim_matches('/'), path.trim_start_matches('/'));
    let mut joined = String::with_capacity(combined.len());
    let mut last_slash = false;
    for c in combined.chars() {
        if c == '/' {
            if last_slash {
                continue;
            }
            last_slash = true;
        } else {
            last_slash = false;
        }
        joined.push(c);
    }
    if joined.len() > 1 && joined.ends_with('/') {
        joined.pop();
    }
    joined
}

// ==================== 路由构建器 ====================

/// 单条路由的链式构建器
pub struct RouteBuilder<C> {
    pub(crate) verb: HttpVerb,
    pub(crate) path: String,
    pub(crate) name: Option<String>,
    pub(crate) api: bool,
    pub(crate) multipart: bool,
    pub(crate) body: Option<(String, serde_json::Value)>,
    pub(crate) verifiers: Vec<Verifier>,
    pub(crate) disabled_when: Option<Arc<dyn Fn(&WebProperties) -> bool + Send + Sync>>,
    pub(crate) method: Option<BoxedMethod<C>>,
}

impl<C: Send + Sync + 'static> RouteBuilder<C> {
    fn new(verb: HttpVerb, path: impl Into<String>) -> Self {
        Self {
            verb,
            path: path.into(),
            name: None,
            api: false,
            multipart: false,
            body: None,
            verifiers: Vec::new(),
            disabled_when: None,
            method: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpVerb::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpVerb::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpVerb::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpVerb::Delete, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpVerb::Patch, path)
    }

    /// 命名路由，供反向 URL 生成
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 标记为 API 路由：返回值包进 JSON 信封，错误也以 JSON 返回
    pub fn api(mut self) -> Self {
        self.api = true;
        self
    }

    /// 接收 multipart 表单
    pub fn multipart(mut self) -> Self {
        self.multipart = true;
        self
    }

    /// 声明请求体 schema，校验结果以 `argument` 为名注入处理器
    pub fn body(mut self, argument: impl Into<String>, schema: serde_json::Value) -> Self {
        self.body = Some((argument.into(), schema));
        self
    }

    /// 追加同步校验器
    pub fn verify<F>(mut self, f: F) -> Self
    where
        F: Fn(&crate::context::RequestContext) -> bool + Send + Sync + 'static,
    {
        self.verifiers.push(Verifier::sync(f));
        self
    }

    /// 追加异步校验器
    pub fn verify_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(&crate::context::RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, WebError>> + Send + 'static,
    {
        self.verifiers.push(Verifier::asynchronous(f));
        self
    }

    /// 条件禁用：谓词为真时该路由不挂载
    pub fn disabled_when<F>(mut self, f: F) -> Self
    where
        F: Fn(&WebProperties) -> bool + Send + Sync + 'static,
    {
        self.disabled_when = Some(Arc::new(f));
        self
    }

    /// 绑定处理方法
    pub fn handler<F, Fut, T>(mut self, f: F) -> Self
    where
        F: Fn(Arc<C>, RouteArgs, Ctx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, WebError>> + Send + 'static,
        T: Into<Payload>,
    {
        let f = Arc::new(f);
        self.method = Some(Arc::new(move |controller, args, ctx| {
            let f = f.clone();
            Box::pin(async move { f(controller, args, ctx).await.map(Into::into) })
        }));
        self
    }
}

/// 控制器的路由声明
pub struct ControllerDescriptor<C> {
    pub base_path: String,
    pub routes: Vec<RouteBuilder<C>>,
}

impl<C: Send + Sync + 'static> ControllerDescriptor<C> {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            routes: Vec::new(),
        }
    }

    pub fn route(mut self, route: RouteBuilder<C>) -> Self {
        self.routes.push(route);
        self
    }
}

/// 别名：构建完成后的单条路由声明
pub type RouteDescriptor<C> = RouteBuilder<C>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_names_in_declaration_order() {
        assert_eq!(
            argument_names("/posts/:id([0-9]+)/comments/:cid"),
            vec!["id".to_string(), "cid".to_string()]
        );
        assert!(argument_names("/about").is_empty());
    }

    #[test]
    fn extracts_params_in_order() {
        let pattern = PathPattern::compile("/posts/:id/comments/:cid").unwrap();
        assert_eq!(
            pattern.extract("/posts/42/comments/7"),
            Some(vec!["42".to_string(), "7".to_string()])
        );
        assert_eq!(pattern.extract("/posts/42"), None);
    }

    #[test]
    fn constraint_restricts_matches() {
        let pattern = PathPattern::compile("/posts/:id([0-9]+)").unwrap();
        assert_eq!(pattern.extract("/posts/42"), Some(vec!["42".to_string()]));
        assert_eq!(pattern.extract("/posts/abc"), None);
    }

    #[test]
    fn trailing_slash_is_optional() {
        let pattern = PathPattern::compile("/posts").unwrap();
        assert!(pattern.extract("/posts").is_some());
        assert!(pattern.extract("/posts/").is_some());
        assert!(pattern.extract("/postsx").is_none());
    }

    #[test]
    fn literal_segments_are_escaped() {
        let pattern = PathPattern::compile("/v1.0/ping").unwrap();
        assert!(pattern.extract("/v1.0/ping").is_some());
        assert!(pattern.extract("/v1x0/ping").is_none());
    }

    #[test]
    fn unbalanced_constraint_is_rejected() {
        assert!(PathPattern::compile("/posts/:id([0-9]+").is_err());
    }

    #[test]
    fn sibling_patterns_extract_the_same_head_param() {
        let one = PathPattern::compile("/:id").unwrap();
        let two = PathPattern::compile("/:id/sub").unwrap();
        assert_eq!(one.extract("/42"), Some(vec!["42".to_string()]));
        assert_eq!(two.extract("/42/sub"), Some(vec!["42".to_string()]));
    }

    #[test]
    fn argument_names_agree_with_extraction_order() {
        let pattern = "/users/:uid/posts/:id([0-9]+)";
        let names = argument_names(pattern);
        assert_eq!(names, vec!["uid".to_string(), "id".to_string()]);

        let compiled = PathPattern::compile(pattern).unwrap();
        let params = compiled.extract("/users/alice/posts/9").unwrap();
        assert_eq!(params.len(), names.len());
        assert_eq!(params, vec!["alice".to_string(), "9".to_string()]);
    }

    #[test]
    fn modifiers_stay_on_their_own_route() {
        struct Noop;
        let first = RouteBuilder::<Noop>::get("/a").api();
        let second = RouteBuilder::<Noop>::get("/b");
        assert!(first.api);
        assert!(!second.api);

        let third = RouteBuilder::<Noop>::post("/c").api();
        let fourth = RouteBuilder::<Noop>::post("/d").api();
        assert!(third.api && fourth.api);
    }

    #[test]
    fn join_paths_collapses_slashes() {
        assert_eq!(join_paths("/", "/"), "/");
        assert_eq!(join_paths("/posts", "/:id"), "/posts/:id");
        assert_eq!(join_paths("posts/", "//new"), "/posts/new");
        assert_eq!(join_paths("/", "about"), "/about");
    }
}
