//! 响应抽象
//!
//! 处理器返回 [`Payload`]：裸数据、布尔标记、或显式 [`WebResponse`]。
//! `WebResponse` 在分发器末端被消费并写出为 HTTP 响应。

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};
use tokio_util::io::ReaderStream;
use tracing::warn;

use crate::app::Application;
use crate::context::RequestContext;
use crate::error::WebError;

/// 处理器返回值
#[derive(Debug)]
pub enum Payload {
    /// 裸数据：API 路由包进信封，页面路由按 JSON 返回
    Data(Value),
    /// 布尔标记：API 路由包进信封
    Flag(bool),
    /// 显式响应
    Response(WebResponse),
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Data(value)
    }
}

impl From<bool> for Payload {
    fn from(flag: bool) -> Self {
        Self::Flag(flag)
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Data(Value::String(value))
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Data(Value::String(value.to_string()))
    }
}

impl From<WebResponse> for Payload {
    fn from(response: WebResponse) -> Self {
        Self::Response(response)
    }
}

/// 文件响应选项
#[derive(Debug, Clone, Default)]
pub struct FileOptions {
    /// 显式内容类型，缺省按扩展名推断
    pub content_type: Option<String>,
    /// 作为附件下载时的文件名
    pub download_name: Option<String>,
    /// 请求缩放变体（宽 x 高），不存在时回落到原始文件
    pub variant: Option<(u32, u32)>,
}

/// 显式响应
#[derive(Debug)]
pub enum WebResponse {
    /// 渲染模板
    Render {
        template: String,
        context: Map<String, Value>,
        status: Option<u16>,
    },
    /// 渲染模板，强制 `application/xml`，不合并 flash 与渲染袋
    Xml {
        template: String,
        context: Map<String, Value>,
        status: Option<u16>,
    },
    /// 重定向
    Redirect { location: String },
    /// 存储中的文件
    File { key: String, options: FileOptions },
    /// 401
    Unauthorized,
    /// 放弃当前候选路由，匹配继续落入下一条
    Skip,
}

impl WebResponse {
    pub fn render(template: impl Into<String>) -> Self {
        Self::Render {
            template: template.into(),
            context: Map::new(),
            status: None,
        }
    }

    pub fn xml(template: impl Into<String>) -> Self {
        Self::Xml {
            template: template.into(),
            context: Map::new(),
            status: None,
        }
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            location: location.into(),
        }
    }

    pub fn file(key: impl Into<String>) -> Self {
        Self::File {
            key: key.into(),
            options: FileOptions::default(),
        }
    }

    /// 向渲染上下文追加一个键值（对 Render / Xml 生效）
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        if let Self::Render { context, .. } | Self::Xml { context, .. } = &mut self {
            context.insert(key.into(), value);
        }
        self
    }

    /// 覆盖响应状态码（对 Render / Xml 生效）
    pub fn with_status(mut self, code: u16) -> Self {
        match &mut self {
            Self::Render { status, .. } | Self::Xml { status, .. } => *status = Some(code),
            _ => {}
        }
        self
    }

    /// 覆盖文件内容类型
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        if let Self::File { options, .. } = &mut self {
            options.content_type = Some(content_type.into());
        }
        self
    }

    /// 作为附件下载
    pub fn with_download_name(mut self, name: impl Into<String>) -> Self {
        if let Self::File { options, .. } = &mut self {
            options.download_name = Some(name.into());
        }
        self
    }

    /// 替换文件选项
    pub fn with_options(mut self, new_options: FileOptions) -> Self {
        if let Self::File { options, .. } = &mut self {
            *options = new_options;
        }
        self
    }

    /// 消费自身，写出为 HTTP 响应
    ///
    /// `Skip` 不是可写出的响应，由分发器在此之前拦截。
    pub async fn perform(
        self,
        app: &Application,
        ctx: &RequestContext,
    ) -> Result<Response, WebError> {
        match self {
            Self::Render {
                template,
                context,
                status,
            } => {
                let mut merged = Map::new();
                for (key, value) in ctx.bag() {
                    merged.insert(key, value);
                }
                let flash = ctx.session.take_flash();
                if !flash.is_empty() {
                    let rendered = flash
                        .into_iter()
                        .map(|m| serde_json::json!({"kind": m.kind, "text": m.text}))
                        .collect::<Vec<_>>();
                    merged.insert("flash".to_string(), Value::Array(rendered));
                }
                if let Some(principal) = ctx.principal() {
                    merged.insert(
                        "user".to_string(),
                        serde_json::to_value(principal)
                            .map_err(|e| WebError::Internal(e.to_string()))?,
                    );
                }
                for (key, value) in context {
                    merged.insert(key, value);
                }

                let name = if template.contains('.') {
                    template
                } else {
                    format!("{}.html", template)
                };
                let html = app.templates.render_to_string(&name, &merged)?;
                let status = resolve_status(status, StatusCode::OK);
                Ok((status, [(header::CONTENT_TYPE, "text/html; charset=utf-8")], html)
                    .into_response())
            }
            Self::Xml {
                template,
                context,
                status,
            } => {
                let name = if template.contains('.') {
                    template
                } else {
                    format!("{}.xml", template)
                };
                let body = app.templates.render_to_string(&name, &context)?;
                let status = resolve_status(status, StatusCode::OK);
                Ok((status, [(header::CONTENT_TYPE, "application/xml")], body).into_response())
            }
            Self::Redirect { location } => {
                let value = HeaderValue::from_str(&location)
                    .map_err(|e| WebError::Internal(e.to_string()))?;
                Ok((StatusCode::FOUND, [(header::LOCATION, value)]).into_response())
            }
            Self::File { key, options } => perform_file(app, &key, options).await,
            Self::Unauthorized => {
                Ok((StatusCode::UNAUTHORIZED, "Unauthorized").into_response())
            }
            Self::Skip => Err(WebError::Internal(
                "Skip is not a writable response".to_string(),
            )),
        }
    }
}

fn resolve_status(status: Option<u16>, fallback: StatusCode) -> StatusCode {
    status
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(fallback)
}

async fn perform_file(
    app: &Application,
    key: &str,
    options: FileOptions,
) -> Result<Response, WebError> {
    // 变体不存在时回落到原始文件
    let path = match options.variant {
        Some((w, h)) => {
            let variant_key = format!("{}_{}x{}", key, w, h);
            match app.files.get_to_cache(&variant_key).await {
                Ok(path) => Some(path),
                Err(_) => app.files.get_to_cache(key).await.ok(),
            }
        }
        None => app.files.get_to_cache(key).await.ok(),
    };

    let Some(path) = path else {
        warn!("File '{}' not found in store", key);
        return Ok((StatusCode::NOT_FOUND, "Not Found").into_response());
    };

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            warn!("File '{}' disappeared from cache: {}", key, e);
            return Ok((StatusCode::NOT_FOUND, "Not Found").into_response());
        }
    };

    // 内容类型按解析后的缓存路径推断，变体文件可以有自己的扩展名
    let content_type = options
        .content_type
        .unwrap_or_else(|| guess_content_type(&path.to_string_lossy()).to_string());

    // 流式写出，响应体不落内存
    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| WebError::Internal(e.to_string()))?;

    if let Some(name) = options.download_name {
        let disposition = format!("attachment; filename=\"{}\"", name.replace('"', ""));
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            response
                .headers_mut()
                .insert(header::CONTENT_DISPOSITION, value);
        }
    }
    Ok(response)
}

fn guess_content_type(path: &str) -> &'static str {
    let extension = path.rsplit('.').next().unwrap_or("");
    match extension.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Application;
    use crate::files::{FileStore, LocalFileStore};
    use crate::session::Session;
    use axum::body::to_bytes;
    use axum::http::{HeaderMap, Method};
    use bytes::Bytes;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn context() -> RequestContext {
        RequestContext::new(
            Method::GET,
            "/".to_string(),
            HashMap::new(),
            HeaderMap::new(),
            Session::fresh(),
        )
    }

    async fn body_bytes(response: Response) -> Bytes {
        to_bytes(response.into_body(), 1024 * 1024).await.unwrap()
    }

    #[test]
    fn with_only_touches_render_context() {
        let response = WebResponse::render("index").with("title", json!("hi"));
        match response {
            WebResponse::Render { context, .. } => {
                assert_eq!(context.get("title"), Some(&json!("hi")));
            }
            _ => panic!("expected render"),
        }

        let redirect = WebResponse::redirect("/").with("title", json!("hi"));
        assert!(matches!(redirect, WebResponse::Redirect { .. }));
    }

    #[test]
    fn payload_from_conversions() {
        assert!(matches!(Payload::from(true), Payload::Flag(true)));
        assert!(matches!(Payload::from(json!({"a": 1})), Payload::Data(_)));
        assert!(matches!(
            Payload::from(WebResponse::redirect("/")),
            Payload::Response(_)
        ));
    }

    #[test]
    fn content_type_guessing() {
        assert_eq!(guess_content_type("a/b.png"), "image/png");
        assert_eq!(guess_content_type("report.pdf"), "application/pdf");
        assert_eq!(guess_content_type("blob"), "application/octet-stream");
    }

    #[tokio::test]
    async fn xml_forces_content_type_and_leaves_flash_alone() {
        let app = Application::for_tests();
        app.templates
            .add_raw_template("feed.xml", "<feed>{{ title }}</feed>")
            .unwrap();

        let ctx = context();
        ctx.session.flash("success", "saved");
        ctx.put("banner", json!("ignored"));

        let response = WebResponse::xml("feed")
            .with("title", json!("latest"))
            .perform(&app, &ctx)
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/xml"
        );
        assert_eq!(&body_bytes(response).await[..], b"<feed>latest</feed>");
        // flash 只归 Render 消费
        assert_eq!(ctx.session.take_flash().len(), 1);
    }

    #[tokio::test]
    async fn file_response_streams_from_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = Application::for_tests();
        app.files = Arc::new(LocalFileStore::new(dir.path()));
        app.files
            .upload_file("report.pdf", Bytes::from_static(b"%PDF-1.7"))
            .await
            .unwrap();

        let response = WebResponse::file("report.pdf")
            .with_download_name("q3.pdf")
            .perform(&app, &context())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_DISPOSITION)
                .unwrap(),
            "attachment; filename=\"q3.pdf\""
        );
        assert_eq!(&body_bytes(response).await[..], b"%PDF-1.7");
    }

    #[tokio::test]
    async fn missing_variant_falls_back_to_original() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = Application::for_tests();
        app.files = Arc::new(LocalFileStore::new(dir.path()));
        app.files
            .upload_file("photo.jpg", Bytes::from_static(b"jpeg-bytes"))
            .await
            .unwrap();

        let response = WebResponse::file("photo.jpg")
            .with_options(FileOptions {
                variant: Some((10, 10)),
                ..FileOptions::default()
            })
            .perform(&app, &context())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/jpeg"
        );
        assert_eq!(&body_bytes(response).await[..], b"jpeg-bytes");
    }

    #[tokio::test]
    async fn missing_file_writes_a_404() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = Application::for_tests();
        app.files = Arc::new(LocalFileStore::new(dir.path()));

        let response = WebResponse::file("nope.bin")
            .perform(&app, &context())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
