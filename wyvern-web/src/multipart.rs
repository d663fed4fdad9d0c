//! multipart 表单解析
//!
//! 标记为 `multipart()` 的路由在调用处理器前解析整个表单，
//! 文本字段与文件分开收集，超限直接报错。

use bytes::Bytes;
use multer::Multipart;
use serde_json::{Map, Value};

use crate::config::WebProperties;
use crate::error::WebError;

/// 一个已上传的文件
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// 表单字段名
    pub field: String,
    /// 客户端文件名
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// 解析完成的表单载荷
#[derive(Debug, Clone, Default)]
pub struct FormPayload {
    /// 文本字段
    pub fields: Map<String, Value>,
    /// 上传的文件
    pub files: Vec<UploadedFile>,
}

impl FormPayload {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_str())
    }

    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field == field)
    }
}

/// 解析 multipart 请求体
pub async fn parse_form(
    content_type: &str,
    body: Bytes,
    props: &WebProperties,
) -> Result<FormPayload, WebError> {
    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| WebError::FormParse(e.to_string()))?;

    let stream = futures_util::stream::once(async move { Ok::<_, std::io::Error>(body) });
    let mut multipart = Multipart::new(stream, boundary);

    let mut payload = FormPayload::default();
    let mut field_count = 0usize;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WebError::FormParse(e.to_string()))?
    {
        field_count += 1;
        if field_count > props.max_fields {
            return Err(WebError::FormParse(format!(
                "too many form fields (limit {})",
                props.max_fields
            )));
        }

        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(|s| s.to_string());
        let content_type = field.content_type().map(|m| m.to_string());

        let data = field
            .bytes()
            .await
            .map_err(|e| WebError::FormParse(e.to_string()))?;

        if file_name.is_some() {
            if data.len() > props.max_file_size {
                return Err(WebError::FormParse(format!(
                    "file '{}' exceeds size limit ({} bytes)",
                    name, props.max_file_size
                )));
            }
            payload.files.push(UploadedFile {
                field: name,
                file_name,
                content_type,
                data,
            });
        } else {
            let text = String::from_utf8_lossy(&data).to_string();
            payload.fields.insert(name, Value::String(text));
        }
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_body(boundary: &str) -> Bytes {
        let body = format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"title\"\r\n\r\n\
             hello\r\n\
             --{b}\r\n\
             Content-Disposition: form-data; name=\"upload\"; filename=\"a.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             file-bytes\r\n\
             --{b}--\r\n",
            b = boundary
        );
        Bytes::from(body)
    }

    #[tokio::test]
    async fn splits_fields_and_files() {
        let boundary = "XBOUNDARY";
        let content_type = format!("multipart/form-data; boundary={}", boundary);
        let payload = parse_form(&content_type, form_body(boundary), &WebProperties::default())
            .await
            .unwrap();

        assert_eq!(payload.field("title"), Some("hello"));
        let file = payload.file("upload").unwrap();
        assert_eq!(file.file_name.as_deref(), Some("a.txt"));
        assert_eq!(&file.data[..], b"file-bytes");
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let props = WebProperties {
            max_file_size: 4,
            ..WebProperties::default()
        };
        let boundary = "XBOUNDARY";
        let content_type = format!("multipart/form-data; boundary={}", boundary);
        let result = parse_form(&content_type, form_body(boundary), &props).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn missing_boundary_is_a_parse_error() {
        let result = parse_form("text/plain", Bytes::new(), &WebProperties::default()).await;
        assert!(matches!(result, Err(WebError::FormParse(_))));
    }
}
