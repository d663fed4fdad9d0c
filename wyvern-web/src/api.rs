//! API JSON 信封
//!
//! API 路由的返回值与错误都经过 [`ApiResponseWrapper`] 包装，
//! 保证客户端收到统一结构的 JSON。

use serde_json::{json, Value};

use crate::error::WebError;
use crate::response::Payload;

/// API 响应包装器
///
/// 应用可以替换默认实现以定制信封结构。
pub trait ApiResponseWrapper: Send + Sync {
    /// 包装成功返回值（`Payload::Response` 不经过信封）
    fn on_success(&self, payload: &Payload) -> Value;

    /// 包装错误
    fn on_error(&self, error: &WebError) -> Value;
}

/// 默认信封：`{"success": bool, ...}`
#[derive(Debug, Default)]
pub struct DefaultApiResponseWrapper;

impl ApiResponseWrapper for DefaultApiResponseWrapper {
    fn on_success(&self, payload: &Payload) -> Value {
        match payload {
            Payload::Flag(flag) => json!({ "success": flag }),
            Payload::Data(data) => json!({ "success": true, "data": data }),
            Payload::Response(_) => json!({ "success": true }),
        }
    }

    fn on_error(&self, error: &WebError) -> Value {
        json!({ "success": false, "error": error.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_maps_to_bare_success() {
        let wrapper = DefaultApiResponseWrapper;
        assert_eq!(
            wrapper.on_success(&Payload::Flag(false)),
            json!({"success": false})
        );
    }

    #[test]
    fn data_is_nested_under_data_key() {
        let wrapper = DefaultApiResponseWrapper;
        assert_eq!(
            wrapper.on_success(&Payload::Data(json!([1, 2]))),
            json!({"success": true, "data": [1, 2]})
        );
    }

    #[test]
    fn errors_carry_message() {
        let wrapper = DefaultApiResponseWrapper;
        let value = wrapper.on_error(&WebError::not_found("no such post"));
        assert_eq!(value, json!({"success": false, "error": "no such post"}));
    }
}
