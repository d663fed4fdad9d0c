//! 请求体校验
//!
//! 路由声明 JSON Schema 后，分发器在调用处理器前校验请求体。
//! 校验失败不会短路请求：处理器拿到的 [`ValidatedBody`] 同时
//! 携带原始值与校验错误，由处理器决定如何响应。

use std::sync::Arc;

use jsonschema::JSONSchema;
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// 路由级请求体描述
///
/// 启动期编译 schema，非法 schema 属于配置错误并中止启动。
#[derive(Clone)]
pub struct BodyDescriptor {
    /// 处理器参数名，校验后的请求体按该名注入
    pub argument_name: String,
    /// 原始 schema，供调试与文档使用
    pub schema: Value,
    compiled: Arc<JSONSchema>,
}

impl BodyDescriptor {
    pub fn new(route: &str, argument_name: &str, schema: Value) -> Result<Self, ConfigError> {
        let compiled = JSONSchema::compile(&schema).map_err(|e| ConfigError::InvalidSchema {
            route: route.to_string(),
            cause: e.to_string(),
        })?;
        Ok(Self {
            argument_name: argument_name.to_string(),
            schema,
            compiled: Arc::new(compiled),
        })
    }

    /// 校验请求体并收集全部错误
    pub fn validate(&self, value: Value) -> ValidatedBody {
        let faults = match self.compiled.validate(&value) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|e| Fault {
                    path: e.instance_path.to_string(),
                    message: e.to_string(),
                })
                .collect(),
        };
        ValidatedBody { value, faults }
    }
}

impl std::fmt::Debug for BodyDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyDescriptor")
            .field("argument_name", &self.argument_name)
            .field("schema", &self.schema)
            .finish()
    }
}

/// 一条校验错误
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    /// JSON 指针风格的出错位置，根为空串
    pub path: String,
    pub message: String,
}

/// 校验结果：原始值 + 错误列表
#[derive(Debug, Clone)]
pub struct ValidatedBody {
    pub value: Value,
    faults: Vec<Fault>,
}

impl ValidatedBody {
    /// 构造一个无校验的请求体（未声明 schema 的路由使用）
    pub fn unchecked(value: Value) -> Self {
        Self {
            value,
            faults: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.faults.is_empty()
    }

    pub fn errors(&self) -> &[Fault] {
        &self.faults
    }

    /// 按出错位置聚合错误消息，便于直接回传给客户端
    pub fn errors_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for fault in &self.faults {
            let key = if fault.path.is_empty() {
                "_".to_string()
            } else {
                fault.path.trim_start_matches('/').replace('/', ".")
            };
            map.insert(key, Value::String(fault.message.clone()));
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor() -> BodyDescriptor {
        BodyDescriptor::new(
            "/posts",
            "post",
            json!({
                "type": "object",
                "required": ["title"],
                "properties": {
                    "title": { "type": "string", "minLength": 1 },
                    "views": { "type": "integer" }
                }
            }),
        )
        .unwrap()
    }

    #[test]
    fn valid_body_has_no_faults() {
        let body = descriptor().validate(json!({"title": "hi", "views": 3}));
        assert!(body.is_valid());
        assert_eq!(body.value["title"], "hi");
    }

    #[test]
    fn invalid_body_keeps_value_and_collects_faults() {
        let body = descriptor().validate(json!({"views": "many"}));
        assert!(!body.is_valid());
        assert!(body.errors().len() >= 2);
        assert_eq!(body.value["views"], "many");
    }

    #[test]
    fn errors_map_uses_dotted_paths() {
        let body = descriptor().validate(json!({"title": "x", "views": "many"}));
        let map = body.errors_map();
        assert!(map.contains_key("views"));
    }

    #[test]
    fn bad_schema_is_a_config_error() {
        let err = BodyDescriptor::new("/posts", "post", json!({"type": "nope"}));
        assert!(err.is_err());
    }
}
