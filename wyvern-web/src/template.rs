//! 模板引擎
//!
//! 基于 Tera。向模板注册 `route` 函数做反向 URL 生成，
//! 开发环境可选开启模板热加载。

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde_json::{Map, Value};
use tera::Tera;
use tracing::{info, warn};

use crate::config::WebProperties;
use crate::error::{ConfigError, WebError};
use crate::urls::RouteNameTable;

/// 模板引擎
pub struct TemplateEngine {
    tera: Arc<RwLock<Tera>>,
    _watcher: Option<RecommendedWatcher>,
}

fn read_guard(tera: &Arc<RwLock<Tera>>) -> std::sync::RwLockReadGuard<'_, Tera> {
    tera.read().unwrap_or_else(|e| e.into_inner())
}

impl TemplateEngine {
    /// 按配置加载模板
    pub fn new(
        props: &WebProperties,
        names: Arc<RouteNameTable>,
    ) -> Result<Self, ConfigError> {
        let mut tera =
            Tera::new(&props.template_pattern).map_err(|e| ConfigError::Template(e.to_string()))?;
        register_functions(&mut tera, names);
        info!(
            "Loaded {} templates from '{}'",
            tera.get_template_names().count(),
            props.template_pattern
        );

        let tera = Arc::new(RwLock::new(tera));
        let watcher = if props.template_hot_reload {
            spawn_watcher(&props.template_pattern, tera.clone())
        } else {
            None
        };

        Ok(Self {
            tera,
            _watcher: watcher,
        })
    }

    /// 空引擎，不加载任何模板
    pub fn empty(names: Arc<RouteNameTable>) -> Self {
        let mut tera = Tera::default();
        register_functions(&mut tera, names);
        Self {
            tera: Arc::new(RwLock::new(tera)),
            _watcher: None,
        }
    }

    /// 直接注册一个模板，已存在的同名模板会被替换
    pub fn add_raw_template(&self, name: &str, content: &str) -> Result<(), ConfigError> {
        self.tera
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .add_raw_template(name, content)
            .map_err(|e| ConfigError::Template(e.to_string()))
    }

    /// 渲染模板
    pub fn render_to_string(
        &self,
        name: &str,
        context: &Map<String, Value>,
    ) -> Result<String, WebError> {
        let tera_context = tera::Context::from_serialize(context)
            .map_err(|e| WebError::Template(e.to_string()))?;
        read_guard(&self.tera)
            .render(name, &tera_context)
            .map_err(|e| WebError::Template(e.to_string()))
    }
}

fn register_functions(tera: &mut Tera, names: Arc<RouteNameTable>) {
    tera.register_function(
        "route",
        move |args: &HashMap<String, tera::Value>| -> tera::Result<tera::Value> {
            let name = args
                .get("name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| tera::Error::msg("route() requires a 'name' argument"))?;
            let mut parameters = Map::new();
            for (key, value) in args {
                if key != "name" {
                    parameters.insert(key.clone(), value.clone());
                }
            }
            Ok(tera::Value::String(
                names.reverse(name, &Value::Object(parameters)),
            ))
        },
    );
}

/// glob 模式中第一个通配符之前的目录
fn glob_root(pattern: &str) -> &Path {
    let cut = pattern
        .find(['*', '?', '['])
        .unwrap_or(pattern.len());
    let root = Path::new(&pattern[..cut]);
    if pattern[..cut].ends_with('/') || root.extension().is_none() {
        root
    } else {
        root.parent().unwrap_or(Path::new("."))
    }
}

fn spawn_watcher(pattern: &str, tera: Arc<RwLock<Tera>>) -> Option<RecommendedWatcher> {
    let root = glob_root(pattern).to_path_buf();
    let result = notify::recommended_watcher(move |event: Result<notify::Event, notify::Error>| {
        if event.is_err() {
            return;
        }
        let mut guard = tera.write().unwrap_or_else(|e| e.into_inner());
        match guard.full_reload() {
            Ok(()) => info!("Templates reloaded"),
            Err(e) => warn!("Template reload failed: {}", e),
        }
    });

    match result {
        Ok(mut watcher) => match watcher.watch(&root, RecursiveMode::Recursive) {
            Ok(()) => {
                info!("Watching templates under {:?}", root);
                Some(watcher)
            }
            Err(e) => {
                warn!("Template watch failed on {:?}: {}", root, e);
                None
            }
        },
        Err(e) => {
            warn!("Template watcher unavailable: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::HttpVerb;
    use serde_json::json;

    #[test]
    fn glob_root_stops_at_wildcard() {
        assert_eq!(glob_root("templates/**/*"), Path::new("templates/"));
        assert_eq!(glob_root("views/pages/*.html"), Path::new("views/pages/"));
    }

    #[test]
    fn route_function_reverses_registered_names() {
        let mut names = RouteNameTable::new();
        names.insert("post", HttpVerb::Get, "/posts/:id");
        let engine = TemplateEngine::empty(Arc::new(names));
        engine
            .add_raw_template("link.html", "{{ route(name=\"post\", id=7) }}")
            .unwrap();

        let html = engine.render_to_string("link.html", &Map::new()).unwrap();
        assert_eq!(html, "/posts/7");
    }

    #[test]
    fn context_values_are_available() {
        let engine = TemplateEngine::empty(Arc::new(RouteNameTable::new()));
        engine.add_raw_template("hi.html", "hello {{ name }}").unwrap();

        let mut context = Map::new();
        context.insert("name".to_string(), json!("world"));
        assert_eq!(
            engine.render_to_string("hi.html", &context).unwrap(),
            "hello world"
        );
    }
}
