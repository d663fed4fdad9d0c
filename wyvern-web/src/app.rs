//! 应用对象
//!
//! [`Application`] 聚合配置与可替换组件（模板、会话、文件、邮件、
//! API 信封、错误控制器），以 `Arc` 注入每个控制器与中间件。

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::api::{ApiResponseWrapper, DefaultApiResponseWrapper};
use crate::config::WebProperties;
use crate::error::ConfigError;
use crate::error_controller::{DefaultErrorController, ErrorController};
use crate::files::{FileStore, LocalFileStore};
use crate::mail::{LogMailClient, MailClient};
use crate::session::SessionStore;
use crate::template::TemplateEngine;
use crate::urls::RouteNameTable;

/// 应用对象
pub struct Application {
    pub properties: WebProperties,
    /// 路由名称表，挂载期填充
    pub names: Arc<RouteNameTable>,
    pub templates: TemplateEngine,
    pub sessions: SessionStore,
    pub files: Arc<dyn FileStore>,
    pub mailer: Arc<dyn MailClient>,
    pub api_wrapper: Arc<dyn ApiResponseWrapper>,
    pub error_controller: Arc<dyn ErrorController>,
}

impl Application {
    pub fn builder(properties: WebProperties) -> ApplicationBuilder {
        ApplicationBuilder::new(properties)
    }

    /// 按名称生成 URL
    pub fn reverse(&self, name: &str, parameters: &Value) -> String {
        self.names.reverse(name, parameters)
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        let properties = WebProperties::default();
        let names = Arc::new(RouteNameTable::new());
        Self {
            sessions: SessionStore::new(
                properties.session_cookie.clone(),
                Duration::from_secs(properties.session_ttl_secs),
            ),
            files: Arc::new(LocalFileStore::new(properties.storage_root.clone())),
            mailer: Arc::new(LogMailClient),
            api_wrapper: Arc::new(DefaultApiResponseWrapper),
            error_controller: Arc::new(DefaultErrorController::new(false)),
            templates: TemplateEngine::empty(names.clone()),
            names,
            properties,
        }
    }
}

/// 应用构建器，所有组件均可替换
pub struct ApplicationBuilder {
    properties: WebProperties,
    files: Option<Arc<dyn FileStore>>,
    mailer: Option<Arc<dyn MailClient>>,
    api_wrapper: Option<Arc<dyn ApiResponseWrapper>>,
    error_controller: Option<Arc<dyn ErrorController>>,
}

impl ApplicationBuilder {
    pub fn new(properties: WebProperties) -> Self {
        Self {
            properties,
            files: None,
            mailer: None,
            api_wrapper: None,
            error_controller: None,
        }
    }

    pub fn with_files(mut self, files: Arc<dyn FileStore>) -> Self {
        self.files = Some(files);
        self
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn MailClient>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn with_api_wrapper(mut self, wrapper: Arc<dyn ApiResponseWrapper>) -> Self {
        self.api_wrapper = Some(wrapper);
        self
    }

    pub fn with_error_controller(mut self, controller: Arc<dyn ErrorController>) -> Self {
        self.error_controller = Some(controller);
        self
    }

    /// 构建应用，加载模板
    pub fn build(self) -> Result<Arc<Application>, ConfigError> {
        let names = Arc::new(RouteNameTable::new());
        let templates = TemplateEngine::new(&self.properties, names.clone())?;
        let sessions = SessionStore::new(
            self.properties.session_cookie.clone(),
            Duration::from_secs(self.properties.session_ttl_secs),
        );
        let production = self.properties.production;
        Ok(Arc::new(Application {
            files: self
                .files
                .unwrap_or_else(|| Arc::new(LocalFileStore::new(self.properties.storage_root.clone()))),
            mailer: self.mailer.unwrap_or_else(|| Arc::new(LogMailClient)),
            api_wrapper: self
                .api_wrapper
                .unwrap_or_else(|| Arc::new(DefaultApiResponseWrapper)),
            error_controller: self
                .error_controller
                .unwrap_or_else(|| Arc::new(DefaultErrorController::new(production))),
            sessions,
            templates,
            names,
            properties: self.properties,
        }))
    }
}
