//! Web 服务器
//!
//! 把应用和分发器装配成可运行的服务器。

use std::sync::Arc;

use axum::Router;
use tracing::info;

use crate::app::Application;
use crate::dispatch::Dispatcher;
use crate::error::ConfigError;

/// Web 服务器
pub struct WebServer {
    app: Arc<Application>,
    router: Router,
}

impl WebServer {
    /// 从编译时注册的控制器与中间件装配服务器
    pub fn build(app: Arc<Application>) -> Result<Self, ConfigError> {
        let dispatcher = Dispatcher::build(app.clone())?;
        info!("Dispatcher ready with {} routes", dispatcher.route_count());
        Ok(Self {
            router: dispatcher.into_router(),
            app,
        })
    }

    /// 使用预先构建的分发器装配服务器
    pub fn with_dispatcher(app: Arc<Application>, dispatcher: Dispatcher) -> Self {
        Self {
            router: dispatcher.into_router(),
            app,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// 绑定地址并开始服务，直到进程退出
    pub async fn run(self) -> Result<(), std::io::Error> {
        let address = self.app.properties.address();
        let listener = tokio::net::TcpListener::bind(&address).await?;
        info!("🚀 Server listening on http://{}", address);
        axum::serve(listener, self.router).await
    }
}
