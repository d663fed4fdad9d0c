//! Wyvern Web 示例应用
//!
//! 演示控制器注册、页面渲染、API 路由、登录校验与文件上传。

mod controllers;
mod middleware;

use wyvern_web::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    LoggingConfig::from_env().init()?;

    let properties = WebProperties::from_env();
    let app = Application::builder(properties).build()?;

    WebServer::build(app)?.run().await?;
    Ok(())
}
