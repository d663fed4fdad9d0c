//! 控制器抽象与编译时注册
//!
//! 控制器在 `descriptor()` 中声明基础路径与全部路由，
//! 通过 [`register_controller!`](crate::register_controller) 在编译时登记，
//! 启动时由分发器统一挂载。

use std::sync::Arc;

use async_trait::async_trait;

use crate::app::Application;
use crate::dispatch::RouteTable;
use crate::error::{ConfigError, WebError};
use crate::response::WebResponse;
use crate::routing::ControllerDescriptor;

/// 控制器
#[async_trait]
pub trait Controller: Send + Sync + Sized + 'static {
    /// 构造控制器实例，每个控制器在启动时构造一次
    fn new(app: Arc<Application>) -> Self;

    /// 声明基础路径与路由
    fn descriptor() -> ControllerDescriptor<Self>;

    /// 首次命中任一路由前执行一次的异步初始化
    ///
    /// 并发请求下保证只执行一次；失败不会被缓存，下一个请求会重试。
    async fn post_construct(&self) -> Result<(), WebError> {
        Ok(())
    }

    // ==================== 响应便捷构造 ====================

    fn render(template: impl Into<String>) -> WebResponse {
        WebResponse::render(template)
    }

    fn redirect(location: impl Into<String>) -> WebResponse {
        WebResponse::redirect(location)
    }

    fn download(key: impl Into<String>, file_name: impl Into<String>) -> WebResponse {
        WebResponse::file(key).with_download_name(file_name)
    }

    fn unauthorized() -> WebResponse {
        WebResponse::Unauthorized
    }
}

/// 编译时控制器注册项
pub struct ControllerRegistration {
    pub type_name: &'static str,
    pub mount: fn(&Arc<Application>, &mut RouteTable) -> Result<(), ConfigError>,
}

inventory::collect!(ControllerRegistration);

/// 注册一个控制器
#[macro_export]
macro_rules! register_controller {
    ($ty:ty) => {
        $crate::inventory::submit! {
            $crate::controller::ControllerRegistration {
                type_name: stringify!($ty),
                mount: |app, table| table.mount::<$ty>(app),
            }
        }
    };
}
