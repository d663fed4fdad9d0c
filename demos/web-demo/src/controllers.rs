//! 示例控制器

use std::sync::Arc;

use tracing::info;
use wyvern_web::prelude::*;

/// 站点页面与公开 API
pub struct MainController {
    app: Arc<Application>,
}

#[async_trait]
impl Controller for MainController {
    fn new(app: Arc<Application>) -> Self {
        Self { app }
    }

    fn descriptor() -> ControllerDescriptor<Self> {
        ControllerDescriptor::new("/")
            .route(
                RouteBuilder::get("/")
                    .name("home")
                    .handler(|_, _, _| async {
                        Ok(Self::render("index").with("title", json!("Wyvern")))
                    }),
            )
            .route(
                RouteBuilder::get("/posts/:id([0-9]+)")
                    .name("post")
                    .handler(|_, args: RouteArgs, _| async move {
                        let id = args
                            .param(0)
                            .ok_or_else(|| WebError::not_found("post not found"))?
                            .to_string();
                        Ok(Self::render("post").with("id", json!(id)))
                    }),
            )
            .route(
                RouteBuilder::get("/api/ping")
                    .api()
                    .handler(|_, _, _| async { Ok(json!({"pong": true})) }),
            )
            .route(
                RouteBuilder::post("/api/posts")
                    .api()
                    .body(
                        "post",
                        json!({
                            "type": "object",
                            "required": ["title"],
                            "properties": {
                                "title": { "type": "string", "minLength": 1 },
                                "body": { "type": "string" }
                            }
                        }),
                    )
                    .handler(|_, args: RouteArgs, _| async move {
                        let body = args
                            .body()
                            .ok_or_else(|| WebError::Internal("missing body".into()))?;
                        if !body.is_valid() {
                            return Err(WebError::with_status(
                                422,
                                serde_json::to_string(&body.errors_map())
                                    .unwrap_or_else(|_| "invalid body".into()),
                            ));
                        }
                        info!("Creating post '{}'", body.value["title"]);
                        Ok(Payload::from(json!({ "title": body.value["title"] })))
                    }),
            )
            .route(
                RouteBuilder::post("/upload")
                    .multipart()
                    .handler(|controller: Arc<Self>, _, ctx: Ctx| async move {
                        let form = ctx
                            .form()
                            .ok_or_else(|| WebError::FormParse("expected a form".into()))?;
                        let file = form
                            .file("attachment")
                            .ok_or_else(|| WebError::FormParse("missing attachment".into()))?;
                        let key = format!(
                            "uploads/{}",
                            file.file_name.as_deref().unwrap_or("unnamed")
                        );
                        controller
                            .app
                            .files
                            .upload_file(&key, file.data.clone())
                            .await?;
                        ctx.session.flash("success", format!("Stored {}", key));
                        Ok(WebResponse::redirect("/"))
                    }),
            )
    }
}

/// 登录、登出
pub struct AuthController;

#[async_trait]
impl Controller for AuthController {
    fn new(_app: Arc<Application>) -> Self {
        AuthController
    }

    fn descriptor() -> ControllerDescriptor<Self> {
        ControllerDescriptor::new("/auth")
            .route(
                RouteBuilder::get("/login")
                    .name("login")
                    .verify(not_auth_user)
                    .handler(|_, _, _| async { Ok(WebResponse::render("login")) }),
            )
            .route(
                RouteBuilder::post("/login")
                    .handler(|_, _, ctx: Ctx| async move {
                        // 示例应用：任何访客都以演示账号登录
                        let principal = Principal {
                            id: "demo".into(),
                            name: "Demo User".into(),
                            level: 10,
                        };
                        ctx.session.set_principal(principal);
                        ctx.session.flash("success", "Welcome back");
                        Ok(Self::redirect("/backoffice"))
                    }),
            )
            .route(
                RouteBuilder::post("/logout")
                    .handler(|_, _, ctx: Ctx| async move {
                        ctx.session.clear_principal();
                        Ok(WebResponse::redirect("/"))
                    }),
            )
    }
}

/// 登录后才能访问的后台
pub struct BackofficeController;

#[async_trait]
impl Controller for BackofficeController {
    fn new(_app: Arc<Application>) -> Self {
        BackofficeController
    }

    async fn post_construct(&self) -> Result<(), WebError> {
        info!("Backoffice warmed up");
        Ok(())
    }

    fn descriptor() -> ControllerDescriptor<Self> {
        ControllerDescriptor::new("/backoffice")
            .route(
                RouteBuilder::get("/")
                    .name("backoffice")
                    .verify(auth_user)
                    .handler(|_, _, _| async { Ok(WebResponse::render("backoffice")) }),
            )
            .route(
                RouteBuilder::get("/admin-only")
                    .verify(auth_user)
                    .verify(min_level(100))
                    .handler(|_, _, _| async { Ok(WebResponse::render("backoffice")) }),
            )
    }
}

register_controller!(MainController);
register_controller!(AuthController);
register_controller!(BackofficeController);
