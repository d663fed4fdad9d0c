//! 邮件发送
//!
//! 框架只定义 [`MailClient`] 抽象，默认实现 [`LogMailClient`]
//! 把邮件打到日志，供开发环境与测试使用。

use async_trait::async_trait;
use tracing::info;

use crate::error::WebError;

/// 一封待发送的邮件
#[derive(Debug, Clone)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    /// 纯文本正文
    pub text: String,
    /// 可选 HTML 正文
    pub html: Option<String>,
}

/// 邮件客户端
#[async_trait]
pub trait MailClient: Send + Sync {
    async fn send_raw_mail(&self, mail: Mail) -> Result<(), WebError>;
}

/// 仅记录日志的邮件客户端
#[derive(Debug, Default)]
pub struct LogMailClient;

#[async_trait]
impl MailClient for LogMailClient {
    async fn send_raw_mail(&self, mail: Mail) -> Result<(), WebError> {
        info!(
            "Mail to {}: {} ({} bytes{})",
            mail.to,
            mail.subject,
            mail.text.len(),
            if mail.html.is_some() { ", html" } else { "" }
        );
        Ok(())
    }
}
