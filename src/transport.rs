//! HTTP 传输层
//!
//! # 设计思路
//!
//! 过滤器在独立的工作线程中执行，整个调用链是同步的。
//! `Transport` trait 只暴露一个阻塞式 `send`，测试中用内存实现替换。
//!
//! # 实现思路
//!
//! `HttpTransport` 在调用线程上临时创建 current-thread tokio 运行时，
//! 用异步 `reqwest::Client` 发送请求并等待结果，
//! 避免在已有运行时内部构造阻塞客户端。

use std::time::Duration;

use crate::error::AppError;
use crate::request::{HttpRequest, Method};

/// 发送一次请求并返回响应文本；连接 / 发送失败或非 2xx 状态均为错误。
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<String, AppError>;
}

/// 传输层参数。
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(120),
            user_agent: format!("cbfilter/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// 基于 reqwest 的真实网络实现。
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    config: TransportConfig,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    async fn send_async(&self, request: &HttpRequest) -> Result<String, AppError> {
        let client = reqwest::Client::builder()
            .connect_timeout(self.config.connect_timeout)
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent.clone())
            .build()
            .map_err(|e| AppError::Transport(format!("无法创建 HTTP 客户端：{}", e)))?;

        let url = request.url();
        let mut builder = match request.method {
            Method::Get => client.get(&url),
            Method::Post => client.post(&url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Transport(format!("读取响应失败：{}", e)))?;

        if !status.is_success() {
            log::warn!(
                "🌐 HTTP {} - {}",
                status.as_u16(),
                truncate_for_log(&text, 512)
            );
            return Err(AppError::Transport(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status_message(status.as_u16())
            )));
        }

        Ok(text)
    }

    fn map_reqwest_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Transport(format!("请求超时（{}秒）", self.config.timeout.as_secs()))
        } else if e.is_connect() {
            AppError::Transport(format!("无法连接：{}", e))
        } else {
            AppError::Transport(format!("请求失败：{}", e))
        }
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &HttpRequest) -> Result<String, AppError> {
        log::info!(
            "🌐 {} {}{}",
            request.method.as_str(),
            request.endpoint.host,
            request.endpoint.path
        );
        log::debug!("📤 请求体: {}", String::from_utf8_lossy(&request.body));

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AppError::Transport(format!("无法创建异步运行时：{}", e)))?;

        runtime.block_on(self.send_async(request))
    }
}

fn status_message(code: u16) -> &'static str {
    match code {
        400 => "请求无效",
        401 => "未授权",
        403 => "访问被拒绝",
        404 => "未找到",
        429 => "请求过于频繁",
        500..=599 => "服务器错误",
        _ => "请求失败",
    }
}

/// 按字符数截断日志文本。
pub(crate) fn truncate_for_log(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((pos, _)) => format!("{}…", &text[..pos]),
        None => text.to_string(),
    }
}
