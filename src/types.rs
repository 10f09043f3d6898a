//! 领域数据模型
//!
//! - `IoKind`：过滤器 / 模板的输入输出类型（文本或图片）
//! - `ModelConfig`：用户配置的模型端点（内存中持有明文密钥）
//! - `FilterDefinition`：用户定义的剪贴板转换过滤器

use std::fmt;

use serde::{Deserialize, Serialize};

/// 输入 / 输出类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum IoKind {
    Text,
    Image,
}

impl IoKind {
    /// 宽松解析：仅 `image`（不区分大小写）视为图片，其余一律按文本处理。
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("image") {
            Self::Image
        } else {
            Self::Text
        }
    }

    /// 稳定的配置字符串。
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

impl From<String> for IoKind {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<IoKind> for &'static str {
    fn from(value: IoKind) -> Self {
        value.as_str()
    }
}

impl fmt::Display for IoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 用户配置的模型端点。
///
/// `api_key` 在内存中始终为明文，落盘时经 `credential::protect` 加密。
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ModelConfig {
    pub name: String,
    pub server_url: String,
    pub model_name: String,
    pub api_key: String,
    pub provider_id: String,
}

impl ModelConfig {
    pub fn new(
        name: impl Into<String>,
        server_url: impl Into<String>,
        model_name: impl Into<String>,
        api_key: impl Into<String>,
        provider_id: &str,
    ) -> Self {
        Self {
            name: name.into(),
            server_url: server_url.into(),
            model_name: model_name.into(),
            api_key: api_key.into(),
            provider_id: normalize_provider_id(provider_id),
        }
    }
}

// 避免密钥出现在日志中
impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("name", &self.name)
            .field("server_url", &self.server_url)
            .field("model_name", &self.model_name)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("provider_id", &self.provider_id)
            .finish()
    }
}

/// 剪贴板过滤器定义。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDefinition {
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_io_kind")]
    pub input: IoKind,
    #[serde(default = "default_io_kind")]
    pub output: IoKind,
    #[serde(default)]
    pub model_index: usize,
    #[serde(default)]
    pub prompt: String,
}

fn default_io_kind() -> IoKind {
    IoKind::Text
}

impl FilterDefinition {
    pub fn new(
        title: impl Into<String>,
        input: IoKind,
        output: IoKind,
        model_index: usize,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            input,
            output,
            model_index,
            prompt: prompt.into(),
        }
    }
}

/// 规范化 provider id：在第一个 `-` 处截断。
///
/// 旧版本配置中的 id 形如 `OpenAI-text-text`，截断后得到 `OpenAI`。
/// 含 `-` 的 provider 名因此无法区分。
pub fn normalize_provider_id(raw: &str) -> String {
    match raw.find('-') {
        Some(pos) => raw[..pos].to_string(),
        None => raw.to_string(),
    }
}
