//! # 接口模板模块（template）
//!
//! ## 设计思路
//!
//! 每个 provider 描述文件（`apidef/<provider>.json`）声明若干
//! `<input>-<output>` 模板，模板是纯数据：端点、结果路径、请求头与负载模板。
//! 本模块只负责“解析 + 索引”，不做任何网络 I/O。
//!
//! - `descriptor`：单个描述文件 → `Provider`
//! - `registry`：目录加载、按 id / IO 类型查找
//!
//! ## 描述文件示例
//!
//! ```json
//! {
//!   "default-endpoint": "https://api.openai.com/v1",
//!   "models": { "endpoint": "/models", "headers": { "Authorization": "Bearer <<api_key>>" } },
//!   "text-text": {
//!     "endpoint": "/chat/completions",
//!     "result": "choices[0].message.content",
//!     "headers": { "Content-Type": "application/json" },
//!     "payload": { "model": "<<model>>" }
//!   }
//! }
//! ```

mod descriptor;
mod registry;

pub use descriptor::parse_provider;
pub use registry::TemplateRegistry;

use crate::types::IoKind;

/// 单次 (input, output) 调用的请求配方。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// 声明键，形如 `text-image`。
    pub id: String,
    pub provider_id: String,
    pub input: IoKind,
    pub output: IoKind,
    /// 路径片段或绝对 URL，可含占位符。
    pub endpoint: String,
    /// 点分 / 数组下标路径，可为空。
    pub result_path: String,
    /// 按声明顺序保存的 (名称, 值模板)。
    pub headers: Vec<(String, String)>,
    /// 带占位符的 JSON 文本，可为空。
    pub payload: String,
}

/// 模型列表查询描述（`models` 节点）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelsDescriptor {
    pub endpoint: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub payload: String,
    pub result_path: String,
}

/// 一个 AI 服务商的配置集合。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    pub id: String,
    pub default_endpoint: String,
    pub templates: Vec<Template>,
    pub models: Option<ModelsDescriptor>,
}

impl Provider {
    /// 按 IO 类型查找模板，返回第一个匹配项。
    pub fn find_template_by_io(&self, input: IoKind, output: IoKind) -> Option<&Template> {
        self.templates
            .iter()
            .find(|t| t.input == input && t.output == output)
    }
}
