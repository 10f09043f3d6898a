//! # 过滤器执行模块（filter）
//!
//! ## 设计思路
//!
//! 一次过滤器调用的状态机：Idle → Running → {Completed, Failed}。
//!
//! - `invoke`：同步执行完整链路（模板选择 → 读剪贴板 → 请求 → 提取 → 写回）
//! - `runner`：单飞调度，把 `invoke` 放到专用工作线程，并把结果作为事件投递回发起方
//! - `events`：发起方收到的事件
//!
//! ## 共享状态
//!
//! 模型 / 过滤器 / provider 集合只由发起方（`AppState`）修改。
//! 工作线程只读取调用开始时捕获的 `InvocationSnapshot`，因此不需要加锁。

mod events;
mod invoke;
mod runner;

pub use events::FilterEvent;
pub use invoke::{ApiCallResult, call_template, image_data_url, run_filter, system_prompt, user_prompt};
pub use runner::{FilterRunner, Progress, TriggerOutcome};

use crate::error::AppError;
use crate::template::TemplateRegistry;
use crate::types::{FilterDefinition, IoKind, ModelConfig};

/// 调用开始时捕获的只读快照。
#[derive(Debug, Clone)]
pub struct InvocationSnapshot {
    pub filter: FilterDefinition,
    pub model: ModelConfig,
    pub registry: TemplateRegistry,
}

/// 过滤器调用失败原因。
///
/// 分为解析失败（未发起网络请求）、剪贴板输入失败、网络失败、提取失败、写回失败。
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("过滤器不存在: {0}")]
    NoFilter(usize),

    #[error("没有已配置的模型")]
    NoModel,

    #[error("没有匹配的模板: {input}-{output}")]
    NoMatchingTemplate { input: IoKind, output: IoKind },

    #[error("请求准备失败: {0}")]
    Request(AppError),

    #[error("剪贴板中没有文本")]
    EmptyText,

    #[error("剪贴板中没有图片")]
    NoImage,

    #[error("读取剪贴板失败: {0}")]
    ClipboardRead(AppError),

    #[error("图片编码失败: {0}")]
    ImageEncode(AppError),

    #[error("{0}")]
    Transport(AppError),

    #[error("响应中没有可用结果")]
    EmptyResult,

    #[error("图片结果解码失败: {0}")]
    ImageDecode(AppError),

    #[error("写入剪贴板失败: {0}")]
    ClipboardWrite(AppError),

    #[error("无法启动工作线程: {0}")]
    Spawn(String),

    #[error("工作线程异常退出")]
    WorkerPanicked,
}

impl FilterError {
    /// 是否在发起网络请求之前失败。
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::NoFilter(_) | Self::NoModel | Self::NoMatchingTemplate { .. } | Self::Request(_)
        )
    }
}
