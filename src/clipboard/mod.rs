//! 剪贴板访问模块
//!
//! # 设计思路
//!
//! 过滤器只依赖剪贴板的“类型化契约”：探测类型、读写文本、读写图片、
//! 图片与 PNG Base64 互转。契约抽象为 `ClipboardProvider` trait，
//! 真实实现基于 `arboard`，测试中使用内存实现。
//!
//! # 实现思路
//!
//! - 图片句柄是 trait 的关联类型 `Image`，所有权语义即资源语义：
//!   `write_image` 接收所有权，无论成功失败句柄都只在一处被释放（`Drop`）。
//! - 探测顺序与系统剪贴板惯例一致：文本优先，其次位图。
//! - `SystemClipboard` 每次操作都新建 `arboard::Clipboard`，不跨线程持有句柄。

mod system;

pub use system::SystemClipboard;

use crate::error::AppError;
use crate::types::IoKind;

/// 当前剪贴板内容类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardKind {
    None,
    Text,
    Image,
}

impl ClipboardKind {
    /// 与过滤器输入类型对应；空剪贴板没有对应类型。
    pub fn as_io_kind(self) -> Option<IoKind> {
        match self {
            Self::None => None,
            Self::Text => Some(IoKind::Text),
            Self::Image => Some(IoKind::Image),
        }
    }
}

/// 剪贴板读写契约。
pub trait ClipboardProvider: Send + Sync + 'static {
    /// 位图句柄；离开作用域即释放。
    type Image: Send;

    fn detect_type(&self) -> ClipboardKind;

    fn read_text(&self) -> Result<String, AppError>;

    /// 剪贴板中没有位图时返回 `Ok(None)`。
    fn read_image(&self) -> Result<Option<Self::Image>, AppError>;

    fn write_text(&self, text: &str) -> Result<(), AppError>;

    /// 写入图片。句柄所有权转移给本方法，失败时由本方法负责释放。
    fn write_image(&self, image: Self::Image) -> Result<(), AppError>;

    /// 位图 → PNG → Base64。
    fn encode_png_base64(&self, image: &Self::Image) -> Result<String, AppError>;

    /// Base64 → 位图。
    fn decode_base64_image(&self, b64: &str) -> Result<Self::Image, AppError>;
}
