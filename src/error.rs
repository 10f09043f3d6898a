//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，替代各模块中分散的
//! `.map_err(|e| e.to_string())`、`format!(...)`、`expect()` 等不一致模式。
//!
//! 过滤器执行链路另有 `FilterError`（见 `filter` 模块），
//! 其分支与失败分类（解析 / 输入 / 网络 / 提取 / 写回）一一对应。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `std::io::Error`、`serde_json::Error` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，便于上层以 JSON 形式展示。

use serde::Serialize;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 剪贴板读写操作失败
    #[error("剪贴板操作失败: {0}")]
    Clipboard(String),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 解析 / 序列化失败
    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 配置目录不可用
    #[error("存储目录不可用: {0}")]
    Storage(String),

    /// 配置内容非法
    #[error("配置错误: {0}")]
    Config(String),

    /// 接口模板定义非法
    #[error("模板错误: {0}")]
    Template(String),

    /// 服务端地址无法解析
    #[error("端点解析失败: {0}")]
    Endpoint(String),

    /// 网络请求失败（连接 / 发送 / 非 2xx 状态）
    #[error("网络请求失败: {0}")]
    Transport(String),

    /// 响应中找不到可用字段
    #[error("响应解析失败: {0}")]
    Extraction(String),

    /// 密钥加解密失败
    #[error("密钥保护失败: {0}")]
    Credential(String),

    /// 过滤器调用以失败结束
    #[error("过滤器执行失败: {0}")]
    Filter(String),

    /// 输入模拟失败
    #[error("输入模拟失败: {0}")]
    Input(String),
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
