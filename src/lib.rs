//! # 剪贴板 AI 过滤器 — 库入口
//!
//! 把剪贴板中的文本或图片交给 AI 接口处理（翻译、改写、生成图片等），
//! 再把结果写回剪贴板并模拟粘贴。
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    main (clap CLI)                       │
//! │   list / run / models / setup / providers                │
//! └───────┬──────────────────────────────────────────────────┘
//!         │  FilterEvent (tokio mpsc)
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕                                                  │
//! │  ┌─ state ────── AppState：模型 / 过滤器 / provider       │
//! │  │                                                       │
//! │  ├─ filter ───── 单飞调度 + 工作线程                      │
//! │  │   ├─ invoke         模板选择 → 请求 → 提取 → 写回       │
//! │  │   └─ runner         RunningGuard (RAII)                │
//! │  │                                                       │
//! │  ├─ template           apidef/*.json 描述文件              │
//! │  ├─ request            占位符 · 端点 · 请求体              │
//! │  ├─ extract            响应字段提取回退链                  │
//! │  ├─ transport          reqwest 发送                        │
//! │  ├─ clipboard          arboard 读写                        │
//! │  ├─ credential         API key 加密保存                    │
//! │  ├─ config / storage   config.json 与目录                  │
//! │  ├─ setup              模型发现与首次设置                  │
//! │  └─ input              粘贴模拟 (enigo)                    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`types`] | `IoKind`、`ModelConfig`、`FilterDefinition` |
//! | [`template`] | provider 描述文件解析与模板查找 |
//! | [`request`] | 占位符替换、端点解析、请求头 / 请求体构建 |
//! | [`extract`] | 从响应 JSON 中提取文本或 base64 图片 |
//! | [`transport`] | `Transport` 契约与 HTTP 实现 |
//! | [`clipboard`] | `ClipboardProvider` 契约与系统剪贴板实现 |
//! | [`filter`] | 一次过滤器调用的执行与单飞调度 |
//! | [`credential`] | API key 的加密与解密 |
//! | [`config`] | 配置文档读写与默认值 |
//! | [`storage`] | 配置目录、默认配置、描述文件目录 |
//! | [`state`] | 发起方持有的可变状态与编辑操作 |
//! | [`setup`] | 拉取模型列表并按模式挑选 |
//! | [`input`] | 模拟粘贴按键 |

pub mod error;
pub mod types;
pub mod template;
pub mod request;
pub mod extract;
pub mod transport;
pub mod clipboard;
pub mod filter;
pub mod credential;
pub mod config;
pub mod storage;
pub mod state;
pub mod setup;
pub mod input;
