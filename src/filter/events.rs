//! 投递回发起方的过滤器事件

use std::time::Duration;

use crate::types::IoKind;

/// 工作线程 → 发起方的通知。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterEvent {
    /// 工作线程已启动。
    Started { title: String },
    /// 已有调用在执行：发起方应把进度界面提到前台，而不是开始新调用。
    AlreadyRunning { title: String, elapsed: Duration },
    /// 剪贴板已替换：发起方应恢复原焦点窗口并模拟粘贴。
    Completed { title: String, output: IoKind },
    /// 调用失败：发起方应提示用户，剪贴板保持原样。
    Failed { title: String, reason: String },
}

impl FilterEvent {
    pub fn title(&self) -> &str {
        match self {
            Self::Started { title }
            | Self::AlreadyRunning { title, .. }
            | Self::Completed { title, .. }
            | Self::Failed { title, .. } => title,
        }
    }

    /// 是否为一次调用的终止事件。
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}
