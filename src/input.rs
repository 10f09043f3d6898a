//! 粘贴模拟
//!
//! 过滤器完成后，结果已经写回剪贴板，这里只负责向当前前台窗口发送粘贴组合键：
//! macOS 使用 `Cmd+V`，其余平台使用 `Ctrl+V`。

use std::time::Duration;

use enigo::{
    Direction::{Click, Press, Release},
    Enigo, Key, Keyboard, Settings,
};

use crate::error::AppError;

/// 发送粘贴按键前的等待时间，给前台窗口恢复焦点留出余地。
pub const PASTE_DELAY: Duration = Duration::from_millis(150);

#[cfg(target_os = "macos")]
const PASTE_MODIFIER: Key = Key::Meta;
#[cfg(not(target_os = "macos"))]
const PASTE_MODIFIER: Key = Key::Control;

/// 模拟一次粘贴。
pub fn paste_clipboard(delay: Duration) -> Result<(), AppError> {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }

    let mut enigo = Enigo::new(&Settings::default())
        .map_err(|e| AppError::Input(format!("初始化输入模拟失败: {}", e)))?;

    let result = enigo
        .key(PASTE_MODIFIER, Press)
        .and_then(|_| enigo.key(Key::Unicode('v'), Click));
    // 无论组合键是否成功都要松开修饰键
    let released = enigo.key(PASTE_MODIFIER, Release);

    result
        .and(released)
        .map_err(|e| AppError::Input(format!("模拟粘贴按键失败: {}", e)))?;

    log::debug!("📋 已模拟粘贴");
    Ok(())
}
