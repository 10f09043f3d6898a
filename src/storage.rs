//! 配置与描述文件目录管理模块
//!
//! # 设计思路
//!
//! 统一管理三类路径：
//! - 用户配置：`<系统配置目录>/cbfilter/config.json`，不存在时自动创建目录
//! - 随程序分发的默认配置：可执行文件同目录下的 `defconf.json`
//! - provider 描述目录：默认 `<可执行文件目录>/apidef`，
//!   可由命令行 `--apidef` 或环境变量 `CBFILTER_APIDEF` 覆盖
//!
//! # 实现思路
//!
//! - 优先使用显式指定的目录，未指定时回退到默认位置。
//! - 所有可能失败的操作均返回 `Result`，不使用 `expect()` / `unwrap()`。

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;

pub const APP_DIR_NAME: &str = "cbfilter";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_CONFIG_FILE_NAME: &str = "defconf.json";
pub const APIDEF_DIR_NAME: &str = "apidef";
pub const APIDEF_ENV: &str = "CBFILTER_APIDEF";

/// 获取用户配置目录（不存在时创建）。
pub fn get_config_dir(custom_dir: Option<&Path>) -> Result<PathBuf, AppError> {
    let dir = match custom_dir {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => dirs::config_dir()
            .ok_or_else(|| AppError::Storage("获取系统配置目录失败".to_string()))?
            .join(APP_DIR_NAME),
    };

    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| {
            AppError::Storage(format!("创建配置目录 '{}' 失败: {}", dir.display(), e))
        })?;
    }
    Ok(dir)
}

/// 用户配置文件路径。
pub fn get_config_path(custom_dir: Option<&Path>) -> Result<PathBuf, AppError> {
    Ok(get_config_dir(custom_dir)?.join(CONFIG_FILE_NAME))
}

/// 可执行文件所在目录。
pub fn get_exe_dir() -> Result<PathBuf, AppError> {
    let exe = std::env::current_exe()
        .map_err(|e| AppError::Storage(format!("获取可执行文件路径失败: {}", e)))?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| AppError::Storage("可执行文件没有父目录".to_string()))
}

/// 随程序分发的默认配置路径。
pub fn get_default_config_path() -> Result<PathBuf, AppError> {
    Ok(get_exe_dir()?.join(DEFAULT_CONFIG_FILE_NAME))
}

/// provider 描述目录：显式参数 > 环境变量 > 可执行文件同级 `apidef`。
pub fn get_apidef_dir(custom_dir: Option<&Path>) -> Result<PathBuf, AppError> {
    if let Some(dir) = custom_dir.filter(|d| !d.as_os_str().is_empty()) {
        return Ok(dir.to_path_buf());
    }
    if let Some(dir) = std::env::var_os(APIDEF_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    Ok(get_exe_dir()?.join(APIDEF_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn unique_temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock error")
            .as_nanos();
        std::env::temp_dir().join(format!("cbfilter-storage-test-{nanos}"))
    }

    #[test]
    fn custom_config_dir_is_created() {
        let dir = unique_temp_dir().join("nested");
        assert!(!dir.exists());

        let path = get_config_path(Some(&dir)).expect("config path");
        assert!(dir.is_dir());
        assert_eq!(path, dir.join(CONFIG_FILE_NAME));

        let _ = fs::remove_dir_all(dir.parent().expect("parent"));
    }

    #[test]
    fn explicit_apidef_dir_wins() {
        let dir = PathBuf::from("/opt/cbfilter/apidef");
        assert_eq!(get_apidef_dir(Some(&dir)).expect("apidef dir"), dir);
    }

    #[test]
    fn default_paths_sit_next_to_executable() {
        let exe_dir = get_exe_dir().expect("exe dir");
        assert_eq!(
            get_default_config_path().expect("defconf"),
            exe_dir.join(DEFAULT_CONFIG_FILE_NAME)
        );
    }
}
