//! Provider 注册表
//!
//! 目录中每个 `*.json` 文件对应一个 provider（id 取文件名主干）。
//! 单个文件解析失败只记录日志并跳过，不影响其余文件。

use std::fs;
use std::path::Path;

use super::{Provider, Template, parse_provider};
use crate::error::AppError;
use crate::types::IoKind;

/// 已加载的 provider 集合（按文件名排序，查找均按此顺序进行）。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateRegistry {
    providers: Vec<Provider>,
}

impl TemplateRegistry {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    /// 从目录加载全部描述文件。
    ///
    /// 仅当目录本身无法读取时返回错误。
    pub fn load(dir: &Path) -> Result<Self, AppError> {
        let entries = fs::read_dir(dir).map_err(|e| {
            AppError::Storage(format!("读取模板目录 '{}' 失败: {}", dir.display(), e))
        })?;

        let mut paths: Vec<_> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
            })
            .collect();
        paths.sort();

        let mut providers = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(id) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };

            let text = match fs::read_to_string(&path) {
                Ok(text) if !text.trim().is_empty() => text,
                Ok(_) => {
                    log::warn!("📄 模板文件为空，跳过: {}", path.display());
                    continue;
                }
                Err(err) => {
                    log::warn!("📄 读取模板文件失败，跳过: {} ({})", path.display(), err);
                    continue;
                }
            };

            match parse_provider(&id, &text) {
                Ok(provider) => {
                    log::debug!(
                        "📄 已加载 provider '{}'（{} 个模板）",
                        provider.id,
                        provider.templates.len()
                    );
                    providers.push(provider);
                }
                Err(err) => {
                    log::warn!("📄 解析模板文件失败，跳过: {} ({})", path.display(), err);
                }
            }
        }

        log::info!("📚 模板加载完成：{} 个 provider", providers.len());
        Ok(Self { providers })
    }

    /// 整体替换为新加载的集合；新集合为空时保留旧数据。
    pub fn replace_with(&mut self, other: TemplateRegistry) -> bool {
        if other.is_empty() {
            log::warn!("📚 重新加载得到空的 provider 集合，保留现有 {} 个", self.providers.len());
            return false;
        }
        self.providers = other.providers;
        true
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn first_provider(&self) -> Option<&Provider> {
        self.providers.first()
    }

    pub fn find_provider_by_id(&self, id: &str) -> Option<&Provider> {
        self.providers.iter().find(|p| p.id == id)
    }

    pub fn find_template_by_id(&self, id: &str) -> Option<&Template> {
        self.providers
            .iter()
            .flat_map(|p| p.templates.iter())
            .find(|t| t.id == id)
    }

    /// 在指定 provider 内按 IO 类型查找。
    pub fn find_template_by_io(
        &self,
        provider_id: &str,
        input: IoKind,
        output: IoKind,
    ) -> Option<&Template> {
        self.find_provider_by_id(provider_id)
            .and_then(|p| p.find_template_by_io(input, output))
    }

    /// 跨 provider 查找：按加载顺序返回第一个匹配模板。
    pub fn find_template_any(&self, input: IoKind, output: IoKind) -> Option<&Template> {
        self.providers
            .iter()
            .find_map(|p| p.find_template_by_io(input, output))
    }

    /// 为模型选择 provider：id 无法解析时退回第一个 provider。
    pub fn resolve_provider(&self, provider_id: &str) -> Option<&Provider> {
        self.find_provider_by_id(provider_id)
            .or_else(|| self.first_provider())
    }

    /// 为过滤器选择模板：先查 provider 自身，再跨 provider 兜底。
    pub fn resolve_template(
        &self,
        provider_id: &str,
        input: IoKind,
        output: IoKind,
    ) -> Option<&Template> {
        self.resolve_provider(provider_id)
            .and_then(|p| p.find_template_by_io(input, output))
            .or_else(|| self.find_template_any(input, output))
    }
}
