//! 用户配置读写
//!
//! # 设计思路
//!
//! 配置来源按优先级回退：用户 `config.json` → 随程序分发的 `defconf.json` → 内置默认值。
//! 加载永不失败：文件缺失或格式错误只记录日志，使用下一级来源。
//!
//! # 实现思路
//!
//! - 在内置默认值之上“叠加”文档内容：文档中的空列表不覆盖默认值。
//! - 名称为空的模型、标题为空的过滤器被丢弃；非对象条目被跳过。
//! - `providerId` 规范化（截断到第一个 `-`），为空时补为第一个已加载的 provider。
//! - 过滤器逐字段宽松读取；`modelIndex` 为负数、小数或非数字时与越界同样重置为 0。
//! - 密钥在读入时解密、写出时加密；加密失败时退回明文保存，避免丢失密钥。
//! - 持久化通过 `ConfigStore` trait 抽象，`AppState` 只依赖该 trait。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::credential;
use crate::error::AppError;
use crate::types::{FilterDefinition, IoKind, ModelConfig, normalize_provider_id};

/// Windows 热键修饰键位（与 `RegisterHotKey` 的取值一致）。
pub const MOD_ALT: u32 = 0x0001;
pub const MOD_CONTROL: u32 = 0x0002;
pub const MOD_SHIFT: u32 = 0x0004;
pub const MOD_WIN: u32 = 0x0008;

/// 全局热键。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotkey {
    pub modifiers: u32,
    pub key: u32,
}

impl Default for Hotkey {
    fn default() -> Self {
        Self {
            modifiers: MOD_WIN | MOD_ALT,
            key: u32::from(b'V'),
        }
    }
}

impl Hotkey {
    /// 形如 `Win+Alt+V` 的显示文本。
    pub fn display(&self) -> String {
        let mut parts = Vec::new();
        for (bit, name) in [
            (MOD_CONTROL, "Ctrl"),
            (MOD_SHIFT, "Shift"),
            (MOD_ALT, "Alt"),
            (MOD_WIN, "Win"),
        ] {
            if self.modifiers & bit != 0 {
                parts.push(name.to_string());
            }
        }
        match char::from_u32(self.key).filter(|c| c.is_ascii_alphanumeric()) {
            Some(c) => parts.push(c.to_string()),
            None => parts.push(format!("0x{:02X}", self.key)),
        }
        parts.join("+")
    }
}

/// 内存中的完整配置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub language: String,
    pub hotkey: Hotkey,
    pub models: Vec<ModelConfig>,
    pub filters: Vec<FilterDefinition>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            hotkey: Hotkey::default(),
            models: vec![ModelConfig::new(
                "Translate",
                "https://api.openai.com/v1",
                "gpt-5.1",
                "",
                "OpenAI",
            )],
            filters: vec![FilterDefinition::new(
                "Translate",
                IoKind::Text,
                IoKind::Text,
                0,
                "Translate into English.",
            )],
        }
    }
}

impl AppConfig {
    /// 为空 `providerId` 补默认 provider，并修正越界的 `modelIndex`。
    pub fn normalize(&mut self, first_provider: Option<&str>) {
        if let Some(first) = first_provider {
            for model in self.models.iter_mut().filter(|m| m.provider_id.is_empty()) {
                model.provider_id = first.to_string();
            }
        }
        let model_count = self.models.len();
        for filter in self.filters.iter_mut() {
            if filter.model_index >= model_count {
                filter.model_index = 0;
            }
        }
    }
}

/// 落盘的模型条目（密钥为加密形式）。
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoredModel {
    name: String,
    server_url: String,
    model_name: String,
    provider_id: String,
    api_key: String,
}

impl From<StoredModel> for ModelConfig {
    fn from(stored: StoredModel) -> Self {
        ModelConfig::new(
            stored.name,
            stored.server_url,
            stored.model_name,
            credential::unprotect(&stored.api_key),
            &stored.provider_id,
        )
    }
}

impl From<&ModelConfig> for StoredModel {
    fn from(model: &ModelConfig) -> Self {
        let mut api_key = credential::protect(&model.api_key);
        if api_key.is_empty() && !model.api_key.is_empty() {
            log::warn!("🔐 密钥加密失败，模型 '{}' 的密钥以明文保存", model.name);
            api_key = model.api_key.clone();
        }
        Self {
            name: model.name.clone(),
            server_url: model.server_url.clone(),
            model_name: model.model_name.clone(),
            provider_id: model.provider_id.clone(),
            api_key,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredConfig<'a> {
    language: &'a str,
    hotkey: Hotkey,
    models: Vec<StoredModel>,
    filters: &'a [FilterDefinition],
}

fn as_u32(value: Option<&Value>) -> Option<u32> {
    let value = value?;
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
        .and_then(|n| u32::try_from(n).ok())
}

/// 无法解析的 `modelIndex`；`normalize` 会把它重置为 0。
const INVALID_MODEL_INDEX: usize = usize::MAX;

/// 宽松读取 `modelIndex`：缺失为 0，负数、小数或非数字视为越界。
fn as_model_index(value: Option<&Value>) -> usize {
    let Some(value) = value else {
        return 0;
    };
    if let Some(n) = value.as_u64() {
        return usize::try_from(n).unwrap_or(INVALID_MODEL_INDEX);
    }
    match value.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => f as usize,
        _ => INVALID_MODEL_INDEX,
    }
}

fn str_field<'a>(obj: &'a serde_json::Map<String, Value>, key: &str) -> &'a str {
    obj.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// 逐字段读取单个过滤器；字段类型不符时使用默认值，而不是丢弃整个条目。
fn filter_from_value(item: &Value) -> Option<FilterDefinition> {
    let obj = item.as_object()?;
    let title = str_field(obj, "title");
    if title.is_empty() {
        return None;
    }
    Some(FilterDefinition::new(
        title,
        IoKind::parse(str_field(obj, "input")),
        IoKind::parse(str_field(obj, "output")),
        as_model_index(obj.get("modelIndex")),
        str_field(obj, "prompt"),
    ))
}

/// 从文档读取过滤器列表；没有有效条目时返回 `None`。
pub fn filters_from_document(doc: &Value) -> Option<Vec<FilterDefinition>> {
    let items = doc.get("filters")?.as_array()?;
    let filters: Vec<FilterDefinition> = items.iter().filter_map(filter_from_value).collect();
    (!filters.is_empty()).then_some(filters)
}

fn models_from_document(doc: &Value) -> Option<Vec<ModelConfig>> {
    let items = doc.get("models")?.as_array()?;
    let models: Vec<ModelConfig> = items
        .iter()
        .filter(|item| item.is_object())
        .filter_map(|item| match serde_json::from_value::<StoredModel>(item.clone()) {
            Ok(stored) => Some(ModelConfig::from(stored)),
            Err(err) => {
                log::warn!("⚙️ 跳过无效的模型条目: {}", err);
                None
            }
        })
        .filter(|m| !m.name.is_empty())
        .collect();
    (!models.is_empty()).then_some(models)
}

/// 把文档内容叠加到 `base` 上。
pub fn apply_document(mut base: AppConfig, doc: &Value) -> AppConfig {
    if let Some(language) = doc.get("language").and_then(Value::as_str) {
        base.language = language.to_string();
    }
    if let Some(hotkey) = doc.get("hotkey").filter(|h| h.is_object()) {
        if let Some(modifiers) = as_u32(hotkey.get("modifiers")) {
            base.hotkey.modifiers = modifiers;
        }
        if let Some(key) = as_u32(hotkey.get("key")) {
            base.hotkey.key = key;
        }
    }
    if let Some(models) = models_from_document(doc) {
        base.models = models;
    }
    if let Some(filters) = filters_from_document(doc) {
        base.filters = filters;
    }
    base
}

/// 序列化为落盘文档（密钥加密）。
pub fn to_document(config: &AppConfig) -> Result<String, AppError> {
    let stored = StoredConfig {
        language: &config.language,
        hotkey: config.hotkey,
        models: config.models.iter().map(StoredModel::from).collect(),
        filters: &config.filters,
    };
    Ok(serde_json::to_string_pretty(&stored)?)
}

fn read_document(path: &Path) -> Option<Value> {
    let text = match fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            log::warn!("⚙️ 配置文件为空: {}", path.display());
            return None;
        }
        Err(err) => {
            log::debug!("⚙️ 无法读取配置文件 {}: {}", path.display(), err);
            return None;
        }
    };
    match serde_json::from_str::<Value>(&text) {
        Ok(doc) if doc.is_object() => Some(doc),
        Ok(_) => {
            log::warn!("⚙️ 配置文件顶层不是对象: {}", path.display());
            None
        }
        Err(err) => {
            log::warn!("⚙️ 配置文件解析失败 {}: {}", path.display(), err);
            None
        }
    }
}

/// 配置持久化。
pub trait ConfigStore: Send {
    /// 加载配置；永不失败。
    fn load(&self, first_provider: Option<&str>) -> AppConfig;

    /// 随程序分发的默认配置（首次设置时用于恢复默认过滤器）。
    fn default_config(&self) -> AppConfig;

    fn save(&self, config: &AppConfig) -> Result<(), AppError>;
}

/// 基于 JSON 文件的配置存储。
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    config_path: PathBuf,
    default_config_path: Option<PathBuf>,
}

impl FileConfigStore {
    pub fn new(config_path: PathBuf, default_config_path: Option<PathBuf>) -> Self {
        Self {
            config_path,
            default_config_path,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self, first_provider: Option<&str>) -> AppConfig {
        let mut config = match read_document(&self.config_path) {
            Some(doc) => {
                log::info!("⚙️ 已加载配置: {}", self.config_path.display());
                apply_document(AppConfig::default(), &doc)
            }
            None => self.default_config(),
        };
        config.normalize(first_provider);
        config
    }

    fn default_config(&self) -> AppConfig {
        let doc = self.default_config_path.as_deref().and_then(read_document);
        match doc {
            Some(doc) => apply_document(AppConfig::default(), &doc),
            None => {
                log::info!("⚙️ 使用内置默认配置");
                AppConfig::default()
            }
        }
    }

    fn save(&self, config: &AppConfig) -> Result<(), AppError> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Storage(format!("创建配置目录 '{}' 失败: {}", parent.display(), e))
            })?;
        }
        let text = to_document(config)?;
        fs::write(&self.config_path, text).map_err(|e| {
            AppError::Storage(format!(
                "写入配置文件 '{}' 失败: {}",
                self.config_path.display(),
                e
            ))
        })?;
        log::debug!("💾 配置已保存: {}", self.config_path.display());
        Ok(())
    }
}
