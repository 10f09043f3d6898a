//! 应用状态（发起方持有的唯一可写副本）
//!
//! # 设计思路
//!
//! 模型、过滤器、provider 集合只在这里被修改；每次修改后立即持久化。
//! 过滤器调用开始时通过 `snapshot` 拷贝出只读快照交给工作线程，
//! 因此工作线程与编辑操作之间不需要任何锁。

use std::path::Path;

use crate::clipboard::ClipboardKind;
use crate::config::{AppConfig, ConfigStore, Hotkey};
use crate::error::AppError;
use crate::filter::{FilterError, InvocationSnapshot};
use crate::template::TemplateRegistry;
use crate::types::{FilterDefinition, ModelConfig, normalize_provider_id};

const COPY_SUFFIX: &str = " (copy)";

pub struct AppState {
    config: AppConfig,
    registry: TemplateRegistry,
    store: Box<dyn ConfigStore>,
}

impl AppState {
    /// 加载配置并与 provider 集合对齐。
    pub fn load(registry: TemplateRegistry, store: Box<dyn ConfigStore>) -> Self {
        let first = registry.first_provider().map(|p| p.id.clone());
        let config = store.load(first.as_deref());
        log::info!(
            "⚙️ 当前配置：{} 个模型，{} 个过滤器",
            config.models.len(),
            config.filters.len()
        );
        Self {
            config,
            registry,
            store,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn models(&self) -> &[ModelConfig] {
        &self.config.models
    }

    pub fn filters(&self) -> &[FilterDefinition] {
        &self.config.filters
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn store(&self) -> &dyn ConfigStore {
        self.store.as_ref()
    }

    /// 与当前剪贴板类型兼容的过滤器下标；剪贴板为空时全部可用。
    pub fn compatible_filters(&self, kind: ClipboardKind) -> Vec<usize> {
        self.config
            .filters
            .iter()
            .enumerate()
            .filter(|(_, f)| kind.as_io_kind().is_none_or(|io| f.input == io))
            .map(|(i, _)| i)
            .collect()
    }

    /// 按标题（不区分大小写）或下标查找过滤器。
    pub fn find_filter(&self, key: &str) -> Option<usize> {
        let key = key.trim();
        self.config
            .filters
            .iter()
            .position(|f| f.title.eq_ignore_ascii_case(key))
            .or_else(|| {
                key.parse::<usize>()
                    .ok()
                    .filter(|i| *i < self.config.filters.len())
            })
    }

    /// 捕获一次调用所需的只读快照。
    ///
    /// `modelIndex` 越界时使用第一个模型。
    pub fn snapshot(&self, filter_index: usize) -> Result<InvocationSnapshot, FilterError> {
        let filter = self
            .config
            .filters
            .get(filter_index)
            .cloned()
            .ok_or(FilterError::NoFilter(filter_index))?;
        let model = self
            .config
            .models
            .get(filter.model_index)
            .or_else(|| self.config.models.first())
            .cloned()
            .ok_or(FilterError::NoModel)?;

        Ok(InvocationSnapshot {
            filter,
            model,
            registry: self.registry.clone(),
        })
    }

    // ------------------------------------------------------------------------
    // 模型编辑
    // ------------------------------------------------------------------------

    pub fn add_model(&mut self, model: ModelConfig) -> Result<usize, AppError> {
        let model = Self::prepare_model(model)?;
        self.config.models.push(model);
        let index = self.config.models.len() - 1;
        self.persist()?;
        Ok(index)
    }

    pub fn update_model(&mut self, index: usize, model: ModelConfig) -> Result<(), AppError> {
        let model = Self::prepare_model(model)?;
        let slot = self
            .config
            .models
            .get_mut(index)
            .ok_or_else(|| AppError::Config(format!("模型下标越界: {}", index)))?;
        *slot = model;
        self.persist()
    }

    /// 删除模型；引用它的过滤器改为 0，引用其后模型的下标前移一位。
    pub fn delete_model(&mut self, index: usize) -> Result<(), AppError> {
        if index >= self.config.models.len() {
            return Err(AppError::Config(format!("模型下标越界: {}", index)));
        }
        if self.config.models.len() <= 1 {
            return Err(AppError::Config("不能删除最后一个模型".to_string()));
        }

        let removed = self.config.models.remove(index);
        for filter in self.config.filters.iter_mut() {
            if filter.model_index == index {
                filter.model_index = 0;
            } else if filter.model_index > index {
                filter.model_index -= 1;
            }
        }
        log::info!("🗑️ 已删除模型: {}", removed.name);
        self.persist()
    }

    fn prepare_model(mut model: ModelConfig) -> Result<ModelConfig, AppError> {
        if model.name.trim().is_empty() {
            return Err(AppError::Config("模型名称不能为空".to_string()));
        }
        model.provider_id = normalize_provider_id(&model.provider_id);
        Ok(model)
    }

    // ------------------------------------------------------------------------
    // 过滤器编辑
    // ------------------------------------------------------------------------

    pub fn add_filter(&mut self, filter: FilterDefinition) -> Result<usize, AppError> {
        Self::validate_filter(&filter)?;
        self.config.filters.push(filter);
        let index = self.config.filters.len() - 1;
        self.persist()?;
        Ok(index)
    }

    pub fn update_filter(&mut self, index: usize, filter: FilterDefinition) -> Result<(), AppError> {
        Self::validate_filter(&filter)?;
        let slot = self.filter_mut(index)?;
        *slot = filter;
        self.persist()
    }

    pub fn delete_filter(&mut self, index: usize) -> Result<(), AppError> {
        self.filter_mut(index)?;
        let removed = self.config.filters.remove(index);
        log::info!("🗑️ 已删除过滤器: {}", removed.title);
        self.persist()
    }

    /// 复制过滤器并追加到末尾，返回新下标。
    pub fn duplicate_filter(&mut self, index: usize) -> Result<usize, AppError> {
        let mut copy = self.filter_mut(index)?.clone();
        copy.title.push_str(COPY_SUFFIX);
        self.config.filters.push(copy);
        let new_index = self.config.filters.len() - 1;
        self.persist()?;
        Ok(new_index)
    }

    /// 把过滤器从 `from` 移到 `to`（其余保持相对顺序）。
    pub fn move_filter(&mut self, from: usize, to: usize) -> Result<(), AppError> {
        let len = self.config.filters.len();
        if from >= len || to >= len {
            return Err(AppError::Config(format!(
                "过滤器下标越界: {} → {}（共 {} 个）",
                from, to, len
            )));
        }
        if from == to {
            return Ok(());
        }
        let filter = self.config.filters.remove(from);
        self.config.filters.insert(to, filter);
        self.persist()
    }

    fn filter_mut(&mut self, index: usize) -> Result<&mut FilterDefinition, AppError> {
        self.config
            .filters
            .get_mut(index)
            .ok_or_else(|| AppError::Config(format!("过滤器下标越界: {}", index)))
    }

    fn validate_filter(filter: &FilterDefinition) -> Result<(), AppError> {
        if filter.title.trim().is_empty() {
            return Err(AppError::Config("过滤器标题不能为空".to_string()));
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // 其他设置
    // ------------------------------------------------------------------------

    pub fn set_language(&mut self, language: &str) -> Result<(), AppError> {
        self.config.language = language.to_string();
        self.persist()
    }

    pub fn set_hotkey(&mut self, hotkey: Hotkey) -> Result<(), AppError> {
        self.config.hotkey = hotkey;
        self.persist()
    }

    /// 整体替换配置（首次设置使用）。
    pub fn replace_config(&mut self, config: AppConfig) -> Result<(), AppError> {
        self.config = config;
        self.persist()
    }

    /// 重新加载 provider 目录；新集合为空时保留旧集合。
    pub fn reload_providers(&mut self, dir: &Path) -> Result<bool, AppError> {
        let loaded = TemplateRegistry::load(dir)?;
        let replaced = self.registry.replace_with(loaded);
        if replaced {
            self.persist()?;
        }
        Ok(replaced)
    }

    /// 规范化后写盘。
    pub fn persist(&mut self) -> Result<(), AppError> {
        let first = self.registry.first_provider().map(|p| p.id.clone());
        self.config.normalize(first.as_deref());
        self.store.save(&self.config).inspect_err(|e| {
            log::error!("💾 保存配置失败: {}", e);
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::template::parse_provider;
    use crate::types::IoKind;

    /// 记录每次保存内容的内存存储。
    #[derive(Clone, Default)]
    struct MemoryStore {
        initial: Option<AppConfig>,
        saved: Arc<Mutex<Vec<AppConfig>>>,
    }

    impl ConfigStore for MemoryStore {
        fn load(&self, first_provider: Option<&str>) -> AppConfig {
            let mut config = self.initial.clone().unwrap_or_default();
            config.normalize(first_provider);
            config
        }

        fn default_config(&self) -> AppConfig {
            AppConfig::default()
        }

        fn save(&self, config: &AppConfig) -> Result<(), AppError> {
            self.saved.lock().expect("lock").push(config.clone());
            Ok(())
        }
    }

    fn model(name: &str) -> ModelConfig {
        ModelConfig::new(name, "https://api.x.com", name, "", "OpenAI")
    }

    fn filter(title: &str, model_index: usize) -> FilterDefinition {
        FilterDefinition::new(title, IoKind::Text, IoKind::Text, model_index, "p")
    }

    fn state_with(models: Vec<ModelConfig>, filters: Vec<FilterDefinition>) -> (AppState, MemoryStore) {
        let store = MemoryStore {
            initial: Some(AppConfig {
                models,
                filters,
                ..AppConfig::default()
            }),
            ..MemoryStore::default()
        };
        let registry = TemplateRegistry::new(vec![
            parse_provider("OpenAI", r#"{"text-text": {}}"#).expect("provider"),
        ]);
        (AppState::load(registry, Box::new(store.clone())), store)
    }

    #[test]
    fn delete_model_reassigns_filter_indices() {
        let (mut state, store) = state_with(
            vec![model("a"), model("b"), model("c")],
            vec![filter("f0", 0), filter("f1", 1), filter("f2", 2)],
        );

        state.delete_model(1).expect("delete model");

        let indices: Vec<_> = state.filters().iter().map(|f| f.model_index).collect();
        assert_eq!(indices, vec![0, 0, 1]);
        assert_eq!(state.models().len(), 2);
        assert_eq!(store.saved.lock().expect("lock").len(), 1);
    }

    #[test]
    fn last_model_cannot_be_deleted() {
        let (mut state, store) = state_with(vec![model("only")], vec![filter("f", 0)]);
        assert!(matches!(state.delete_model(0), Err(AppError::Config(_))));
        assert!(matches!(state.delete_model(5), Err(AppError::Config(_))));
        assert_eq!(state.models().len(), 1);
        assert!(store.saved.lock().expect("lock").is_empty());
    }

    #[test]
    fn model_provider_id_is_normalized_and_filled() {
        let (mut state, _) = state_with(vec![model("a")], vec![]);
        let mut legacy = model("b");
        legacy.provider_id = "OpenAI-text-image".to_string();
        let index = state.add_model(legacy).expect("add model");
        assert_eq!(state.models()[index].provider_id, "OpenAI");

        let mut blank = model("c");
        blank.provider_id.clear();
        state.update_model(index, blank).expect("update model");
        assert_eq!(state.models()[index].provider_id, "OpenAI");

        assert!(state.add_model(model("")).is_err());
    }

    #[test]
    fn filter_edits_persist_every_mutation() {
        let (mut state, store) = state_with(vec![model("a")], vec![filter("one", 0)]);

        let two = state.add_filter(filter("two", 0)).expect("add");
        let copy = state.duplicate_filter(two).expect("duplicate");
        assert_eq!(state.filters()[copy].title, "two (copy)");

        state.move_filter(copy, 0).expect("move");
        let titles: Vec<_> = state.filters().iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["two (copy)", "one", "two"]);

        state.update_filter(1, filter("uno", 7)).expect("update");
        assert_eq!(state.filters()[1].model_index, 0);

        state.delete_filter(2).expect("delete");
        assert_eq!(state.filters().len(), 2);

        assert!(state.add_filter(filter("  ", 0)).is_err());
        assert!(state.delete_filter(9).is_err());
        assert!(state.move_filter(0, 9).is_err());

        assert_eq!(store.saved.lock().expect("lock").len(), 5);
    }

    #[test]
    fn snapshot_falls_back_to_first_model() {
        let (state, _) = state_with(vec![model("a"), model("b")], vec![filter("f", 1)]);
        let snapshot = state.snapshot(0).expect("snapshot");
        assert_eq!(snapshot.model.name, "b");
        assert_eq!(snapshot.registry.providers().len(), 1);

        assert!(matches!(state.snapshot(3), Err(FilterError::NoFilter(3))));
    }

    #[test]
    fn compatible_filters_follow_clipboard_kind() {
        let image_filter = FilterDefinition::new("img", IoKind::Image, IoKind::Text, 0, "");
        let (state, _) = state_with(vec![model("a")], vec![filter("t", 0), image_filter]);

        assert_eq!(state.compatible_filters(ClipboardKind::Text), vec![0]);
        assert_eq!(state.compatible_filters(ClipboardKind::Image), vec![1]);
        assert_eq!(state.compatible_filters(ClipboardKind::None), vec![0, 1]);
    }

    #[test]
    fn find_filter_by_title_or_index() {
        let (state, _) = state_with(vec![model("a")], vec![filter("Translate", 0), filter("2", 0)]);
        assert_eq!(state.find_filter("translate"), Some(0));
        assert_eq!(state.find_filter("2"), Some(1));
        assert_eq!(state.find_filter("1"), Some(1));
        assert_eq!(state.find_filter("missing"), None);
    }
}
