//! 首次设置与模型发现
//!
//! # 设计思路
//!
//! 用户只需选择 provider、填写服务端地址与密钥，
//! 程序通过 provider 的 `models` 描述拉取模型列表，按名称模式为四种
//! 输入 / 输出组合各挑选一个模型，并恢复默认过滤器集合。

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::config::{AppConfig, Hotkey};
use crate::error::AppError;
use crate::request::{Method, PlaceholderContext, prepare};
use crate::state::AppState;
use crate::template::Provider;
use crate::transport::Transport;
use crate::types::{IoKind, ModelConfig};

/// 文本输出优先选用的模型（按顺序匹配）。
pub const LLM_PATTERNS: &[&str] = &[
    "gpt-.*-nano",
    "gemini-.*-flash-lite",
    "gpt-.*-mini",
    "gemini-.*-flash",
    "gpt-.*",
    "claude-.*-haiku",
    "gemini-.*-pro",
    "claude-.*-sonnet",
];

/// 图片输出优先选用的模型。
pub const IMAGE_PATTERNS: &[&str] = &["gpt.*image.*mini", "gemini.*image", "gpt.*image"];

/// 预编译的模式，顺序与常量一致。
static LLM_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| compile_patterns(LLM_PATTERNS));
static IMAGE_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| compile_patterns(IMAGE_PATTERNS));
static POST_METHOD: Lazy<Vec<Regex>> = Lazy::new(|| compile_patterns(&["post"]));

/// 不区分大小写、非锚定；非法模式记录日志后跳过。
fn compile_patterns(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .inspect_err(|err| log::warn!("🔎 无效的匹配模式 '{}': {}", pattern, err))
                .ok()
        })
        .collect()
}

/// 拉取 provider 的模型列表。
pub fn fetch_models<T: Transport + ?Sized>(
    provider: &Provider,
    server_url: &str,
    api_key: &str,
    transport: &T,
) -> Result<Vec<String>, AppError> {
    let descriptor = provider
        .models
        .as_ref()
        .filter(|m| !m.endpoint.is_empty())
        .ok_or_else(|| {
            AppError::Template(format!("provider '{}' 未定义模型列表接口", provider.id))
        })?;

    let method = if POST_METHOD.iter().any(|re| re.is_match(&descriptor.method)) {
        Method::Post
    } else {
        Method::Get
    };
    let ctx = PlaceholderContext {
        api_key: api_key.to_string(),
        ..Default::default()
    };

    let payload = match method {
        Method::Post => descriptor.payload.as_str(),
        Method::Get => "",
    };

    let request = prepare(
        server_url,
        &descriptor.endpoint,
        &descriptor.headers,
        payload,
        method,
        &ctx,
    )?;

    let response = transport.send(&request)?;
    let models = parse_model_list(&response, &descriptor.result_path)?;
    log::info!("📋 provider '{}' 返回 {} 个模型", provider.id, models.len());
    Ok(models)
}

/// 按点分对象路径定位数组，收集对象的 `id` 字段或字符串条目。
pub fn parse_model_list(response: &str, result_path: &str) -> Result<Vec<String>, AppError> {
    let root: Value = serde_json::from_str(response)?;

    let mut node = &root;
    for part in result_path.split('.').filter(|p| !p.is_empty()) {
        let obj = node
            .as_object()
            .ok_or_else(|| AppError::Extraction("模型列表路径无效".to_string()))?;
        node = obj
            .get(part)
            .ok_or_else(|| AppError::Extraction(format!("模型列表路径缺失: {}", part)))?;
    }

    let items = node
        .as_array()
        .ok_or_else(|| AppError::Extraction("模型列表不是数组".to_string()))?;
    let models: Vec<String> = items
        .iter()
        .filter_map(|item| match item {
            Value::Object(obj) => obj.get("id").and_then(Value::as_str).map(str::to_string),
            Value::String(s) => Some(s.clone()),
            _ => None,
        })
        .collect();

    if models.is_empty() {
        return Err(AppError::Extraction("模型列表为空".to_string()));
    }
    Ok(models)
}

/// 按模式顺序挑选模型：第一个命中模式的第一个模型；都不命中时取第一个模型。
pub fn pick_model_by_patterns<'a>(models: &'a [String], patterns: &[Regex]) -> Option<&'a str> {
    patterns
        .iter()
        .find_map(|re| models.iter().find(|m| re.is_match(m)))
        .or_else(|| models.first())
        .map(String::as_str)
}

/// 文本输出模型。
pub fn pick_llm_model(models: &[String]) -> Option<&str> {
    pick_model_by_patterns(models, &LLM_REGEXES)
}

/// 图片输出模型。
pub fn pick_image_model(models: &[String]) -> Option<&str> {
    pick_model_by_patterns(models, &IMAGE_REGEXES)
}

/// 首次设置的输入。
#[derive(Debug, Clone)]
pub struct SetupRequest {
    pub provider_id: String,
    pub server_url: String,
    pub api_key: String,
    /// 为空时沿用默认配置中的语言。
    pub language: Option<String>,
    pub hotkey: Option<Hotkey>,
}

/// 四种 IO 组合对应的模型下标。
fn model_index_for(input: IoKind, output: IoKind) -> usize {
    match (input, output) {
        (IoKind::Text, IoKind::Text) => 0,
        (IoKind::Text, IoKind::Image) => 1,
        (IoKind::Image, IoKind::Text) => 2,
        (IoKind::Image, IoKind::Image) => 3,
    }
}

/// 执行首次设置，返回新的完整配置（由调用方持久化）。
pub fn perform_initial_setup<T: Transport + ?Sized>(
    provider: &Provider,
    request: &SetupRequest,
    defaults: AppConfig,
    transport: &T,
) -> Result<AppConfig, AppError> {
    let available = fetch_models(provider, &request.server_url, &request.api_key, transport)?;

    let empty = || AppError::Extraction("模型列表为空".to_string());
    let text_model = pick_llm_model(&available).ok_or_else(empty)?.to_string();
    let image_model = pick_image_model(&available).ok_or_else(empty)?.to_string();

    let model = |name: &str, model_name: String| {
        ModelConfig::new(
            name,
            request.server_url.clone(),
            model_name,
            request.api_key.clone(),
            &provider.id,
        )
    };
    let models = vec![
        model("Text/Text", text_model.clone()),
        model("Text/Image", image_model.clone()),
        model("Image/Text", text_model),
        model("Image/Image", image_model),
    ];

    let mut filters = defaults.filters;
    for filter in filters.iter_mut() {
        filter.model_index = model_index_for(filter.input, filter.output);
    }

    let config = AppConfig {
        language: request
            .language
            .clone()
            .filter(|l| !l.is_empty())
            .unwrap_or(defaults.language),
        hotkey: request.hotkey.unwrap_or(defaults.hotkey),
        models,
        filters,
    };
    log::info!(
        "🧭 首次设置完成：provider '{}'，{} 个过滤器",
        provider.id,
        config.filters.len()
    );
    Ok(config)
}

/// 在当前状态上执行首次设置并保存。
pub fn run_initial_setup<T: Transport + ?Sized>(
    state: &mut AppState,
    request: &SetupRequest,
    transport: &T,
) -> Result<(), AppError> {
    let provider = state
        .registry()
        .find_provider_by_id(&request.provider_id)
        .cloned()
        .ok_or_else(|| {
            AppError::Config(format!("未找到 provider '{}'", request.provider_id))
        })?;
    let defaults = state.store().default_config();
    let config = perform_initial_setup(&provider, request, defaults, transport)?;
    state.replace_config(config)
}
