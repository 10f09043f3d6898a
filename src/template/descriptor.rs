//! 描述文件解析
//!
//! 顶层键的含义：
//! - `default-endpoint`：建议的服务端地址
//! - `models`：模型列表查询描述
//! - 其余对象类型的键：`<input>-<output>` 模板；非对象值被忽略

use serde_json::{Map, Value};

use super::{ModelsDescriptor, Provider, Template};
use crate::error::AppError;
use crate::types::IoKind;

const DEFAULT_TEMPLATE_ENDPOINT: &str = "/";
const DEFAULT_MODELS_METHOD: &str = "GET";
const DEFAULT_MODELS_RESULT: &str = "data";

/// 将单个描述文件内容解析为 `Provider`。
///
/// 模板为空时返回错误，调用方据此跳过该文件。
pub fn parse_provider(provider_id: &str, text: &str) -> Result<Provider, AppError> {
    if provider_id.is_empty() {
        return Err(AppError::Template("provider id 为空".to_string()));
    }

    let root: Value = serde_json::from_str(text)?;
    let root = root
        .as_object()
        .ok_or_else(|| AppError::Template("描述文件顶层必须是 JSON 对象".to_string()))?;

    let mut provider = Provider {
        id: provider_id.to_string(),
        default_endpoint: String::new(),
        templates: Vec::new(),
        models: None,
    };

    for (key, value) in root {
        match key.as_str() {
            "default-endpoint" => {
                provider.default_endpoint = string_field(root, key, "")?;
            }
            "models" => {
                if let Some(obj) = value.as_object() {
                    provider.models = Some(parse_models(obj)?);
                }
            }
            _ => {
                let Some(obj) = value.as_object() else {
                    continue;
                };
                if key.is_empty() {
                    continue;
                }
                provider.templates.push(parse_template(provider_id, key, obj)?);
            }
        }
    }

    if provider.templates.is_empty() {
        return Err(AppError::Template(format!(
            "provider '{}' 未声明任何模板",
            provider_id
        )));
    }

    Ok(provider)
}

fn parse_template(
    provider_id: &str,
    key: &str,
    obj: &Map<String, Value>,
) -> Result<Template, AppError> {
    let (input, output) = match key.split_once('-') {
        Some((input, output)) => (input, output),
        None => (key, key),
    };

    Ok(Template {
        id: key.to_string(),
        provider_id: provider_id.to_string(),
        input: IoKind::parse(input),
        output: IoKind::parse(output),
        endpoint: string_field(obj, "endpoint", DEFAULT_TEMPLATE_ENDPOINT)?,
        result_path: string_field(obj, "result", "")?,
        headers: header_pairs(obj)?,
        payload: payload_text(obj)?,
    })
}

fn parse_models(obj: &Map<String, Value>) -> Result<ModelsDescriptor, AppError> {
    Ok(ModelsDescriptor {
        endpoint: string_field(obj, "endpoint", "")?,
        method: string_field(obj, "method", DEFAULT_MODELS_METHOD)?,
        headers: header_pairs(obj)?,
        payload: payload_text(obj)?,
        result_path: string_field(obj, "result", DEFAULT_MODELS_RESULT)?,
    })
}

/// 读取字符串字段；缺失时使用默认值，类型不符视为格式错误。
fn string_field(obj: &Map<String, Value>, key: &str, default: &str) -> Result<String, AppError> {
    match obj.get(key) {
        None => Ok(default.to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(AppError::Template(format!(
            "字段 '{}' 必须是字符串，实际为 {}",
            key, other
        ))),
    }
}

fn header_pairs(obj: &Map<String, Value>) -> Result<Vec<(String, String)>, AppError> {
    let Some(headers) = obj.get("headers") else {
        return Ok(Vec::new());
    };
    let headers = headers
        .as_object()
        .ok_or_else(|| AppError::Template("headers 必须是对象".to_string()))?;

    headers
        .iter()
        .map(|(name, value)| match value {
            Value::String(v) => Ok((name.clone(), v.clone())),
            other => Err(AppError::Template(format!(
                "请求头 '{}' 的值必须是字符串，实际为 {}",
                name, other
            ))),
        })
        .collect()
}

/// 负载可以是任意 JSON，统一以紧凑文本形式保存。
fn payload_text(obj: &Map<String, Value>) -> Result<String, AppError> {
    match obj.get("payload") {
        None => Ok(String::new()),
        Some(value) => Ok(serde_json::to_string(value)?),
    }
}
