//! 单次过滤器调用：读剪贴板 → 选模板 → 请求 → 提取 → 写回
//!
//! 全部步骤同步执行，由 `runner` 放到工作线程中运行。

use super::{FilterError, InvocationSnapshot};
use crate::clipboard::ClipboardProvider;
use crate::extract::{extract_image_b64, extract_text};
use crate::request::{Method, PlaceholderContext, prepare};
use crate::template::Template;
use crate::transport::{Transport, truncate_for_log};
use crate::types::{IoKind, ModelConfig};

/// 单次调用的结果：文本或已解码的图片，二者只会有其一。
pub enum ApiCallResult<I> {
    Text(String),
    Image(I),
}

impl<I> std::fmt::Debug for ApiCallResult<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            Self::Image(_) => f.write_str("Image(..)"),
        }
    }
}

/// 按输入 / 输出类型生成的固定系统提示。
pub fn system_prompt(input: IoKind, output: IoKind) -> String {
    format!(
        "Follow the instructions strictly and convert the input {} to the output {}. \
         No additional text or comments are allowed.",
        input, output
    )
}

/// 用户提示：过滤器提示 + 空行 + 剪贴板文本（图片输入时为空）。
pub fn user_prompt(filter_prompt: &str, clipboard_text: &str) -> String {
    format!("{}\n\n{}", filter_prompt, clipboard_text)
}

/// `data:image/png;base64,` 前缀的 data URL；无图片时为空。
pub fn image_data_url(image_b64: &str) -> String {
    if image_b64.is_empty() {
        String::new()
    } else {
        format!("data:image/png;base64,{}", image_b64)
    }
}

/// 调用模板接口并按输出类型提取结果。
pub fn call_template<C, T>(
    clipboard: &C,
    transport: &T,
    template: &Template,
    model: &ModelConfig,
    ctx: &PlaceholderContext,
) -> Result<ApiCallResult<C::Image>, FilterError>
where
    C: ClipboardProvider + ?Sized,
    T: Transport + ?Sized,
{
    let request = prepare(
        &model.server_url,
        &template.endpoint,
        &template.headers,
        &template.payload,
        Method::Post,
        ctx,
    )
    .map_err(FilterError::Request)?;

    let response = transport.send(&request).map_err(|e| {
        log::warn!("❌ 模板请求失败 [{}]: {}", template.id, e);
        FilterError::Transport(e)
    })?;

    if response.is_empty() {
        return Err(FilterError::EmptyResult);
    }

    match template.output {
        IoKind::Text => match extract_text(&response, &template.result_path) {
            Some(text) => Ok(ApiCallResult::Text(text)),
            None => {
                log::warn!(
                    "⚠️ 响应中没有文本结果: {}",
                    truncate_for_log(&response, 512)
                );
                Err(FilterError::EmptyResult)
            }
        },
        IoKind::Image => {
            let Some(b64) = extract_image_b64(&response, &template.result_path) else {
                log::warn!(
                    "⚠️ 响应中没有图片结果: {}",
                    truncate_for_log(&response, 512)
                );
                return Err(FilterError::EmptyResult);
            };
            let image = clipboard
                .decode_base64_image(&b64)
                .map_err(FilterError::ImageDecode)?;
            Ok(ApiCallResult::Image(image))
        }
    }
}

/// 执行一次过滤器调用。
///
/// 失败时剪贴板保持原样；图片结果写入失败时句柄在 `write_image` 内释放。
pub fn run_filter<C, T>(
    snapshot: &InvocationSnapshot,
    clipboard: &C,
    transport: &T,
) -> Result<IoKind, FilterError>
where
    C: ClipboardProvider + ?Sized,
    T: Transport + ?Sized,
{
    let filter = &snapshot.filter;
    let model = &snapshot.model;
    log::info!(
        "🚀 执行过滤器: {} (input={} output={})",
        filter.title,
        filter.input,
        filter.output
    );

    let template = snapshot
        .registry
        .resolve_template(&model.provider_id, filter.input, filter.output)
        .ok_or(FilterError::NoMatchingTemplate {
            input: filter.input,
            output: filter.output,
        })?;
    log::debug!(
        "📄 选用模板 {}/{}（模型 provider: '{}'）",
        template.provider_id,
        template.id,
        model.provider_id
    );

    let mut text_input = String::new();
    let mut image_b64 = String::new();
    match template.input {
        IoKind::Text => {
            text_input = clipboard.read_text().map_err(FilterError::ClipboardRead)?;
            if text_input.is_empty() {
                return Err(FilterError::EmptyText);
            }
        }
        IoKind::Image => {
            let image = clipboard
                .read_image()
                .map_err(FilterError::ClipboardRead)?
                .ok_or(FilterError::NoImage)?;
            image_b64 = clipboard
                .encode_png_base64(&image)
                .map_err(FilterError::ImageEncode)?;
        }
    }

    let ctx = PlaceholderContext {
        model: model.model_name.clone(),
        system_prompt: system_prompt(filter.input, filter.output),
        prompt: user_prompt(&filter.prompt, &text_input),
        api_key: model.api_key.clone(),
        image_data_url: image_data_url(&image_b64),
        image_b64,
    };

    match call_template(clipboard, transport, template, model, &ctx)? {
        ApiCallResult::Text(text) => {
            clipboard
                .write_text(&text)
                .map_err(FilterError::ClipboardWrite)?;
            log::info!("✅ 过滤器完成: {}（文本 {} 字符）", filter.title, text.chars().count());
            Ok(IoKind::Text)
        }
        ApiCallResult::Image(image) => {
            clipboard
                .write_image(image)
                .map_err(FilterError::ClipboardWrite)?;
            log::info!("✅ 过滤器完成: {}（图片）", filter.title);
            Ok(IoKind::Image)
        }
    }
}
