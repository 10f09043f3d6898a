//! 请求构建：请求头 + 请求体
//!
//! 请求头任一值包含 `multipart/form-data`（不区分大小写）时，
//! 自动追加 boundary 并构建 multipart 请求体；否则使用 JSON 负载模板。

use base64::{Engine as _, engine::general_purpose};

use super::placeholder::{PlaceholderContext, substitute};

pub const MULTIPART_BOUNDARY: &str = "----cbfilterboundary";
const MULTIPART_MIME: &str = "multipart/form-data";

/// 已完成占位符替换的请求内容。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltRequest {
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl BuiltRequest {
    /// 以 `Name: Value\r\n` 逐行拼接的请求头文本。
    pub fn header_block(&self) -> String {
        self.headers
            .iter()
            .map(|(name, value)| format!("{}: {}\r\n", name, value))
            .collect()
    }

    pub fn is_multipart(&self) -> bool {
        self.headers
            .iter()
            .any(|(_, value)| contains_ignore_ascii_case(value, MULTIPART_MIME))
    }
}

/// 按模板构建请求头与请求体。
///
/// `payload` 为空时请求体为空（适用于 GET 风格调用）。
pub fn build_request(
    header_templates: &[(String, String)],
    payload: &str,
    ctx: &PlaceholderContext,
) -> BuiltRequest {
    let mut headers: Vec<(String, String)> = header_templates
        .iter()
        .map(|(name, value)| (name.clone(), substitute(value, ctx, false)))
        .collect();

    let multipart = headers
        .iter()
        .any(|(_, value)| contains_ignore_ascii_case(value, MULTIPART_MIME));

    let body = if multipart {
        for (_, value) in headers.iter_mut() {
            *value = with_boundary(value);
        }
        build_multipart_body(MULTIPART_BOUNDARY, &ctx.model, &ctx.prompt, &ctx.image_b64)
    } else {
        substitute(payload, ctx, true).into_bytes()
    };

    BuiltRequest { headers, body }
}

/// 构建 multipart 请求体：`model`、`prompt` 文本字段，
/// 以及（存在图片时）`image` 文件字段。
///
/// 图片 Base64 无法解码时省略 `image` 字段。
pub fn build_multipart_body(boundary: &str, model: &str, prompt: &str, image_b64: &str) -> Vec<u8> {
    let image = decode_base64_lenient(image_b64);

    let mut body = Vec::with_capacity(256 + image.as_ref().map_or(0, Vec::len));
    let mut add_text = |name: &str, value: &str| {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    };
    add_text("model", model);
    add_text("prompt", prompt);

    if let Some(image) = image {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"image\"; filename=\"image.png\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
        body.extend_from_slice(&image);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}

/// 解码 Base64，忽略其中的空白字符；空串或非法输入返回 `None`。
pub fn decode_base64_lenient(data: &str) -> Option<Vec<u8>> {
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }
    match general_purpose::STANDARD.decode(compact.as_bytes()) {
        Ok(bytes) if !bytes.is_empty() => Some(bytes),
        Ok(_) => None,
        Err(err) => {
            log::warn!("🖼️ 图片 Base64 解码失败: {}", err);
            None
        }
    }
}

fn with_boundary(value: &str) -> String {
    match find_ignore_ascii_case(value, MULTIPART_MIME) {
        Some(pos) => {
            let end = pos + MULTIPART_MIME.len();
            format!(
                "{}{}; boundary={}{}",
                &value[..pos],
                &value[pos..end],
                MULTIPART_BOUNDARY,
                &value[end..]
            )
        }
        None => value.to_string(),
    }
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    // ASCII 小写化不改变字节偏移
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}

fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    find_ignore_ascii_case(haystack, needle).is_some()
}
