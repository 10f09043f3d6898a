//! # 响应提取模块（extract）
//!
//! ## 设计思路
//!
//! 不同服务商的响应结构差异很大，这里不追求严格解析，
//! 而是把提取拆成若干互相独立的提取函数，按固定顺序依次尝试，
//! 第一个返回非空结果的即为最终结果。新增兜底只需在链尾追加一项。
//!
//! ## 提取顺序
//!
//! - 文本输出：结果路径 → `content` 扫描
//! - 图片输出：结果路径 → data URL 拆分 → `b64_json` 扫描 → `content` 扫描
//!   → 再次 data URL 拆分 → chat 响应中的 `image_url`
//!
//! data URL 拆分是对前一步结果的后处理，对已拆分的值是幂等的。

mod path;
mod scan;

pub use path::{extract_by_path, walk};
pub use scan::{extract_b64_image, extract_content, extract_image_from_chat_response};

use crate::types::IoKind;

/// 单个提取器：(响应文本, 结果路径) → 可选结果。
pub type Extractor = fn(&str, &str) -> Option<String>;

fn by_path(json: &str, path: &str) -> Option<String> {
    if path.is_empty() {
        return None;
    }
    extract_by_path(json, path).filter(|s| !s.is_empty())
}

fn by_content(json: &str, _path: &str) -> Option<String> {
    extract_content(json)
}

fn by_b64_json(json: &str, _path: &str) -> Option<String> {
    extract_b64_image(json)
}

fn by_chat_image(json: &str, _path: &str) -> Option<String> {
    extract_image_from_chat_response(json)
}

/// 文本输出的提取链。
pub const TEXT_CHAIN: &[Extractor] = &[by_path, by_content];

/// 图片输出的提取链（data URL 拆分在链外作为后处理）。
const IMAGE_CHAIN: &[Extractor] = &[by_path, by_b64_json, by_content, by_chat_image];

/// 值中含 `data:image` 时取第一个逗号之后的部分。
pub fn strip_data_url(value: &str) -> &str {
    if value.contains("data:image") {
        if let Some((_, rest)) = value.split_once(',') {
            return rest;
        }
    }
    value
}

/// 依次尝试提取器，返回第一个非空结果。
pub fn run_chain(chain: &[Extractor], json: &str, path: &str) -> Option<String> {
    chain
        .iter()
        .find_map(|extract| extract(json, path).filter(|s| !s.is_empty()))
}

/// 提取文本结果。
pub fn extract_text(json: &str, result_path: &str) -> Option<String> {
    run_chain(TEXT_CHAIN, json, result_path)
}

/// 提取图片结果（Base64，不含 data URL 前缀）。
pub fn extract_image_b64(json: &str, result_path: &str) -> Option<String> {
    IMAGE_CHAIN.iter().find_map(|extract| {
        let value = extract(json, result_path)?;
        let stripped = strip_data_url(strip_data_url(&value)).trim();
        (!stripped.is_empty()).then(|| stripped.to_string())
    })
}

/// 按输出类型选择提取链。
pub fn extract_for(output: IoKind, json: &str, result_path: &str) -> Option<String> {
    match output {
        IoKind::Text => extract_text(json, result_path),
        IoKind::Image => extract_image_b64(json, result_path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAT: &str = r#"{"choices":[{"message":{"content":"hello"}}]}"#;

    #[test]
    fn declared_path_wins() {
        assert_eq!(
            extract_text(CHAT, "choices[0].message.content").as_deref(),
            Some("hello")
        );
    }

    #[test]
    fn unparsable_path_falls_back_to_content_scan() {
        assert_eq!(extract_by_path(CHAT, "choices[zero].message"), None);
        assert_eq!(
            extract_text(CHAT, "choices[zero].message").as_deref(),
            Some("hello")
        );
        assert_eq!(extract_text(CHAT, "").as_deref(), Some("hello"));
    }

    #[test]
    fn text_chain_reports_no_match() {
        assert_eq!(extract_text(r#"{"error":{"message":"bad key"}}"#, "choices[0]"), None);
        assert_eq!(extract_text("", ""), None);
    }

    #[test]
    fn image_from_path_strips_data_url() {
        let json = r#"{"data":[{"url":"data:image/png;base64,QUJD"}]}"#;
        assert_eq!(extract_image_b64(json, "data[0].url").as_deref(), Some("QUJD"));
    }

    #[test]
    fn image_falls_back_to_b64_json_then_content() {
        let json = r#"{"data":[{"b64_json":"QUJD"}]}"#;
        assert_eq!(extract_image_b64(json, "wrong.path").as_deref(), Some("QUJD"));

        let json = r#"{"choices":[{"message":{"content":"data:image/png;base64,WFla"}}]}"#;
        assert_eq!(extract_image_b64(json, "").as_deref(), Some("WFla"));
    }

    #[test]
    fn image_falls_back_to_chat_image_url() {
        let json = r#"{"choices":[{"message":{"role":"assistant","images":[{"image_url":{"url":"data:image/png;base64,SUxZ"}}]}}]}"#;
        assert_eq!(extract_image_b64(json, "").as_deref(), Some("SUxZ"));
    }

    #[test]
    fn strip_data_url_is_idempotent() {
        let once = strip_data_url("data:image/png;base64,QUJD");
        assert_eq!(once, "QUJD");
        assert_eq!(strip_data_url(once), "QUJD");
        assert_eq!(strip_data_url("plain,text"), "plain,text");
    }

    #[test]
    fn extract_for_dispatches_on_output_kind() {
        assert_eq!(extract_for(IoKind::Text, CHAT, "").as_deref(), Some("hello"));
        assert_eq!(
            extract_for(IoKind::Image, r#"{"b64_json":"QUJD"}"#, "").as_deref(),
            Some("QUJD")
        );
    }
}
