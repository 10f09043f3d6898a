//! 文本扫描式兜底提取
//!
//! 不解析 JSON 结构，直接在响应文本中查找第一个 `"key": "..."` 字符串字段。
//! 用于结构不规范、或结果路径未覆盖的响应。

/// 从 `from` 开始查找第一个值为字符串的 `"key"` 字段，返回未反转义的原始内容。
fn find_string_field(json: &str, key: &str, from: usize) -> Option<String> {
    let needle = format!("\"{}\"", key);
    let mut search_from = from;

    while let Some(rel) = json.get(search_from..)?.find(&needle) {
        let after_key = search_from + rel + needle.len();
        if let Some(raw) = string_value_after(&json[after_key..]) {
            return Some(raw);
        }
        search_from = after_key;
    }
    None
}

/// `rest` 以键名之后的内容开头：跳过空白与冒号，读取一个带转义的字符串。
fn string_value_after(rest: &str) -> Option<String> {
    let rest = rest.trim_start().strip_prefix(':')?.trim_start();
    let body = rest.strip_prefix('"')?;

    let mut raw = String::new();
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return Some(raw),
            '\\' => {
                raw.push('\\');
                raw.push(chars.next()?);
            }
            other => raw.push(other),
        }
    }
    // 未闭合
    None
}

/// 只处理 `escapes` 中列出的转义序列，其余转义原样保留。
fn unescape(raw: &str, escapes: &[(char, char)]) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next) => match escapes.iter().find(|(from, _)| *from == next) {
                Some((_, to)) => out.push(*to),
                None => {
                    out.push('\\');
                    out.push(next);
                }
            },
            None => out.push('\\'),
        }
    }
    out
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

/// 第一个 `"content"` 字符串字段，反转义 `\n` 与 `\"`。
pub fn extract_content(json: &str) -> Option<String> {
    let raw = find_string_field(json, "content", 0)?;
    non_empty(unescape(&raw, &[('n', '\n'), ('"', '"')]))
}

/// 第一个 `"b64_json"` 字符串字段，反转义 `\"`、`\\`、`\/`。
pub fn extract_b64_image(json: &str) -> Option<String> {
    let raw = find_string_field(json, "b64_json", 0)?;
    non_empty(unescape(&raw, &[('"', '"'), ('\\', '\\'), ('/', '/')]))
}

/// chat 接口返回的图片：`images` / `image_url` → `image_url` / `imageUrl` → `url`。
///
/// 返回 data URL 第一个逗号之后的部分；没有逗号时原样返回。
pub fn extract_image_from_chat_response(json: &str) -> Option<String> {
    let anchor = json
        .find("\"images\"")
        .or_else(|| json.find("\"image_url\""))?;
    let url_key = json[anchor..]
        .find("\"image_url\"")
        .or_else(|| json[anchor..].find("\"imageUrl\""))
        .map(|rel| anchor + rel)?;

    let raw = find_string_field(json, "url", url_key)?;
    let data_url = unescape(
        &raw,
        &[('\\', '\\'), ('"', '"'), ('n', '\n'), ('r', '\r'), ('t', '\t')],
    );

    let b64 = match data_url.split_once(',') {
        Some((_, rest)) => rest.to_string(),
        None => data_url,
    };
    non_empty(b64)
}
