//! 占位符替换
//!
//! 固定 7 个占位符，对模板做单次从左到右扫描；插入的值不会被再次扫描。

/// 占位符替换所需的运行时值。
#[derive(Debug, Clone, Default)]
pub struct PlaceholderContext {
    pub model: String,
    pub system_prompt: String,
    pub prompt: String,
    pub api_key: String,
    /// 纯 Base64（无 data URL 前缀）。
    pub image_b64: String,
    /// `data:image/png;base64,...` 形式。
    pub image_data_url: String,
}

impl PlaceholderContext {
    /// 按占位符的替换顺序列出 (token, 值)。
    fn bindings(&self) -> [(&'static str, &str); 7] {
        [
            ("<<model>>", &self.model),
            ("<<system_prompt>>", &self.system_prompt),
            ("<<prompt>>", &self.prompt),
            ("<<input_text>>", &self.prompt),
            ("<<api_key>>", &self.api_key),
            ("<<image_url>>", &self.image_data_url),
            ("<<image>>", &self.image_b64),
        ]
    }
}

/// 替换模板字符串中的全部占位符。
///
/// `json_escape` 为 true 时值按 JSON 字符串转义，用于负载模板；
/// 请求头与端点路径使用原样替换。
pub fn substitute(template: &str, ctx: &PlaceholderContext, json_escape: bool) -> String {
    let bindings = ctx.bindings();
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("<<") {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        match bindings.iter().find(|(token, _)| tail.starts_with(*token)) {
            Some((token, value)) => {
                if json_escape {
                    out.push_str(&escape_json(value));
                } else {
                    out.push_str(value);
                }
                rest = &tail[token.len()..];
            }
            None => {
                out.push('<');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// JSON 字符串转义：反斜杠、双引号、换行、回车、制表符。
pub fn escape_json(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ctx() -> PlaceholderContext {
        PlaceholderContext {
            model: "gpt-5.1".to_string(),
            system_prompt: "sys".to_string(),
            prompt: "line1\n\"quoted\"".to_string(),
            api_key: "sk-1".to_string(),
            image_b64: "AAAA".to_string(),
            image_data_url: "data:image/png;base64,AAAA".to_string(),
        }
    }

    #[test]
    fn replaces_every_occurrence() {
        let out = substitute("<<model>>/<<model>>:<<api_key>>", &ctx(), false);
        assert_eq!(out, "gpt-5.1/gpt-5.1:sk-1");
    }

    #[test]
    fn input_text_is_an_alias_for_prompt() {
        let out = substitute("<<input_text>>|<<prompt>>", &ctx(), false);
        assert_eq!(out, "line1\n\"quoted\"|line1\n\"quoted\"");
    }

    #[test]
    fn image_url_is_not_clobbered_by_image_token() {
        let out = substitute("<<image_url>> <<image>>", &ctx(), false);
        assert_eq!(out, "data:image/png;base64,AAAA AAAA");
    }

    #[test]
    fn json_escape_mode_escapes_values_only() {
        let out = substitute(r#"{"content":"<<prompt>>"}"#, &ctx(), true);
        assert_eq!(out, r#"{"content":"line1\n\"quoted\""}"#);
        let parsed: serde_json::Value = serde_json::from_str(&out).expect("valid json");
        assert_eq!(parsed["content"], "line1\n\"quoted\"");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let mut c = ctx();
        c.prompt = "<<api_key>>".to_string();
        c.api_key = "secret".to_string();
        let out = substitute("<<api_key>> <<prompt>>", &c, false);
        assert_eq!(out, "secret <<api_key>>");
    }

    #[test]
    fn unknown_tokens_are_left_untouched() {
        let out = substitute("<<unknown>> <<model>", &ctx(), true);
        assert_eq!(out, "<<unknown>> <<model>");
        assert_eq!(substitute("<<<model>>>", &ctx(), false), "<gpt-5.1>");
    }

    #[test]
    fn escape_json_handles_control_characters() {
        assert_eq!(escape_json("a\\b\tc\r\n\""), "a\\\\b\\tc\\r\\n\\\"");
    }

    proptest! {
        #[test]
        fn no_op_without_placeholders(s in "[^<>]*") {
            prop_assert_eq!(substitute(&s, &ctx(), false), s.clone());
            prop_assert_eq!(substitute(&s, &ctx(), true), s);
        }

        #[test]
        fn every_model_placeholder_is_replaced(parts in proptest::collection::vec("[a-z ]{0,8}", 1..6)) {
            let template = parts.join("<<model>>");
            let out = substitute(&template, &ctx(), false);
            prop_assert!(!out.contains("<<model>>"));
            prop_assert_eq!(out, parts.join("gpt-5.1"));
        }
    }
}
