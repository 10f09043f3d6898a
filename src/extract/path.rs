//! 结果路径寻址
//!
//! 路径形如 `choices[0].message.content`：以 `.` 分段，每段可带一个 `[n]` 下标。
//! 不是通用 JSONPath，只支持对象键 + 单层数组下标。

use serde_json::Value;

#[derive(Debug, PartialEq, Eq)]
struct Segment<'a> {
    key: &'a str,
    index: Option<usize>,
}

fn parse_segment(raw: &str) -> Option<Segment<'_>> {
    match raw.find('[') {
        Some(lb) if raw.ends_with(']') => {
            let index = raw[lb + 1..raw.len() - 1].trim().parse::<usize>().ok()?;
            Some(Segment {
                key: &raw[..lb],
                index: Some(index),
            })
        }
        Some(_) => None,
        None => Some(Segment {
            key: raw,
            index: None,
        }),
    }
}

fn step<'v>(node: &'v Value, segment: &Segment<'_>) -> Option<&'v Value> {
    match node {
        Value::Object(map) => {
            if segment.key.is_empty() {
                return None;
            }
            let child = map.get(segment.key)?;
            match segment.index {
                Some(i) => child.as_array()?.get(i),
                None => Some(child),
            }
        }
        Value::Array(items) => items.get(segment.index?),
        _ => None,
    }
}

/// 按路径在已解析的 JSON 中寻址。
pub fn walk<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    if path.trim().is_empty() {
        return None;
    }
    path.split('.').try_fold(root, |node, raw| {
        let segment = parse_segment(raw)?;
        step(node, &segment)
    })
}

/// 解析响应文本并按路径取值。
///
/// 字符串原样返回，其余类型返回其 JSON 文本；任一步失败返回 `None`。
pub fn extract_by_path(json: &str, path: &str) -> Option<String> {
    let root: Value = serde_json::from_str(json).ok()?;
    match walk(&root, path)? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
