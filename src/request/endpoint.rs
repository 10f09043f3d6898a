//! 端点解析：服务端地址 + 模板端点 → (host, path, scheme)

use crate::error::AppError;

const DEFAULT_CHAT_PATH: &str = "/v1/chat/completions";

/// 可直接交给传输层的请求目标。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// 主机名，可带端口。
    pub host: String,
    /// 以 `/` 开头的路径（可带查询串）；仅有 host 时为空。
    pub path: String,
    pub use_https: bool,
}

impl Endpoint {
    /// 拼接为完整 URL。
    pub fn url(&self) -> String {
        let scheme = if self.use_https { "https" } else { "http" };
        let path = if self.path.is_empty() { "/" } else { self.path.as_str() };
        format!("{}://{}{}", scheme, self.host, path)
    }
}

/// 解析请求目标。
///
/// 规则依次为：
/// 1. 模板端点为空时使用 `/v1/chat/completions`
/// 2. 模板端点为绝对 URL 时整体覆盖服务端地址
/// 3. 剥离 scheme 决定是否 HTTPS（未指定时默认 HTTPS）
/// 4. host 中的路径部分前置到模板路径
/// 5. 路径补齐前导 `/`
///
/// 仅当 host 为空时失败。
pub fn resolve(server_url: &str, template_path: &str) -> Result<Endpoint, AppError> {
    let mut host = server_url.trim().to_string();
    let mut path = template_path.trim().to_string();

    if path.is_empty() {
        path = DEFAULT_CHAT_PATH.to_string();
    }

    if path.starts_with("http://") || path.starts_with("https://") {
        host = std::mem::take(&mut path);
    }

    let mut use_https = true;
    if let Some(stripped) = host.strip_prefix("https://") {
        host = stripped.to_string();
    } else if let Some(stripped) = host.strip_prefix("http://") {
        host = stripped.to_string();
        use_https = false;
    }

    if let Some(slash) = host.find('/') {
        let host_path = host[slash..].to_string();
        host.truncate(slash);
        path = host_path + &path;
    }

    if !path.is_empty() && !path.starts_with('/') {
        path.insert(0, '/');
    }

    if host.is_empty() {
        return Err(AppError::Endpoint(format!(
            "无法从 '{}' + '{}' 解析出主机名",
            server_url, template_path
        )));
    }

    Ok(Endpoint {
        host,
        path,
        use_https,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_path_is_prepended_to_template_path() {
        let ep = resolve("https://api.x.com/v1", "/chat").expect("resolve");
        assert_eq!(ep.host, "api.x.com");
        assert_eq!(ep.path, "/v1/chat");
        assert!(ep.use_https);
        assert_eq!(ep.url(), "https://api.x.com/v1/chat");
    }

    #[test]
    fn absolute_template_url_overrides_server() {
        let ep = resolve("api.x.com", "https://other.com/y").expect("resolve");
        assert_eq!(ep.host, "other.com");
        assert_eq!(ep.path, "/y");
        assert!(ep.use_https);

        let ep = resolve("https://api.x.com/v1", "http://localhost:11434/api/chat").expect("resolve");
        assert_eq!(ep.host, "localhost:11434");
        assert_eq!(ep.path, "/api/chat");
        assert!(!ep.use_https);
    }

    #[test]
    fn empty_template_path_defaults_to_chat_completions() {
        let ep = resolve("https://api.openai.com", "").expect("resolve");
        assert_eq!(ep.path, "/v1/chat/completions");
    }

    #[test]
    fn scheme_defaults_to_https_and_http_is_detected() {
        assert!(resolve("api.x.com", "/a").expect("resolve").use_https);
        assert!(!resolve("http://api.x.com", "/a").expect("resolve").use_https);
    }

    #[test]
    fn missing_leading_slash_is_added() {
        let ep = resolve("https://api.x.com", "chat").expect("resolve");
        assert_eq!(ep.path, "/chat");
    }

    #[test]
    fn absolute_url_without_path_keeps_empty_path() {
        let ep = resolve("", "https://other.com").expect("resolve");
        assert_eq!(ep.host, "other.com");
        assert_eq!(ep.path, "");
        assert_eq!(ep.url(), "https://other.com/");
    }

    #[test]
    fn empty_host_fails() {
        assert!(matches!(resolve("", "/chat"), Err(AppError::Endpoint(_))));
        assert!(matches!(resolve("https:///v1", "/chat"), Err(AppError::Endpoint(_))));
    }
}
