//! # 请求组装模块（request）
//!
//! ## 设计思路
//!
//! 把“模板 + 运行时值”变成一个可直接发送的 `HttpRequest`，全程纯函数：
//!
//! 1. `placeholder`：7 个固定占位符的单次扫描替换
//! 2. `endpoint`：服务端地址 + 模板端点 → host / path / scheme
//! 3. `builder`：请求头替换、JSON 负载或 multipart 请求体
//!
//! 网络发送由 `transport` 负责，这里不做任何 I/O，方便单元测试。

mod builder;
mod endpoint;
mod placeholder;

pub use builder::{
    BuiltRequest, MULTIPART_BOUNDARY, build_multipart_body, build_request, decode_base64_lenient,
};
pub use endpoint::{Endpoint, resolve};
pub use placeholder::{PlaceholderContext, escape_json, substitute};

use crate::error::AppError;

/// HTTP 方法。模板调用统一使用 POST；模型列表查询可为 GET。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// 交给传输层的完整请求。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub endpoint: Endpoint,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn url(&self) -> String {
        self.endpoint.url()
    }
}

/// 组装一次模板调用：端点占位符原样替换后解析，再构建头与体。
pub fn prepare(
    server_url: &str,
    endpoint_template: &str,
    header_templates: &[(String, String)],
    payload: &str,
    method: Method,
    ctx: &PlaceholderContext,
) -> Result<HttpRequest, AppError> {
    let path = substitute(endpoint_template, ctx, false);
    let endpoint = resolve(server_url, &path)?;
    let built = build_request(header_templates, payload, ctx);

    Ok(HttpRequest {
        endpoint,
        method,
        headers: built.headers,
        body: built.body,
    })
}
