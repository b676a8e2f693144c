use bytes::Bytes;
use std::time::Duration;
use http::{HeaderMap, Method, StatusCode, request::Parts};
use http_body_util::{BodyExt, Full, combinators::UnsyncBoxBody};

use super::constants::HEADER_DEPTH;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 响应体：固定长度或流式
pub type DavBody = UnsyncBoxBody<Bytes, std::io::Error>;
pub type DavResponse = http::Response<DavBody>;

pub fn full_body(data: impl Into<Bytes>) -> DavBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

pub fn empty_body() -> DavBody {
    full_body(Bytes::new())
}

pub fn response(status: StatusCode, body: DavBody) -> DavResponse {
    let mut resp = http::Response::new(body);
    *resp.status_mut() = status;
    resp
}

/// 在读超时内等待 `fut`，超时返回 None；未设置超时则一直等待
pub async fn within<F: Future>(limit: Option<Duration>, fut: F) -> Option<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
        None => Some(fut.await),
    }
}

/// PROPFIND 深度，"0" 以外的取值一律视为 "1"，infinity 单独拒绝
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Zero,
    One,
    Infinity,
}

impl Depth {
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("0") => Depth::Zero,
            Some(v) if v.eq_ignore_ascii_case("infinity") => Depth::Infinity,
            _ => Depth::One,
        }
    }
}

/// 与请求体分离后的请求上下文
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// 未解码的请求路径（不含查询串）
    pub raw_path: String,
    /// HeaderMap 的键在边界处已统一为小写
    pub headers: HeaderMap,
    pub depth: Depth,
}

impl RequestContext {
    pub fn from_parts(parts: &Parts) -> Self {
        let depth = Depth::from_header(
            parts
                .headers
                .get(HEADER_DEPTH)
                .and_then(|v| v.to_str().ok()),
        );
        Self {
            method: parts.method.clone(),
            raw_path: parts.uri.path().to_string(),
            headers: parts.headers.clone(),
            depth,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// 已知且为正数的 Content-Length
    pub fn content_length(&self) -> Option<u64> {
        self.header(http::header::CONTENT_LENGTH.as_str())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|len| *len > 0)
            .map(|len| len as u64)
    }
}
