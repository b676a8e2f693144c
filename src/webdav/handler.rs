use super::constants::*;
use super::routes::{Route, route};
use super::types::{BoxError, DavResponse, RequestContext, empty_body, full_body, response};
use crate::auth::BasicAuthenticator;
use crate::config::Config;
use crate::error::DavError;
use crate::storage::StorageRoot;
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Request, StatusCode, header};
use hyper::body::Body;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// WebDAV 处理器，请求之间只共享只读状态
#[derive(Clone)]
pub struct WebDavHandler {
    pub storage: Arc<StorageRoot>,
    auth: Arc<BasicAuthenticator>,
    pub buffer_size: usize,
    /// None 表示不限时
    pub read_timeout: Option<Duration>,
}

impl WebDavHandler {
    pub fn new(
        storage: Arc<StorageRoot>,
        auth: Arc<BasicAuthenticator>,
        buffer_size: usize,
        read_timeout: Option<Duration>,
    ) -> Self {
        Self {
            storage,
            auth,
            buffer_size,
            read_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(StorageRoot::new(config.storage.root_path.clone())),
            Arc::new(BasicAuthenticator::new(
                config.auth.credentials(),
                &config.auth.realm,
            )),
            config.storage.effective_buffer_size(),
            config.server.read_timeout(),
        )
    }

    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// 处理单个请求。处理器中的任何错误都在此转换为响应，不会向上传播
    pub async fn handle<B>(&self, req: Request<B>) -> DavResponse
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        let ctx = RequestContext::from_parts(&parts);
        let authenticated =
            ctx.method == http::Method::OPTIONS || self.auth.authenticate(&ctx.headers);
        let target = route(&ctx.method, authenticated);
        debug!("WebDAV {} {} -> {:?}", ctx.method, ctx.raw_path, target);

        let result = match target {
            Route::Options => Ok(self.handle_options()),
            Route::Unauthorized => Err(DavError::Unauthorized),
            Route::Get => self.handle_get(&ctx).await,
            Route::Put => self.handle_put(&ctx, body).await,
            Route::Delete => self.handle_delete(&ctx).await,
            Route::Mkcol => self.handle_mkcol(&ctx).await,
            Route::Propfind => self.handle_propfind(&ctx).await,
            Route::Proppatch => self.handle_proppatch(&ctx, body).await,
            Route::Move => self.handle_move(&ctx).await,
            Route::Copy => self.handle_copy(&ctx).await,
            Route::MethodNotAllowed => Err(DavError::MethodNotAllowed(ctx.method.to_string())),
        };

        let mut resp = result.unwrap_or_else(|e| self.error_response(&ctx, e));
        apply_dav_headers(resp.headers_mut());
        resp
    }

    pub(super) fn handle_options(&self) -> DavResponse {
        let mut resp = response(StatusCode::OK, empty_body());
        resp.headers_mut()
            .insert(header::ALLOW, HeaderValue::from_static(HEADER_ALLOW_VALUE));
        resp
    }

    fn error_response(&self, ctx: &RequestContext, err: DavError) -> DavResponse {
        let status = err.status();
        if status.is_server_error() {
            error!("WebDAV {} {} 失败: {}", ctx.method, ctx.raw_path, err);
        } else {
            debug!("WebDAV {} {} -> {}: {}", ctx.method, ctx.raw_path, status, err);
        }
        let mut resp = response(status, full_body(err.to_string()));
        resp.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(CONTENT_TYPE_TEXT),
        );
        if matches!(err, DavError::Unauthorized) {
            resp.headers_mut()
                .insert(header::WWW_AUTHENTICATE, self.auth.challenge());
        }
        resp
    }
}

/// 所有响应统一附加 DAV 与 CORS 头
pub fn apply_dav_headers(headers: &mut HeaderMap) {
    headers.insert(HEADER_DAV, HeaderValue::from_static(HEADER_DAV_VALUE));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(CORS_ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(HEADER_ALLOW_VALUE),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(CORS_ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static(CORS_EXPOSE_HEADERS),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dav_headers_overlay() {
        let mut headers = HeaderMap::new();
        apply_dav_headers(&mut headers);
        assert_eq!(headers.get("DAV").unwrap(), "1,2");
        assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
        assert_eq!(
            headers.get("access-control-expose-headers").unwrap(),
            "DAV"
        );
        assert!(
            headers
                .get("access-control-allow-methods")
                .unwrap()
                .to_str()
                .unwrap()
                .contains("PROPFIND")
        );
        assert!(
            headers
                .get("access-control-allow-headers")
                .unwrap()
                .to_str()
                .unwrap()
                .contains("Destination")
        );
    }

    #[test]
    fn test_with_read_timeout() {
        let handler = WebDavHandler::from_config(&Config::default())
            .with_read_timeout(Some(Duration::from_millis(250)));
        assert_eq!(handler.read_timeout, Some(Duration::from_millis(250)));
        assert_eq!(handler.buffer_size, 8192);
    }
}
