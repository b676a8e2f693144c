use super::WebDavHandler;
use super::types::{BoxError, DavResponse, RequestContext, empty_body, response, within};
use crate::error::{DavError, Result};
use crate::storage::{Resource, http_date};
use bytes::Bytes;
use futures_util::TryStreamExt;
use http::{HeaderValue, StatusCode, header};
use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Body, Frame};
use std::pin::pin;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::io::ReaderStream;
use tracing::debug;

impl WebDavHandler {
    pub(super) async fn handle_get(&self, ctx: &RequestContext) -> Result<DavResponse> {
        let path = self.storage.resolve(&ctx.raw_path)?;
        let resource = Resource::load(&path).await?;
        if resource.is_collection {
            return self.render_listing(ctx, &resource).await;
        }

        let file = fs::File::open(&path.full_path)
            .await
            .map_err(|e| DavError::internal("打开文件失败", e))?;
        // 以打开后的长度为准，避免 stat 与读取之间文件被改动
        let len = file
            .metadata()
            .await
            .map_err(|e| DavError::internal("读取文件信息失败", e))?
            .len();
        let stream = ReaderStream::with_capacity(file, self.buffer_size).map_ok(Frame::data);
        let mut resp = response(StatusCode::OK, StreamBody::new(stream).boxed_unsync());

        let content_type = resource
            .content_type
            .as_deref()
            .and_then(|ct| HeaderValue::from_str(ct).ok())
            .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
        resp.headers_mut().insert(header::CONTENT_TYPE, content_type);
        resp.headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from(len));
        if let Some(modified) = resource.modified
            && let Ok(value) = HeaderValue::from_str(&http_date(modified))
        {
            resp.headers_mut().insert(header::LAST_MODIFIED, value);
        }
        Ok(resp)
    }

    /// PUT 按块流式写入，内存占用与请求体大小无关。写入中途失败不回滚
    pub(super) async fn handle_put<B>(&self, ctx: &RequestContext, body: B) -> Result<DavResponse>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<BoxError>,
    {
        let path = self.storage.resolve(&ctx.raw_path)?;
        let existed = match fs::metadata(&path.full_path).await {
            Ok(meta) if meta.is_dir() => {
                return Err(DavError::MethodNotAllowed("不能对集合执行 PUT".to_string()));
            }
            Ok(_) => true,
            Err(_) => false,
        };

        if let Some(parent) = path.full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DavError::internal("创建目录失败", e))?;
        }
        let file = fs::File::create(&path.full_path)
            .await
            .map_err(|e| DavError::internal("创建文件失败", e))?;
        let mut writer = BufWriter::with_capacity(self.buffer_size, file);

        // 已知长度时读满即停，以便连接复用
        let mut remaining = ctx.content_length();
        let mut written: u64 = 0;
        let mut body = pin!(body);
        while remaining != Some(0) {
            let frame = match within(self.read_timeout, body.frame()).await {
                None => return Err(DavError::Internal("读取请求体超时".to_string())),
                Some(None) => break,
                Some(Some(Err(e))) => {
                    let e: BoxError = e.into();
                    return Err(DavError::internal("读取请求体失败", e));
                }
                Some(Some(Ok(frame))) => frame,
            };
            let Ok(mut data) = frame.into_data() else {
                continue;
            };
            if let Some(left) = remaining.as_mut() {
                if data.len() as u64 > *left {
                    data.truncate(*left as usize);
                }
                *left -= data.len() as u64;
            }
            writer
                .write_all(&data)
                .await
                .map_err(|e| DavError::internal("写入文件失败", e))?;
            written += data.len() as u64;
        }
        writer
            .flush()
            .await
            .map_err(|e| DavError::internal("写入文件失败", e))?;

        debug!("PUT /{} 写入 {} 字节", path.relative, written);
        let status = if existed {
            StatusCode::NO_CONTENT
        } else {
            StatusCode::CREATED
        };
        Ok(response(status, empty_body()))
    }

    pub(super) async fn handle_delete(&self, ctx: &RequestContext) -> Result<DavResponse> {
        let path = self.storage.resolve(&ctx.raw_path)?;
        if path.is_root() {
            return Err(DavError::Forbidden("不能删除根目录".to_string()));
        }
        let resource = Resource::load(&path).await?;
        let result = if resource.is_collection {
            fs::remove_dir_all(&path.full_path).await
        } else {
            fs::remove_file(&path.full_path).await
        };
        result.map_err(|e| DavError::internal("删除失败", e))?;
        Ok(response(StatusCode::NO_CONTENT, empty_body()))
    }

    pub(super) async fn handle_mkcol(&self, ctx: &RequestContext) -> Result<DavResponse> {
        let path = self.storage.resolve(&ctx.raw_path)?;
        if fs::symlink_metadata(&path.full_path).await.is_ok() {
            return Err(DavError::AlreadyExists(format!("/{}", path.relative)));
        }
        fs::create_dir_all(&path.full_path)
            .await
            .map_err(|e| DavError::internal("创建目录失败", e))?;
        Ok(response(StatusCode::CREATED, empty_body()))
    }
}
