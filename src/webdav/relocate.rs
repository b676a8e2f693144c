use super::WebDavHandler;
use super::constants::HEADER_DESTINATION;
use super::types::{DavResponse, RequestContext, empty_body, response};
use crate::error::{DavError, Result};
use crate::storage::{ResolvedPath, Resource};
use http::StatusCode;
use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{error, info};
use url::Url;

impl WebDavHandler {
    pub(super) async fn handle_move(&self, ctx: &RequestContext) -> Result<DavResponse> {
        let (source, dest) = self.relocation_paths(ctx).await?;
        if let Err(e) = move_entry(&source.full_path, &dest.full_path).await {
            error!(
                "移动失败: /{} -> /{}: {}",
                source.relative, dest.relative, e
            );
            return Err(DavError::Internal("移动失败".to_string()));
        }
        info!("MOVE /{} -> /{}", source.relative, dest.relative);
        Ok(response(StatusCode::CREATED, empty_body()))
    }

    pub(super) async fn handle_copy(&self, ctx: &RequestContext) -> Result<DavResponse> {
        let (source, dest) = self.relocation_paths(ctx).await?;
        clear_destination(&dest.full_path)
            .await
            .map_err(|e| DavError::internal("复制失败", e))?;
        copy_tree(&source.full_path, &dest.full_path)
            .await
            .map_err(|e| DavError::internal("复制失败", e))?;
        info!("COPY /{} -> /{}", source.relative, dest.relative);
        Ok(response(StatusCode::CREATED, empty_body()))
    }

    /// MOVE/COPY 共用的前置检查：目标头、源存在、根目录保护、目标父目录
    async fn relocation_paths(&self, ctx: &RequestContext) -> Result<(ResolvedPath, ResolvedPath)> {
        let source = self.storage.resolve(&ctx.raw_path)?;
        let header = ctx
            .header(HEADER_DESTINATION)
            .ok_or_else(|| DavError::BadRequest("缺少 Destination 头".to_string()))?;
        let dest = self.storage.resolve_decoded(&parse_destination(header))?;
        Resource::load(&source).await?;

        if source.is_root() || dest.is_root() {
            return Err(DavError::Forbidden("不能移动或覆盖根目录".to_string()));
        }
        if dest.is_within(&source) {
            return Err(DavError::Forbidden("目标位于源路径之内".to_string()));
        }
        // 覆盖目标会先删除它，源在目标之内时等同于删除源
        if source.is_within(&dest) {
            return Err(DavError::Forbidden("源路径位于目标之内".to_string()));
        }
        if let Some(parent) = dest.full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DavError::internal("创建目标目录失败", e))?;
        }
        Ok((source, dest))
    }
}

/// 解析 Destination 头，返回已解码的路径。
/// 先按完整 URL 严格解析，失败时退回宽松的字符串切分，不会因格式问题拒绝请求
pub fn parse_destination(value: &str) -> String {
    parse_strict(value).unwrap_or_else(|| parse_permissive(value))
}

fn parse_strict(value: &str) -> Option<String> {
    let url = Url::parse(value).ok()?;
    if !url.has_host() {
        return None;
    }
    urlencoding::decode(url.path()).ok().map(|s| s.into_owned())
}

fn parse_permissive(value: &str) -> String {
    let rest = value
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(value);
    let path = if rest.starts_with('/') {
        rest
    } else {
        rest.find('/').map(|idx| &rest[idx..]).unwrap_or("/")
    };
    let path = path.split(['?', '#']).next().unwrap_or(path);
    urlencoding::decode(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// 已存在的目标先整体删除；同卷内直接重命名，跨设备时退回复制后删除
async fn move_entry(src: &Path, dst: &Path) -> io::Result<()> {
    clear_destination(dst).await?;
    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            copy_tree(src, dst).await?;
            remove_tree(src).await
        }
        Err(e) => Err(e),
    }
}

/// 覆盖语义：目标已存在时整体删除，不与源合并
async fn clear_destination(dst: &Path) -> io::Result<()> {
    match fs::symlink_metadata(dst).await {
        Ok(_) => remove_tree(dst).await,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

async fn remove_tree(path: &Path) -> io::Result<()> {
    if fs::symlink_metadata(path).await?.is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    }
}

pub(super) async fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    if fs::metadata(src).await?.is_dir() {
        copy_dir_all(src, dst).await
    } else {
        fs::copy(src, dst).await.map(|_| ())
    }
}

async fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst).await?;
    let mut entries = fs::read_dir(src).await?;
    while let Some(entry) = entries.next_entry().await? {
        let ty = entry.file_type().await?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if ty.is_dir() {
            Box::pin(copy_dir_all(&src_path, &dst_path)).await?;
        } else {
            fs::copy(&src_path, &dst_path).await?;
        }
    }
    Ok(())
}
