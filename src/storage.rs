//! 本地根目录存储
//!
//! 所有请求路径都经由 [`StorageRoot::resolve`] 映射到根目录之下，
//! 含 `..` 的路径直接拒绝，不做任何越界访问。

use crate::error::{DavError, Result};
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::info;

#[derive(Debug, Clone)]
pub struct StorageRoot {
    root_path: PathBuf,
}

/// 解析后的请求路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// 相对根目录的逻辑路径，以 `/` 分隔，根目录为空串
    pub relative: String,
    /// 文件系统中的绝对位置
    pub full_path: PathBuf,
}

impl ResolvedPath {
    pub fn is_root(&self) -> bool {
        self.relative.is_empty()
    }

    /// 当前路径是否位于 `other` 之内（含相等）
    pub fn is_within(&self, other: &ResolvedPath) -> bool {
        self.full_path.starts_with(&other.full_path)
    }
}

impl StorageRoot {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_path
    }

    /// 初始化根目录
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.root_path).await?;
        info!("存储根目录初始化完成: {:?}", self.root_path);
        Ok(())
    }

    /// 将百分号编码的 URI 路径映射到根目录内
    pub fn resolve(&self, raw_path: &str) -> Result<ResolvedPath> {
        let decoded = urlencoding::decode(raw_path)
            .map_err(|e| DavError::BadRequest(format!("路径解码失败: {}", e)))?;
        self.resolve_decoded(&decoded)
    }

    /// 映射已解码的路径
    pub fn resolve_decoded(&self, path: &str) -> Result<ResolvedPath> {
        let path = path.strip_prefix('/').unwrap_or(path);
        let mut segments: Vec<&str> = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(DavError::Forbidden(format!("路径越界: /{}", path)));
                }
                _ => {}
            }
            // 单个分段必须恰好是一个普通路径组件（排除盘符、反斜杠路径等）
            let mut components = Path::new(segment).components();
            let single_normal = matches!(components.next(), Some(Component::Normal(_)))
                && components.next().is_none();
            if !single_normal || segment.contains('\0') {
                return Err(DavError::Forbidden(format!("非法路径分段: {}", segment)));
            }
            segments.push(segment);
        }

        let mut full_path = self.root_path.clone();
        for segment in &segments {
            full_path.push(segment);
        }
        Ok(ResolvedPath {
            relative: segments.join("/"),
            full_path,
        })
    }
}

impl StorageRoot {
    /// 列出集合的直接子项，按名称排序；无法读取元数据的条目（如失效链接）跳过
    pub async fn children(&self, parent: &ResolvedPath) -> Result<Vec<Resource>> {
        let mut entries = fs::read_dir(&parent.full_path)
            .await
            .map_err(|e| DavError::internal("读取目录失败", e))?;
        let mut children = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DavError::internal("读取目录项失败", e))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            let full_path = entry.path();
            let Ok(metadata) = fs::metadata(&full_path).await else {
                continue;
            };
            let relative = if parent.is_root() {
                name
            } else {
                format!("{}/{}", parent.relative, name)
            };
            children.push(Resource::from_metadata(
                ResolvedPath {
                    relative,
                    full_path,
                },
                &metadata,
            ));
        }
        children.sort_by(|a, b| a.path.full_path.cmp(&b.path.full_path));
        Ok(children)
    }
}

/// 文件系统条目的只读视图，每次请求现取现用
#[derive(Debug, Clone)]
pub struct Resource {
    pub path: ResolvedPath,
    pub is_collection: bool,
    /// 集合没有长度
    pub size: Option<u64>,
    pub modified: Option<SystemTime>,
    /// 集合没有内容类型
    pub content_type: Option<String>,
}

impl Resource {
    /// 读取条目元数据，不存在时返回 NotFound
    pub async fn load(path: &ResolvedPath) -> Result<Self> {
        let metadata = fs::metadata(&path.full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DavError::NotFound(format!("/{}", path.relative))
            } else {
                DavError::Io(e)
            }
        })?;
        Ok(Self::from_metadata(path.clone(), &metadata))
    }

    pub fn from_metadata(path: ResolvedPath, metadata: &std::fs::Metadata) -> Self {
        let is_collection = metadata.is_dir();
        let (size, content_type) = if is_collection {
            (None, None)
        } else {
            (
                Some(metadata.len()),
                Some(content_type_for(&path.full_path)),
            )
        };
        Self {
            path,
            is_collection,
            size,
            modified: metadata.modified().ok(),
            content_type,
        }
    }

    /// 文件系统中的基础名，根目录取根目录自身的名字
    pub fn display_name(&self) -> String {
        self.path
            .full_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// RFC 1123 格式的最后修改时间
    pub fn last_modified(&self) -> Option<String> {
        self.modified.map(http_date)
    }
}

/// 按扩展名推断 MIME，未知类型回退为 application/octet-stream
pub fn content_type_for(path: &Path) -> String {
    match path.extension() {
        Some(ext) => mime_guess::from_ext(&ext.to_string_lossy())
            .first_or_octet_stream()
            .to_string(),
        None => mime_guess::mime::APPLICATION_OCTET_STREAM.to_string(),
    }
}

pub fn http_date(time: SystemTime) -> String {
    let dt: DateTime<Utc> = time.into();
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
