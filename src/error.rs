use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DavError {
    #[error("认证失败")]
    Unauthorized,

    #[error("资源不存在: {0}")]
    NotFound(String),

    #[error("资源已存在: {0}")]
    AlreadyExists(String),

    #[error("无效的请求: {0}")]
    BadRequest(String),

    #[error("不支持的方法: {0}")]
    MethodNotAllowed(String),

    #[error("禁止访问: {0}")]
    Forbidden(String),

    #[error("{0}")]
    Internal(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置错误: {0}")]
    Config(String),
}

impl DavError {
    /// 错误对应的 HTTP 状态码
    pub fn status(&self) -> StatusCode {
        match self {
            DavError::Unauthorized => StatusCode::UNAUTHORIZED,
            DavError::NotFound(_) => StatusCode::NOT_FOUND,
            DavError::AlreadyExists(_) | DavError::MethodNotAllowed(_) => {
                StatusCode::METHOD_NOT_ALLOWED
            }
            DavError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DavError::Forbidden(_) => StatusCode::FORBIDDEN,
            DavError::Internal(_) | DavError::Io(_) | DavError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 将底层错误包装为 500，保留原始错误文本
    pub fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        DavError::Internal(format!("{}: {}", context, err))
    }
}

pub type Result<T> = std::result::Result<T, DavError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_status_mapping() {
        assert_eq!(DavError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            DavError::NotFound("a.txt".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DavError::AlreadyExists("dir".into()).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            DavError::MethodNotAllowed("LOCK".into()).status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            DavError::BadRequest("缺少 Destination 头".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DavError::Forbidden("..".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            DavError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "权限不足");
        let err: DavError = io_err.into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("权限不足"));
    }

    #[test]
    fn test_internal_keeps_source_text() {
        let io_err = io::Error::new(io::ErrorKind::Other, "disk full");
        let err = DavError::internal("复制文件失败", io_err);
        assert_eq!(err.to_string(), "复制文件失败: disk full");
    }

    #[test]
    fn test_error_display() {
        let err = DavError::NotFound("/missing.txt".to_string());
        assert_eq!(err.to_string(), "资源不存在: /missing.txt");
        let err = DavError::Config("端口无效".to_string());
        assert_eq!(err.to_string(), "配置错误: 端口无效");
    }
}
