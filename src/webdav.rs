//! WebDAV 协议处理
//!
//! 请求先经过 Basic 认证与方法分派（[`routes`]），再由各处理器访问
//! 根目录下的文件系统。所有响应统一附加 DAV 与 CORS 头。

pub mod constants;
mod files;
pub mod handler;
mod listing;
mod props;
mod relocate;
pub mod routes;
pub mod types;


pub use handler::WebDavHandler;
pub use relocate::parse_destination;
pub use routes::{Route, route};
pub use types::{DavBody, DavResponse, Depth};
