// nas-dav 库接口
// 供二进制入口、集成测试与宿主进程使用

pub mod auth;
pub mod config;
pub mod error;
pub mod server;
pub mod storage;
pub mod webdav;

pub use config::Config;
pub use error::{DavError, Result};
pub use server::{DavServer, ServerState};
pub use webdav::WebDavHandler;
