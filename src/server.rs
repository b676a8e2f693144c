//! WebDAV 服务生命周期
//!
//! 状态机：Stopped → Starting → Running → Stopping → Stopped。
//! 状态变更由异步互斥锁串行化，同一时刻只有一个监听实例。

use crate::config::{Config, timeout_from_millis};
use crate::error::{DavError, Result};
use crate::storage::StorageRoot;
use crate::webdav::WebDavHandler;
use hyper::Request;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

struct RunningServer {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

pub struct DavServer {
    handler: WebDavHandler,
    host: String,
    state_tx: watch::Sender<ServerState>,
    running: Mutex<Option<RunningServer>>,
}

impl DavServer {
    pub fn new(config: &Config) -> Self {
        Self::with_handler(WebDavHandler::from_config(config), config.server.host.clone())
    }

    pub fn with_handler(handler: WebDavHandler, host: impl Into<String>) -> Self {
        let (state_tx, _) = watch::channel(ServerState::Stopped);
        Self {
            handler,
            host: host.into(),
            state_tx,
            running: Mutex::new(None),
        }
    }

    pub fn storage(&self) -> &StorageRoot {
        &self.handler.storage
    }

    /// 启动监听。已有实例在运行时先停止它，再绑定新端口（0 表示自动分配）。
    /// `timeout_ms` 为 0 时不限制读超时
    pub async fn start(&self, port: u16, timeout_ms: u64) -> Result<SocketAddr> {
        let mut running = self.running.lock().await;
        if let Some(previous) = running.take() {
            info!("WebDAV 服务器已在运行，先停止旧实例: {}", previous.addr);
            self.shutdown(previous).await;
        }

        self.state_tx.send_replace(ServerState::Starting);
        let bind_addr = format!("{}:{}", self.host, port);
        let listener = match TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                self.state_tx.send_replace(ServerState::Stopped);
                return Err(DavError::internal(&format!("绑定 {} 失败", bind_addr), e));
            }
        };
        let addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                self.state_tx.send_replace(ServerState::Stopped);
                return Err(DavError::Io(e));
            }
        };

        let read_timeout = timeout_from_millis(timeout_ms);
        let handler = Arc::new(self.handler.clone().with_read_timeout(read_timeout));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            tokio::select! {
                () = accept_loop(listener, handler, read_timeout) => {
                    debug!("监听循环结束");
                }
                _ = shutdown_rx => {
                    info!("收到关闭信号");
                }
            }
        });

        *running = Some(RunningServer {
            addr,
            shutdown_tx,
            task,
        });
        self.state_tx.send_replace(ServerState::Running);
        info!("WebDAV 服务器启动: http://{}", addr);
        Ok(addr)
    }

    /// 停止监听并释放端口，未运行时直接返回
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        if let Some(server) = running.take() {
            self.shutdown(server).await;
        }
    }

    async fn shutdown(&self, server: RunningServer) {
        self.state_tx.send_replace(ServerState::Stopping);
        let _ = server.shutdown_tx.send(());
        if let Err(e) = server.task.await {
            warn!("监听任务异常退出: {}", e);
        }
        self.state_tx.send_replace(ServerState::Stopped);
        info!("WebDAV 服务器已停止: {}", server.addr);
    }

    pub fn state(&self) -> ServerState {
        *self.state_tx.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ServerState::Running
    }

    /// 订阅状态变化，供宿主界面展示
    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.state_tx.subscribe()
    }

    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.addr)
    }
}

impl Drop for DavServer {
    fn drop(&mut self) {
        if let Some(server) = self.running.get_mut().take() {
            let _ = server.shutdown_tx.send(());
            server.task.abort();
        }
    }
}

/// 每个连接一个任务，互不阻塞
async fn accept_loop(
    listener: TcpListener,
    handler: Arc<WebDavHandler>,
    read_timeout: Option<Duration>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                let handler = handler.clone();
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let service = service_fn(move |req: Request<Incoming>| {
                        let handler = handler.clone();
                        async move { Ok::<_, Infallible>(handler.handle(req).await) }
                    });

                    let mut builder = http1::Builder::new();
                    builder.timer(TokioTimer::new()).keep_alive(true);
                    if let Some(read_timeout) = read_timeout {
                        builder.header_read_timeout(read_timeout);
                    }
                    if let Err(e) = builder.serve_connection(io, service).await {
                        warn!(peer = %peer_addr, error = %e, "HTTP 连接错误");
                    }
                });
            }
            Err(e) => {
                error!(error = %e, "接受连接失败");
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}
