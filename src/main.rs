use anyhow::Context;
use nas_dav::{Config, DavServer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志，默认 info，可由 RUST_LOG 覆盖
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("nas-dav 服务器启动中...");

    let config = Config::load();
    // 不输出密码
    info!(
        "配置加载完成: host={}, port={}, root={:?}, anonymous={}",
        config.server.host,
        config.server.port,
        config.storage.root_path,
        config.auth.allow_anonymous
    );

    let server = DavServer::new(&config);
    server
        .storage()
        .init()
        .await
        .context("初始化存储根目录失败")?;
    let addr = server
        .start(config.server.port, config.server.timeout_ms)
        .await
        .context("启动 WebDAV 服务失败")?;
    info!("  WebDAV:  http://{}", addr);

    wait_for_shutdown().await?;

    server.stop().await;
    Ok(())
}

async fn wait_for_shutdown() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate()).context("注册 SIGTERM 失败")?;
        tokio::select! {
            _ = sigterm.recv() => info!("收到 SIGTERM 信号，正在退出..."),
            result = tokio::signal::ctrl_c() => {
                result.context("监听 Ctrl+C 失败")?;
                info!("收到 Ctrl+C，正在退出...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.context("监听 Ctrl+C 失败")?;
        info!("收到关闭信号，正在退出...");
    }

    Ok(())
}
